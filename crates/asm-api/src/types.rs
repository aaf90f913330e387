use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace carried by every document sent to the management API.
pub const XMLNS: &str = "http://schemas.microsoft.com/windowsazure";

/// Identifier of an asynchronous operation, taken from `x-ms-request-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Hosted services ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "CreateHostedService", rename_all = "PascalCase")]
pub struct CreateHostedService {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    pub service_name: String,
    pub label: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "CertificateFile", rename_all = "PascalCase")]
pub struct CertificateFile {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    pub data: String,
    pub certificate_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ── Deployments ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Deployment", rename_all = "PascalCase")]
pub struct Deployment {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_instance_list: Option<RoleInstanceList>,
    #[serde(default)]
    pub role_list: RoleList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleList {
    #[serde(rename = "Role", default)]
    pub roles: Vec<PersistentVmRole>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleInstanceList {
    #[serde(rename = "RoleInstance", default)]
    pub instances: Vec<RoleInstance>,
}

/// Runtime view of a role, only present in deployment read responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleInstance {
    pub role_name: String,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub instance_status: Option<String>,
    #[serde(default)]
    pub power_state: Option<String>,
    #[serde(rename = "IpAddress", default)]
    pub ip_address: Option<String>,
}

// ── Roles ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "PersistentVMRole", rename_all = "PascalCase")]
pub struct PersistentVmRole {
    pub role_name: String,
    #[serde(default)]
    pub role_type: String,
    #[serde(default)]
    pub configuration_sets: ConfigurationSets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_extension_references: Option<ResourceExtensionReferences>,
    #[serde(rename = "OSVirtualHardDisk", default, skip_serializing_if = "Option::is_none")]
    pub os_virtual_hard_disk: Option<OsVirtualHardDisk>,
    #[serde(default)]
    pub role_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_guest_agent: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationSets {
    #[serde(rename = "ConfigurationSet", default)]
    pub sets: Vec<ConfigurationSet>,
}

/// Flattened configuration set. Which fields are populated depends on
/// `configuration_set_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationSet {
    pub configuration_set_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_endpoints: Option<InputEndpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_ssh_password_authentication: Option<bool>,
    #[serde(rename = "SSH", default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<Ssh>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputEndpoints {
    #[serde(rename = "InputEndpoint", default)]
    pub endpoints: Vec<InputEndpoint>,
}

// Element order follows the service schema (alphabetical).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputEndpoint {
    pub local_port: u16,
    pub name: String,
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ssh {
    #[serde(default)]
    pub public_keys: PublicKeys,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeys {
    #[serde(rename = "PublicKey", default)]
    pub keys: Vec<PublicKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicKey {
    pub fingerprint: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceExtensionReferences {
    #[serde(rename = "ResourceExtensionReference", default)]
    pub references: Vec<ResourceExtensionReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceExtensionReference {
    pub reference_name: String,
    pub publisher: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub resource_extension_parameter_values: ResourceExtensionParameterValues,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceExtensionParameterValues {
    #[serde(rename = "ResourceExtensionParameterValue", default)]
    pub values: Vec<ResourceExtensionParameterValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceExtensionParameterValue {
    pub key: String,
    pub value: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsVirtualHardDisk {
    #[serde(default)]
    pub media_link: String,
    #[serde(default)]
    pub source_image_name: String,
}

// ── Role operations ──────────────────────────────────────────────────

/// Power actions posted to a role instance's `Operations` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOperationKind {
    Start,
    Shutdown,
    Restart,
}

impl RoleOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "StartRoleOperation",
            Self::Shutdown => "ShutdownRoleOperation",
            Self::Restart => "RestartRoleOperation",
        }
    }
}

impl fmt::Display for RoleOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a role power operation. The root element is named after the
/// operation type, so serialize it with [`crate::to_xml_with_root`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleOperation {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    pub operation_type: String,
}

impl RoleOperation {
    pub fn new(kind: RoleOperationKind) -> Self {
        Self {
            xmlns: XMLNS.to_string(),
            operation_type: kind.as_str().to_string(),
        }
    }
}

// ── Operations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "Operation", rename_all = "PascalCase")]
pub struct Operation {
    #[serde(rename = "ID")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub http_status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

/// Service-reported state of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Unknown,
}

impl Operation {
    pub fn status(&self) -> OperationStatus {
        match self.status.as_str() {
            "InProgress" => OperationStatus::InProgress,
            "Succeeded" => OperationStatus::Succeeded,
            "Failed" => OperationStatus::Failed,
            _ => OperationStatus::Unknown,
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Locations {
    #[serde(rename = "Location", default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsImages {
    #[serde(rename = "OSImage", default)]
    pub images: Vec<OsImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsImage {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "OS", default)]
    pub os: Option<String>,
    /// Semicolon-separated list of locations the image is published to.
    #[serde(default)]
    pub location: Option<String>,
}

// ── Storage services ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageServices {
    #[serde(rename = "StorageService", default)]
    pub services: Vec<StorageService>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageService {
    pub service_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub storage_service_properties: Option<StorageServiceProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageServiceProperties {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub endpoints: Option<StorageEndpoints>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageEndpoints {
    #[serde(rename = "Endpoint", default)]
    pub urls: Vec<String>,
}

impl StorageService {
    pub fn location(&self) -> Option<&str> {
        self.storage_service_properties
            .as_ref()
            .and_then(|p| p.location.as_deref())
    }

    /// The blob endpoint URL, if the service reported its endpoints.
    pub fn blob_endpoint(&self) -> Option<&str> {
        self.storage_service_properties
            .as_ref()
            .and_then(|p| p.endpoints.as_ref())
            .and_then(|e| e.urls.iter().find(|u| u.contains(".blob.")))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "CreateStorageServiceInput", rename_all = "PascalCase")]
pub struct CreateStorageService {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    pub service_name: String,
    pub label: String,
    pub location: String,
}
