use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::str::FromStr;

use asm_api::XMLNS;

use crate::{Error, Result};

const ROLE_TYPE: &str = "PersistentVMRole";

/// Guest operating system family of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    Windows,
}

impl OsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Linux" => Ok(Self::Linux),
            "Windows" => Ok(Self::Windows),
            other => Err(Error::InvalidOsKind(other.to_string())),
        }
    }
}

// ── Endpoints ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
        }
    }
}

/// A public port forwarded to a port on the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub protocol: Protocol,
    pub external_port: u16,
    pub internal_port: u16,
}

impl Endpoint {
    /// TCP endpoint with the same external and internal port.
    pub fn tcp(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            protocol: Protocol::Tcp,
            external_port: port,
            internal_port: port,
        }
    }
}

// ── Configuration sets ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfiguration {
    endpoints: Vec<Endpoint>,
}

impl NetworkConfiguration {
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Append an endpoint. External ports are unique within a set.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) -> Result<()> {
        if endpoint.external_port == 0 {
            return Err(Error::InvalidPort(endpoint.external_port));
        }
        if self
            .endpoints
            .iter()
            .any(|e| e.external_port == endpoint.external_port)
        {
            return Err(Error::DuplicatePort(endpoint.external_port));
        }
        self.endpoints.push(endpoint);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxProvisioningConfiguration {
    pub host_name: String,
    pub user_name: String,
    pub user_password: String,
    pub disable_ssh_password_authentication: bool,
    pub ssh: Option<SshConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfiguration {
    pub public_keys: Vec<PublicKey>,
}

/// Certificate fingerprint and the guest path its key is installed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub fingerprint: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationSet {
    Network(NetworkConfiguration),
    LinuxProvisioning(LinuxProvisioningConfiguration),
}

impl ConfigurationSet {
    /// Discriminator used on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Network(_) => "NetworkConfiguration",
            Self::LinuxProvisioning(_) => "LinuxProvisioningConfiguration",
        }
    }
}

// ── Extensions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Public,
    Private,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

/// Extension parameter. `value` is already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionParameter {
    pub key: String,
    pub value: String,
    pub kind: ParameterKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionReference {
    pub name: String,
    pub publisher: String,
    pub version: String,
    pub reference_name: String,
    pub state: String,
    pub parameters: Vec<ExtensionParameter>,
}

impl ExtensionReference {
    pub fn parameter(&self, kind: ParameterKind) -> Option<&ExtensionParameter> {
        self.parameters.iter().find(|p| p.kind == kind)
    }
}

// ── Roles and deployments ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsVirtualHardDisk {
    pub source_image_name: String,
    pub media_link: String,
}

/// A single VM definition, built locally and submitted inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub size: String,
    pub os_disk: OsVirtualHardDisk,
    pub configuration_sets: Vec<ConfigurationSet>,
    pub extensions: Vec<ExtensionReference>,
    pub use_cert_auth: bool,
    pub cert_path: Option<PathBuf>,
}

impl Role {
    pub fn new(name: impl Into<String>, size: impl Into<String>, os_disk: OsVirtualHardDisk) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            os_disk,
            configuration_sets: Vec::new(),
            extensions: Vec::new(),
            use_cert_auth: false,
            cert_path: None,
        }
    }

    /// Add a configuration set, replacing any existing set of the same kind.
    pub fn set_configuration(&mut self, set: ConfigurationSet) {
        let kind = mem::discriminant(&set);
        match self
            .configuration_sets
            .iter()
            .position(|s| mem::discriminant(s) == kind)
        {
            Some(i) => self.configuration_sets[i] = set,
            None => self.configuration_sets.push(set),
        }
    }

    pub fn network(&self) -> Option<&NetworkConfiguration> {
        self.configuration_sets.iter().find_map(|s| match s {
            ConfigurationSet::Network(n) => Some(n),
            _ => None,
        })
    }

    pub fn provisioning(&self) -> Option<&LinuxProvisioningConfiguration> {
        self.configuration_sets.iter().find_map(|s| match s {
            ConfigurationSet::LinuxProvisioning(p) => Some(p),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentSlot {
    Production,
}

impl DeploymentSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "Production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub name: String,
    pub label: String,
    pub slot: DeploymentSlot,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedService {
    pub service_name: String,
    /// Base64 of the service name.
    pub label: String,
    pub location: String,
}

/// A storage account that VHDs can be placed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub name: String,
    pub location: String,
}

// ── Wire conversion ──────────────────────────────────────────────────

impl From<&ConfigurationSet> for asm_api::ConfigurationSet {
    fn from(set: &ConfigurationSet) -> Self {
        let mut wire = asm_api::ConfigurationSet {
            configuration_set_type: set.type_name().to_string(),
            ..Default::default()
        };

        match set {
            ConfigurationSet::Network(network) => {
                wire.input_endpoints = Some(asm_api::InputEndpoints {
                    endpoints: network
                        .endpoints
                        .iter()
                        .map(|e| asm_api::InputEndpoint {
                            local_port: e.internal_port,
                            name: e.name.clone(),
                            port: e.external_port,
                            protocol: e.protocol.as_str().to_string(),
                        })
                        .collect(),
                });
            }
            ConfigurationSet::LinuxProvisioning(p) => {
                wire.host_name = Some(p.host_name.clone());
                wire.user_name = Some(p.user_name.clone());
                wire.user_password = Some(p.user_password.clone());
                wire.disable_ssh_password_authentication =
                    Some(p.disable_ssh_password_authentication);
                wire.ssh = p.ssh.as_ref().map(|ssh| asm_api::Ssh {
                    public_keys: asm_api::PublicKeys {
                        keys: ssh
                            .public_keys
                            .iter()
                            .map(|k| asm_api::PublicKey {
                                fingerprint: k.fingerprint.clone(),
                                path: k.path.clone(),
                            })
                            .collect(),
                    },
                });
            }
        }

        wire
    }
}

impl From<&ExtensionReference> for asm_api::ResourceExtensionReference {
    fn from(ext: &ExtensionReference) -> Self {
        Self {
            reference_name: ext.reference_name.clone(),
            publisher: ext.publisher.clone(),
            name: ext.name.clone(),
            version: ext.version.clone(),
            resource_extension_parameter_values: asm_api::ResourceExtensionParameterValues {
                values: ext
                    .parameters
                    .iter()
                    .map(|p| asm_api::ResourceExtensionParameterValue {
                        key: p.key.clone(),
                        value: p.value.clone(),
                        kind: p.kind.as_str().to_string(),
                    })
                    .collect(),
            },
            state: ext.state.clone(),
        }
    }
}

impl From<&Role> for asm_api::PersistentVmRole {
    fn from(role: &Role) -> Self {
        let resource_extension_references = if role.extensions.is_empty() {
            None
        } else {
            Some(asm_api::ResourceExtensionReferences {
                references: role.extensions.iter().map(Into::into).collect(),
            })
        };

        Self {
            role_name: role.name.clone(),
            role_type: ROLE_TYPE.to_string(),
            configuration_sets: asm_api::ConfigurationSets {
                sets: role.configuration_sets.iter().map(Into::into).collect(),
            },
            resource_extension_references,
            os_virtual_hard_disk: Some(asm_api::OsVirtualHardDisk {
                media_link: role.os_disk.media_link.clone(),
                source_image_name: role.os_disk.source_image_name.clone(),
            }),
            role_size: role.size.clone(),
            provision_guest_agent: Some(true),
        }
    }
}

impl From<&Deployment> for asm_api::Deployment {
    fn from(deployment: &Deployment) -> Self {
        Self {
            xmlns: XMLNS.to_string(),
            name: deployment.name.clone(),
            deployment_slot: Some(deployment.slot.as_str().to_string()),
            status: None,
            label: deployment.label.clone(),
            role_instance_list: None,
            role_list: asm_api::RoleList {
                roles: deployment.roles.iter().map(Into::into).collect(),
            },
        }
    }
}

impl From<&HostedService> for asm_api::CreateHostedService {
    fn from(service: &HostedService) -> Self {
        Self {
            xmlns: XMLNS.to_string(),
            service_name: service.service_name.clone(),
            label: service.label.clone(),
            location: service.location.clone(),
        }
    }
}
