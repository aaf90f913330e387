//! Sequencing of management operations.
//!
//! Every mutating call submits one document, then waits for the service to
//! report the resulting operation terminal before returning. Multi-step
//! workflows stop at the first failure and never undo earlier steps.

use std::path::Path;
use std::sync::Arc;

use asm_api::{RequestId, RoleOperation, RoleOperationKind};
use tracing::info;

use crate::assemble::{self, Assembler};
use crate::azure::AzureManagement;
use crate::cert::service_certificate;
use crate::collaborators::Transport;
use crate::config;
use crate::types::{ExtensionReference, Role};
use crate::{Result, check_operation};

fn hosted_services_path() -> String {
    "services/hostedservices".to_string()
}

fn hosted_service_path(service: &str) -> String {
    format!("services/hostedservices/{service}")
}

fn certificates_path(service: &str) -> String {
    format!("services/hostedservices/{service}/certificates")
}

fn deployments_path(service: &str) -> String {
    format!("services/hostedservices/{service}/deployments")
}

fn deployment_path(service: &str, deployment: &str) -> String {
    format!("services/hostedservices/{service}/deployments/{deployment}")
}

fn role_path(service: &str, deployment: &str, role: &str) -> String {
    format!("services/hostedservices/{service}/deployments/{deployment}/roles/{role}")
}

fn role_operations_path(service: &str, deployment: &str, role: &str) -> String {
    format!("services/hostedservices/{service}/deployments/{deployment}/roleinstances/{role}/Operations")
}

/// Drives VM lifecycle operations against the management API.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    assembler: Assembler,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, assembler: Assembler) -> Self {
        Self {
            transport,
            assembler,
        }
    }

    /// Orchestrator whose transport and lookups all go through `client`.
    pub fn from_client(client: asm_api::ManagementClient) -> Self {
        let azure = Arc::new(AzureManagement::new(client));
        let assembler = Assembler::new(azure.clone(), azure.clone(), azure.clone());
        Self::new(azure, assembler)
    }

    async fn submit(&self, path: &str, body: Vec<u8>) -> Result<()> {
        let request_id = self.transport.post(path, body).await?;
        self.complete(request_id).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let request_id = self.transport.delete(path).await?;
        self.complete(request_id).await
    }

    async fn complete(&self, request_id: RequestId) -> Result<()> {
        let operation = self.transport.await_completion(&request_id).await?;
        check_operation(&request_id, operation)
    }

    // ── Workflows ───────────────────────────────────────────────────

    /// Create the hosted service `dns_name`, upload the role's certificate
    /// when it uses certificate login, then deploy the role into it.
    ///
    /// There is no rollback: if a later step fails, the hosted service (and
    /// certificate) stay in place and must be removed by the caller.
    pub async fn create_vm(&self, role: Role, dns_name: &str, location: &str) -> Result<()> {
        self.assembler.resolve_location(location).await?;

        info!(service = dns_name, location, "creating hosted service");
        self.submit_hosted_service(dns_name, location).await?;

        if role.use_cert_auth {
            if let Some(cert_path) = &role.cert_path {
                info!(service = dns_name, cert = %cert_path.display(), "uploading certificate");
                self.upload_certificate(dns_name, cert_path).await?;
            }
        }

        info!(service = dns_name, role = %role.name, "deploying VM configuration");
        let deployment = assemble::deployment(role);
        let body = asm_api::to_xml(&asm_api::Deployment::from(&deployment))?;
        self.submit(&deployments_path(dns_name), body).await?;

        info!(service = dns_name, deployment = %deployment.name, "VM deployed");
        Ok(())
    }

    /// Base role for a new VM, see [`Assembler::vm_role`].
    pub async fn create_vm_configuration(
        &self,
        name: &str,
        size: &str,
        image: &str,
        location: &str,
    ) -> Result<Role> {
        info!(role = name, size, image, location, "creating VM configuration");
        self.assembler.vm_role(name, size, image, location).await
    }

    /// See [`config::attach_linux_provisioning`].
    pub fn add_linux_provisioning_config(
        &self,
        role: &mut Role,
        user_name: &str,
        password: &str,
        cert_path: Option<&Path>,
    ) -> Result<()> {
        config::attach_linux_provisioning(role, user_name, password, cert_path)
    }

    pub fn set_extension(&self, role: &mut Role, extension: ExtensionReference) {
        config::attach_extension(role, extension)
    }

    /// See [`config::attach_docker_extension`].
    pub fn set_docker_extension(
        &self,
        role: &mut Role,
        cert_dir: &Path,
        port: u16,
        version: Option<&str>,
    ) -> Result<()> {
        config::attach_docker_extension(role, cert_dir, port, version)
    }

    // ── Hosted services ─────────────────────────────────────────────

    pub async fn create_hosted_service(&self, dns_name: &str, location: &str) -> Result<()> {
        self.assembler.resolve_location(location).await?;
        self.submit_hosted_service(dns_name, location).await
    }

    async fn submit_hosted_service(&self, dns_name: &str, location: &str) -> Result<()> {
        let service = assemble::hosted_service(dns_name, location);
        let body = asm_api::to_xml(&asm_api::CreateHostedService::from(&service))?;
        self.submit(&hosted_services_path(), body).await
    }

    pub async fn delete_hosted_service(&self, dns_name: &str) -> Result<()> {
        info!(service = dns_name, "deleting hosted service");
        self.remove(&hosted_service_path(dns_name)).await
    }

    pub async fn upload_certificate(&self, dns_name: &str, cert_path: &Path) -> Result<()> {
        let body = asm_api::to_xml(&service_certificate(cert_path)?)?;
        self.submit(&certificates_path(dns_name), body).await
    }

    // ── Deployments ─────────────────────────────────────────────────

    pub async fn get_deployment(&self, service: &str, deployment: &str) -> Result<asm_api::Deployment> {
        let body = self
            .transport
            .get(&deployment_path(service, deployment))
            .await?;
        Ok(asm_api::from_xml(&body)?)
    }

    pub async fn delete_deployment(&self, service: &str, deployment: &str) -> Result<()> {
        info!(service, deployment, "deleting deployment");
        self.remove(&deployment_path(service, deployment)).await
    }

    // ── Roles ───────────────────────────────────────────────────────

    pub async fn get_role(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
    ) -> Result<asm_api::PersistentVmRole> {
        let body = self
            .transport
            .get(&role_path(service, deployment, role))
            .await?;
        Ok(asm_api::from_xml(&body)?)
    }

    pub async fn start_role(&self, service: &str, deployment: &str, role: &str) -> Result<()> {
        self.role_operation(service, deployment, role, RoleOperationKind::Start)
            .await
    }

    pub async fn shutdown_role(&self, service: &str, deployment: &str, role: &str) -> Result<()> {
        self.role_operation(service, deployment, role, RoleOperationKind::Shutdown)
            .await
    }

    pub async fn restart_role(&self, service: &str, deployment: &str, role: &str) -> Result<()> {
        self.role_operation(service, deployment, role, RoleOperationKind::Restart)
            .await
    }

    pub async fn delete_role(&self, service: &str, deployment: &str, role: &str) -> Result<()> {
        info!(service, deployment, role, "deleting role");
        self.remove(&role_path(service, deployment, role)).await
    }

    async fn role_operation(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        kind: RoleOperationKind,
    ) -> Result<()> {
        info!(service, deployment, role, operation = %kind, "submitting role operation");
        let body = asm_api::to_xml_with_root(kind.as_str(), &RoleOperation::new(kind))?;
        self.submit(&role_operations_path(service, deployment, role), body)
            .await
    }
}
