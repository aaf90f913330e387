mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use az_vm::Orchestrator;
use az_vm::config::DEFAULT_DOCKER_PORT;

use crate::config::AppConfig;
use crate::error::Result;

/// Provision classic Azure virtual machines.
#[derive(Parser, Debug)]
#[command(name = "azvm", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a Linux VM in a new hosted service
    CreateVm(CreateVmArgs),

    /// Create an empty hosted service
    CreateHostedService {
        dns_name: String,
        #[arg(short, long)]
        location: String,
    },

    DeleteHostedService { dns_name: String },

    /// Print a deployment as JSON
    GetDeployment { service: String, deployment: String },

    DeleteDeployment { service: String, deployment: String },

    /// Print a role as JSON
    GetRole(RoleArgs),

    StartRole(RoleArgs),

    ShutdownRole(RoleArgs),

    RestartRole(RoleArgs),

    DeleteRole(RoleArgs),

    /// Upload a PEM certificate to a hosted service
    UploadCert { dns_name: String, cert: PathBuf },

    /// Print the SHA-1 thumbprint of a PEM certificate
    Fingerprint { cert: PathBuf },
}

#[derive(Args, Debug)]
struct CreateVmArgs {
    /// Role name, also the hosted service name unless --dns-name is given
    name: String,

    #[arg(long)]
    dns_name: Option<String>,

    #[arg(long, default_value = "Small")]
    size: String,

    #[arg(long)]
    image: String,

    #[arg(short, long)]
    location: String,

    #[arg(short, long, default_value = "azureuser")]
    user: String,

    /// Empty disables SSH password login
    #[arg(long, env = "AZURE_VM_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// PEM certificate installed as the user's SSH key
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Directory under $HOME holding ca.pem, server-cert.pem and server-key.pem
    #[arg(long)]
    docker_cert_dir: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_DOCKER_PORT)]
    docker_port: u16,

    #[arg(long)]
    docker_version: Option<String>,
}

#[derive(Args, Debug)]
struct RoleArgs {
    service: String,
    deployment: String,
    role: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    if let Command::Fingerprint { cert } = command {
        println!("{}", az_vm::cert::fingerprint(&cert)?);
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    let orchestrator = Orchestrator::from_client(config.management_client()?);

    match command {
        Command::CreateVm(args) => create_vm(&orchestrator, args).await?,
        Command::CreateHostedService { dns_name, location } => {
            orchestrator
                .create_hosted_service(&dns_name, &location)
                .await?
        }
        Command::DeleteHostedService { dns_name } => {
            orchestrator.delete_hosted_service(&dns_name).await?
        }
        Command::GetDeployment {
            service,
            deployment,
        } => print_json(&orchestrator.get_deployment(&service, &deployment).await?)?,
        Command::DeleteDeployment {
            service,
            deployment,
        } => orchestrator.delete_deployment(&service, &deployment).await?,
        Command::GetRole(r) => {
            print_json(&orchestrator.get_role(&r.service, &r.deployment, &r.role).await?)?
        }
        Command::StartRole(r) => {
            orchestrator
                .start_role(&r.service, &r.deployment, &r.role)
                .await?
        }
        Command::ShutdownRole(r) => {
            orchestrator
                .shutdown_role(&r.service, &r.deployment, &r.role)
                .await?
        }
        Command::RestartRole(r) => {
            orchestrator
                .restart_role(&r.service, &r.deployment, &r.role)
                .await?
        }
        Command::DeleteRole(r) => {
            orchestrator
                .delete_role(&r.service, &r.deployment, &r.role)
                .await?
        }
        Command::UploadCert { dns_name, cert } => {
            orchestrator.upload_certificate(&dns_name, &cert).await?
        }
        Command::Fingerprint { .. } => {}
    }
    Ok(())
}

async fn create_vm(orchestrator: &Orchestrator, args: CreateVmArgs) -> Result<()> {
    let mut role = orchestrator
        .create_vm_configuration(&args.name, &args.size, &args.image, &args.location)
        .await?;

    orchestrator.add_linux_provisioning_config(
        &mut role,
        &args.user,
        &args.password,
        args.cert.as_deref(),
    )?;

    if let Some(cert_dir) = &args.docker_cert_dir {
        orchestrator.set_docker_extension(
            &mut role,
            cert_dir,
            args.docker_port,
            args.docker_version.as_deref(),
        )?;
    }

    let dns_name = args.dns_name.as_deref().unwrap_or(&args.name);
    orchestrator.create_vm(role, dns_name, &args.location).await?;

    tracing::info!(vm = %args.name, host = %format!("{dns_name}.cloudapp.net"), "VM created");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
