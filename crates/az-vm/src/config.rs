//! Builders for the configuration sets and extensions attached to a role.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::cert::{encode_base64, encode_file_base64, ssh_config};
use crate::types::{
    ConfigurationSet, Endpoint, ExtensionParameter, ExtensionReference,
    LinuxProvisioningConfiguration, NetworkConfiguration, OsKind, ParameterKind, Role,
};
use crate::{Error, Result};

pub const SSH_PORT: u16 = 22;
pub const DEFAULT_DOCKER_PORT: u16 = 2376;

pub const DOCKER_EXTENSION_NAME: &str = "DockerExtension";
pub const DOCKER_EXTENSION_PUBLISHER: &str = "MSOpenTech.Extensions";
pub const DOCKER_EXTENSION_VERSION: &str = "0.3";
const EXTENSION_ENABLED: &str = "enable";

// The service only reads the parameter type; the key is required but unused.
const PARAMETER_KEY: &str = "ignored";

// The service rejects an empty password even when password login is disabled.
const PLACEHOLDER_PASSWORD: &str = "P@ssword1";

const DOCKER_CERT_FILES: [&str; 3] = ["ca.pem", "server-cert.pem", "server-key.pem"];

/// Network configuration seeded with the endpoints an OS needs for access.
pub fn network_config(os: OsKind) -> Result<ConfigurationSet> {
    let mut network = NetworkConfiguration::default();
    match os {
        OsKind::Linux => network.add_endpoint(Endpoint::tcp("ssh", SSH_PORT))?,
        OsKind::Windows => {
            return Err(Error::Unsupported("remote desktop endpoint for Windows roles"));
        }
    }
    Ok(ConfigurationSet::Network(network))
}

/// Linux provisioning configuration.
///
/// An empty `password` disables SSH password login. A `cert_path` adds the
/// certificate as an SSH public key for `user_name`.
pub fn linux_provisioning_config(
    host_name: &str,
    user_name: &str,
    password: &str,
    cert_path: Option<&Path>,
) -> Result<ConfigurationSet> {
    let (user_password, disable_ssh_password_authentication) = if password.is_empty() {
        (PLACEHOLDER_PASSWORD.to_string(), true)
    } else {
        (password.to_string(), false)
    };

    let ssh = match cert_path.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => Some(ssh_config(path, user_name)?),
        None => None,
    };

    Ok(ConfigurationSet::LinuxProvisioning(
        LinuxProvisioningConfiguration {
            host_name: host_name.to_string(),
            user_name: user_name.to_string(),
            user_password,
            disable_ssh_password_authentication,
            ssh,
        },
    ))
}

/// Open `port` for the docker daemon on the role's network configuration.
pub fn add_docker_endpoint(sets: &mut [ConfigurationSet], port: u16) -> Result<()> {
    if sets.is_empty() {
        return Err(Error::ProvisioningConfigMissing);
    }

    let network = sets
        .iter_mut()
        .find_map(|s| match s {
            ConfigurationSet::Network(n) => Some(n),
            _ => None,
        })
        .ok_or(Error::ProvisioningConfigMissing)?;

    network.add_endpoint(Endpoint::tcp("docker", port))
}

/// Extension reference with base64-encoded public and private settings.
/// Empty settings are left out.
pub fn extension_reference(
    name: &str,
    publisher: &str,
    version: &str,
    reference_name: &str,
    state: &str,
    public_config: &str,
    private_config: &str,
) -> ExtensionReference {
    let parameters = [
        (ParameterKind::Private, private_config),
        (ParameterKind::Public, public_config),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(kind, value)| ExtensionParameter {
        key: PARAMETER_KEY.to_string(),
        value: encode_base64(value.as_bytes()),
        kind,
    })
    .collect();

    ExtensionReference {
        name: name.to_string(),
        publisher: publisher.to_string(),
        version: version.to_string(),
        reference_name: reference_name.to_string(),
        state: state.to_string(),
        parameters,
    }
}

/// Public and private settings of the docker extension, as JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerExtensionConfig {
    pub public: String,
    pub private: String,
}

/// Docker extension settings from the TLS bundle in `~/<cert_dir>`.
pub fn docker_extension_config(cert_dir: &Path, port: u16) -> Result<DockerExtensionConfig> {
    let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
    docker_extension_config_in(&home, cert_dir, port)
}

pub(crate) fn docker_extension_config_in(
    home: &Path,
    cert_dir: &Path,
    port: u16,
) -> Result<DockerExtensionConfig> {
    // Always under home, even for `/.docker`.
    let relative: PathBuf = cert_dir
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    let dir = home.join(relative);
    if !dir.is_dir() {
        return Err(Error::DockerCertsMissing(dir));
    }
    info!(dir = %dir.display(), "using docker certificates");

    let [ca, server_cert, server_key] = DOCKER_CERT_FILES;
    let private = serde_json::json!({
        "ca": encode_file_base64(&dir.join(ca))?,
        "server-cert": encode_file_base64(&dir.join(server_cert))?,
        "server-key": encode_file_base64(&dir.join(server_key))?,
    });
    let public = serde_json::json!({ "dockerport": port.to_string() });

    Ok(DockerExtensionConfig {
        public: public.to_string(),
        private: private.to_string(),
    })
}

// ── Role attachment ──────────────────────────────────────────────────

/// Replace the role's configuration sets with Linux provisioning plus an
/// SSH-only network configuration.
pub fn attach_linux_provisioning(
    role: &mut Role,
    user_name: &str,
    password: &str,
    cert_path: Option<&Path>,
) -> Result<()> {
    info!(role = %role.name, user = user_name, "adding linux provisioning configuration");

    let provisioning = linux_provisioning_config(&role.name, user_name, password, cert_path)?;
    let network = network_config(OsKind::Linux)?;
    role.configuration_sets = vec![provisioning, network];

    if let Some(path) = cert_path.filter(|p| !p.as_os_str().is_empty()) {
        role.use_cert_auth = true;
        role.cert_path = Some(path.to_path_buf());
    }
    Ok(())
}

pub fn attach_extension(role: &mut Role, extension: ExtensionReference) {
    info!(role = %role.name, extension = %extension.name, "setting VM extension");
    role.extensions.push(extension);
}

/// Open the docker port and attach the docker extension configured from
/// the TLS bundle in `~/<cert_dir>`.
pub fn attach_docker_extension(
    role: &mut Role,
    cert_dir: &Path,
    port: u16,
    version: Option<&str>,
) -> Result<()> {
    let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
    attach_docker_extension_in(role, &home, cert_dir, port, version)
}

fn attach_docker_extension_in(
    role: &mut Role,
    home: &Path,
    cert_dir: &Path,
    port: u16,
    version: Option<&str>,
) -> Result<()> {
    // Build everything before touching the role so a failure leaves it as is.
    let config = docker_extension_config_in(home, cert_dir, port)?;
    let mut sets = role.configuration_sets.clone();
    add_docker_endpoint(&mut sets, port)?;

    let extension = extension_reference(
        DOCKER_EXTENSION_NAME,
        DOCKER_EXTENSION_PUBLISHER,
        version
            .filter(|v| !v.is_empty())
            .unwrap_or(DOCKER_EXTENSION_VERSION),
        DOCKER_EXTENSION_NAME,
        EXTENSION_ENABLED,
        &config.public,
        &config.private,
    );

    role.configuration_sets = sets;
    attach_extension(role, extension);
    Ok(())
}
