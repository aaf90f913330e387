use std::env;
use std::path::PathBuf;
use std::time::Duration;

use asm_api::ManagementClient;

use crate::error::{CliError, Result};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub subscription_id: String,
    /// PEM file holding the management certificate and its private key.
    pub management_cert: PathBuf,
    pub management_url: Option<String>,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(CliError::MissingEnv(name))
        };
        let secs = |name: &'static str, default: u64| -> Result<Duration> {
            match lookup(name) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => value
                    .parse()
                    .map(Duration::from_secs)
                    .map_err(|_| CliError::InvalidEnv { name, value }),
            }
        };

        Ok(Self {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            management_cert: required("AZURE_MANAGEMENT_CERT")?.into(),
            management_url: lookup("AZURE_MANAGEMENT_URL").filter(|v| !v.is_empty()),
            poll_interval: secs("AZURE_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            poll_timeout: secs("AZURE_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
        })
    }

    /// Management client authenticated with the configured certificate.
    pub fn management_client(&self) -> Result<ManagementClient> {
        let pem = std::fs::read(&self.management_cert).map_err(|source| CliError::Io {
            path: self.management_cert.clone(),
            source,
        })?;
        let identity = reqwest::Identity::from_pem(&pem)?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .build()?;

        let mut client = ManagementClient::new(&self.subscription_id, http)
            .with_polling(self.poll_interval, self.poll_timeout);
        if let Some(url) = &self.management_url {
            client = client.with_base_url(url);
        }
        tracing::debug!(subscription = client.subscription_id(), "management client ready");
        Ok(client)
    }
}
