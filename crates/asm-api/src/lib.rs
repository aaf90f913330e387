//! Typed Rust client for the Azure Service Management REST API.
//!
//! Covers the subset needed for provisioning classic VMs: raw document
//! submission (post, delete, get), async operation polling, and the
//! catalog lookups used to validate inputs (locations, OS images,
//! storage services).
//!
//! Authentication is configured on the `reqwest::Client` handed to
//! [`ManagementClient::new`] (typically a management certificate identity).

mod types;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use types::*;

const BASE_URL: &str = "https://management.core.windows.net";
const API_VERSION: &str = "2014-06-01";
const REQUEST_ID_HEADER: &str = "x-ms-request-id";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("management api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("management api {path} returned {status}: {body}")]
    Api {
        path: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to serialize request document: {0}")]
    Serialize(#[from] quick_xml::SeError),

    #[error("failed to parse response document: {0}")]
    Deserialize(#[from] quick_xml::DeError),

    #[error("management api {path} did not return a request id")]
    MissingRequestId { path: String },

    #[error("operation {request_id} still in progress after {waited:?}")]
    OperationTimeout {
        request_id: RequestId,
        waited: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Serialize a document to XML bytes, using the type's own root element.
pub fn to_xml<T: Serialize>(doc: &T) -> Result<Vec<u8>> {
    Ok(quick_xml::se::to_string(doc)?.into_bytes())
}

/// Serialize a document under an explicit root element name.
pub fn to_xml_with_root<T: Serialize>(root: &str, doc: &T) -> Result<Vec<u8>> {
    Ok(quick_xml::se::to_string_with_root(root, doc)?.into_bytes())
}

/// Parse an XML response body.
pub fn from_xml<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(quick_xml::de::from_reader(bytes)?)
}

/// Client for the Service Management REST API of one subscription.
#[derive(Clone)]
pub struct ManagementClient {
    subscription_id: String,
    base_url: String,
    http: reqwest::Client,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl ManagementClient {
    pub fn new(subscription_id: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            base_url: BASE_URL.to_string(),
            http,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Point the client at a different management endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override how often and how long [`Self::wait_for_operation`] polls.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.base_url.trim_end_matches('/'),
            self.subscription_id
        )
    }

    async fn check(resp: reqwest::Response, path: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                path: path.to_string(),
                status,
                body,
            });
        }
        Ok(resp)
    }

    fn request_id(resp: &reqwest::Response, path: &str) -> Result<RequestId> {
        resp.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| RequestId(v.to_string()))
            .ok_or_else(|| Error::MissingRequestId {
                path: path.to_string(),
            })
    }

    // ── Raw documents ───────────────────────────────────────────────

    /// Submit a document and return the handle of the operation it started.
    pub async fn post(&self, path: &str, body: Vec<u8>) -> Result<RequestId> {
        let resp = self
            .http
            .post(self.url(path))
            .header("x-ms-version", API_VERSION)
            .header("Content-Type", "application/xml")
            .body(body)
            .send()
            .await?;

        let resp = Self::check(resp, path).await?;
        Self::request_id(&resp, path)
    }

    pub async fn delete(&self, path: &str) -> Result<RequestId> {
        let resp = self
            .http
            .delete(self.url(path))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        let resp = Self::check(resp, path).await?;
        Self::request_id(&resp, path)
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(self.url(path))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        let body = Self::check(resp, path).await?.bytes().await?;
        Ok(body.to_vec())
    }

    // ── Operations ──────────────────────────────────────────────────

    pub async fn get_operation(&self, request_id: &RequestId) -> Result<Operation> {
        let body = self.get(&format!("operations/{request_id}")).await?;
        from_xml(&body)
    }

    /// Poll an operation until the service reports it terminal.
    ///
    /// A `Failed` status is returned as a normal `Operation`; only transport
    /// problems and the poll timeout are errors here.
    pub async fn wait_for_operation(&self, request_id: &RequestId) -> Result<Operation> {
        let started = tokio::time::Instant::now();
        loop {
            let operation = self.get_operation(request_id).await?;
            if operation.status() != OperationStatus::InProgress {
                tracing::debug!(%request_id, status = %operation.status, "operation finished");
                return Ok(operation);
            }

            let waited = started.elapsed();
            if waited >= self.poll_timeout {
                return Err(Error::OperationTimeout {
                    request_id: request_id.clone(),
                    waited,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    // ── Catalog ─────────────────────────────────────────────────────

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        let body = self.get("locations").await?;
        Ok(from_xml::<Locations>(&body)?.locations)
    }

    pub async fn list_os_images(&self) -> Result<Vec<OsImage>> {
        let body = self.get("services/images").await?;
        Ok(from_xml::<OsImages>(&body)?.images)
    }

    // ── Storage services ────────────────────────────────────────────

    pub async fn list_storage_services(&self) -> Result<Vec<StorageService>> {
        let body = self.get("services/storageservices").await?;
        Ok(from_xml::<StorageServices>(&body)?.services)
    }

    pub async fn get_storage_service(&self, name: &str) -> Result<StorageService> {
        let body = self.get(&format!("services/storageservices/{name}")).await?;
        from_xml(&body)
    }

    pub async fn create_storage_service(&self, req: &CreateStorageService) -> Result<RequestId> {
        self.post("services/storageservices", to_xml(req)?).await
    }
}
