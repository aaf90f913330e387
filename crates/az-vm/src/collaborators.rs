//! Services the provisioning core depends on but does not own.
//!
//! [`crate::azure::AzureManagement`] implements all of them on top of the
//! Service Management API; tests substitute in-memory fakes.

use asm_api::{Operation, RequestId};
use async_trait::async_trait;

use crate::Result;
use crate::types::StorageAccount;

#[async_trait]
pub trait LocationResolver: Send + Sync + 'static {
    /// Fail with [`crate::Error::Resolution`] if the location is unknown.
    async fn resolve_location(&self, location: &str) -> Result<()>;
}

#[async_trait]
pub trait ImageResolver: Send + Sync + 'static {
    /// Fail with [`crate::Error::Resolution`] if the image is unknown.
    async fn resolve_image(&self, image: &str) -> Result<()>;
}

#[async_trait]
pub trait StorageResolver: Send + Sync + 'static {
    /// First storage account in `location`, if any.
    async fn find_by_location(&self, location: &str) -> Result<Option<StorageAccount>>;

    /// Create a storage account and wait until it exists.
    async fn create(&self, name: &str, location: &str) -> Result<StorageAccount>;

    async fn blob_endpoint(&self, account: &StorageAccount) -> Result<String>;
}

/// Raw access to the management API.
///
/// Mutating calls return the handle of the asynchronous operation they
/// started; [`Transport::await_completion`] polls it until it is terminal.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, path: &str, body: Vec<u8>) -> asm_api::Result<RequestId>;

    async fn delete(&self, path: &str) -> asm_api::Result<RequestId>;

    async fn get(&self, path: &str) -> asm_api::Result<Vec<u8>>;

    async fn await_completion(&self, request_id: &RequestId) -> asm_api::Result<Operation>;
}
