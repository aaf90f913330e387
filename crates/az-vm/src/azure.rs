use asm_api::{CreateStorageService, ManagementClient, Operation, RequestId, XMLNS};
use async_trait::async_trait;
use tracing::info;

use crate::cert::encode_base64;
use crate::collaborators::{ImageResolver, LocationResolver, StorageResolver, Transport};
use crate::types::StorageAccount;
use crate::{Error, Result, check_operation};

/// Service Management API backend for every collaborator trait.
///
/// Delegates to `asm_api::ManagementClient` for all HTTP calls.
#[derive(Clone)]
pub struct AzureManagement {
    client: ManagementClient,
}

impl AzureManagement {
    pub fn new(client: ManagementClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LocationResolver for AzureManagement {
    async fn resolve_location(&self, location: &str) -> Result<()> {
        let locations = self.client.list_locations().await?;
        if locations.iter().any(|l| l.name == location) {
            return Ok(());
        }
        Err(Error::Resolution {
            kind: "location",
            name: location.to_string(),
        })
    }
}

#[async_trait]
impl ImageResolver for AzureManagement {
    async fn resolve_image(&self, image: &str) -> Result<()> {
        let images = self.client.list_os_images().await?;
        if images.iter().any(|i| i.name == image) {
            return Ok(());
        }
        Err(Error::Resolution {
            kind: "image",
            name: image.to_string(),
        })
    }
}

#[async_trait]
impl StorageResolver for AzureManagement {
    async fn find_by_location(&self, location: &str) -> Result<Option<StorageAccount>> {
        let services = self.client.list_storage_services().await?;
        Ok(services
            .into_iter()
            .find(|s| s.location() == Some(location))
            .map(|s| StorageAccount {
                name: s.service_name,
                location: location.to_string(),
            }))
    }

    async fn create(&self, name: &str, location: &str) -> Result<StorageAccount> {
        info!(storage = name, location, "creating storage service");

        let request_id = self
            .client
            .create_storage_service(&CreateStorageService {
                xmlns: XMLNS.to_string(),
                service_name: name.to_string(),
                label: encode_base64(name.as_bytes()),
                location: location.to_string(),
            })
            .await?;
        let operation = self.client.wait_for_operation(&request_id).await?;
        check_operation(&request_id, operation)?;

        info!(storage = name, "storage service created");
        Ok(StorageAccount {
            name: name.to_string(),
            location: location.to_string(),
        })
    }

    async fn blob_endpoint(&self, account: &StorageAccount) -> Result<String> {
        let service = self.client.get_storage_service(&account.name).await?;
        service
            .blob_endpoint()
            .map(str::to_string)
            .ok_or_else(|| Error::MissingBlobEndpoint(account.name.clone()))
    }
}

#[async_trait]
impl Transport for AzureManagement {
    async fn post(&self, path: &str, body: Vec<u8>) -> asm_api::Result<RequestId> {
        self.client.post(path, body).await
    }

    async fn delete(&self, path: &str) -> asm_api::Result<RequestId> {
        self.client.delete(path).await
    }

    async fn get(&self, path: &str) -> asm_api::Result<Vec<u8>> {
        self.client.get(path).await
    }

    async fn await_completion(&self, request_id: &RequestId) -> asm_api::Result<Operation> {
        self.client.wait_for_operation(request_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn azure(server: &MockServer) -> AzureManagement {
        AzureManagement::new(
            ManagementClient::new("sub-1", reqwest::Client::new())
                .with_base_url(server.uri())
                .with_polling(Duration::from_millis(5), Duration::from_millis(200)),
        )
    }

    async fn mount_get(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    const STORAGE_SERVICES: &str = r#"<StorageServices xmlns="http://schemas.microsoft.com/windowsazure">
        <StorageService>
          <ServiceName>eastacct</ServiceName>
          <StorageServiceProperties><Location>East US</Location></StorageServiceProperties>
        </StorageService>
        <StorageService>
          <ServiceName>westacct</ServiceName>
          <StorageServiceProperties><Location>West US</Location></StorageServiceProperties>
        </StorageService>
      </StorageServices>"#;

    #[tokio::test]
    async fn test_resolve_location_and_image() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/sub-1/locations",
            "<Locations><Location><Name>West US</Name></Location></Locations>",
        )
        .await;
        mount_get(
            &server,
            "/sub-1/services/images",
            "<Images><OSImage><Name>ImgA</Name><OS>Linux</OS></OSImage></Images>",
        )
        .await;
        let azure = azure(&server);

        azure.resolve_location("West US").await.unwrap();
        azure.resolve_image("ImgA").await.unwrap();

        let err = azure.resolve_location("west us").await.unwrap_err();
        assert!(matches!(err, Error::Resolution { kind: "location", .. }));
        let err = azure.resolve_image("ImgB").await.unwrap_err();
        assert!(matches!(err, Error::Resolution { kind: "image", .. }));
    }

    #[tokio::test]
    async fn test_find_storage_by_location() {
        let server = MockServer::start().await;
        mount_get(&server, "/sub-1/services/storageservices", STORAGE_SERVICES).await;
        let azure = azure(&server);

        let account = azure.find_by_location("West US").await.unwrap().unwrap();
        assert_eq!(account.name, "westacct");
        assert!(azure.find_by_location("North Europe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blob_endpoint_missing() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/sub-1/services/storageservices/westacct",
            "<StorageService><ServiceName>westacct</ServiceName></StorageService>",
        )
        .await;

        let account = StorageAccount {
            name: "westacct".into(),
            location: "West US".into(),
        };
        let err = azure(&server).blob_endpoint(&account).await.unwrap_err();
        assert!(matches!(err, Error::MissingBlobEndpoint(name) if name == "westacct"));
    }

    #[tokio::test]
    async fn test_create_storage_waits_for_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sub-1/services/storageservices"))
            .and(body_string_contains("<ServiceName>portalvhds1</ServiceName>"))
            .respond_with(ResponseTemplate::new(202).insert_header("x-ms-request-id", "req-7"))
            .expect(1)
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/sub-1/operations/req-7",
            "<Operation><ID>req-7</ID><Status>Succeeded</Status></Operation>",
        )
        .await;

        let account = azure(&server)
            .create("portalvhds1", "West US")
            .await
            .unwrap();
        assert_eq!(account.name, "portalvhds1");
        assert_eq!(account.location, "West US");
    }

    #[tokio::test]
    async fn test_create_storage_failed_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sub-1/services/storageservices"))
            .respond_with(ResponseTemplate::new(202).insert_header("x-ms-request-id", "req-8"))
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/sub-1/operations/req-8",
            "<Operation><ID>req-8</ID><Status>Failed</Status>\
             <Error><Code>StorageAccountAlreadyExists</Code><Message>taken</Message></Error></Operation>",
        )
        .await;

        let err = azure(&server)
            .create("portalvhds1", "West US")
            .await
            .unwrap_err();
        match err {
            Error::OperationFailed {
                request_id, code, ..
            } => {
                assert_eq!(request_id, RequestId("req-8".into()));
                assert_eq!(code, "StorageAccountAlreadyExists");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
