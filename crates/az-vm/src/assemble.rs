//! Assembly of the documents submitted when a VM is created.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::Result;
use crate::cert::encode_base64;
use crate::collaborators::{ImageResolver, LocationResolver, StorageResolver};
use crate::types::{Deployment, DeploymentSlot, HostedService, OsVirtualHardDisk, Role};

const VHD_CONTAINER: &str = "vhds";
const STORAGE_NAME_PREFIX: &str = "portalvhds";

// Storage account names are limited to 24 lowercase alphanumerics.
const STORAGE_NAME_RANDOM_LEN: usize = 12;

/// Builds roles against live location, image, and storage lookups.
#[derive(Clone)]
pub struct Assembler {
    locations: Arc<dyn LocationResolver>,
    images: Arc<dyn ImageResolver>,
    storage: Arc<dyn StorageResolver>,
}

impl Assembler {
    pub fn new(
        locations: Arc<dyn LocationResolver>,
        images: Arc<dyn ImageResolver>,
        storage: Arc<dyn StorageResolver>,
    ) -> Self {
        Self {
            locations,
            images,
            storage,
        }
    }

    pub async fn resolve_location(&self, location: &str) -> Result<()> {
        self.locations.resolve_location(location).await
    }

    /// Base role for a new VM: the image is checked and its OS disk is
    /// placed in a storage account in `location`, created if none exists.
    pub async fn vm_role(&self, name: &str, size: &str, image: &str, location: &str) -> Result<Role> {
        self.locations.resolve_location(location).await?;
        self.images.resolve_image(image).await?;

        let endpoint = self.storage_endpoint(location).await?;
        let os_disk = OsVirtualHardDisk {
            source_image_name: image.to_string(),
            media_link: media_link(&endpoint, name, Utc::now()),
        };

        Ok(Role::new(name, size, os_disk))
    }

    async fn storage_endpoint(&self, location: &str) -> Result<String> {
        let account = match self.storage.find_by_location(location).await? {
            Some(account) => account,
            None => {
                let name = storage_service_name();
                info!(storage = %name, location, "no storage service in location");
                self.storage.create(&name, location).await?
            }
        };
        self.storage.blob_endpoint(&account).await
    }
}

/// `<blob-endpoint>/vhds/<name>-<YYYYMMDDhhmmss>.vhd`, timestamp in UTC.
pub fn media_link(blob_endpoint: &str, name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{VHD_CONTAINER}/{name}-{}.vhd",
        blob_endpoint.trim_end_matches('/'),
        at.format("%Y%m%d%H%M%S")
    )
}

/// `portalvhds` followed by 12 random lowercase hex characters.
pub fn storage_service_name() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{STORAGE_NAME_PREFIX}{}",
        &random[random.len() - STORAGE_NAME_RANDOM_LEN..]
    )
}

/// Single-role production deployment named and labelled after the role.
pub fn deployment(role: Role) -> Deployment {
    Deployment {
        name: role.name.clone(),
        label: role.name.clone(),
        slot: DeploymentSlot::Production,
        roles: vec![role],
    }
}

pub fn hosted_service(dns_name: &str, location: &str) -> HostedService {
    HostedService {
        service_name: dns_name.to_string(),
        label: encode_base64(dns_name.as_bytes()),
        location: location.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Error;
    use crate::types::StorageAccount;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    pub(crate) const BLOB_ENDPOINT: &str = "https://portalvhdsabc.blob.core.windows.net/";

    /// Resolves a fixed set of names and records created storage accounts.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub locations: Vec<&'static str>,
        pub images: Vec<&'static str>,
        pub storage: Option<StorageAccount>,
        pub created: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        pub(crate) fn west_us() -> Self {
            Self {
                locations: vec!["West US"],
                images: vec!["ImgA"],
                storage: Some(StorageAccount {
                    name: "portalvhdsabc".into(),
                    location: "West US".into(),
                }),
                created: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LocationResolver for FakeCatalog {
        async fn resolve_location(&self, location: &str) -> Result<()> {
            if self.locations.contains(&location) {
                Ok(())
            } else {
                Err(Error::Resolution {
                    kind: "location",
                    name: location.to_string(),
                })
            }
        }
    }

    #[async_trait]
    impl ImageResolver for FakeCatalog {
        async fn resolve_image(&self, image: &str) -> Result<()> {
            if self.images.contains(&image) {
                Ok(())
            } else {
                Err(Error::Resolution {
                    kind: "image",
                    name: image.to_string(),
                })
            }
        }
    }

    #[async_trait]
    impl StorageResolver for FakeCatalog {
        async fn find_by_location(&self, location: &str) -> Result<Option<StorageAccount>> {
            Ok(self.storage.clone().filter(|s| s.location == location))
        }

        async fn create(&self, name: &str, location: &str) -> Result<StorageAccount> {
            self.created.lock().unwrap().push(name.to_string());
            Ok(StorageAccount {
                name: name.to_string(),
                location: location.to_string(),
            })
        }

        async fn blob_endpoint(&self, _account: &StorageAccount) -> Result<String> {
            Ok(BLOB_ENDPOINT.to_string())
        }
    }

    pub(crate) fn assembler(catalog: Arc<FakeCatalog>) -> Assembler {
        Assembler::new(catalog.clone(), catalog.clone(), catalog)
    }

    fn assert_media_link(link: &str, name: &str) {
        let prefix = format!("https://portalvhdsabc.blob.core.windows.net/vhds/{name}-");
        let stamp = link
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".vhd"))
            .unwrap_or_else(|| panic!("unexpected media link {link}"));
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_media_link_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(
            media_link(BLOB_ENDPOINT, "myvm", at),
            "https://portalvhdsabc.blob.core.windows.net/vhds/myvm-20240305070809.vhd"
        );
        assert_eq!(
            media_link("https://acct.blob.core.windows.net", "myvm", at),
            "https://acct.blob.core.windows.net/vhds/myvm-20240305070809.vhd"
        );
    }

    #[test]
    fn test_storage_service_name() {
        let name = storage_service_name();
        assert_eq!(name.len(), 22);
        assert!(name.starts_with("portalvhds"));
        assert!(
            name.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
        assert_ne!(storage_service_name(), name);
    }

    #[test]
    fn test_deployment_and_hosted_service() {
        let role = Role::new(
            "myvm",
            "Small",
            OsVirtualHardDisk {
                source_image_name: "ImgA".into(),
                media_link: String::new(),
            },
        );
        let deployment = deployment(role);
        assert_eq!(deployment.name, "myvm");
        assert_eq!(deployment.label, "myvm");
        assert_eq!(deployment.slot, DeploymentSlot::Production);
        assert_eq!(deployment.roles.len(), 1);

        let service = hosted_service("myvm", "West US");
        assert_eq!(service.label, "bXl2bQ==");
        assert_eq!(service.location, "West US");
    }

    #[tokio::test]
    async fn test_vm_role_with_existing_storage() {
        let catalog = Arc::new(FakeCatalog::west_us());
        let role = assembler(catalog.clone())
            .vm_role("myvm", "Small", "ImgA", "West US")
            .await
            .unwrap();

        assert_eq!(role.os_disk.source_image_name, "ImgA");
        assert_eq!(role.size, "Small");
        assert!(!role.use_cert_auth);
        assert_media_link(&role.os_disk.media_link, "myvm");
        assert!(catalog.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vm_role_creates_storage_when_missing() {
        let catalog = Arc::new(FakeCatalog {
            storage: None,
            ..FakeCatalog::west_us()
        });
        let role = assembler(catalog.clone())
            .vm_role("myvm", "Small", "ImgA", "West US")
            .await
            .unwrap();

        let created = catalog.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("portalvhds"));
        assert_media_link(&role.os_disk.media_link, "myvm");
    }

    #[tokio::test]
    async fn test_vm_role_unknown_image() {
        let catalog = Arc::new(FakeCatalog::west_us());
        let err = assembler(catalog)
            .vm_role("myvm", "Small", "ImgB", "West US")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { kind: "image", .. }));
    }

    #[tokio::test]
    async fn test_vm_role_unknown_location() {
        let catalog = Arc::new(FakeCatalog::west_us());
        let err = assembler(catalog)
            .vm_role("myvm", "Small", "ImgA", "Mars")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { kind: "location", .. }));
    }
}
