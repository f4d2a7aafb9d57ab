//! Filesystem resource service.
//!
//! Directory structure:
//! ```text
//! root_path/
//! └── <tenant>/
//!     └── identity/
//!         └── email/
//!             ├── .properties.json          collection properties
//!             └── passwordreset/
//!                 ├── .properties.json
//!                 ├── en_us                 leaf content
//!                 └── .en_us.properties.json
//! ```
//!
//! Names beginning with `.` are reserved for property sidecars and are never
//! reported as children.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::tenant::TenantKey;

use super::{
    normalize_path, Resource, ResourceError, ResourceKind, ResourceService, PATH_SEPARATOR,
};

const COLLECTION_PROPERTIES: &str = ".properties.json";

pub struct FileSystemResourceService {
    root_path: PathBuf,
}

impl FileSystemResourceService {
    /// Create the service, creating the root directory if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let root_path = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root_path).await?;
        Ok(Self { root_path })
    }

    fn tenant_dir(&self, tenant: &TenantKey) -> PathBuf {
        self.root_path.join(tenant_dir_name(tenant.as_str()))
    }

    fn resolve(&self, tenant: &TenantKey, path: &str) -> Result<PathBuf, ResourceError> {
        let path = normalize_path(path)?;
        let mut resolved = self.tenant_dir(tenant);
        for segment in path.split(PATH_SEPARATOR) {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn leaf_properties_file(file: &Path) -> PathBuf {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file.with_file_name(format!(".{}.properties.json", name))
    }

    async fn read_properties(file: &Path) -> Result<BTreeMap<String, String>, ResourceError> {
        match fs::read_to_string(file).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_properties(
        file: &Path,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), ResourceError> {
        let json = serde_json::to_string_pretty(properties)?;
        fs::write(file, json).await?;
        Ok(())
    }

    async fn remove(target: &Path) -> Result<(), ResourceError> {
        match fs::metadata(target).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(target).await?,
            Ok(_) => {
                fs::remove_file(target).await?;
                let sidecar = Self::leaf_properties_file(target);
                if let Err(e) = fs::remove_file(&sidecar).await {
                    if e.kind() != ErrorKind::NotFound {
                        return Err(e.into());
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceService for FileSystemResourceService {
    fn backend_type(&self) -> &'static str {
        "filesystem"
    }

    async fn get(&self, tenant: &TenantKey, path: &str) -> Result<Option<Resource>, ResourceError> {
        let target = self.resolve(tenant, path)?;

        let meta = match fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            let properties = Self::read_properties(&target.join(COLLECTION_PROPERTIES)).await?;
            Ok(Some(Resource {
                kind: ResourceKind::Collection,
                properties,
                content: None,
            }))
        } else {
            let content = fs::read(&target).await?;
            let properties = Self::read_properties(&Self::leaf_properties_file(&target)).await?;
            Ok(Some(Resource {
                kind: ResourceKind::Leaf,
                properties,
                content: Some(content),
            }))
        }
    }

    async fn put(
        &self,
        tenant: &TenantKey,
        path: &str,
        resource: Resource,
    ) -> Result<(), ResourceError> {
        let target = self.resolve(tenant, path)?;

        // A leaf and a collection cannot share a path
        if let Ok(meta) = fs::metadata(&target).await {
            let is_dir = meta.is_dir();
            if is_dir != resource.is_collection() {
                Self::remove(&target).await?;
            }
        }

        match resource.kind {
            ResourceKind::Collection => {
                fs::create_dir_all(&target).await?;
                Self::write_properties(&target.join(COLLECTION_PROPERTIES), &resource.properties)
                    .await?;
            }
            ResourceKind::Leaf => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&target, resource.content.unwrap_or_default()).await?;
                Self::write_properties(&Self::leaf_properties_file(&target), &resource.properties)
                    .await?;
            }
        }

        tracing::trace!(tenant = %tenant, path = %path, "Resource written");
        Ok(())
    }

    async fn delete(&self, tenant: &TenantKey, path: &str) -> Result<(), ResourceError> {
        let target = self.resolve(tenant, path)?;
        Self::remove(&target).await
    }

    async fn exists(&self, tenant: &TenantKey, path: &str) -> Result<bool, ResourceError> {
        let target = self.resolve(tenant, path)?;
        Ok(fs::try_exists(&target).await?)
    }

    async fn children(&self, tenant: &TenantKey, path: &str) -> Result<Vec<String>, ResourceError> {
        let normalized = normalize_path(path)?;
        let target = self.resolve(tenant, &normalized)?;

        match fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        let mut entries = fs::read_dir(&target).await?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with('.') {
                    continue;
                }
                children.push(format!("{}{}{}", normalized, PATH_SEPARATOR, name));
            }
        }

        children.sort();
        Ok(children)
    }
}

/// Percent-encode a tenant key into a single directory name.
///
/// Distinct keys always map to distinct names. Dots are kept unless the key
/// is made of dots only.
fn tenant_dir_name(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    let dots_only = key.bytes().all(|b| b == b'.');
    let mut name = String::with_capacity(key.len());
    for b in key.bytes() {
        let keep = b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (b == b'.' && !dots_only);
        if keep {
            name.push(b as char);
        } else {
            name.push_str(&format!("%{:02X}", b));
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn service() -> (TempDir, FileSystemResourceService) {
        let dir = TempDir::new().unwrap();
        let service = FileSystemResourceService::new(dir.path()).await.unwrap();
        (dir, service)
    }

    #[tokio::test]
    async fn test_leaf_round_trip_with_properties() {
        let (_dir, service) = service().await;
        let tenant = TenantKey::super_tenant();

        let leaf = Resource::leaf("[\"s\",\"b\",\"f\"]")
            .with_property("locale", "en_US")
            .with_property("type", "passwordreset");
        service
            .put(&tenant, "identity/email/passwordreset/en_us", leaf.clone())
            .await
            .unwrap();

        let loaded = service
            .get(&tenant, "identity/email/passwordreset/en_us")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, leaf);

        let parent = service
            .get(&tenant, "identity/email/passwordreset")
            .await
            .unwrap()
            .unwrap();
        assert!(parent.is_collection());
    }

    #[tokio::test]
    async fn test_children_skip_sidecars() {
        let (_dir, service) = service().await;
        let tenant = TenantKey::new("t1");

        service
            .put(
                &tenant,
                "identity/sms/otp",
                Resource::collection().with_property("templateName", "otp"),
            )
            .await
            .unwrap();
        service
            .put(&tenant, "identity/sms/otp/en_us", Resource::leaf("[\"b\"]"))
            .await
            .unwrap();

        assert_eq!(
            service.children(&tenant, "identity/sms/otp").await.unwrap(),
            vec!["identity/sms/otp/en_us".to_string()]
        );
        assert!(service.children(&tenant, "identity/email").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_collection_recursively() {
        let (_dir, service) = service().await;
        let tenant = TenantKey::new("t1");
        service
            .put(&tenant, "identity/sms/otp/en_us", Resource::leaf("[\"b\"]"))
            .await
            .unwrap();

        service.delete(&tenant, "identity/sms/otp").await.unwrap();
        assert!(!service.exists(&tenant, "identity/sms/otp").await.unwrap());
        assert!(!service.exists(&tenant, "identity/sms/otp/en_us").await.unwrap());
        service.delete(&tenant, "identity/sms/otp").await.unwrap();
    }

    #[tokio::test]
    async fn test_tenants_use_separate_directories() {
        let (_dir, service) = service().await;
        service
            .put(&TenantKey::super_tenant(), "identity/email", Resource::collection())
            .await
            .unwrap();

        assert!(service
            .exists(&TenantKey::super_tenant(), "identity/email")
            .await
            .unwrap());
        assert!(!service
            .exists(&TenantKey::new("t2"), "identity/email")
            .await
            .unwrap());
    }

    #[test]
    fn test_tenant_dir_names_do_not_collide() {
        assert_eq!(tenant_dir_name("carbon.super"), "carbon.super");
        assert_eq!(tenant_dir_name("a b"), "a%20b");
        assert_eq!(tenant_dir_name("a%20b"), "a%2520b");
        assert_eq!(tenant_dir_name(".."), "%2E%2E");

        let keys = ["a b", "a_b", "a%20b", "a/b", "..", "%2E%2E", " a", "a"];
        let names: std::collections::HashSet<String> = keys.iter().map(|k| tenant_dir_name(k)).collect();
        assert_eq!(names.len(), keys.len());
    }

    #[tokio::test]
    async fn test_similar_tenant_keys_stay_apart() {
        let (_dir, service) = service().await;
        service
            .put(&TenantKey::new("a b"), "identity/email", Resource::collection())
            .await
            .unwrap();

        assert!(!service
            .exists(&TenantKey::new("a_b"), "identity/email")
            .await
            .unwrap());
    }
}
