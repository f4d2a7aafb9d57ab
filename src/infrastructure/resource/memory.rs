//! In-memory resource service using DashMap.
//!
//! Resources are lost on restart.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::tenant::TenantKey;

use super::{normalize_path, Resource, ResourceError, ResourceService, PATH_SEPARATOR};

/// In-memory resource tree keyed by (tenant, path).
pub struct MemoryResourceService {
    resources: DashMap<(TenantKey, String), Resource>,
}

impl Default for MemoryResourceService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResourceService {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
        }
    }

    /// Number of stored resources across all tenants.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[async_trait]
impl ResourceService for MemoryResourceService {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, tenant: &TenantKey, path: &str) -> Result<Option<Resource>, ResourceError> {
        let path = normalize_path(path)?;
        Ok(self
            .resources
            .get(&(tenant.clone(), path))
            .map(|entry| entry.value().clone()))
    }

    async fn put(
        &self,
        tenant: &TenantKey,
        path: &str,
        resource: Resource,
    ) -> Result<(), ResourceError> {
        let path = normalize_path(path)?;

        // Create missing ancestors
        let mut ancestor = String::new();
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        for segment in &segments[..segments.len() - 1] {
            if !ancestor.is_empty() {
                ancestor.push(PATH_SEPARATOR);
            }
            ancestor.push_str(segment);
            self.resources
                .entry((tenant.clone(), ancestor.clone()))
                .or_insert_with(Resource::collection);
        }

        self.resources.insert((tenant.clone(), path), resource);
        Ok(())
    }

    async fn delete(&self, tenant: &TenantKey, path: &str) -> Result<(), ResourceError> {
        let path = normalize_path(path)?;
        let prefix = format!("{}{}", path, PATH_SEPARATOR);

        self.resources.retain(|(owner, key), _| {
            !(owner == tenant && (key == &path || key.starts_with(&prefix)))
        });
        Ok(())
    }

    async fn exists(&self, tenant: &TenantKey, path: &str) -> Result<bool, ResourceError> {
        let path = normalize_path(path)?;
        Ok(self.resources.contains_key(&(tenant.clone(), path)))
    }

    async fn children(&self, tenant: &TenantKey, path: &str) -> Result<Vec<String>, ResourceError> {
        let path = normalize_path(path)?;
        let prefix = format!("{}{}", path, PATH_SEPARATOR);

        let mut children: Vec<String> = self
            .resources
            .iter()
            .filter_map(|entry| {
                let (owner, key) = entry.key();
                if owner != tenant {
                    return None;
                }
                let rest = key.strip_prefix(&prefix)?;
                if rest.contains(PATH_SEPARATOR) {
                    None
                } else {
                    Some(key.clone())
                }
            })
            .collect();

        children.sort();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(name: &str) -> TenantKey {
        TenantKey::new(name)
    }

    #[tokio::test]
    async fn test_put_creates_ancestors() {
        let service = MemoryResourceService::new();
        let t1 = tenant("t1");

        service
            .put(&t1, "identity/email/otp/en_us", Resource::leaf("[]"))
            .await
            .unwrap();

        assert!(service.exists(&t1, "identity/email").await.unwrap());
        let parent = service.get(&t1, "identity/email/otp").await.unwrap().unwrap();
        assert!(parent.is_collection());
        assert_eq!(
            service.children(&t1, "identity/email").await.unwrap(),
            vec!["identity/email/otp".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let service = MemoryResourceService::new();
        service
            .put(&tenant("t1"), "identity/sms/otp", Resource::collection())
            .await
            .unwrap();

        assert!(!service.exists(&tenant("t2"), "identity/sms/otp").await.unwrap());
        assert!(service.children(&tenant("t2"), "identity/sms").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_recursive() {
        let service = MemoryResourceService::new();
        let t1 = tenant("t1");
        service.put(&t1, "root/a/x", Resource::leaf("1")).await.unwrap();
        service.put(&t1, "root/a/y", Resource::leaf("2")).await.unwrap();
        service.put(&t1, "root/ab", Resource::leaf("3")).await.unwrap();

        service.delete(&t1, "root/a").await.unwrap();

        assert!(!service.exists(&t1, "root/a").await.unwrap());
        assert!(!service.exists(&t1, "root/a/x").await.unwrap());
        assert!(service.exists(&t1, "root/ab").await.unwrap());

        // Deleting again is not an error
        service.delete(&t1, "root/a").await.unwrap();
    }

    #[tokio::test]
    async fn test_children_only_direct() {
        let service = MemoryResourceService::new();
        let t1 = tenant("t1");
        service.put(&t1, "root/b/deep", Resource::leaf("1")).await.unwrap();
        service.put(&t1, "root/a", Resource::collection()).await.unwrap();

        let children = service.children(&t1, "root").await.unwrap();
        assert_eq!(children, vec!["root/a".to_string(), "root/b".to_string()]);
    }
}
