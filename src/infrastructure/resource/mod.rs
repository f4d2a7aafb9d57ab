//! Hierarchical resource service.
//!
//! A tenant-partitioned tree of named resources. Collections hold children and
//! properties; leaves hold properties and raw content. Paths use `/` as the
//! separator and never start or end with it.
//!
//! Implementations:
//! - `MemoryResourceService`: DashMap-backed tree (default, tests)
//! - `FileSystemResourceService`: directories and files under a root path

mod filesystem;
mod memory;

pub use filesystem::FileSystemResourceService;
pub use memory::MemoryResourceService;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ResourceConfig;
use crate::tenant::TenantKey;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '/';

/// Errors raised by a resource service.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid resource path: {0}")]
    InvalidPath(String),
}

/// Whether a resource holds children or content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    Leaf,
}

/// A node of the resource tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, String>,
    pub content: Option<Vec<u8>>,
}

impl Resource {
    /// An empty collection.
    pub fn collection() -> Self {
        Self {
            kind: ResourceKind::Collection,
            properties: BTreeMap::new(),
            content: None,
        }
    }

    /// A leaf with the given content.
    pub fn leaf(content: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ResourceKind::Leaf,
            properties: BTreeMap::new(),
            content: Some(content.into()),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_collection(&self) -> bool {
        self.kind == ResourceKind::Collection
    }
}

/// Backend trait for the hierarchical resource tree.
///
/// All operations are scoped to one tenant; two tenants never see each
/// other's resources.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Backend identifier used in logs.
    fn backend_type(&self) -> &'static str;

    /// Fetch the resource at `path`, if any.
    async fn get(&self, tenant: &TenantKey, path: &str) -> Result<Option<Resource>, ResourceError>;

    /// Store `resource` at `path`, replacing any previous resource there.
    /// Missing ancestors are created as empty collections.
    async fn put(&self, tenant: &TenantKey, path: &str, resource: Resource)
        -> Result<(), ResourceError>;

    /// Remove the resource at `path` and everything below it.
    /// Removing a missing path succeeds.
    async fn delete(&self, tenant: &TenantKey, path: &str) -> Result<(), ResourceError>;

    /// Check whether a resource exists at `path`.
    async fn exists(&self, tenant: &TenantKey, path: &str) -> Result<bool, ResourceError>;

    /// Full paths of the direct children of the collection at `path`, sorted.
    /// A missing collection has no children.
    async fn children(&self, tenant: &TenantKey, path: &str) -> Result<Vec<String>, ResourceError>;
}

/// Validate a path and strip surrounding separators.
pub fn normalize_path(path: &str) -> Result<String, ResourceError> {
    let trimmed = path.trim_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return Err(ResourceError::InvalidPath(path.to_string()));
    }
    for segment in trimmed.split(PATH_SEPARATOR) {
        if segment.is_empty() || segment == "." || segment == ".." || segment.starts_with('.') {
            return Err(ResourceError::InvalidPath(path.to_string()));
        }
    }
    Ok(trimmed.to_string())
}

/// Append a child segment to a path.
pub fn join_path(parent: &str, child: &str) -> String {
    format!(
        "{}{}{}",
        parent.trim_end_matches(PATH_SEPARATOR),
        PATH_SEPARATOR,
        child.trim_start_matches(PATH_SEPARATOR)
    )
}

/// Locale-qualified sub-path. Locale leaves are addressed in lower case.
pub fn locale_path(path: &str, locale: &str) -> String {
    if locale.trim().is_empty() {
        path.to_string()
    } else {
        join_path(path, &locale.to_lowercase())
    }
}

/// Last segment of a path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Create the resource service selected by configuration.
pub async fn create_resource_service(
    config: &ResourceConfig,
) -> Result<Arc<dyn ResourceService>, ResourceError> {
    match config.backend.as_str() {
        "filesystem" => {
            tracing::info!(
                backend = "filesystem",
                root = %config.root_path,
                "Creating filesystem resource service"
            );
            Ok(Arc::new(FileSystemResourceService::new(&config.root_path).await?))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory resource service");
            Ok(Arc::new(MemoryResourceService::new()))
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown resource backend, falling back to memory"
            );
            Ok(Arc::new(MemoryResourceService::new()))
        }
    }
}
