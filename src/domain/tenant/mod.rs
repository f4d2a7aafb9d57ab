//! Tenant identity resolution.
//!
//! Storage is partitioned by an opaque tenant key, not by the human tenant
//! domain. The key is resolved once per operation through a [`TenantResolver`].
//!
//! # Super tenant
//!
//! The platform super tenant has no unique id of its own. Rows written for it
//! carry its numeric id left-justified and space-padded to 32 characters, so
//! the key is `"-1234"` followed by 27 spaces.

use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use uuid::Uuid;

use crate::config::TenantsConfig;
use crate::error::{ErrorCode, StoreResult, TemplateStoreError};

/// Numeric id of the platform super tenant
pub const SUPER_TENANT_ID: i32 = -1234;

/// Width of the persisted super tenant placeholder
pub const TENANT_KEY_WIDTH: usize = 32;

/// Opaque tenant identity used as the storage partition key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Placeholder key of the super tenant.
    pub fn super_tenant() -> Self {
        Self(format!("{:<width$}", SUPER_TENANT_ID, width = TENANT_KEY_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim_end())
    }
}

/// Maps a tenant domain to its storage key.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Resolve a tenant domain.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_TENANT` when the domain has no known identity.
    async fn resolve(&self, tenant_domain: &str) -> StoreResult<TenantKey>;
}

/// Tenant resolver backed by a fixed domain -> id table.
pub struct StaticTenantResolver {
    super_tenant_domain: String,
    tenants: DashMap<String, TenantKey>,
}

impl StaticTenantResolver {
    pub fn new(config: &TenantsConfig) -> Self {
        let tenants = DashMap::new();
        for (domain, id) in &config.domains {
            tenants.insert(domain.clone(), TenantKey::new(id.clone()));
        }

        tracing::debug!(
            super_tenant = %config.super_tenant_domain,
            tenants = tenants.len(),
            "Static tenant resolver created"
        );

        Self {
            super_tenant_domain: config.super_tenant_domain.clone(),
            tenants,
        }
    }

    /// Register a tenant with a freshly generated unique id, returning its key.
    /// An already registered domain keeps its existing key.
    pub fn register(&self, tenant_domain: &str) -> TenantKey {
        self.tenants
            .entry(tenant_domain.to_string())
            .or_insert_with(|| TenantKey::new(Uuid::new_v4().to_string()))
            .clone()
    }

    pub fn super_tenant_domain(&self) -> &str {
        &self.super_tenant_domain
    }
}

impl Default for StaticTenantResolver {
    fn default() -> Self {
        Self::new(&TenantsConfig::default())
    }
}

#[async_trait]
impl TenantResolver for StaticTenantResolver {
    async fn resolve(&self, tenant_domain: &str) -> StoreResult<TenantKey> {
        if tenant_domain == self.super_tenant_domain {
            return Ok(TenantKey::super_tenant());
        }

        self.tenants
            .get(tenant_domain)
            .map(|key| key.clone())
            .ok_or_else(|| {
                TemplateStoreError::new(
                    ErrorCode::InvalidTenant,
                    format!("Invalid tenant domain: {}", tenant_domain),
                )
            })
    }
}
