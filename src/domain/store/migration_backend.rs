//! Migration template backend.
//!
//! Runs the database and registry backends side by side while templates are
//! moved from the registry into the database. The database is primary:
//!
//! - Writes go to the database first, then are replicated to the registry.
//!   Exclusive adds and seeding check both stores first, so a legacy
//!   registry copy is never shadowed by a new database row.
//!   There is no cross-store transaction. If the registry write fails after
//!   the database write succeeded, the operation fails with
//!   `PARTIALLY_APPLIED` and the database stays ahead of the registry.
//! - Listings query both stores and append registry-only entries to the
//!   database results. Database entries always win.
//! - Single lookups fall back to the registry only when the database reports
//!   absence, never on a database error.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::metrics::MigrationMetrics;
use crate::template::{NotificationChannel, NotificationTemplate};

use super::backend::NotificationTemplateBackend;

pub struct MigrationTemplateBackend {
    database: Arc<dyn NotificationTemplateBackend>,
    registry: Arc<dyn NotificationTemplateBackend>,
}

impl MigrationTemplateBackend {
    pub fn new(
        database: Arc<dyn NotificationTemplateBackend>,
        registry: Arc<dyn NotificationTemplateBackend>,
    ) -> Self {
        Self { database, registry }
    }

    /// Map a failed registry replication to the partial-write failure.
    fn replicated(operation: &str, result: StoreResult<()>) -> StoreResult<()> {
        result.map_err(|e| {
            MigrationMetrics::record_partial_write(operation);
            tracing::error!(
                operation = %operation,
                error = %e,
                "Registry replication failed after database write"
            );
            TemplateStoreError::partially_applied(operation, e)
        })
    }

    /// Append templates whose key is not already present.
    fn merge_templates<K, F>(
        mut primary: Vec<NotificationTemplate>,
        secondary: Vec<NotificationTemplate>,
        key: F,
    ) -> Vec<NotificationTemplate>
    where
        K: Eq + std::hash::Hash,
        F: Fn(&NotificationTemplate) -> K,
    {
        let mut seen: HashSet<K> = primary.iter().map(&key).collect();
        for template in secondary {
            if seen.insert(key(&template)) {
                primary.push(template);
            }
        }
        primary
    }
}

#[async_trait]
impl NotificationTemplateBackend for MigrationTemplateBackend {
    fn backend_type(&self) -> &'static str {
        "on_migration"
    }

    async fn add_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        if self
            .template_type_exists(display_name, channel, tenant_domain)
            .await?
        {
            return Err(TemplateStoreError::new(
                ErrorCode::DuplicateTemplateType,
                format!("Notification template type already exists: {}", display_name),
            ));
        }

        self.database
            .add_template_type(display_name, channel, tenant_domain)
            .await?;
        Self::replicated(
            "add_template_type",
            self.registry
                .add_template_type(display_name, channel, tenant_domain)
                .await,
        )
    }

    async fn delete_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        self.database
            .delete_template_type(display_name, channel, tenant_domain)
            .await?;
        Self::replicated(
            "delete_template_type",
            self.registry
                .delete_template_type(display_name, channel, tenant_domain)
                .await,
        )
    }

    async fn list_template_types(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<String>> {
        let mut types = self.database.list_template_types(channel, tenant_domain).await?;
        let registry_types = self.registry.list_template_types(channel, tenant_domain).await?;

        let mut seen: HashSet<String> = types.iter().cloned().collect();
        for display_name in registry_types {
            if seen.insert(display_name.clone()) {
                types.push(display_name);
            }
        }
        Ok(types)
    }

    async fn template_type_exists(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        if self
            .database
            .template_type_exists(display_name, channel, tenant_domain)
            .await?
        {
            return Ok(true);
        }
        self.registry
            .template_type_exists(display_name, channel, tenant_domain)
            .await
    }

    async fn add_or_update_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        self.database
            .add_or_update_template(template, tenant_domain)
            .await?;
        Self::replicated(
            "add_or_update_template",
            self.registry
                .add_or_update_template(template, tenant_domain)
                .await,
        )
    }

    async fn add_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        if self
            .template_exists(&template.display_name, &template.locale, template.channel, tenant_domain)
            .await?
        {
            return Err(TemplateStoreError::new(
                ErrorCode::DuplicateTemplate,
                format!(
                    "Notification template already exists: {} ({})",
                    template.display_name, template.locale
                ),
            ));
        }

        self.database.add_template(template, tenant_domain).await?;
        Self::replicated(
            "add_template",
            self.registry.add_template(template, tenant_domain).await,
        )
    }

    async fn add_default_templates(
        &self,
        templates: &[NotificationTemplate],
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<usize> {
        // Only templates missing from both stores are seeded
        let mut missing = Vec::with_capacity(templates.len());
        for template in templates {
            if !self
                .template_exists(&template.display_name, &template.locale, channel, tenant_domain)
                .await?
            {
                missing.push(template.clone());
            }
        }

        let database_added = self
            .database
            .add_default_templates(&missing, channel, tenant_domain)
            .await?;
        let registry_added = self
            .registry
            .add_default_templates(&missing, channel, tenant_domain)
            .await?;

        tracing::debug!(
            tenant_domain = %tenant_domain,
            channel = %channel,
            database_added,
            registry_added,
            "Default templates seeded in both stores"
        );

        // The registry count is the reported one
        Ok(registry_added)
    }

    async fn delete_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        self.database
            .delete_template(display_name, locale, channel, tenant_domain)
            .await?;
        Self::replicated(
            "delete_template",
            self.registry
                .delete_template(display_name, locale, channel, tenant_domain)
                .await,
        )
    }

    async fn get_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Option<NotificationTemplate>> {
        if let Some(template) = self
            .database
            .get_template(display_name, locale, channel, tenant_domain)
            .await?
        {
            return Ok(Some(template));
        }
        self.registry
            .get_template(display_name, locale, channel, tenant_domain)
            .await
    }

    async fn template_exists(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        if self
            .database
            .template_exists(display_name, locale, channel, tenant_domain)
            .await?
        {
            return Ok(true);
        }
        self.registry
            .template_exists(display_name, locale, channel, tenant_domain)
            .await
    }

    async fn list_all_templates(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let database = self.database.list_all_templates(channel, tenant_domain).await?;
        let registry = self.registry.list_all_templates(channel, tenant_domain).await?;

        Ok(Self::merge_templates(database, registry, |t| {
            (t.normalized_type(), t.locale.to_lowercase())
        }))
    }

    async fn list_templates_of_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let database = self
            .database
            .list_templates_of_type(display_name, channel, tenant_domain)
            .await;
        let registry = self
            .registry
            .list_templates_of_type(display_name, channel, tenant_domain)
            .await;

        // A type that lives in only one store is still a known type
        let (database, registry) = match (database, registry) {
            (Err(db_err), Err(registry_err))
                if db_err.code() == ErrorCode::TemplateTypeNotFound
                    && registry_err.code() == ErrorCode::TemplateTypeNotFound =>
            {
                return Err(db_err)
            }
            (Err(e), _) if e.code() != ErrorCode::TemplateTypeNotFound => return Err(e),
            (_, Err(e)) if e.code() != ErrorCode::TemplateTypeNotFound => return Err(e),
            (database, registry) => (database.unwrap_or_default(), registry.unwrap_or_default()),
        };

        Ok(Self::merge_templates(database, registry, |t| {
            t.locale.to_lowercase()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::DatabasePool;
    use crate::resource::{MemoryResourceService, Resource, ResourceError, ResourceService};
    use crate::store::{DatabaseTemplateBackend, RegistryTemplateBackend};
    use crate::tenant::{StaticTenantResolver, TenantKey, TenantResolver};

    const TENANT: &str = "carbon.super";

    /// Resource tree that can be read but refuses every write
    struct ReadOnlyResources(MemoryResourceService);

    #[async_trait]
    impl ResourceService for ReadOnlyResources {
        fn backend_type(&self) -> &'static str {
            "read_only"
        }

        async fn get(&self, tenant: &TenantKey, path: &str) -> Result<Option<Resource>, ResourceError> {
            self.0.get(tenant, path).await
        }

        async fn put(&self, _: &TenantKey, path: &str, _: Resource) -> Result<(), ResourceError> {
            Err(ResourceError::InvalidPath(format!("read-only tree: {}", path)))
        }

        async fn delete(&self, _: &TenantKey, path: &str) -> Result<(), ResourceError> {
            Err(ResourceError::InvalidPath(format!("read-only tree: {}", path)))
        }

        async fn exists(&self, tenant: &TenantKey, path: &str) -> Result<bool, ResourceError> {
            self.0.exists(tenant, path).await
        }

        async fn children(&self, tenant: &TenantKey, path: &str) -> Result<Vec<String>, ResourceError> {
            self.0.children(tenant, path).await
        }
    }

    struct Stores {
        database: Arc<dyn NotificationTemplateBackend>,
        registry: Arc<dyn NotificationTemplateBackend>,
        migration: MigrationTemplateBackend,
    }

    async fn stores() -> Stores {
        let tenants: Arc<dyn TenantResolver> = Arc::new(StaticTenantResolver::default());
        let pool = DatabasePool::new(&DatabaseConfig::default()).await.unwrap();
        let database: Arc<dyn NotificationTemplateBackend> =
            Arc::new(DatabaseTemplateBackend::new(pool, tenants.clone()));
        let registry: Arc<dyn NotificationTemplateBackend> = Arc::new(
            RegistryTemplateBackend::new(Arc::new(MemoryResourceService::new()), tenants),
        );
        Stores {
            migration: MigrationTemplateBackend::new(database.clone(), registry.clone()),
            database,
            registry,
        }
    }

    fn sms(locale: &str, body: &str) -> NotificationTemplate {
        NotificationTemplate::sms("OTP", locale, body)
    }

    #[tokio::test]
    async fn test_writes_reach_both_stores() {
        let stores = stores().await;
        stores
            .migration
            .add_or_update_template(&sms("en_US", "code"), TENANT)
            .await
            .unwrap();

        for backend in [&stores.database, &stores.registry] {
            assert!(backend
                .template_exists("OTP", "en_US", NotificationChannel::Sms, TENANT)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_list_of_type_unions_by_locale() {
        let stores = stores().await;
        stores.database.add_or_update_template(&sms("en_US", "db"), TENANT).await.unwrap();
        stores.registry.add_or_update_template(&sms("en_US", "reg"), TENANT).await.unwrap();
        stores.registry.add_or_update_template(&sms("fr_FR", "reg"), TENANT).await.unwrap();

        let templates = stores
            .migration
            .list_templates_of_type("OTP", NotificationChannel::Sms, TENANT)
            .await
            .unwrap();
        assert_eq!(templates.len(), 2);
        let en = templates.iter().find(|t| t.locale == "en_US").unwrap();
        assert_eq!(en.body, "db");
        assert!(templates.iter().any(|t| t.locale == "fr_FR"));
    }

    #[tokio::test]
    async fn test_registry_only_type_is_listed() {
        let stores = stores().await;
        stores.registry.add_or_update_template(&sms("en_US", "legacy"), TENANT).await.unwrap();

        let templates = stores
            .migration
            .list_templates_of_type("OTP", NotificationChannel::Sms, TENANT)
            .await
            .unwrap();
        assert_eq!(templates.len(), 1);

        let err = stores
            .migration
            .list_templates_of_type("Missing", NotificationChannel::Sms, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateTypeNotFound);
    }

    #[tokio::test]
    async fn test_get_falls_back_to_registry() {
        let stores = stores().await;
        stores.registry.add_or_update_template(&sms("en_US", "legacy"), TENANT).await.unwrap();

        let template = stores
            .migration
            .get_template("OTP", "en_US", NotificationChannel::Sms, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.body, "legacy");
    }

    #[tokio::test]
    async fn test_type_list_unions_by_display_name() {
        let stores = stores().await;
        stores
            .database
            .add_template_type("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap();
        stores
            .registry
            .add_template_type("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap();
        stores
            .registry
            .add_template_type("Legacy Type", NotificationChannel::Email, TENANT)
            .await
            .unwrap();

        let types = stores
            .migration
            .list_template_types(NotificationChannel::Email, TENANT)
            .await
            .unwrap();
        assert_eq!(types, vec!["Account Lock".to_string(), "Legacy Type".to_string()]);
    }

    #[tokio::test]
    async fn test_registry_failure_is_partial_write() {
        let tenants: Arc<dyn TenantResolver> = Arc::new(StaticTenantResolver::default());
        let pool = DatabasePool::new(&DatabaseConfig::default()).await.unwrap();
        let database: Arc<dyn NotificationTemplateBackend> =
            Arc::new(DatabaseTemplateBackend::new(pool, tenants.clone()));
        let registry: Arc<dyn NotificationTemplateBackend> = Arc::new(RegistryTemplateBackend::new(
            Arc::new(ReadOnlyResources(MemoryResourceService::new())),
            tenants,
        ));
        let migration = MigrationTemplateBackend::new(database.clone(), registry);

        let err = migration
            .add_template_type("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert!(err.is_partially_applied());
        assert!(err.is_server());
        assert!(database
            .template_type_exists("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_registry_only_type_is_duplicate() {
        let stores = stores().await;
        stores
            .registry
            .add_template_type("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap();

        let err = stores
            .migration
            .add_template_type("account lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateTemplateType);
        assert!(!stores
            .database
            .template_type_exists("Account Lock", NotificationChannel::Email, TENANT)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_exclusive_add_keeps_registry_copy() {
        let stores = stores().await;
        stores.registry.add_or_update_template(&sms("en_US", "legacy"), TENANT).await.unwrap();

        let err = stores
            .migration
            .add_template(&sms("en_US", "new"), TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateTemplate);
        assert!(!err.is_partially_applied());

        let template = stores
            .migration
            .get_template("OTP", "en_US", NotificationChannel::Sms, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.body, "legacy");
    }

    #[tokio::test]
    async fn test_seed_reports_registry_count() {
        let stores = stores().await;
        stores.registry.add_or_update_template(&sms("en_US", "old"), TENANT).await.unwrap();

        let defaults = vec![sms("en_US", "default"), sms("fr_FR", "defaut")];
        let added = stores
            .migration
            .add_default_templates(&defaults, NotificationChannel::Sms, TENANT)
            .await
            .unwrap();

        // The legacy en_US copy is kept; only fr_FR is seeded, in both stores
        assert_eq!(added, 1);
        let seeded = stores
            .database
            .list_templates_of_type("OTP", NotificationChannel::Sms, TENANT)
            .await
            .unwrap();
        assert_eq!(seeded.len(), 1);
        assert_eq!(seeded[0].locale, "fr_FR");

        let en = stores
            .migration
            .get_template("OTP", "en_US", NotificationChannel::Sms, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(en.body, "old");
    }
}
