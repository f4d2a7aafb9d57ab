use std::sync::Arc;

use crate::config::{Settings, StoreBackendKind};
use crate::database::DatabasePool;
use crate::defaults::DefaultTemplateProvider;
use crate::error::{StoreResult, TemplateStoreError};
use crate::manager::TemplateManager;
use crate::resource::{create_resource_service, ResourceError, ResourceService};
use crate::store::create_template_backend;
use crate::tenant::{StaticTenantResolver, TenantResolver};

/// Shared services of one template store instance.
///
/// Built explicitly from settings and handed to whoever needs it; nothing in
/// the crate holds global state apart from the metrics registry.
#[derive(Clone)]
pub struct TemplateStoreContext {
    pub settings: Arc<Settings>,
    pub tenants: Arc<StaticTenantResolver>,
    pub resources: Arc<dyn ResourceService>,
    pub database: Option<DatabasePool>,
    pub defaults: Arc<DefaultTemplateProvider>,
    pub manager: TemplateManager,
}

impl TemplateStoreContext {
    pub async fn from_settings(settings: Settings) -> StoreResult<Self> {
        let kind = settings.store.backend_kind();

        let tenants = Arc::new(StaticTenantResolver::new(&settings.tenants));

        let resources = create_resource_service(&settings.resources)
            .await
            .map_err(|e: ResourceError| {
                TemplateStoreError::resource("Failed to create resource service", e)
            })?;

        let database = match kind {
            StoreBackendKind::Database | StoreBackendKind::OnMigration => {
                let pool = DatabasePool::new(&settings.database).await?;
                tracing::info!(
                    database_url = %pool.database_url_masked(),
                    "Database pool created"
                );
                Some(pool)
            }
            StoreBackendKind::Registry => None,
        };

        let defaults = Arc::new(DefaultTemplateProvider::from_config(&settings.defaults).await?);

        let resolver: Arc<dyn TenantResolver> = tenants.clone();
        let backend = create_template_backend(kind, database.clone(), resources.clone(), resolver);
        let manager = TemplateManager::new(backend, defaults.clone(), settings.store.clone());

        tracing::info!(
            backend = %manager.backend_type(),
            resources = %resources.backend_type(),
            "Template store initialized"
        );

        Ok(Self {
            settings: Arc::new(settings),
            tenants,
            resources,
            database,
            defaults,
            manager,
        })
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        if let Some(pool) = &self.database {
            pool.close().await;
        }
    }
}
