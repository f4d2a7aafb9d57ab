//! Template backend factory

use std::sync::Arc;

use crate::config::StoreBackendKind;
use crate::database::DatabasePool;
use crate::resource::ResourceService;
use crate::tenant::TenantResolver;

use super::backend::NotificationTemplateBackend;
use super::database_backend::DatabaseTemplateBackend;
use super::migration_backend::MigrationTemplateBackend;
use super::registry_backend::RegistryTemplateBackend;

/// Create a template backend based on configuration.
///
/// Returns the appropriate backend implementation based on `kind`:
/// - `Database`: a `DatabaseTemplateBackend` if a database pool is provided
/// - `OnMigration`: a `MigrationTemplateBackend` over both stores if a
///   database pool is provided
/// - `Registry` (default): a `RegistryTemplateBackend`
///
/// The selection happens once; the returned backend is shared by every caller.
///
/// # Arguments
///
/// * `kind` - Configured backend kind
/// * `database` - Optional database pool (required for the database and migration backends)
/// * `resources` - Resource service holding the registry tree
/// * `tenants` - Tenant resolver shared by all backends
///
/// # Example
///
/// ```rust,ignore
/// let backend = create_template_backend(
///     settings.store.backend_kind(),
///     Some(pool.clone()),
///     resources.clone(),
///     tenants.clone(),
/// );
/// ```
pub fn create_template_backend(
    kind: StoreBackendKind,
    database: Option<DatabasePool>,
    resources: Arc<dyn ResourceService>,
    tenants: Arc<dyn TenantResolver>,
) -> Arc<dyn NotificationTemplateBackend> {
    match (kind, database) {
        (StoreBackendKind::Database, Some(pool)) => {
            tracing::info!(
                backend = "database",
                database_url = %pool.database_url_masked(),
                "Creating database template backend"
            );
            Arc::new(DatabaseTemplateBackend::new(pool, tenants))
        }
        (StoreBackendKind::OnMigration, Some(pool)) => {
            tracing::info!(
                backend = "on_migration",
                database_url = %pool.database_url_masked(),
                resources = %resources.backend_type(),
                "Creating migration template backend"
            );
            let database: Arc<dyn NotificationTemplateBackend> =
                Arc::new(DatabaseTemplateBackend::new(pool, tenants.clone()));
            let registry: Arc<dyn NotificationTemplateBackend> =
                Arc::new(RegistryTemplateBackend::new(resources, tenants));
            Arc::new(MigrationTemplateBackend::new(database, registry))
        }
        (StoreBackendKind::Registry, _) => {
            tracing::info!(
                backend = "registry",
                resources = %resources.backend_type(),
                "Creating registry template backend"
            );
            Arc::new(RegistryTemplateBackend::new(resources, tenants))
        }
        (requested, None) => {
            tracing::warn!(
                requested = %requested.as_str(),
                "Database backend requested but no pool provided, falling back to registry"
            );
            Arc::new(RegistryTemplateBackend::new(resources, tenants))
        }
    }
}
