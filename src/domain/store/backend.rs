//! Backend trait for notification template storage.
//!
//! This module defines the storage contract shared by the database, registry
//! and migration backends, so they can be used interchangeably behind the
//! template manager.

use async_trait::async_trait;

use crate::error::{ErrorCode, StoreResult};
use crate::template::{NotificationChannel, NotificationTemplate};
use crate::tenant::{TenantKey, TenantResolver};

/// Backend trait for notification template storage.
///
/// Every operation takes the human tenant domain and resolves it to a
/// [`TenantKey`] once, before touching storage. Display names are always
/// normalized by the backend; callers never pass pre-normalized keys.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as one backend is shared by every
/// caller of the process.
///
/// # Error Handling
///
/// Failures are [`TemplateStoreError`](crate::error::TemplateStoreError)s.
/// Duplicates are Conflict kind; storage failures and unresolvable tenants
/// are Server kind. Existence checks report an unresolvable tenant as
/// "not found" instead of failing.
#[async_trait]
pub trait NotificationTemplateBackend: Send + Sync {
    /// Backend identifier used in logs and metrics.
    fn backend_type(&self) -> &'static str;

    /// Create a template type.
    ///
    /// # Errors
    ///
    /// Returns `DUPLICATE_TEMPLATE_TYPE` if the type already exists.
    async fn add_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()>;

    /// Delete a template type together with all of its templates.
    async fn delete_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()>;

    /// Display names of all template types of a channel.
    async fn list_template_types(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<String>>;

    async fn template_type_exists(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool>;

    /// Create or replace the template for its (type, locale), creating the
    /// type first when it does not exist.
    async fn add_or_update_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()>;

    /// Create the template for its (type, locale), creating the type first
    /// when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DUPLICATE_TEMPLATE` if a template already exists for the
    /// (type, locale). Nothing is overwritten.
    async fn add_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()>;

    /// Add every template that does not exist yet.
    ///
    /// Templates that already exist are skipped with a warning.
    ///
    /// # Returns
    ///
    /// The number of templates actually added.
    async fn add_default_templates(
        &self,
        templates: &[NotificationTemplate],
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<usize>;

    /// Delete one (type, locale) template. Deleting a missing template succeeds.
    async fn delete_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()>;

    /// Fetch one template, `None` if it does not exist.
    ///
    /// Returned email templates always carry a charset in their content type.
    async fn get_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Option<NotificationTemplate>>;

    async fn template_exists(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool>;

    /// Every template of every type of a channel.
    async fn list_all_templates(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>>;

    /// Every locale of one template type.
    ///
    /// # Errors
    ///
    /// Returns `TEMPLATE_TYPE_NOT_FOUND` if the type does not exist.
    async fn list_templates_of_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>>;
}

/// Resolve a tenant for an existence check.
///
/// An unresolvable tenant cannot own anything, so it maps to `None` rather
/// than an error. Other failures still propagate.
pub(crate) async fn resolve_tenant_for_lookup(
    resolver: &dyn TenantResolver,
    tenant_domain: &str,
) -> StoreResult<Option<TenantKey>> {
    match resolver.resolve(tenant_domain).await {
        Ok(key) => Ok(Some(key)),
        Err(e) if e.code() == ErrorCode::InvalidTenant => {
            tracing::debug!(
                tenant_domain = %tenant_domain,
                "Tenant could not be resolved, treating as not found"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
