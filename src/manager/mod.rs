//! Template manager: the channel-aware entry point over a storage backend.
//!
//! The manager validates requests before any backend call, resolves
//! unsupported channels to the configured default, applies locale fallback
//! on reads and seeds tenants with the default templates.
//!
//! Email-specific operations live in [`email`] and return the caller-facing
//! [`EmailTemplateError`].

mod email;
pub mod validation;

pub use email::{EmailErrorClass, EmailResult, EmailTemplateError};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::config::StoreConfig;
use crate::defaults::DefaultTemplateProvider;
use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::metrics::{FacadeMetrics, StoreMetrics};
use crate::store::NotificationTemplateBackend;
use crate::template::{NotificationChannel, NotificationTemplate};

use validation::{validate_display_name, validate_locale, validate_notification_template};

/// Channel-aware template manager.
#[derive(Clone)]
pub struct TemplateManager {
    backend: Arc<dyn NotificationTemplateBackend>,
    defaults: Arc<DefaultTemplateProvider>,
    config: StoreConfig,
}

impl TemplateManager {
    pub fn new(
        backend: Arc<dyn NotificationTemplateBackend>,
        defaults: Arc<DefaultTemplateProvider>,
        config: StoreConfig,
    ) -> Self {
        Self {
            backend,
            defaults,
            config,
        }
    }

    /// Name of the backend serving this manager.
    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }

    pub fn backend(&self) -> &Arc<dyn NotificationTemplateBackend> {
        &self.backend
    }

    /// Resolve a channel name, substituting the configured default for
    /// unsupported channels.
    pub fn resolve_channel(&self, channel: &str) -> NotificationChannel {
        match NotificationChannel::from_name(channel) {
            Some(channel) => channel,
            None => {
                let fallback = self.config.default_channel();
                tracing::debug!(
                    requested = %channel,
                    channel = %fallback,
                    "Notification channel is not supported, using the default channel"
                );
                fallback
            }
        }
    }

    /// The fallback locale of a channel.
    pub fn default_locale(&self, channel: NotificationChannel) -> &str {
        match channel {
            NotificationChannel::Email => &self.config.default_email_locale,
            NotificationChannel::Sms => &self.config.default_sms_locale,
        }
    }

    /// Run a backend call and record its outcome and latency.
    async fn observe<T, F>(&self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let start = Instant::now();
        let result = call.await;
        StoreMetrics::record(
            self.backend.backend_type(),
            operation,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// Create a template type.
    pub async fn add_notification_template_type(
        &self,
        display_name: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        validate_display_name(display_name)?;
        let channel = self.resolve_channel(channel);

        self.observe(
            "add_template_type",
            self.backend
                .add_template_type(display_name, channel, tenant_domain),
        )
        .await
        .map_err(|e| match e.code() {
            ErrorCode::DuplicateTemplateType | ErrorCode::PartiallyApplied => e,
            _ => e.wrap(
                ErrorCode::ErrorAddingTemplateType,
                format!(
                    "Error when adding template type {} to {} tenant",
                    display_name, tenant_domain
                ),
            ),
        })
    }

    /// Delete a template type and all of its templates.
    pub async fn delete_notification_template_type(
        &self,
        display_name: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        validate_display_name(display_name)?;
        let channel = self.resolve_channel(channel);

        self.observe(
            "delete_template_type",
            self.backend
                .delete_template_type(display_name, channel, tenant_domain),
        )
        .await
    }

    pub async fn get_notification_template_types(
        &self,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<Vec<String>> {
        let channel = self.resolve_channel(channel);
        self.observe(
            "list_template_types",
            self.backend.list_template_types(channel, tenant_domain),
        )
        .await
    }

    pub async fn is_notification_template_type_exists(
        &self,
        display_name: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        let channel = self.resolve_channel(channel);
        self.observe(
            "template_type_exists",
            self.backend
                .template_type_exists(display_name, channel, tenant_domain),
        )
        .await
    }

    /// Validate and add a template, replacing an existing one for the same
    /// type and locale. A missing type is created.
    pub async fn add_notification_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let mut template = template.clone();
        validate_notification_template(&mut template)?;

        self.observe(
            "add_or_update_template",
            self.backend.add_or_update_template(&template, tenant_domain),
        )
        .await
        .map_err(|e| {
            if e.is_partially_applied() {
                return e;
            }
            e.wrap(
                ErrorCode::ErrorAddingTemplate,
                format!(
                    "Error when adding template {} in {} locale to {} tenant",
                    template.display_name, template.locale, tenant_domain
                ),
            )
        })
    }

    pub async fn delete_notification_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        validate_display_name(display_name)?;
        validate_locale(locale)?;
        let channel = self.resolve_channel(channel);

        self.observe(
            "delete_template",
            self.backend
                .delete_template(display_name, locale, channel, tenant_domain),
        )
        .await
    }

    /// Fetch a template, falling back to the channel's default locale.
    ///
    /// # Errors
    ///
    /// Returns `NO_TEMPLATE_FOUND` when neither the requested locale nor the
    /// default locale has content.
    pub async fn get_notification_template(
        &self,
        channel: &str,
        display_name: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> StoreResult<NotificationTemplate> {
        let channel = self.resolve_channel(channel);
        validate_locale(locale)?;
        validate_display_name(display_name)?;

        if let Some(template) = self
            .fetch_template(display_name, locale, channel, tenant_domain)
            .await?
        {
            return Ok(template);
        }

        let default_locale = self.default_locale(channel).to_string();
        if default_locale.eq_ignore_ascii_case(locale) {
            return Err(no_template_found(display_name, locale, tenant_domain));
        }

        FacadeMetrics::record_locale_fallback(channel.as_str());
        tracing::debug!(
            template_type = %display_name,
            locale = %locale,
            tenant_domain = %tenant_domain,
            default_locale = %default_locale,
            "Template not found in the requested locale, trying the default locale"
        );

        // The default locale is the last hop
        self.fetch_template(display_name, &default_locale, channel, tenant_domain)
            .await?
            .ok_or_else(|| no_template_found(display_name, &default_locale, tenant_domain))
    }

    async fn fetch_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Option<NotificationTemplate>> {
        self.observe(
            "get_template",
            self.backend
                .get_template(display_name, locale, channel, tenant_domain),
        )
        .await
    }

    pub async fn is_notification_template_exists(
        &self,
        display_name: &str,
        locale: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        let channel = self.resolve_channel(channel);
        self.observe(
            "template_exists",
            self.backend
                .template_exists(display_name, locale, channel, tenant_domain),
        )
        .await
    }

    pub async fn get_all_notification_templates(
        &self,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let channel = self.resolve_channel(channel);
        self.observe(
            "list_all_templates",
            self.backend.list_all_templates(channel, tenant_domain),
        )
        .await
    }

    /// Every locale of one template type.
    ///
    /// # Errors
    ///
    /// Returns `TEMPLATE_TYPE_NOT_FOUND` if the type does not exist.
    pub async fn get_notification_templates_of_type(
        &self,
        display_name: &str,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        validate_display_name(display_name)?;
        let channel = self.resolve_channel(channel);
        self.observe(
            "list_templates_of_type",
            self.backend
                .list_templates_of_type(display_name, channel, tenant_domain),
        )
        .await
    }

    /// Seed a tenant with the default templates of a channel.
    ///
    /// Every default is validated before the first write; an invalid default
    /// aborts the seeding with nothing written. Templates that already exist
    /// are left untouched. Returns the number of templates added.
    pub async fn add_default_notification_templates(
        &self,
        channel: &str,
        tenant_domain: &str,
    ) -> StoreResult<usize> {
        let channel = self.resolve_channel(channel);
        let mut templates = self.defaults.templates_for(channel).to_vec();
        for template in &mut templates {
            validate_notification_template(template)?;
        }

        let added = self
            .observe(
                "add_default_templates",
                self.backend
                    .add_default_templates(&templates, channel, tenant_domain),
            )
            .await?;

        FacadeMetrics::record_seeded(channel.as_str(), added);
        tracing::debug!(
            channel = %channel,
            tenant_domain = %tenant_domain,
            added,
            "Added default templates"
        );
        Ok(added)
    }

    /// The default templates of a channel.
    pub fn get_default_notification_templates(&self, channel: &str) -> &[NotificationTemplate] {
        self.defaults.templates_for(self.resolve_channel(channel))
    }
}

fn no_template_found(display_name: &str, locale: &str, tenant_domain: &str) -> TemplateStoreError {
    TemplateStoreError::new(
        ErrorCode::NoTemplateFound,
        format!(
            "No template found for type {} in {} locale for {} tenant",
            display_name, locale, tenant_domain
        ),
    )
}
