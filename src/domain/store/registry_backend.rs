//! Registry template backend.
//!
//! Templates live in a tenant-scoped resource tree:
//!
//! ```text
//! identity/email/<normalized type>/<locale>
//! identity/sms/<normalized type>/<locale>
//! ```
//!
//! Each type collection carries its display name as a property. Each locale
//! leaf carries display name, type, locale and (EMAIL only) content type, and
//! its content is a JSON array: `[subject, body, footer]` for EMAIL, `[body]`
//! for SMS.
//!
//! Operations are independent resource service calls with no transaction. A
//! failure between creating a type and writing its leaf leaves an empty type
//! collection, which the next write fills in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::metrics::FacadeMetrics;
use crate::resource::{
    join_path, last_segment, locale_path, Resource, ResourceError, ResourceService,
};
use crate::template::{
    normalize_template_type, with_utf8_charset, NotificationChannel, NotificationTemplate,
};
use crate::tenant::{TenantKey, TenantResolver};

use super::backend::{resolve_tenant_for_lookup, NotificationTemplateBackend};

/// Root collection of email templates
pub const EMAIL_TEMPLATE_PATH: &str = "identity/email";

/// Root collection of SMS templates
pub const SMS_TEMPLATE_PATH: &str = "identity/sms";

// Type collection properties
const TEMPLATE_TYPE_NAME: &str = "templateName";
const TEMPLATE_TYPE_DISPLAY_NAME: &str = "templateDisplayName";

// Locale leaf properties
const TEMPLATE_DISPLAY_NAME: &str = "display";
const TEMPLATE_TYPE: &str = "type";
const TEMPLATE_LOCALE: &str = "locale";
const TEMPLATE_CONTENT_TYPE: &str = "emailContentType";

fn channel_root(channel: NotificationChannel) -> &'static str {
    match channel {
        NotificationChannel::Email => EMAIL_TEMPLATE_PATH,
        NotificationChannel::Sms => SMS_TEMPLATE_PATH,
    }
}

fn type_path(display_name: &str, channel: NotificationChannel) -> String {
    join_path(channel_root(channel), &normalize_template_type(display_name))
}

/// Registry template backend over a [`ResourceService`].
pub struct RegistryTemplateBackend {
    resources: Arc<dyn ResourceService>,
    tenants: Arc<dyn TenantResolver>,
}

impl RegistryTemplateBackend {
    pub fn new(resources: Arc<dyn ResourceService>, tenants: Arc<dyn TenantResolver>) -> Self {
        Self { resources, tenants }
    }

    fn template_type_collection(display_name: &str) -> Resource {
        Resource::collection()
            .with_property(TEMPLATE_TYPE_NAME, normalize_template_type(display_name))
            .with_property(TEMPLATE_TYPE_DISPLAY_NAME, display_name)
    }

    /// Build the locale leaf for a template.
    fn template_resource(template: &NotificationTemplate) -> StoreResult<Resource> {
        let content: Vec<Option<&str>> = match template.channel {
            NotificationChannel::Email => vec![
                template.subject.as_deref(),
                Some(template.body.as_str()),
                template.footer.as_deref(),
            ],
            NotificationChannel::Sms => vec![Some(template.body.as_str())],
        };
        let json = serde_json::to_vec(&content).map_err(|e| {
            TemplateStoreError::with_source(
                ErrorCode::ErrorAddingTemplate,
                format!(
                    "Error creating a registry resource from template: {} ({})",
                    template.display_name, template.locale
                ),
                e,
            )
        })?;

        let mut resource = Resource::leaf(json)
            .with_property(TEMPLATE_DISPLAY_NAME, template.display_name.as_str())
            .with_property(TEMPLATE_TYPE, normalize_template_type(&template.display_name))
            .with_property(TEMPLATE_LOCALE, template.locale.as_str());
        if template.channel == NotificationChannel::Email {
            if let Some(content_type) = &template.content_type {
                resource = resource.with_property(TEMPLATE_CONTENT_TYPE, content_type.as_str());
            }
        }
        Ok(resource)
    }

    /// Decode a locale leaf, checking the content arity for the channel.
    fn decode_template(
        resource: &Resource,
        channel: NotificationChannel,
    ) -> StoreResult<NotificationTemplate> {
        let display_name = resource.property(TEMPLATE_DISPLAY_NAME).unwrap_or_default().to_string();
        let locale = resource.property(TEMPLATE_LOCALE).unwrap_or_default().to_string();
        let template_type = resource
            .property(TEMPLATE_TYPE)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_template_type(&display_name));

        let content = resource.content.as_deref().ok_or_else(|| {
            TemplateStoreError::new(
                ErrorCode::NoContentInTemplate,
                format!("Template {} ({}) has no content", display_name, locale),
            )
        })?;

        let mut elements: Vec<Option<String>> = serde_json::from_slice(content).map_err(|e| {
            TemplateStoreError::with_source(
                ErrorCode::TemplateDeserializationFailed,
                format!("Error deserializing template {} ({}) from the registry", display_name, locale),
                e,
            )
        })?;

        if elements.len() != channel.content_arity() {
            let code = match channel {
                NotificationChannel::Email => ErrorCode::InvalidEmailTemplateContent,
                NotificationChannel::Sms => ErrorCode::InvalidSmsTemplateContent,
            };
            return Err(TemplateStoreError::new(
                code,
                format!(
                    "Template {} ({}) has {} content elements, expected {}",
                    display_name,
                    locale,
                    elements.len(),
                    channel.content_arity()
                ),
            ));
        }

        let (subject, body, footer, content_type) = match channel {
            NotificationChannel::Email => {
                let footer = elements.pop().flatten();
                let body = elements.pop().flatten().unwrap_or_default();
                let subject = elements.pop().flatten();
                let content_type =
                    with_utf8_charset(resource.property(TEMPLATE_CONTENT_TYPE).map(str::to_string));
                (subject, body, footer, content_type)
            }
            NotificationChannel::Sms => {
                let body = elements.pop().flatten().unwrap_or_default();
                (None, body, None, None)
            }
        };

        Ok(NotificationTemplate {
            display_name,
            template_type,
            channel,
            locale,
            subject,
            body,
            footer,
            content_type,
        })
    }

    /// Decode every locale leaf under a type collection, skipping corrupt ones.
    async fn templates_under(
        &self,
        tenant: &TenantKey,
        path: &str,
        channel: NotificationChannel,
    ) -> Result<Vec<NotificationTemplate>, ResourceError> {
        let mut templates = Vec::new();
        for child in self.resources.children(tenant, path).await? {
            let Some(resource) = self.resources.get(tenant, &child).await? else {
                continue;
            };
            if resource.is_collection() {
                continue;
            }
            match Self::decode_template(&resource, channel) {
                Ok(template) => templates.push(template),
                Err(e) => {
                    tracing::error!(
                        path = %child,
                        error = %e,
                        "Failed retrieving a template object from the registry resource"
                    );
                }
            }
        }
        Ok(templates)
    }

    /// Create the type collection when it does not exist yet.
    async fn ensure_type(
        &self,
        tenant: &TenantKey,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> Result<String, ResourceError> {
        let path = type_path(display_name, channel);
        if !self.resources.exists(tenant, &path).await? {
            self.resources
                .put(tenant, &path, Self::template_type_collection(display_name))
                .await?;
            tracing::debug!(
                template_type = %display_name,
                tenant_domain = %tenant_domain,
                "Creating template type in tenant registry"
            );
        }
        Ok(path)
    }
}

#[async_trait]
impl NotificationTemplateBackend for RegistryTemplateBackend {
    fn backend_type(&self) -> &'static str {
        "registry"
    }

    async fn add_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let path = type_path(display_name, channel);
        let map_err =
            |e: ResourceError| TemplateStoreError::resource("Error while adding notification template type", e);

        if self.resources.exists(&tenant, &path).await.map_err(map_err)? {
            return Err(TemplateStoreError::new(
                ErrorCode::DuplicateTemplateType,
                format!("Notification template type already exists: {}", display_name),
            ));
        }

        self.resources
            .put(&tenant, &path, Self::template_type_collection(display_name))
            .await
            .map_err(map_err)
    }

    async fn delete_template_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        self.resources
            .delete(&tenant, &type_path(display_name, channel))
            .await
            .map_err(|e| {
                TemplateStoreError::resource("Error while deleting notification template type", e)
            })
    }

    async fn list_template_types(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<String>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let map_err = |e: ResourceError| {
            TemplateStoreError::resource("Error while retrieving notification template types", e)
        };

        let mut types = Vec::new();
        for child in self
            .resources
            .children(&tenant, channel_root(channel))
            .await
            .map_err(map_err)?
        {
            if let Some(resource) = self.resources.get(&tenant, &child).await.map_err(map_err)? {
                let display_name = resource
                    .property(TEMPLATE_TYPE_DISPLAY_NAME)
                    .unwrap_or_else(|| last_segment(&child));
                types.push(display_name.to_string());
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
        let Some(tenant) = resolve_tenant_for_lookup(self.tenants.as_ref(), tenant_domain).await?
        else {
            return Ok(false);
        };
        self.resources
            .exists(&tenant, &type_path(display_name, channel))
            .await
            .map_err(|e| {
                TemplateStoreError::resource("Error while checking notification template type", e)
            })
    }

    async fn add_or_update_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let resource = Self::template_resource(template)?;
        let map_err =
            |e: ResourceError| TemplateStoreError::resource("Error while adding notification template", e);

        let path = self
            .ensure_type(&tenant, &template.display_name, template.channel, tenant_domain)
            .await
            .map_err(map_err)?;
        self.resources
            .put(&tenant, &locale_path(&path, &template.locale), resource)
            .await
            .map_err(map_err)
    }

    async fn add_template(
        &self,
        template: &NotificationTemplate,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let resource = Self::template_resource(template)?;
        let map_err = |e: ResourceError| {
            TemplateStoreError::with_source(
                ErrorCode::ErrorAddingTemplate,
                format!(
                    "Error while adding template {} ({}) to the {} tenant registry",
                    template.display_name, template.locale, tenant_domain
                ),
                e,
            )
        };

        let leaf = locale_path(&type_path(&template.display_name, template.channel), &template.locale);
        if self.resources.exists(&tenant, &leaf).await.map_err(map_err)? {
            return Err(TemplateStoreError::new(
                ErrorCode::DuplicateTemplate,
                format!(
                    "Notification template already exists: {} ({})",
                    template.display_name, template.locale
                ),
            ));
        }

        self.ensure_type(&tenant, &template.display_name, template.channel, tenant_domain)
            .await
            .map_err(map_err)?;
        self.resources.put(&tenant, &leaf, resource).await.map_err(map_err)
    }

    async fn add_default_templates(
        &self,
        templates: &[NotificationTemplate],
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<usize> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let mut added = 0;

        for template in templates {
            // Never overwrite a template the tenant already has
            let leaf = locale_path(&type_path(&template.display_name, channel), &template.locale);
            let exists = self.resources.exists(&tenant, &leaf).await.map_err(|e| {
                TemplateStoreError::resource("Error while adding default notification templates", e)
            })?;
            if exists {
                FacadeMetrics::record_seed_skipped(self.backend_type(), channel.as_str());
                continue;
            }

            match self.add_template(template, tenant_domain).await {
                Ok(()) => {
                    tracing::debug!(
                        template_type = %template.display_name,
                        locale = %template.locale,
                        tenant_domain = %tenant_domain,
                        "Default template added to tenant registry"
                    );
                    added += 1;
                }
                Err(e) if e.is_conflict() => {
                    FacadeMetrics::record_seed_skipped(self.backend_type(), channel.as_str());
                    tracing::warn!(
                        template_type = %template.display_name,
                        locale = %template.locale,
                        tenant_domain = %tenant_domain,
                        "Template already exists in the registry, ignoring addition"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(added)
    }

    async fn delete_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<()> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let path = type_path(display_name, channel);

        // A blank locale would address the whole type collection
        if locale.trim().is_empty() {
            return Ok(());
        }

        self.resources
            .delete(&tenant, &locale_path(&path, locale))
            .await
            .map_err(|e| TemplateStoreError::resource("Error while deleting notification template", e))
    }

    async fn get_template(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Option<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let path = locale_path(&type_path(display_name, channel), locale);

        let resource = self.resources.get(&tenant, &path).await.map_err(|e| {
            TemplateStoreError::resource("Error while retrieving notification template", e)
        })?;

        match resource {
            Some(resource) if !resource.is_collection() => {
                Self::decode_template(&resource, channel).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn template_exists(
        &self,
        display_name: &str,
        locale: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<bool> {
        let Some(tenant) = resolve_tenant_for_lookup(self.tenants.as_ref(), tenant_domain).await?
        else {
            return Ok(false);
        };
        if locale.trim().is_empty() {
            return Ok(false);
        }

        let path = locale_path(&type_path(display_name, channel), locale);
        self.resources.exists(&tenant, &path).await.map_err(|e| {
            TemplateStoreError::resource("Error while checking notification template existence", e)
        })
    }

    async fn list_all_templates(
        &self,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let map_err =
            |e: ResourceError| TemplateStoreError::resource("Error while retrieving templates", e);

        let mut templates = Vec::new();
        for type_dir in self
            .resources
            .children(&tenant, channel_root(channel))
            .await
            .map_err(map_err)?
        {
            templates.extend(
                self.templates_under(&tenant, &type_dir, channel)
                    .await
                    .map_err(map_err)?,
            );
        }
        Ok(templates)
    }

    async fn list_templates_of_type(
        &self,
        display_name: &str,
        channel: NotificationChannel,
        tenant_domain: &str,
    ) -> StoreResult<Vec<NotificationTemplate>> {
        let tenant = self.tenants.resolve(tenant_domain).await?;
        let path = type_path(display_name, channel);
        let map_err =
            |e: ResourceError| TemplateStoreError::resource("Error while retrieving notification templates", e);

        let is_type = matches!(
            self.resources.get(&tenant, &path).await.map_err(map_err)?,
            Some(resource) if resource.is_collection()
        );
        if !is_type {
            return Err(TemplateStoreError::new(
                ErrorCode::TemplateTypeNotFound,
                format!(
                    "Template type {} not found in {} tenant registry",
                    display_name, tenant_domain
                ),
            ));
        }

        self.templates_under(&tenant, &path, channel)
            .await
            .map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryResourceService;
    use crate::tenant::StaticTenantResolver;

    const TENANT: &str = "carbon.super";

    fn backend() -> (Arc<MemoryResourceService>, RegistryTemplateBackend) {
        let resources = Arc::new(MemoryResourceService::new());
        let backend = RegistryTemplateBackend::new(
            resources.clone(),
            Arc::new(StaticTenantResolver::default()),
        );
        (resources, backend)
    }

    #[tokio::test]
    async fn test_email_leaf_layout() {
        let (resources, backend) = backend();
        let template = NotificationTemplate::email(
            "Password Reset",
            "en_US",
            "Subject",
            "Body",
            "Footer",
            "text/html",
        );
        backend.add_or_update_template(&template, TENANT).await.unwrap();

        let tenant = TenantKey::super_tenant();
        let collection = resources
            .get(&tenant, "identity/email/passwordreset")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collection.property("templateDisplayName"), Some("Password Reset"));
        assert_eq!(collection.property("templateName"), Some("passwordreset"));

        let leaf = resources
            .get(&tenant, "identity/email/passwordreset/en_us")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(leaf.property("locale"), Some("en_US"));
        assert_eq!(leaf.property("emailContentType"), Some("text/html"));
        assert_eq!(
            leaf.content.as_deref(),
            Some(&br#"["Subject","Body","Footer"]"#[..])
        );

        let loaded = backend
            .get_template("Password Reset", "en_US", NotificationChannel::Email, TENANT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.subject.as_deref(), Some("Subject"));
        assert_eq!(loaded.content_type.as_deref(), Some("text/html; charset=UTF-8"));
    }

    #[tokio::test]
    async fn test_sms_goes_under_sms_root() {
        let (resources, backend) = backend();
        backend
            .add_or_update_template(&NotificationTemplate::sms("OTP", "en_US", "Code {{c}}"), TENANT)
            .await
            .unwrap();

        let tenant = TenantKey::super_tenant();
        assert!(resources.exists(&tenant, "identity/sms/otp/en_us").await.unwrap());
        assert!(!resources.exists(&tenant, "identity/email/otp").await.unwrap());

        assert!(backend
            .template_exists("OTP", "en_US", NotificationChannel::Sms, TENANT)
            .await
            .unwrap());

        backend
            .delete_template_type("OTP", NotificationChannel::Sms, TENANT)
            .await
            .unwrap();
        assert!(!resources.exists(&tenant, "identity/sms/otp").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_arity_is_server_error() {
        let (resources, backend) = backend();
        let tenant = TenantKey::super_tenant();
        resources
            .put(
                &tenant,
                "identity/email/broken/en_us",
                Resource::leaf(r#"["only subject"]"#)
                    .with_property("display", "Broken")
                    .with_property("locale", "en_US"),
            )
            .await
            .unwrap();

        let err = backend
            .get_template("Broken", "en_US", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEmailTemplateContent);
        assert!(err.is_server());

        // Listing skips the corrupt leaf
        let templates = backend
            .list_templates_of_type("Broken", NotificationChannel::Email, TENANT)
            .await
            .unwrap();
        assert!(templates.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_content() {
        let (resources, backend) = backend();
        resources
            .put(
                &TenantKey::super_tenant(),
                "identity/sms/otp/en_us",
                Resource::leaf("not json"),
            )
            .await
            .unwrap();

        let err = backend
            .get_template("OTP", "en_US", NotificationChannel::Sms, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateDeserializationFailed);
    }

    #[tokio::test]
    async fn test_missing_type_and_empty_root() {
        let (_resources, backend) = backend();
        assert!(backend
            .list_template_types(NotificationChannel::Email, TENANT)
            .await
            .unwrap()
            .is_empty());

        let err = backend
            .list_templates_of_type("Nope", NotificationChannel::Email, TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateTypeNotFound);
    }
}
