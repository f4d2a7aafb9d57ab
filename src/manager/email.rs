//! Email template operations and their caller-facing error type.

use thiserror::Error;

use crate::error::{ErrorCode, ErrorKind, TemplateStoreError};
use crate::template::{EmailTemplate, NotificationTemplate};

use super::validation::validate_display_name;
use super::TemplateManager;

/// Caller-facing classification of an email template failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailErrorClass {
    Client,
    Internal(&'static str),
    Config,
    Server,
}

/// Store error codes whose email classification differs from their kind.
static EMAIL_ERROR_TABLE: &[(ErrorCode, EmailErrorClass)] = &[
    (
        ErrorCode::DuplicateTemplateType,
        EmailErrorClass::Internal("EMAIL_TEMPLATE_TYPE_ALREADY_EXISTS"),
    ),
    (
        ErrorCode::DuplicateTemplate,
        EmailErrorClass::Internal("EMAIL_TEMPLATE_ALREADY_EXISTS"),
    ),
    (
        ErrorCode::TemplateTypeNotFound,
        EmailErrorClass::Internal("EMAIL_TEMPLATE_TYPE_NOT_FOUND"),
    ),
    (
        ErrorCode::NoTemplateFound,
        EmailErrorClass::Internal("EMAIL_TEMPLATE_NOT_FOUND"),
    ),
    (ErrorCode::NoContentInTemplate, EmailErrorClass::Client),
    (ErrorCode::InvalidEmailTemplateContent, EmailErrorClass::Config),
];

impl EmailErrorClass {
    pub fn of(code: ErrorCode) -> Self {
        if let Some((_, class)) = EMAIL_ERROR_TABLE.iter().find(|(c, _)| *c == code) {
            return *class;
        }
        if code.kind() == ErrorKind::Client {
            EmailErrorClass::Client
        } else {
            EmailErrorClass::Server
        }
    }
}

#[derive(Debug, Error)]
pub enum EmailTemplateError {
    #[error("{message}")]
    Client {
        message: String,
        #[source]
        source: TemplateStoreError,
    },

    #[error("[{code}] {message}")]
    Internal {
        code: &'static str,
        message: String,
        #[source]
        source: TemplateStoreError,
    },

    #[error("Email template configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: TemplateStoreError,
    },

    #[error("{message}")]
    Server {
        message: String,
        #[source]
        source: TemplateStoreError,
    },
}

impl EmailTemplateError {
    pub fn class(&self) -> EmailErrorClass {
        match self {
            EmailTemplateError::Client { .. } => EmailErrorClass::Client,
            EmailTemplateError::Internal { code, .. } => EmailErrorClass::Internal(*code),
            EmailTemplateError::Config { .. } => EmailErrorClass::Config,
            EmailTemplateError::Server { .. } => EmailErrorClass::Server,
        }
    }

    /// The underlying store error.
    pub fn store_error(&self) -> &TemplateStoreError {
        match self {
            EmailTemplateError::Client { source, .. }
            | EmailTemplateError::Internal { source, .. }
            | EmailTemplateError::Config { source, .. }
            | EmailTemplateError::Server { source, .. } => source,
        }
    }
}

impl From<TemplateStoreError> for EmailTemplateError {
    fn from(source: TemplateStoreError) -> Self {
        let message = source.message().to_string();
        match EmailErrorClass::of(source.code()) {
            EmailErrorClass::Client => EmailTemplateError::Client { message, source },
            EmailErrorClass::Internal(code) => EmailTemplateError::Internal {
                code,
                message,
                source,
            },
            EmailErrorClass::Config => EmailTemplateError::Config { message, source },
            EmailErrorClass::Server => EmailTemplateError::Server { message, source },
        }
    }
}

pub type EmailResult<T> = Result<T, EmailTemplateError>;

const EMAIL: &str = "EMAIL";

impl TemplateManager {
    pub async fn add_email_template_type(
        &self,
        display_name: &str,
        tenant_domain: &str,
    ) -> EmailResult<()> {
        Ok(self
            .add_notification_template_type(display_name, EMAIL, tenant_domain)
            .await?)
    }

    pub async fn delete_email_template_type(
        &self,
        display_name: &str,
        tenant_domain: &str,
    ) -> EmailResult<()> {
        self.delete_notification_template_type(display_name, EMAIL, tenant_domain)
            .await
            .map_err(|e| {
                if !e.is_client() {
                    tracing::error!(
                        template_type = %display_name,
                        tenant_domain = %tenant_domain,
                        error = %e,
                        "Error deleting email template type"
                    );
                }
                e.into()
            })
    }

    /// Display names of every email template type of a tenant.
    pub async fn get_available_template_types(&self, tenant_domain: &str) -> EmailResult<Vec<String>> {
        Ok(self
            .get_notification_template_types(EMAIL, tenant_domain)
            .await?)
    }

    pub async fn get_all_email_templates(
        &self,
        tenant_domain: &str,
    ) -> EmailResult<Vec<EmailTemplate>> {
        let templates = self
            .get_all_notification_templates(EMAIL, tenant_domain)
            .await?;
        Ok(templates.into_iter().map(EmailTemplate::from).collect())
    }

    /// Fetch an email template with locale fallback.
    pub async fn get_email_template(
        &self,
        display_name: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> EmailResult<EmailTemplate> {
        let template = self
            .get_notification_template(EMAIL, display_name, locale, tenant_domain)
            .await?;
        Ok(template.into())
    }

    /// Every locale of one email template type.
    pub async fn get_email_template_type(
        &self,
        display_name: &str,
        tenant_domain: &str,
    ) -> EmailResult<Vec<EmailTemplate>> {
        let templates = self
            .get_notification_templates_of_type(display_name, EMAIL, tenant_domain)
            .await?;
        Ok(templates.into_iter().map(EmailTemplate::from).collect())
    }

    pub async fn add_email_template(
        &self,
        template: &EmailTemplate,
        tenant_domain: &str,
    ) -> EmailResult<()> {
        let template = NotificationTemplate::from(template.clone());
        Ok(self.add_notification_template(&template, tenant_domain).await?)
    }

    pub async fn delete_email_template(
        &self,
        display_name: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> EmailResult<()> {
        Ok(self
            .delete_notification_template(display_name, locale, EMAIL, tenant_domain)
            .await?)
    }

    /// Seed a tenant with the default email templates.
    pub async fn add_default_email_templates(&self, tenant_domain: &str) -> EmailResult<usize> {
        Ok(self
            .add_default_notification_templates(EMAIL, tenant_domain)
            .await?)
    }

    pub async fn is_email_template_exists(
        &self,
        display_name: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> EmailResult<bool> {
        Ok(self
            .is_notification_template_exists(display_name, locale, EMAIL, tenant_domain)
            .await?)
    }

    pub async fn is_email_template_type_exists(
        &self,
        display_name: &str,
        tenant_domain: &str,
    ) -> EmailResult<bool> {
        validate_display_name(display_name)?;
        Ok(self
            .is_notification_template_type_exists(display_name, EMAIL, tenant_domain)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_table() {
        assert_eq!(
            EmailErrorClass::of(ErrorCode::DuplicateTemplateType),
            EmailErrorClass::Internal("EMAIL_TEMPLATE_TYPE_ALREADY_EXISTS")
        );
        assert_eq!(EmailErrorClass::of(ErrorCode::EmptyLocale), EmailErrorClass::Client);
        assert_eq!(
            EmailErrorClass::of(ErrorCode::InvalidEmailTemplateContent),
            EmailErrorClass::Config
        );
        assert_eq!(EmailErrorClass::of(ErrorCode::NoContentInTemplate), EmailErrorClass::Client);
        assert_eq!(EmailErrorClass::of(ErrorCode::Database), EmailErrorClass::Server);
        assert_eq!(EmailErrorClass::of(ErrorCode::PartiallyApplied), EmailErrorClass::Server);
    }

    #[test]
    fn test_conversion_keeps_store_error() {
        let err: EmailTemplateError =
            TemplateStoreError::new(ErrorCode::NoTemplateFound, "nothing here").into();
        assert_eq!(err.class(), EmailErrorClass::Internal("EMAIL_TEMPLATE_NOT_FOUND"));
        assert_eq!(err.store_error().code(), ErrorCode::NoTemplateFound);
        assert_eq!(err.to_string(), "[EMAIL_TEMPLATE_NOT_FOUND] nothing here");
    }
}
