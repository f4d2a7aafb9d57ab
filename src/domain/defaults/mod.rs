//! Built-in default notification templates.
//!
//! The provider is built once at startup and never mutated afterwards; the
//! template manager only reads from it when seeding a tenant.

use std::path::Path;

use crate::config::DefaultTemplatesConfig;
use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::manager::validation::validate_notification_template;
use crate::template::{NotificationChannel, NotificationTemplate, DEFAULT_EMAIL_CONTENT_TYPE};

/// Read-only holder of the default templates per channel.
#[derive(Debug, Clone, Default)]
pub struct DefaultTemplateProvider {
    email: Vec<NotificationTemplate>,
    sms: Vec<NotificationTemplate>,
}

impl DefaultTemplateProvider {
    pub fn new(email: Vec<NotificationTemplate>, sms: Vec<NotificationTemplate>) -> Self {
        Self { email, sms }
    }

    /// The templates shipped with the crate.
    pub fn builtin() -> Self {
        let email = vec![
            NotificationTemplate::email(
                "Password Reset",
                "en_US",
                "Password Reset",
                "Hi {{user-name}}, use the link below to reset your password: {{confirmation-code}}",
                "---",
                DEFAULT_EMAIL_CONTENT_TYPE,
            ),
            NotificationTemplate::email(
                "Account Confirmation",
                "en_US",
                "Confirm your account",
                "Hi {{user-name}}, please confirm your account: {{confirmation-code}}",
                "---",
                DEFAULT_EMAIL_CONTENT_TYPE,
            ),
            NotificationTemplate::email(
                "Account Lock",
                "en_US",
                "Your account has been locked",
                "Hi {{user-name}}, your account has been locked after too many failed attempts.",
                "---",
                DEFAULT_EMAIL_CONTENT_TYPE,
            ),
        ];

        let sms = vec![
            NotificationTemplate::sms(
                "SMS OTP",
                "en_US",
                "Your one-time password is {{confirmation-code}}",
            ),
            NotificationTemplate::sms(
                "Password Reset",
                "en_US",
                "Your password reset code is {{confirmation-code}}",
            ),
        ];

        Self::new(email, sms)
    }

    /// Load the lists from the configured JSON files.
    ///
    /// A channel without a configured file gets the built-in set.
    pub async fn from_config(config: &DefaultTemplatesConfig) -> StoreResult<Self> {
        let builtin = Self::builtin();

        let email = match &config.email_templates_path {
            Some(path) => load_templates(path, NotificationChannel::Email).await?,
            None => builtin.email,
        };
        let sms = match &config.sms_templates_path {
            Some(path) => load_templates(path, NotificationChannel::Sms).await?,
            None => builtin.sms,
        };

        tracing::info!(
            email_templates = email.len(),
            sms_templates = sms.len(),
            "Default notification templates loaded"
        );

        Ok(Self::new(email, sms))
    }

    /// Default templates of one channel.
    pub fn templates_for(&self, channel: NotificationChannel) -> &[NotificationTemplate] {
        match channel {
            NotificationChannel::Email => &self.email,
            NotificationChannel::Sms => &self.sms,
        }
    }
}

async fn load_templates(
    path: impl AsRef<Path>,
    channel: NotificationChannel,
) -> StoreResult<Vec<NotificationTemplate>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        TemplateStoreError::with_source(
            ErrorCode::Configuration,
            format!("Cannot read default templates from {}", path.display()),
            e,
        )
    })?;

    let mut templates: Vec<NotificationTemplate> = serde_json::from_str(&json).map_err(|e| {
        TemplateStoreError::with_source(
            ErrorCode::Configuration,
            format!("Invalid default templates in {}", path.display()),
            e,
        )
    })?;

    for template in &mut templates {
        if template.channel != channel {
            return Err(TemplateStoreError::new(
                ErrorCode::Configuration,
                format!(
                    "Default template '{}' in {} is not a {} template",
                    template.display_name,
                    path.display(),
                    channel
                ),
            ));
        }
        validate_notification_template(template).map_err(|e| {
            e.wrap(
                ErrorCode::Configuration,
                format!(
                    "Default template '{}' in {} is not valid",
                    template.display_name,
                    path.display()
                ),
            )
        })?;
    }

    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_templates_match_channel() {
        let provider = DefaultTemplateProvider::builtin();
        for channel in [NotificationChannel::Email, NotificationChannel::Sms] {
            let templates = provider.templates_for(channel);
            assert!(!templates.is_empty());
            assert!(templates.iter().all(|t| t.channel == channel));
        }
        assert!(provider
            .templates_for(NotificationChannel::Sms)
            .iter()
            .all(|t| t.subject.is_none() && t.footer.is_none()));
    }

    #[tokio::test]
    async fn test_from_config_reads_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"displayName":"Welcome Message","notificationChannel":"SMS","locale":"en_US","body":"Hi"}}]"#
        )
        .unwrap();

        let config = DefaultTemplatesConfig {
            email_templates_path: None,
            sms_templates_path: Some(file.path().to_string_lossy().into_owned()),
        };
        let provider = DefaultTemplateProvider::from_config(&config).await.unwrap();

        let sms = provider.templates_for(NotificationChannel::Sms);
        assert_eq!(sms.len(), 1);
        assert_eq!(sms[0].template_type, "welcomemessage");
        assert_eq!(
            provider.templates_for(NotificationChannel::Email).len(),
            DefaultTemplateProvider::builtin()
                .templates_for(NotificationChannel::Email)
                .len()
        );
    }

    #[test]
    fn test_builtin_templates_are_valid() {
        let provider = DefaultTemplateProvider::builtin();
        for channel in [NotificationChannel::Email, NotificationChannel::Sms] {
            for template in provider.templates_for(channel) {
                let mut template = template.clone();
                assert!(validate_notification_template(&mut template).is_ok());
            }
        }
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_default() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"displayName":"a/b","notificationChannel":"SMS","locale":"en_US","body":"Hi"}}]"#
        )
        .unwrap();

        let config = DefaultTemplatesConfig {
            email_templates_path: None,
            sms_templates_path: Some(file.path().to_string_lossy().into_owned()),
        };
        let err = DefaultTemplateProvider::from_config(&config).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }

    #[tokio::test]
    async fn test_from_config_rejects_wrong_channel() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"displayName":"OTP","notificationChannel":"SMS","locale":"en_US","body":"Hi"}}]"#
        )
        .unwrap();

        let config = DefaultTemplatesConfig {
            email_templates_path: Some(file.path().to_string_lossy().into_owned()),
            sms_templates_path: None,
        };
        let err = DefaultTemplateProvider::from_config(&config).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }
}
