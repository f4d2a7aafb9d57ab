//! Template model: channels, generic notification templates and the email view

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parameter name looked for in a content type
pub const CHARSET_CONSTANT: &str = "charset";

/// Charset parameter appended to email content types on read
pub const CHARSET_UTF_8: &str = "charset=UTF-8";

/// Content type assumed for email templates stored without one
pub const DEFAULT_EMAIL_CONTENT_TYPE: &str = "text/html";

/// Notification delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "EMAIL",
            NotificationChannel::Sms => "SMS",
        }
    }

    /// Exact, case-sensitive match against the channel names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EMAIL" => Some(NotificationChannel::Email),
            "SMS" => Some(NotificationChannel::Sms),
            _ => None,
        }
    }

    /// Number of elements in the stored content array for this channel.
    pub fn content_arity(&self) -> usize {
        match self {
            NotificationChannel::Email => 3,
            NotificationChannel::Sms => 1,
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unsupported notification channel: {}", s))
    }
}

/// Normalize a template type display name into its storage key.
///
/// Strips all whitespace and lower-cases the rest, so
/// `"Password Reset"` and `"passwordreset"` share the key `"passwordreset"`.
pub fn normalize_template_type(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Append a UTF-8 charset parameter to a content type that does not carry one.
///
/// A missing or blank content type reads as `text/html`.
pub fn with_utf8_charset(content_type: Option<String>) -> Option<String> {
    let ct = content_type
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EMAIL_CONTENT_TYPE.to_string());
    if ct.to_lowercase().contains(CHARSET_CONSTANT) {
        Some(ct)
    } else {
        Some(format!("{}; {}", ct, CHARSET_UTF_8))
    }
}

/// True when the value is absent or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// A localized notification template for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    /// Human-readable template type name
    pub display_name: String,

    /// Normalized template type (storage key)
    #[serde(rename = "type", default)]
    pub template_type: String,

    /// Delivery channel
    #[serde(rename = "notificationChannel")]
    pub channel: NotificationChannel,

    /// Locale tag, e.g. `en_US`
    pub locale: String,

    /// Email subject (EMAIL only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Message body
    pub body: String,

    /// Email footer (EMAIL only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,

    /// MIME content type (EMAIL only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl NotificationTemplate {
    /// Build an email template. The normalized type is derived from the display name.
    pub fn email(
        display_name: impl Into<String>,
        locale: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        footer: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        let display_name = display_name.into();
        Self {
            template_type: normalize_template_type(&display_name),
            display_name,
            channel: NotificationChannel::Email,
            locale: locale.into(),
            subject: Some(subject.into()),
            body: body.into(),
            footer: Some(footer.into()),
            content_type: Some(content_type.into()),
        }
    }

    /// Build an SMS template. The normalized type is derived from the display name.
    pub fn sms(
        display_name: impl Into<String>,
        locale: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let display_name = display_name.into();
        Self {
            template_type: normalize_template_type(&display_name),
            display_name,
            channel: NotificationChannel::Sms,
            locale: locale.into(),
            subject: None,
            body: body.into(),
            footer: None,
            content_type: None,
        }
    }

    /// The storage key, always recomputed from the display name.
    pub fn normalized_type(&self) -> String {
        normalize_template_type(&self.display_name)
    }
}

/// Email specific view of a [`NotificationTemplate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub template_display_name: String,
    pub template_type: String,
    pub locale: String,
    pub subject: String,
    pub body: String,
    pub footer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_content_type: Option<String>,
}

impl From<NotificationTemplate> for EmailTemplate {
    fn from(template: NotificationTemplate) -> Self {
        Self {
            template_display_name: template.display_name,
            template_type: template.template_type,
            locale: template.locale,
            subject: template.subject.unwrap_or_default(),
            body: template.body,
            footer: template.footer.unwrap_or_default(),
            email_content_type: template.content_type,
        }
    }
}

impl From<EmailTemplate> for NotificationTemplate {
    fn from(template: EmailTemplate) -> Self {
        Self {
            display_name: template.template_display_name,
            template_type: template.template_type,
            channel: NotificationChannel::Email,
            locale: template.locale,
            subject: Some(template.subject),
            body: template.body,
            footer: Some(template.footer),
            content_type: template.email_content_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_and_lowercases() {
        assert_eq!(normalize_template_type("Password Reset"), "passwordreset");
        assert_eq!(normalize_template_type("passwordreset"), "passwordreset");
        assert_eq!(normalize_template_type(" Account\tConfirmation \n"), "accountconfirmation");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in ["Password Reset Template", "OTP", "  a B  c "] {
            let once = normalize_template_type(name);
            assert_eq!(normalize_template_type(&once), once);
        }
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(NotificationChannel::from_name("EMAIL"), Some(NotificationChannel::Email));
        assert_eq!(NotificationChannel::from_name("SMS"), Some(NotificationChannel::Sms));
        assert_eq!(NotificationChannel::from_name("sms"), None);
        assert!("PUSH".parse::<NotificationChannel>().is_err());
        assert_eq!(NotificationChannel::Email.content_arity(), 3);
        assert_eq!(NotificationChannel::Sms.content_arity(), 1);
    }

    #[test]
    fn test_charset_appended_once() {
        assert_eq!(
            with_utf8_charset(Some("text/html".to_string())).as_deref(),
            Some("text/html; charset=UTF-8")
        );
        assert_eq!(
            with_utf8_charset(Some("text/plain; Charset=ISO-8859-1".to_string())).as_deref(),
            Some("text/plain; Charset=ISO-8859-1")
        );
        assert_eq!(
            with_utf8_charset(None).as_deref(),
            Some("text/html; charset=UTF-8")
        );
        assert_eq!(
            with_utf8_charset(Some(" ".to_string())).as_deref(),
            Some("text/html; charset=UTF-8")
        );
    }

    #[test]
    fn test_email_view_round_trip_fields() {
        let template = NotificationTemplate::email(
            "Password Reset",
            "en_US",
            "Reset your password",
            "Click the link",
            "Regards",
            "text/html",
        );
        assert_eq!(template.template_type, "passwordreset");

        let email = EmailTemplate::from(template.clone());
        assert_eq!(email.template_display_name, "Password Reset");
        assert_eq!(email.subject, "Reset your password");
        assert_eq!(email.email_content_type.as_deref(), Some("text/html"));

        let back = NotificationTemplate::from(email);
        assert_eq!(back, template);
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "displayName": "SMS OTP",
            "notificationChannel": "SMS",
            "locale": "en_US",
            "body": "Your code is {{code}}"
        }"#;
        let template: NotificationTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.channel, NotificationChannel::Sms);
        assert_eq!(template.template_type, "");
        assert_eq!(template.normalized_type(), "smsotp");
        assert!(template.subject.is_none());
    }
}
