//! Request validation performed before any backend call.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ErrorCode, StoreResult, TemplateStoreError};
use crate::template::{is_blank, normalize_template_type, NotificationChannel, NotificationTemplate};

lazy_static! {
    /// Template type names: letters, digits and whitespace only
    static ref TEMPLATE_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9\s]+$").unwrap();

    /// Characters that cannot appear in a resource path segment
    static ref RESOURCE_INVALID_CHARS_REGEX: Regex =
        Regex::new(r#"[~!@#;%^*()+={}|\\<>"',/]"#).unwrap();
}

/// Validate a template type display name.
pub fn validate_display_name(display_name: &str) -> StoreResult<()> {
    if display_name.trim().is_empty() {
        return Err(TemplateStoreError::new(
            ErrorCode::EmptyTemplateName,
            "Notification template name cannot be empty",
        ));
    }

    if !TEMPLATE_NAME_REGEX.is_match(display_name)
        || RESOURCE_INVALID_CHARS_REGEX.is_match(display_name)
    {
        return Err(TemplateStoreError::new(
            ErrorCode::InvalidCharactersInTemplateName,
            format!("Invalid characters exists in the template name: {}", display_name),
        ));
    }

    Ok(())
}

/// Validate a locale code.
pub fn validate_locale(locale: &str) -> StoreResult<()> {
    if locale.trim().is_empty() {
        return Err(TemplateStoreError::new(
            ErrorCode::EmptyLocale,
            "Locale code cannot be empty",
        ));
    }

    // "." and ".." would address the parent collection
    if RESOURCE_INVALID_CHARS_REGEX.is_match(locale) || locale.trim().chars().all(|c| c == '.') {
        return Err(TemplateStoreError::new(
            ErrorCode::InvalidCharactersInLocale,
            format!("Locale contains invalid characters: {}", locale),
        ));
    }

    Ok(())
}

/// Validate a template and rewrite its normalized type from the display name.
pub fn validate_notification_template(template: &mut NotificationTemplate) -> StoreResult<()> {
    validate_display_name(&template.display_name)?;

    let normalized = normalize_template_type(&template.display_name);
    if !normalized.eq_ignore_ascii_case(&template.template_type) {
        tracing::debug!(
            display_name = %template.display_name,
            template_type = %template.template_type,
            normalized = %normalized,
            "Template type does not match the display name, using the normalized name"
        );
        template.template_type = normalized;
    }

    validate_locale(&template.locale)?;

    match template.channel {
        NotificationChannel::Sms => {
            if template.body.trim().is_empty() {
                return Err(TemplateStoreError::new(
                    ErrorCode::InvalidSmsTemplate,
                    "SMS template body cannot be empty",
                ));
            }
            if !is_blank(template.subject.as_deref()) || !is_blank(template.footer.as_deref()) {
                return Err(TemplateStoreError::new(
                    ErrorCode::ExtraneousSmsTemplateContent,
                    "SMS templates cannot have a subject or a footer",
                ));
            }
        }
        NotificationChannel::Email => {
            if is_blank(template.subject.as_deref())
                || template.body.trim().is_empty()
                || is_blank(template.footer.as_deref())
            {
                return Err(TemplateStoreError::new(
                    ErrorCode::InvalidEmailTemplate,
                    "Email templates need a subject, a body and a footer",
                ));
            }
        }
    }

    Ok(())
}
