//! Notification template model.
//!
//! This module provides:
//! - The channel enum and the generic `NotificationTemplate`
//! - The email-specific `EmailTemplate` view
//! - Template type normalization (the storage key derived from a display name)

mod types;

pub use types::{
    is_blank, normalize_template_type, with_utf8_charset, EmailTemplate, NotificationChannel,
    NotificationTemplate, CHARSET_CONSTANT, CHARSET_UTF_8, DEFAULT_EMAIL_CONTENT_TYPE,
};
