//! Notification template storage backends.
//!
//! # Architecture
//!
//! The store uses a backend abstraction so the template manager can run on
//! different storage implementations:
//!
//! - `DatabaseTemplateBackend`: relational tables through sqlx
//! - `RegistryTemplateBackend`: a tenant-scoped resource tree
//! - `MigrationTemplateBackend`: database first, replicated to the registry,
//!   with reads merged from both
//!
//! Use `create_template_backend()` to create the backend selected by configuration.

pub mod backend;
pub mod database_backend;
mod factory;
pub mod migration_backend;
pub mod registry_backend;

pub use backend::NotificationTemplateBackend;
pub use database_backend::DatabaseTemplateBackend;
pub use factory::create_template_backend;
pub use migration_backend::MigrationTemplateBackend;
pub use registry_backend::{RegistryTemplateBackend, EMAIL_TEMPLATE_PATH, SMS_TEMPLATE_PATH};
