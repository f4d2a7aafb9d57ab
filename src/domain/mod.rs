//! Domain layer modules
//!
//! This module contains business domain logic:
//! - `template`: Template model and type normalization
//! - `tenant`: Tenant domain to storage key resolution
//! - `defaults`: Built-in default templates
//! - `store`: Template storage backends

pub mod defaults;
pub mod store;
pub mod template;
pub mod tenant;
