//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Application configuration and settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics helpers
//! - `database`: SQL connection pool and schema
//! - `resource`: Hierarchical resource service

pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod resource;
