//! Relational persistence module.
//!
//! Provides the connection pool and table definitions used by the database
//! template backend. Any sqlx `Any` driver URL is accepted: PostgreSQL in
//! production, SQLite for tests and embedded use.

pub mod pool;
pub mod schema;

pub use pool::{DatabasePool, DatabasePoolError};
pub use schema::{ensure_schema, TEMPLATE_TABLE, TEMPLATE_TYPE_TABLE};
