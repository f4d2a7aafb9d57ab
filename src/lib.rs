// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules at the crate root
pub use infrastructure::config;
pub use infrastructure::database;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::resource;

// Domain layer (business logic)
pub mod domain;

pub use domain::defaults;
pub use domain::store;
pub use domain::template;
pub use domain::tenant;

// Application layer
pub mod context;
pub mod manager;

// Supporting modules
pub mod telemetry;
