mod settings;

pub use settings::{
    DatabaseConfig, DefaultTemplatesConfig, LoggingConfig, ResourceConfig, SeedConfig, Settings,
    StoreBackendKind, StoreConfig, TenantsConfig,
};
