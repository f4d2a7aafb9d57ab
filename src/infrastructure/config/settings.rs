use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use crate::template::NotificationChannel;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub tenants: TenantsConfig,
    #[serde(default)]
    pub defaults: DefaultTemplatesConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which storage backend serves template requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackendKind {
    /// Relational tables
    Database,
    /// Hierarchical resource tree
    Registry,
    /// Dual-write to database and registry while data is moved
    OnMigration,
}

impl StoreBackendKind {
    /// Parse the configured value. Blank or unknown values select the registry.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "database" => StoreBackendKind::Database,
            "on_migration" => StoreBackendKind::OnMigration,
            "registry" | "" => StoreBackendKind::Registry,
            other => {
                tracing::warn!(
                    backend = %other,
                    "Unknown template store backend, falling back to registry"
                );
                StoreBackendKind::Registry
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackendKind::Database => "database",
            StoreBackendKind::Registry => "registry",
            StoreBackendKind::OnMigration => "on_migration",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Backend name: "registry" (default), "database" or "on_migration"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Channel used when a request names an unsupported channel
    #[serde(default = "default_channel")]
    pub default_channel: String,
    /// Fallback locale for email templates
    #[serde(default = "default_locale")]
    pub default_email_locale: String,
    /// Fallback locale for SMS templates
    #[serde(default = "default_locale")]
    pub default_sms_locale: String,
}

impl StoreConfig {
    pub fn backend_kind(&self) -> StoreBackendKind {
        StoreBackendKind::parse(&self.backend)
    }

    /// The configured default channel, EMAIL if the value is not a known channel.
    pub fn default_channel(&self) -> NotificationChannel {
        NotificationChannel::from_name(&self.default_channel).unwrap_or(NotificationChannel::Email)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
    /// Create the template tables on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// "memory" or "filesystem"
    #[serde(default = "default_resource_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend
    #[serde(default = "default_resource_root")]
    pub root_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantsConfig {
    #[serde(default = "default_super_tenant_domain")]
    pub super_tenant_domain: String,
    /// Tenant domain -> tenant unique id
    #[serde(default)]
    pub domains: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultTemplatesConfig {
    pub email_templates_path: Option<String>,
    pub sms_templates_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Tenant domains seeded with default templates on startup
    #[serde(default = "default_seed_tenants")]
    pub tenants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_store_backend() -> String {
    "registry".to_string()
}

fn default_channel() -> String {
    NotificationChannel::Email.as_str().to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    600 // 10 minutes
}

fn default_true() -> bool {
    true
}

fn default_resource_backend() -> String {
    "memory".to_string()
}

fn default_resource_root() -> String {
    "./data/registry".to_string()
}

fn default_super_tenant_domain() -> String {
    "carbon.super".to_string()
}

fn default_seed_tenants() -> Vec<String> {
    vec![default_super_tenant_domain()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Prefix of the environment variables read into `Settings`
pub const ENV_PREFIX: &str = "TEMPLATE_STORE";

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        Self::build(Self::environment())
    }

    /// Environment source: sections are split on `__` so multi-word keys
    /// survive, e.g. `TEMPLATE_STORE_RESOURCES__ROOT_PATH`.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("seed.tenants")
    }

    fn build(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("store.backend", default_store_backend())?
            .set_default("store.default_channel", default_channel())?
            .set_default("database.url", default_database_url())?
            .set_default("resources.backend", default_resource_backend())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            database: DatabaseConfig::default(),
            resources: ResourceConfig::default(),
            tenants: TenantsConfig::default(),
            defaults: DefaultTemplatesConfig::default(),
            seed: SeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            default_channel: default_channel(),
            default_email_locale: default_locale(),
            default_sms_locale: default_locale(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            run_migrations: true,
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            backend: default_resource_backend(),
            root_path: default_resource_root(),
        }
    }
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            super_tenant_domain: default_super_tenant_domain(),
            domains: HashMap::new(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            tenants: default_seed_tenants(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.store.backend_kind(), StoreBackendKind::Registry);
        assert_eq!(settings.store.default_email_locale, "en_US");
        assert_eq!(settings.store.default_channel(), NotificationChannel::Email);
        assert_eq!(settings.tenants.super_tenant_domain, "carbon.super");
        assert_eq!(settings.seed.tenants, vec!["carbon.super".to_string()]);
    }

    #[test]
    fn test_environment_keeps_multi_word_keys() {
        let vars: config::Map<String, String> = [
            ("TEMPLATE_STORE_STORE__BACKEND", "on_migration"),
            ("TEMPLATE_STORE_STORE__DEFAULT_CHANNEL", "SMS"),
            ("TEMPLATE_STORE_DATABASE__POOL_SIZE", "3"),
            ("TEMPLATE_STORE_RESOURCES__ROOT_PATH", "/var/lib/templates"),
            ("TEMPLATE_STORE_SEED__TENANTS", "carbon.super,t1.example"),
            ("RESOURCES_ROOT_PATH", "/ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = Settings::build(Settings::environment().source(Some(vars))).unwrap();
        assert_eq!(settings.store.backend_kind(), StoreBackendKind::OnMigration);
        assert_eq!(settings.store.default_channel(), NotificationChannel::Sms);
        assert_eq!(settings.database.pool_size, 3);
        assert_eq!(settings.resources.root_path, "/var/lib/templates");
        assert_eq!(
            settings.seed.tenants,
            vec!["carbon.super".to_string(), "t1.example".to_string()]
        );
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!(StoreBackendKind::parse("database"), StoreBackendKind::Database);
        assert_eq!(StoreBackendKind::parse("ON_MIGRATION"), StoreBackendKind::OnMigration);
        assert_eq!(StoreBackendKind::parse(""), StoreBackendKind::Registry);
        assert_eq!(StoreBackendKind::parse("cassandra"), StoreBackendKind::Registry);
    }

    #[test]
    fn test_unknown_default_channel_is_email() {
        let store = StoreConfig {
            default_channel: "PIGEON".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(store.default_channel(), NotificationChannel::Email);
    }
}
