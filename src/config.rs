use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://caterbill.db?mode=rwc";
const DEFAULT_RECEIPT_DIR: &str = "receipts";
const DEFAULT_RECEIPT_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Application configuration.
///
/// Loaded from layered sources: `config/default.toml`, then
/// `config/{RUN_ENV}.toml`, then `APP__`-prefixed environment variables.
/// There is no process-wide configuration singleton; the loaded value is
/// passed into services at construction.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (SQLite or Postgres)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment name (development, production, test)
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub log_json: bool,

    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[validate(range(min = 1))]
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Create missing tables from entity definitions on startup
    #[serde(default = "default_true")]
    pub auto_create_schema: bool,

    /// Directory receipt images are stored under
    #[serde(default = "default_receipt_dir")]
    pub receipt_dir: String,

    /// Upload size cap for receipt images, in bytes
    #[serde(default = "default_receipt_max_bytes")]
    pub receipt_max_bytes: usize,

    /// Depth of the domain event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_receipt_dir() -> String {
    DEFAULT_RECEIPT_DIR.to_string()
}
fn default_receipt_max_bytes() -> usize {
    DEFAULT_RECEIPT_MAX_BYTES
}
fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            auto_create_schema: true,
            receipt_dir: default_receipt_dir(),
            receipt_max_bytes: default_receipt_max_bytes(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads and validates configuration from files and environment.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    let config_dir = Path::new(CONFIG_DIR);

    let settings = Config::builder()
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let cfg: AppConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured
/// level when set and non-empty.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("caterbill_api={level},tower_http=info");
    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::new(directive);

    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}
