//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: CATALOG_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/catalog-service/{service_name}/config.toml
//! 4. System directory: /etc/catalog-service/{service_name}/config.toml
//! 5. Default values
//!
//! `CATALOG_STORAGE__BACKEND=surrealdb` sets `storage.backend`,
//! `CATALOG_LISTING__MAX_PAGE_SIZE=50` sets `listing.max_page_size`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "CATALOG_";
const XDG_PREFIX: &str = "catalog-service";
const MAX_BODY_LIMIT_MB: usize = 1024;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Document storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Listing defaults and limits
    #[serde(default)]
    pub listing: ListingConfig,

    /// Prefix under which the entity collections are mounted
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Also write daily-rotated log files under `log_dir`
    #[serde(default)]
    pub log_to_file: bool,

    /// Directory for `<name>.log` and `<name>_error.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request tracking configuration (request IDs, header propagation)
    #[serde(default)]
    pub request_tracking: RequestTrackingConfig,

    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: permissive, restrictive or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Origins accepted in restrictive CORS mode
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Attach the standard security response headers
    #[serde(default = "default_true")]
    pub security_headers: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            request_tracking: RequestTrackingConfig::default(),
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
            allowed_origins: Vec::new(),
            security_headers: true,
        }
    }
}

/// Request tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTrackingConfig {
    /// Enable request ID generation
    #[serde(default = "default_true")]
    pub request_id_enabled: bool,

    /// Enable header propagation
    #[serde(default = "default_true")]
    pub propagate_headers: bool,

    /// Enable sensitive header masking in logs
    #[serde(default = "default_true")]
    pub mask_sensitive_headers: bool,
}

impl Default for RequestTrackingConfig {
    fn default() -> Self {
        Self {
            request_id_enabled: true,
            propagate_headers: true,
            mask_sensitive_headers: true,
        }
    }
}

/// Which document store backs the collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, lost on restart
    #[default]
    Memory,
    /// SurrealDB (requires the `surrealdb` feature)
    Surrealdb,
}

/// Document storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Connection URL (`mem://`, `ws://host:8000`, `http://host:8000`)
    #[serde(default = "default_storage_url")]
    pub url: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Root username; no sign-in is attempted when absent
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Connection attempts before startup fails
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Fixed delay between connection attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl StorageConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: default_storage_url(),
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
            connect_retries: default_connect_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Listing defaults and limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size used when the client does not supply one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Larger requested page sizes are clamped to this value
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

// Middleware default functions
fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

// Storage default functions
fn default_storage_url() -> String {
    "mem://".to_string()
}

fn default_namespace() -> String {
    "catalog".to_string()
}

fn default_database() -> String {
    "catalog".to_string()
}

fn default_connect_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

// Listing default functions
fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found is used):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/catalog-service/{service_name}/config.toml
    /// 3. System directory: /etc/catalog-service/{service_name}/config.toml
    ///
    /// Environment variables (CATALOG_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        Self::load_for_service(XDG_PREFIX)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let level = self.service.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.service.log_level
            )));
        }

        if self.listing.default_page_size == 0 {
            return Err(Error::InvalidConfig(
                "listing.default_page_size must be at least 1".to_string(),
            ));
        }
        if self.listing.max_page_size < self.listing.default_page_size {
            return Err(Error::InvalidConfig(format!(
                "listing.max_page_size ({}) is smaller than listing.default_page_size ({})",
                self.listing.max_page_size, self.listing.default_page_size
            )));
        }

        if !self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "api_prefix must start with '/' and must not end with '/', got '{}'",
                self.api_prefix
            )));
        }

        match self.middleware.cors_mode.as_str() {
            "permissive" | "restrictive" | "disabled" => {}
            other => {
                return Err(Error::InvalidConfig(format!(
                    "middleware.cors_mode must be permissive, restrictive or disabled, got '{}'",
                    other
                )))
            }
        }

        if self.middleware.body_limit_mb == 0 || self.middleware.body_limit_mb > MAX_BODY_LIMIT_MB {
            return Err(Error::InvalidConfig(format!(
                "middleware.body_limit_mb must be between 1 and {}, got {}",
                MAX_BODY_LIMIT_MB, self.middleware.body_limit_mb
            )));
        }

        if self.storage.connect_retries == 0 {
            return Err(Error::InvalidConfig(
                "storage.connect_retries must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Find all possible config file paths for a service, highest priority first
    pub fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(XDG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Get the recommended config path for a service
    ///
    /// Returns: ~/.config/catalog-service/{service_name}/config.toml
    pub fn recommended_path(service_name: &str) -> PathBuf {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");

        xdg_dirs
            .place_config_file(&config_file_path)
            .unwrap_or_else(|_| {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| String::from("~")))
                    .join(".config")
                    .join(XDG_PREFIX)
                    .join(service_name)
                    .join("config.toml")
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.service.environment == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: XDG_PREFIX.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: Environment::default(),
                log_to_file: false,
                log_dir: default_log_dir(),
            },
            middleware: MiddlewareConfig::default(),
            storage: StorageConfig::default(),
            listing: ListingConfig::default(),
            api_prefix: default_api_prefix(),
        }
    }
}
