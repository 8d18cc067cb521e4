//! Configuration management for breed-mirror
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix shared by every environment variable the service reads
pub const ENV_PREFIX: &str = "BREED_MIRROR_";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Upstream catalog API
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Synchronization schedule and policy
    #[serde(default)]
    pub sync: SyncConfig,

    /// Read path (listing and lookup caches)
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables with prefix BREED_MIRROR_
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// `lookup` receives full variable names (prefix included). Unset
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Config::default();

        if let Some(url) = var("UPSTREAM_BASE_URL") {
            config.upstream.base_url = url;
        }
        if let Some(resource) = var("UPSTREAM_RESOURCE") {
            config.upstream.resource = resource;
        }
        if let Some(timeout) = var("UPSTREAM_TIMEOUT_SECS") {
            config.upstream.timeout_secs = parse_number("UPSTREAM_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(attempts) = var("UPSTREAM_MAX_ATTEMPTS") {
            config.upstream.retry.max_attempts = parse_number("UPSTREAM_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(initial) = var("UPSTREAM_INITIAL_BACKOFF_MS") {
            config.upstream.retry.initial_backoff_ms =
                parse_number("UPSTREAM_INITIAL_BACKOFF_MS", &initial)?;
        }
        if let Some(max) = var("UPSTREAM_MAX_BACKOFF_MS") {
            config.upstream.retry.max_backoff_ms = parse_number("UPSTREAM_MAX_BACKOFF_MS", &max)?;
        }

        if let Some(interval) = var("SYNC_INTERVAL_SECS") {
            config.sync.interval_secs = parse_number("SYNC_INTERVAL_SECS", &interval)?;
        }
        if let Some(prune) = var("SYNC_PRUNE_ON_PARTIAL_FETCH") {
            config.sync.prune_on_partial_fetch =
                parse_bool("SYNC_PRUNE_ON_PARTIAL_FETCH", &prune)?;
        }

        if let Some(size) = var("CATALOG_PAGE_SIZE") {
            config.catalog.page_size = parse_number("CATALOG_PAGE_SIZE", &size)?;
        }
        if let Some(ttl) = var("CATALOG_CACHE_TTL_SECS") {
            config.catalog.listing_cache_ttl_secs = parse_number("CATALOG_CACHE_TTL_SECS", &ttl)?;
        }
        if let Some(ttl) = var("CATALOG_RECORD_CACHE_TTL_SECS") {
            config.catalog.record_cache_ttl_secs =
                parse_number("CATALOG_RECORD_CACHE_TTL_SECS", &ttl)?;
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database.path = path;
        }

        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service misbehave at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "upstream.base_url '{}': {}",
                self.upstream.base_url, e
            ))
        })?;
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "upstream.timeout_secs must be positive".to_string(),
            ));
        }
        if self.upstream.resource.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream.resource must not be empty".to_string(),
            ));
        }
        if self.upstream.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "upstream.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.upstream.retry.max_backoff_ms < self.upstream.retry.initial_backoff_ms {
            return Err(ConfigError::InvalidValue(
                "upstream.retry.max_backoff_ms must not be below initial_backoff_ms".to_string(),
            ));
        }
        // Jitter adds up to one initial backoff; below these the delays can shrink
        let min_multiplier = if self.upstream.retry.jitter { 2.0 } else { 1.0 };
        let multiplier = self.upstream.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < min_multiplier {
            return Err(ConfigError::InvalidValue(format!(
                "upstream.retry.backoff_multiplier must be at least {} (got {})",
                min_multiplier, multiplier
            )));
        }
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "sync.interval_secs must be positive".to_string(),
            ));
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "catalog.page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("Invalid number for {}{}: {}", ENV_PREFIX, name, value)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("Invalid boolean for {}{}: {}", ENV_PREFIX, name, value)))
}

/// Upstream catalog API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Base URL; the resource path is appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Resource path fetched page by page
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retry configuration for non-2xx responses
    #[serde(default)]
    pub retry: RetryConfig,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            resource: default_resource(),
            timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://interview-api-olive.vercel.app/api/".to_string()
}

fn default_resource() -> String {
    "dogs".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Retry configuration for upstream page requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per page, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single backoff in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Whether to add jitter to backoff
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    1_000
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

/// Synchronization schedule and reconciliation policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Seconds between the end of one pass and the start of the next
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,

    /// Delay before the startup pass
    #[serde(default)]
    pub initial_delay_secs: u64,

    /// Upper bound for a single pass
    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,

    /// Keys starting with this prefix are never removed by a pass
    #[serde(default = "default_pinned_prefix")]
    pub pinned_prefix: String,

    /// Remove local records even when pagination was interrupted
    #[serde(default)]
    pub prune_on_partial_fetch: bool,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            initial_delay_secs: 0,
            timeout_secs: default_sync_timeout(),
            pinned_prefix: default_pinned_prefix(),
            prune_on_partial_fetch: false,
        }
    }
}

fn default_sync_interval() -> u64 {
    300
}

fn default_sync_timeout() -> u64 {
    900
}

fn default_pinned_prefix() -> String {
    "#".to_string()
}

/// Read path configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    /// Breeds per listing page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// TTL of cached listing pages in seconds
    #[serde(default = "default_listing_ttl")]
    pub listing_cache_ttl_secs: u64,

    /// TTL of cached single-breed lookups in seconds
    #[serde(default = "default_listing_ttl")]
    pub record_cache_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            listing_cache_ttl_secs: default_listing_ttl(),
            record_cache_ttl_secs: default_listing_ttl(),
        }
    }
}

fn default_page_size() -> u32 {
    15
}

fn default_listing_ttl() -> u64 {
    60
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/breeds.db".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json", or "pretty"/"text" for human-readable output
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax. Unknown variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
