//! s3browse Configuration
//!
//! This module provides configuration structures for the browser service:
//! HTTP server, storage backend, credential sources and logging.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound the S3 ListObjectsV2 API accepts for `max-keys`
pub const MAX_KEYS_LIMIT: usize = 1000;

/// Main s3browse configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential sources
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Region used when a caller does not name one
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Page size bound sent as `max-keys`
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,

    /// Deadline for a single listing call in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[serde(default)]
    pub path_style: bool,
}

/// Credential sources, consulted once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable holding the access key on hosts that reserve
    /// the standard AWS variable names
    #[serde(default = "default_access_key_var")]
    pub access_key_var: String,

    /// Environment variable holding the secret key
    #[serde(default = "default_secret_key_var")]
    pub secret_key_var: String,

    /// Explicit access key (optional)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Explicit secret key (optional)
    #[serde(default)]
    pub secret_key: Option<String>,

    /// AWS profile name (optional)
    #[serde(default)]
    pub profile: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_max_keys() -> usize {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_access_key_var() -> String {
    "S3BROWSE_ACCESS_KEY_ID".to_string()
}

fn default_secret_key_var() -> String {
    "S3BROWSE_SECRET_ACCESS_KEY".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            max_keys: default_max_keys(),
            request_timeout_secs: default_request_timeout(),
            endpoint: None,
            path_style: false,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            access_key_var: default_access_key_var(),
            secret_key_var: default_secret_key_var(),
            access_key: None,
            secret_key: None,
            profile: None,
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

impl BrowserConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    pub fn load_or_default(path: &std::path::Path) -> crate::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: BrowserConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(crate::Error::Config("server.bind_address cannot be empty".into()));
        }

        if self.storage.default_region.is_empty() {
            return Err(crate::Error::Config("storage.default_region cannot be empty".into()));
        }

        if self.storage.max_keys == 0 || self.storage.max_keys > MAX_KEYS_LIMIT {
            return Err(crate::Error::Config(format!(
                "storage.max_keys must be between 1 and {}",
                MAX_KEYS_LIMIT
            )));
        }

        if self.storage.request_timeout_secs == 0 {
            return Err(crate::Error::Config("storage.request_timeout_secs must be positive".into()));
        }

        if self.credentials.access_key.is_some() != self.credentials.secret_key.is_some() {
            return Err(crate::Error::Config(
                "credentials.access_key and credentials.secret_key must be set together".into(),
            ));
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::Config(format!("unknown logging.format '{}'", other))),
        }
    }

    /// Get the listing deadline as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.request_timeout_secs)
    }
}
