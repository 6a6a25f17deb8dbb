//! Configuration types for Vitrine.
//!
//! Configuration is loaded from a single YAML file (`vitrine.yaml`). Every
//! section is optional and falls back to its defaults, so an empty file is a
//! valid configuration.
//!
//! ```yaml
//! query:
//!   safe_resolution: 11000
//!   default_from: now-6h
//!   default_to: now
//! tokens:
//!   max_attempts: 3
//! audit:
//!   enabled: true
//!   file: /var/log/vitrine/audit.jsonl
//! store:
//!   database_url_env: DATABASE_URL
//! observability:
//!   log_level: info
//! ```

pub mod audit;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use audit::AuditConfig;
pub use store::StoreConfig;

/// Complete Vitrine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitrineConfig {
    /// Query path limits and defaults.
    #[serde(default)]
    pub query: QueryConfig,

    /// Identifier generation.
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Persistence backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Query path configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of points a single query may request.
    #[serde(default = "default_safe_resolution")]
    pub safe_resolution: i64,

    /// `from` expression used when neither the public dashboard nor the
    /// dashboard declares a time range.
    #[serde(default = "default_from")]
    pub default_from: String,

    /// `to` expression paired with `default_from`.
    #[serde(default = "default_to")]
    pub default_to: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            safe_resolution: default_safe_resolution(),
            default_from: default_from(),
            default_to: default_to(),
        }
    }
}

/// Identifier generation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Attempts before giving up on a colliding identifier.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Length of generated public dashboard uids.
    #[serde(default = "default_uid_length")]
    pub uid_length: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            uid_length: default_uid_length(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions
fn default_safe_resolution() -> i64 {
    11000
}

fn default_from() -> String {
    "now-6h".to_string()
}

fn default_to() -> String {
    "now".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_uid_length() -> usize {
    14
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VitrineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content and check it.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document; treat it as all defaults.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the query and token paths cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.safe_resolution <= 0 {
            return Err(ConfigError::Config(format!(
                "query.safe_resolution must be positive, got {}",
                self.query.safe_resolution
            )));
        }
        if self.tokens.max_attempts == 0 {
            return Err(ConfigError::Config(
                "tokens.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(1..=40).contains(&self.tokens.uid_length) {
            return Err(ConfigError::Config(format!(
                "tokens.uid_length must be between 1 and 40, got {}",
                self.tokens.uid_length
            )));
        }
        Ok(())
    }
}
