//! Persistence backend configuration.
//!
//! Two ways to provide the Postgres connection URL:
//! 1. `database_url_env` - name of an environment variable holding the URL
//! 2. `database_url` - the URL itself

use serde::{Deserialize, Serialize};

/// Configuration for the Postgres store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Environment variable name containing the connection URL.
    /// Highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full PostgreSQL connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

impl StoreConfig {
    /// Resolve the connection URL, if one is configured.
    pub fn connection_string(&self) -> Option<String> {
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return Some(url);
        }
        self.database_url.clone()
    }
}
