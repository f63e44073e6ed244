//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! base_url = "https://app.hyperbrowser.ai"
//! api_key = "hb_..."
//! timeout_secs = 30
//! poll_interval_ms = 2000
//! max_status_failures = 5
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3010
//!
//! [auth]
//! cache_ttl_secs = 300
//! ```

use serde::Serialize;

use super::{AuthConfig, BackendConfig, Config, ServerConfig};

/// Printable configuration document, in the same layout `load_config` reads
#[derive(Debug, Serialize)]
pub struct ConfigFile {
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

impl ConfigFile {
    /// Render as a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }
}

/// Snapshot of an effective configuration with the API key left out
impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        Self {
            backend: BackendConfig {
                api_key: None,
                ..config.backend.clone()
            },
            server: config.server.clone(),
            auth: config.auth.clone(),
        }
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Serialize error: {0}")]
    Serialize(String),
}
