//! Configuration management.
//!
//! Settings come from three layers, lowest priority first: built-in
//! defaults, an optional TOML file, and `HYPERBROWSER_MCP__*` environment
//! variables (`HYPERBROWSER_MCP__BACKEND__POLL_INTERVAL_MS=500`). The
//! Hyperbrowser API key itself is read from `HB_API_KEY` or
//! `HYPERBROWSER_API_KEY` into an [`ApiKeyConfig`].

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "HYPERBROWSER_MCP";

/// Environment variables holding the fallback API key, in priority order
pub const API_KEY_ENV_VARS: [&str; 2] = ["HB_API_KEY", "HYPERBROWSER_API_KEY"];

/// File name looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "hyperbrowser-mcp.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hyperbrowser API settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Network transport settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Bearer token verification settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Hyperbrowser API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Hyperbrowser API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key used when neither the call nor the environment supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between job status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive failed status polls tolerated before giving up
    #[serde(default = "default_max_status_failures")]
    pub max_status_failures: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_status_failures: default_max_status_failures(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn default_base_url() -> String {
    "https://app.hyperbrowser.ai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_status_failures() -> u32 {
    5
}

/// Network transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3010
}

/// Bearer token verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long a successful key validation stays cached, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AuthConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

/// The fallback API key, resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyConfig {
    key: Option<String>,
}

impl ApiKeyConfig {
    /// Use a fixed key (or none)
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Read `HB_API_KEY`, then `HYPERBROWSER_API_KEY`, then fall back to the
    /// key from the configuration file
    pub fn from_env(file_key: Option<String>) -> Self {
        let from_env = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty());

        Self::new(from_env.or(file_key))
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// Load configuration from an optional TOML file layered with
/// `HYPERBROWSER_MCP__*` environment variables
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a configuration file in the working directory, then in the
/// user's configuration directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("hyperbrowser-mcp").join("config.toml");
    user.is_file().then_some(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url(), "https://app.hyperbrowser.ai");
        assert_eq!(config.backend.poll_interval(), Duration::from_millis(2000));
        assert_eq!(config.backend.max_status_failures, 5);
        assert_eq!(config.auth.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.server.port, 3010);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "http://localhost:9999/"
poll_interval_ms = 10

[server]
port = 8080
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.backend.base_url(), "http://localhost:9999");
        assert_eq!(config.backend.poll_interval_ms, 10);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.auth.cache_ttl_secs, 300);
    }

    #[test]
    fn test_api_key_config_ignores_blank_keys() {
        assert_eq!(ApiKeyConfig::new(Some("  ".to_string())).key(), None);
        assert_eq!(
            ApiKeyConfig::new(Some("hb_123".to_string())).key(),
            Some("hb_123")
        );
    }
}
