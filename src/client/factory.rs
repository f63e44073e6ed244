//! Per-invocation client construction.

use std::sync::Arc;

use super::{Backend, ClientError, HyperbrowserClient};
use crate::config::{ApiKeyConfig, BackendConfig};
use crate::mcp::InvocationContext;
use crate::utils::HttpClient;

/// Produces an authenticated backend handle for one tool invocation
pub trait ClientFactory: Send + Sync + std::fmt::Debug {
    fn create(&self, api_key: &str) -> Arc<dyn Backend>;
}

/// Builds [`HyperbrowserClient`]s sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: HttpClient,
    config: BackendConfig,
}

impl HttpClientFactory {
    pub fn new(config: BackendConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpClient::new(config.timeout())?,
            config,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, api_key: &str) -> Arc<dyn Backend> {
        Arc::new(HyperbrowserClient::new(
            self.http.clone(),
            api_key,
            &self.config,
        ))
    }
}

/// Pick the API key for a call.
///
/// An explicit per-call key wins, then the credential the network
/// connection authenticated with, then the configured fallback key. Blank
/// keys count as absent.
pub fn resolve_api_key(
    explicit: Option<&str>,
    context: &InvocationContext,
    configured: &ApiKeyConfig,
) -> Result<String, ClientError> {
    explicit
        .into_iter()
        .chain(context.credential())
        .chain(configured.key())
        .find(|key| !key.trim().is_empty())
        .map(str::to_string)
        .ok_or(ClientError::NoApiKey)
}
