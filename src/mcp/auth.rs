//! Bearer-token verification for the network transport.
//!
//! A token is a Hyperbrowser API key. Keys are checked against the
//! backend's identity endpoint and positive results are cached for a short
//! freshness window. Any failed check evicts the key from the cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::client::API_KEY_HEADER;
use crate::utils::HttpClient;

/// Client id attached to every verified token
pub const AUTH_CLIENT_ID: &str = "hyperbrowser-server-client";

/// Scope granted to every verified token
pub const TOOLS_SCOPE: &str = "mcp:tools";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("API key is missing")]
    MissingKey,

    #[error("Invalid API key or validation service error (Status: {0})")]
    Rejected(u16),

    #[error("Error during API key validation")]
    Unreachable,
}

/// Identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

impl AuthInfo {
    fn for_token(token: &str) -> Self {
        Self {
            token: token.to_string(),
            client_id: AUTH_CLIENT_ID.to_string(),
            scopes: vec![TOOLS_SCOPE.to_string()],
        }
    }
}

/// Verifies API keys against the backend with a positive-result cache
#[derive(Debug)]
pub struct TokenVerifier {
    http: HttpClient,
    validate_url: String,
    ttl: Duration,
    validated: Mutex<HashMap<String, Instant>>,
}

impl TokenVerifier {
    pub fn new(http: HttpClient, base_url: &str, ttl: Duration) -> Self {
        Self {
            http,
            validate_url: format!("{}/api/me", base_url.trim_end_matches('/')),
            ttl,
            validated: Mutex::new(HashMap::new()),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<AuthInfo, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingKey);
        }

        if self.is_fresh(token).await {
            tracing::debug!("API key validated from cache");
            return Ok(AuthInfo::for_token(token));
        }

        // No lock is held while the backend is consulted
        let outcome = self.check_remote(token).await;

        let mut validated = self.validated.lock().await;
        match outcome {
            Ok(()) => {
                validated.insert(token.to_string(), Instant::now());
                Ok(AuthInfo::for_token(token))
            }
            Err(e) => {
                validated.remove(token);
                tracing::warn!("API key validation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Whether `token` has a cache entry inside the freshness window.
    /// Stale entries are evicted.
    async fn is_fresh(&self, token: &str) -> bool {
        let mut validated = self.validated.lock().await;
        match validated.get(token).map(|cached_at| cached_at.elapsed() < self.ttl) {
            Some(true) => true,
            Some(false) => {
                validated.remove(token);
                false
            }
            None => false,
        }
    }

    async fn check_remote(&self, token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .client()
            .get(&self.validate_url)
            .header(API_KEY_HEADER, token)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Validation request failed: {}", e);
                AuthError::Unreachable
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(AuthError::Rejected(status.as_u16()))
        }
    }

    #[cfg(test)]
    async fn is_cached(&self, token: &str) -> bool {
        self.validated.lock().await.contains_key(token)
    }
}
