//! MCP server assembly and transports.
//!
//! [`McpServer`] wires the Hyperbrowser tools and static resources into a
//! [`HyperbrowserService`] and mounts it on either transport: the rmcp
//! stdio transport, or HTTP/SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use rmcp::ServiceExt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::auth::TokenVerifier;
use super::handlers::ClientProvider;
use super::resources::ResourceRegistry;
use super::service::HyperbrowserService;
use super::sse::{self, SseState};
use super::tools::ToolRegistry;
use crate::client::{ClientFactory, HttpClientFactory};
use crate::config::{ApiKeyConfig, Config};
use crate::utils::HttpClient;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("MCP session failed to initialize: {0}")]
    Initialize(String),

    #[error("MCP session task failed: {0}")]
    Session(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The Hyperbrowser MCP server
#[derive(Debug, Clone)]
pub struct McpServer {
    service: HyperbrowserService,
    config: Config,
}

impl McpServer {
    /// Create a server that talks to the Hyperbrowser API
    pub fn new(config: Config, api_key: ApiKeyConfig) -> Result<Self, ServerError> {
        let factory = HttpClientFactory::new(config.backend.clone())?;
        Ok(Self::with_factory(config, Arc::new(factory), api_key))
    }

    /// Create a server over an arbitrary client factory
    pub fn with_factory(
        config: Config,
        factory: Arc<dyn ClientFactory>,
        api_key: ApiKeyConfig,
    ) -> Self {
        let clients = Arc::new(ClientProvider::new(factory, api_key));
        let tools = Arc::new(ToolRegistry::hyperbrowser(clients));
        tracing::debug!("Registered {} tools", tools.len());

        Self {
            service: HyperbrowserService::new(tools, ResourceRegistry::new()),
            config,
        }
    }

    pub fn service(&self) -> &HyperbrowserService {
        &self.service
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run_stdio(&self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server in stdio mode");
        self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one MCP session over a byte stream pair until the peer closes it.
    ///
    /// Requests are handled concurrently; a slow tool call never holds up
    /// the replies to later requests.
    pub async fn serve_io<R, W>(&self, reader: R, writer: W) -> Result<(), ServerError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let running = self
            .service
            .clone()
            .serve(tokio::io::join(reader, writer))
            .await
            .map_err(|e| ServerError::Initialize(e.to_string()))?;

        let reason = running.waiting().await?;
        tracing::info!("MCP session ended: {:?}", reason);
        Ok(())
    }

    /// Build the SSE transport state, with bearer authentication if requested
    pub fn sse_state(&self, auth_enabled: bool) -> Result<SseState, ServerError> {
        let verifier = if auth_enabled {
            let backend = &self.config.backend;
            let http = HttpClient::new(backend.timeout())?;
            Some(Arc::new(TokenVerifier::new(
                http,
                backend.base_url(),
                self.config.auth.cache_ttl(),
            )))
        } else {
            None
        };

        Ok(SseState::new(self.service.clone(), verifier))
    }
    /// Run the server in HTTP/SSE mode
    ///
    /// Binds `addr` and serves in a background task, returning the bound
    /// address and the task handle.
    pub async fn run_sse(
        &self,
        addr: &str,
        auth_enabled: bool,
    ) -> Result<(SocketAddr, JoinHandle<std::io::Result<()>>), ServerError> {
        if auth_enabled {
            tracing::info!("SSE authentication is ENABLED");
        } else {
            tracing::warn!("SSE authentication is DISABLED (requires both --sse and --serve)");
        }

        let state = self.sse_state(auth_enabled)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let bound = listener.local_addr()?;
        tracing::info!("MCP SSE server listening on http://{}{}", bound, sse::SSE_PATH);

        let handle = tokio::spawn(async move { axum::serve(listener, sse::router(state)).await });
        Ok((bound, handle))
    }
}
