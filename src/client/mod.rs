//! Hyperbrowser backend client.
//!
//! The [`Backend`] trait is the seam between tool handlers and the remote
//! service. [`HyperbrowserClient`] implements it over the REST API; the
//! [`MockBackend`] implements it with canned responses for tests. Job-style
//! operations (scrape, crawl, extract, agent tasks) are single calls that
//! submit the job and wait for its terminal state.

mod factory;
mod hyperbrowser;
pub mod mock;

pub use factory::{resolve_api_key, ClientFactory, HttpClientFactory};
pub use hyperbrowser::{HyperbrowserClient, API_KEY_HEADER};
pub use mock::{MockBackend, MockClientFactory};

use async_trait::async_trait;

use crate::models::{
    AgentTaskRequest, AgentTaskResponse, CrawlJobResponse, CrawlRequest, CreateProfileResponse,
    ExtractJobResponse, ExtractRequest, ProfileListResponse, ScrapeJobResponse, ScrapeRequest,
};

/// The browser agents that can run a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Hyperbrowser's browser-use agent
    BrowserUse,
    /// OpenAI computer-use agent
    OpenAiCua,
    /// Anthropic Claude computer-use agent
    ClaudeCua,
}

impl AgentKind {
    /// Task endpoint, relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            AgentKind::BrowserUse => "/api/task/browser-use",
            AgentKind::OpenAiCua => "/api/task/cua",
            AgentKind::ClaudeCua => "/api/task/claude-computer-use",
        }
    }
}

/// Raw bytes of a downloaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Operations offered by the browser automation service
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Scrape one page and wait for the result
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeJobResponse, ClientError>;

    /// Crawl a site and wait for every page batch
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlJobResponse, ClientError>;

    /// Extract structured data and wait for the result
    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractJobResponse, ClientError>;

    /// Run a browser agent task and wait for the result
    async fn run_agent_task(
        &self,
        agent: AgentKind,
        request: &AgentTaskRequest,
    ) -> Result<AgentTaskResponse, ClientError>;

    async fn create_profile(&self) -> Result<CreateProfileResponse, ClientError>;

    async fn delete_profile(&self, profile_id: &str) -> Result<(), ClientError>;

    async fn list_profiles(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ProfileListResponse, ClientError>;

    /// Download an image (e.g. a screenshot URL returned by a scrape)
    async fn download_image(&self, url: &str) -> Result<DownloadedImage, ClientError>;
}

/// Errors raised while talking to the backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// No API key from the call, the connection, or the environment
    #[error("No API key provided or found in environment variables")]
    NoApiKey,

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the API
    #[error("{message} (Status: {status})")]
    Api { status: u16, message: String },

    /// Unexpected response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Job status could not be determined
    #[error("Polling failed: {0}")]
    Polling(String),
}

impl ClientError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(format!("JSON: {}", err))
    }
}
