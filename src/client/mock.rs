//! Mock backend for testing purposes.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{AgentKind, Backend, ClientError, ClientFactory, DownloadedImage};
use crate::models::{
    AgentTaskRequest, AgentTaskResponse, CrawlJobResponse, CrawlRequest, CreateProfileResponse,
    ExtractJobResponse, ExtractRequest, ProfileListResponse, ScrapeJobResponse, ScrapeRequest,
};

type Slot<T> = Mutex<Option<Result<T, ClientError>>>;

/// A backend call as observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Scrape(ScrapeRequest),
    Crawl(CrawlRequest),
    Extract(ExtractRequest),
    AgentTask(AgentKind, AgentTaskRequest),
    CreateProfile,
    DeleteProfile(String),
    ListProfiles(Option<u32>, Option<u32>),
    DownloadImage(String),
}

/// A backend returning preconfigured results and recording every call.
///
/// Operations without a configured result fail with a network error.
#[derive(Debug, Default)]
pub struct MockBackend {
    scrape: Slot<ScrapeJobResponse>,
    crawl: Slot<CrawlJobResponse>,
    extract: Slot<ExtractJobResponse>,
    agent_task: Slot<AgentTaskResponse>,
    create_profile: Slot<CreateProfileResponse>,
    delete_profile: Slot<()>,
    list_profiles: Slot<ProfileListResponse>,
    download_image: Slot<DownloadedImage>,
    agent_task_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn canned<T: Clone>(slot: &Slot<T>) -> Result<T, ClientError> {
    lock(slot)
        .clone()
        .unwrap_or_else(|| Err(ClientError::Network("no mock response configured".to_string())))
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scrape_response(&self, result: Result<ScrapeJobResponse, ClientError>) {
        *lock(&self.scrape) = Some(result);
    }

    pub fn set_crawl_response(&self, result: Result<CrawlJobResponse, ClientError>) {
        *lock(&self.crawl) = Some(result);
    }

    pub fn set_extract_response(&self, result: Result<ExtractJobResponse, ClientError>) {
        *lock(&self.extract) = Some(result);
    }

    pub fn set_agent_task_response(&self, result: Result<AgentTaskResponse, ClientError>) {
        *lock(&self.agent_task) = Some(result);
    }

    /// Hold every agent task for `delay` before answering
    pub fn set_agent_task_delay(&self, delay: Duration) {
        *lock(&self.agent_task_delay) = Some(delay);
    }

    pub fn set_create_profile_response(&self, result: Result<CreateProfileResponse, ClientError>) {
        *lock(&self.create_profile) = Some(result);
    }

    pub fn set_delete_profile_response(&self, result: Result<(), ClientError>) {
        *lock(&self.delete_profile) = Some(result);
    }

    pub fn set_list_profiles_response(&self, result: Result<ProfileListResponse, ClientError>) {
        *lock(&self.list_profiles) = Some(result);
    }

    pub fn set_download_image_response(&self, result: Result<DownloadedImage, ClientError>) {
        *lock(&self.download_image) = Some(result);
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeJobResponse, ClientError> {
        self.record(MockCall::Scrape(request.clone()));
        canned(&self.scrape)
    }

    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlJobResponse, ClientError> {
        self.record(MockCall::Crawl(request.clone()));
        canned(&self.crawl)
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractJobResponse, ClientError> {
        self.record(MockCall::Extract(request.clone()));
        canned(&self.extract)
    }

    async fn run_agent_task(
        &self,
        agent: AgentKind,
        request: &AgentTaskRequest,
    ) -> Result<AgentTaskResponse, ClientError> {
        self.record(MockCall::AgentTask(agent, request.clone()));
        let delay = *lock(&self.agent_task_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        canned(&self.agent_task)
    }

    async fn create_profile(&self) -> Result<CreateProfileResponse, ClientError> {
        self.record(MockCall::CreateProfile);
        canned(&self.create_profile)
    }

    async fn delete_profile(&self, profile_id: &str) -> Result<(), ClientError> {
        self.record(MockCall::DeleteProfile(profile_id.to_string()));
        canned(&self.delete_profile)
    }

    async fn list_profiles(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ProfileListResponse, ClientError> {
        self.record(MockCall::ListProfiles(page, limit));
        canned(&self.list_profiles)
    }

    async fn download_image(&self, url: &str) -> Result<DownloadedImage, ClientError> {
        self.record(MockCall::DownloadImage(url.to_string()));
        canned(&self.download_image)
    }
}

/// A factory handing out one shared [`MockBackend`] and recording the API
/// keys it was asked for
#[derive(Debug, Default)]
pub struct MockClientFactory {
    backend: Arc<MockBackend>,
    api_keys: Mutex<Vec<String>>,
}

impl MockClientFactory {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        Self {
            backend,
            api_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &Arc<MockBackend> {
        &self.backend
    }

    /// API keys passed to [`ClientFactory::create`], in order
    pub fn api_keys(&self) -> Vec<String> {
        lock(&self.api_keys).clone()
    }
}

impl ClientFactory for MockClientFactory {
    fn create(&self, api_key: &str) -> Arc<dyn Backend> {
        lock(&self.api_keys).push(api_key.to_string());
        self.backend.clone()
    }
}
