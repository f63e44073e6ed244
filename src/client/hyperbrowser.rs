//! REST client for the Hyperbrowser API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{AgentKind, Backend, ClientError, DownloadedImage};
use crate::config::BackendConfig;
use crate::models::{
    AgentTaskRequest, AgentTaskResponse, CrawlJobResponse, CrawlRequest, CreateProfileResponse,
    ExtractJobResponse, ExtractRequest, JobStatus, JobStatusResponse, ProfileListResponse,
    ScrapeJobResponse, ScrapeRequest, StartJobResponse,
};
use crate::utils::HttpClient;

/// Header carrying the API key on every backend request
pub const API_KEY_HEADER: &str = "x-api-key";

const SCRAPE_ENDPOINT: &str = "/api/scrape";
const CRAWL_ENDPOINT: &str = "/api/crawl";
const EXTRACT_ENDPOINT: &str = "/api/extract";
const PROFILE_ENDPOINT: &str = "/api/profile";

/// An authenticated handle on the Hyperbrowser API.
///
/// Built per tool invocation around a shared connection pool.
#[derive(Debug, Clone)]
pub struct HyperbrowserClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_status_failures: u32,
}

impl HyperbrowserClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>, config: &BackendConfig) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url().to_string(),
            poll_interval: config.poll_interval(),
            max_status_failures: config.max_status_failures,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one profile; the id is percent-encoded as a single segment
    fn profile_url(&self, profile_id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.url(PROFILE_ENDPOINT))
            .map_err(|e| ClientError::Parse(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Parse(format!("Invalid base URL {}", self.base_url)))?
            .push(profile_id);
        Ok(url)
    }

    /// Send an authenticated request, mapping non-success statuses to
    /// [`ClientError::Api`]
    async fn send_raw(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ClientError> {
        let body = self.send_raw(request).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn start_job<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<String, ClientError> {
        let started: StartJobResponse = self
            .send(self.http.client().post(self.url(endpoint)).json(body))
            .await?;
        tracing::debug!("Started job {} at {}", started.job_id, endpoint);
        Ok(started.job_id)
    }

    /// Poll the job status until it is terminal.
    ///
    /// Failed polls are tolerated up to `max_status_failures` in a row.
    async fn wait_for_job(&self, endpoint: &str, job_id: &str) -> Result<JobStatus, ClientError> {
        let status_url = self.url(&format!("{}/{}/status", endpoint, job_id));
        let mut failures = 0u32;

        loop {
            match self
                .send::<JobStatusResponse>(self.http.client().get(&status_url))
                .await
            {
                Ok(response) if response.status.is_terminal() => {
                    tracing::debug!("Job {} finished with {:?}", job_id, response.status);
                    return Ok(response.status);
                }
                Ok(response) => {
                    tracing::trace!("Job {} is {:?}", job_id, response.status);
                    failures = 0;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        "Failed to poll job {} ({}/{}): {}",
                        job_id,
                        failures,
                        self.max_status_failures,
                        e
                    );
                    if failures > self.max_status_failures {
                        return Err(ClientError::Polling(format!(
                            "Failed to poll job {} after {} attempts: {}",
                            job_id, failures, e
                        )));
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn start_and_wait<B, R>(&self, endpoint: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let job_id = self.start_job(endpoint, body).await?;
        self.wait_for_job(endpoint, &job_id).await?;
        self.send(
            self.http
                .client()
                .get(self.url(&format!("{}/{}", endpoint, job_id))),
        )
        .await
    }

    async fn crawl_page_batch(
        &self,
        job_id: &str,
        page: u32,
    ) -> Result<CrawlJobResponse, ClientError> {
        self.send(
            self.http
                .client()
                .get(self.url(&format!("{}/{}", CRAWL_ENDPOINT, job_id)))
                .query(&[("page", page)]),
        )
        .await
    }
}

#[async_trait]
impl Backend for HyperbrowserClient {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeJobResponse, ClientError> {
        self.start_and_wait(SCRAPE_ENDPOINT, request).await
    }

    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlJobResponse, ClientError> {
        let job_id = self.start_job(CRAWL_ENDPOINT, request).await?;
        self.wait_for_job(CRAWL_ENDPOINT, &job_id).await?;

        let mut result = self.crawl_page_batch(&job_id, 1).await?;
        for page in 2..=result.total_page_batches {
            let batch = self.crawl_page_batch(&job_id, page).await?;
            tracing::debug!(
                "Fetched crawl batch {}/{} ({} pages)",
                page,
                result.total_page_batches,
                batch.data.len()
            );
            result.data.extend(batch.data);
            result.current_page_batch = batch.current_page_batch;
            if result.error.is_none() {
                result.error = batch.error;
            }
        }

        Ok(result)
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<ExtractJobResponse, ClientError> {
        self.start_and_wait(EXTRACT_ENDPOINT, request).await
    }

    async fn run_agent_task(
        &self,
        agent: AgentKind,
        request: &AgentTaskRequest,
    ) -> Result<AgentTaskResponse, ClientError> {
        self.start_and_wait(agent.endpoint(), request).await
    }

    async fn create_profile(&self) -> Result<CreateProfileResponse, ClientError> {
        self.send(self.http.client().post(self.url(PROFILE_ENDPOINT)))
            .await
    }

    async fn delete_profile(&self, profile_id: &str) -> Result<(), ClientError> {
        let url = self.profile_url(profile_id)?;
        self.send_raw(self.http.client().delete(url)).await?;
        Ok(())
    }

    async fn list_profiles(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ProfileListResponse, ClientError> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }

        self.send(
            self.http
                .client()
                .get(self.url("/api/profiles"))
                .query(&query),
        )
        .await
    }

    async fn download_image(&self, url: &str) -> Result<DownloadedImage, ClientError> {
        // Screenshot URLs are pre-signed; the API key is not sent along.
        let response = self.http.client().get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: format!("Failed to download image from {}", url),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(DownloadedImage {
            bytes,
            content_type,
        })
    }
}

/// Pull a human-readable message out of an error response body
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 500 {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}
