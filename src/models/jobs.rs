//! Request and response payloads of the Hyperbrowser job API.
//!
//! Scrape, crawl, extract and agent tasks are asynchronous jobs: a POST
//! returns a job id, a status endpoint reports progress, and a result
//! endpoint returns the final payload once the job is terminal.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::params::OutputFormats;
use super::session::SessionOptions;

/// Lifecycle state of a backend job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the job has stopped and its result can be fetched
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Treat an explicit `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response to a job submission
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobResponse {
    pub job_id: String,
}

/// Response of a `/{id}/status` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
}

/// Per-page scrape settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeOptions {
    pub formats: OutputFormats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_options: Option<SessionOptions>,
    pub scrape_options: ScrapeOptions,
}

/// Content captured for a single page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    /// URL of the captured screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJobResponse {
    #[serde(default)]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_options: Option<SessionOptions>,
    pub scrape_options: ScrapeOptions,
    pub follow_links: bool,
    pub max_pages: u32,
    pub ignore_sitemap: bool,
}

/// One page of a crawl job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawledPage {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    /// Screenshot payload as returned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A crawl job result; the backend pages large crawls into batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlJobResponse {
    #[serde(default)]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<CrawledPage>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_crawled_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_page_batches: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_page_batch: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub batch_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_options: Option<SessionOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractJobResponse {
    #[serde(default)]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Submission body shared by every agent task endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskRequest {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_options: Option<SessionOptions>,
    pub max_steps: u32,
}

/// Outcome of an agent task. Fields beyond `steps` and `finalResult` are
/// kept as-is so they survive re-serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub final_result: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskResponse {
    #[serde(default)]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub data: Option<AgentTaskData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        let status: JobStatus = serde_json::from_value(json!("completed")).unwrap();
        assert!(status.is_terminal());
        let status: JobStatus = serde_json::from_value(json!("running")).unwrap();
        assert!(!status.is_terminal());
        let status: JobStatus = serde_json::from_value(json!("stalled")).unwrap();
        assert_eq!(status, JobStatus::Unknown);
    }

    #[test]
    fn test_scrape_request_shape() {
        let request = ScrapeRequest {
            url: "https://example.com".to_string(),
            session_options: None,
            scrape_options: ScrapeOptions {
                formats: OutputFormats::LINKS | OutputFormats::MARKDOWN,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "url": "https://example.com",
                "scrapeOptions": { "formats": ["markdown", "links"] }
            })
        );
    }

    #[test]
    fn test_crawl_response_defaults_missing_fields() {
        let response: CrawlJobResponse = serde_json::from_value(json!({
            "jobId": "c-1",
            "status": "completed",
            "data": [{ "url": "https://example.com", "markdown": "# Hi" }],
            "totalPageBatches": 2,
            "currentPageBatch": 1
        }))
        .unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].markdown.as_deref(), Some("# Hi"));
        assert_eq!(response.total_page_batches, 2);
        assert_eq!(response.batch_size, 0);
        assert_eq!(response.error, None);
    }

    #[test]
    fn test_agent_data_keeps_unknown_fields() {
        let data: AgentTaskData = serde_json::from_value(json!({
            "steps": [{ "action": "click" }],
            "finalResult": "done",
            "sessionId": "s-9"
        }))
        .unwrap();

        assert_eq!(data.steps.len(), 1);
        assert_eq!(data.final_result, Some(json!("done")));

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["sessionId"], json!("s-9"));
    }

    #[test]
    fn test_failed_crawl_with_null_data() {
        let response: CrawlJobResponse = serde_json::from_value(json!({
            "status": "failed",
            "data": null,
            "error": "Site blocked",
            "totalCrawledPages": null
        }))
        .unwrap();

        assert_eq!(response.status, JobStatus::Failed);
        assert!(response.data.is_empty());
        assert_eq!(response.total_crawled_pages, 0);
        assert_eq!(response.error.as_deref(), Some("Site blocked"));
    }

    #[test]
    fn test_agent_task_with_null_steps() {
        let response: AgentTaskResponse = serde_json::from_value(json!({
            "jobId": "t-1",
            "status": "completed",
            "data": { "steps": null, "finalResult": "done" }
        }))
        .unwrap();

        let data = response.data.unwrap();
        assert!(data.steps.is_empty());
        assert_eq!(data.final_result, Some(json!("done")));
        assert_eq!(serde_json::to_value(&data).unwrap()["steps"], json!([]));
    }
}
