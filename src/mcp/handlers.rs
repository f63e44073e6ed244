//! Tool handlers for the Hyperbrowser tools.
//!
//! Every handler follows the same steps: parse the arguments (a
//! [`ParamError`] rejects the call outright), resolve an API key and a
//! client, issue exactly one backend call, and reshape the response into
//! content blocks. Backend and transport failures become error results; a
//! handler never propagates them.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use serde_json::Value;

use super::context::InvocationContext;
use super::resources::text_resource;
use super::tools::ToolHandler;
use crate::client::{resolve_api_key, AgentKind, Backend, ClientError, ClientFactory};
use crate::config::ApiKeyConfig;
use crate::models::{
    AgentTaskParams, AgentTaskRequest, AgentTaskResponse, CrawlJobResponse, CrawlParams,
    CrawlRequest, DeleteProfileParams, ExtractParams, ExtractRequest, ListProfilesParams,
    OutputFormats, ParamError, ScrapeData, ScrapeOptions, ScrapeParams, ScrapeRequest,
};
use crate::utils::encode_image;

/// Media type of crawl screenshots, which arrive already encoded
pub const CRAWL_SCREENSHOT_MIME_TYPE: &str = "image/webp";

/// Text of the block appended when a scrape screenshot cannot be fetched
pub const SCREENSHOT_FAILED: &str = "Failed to get screenshot";

/// Text returned when an agent task completes without data
pub const TASK_DATA_MISSING: &str = "Task result data is empty/missing";

/// Resolves a backend client for each call
#[derive(Debug)]
pub struct ClientProvider {
    factory: Arc<dyn ClientFactory>,
    configured_key: ApiKeyConfig,
}

impl ClientProvider {
    pub fn new(factory: Arc<dyn ClientFactory>, configured_key: ApiKeyConfig) -> Self {
        Self {
            factory,
            configured_key,
        }
    }

    /// A fresh client authenticated with the key chosen for this call
    pub fn client(
        &self,
        explicit_key: Option<&str>,
        context: &InvocationContext,
    ) -> Result<Arc<dyn Backend>, ClientError> {
        let api_key = resolve_api_key(explicit_key, context, &self.configured_key)?;
        Ok(self.factory.create(&api_key))
    }
}

/// Resolve a client or bail out of the handler with an error result
macro_rules! client_or_return {
    ($clients:expr, $key:expr, $context:expr) => {
        match $clients.client($key, $context) {
            Ok(client) => client,
            Err(e) => return Ok(error_result(e.to_string())),
        }
    };
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

/// A link rendered as a resource whose URI and text are the link itself
fn link_content(link: &str) -> Content {
    Content::resource(text_resource(link, link, None))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Append the text and link blocks of one page, in format order
fn push_page_blocks(
    content: &mut Vec<Content>,
    formats: OutputFormats,
    markdown: Option<&str>,
    html: Option<&str>,
    links: Option<&[String]>,
) {
    if formats.contains(OutputFormats::MARKDOWN) {
        if let Some(markdown) = non_empty(markdown) {
            content.push(Content::text(markdown));
        }
    }

    if formats.contains(OutputFormats::HTML) {
        if let Some(html) = non_empty(html) {
            content.push(Content::text(html));
        }
    }

    if formats.contains(OutputFormats::LINKS) {
        for link in links.unwrap_or_default() {
            content.push(link_content(link));
        }
    }
}

/// Reshape a scrape result, downloading the screenshot if one was captured
pub(crate) async fn scrape_result(
    client: &dyn Backend,
    formats: OutputFormats,
    data: Option<ScrapeData>,
) -> CallToolResult {
    let mut content = Vec::new();
    let Some(data) = data else {
        return CallToolResult::success(content);
    };

    push_page_blocks(
        &mut content,
        formats,
        data.markdown.as_deref(),
        data.html.as_deref(),
        data.links.as_deref(),
    );

    if formats.contains(OutputFormats::SCREENSHOT) {
        if let Some(url) = non_empty(data.screenshot.as_deref()) {
            match client.download_image(url).await {
                Ok(image) => {
                    let encoded = encode_image(&image.bytes, image.content_type.as_deref());
                    content.push(Content::image(encoded.data, encoded.mime_type));
                }
                Err(e) => {
                    tracing::warn!("Failed to download screenshot {}: {}", url, e);
                    content.push(Content::text(SCREENSHOT_FAILED));
                    return CallToolResult::error(content);
                }
            }
        }
    }

    CallToolResult::success(content)
}

/// Reshape a crawl result page by page
pub(crate) fn crawl_result(formats: OutputFormats, response: &CrawlJobResponse) -> CallToolResult {
    let mut content = Vec::new();

    for page in &response.data {
        push_page_blocks(
            &mut content,
            formats,
            page.markdown.as_deref(),
            page.html.as_deref(),
            page.links.as_deref(),
        );

        if formats.contains(OutputFormats::SCREENSHOT) {
            if let Some(screenshot) = non_empty(page.screenshot.as_deref()) {
                content.push(Content::image(screenshot, CRAWL_SCREENSHOT_MIME_TYPE));
            }
        }
    }

    CallToolResult::success(content)
}

/// Render an agent's final result for the computer-use summary
fn final_result_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

/// Reshape an agent task result.
///
/// `summary` selects the computer-use layout (`Final Result: ...` followed
/// by the pretty-printed steps) instead of the compact task JSON.
pub(crate) fn agent_task_result(
    response: AgentTaskResponse,
    return_step_info: bool,
    summary: bool,
) -> CallToolResult {
    let Some(mut data) = response.data else {
        return error_result(TASK_DATA_MISSING);
    };

    if !return_step_info {
        data.steps.clear();
    }

    let rendered = if summary {
        serde_json::to_string_pretty(&data.steps).map(|steps| {
            format!(
                "Final Result: {}\n\nSteps: {}",
                final_result_text(data.final_result.as_ref()),
                steps
            )
        })
    } else {
        serde_json::to_string(&data)
    };

    match rendered {
        Ok(text) => text_result(text),
        Err(e) => error_result(format!("Failed to render task result: {}", e)),
    }
}

fn pretty_json<T: serde::Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => text_result(text),
        Err(e) => error_result(format!("Failed to render result: {}", e)),
    }
}

/// Handler for `scrape_webpage`
#[derive(Debug)]
pub struct ScrapeWebpageHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for ScrapeWebpageHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = ScrapeParams::from_args(args)?;
        let client = client_or_return!(self.clients, params.api_key.as_deref(), context);

        tracing::info!("Scraping {} as {:?}", params.url, params.output_format.names());
        let request = ScrapeRequest {
            url: params.url,
            session_options: params.session_options,
            scrape_options: ScrapeOptions {
                formats: params.output_format,
            },
        };

        let response = match client.scrape(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Scrape of {} failed: {}", request.url, e);
                return Ok(error_result(e.to_string()));
            }
        };

        if let Some(error) = response.error {
            return Ok(error_result(error));
        }

        Ok(scrape_result(client.as_ref(), params.output_format, response.data).await)
    }
}

/// Handler for `crawl_webpages`
#[derive(Debug)]
pub struct CrawlWebpagesHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for CrawlWebpagesHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = CrawlParams::from_args(args)?;
        let client = client_or_return!(self.clients, params.api_key.as_deref(), context);

        tracing::info!("Crawling {} (max {} pages)", params.url, params.max_pages);
        let request = CrawlRequest {
            url: params.url,
            session_options: params.session_options,
            scrape_options: ScrapeOptions {
                formats: params.output_format,
            },
            follow_links: params.follow_links,
            max_pages: params.max_pages,
            ignore_sitemap: params.ignore_sitemap,
        };

        let response = match client.crawl(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Crawl of {} failed: {}", request.url, e);
                return Ok(error_result(e.to_string()));
            }
        };

        if let Some(error) = response.error.as_deref() {
            return Ok(error_result(error));
        }

        Ok(crawl_result(params.output_format, &response))
    }
}

/// Handler for `extract_structured_data`
#[derive(Debug)]
pub struct ExtractStructuredDataHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for ExtractStructuredDataHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = ExtractParams::from_args(args)?;
        let client = client_or_return!(self.clients, params.api_key.as_deref(), context);

        tracing::info!(
            "Extracting from {} url(s), schema {}",
            params.urls.len(),
            if params.schema.is_some() { "provided" } else { "absent" }
        );
        let request = ExtractRequest {
            urls: params.urls,
            prompt: params.prompt,
            schema: params.schema,
            session_options: params.session_options,
        };

        let response = match client.extract(&request).await {
            Ok(response) => response,
            Err(e) => return Ok(error_result(e.to_string())),
        };

        if let Some(error) = response.error {
            return Ok(error_result(error));
        }

        Ok(pretty_json(&response.data.unwrap_or(Value::Null)))
    }
}

/// Handler for the browser agents (`browser_use` and the computer-use
/// agents)
#[derive(Debug)]
pub struct AgentTaskHandler {
    pub clients: Arc<ClientProvider>,
    pub agent: AgentKind,
}

#[async_trait]
impl ToolHandler for AgentTaskHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = AgentTaskParams::from_args(args)?;
        let client = client_or_return!(self.clients, params.api_key.as_deref(), context);

        tracing::info!(
            "Running {:?} task (max {} steps)",
            self.agent,
            params.max_steps
        );
        let request = AgentTaskRequest {
            task: params.task,
            session_options: params.session_options,
            max_steps: params.max_steps,
        };

        let response = match client.run_agent_task(self.agent, &request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{:?} task failed: {}", self.agent, e);
                return Ok(error_result(e.to_string()));
            }
        };

        if let Some(error) = response.error {
            return Ok(error_result(error));
        }

        let summary = self.agent != AgentKind::BrowserUse;
        Ok(agent_task_result(response, params.return_step_info, summary))
    }
}

/// Handler for `create_profile`
#[derive(Debug)]
pub struct CreateProfileHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for CreateProfileHandler {
    async fn execute(
        &self,
        _args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let client = client_or_return!(self.clients, None, context);

        match client.create_profile().await {
            Ok(profile) => {
                tracing::info!("Created profile {}", profile.id);
                Ok(pretty_json(&profile))
            }
            Err(e) => Ok(error_result(format!("Failed to create profile: {}", e))),
        }
    }
}

/// Handler for `delete_profile`
#[derive(Debug)]
pub struct DeleteProfileHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for DeleteProfileHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = DeleteProfileParams::from_args(args)?;
        let client = client_or_return!(self.clients, None, context);
        let id = &params.profile_id;

        let result = match client.delete_profile(id).await {
            Ok(()) => {
                tracing::info!("Deleted profile {}", id);
                text_result(format!("Successfully deleted profile with ID: {}", id))
            }
            Err(ClientError::Api { status: 404, .. }) => {
                error_result(format!("Profile with ID {} not found.", id))
            }
            Err(ClientError::Api { status, message }) => error_result(format!(
                "Failed to delete profile {}: {} (Status: {})",
                id, message, status
            )),
            Err(e) => error_result(format!("Failed to delete profile {}: {}", id, e)),
        };

        Ok(result)
    }
}

/// Handler for `list_profiles`
#[derive(Debug)]
pub struct ListProfilesHandler {
    pub clients: Arc<ClientProvider>,
}

#[async_trait]
impl ToolHandler for ListProfilesHandler {
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError> {
        let params = ListProfilesParams::from_args(args)?;
        let client = client_or_return!(self.clients, None, context);

        match client.list_profiles(params.page, params.limit).await {
            Ok(listing) => Ok(pretty_json(&listing)),
            Err(e) => Ok(error_result(format!("Failed to list profiles: {}", e))),
        }
    }
}
