//! Integration tests for Hyperbrowser MCP
//!
//! These tests drive the server as an MCP client would, against either
//! the mock backend or a mockito stand-in for the Hyperbrowser API, and over
//! a real loopback socket for the SSE transport.

use hyperbrowser_mcp::client::mock::MockCall;
use hyperbrowser_mcp::client::{MockBackend, MockClientFactory};
use hyperbrowser_mcp::config::{ApiKeyConfig, Config};
use hyperbrowser_mcp::mcp::McpServer;
use hyperbrowser_mcp::models::{AgentTaskData, AgentTaskResponse, ExtractJobResponse, JobStatus};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn backend_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.backend.base_url = base_url.to_string();
    config.backend.poll_interval_ms = 10;
    config
}

/// Server whose tools talk to the given (mock) Hyperbrowser API
fn http_server(base_url: &str, api_key: Option<&str>) -> McpServer {
    McpServer::new(
        backend_config(base_url),
        ApiKeyConfig::new(api_key.map(str::to_string)),
    )
    .unwrap()
}

fn mock_server(backend: Arc<MockBackend>) -> McpServer {
    McpServer::with_factory(
        Config::default(),
        Arc::new(MockClientFactory::new(backend)),
        ApiKeyConfig::new(Some("hb_test".to_string())),
    )
}

/// The client end of an in-memory stdio session
struct StdioClient {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    next_id: u64,
}

impl StdioClient {
    /// Serve `server` on a pipe and complete the initialize handshake
    async fn connect(server: &McpServer) -> Self {
        let (client_end, server_end) = tokio::io::duplex(1 << 20);
        let server = server.clone();
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(server_end);
            server.serve_io(read, write).await
        });

        let (read, writer) = tokio::io::split(client_end);
        let mut client = Self {
            lines: BufReader::new(read).lines(),
            writer,
            next_id: 1,
        };

        let init = client.request("initialize", initialize_params()).await;
        assert_eq!(init["result"]["protocolVersion"], "2025-03-26");
        client.send(initialized_notification()).await;
        client
    }

    async fn send(&mut self, message: Value) {
        let mut line = message.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await;

        let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
            .expect("server closed the pipe");
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["id"], id);
        response
    }
}

fn initialize_params() -> Value {
    json!({
        "protocolVersion": "2025-03-26",
        "capabilities": {},
        "clientInfo": { "name": "integration", "version": "0.0.0" }
    })
}

fn initialized_notification() -> Value {
    json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
    StdioClient::connect(server)
        .await
        .request("tools/call", json!({ "name": name, "arguments": arguments }))
        .await
}

#[tokio::test]
async fn test_scrape_all_formats_over_http_backend() {
    let mut api = mockito::Server::new_async().await;
    let screenshot_url = format!("{}/shots/page.png", api.url());

    let start = api
        .mock("POST", "/api/scrape")
        .match_header("x-api-key", "hb_test")
        .match_body(Matcher::PartialJson(json!({
            "url": "https://example.com",
            "scrapeOptions": { "formats": ["markdown", "html", "links", "screenshot"] }
        })))
        .with_body(r#"{"jobId":"job-1"}"#)
        .create_async()
        .await;
    api.mock("GET", "/api/scrape/job-1/status")
        .with_body(r#"{"status":"completed"}"#)
        .create_async()
        .await;
    api.mock("GET", "/api/scrape/job-1")
        .with_body(
            json!({
                "jobId": "job-1",
                "status": "completed",
                "data": {
                    "markdown": "# Example",
                    "html": "<h1>Example</h1>",
                    "links": ["https://example.com/a", "https://example.com/b"],
                    "screenshot": screenshot_url
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    api.mock("GET", "/shots/page.png")
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;

    let server = http_server(&api.url(), Some("hb_test"));
    let response = call_tool(
        &server,
        "scrape_webpage",
        json!({
            "url": "https://example.com",
            "outputFormat": ["screenshot", "links", "html", "markdown"]
        }),
    )
    .await;

    start.assert_async().await;
    let result = &response["result"];
    assert_eq!(result["isError"], false);

    let content = result["content"].as_array().unwrap();
    assert_eq!(content.len(), 5);
    assert_eq!(content[0], json!({ "type": "text", "text": "# Example" }));
    assert_eq!(content[1]["text"], "<h1>Example</h1>");
    assert_eq!(content[2]["type"], "resource");
    assert_eq!(content[2]["resource"]["uri"], "https://example.com/a");
    assert_eq!(content[3]["resource"]["uri"], "https://example.com/b");
    assert_eq!(content[4]["type"], "image");
    assert_eq!(content[4]["mimeType"], "image/png");
}

#[tokio::test]
async fn test_backend_job_error_is_passed_through() {
    let mut api = mockito::Server::new_async().await;
    api.mock("POST", "/api/scrape")
        .with_body(r#"{"jobId":"job-2"}"#)
        .create_async()
        .await;
    api.mock("GET", "/api/scrape/job-2/status")
        .with_body(r#"{"status":"failed"}"#)
        .create_async()
        .await;
    api.mock("GET", "/api/scrape/job-2")
        .with_body(r#"{"jobId":"job-2","status":"failed","error":"Navigation timeout"}"#)
        .create_async()
        .await;

    let server = http_server(&api.url(), Some("hb_test"));
    let response = call_tool(
        &server,
        "scrape_webpage",
        json!({ "url": "https://slow.example.com", "outputFormat": ["markdown"] }),
    )
    .await;

    assert_eq!(response["result"]["isError"], true);
    assert_eq!(response["result"]["content"][0]["text"], "Navigation timeout");
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_backend() {
    let mut api = mockito::Server::new_async().await;
    let crawl = api
        .mock("POST", "/api/crawl")
        .expect(0)
        .create_async()
        .await;
    let task = api
        .mock("POST", "/api/task/browser-use")
        .expect(0)
        .create_async()
        .await;

    let server = http_server(&api.url(), Some("hb_test"));
    for arguments in [
        json!({ "url": "https://example.com", "outputFormat": ["markdown"], "maxPages": 0 }),
        json!({ "url": "https://example.com", "outputFormat": ["markdown"], "maxPages": 1001 }),
        json!({ "url": "https://example.com", "outputFormat": [] }),
        json!({ "url": "https://example.com", "outputFormat": ["pdf"] }),
        json!({ "url": "example", "outputFormat": ["markdown"] }),
    ] {
        let response = call_tool(&server, "crawl_webpages", arguments).await;
        assert_eq!(response["error"]["code"], -32602);
    }

    let response = call_tool(
        &server,
        "browser_use",
        json!({ "task": "Find the price", "maxSteps": "abc" }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);

    crawl.assert_async().await;
    task.assert_async().await;
}

#[tokio::test]
async fn test_missing_api_key_is_a_tool_error() {
    let mut api = mockito::Server::new_async().await;
    let extract = api
        .mock("POST", "/api/extract")
        .expect(0)
        .create_async()
        .await;

    let server = http_server(&api.url(), None);
    let response = call_tool(
        &server,
        "extract_structured_data",
        json!({ "urls": ["https://example.com"], "prompt": "Get the title" }),
    )
    .await;

    assert_eq!(response["result"]["isError"], true);
    assert_eq!(
        response["result"]["content"][0]["text"],
        "No API key provided or found in environment variables"
    );
    extract.assert_async().await;
}

#[tokio::test]
async fn test_extract_drops_unusable_schemas() {
    let backend = Arc::new(MockBackend::new());
    backend.set_extract_response(Ok(ExtractJobResponse {
        job_id: "job-3".to_string(),
        status: JobStatus::Completed,
        data: Some(json!({ "title": "Example Domain" })),
        error: None,
    }));
    let server = mock_server(backend.clone());

    for schema in [json!("{not json"), json!({ "type": 42 })] {
        let response = call_tool(
            &server,
            "extract_structured_data",
            json!({ "urls": ["https://example.com"], "prompt": "Get the title", "schema": schema }),
        )
        .await;
        assert_eq!(response["result"]["isError"], false);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "{\n  \"title\": \"Example Domain\"\n}"
        );
    }

    let response = call_tool(
        &server,
        "extract_structured_data",
        json!({
            "urls": ["https://example.com"],
            "prompt": "Get the title",
            "schema": r#"{"type":"object","properties":{"title":{"type":"string"}}}"#
        }),
    )
    .await;
    assert_eq!(response["result"]["isError"], false);

    let schemas: Vec<Option<Value>> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockCall::Extract(request) => Some(request.schema),
            _ => None,
        })
        .collect();
    assert_eq!(schemas.len(), 3);
    assert_eq!(schemas[0], None);
    assert_eq!(schemas[1], None);
    assert_eq!(schemas[2].as_ref().unwrap()["type"], "object");
}

#[tokio::test]
async fn test_browser_use_hides_steps_unless_requested() {
    let backend = Arc::new(MockBackend::new());
    backend.set_agent_task_response(Ok(AgentTaskResponse {
        job_id: "task-1".to_string(),
        status: JobStatus::Completed,
        data: Some(AgentTaskData {
            steps: (0..7).map(|i| json!({ "step": i })).collect(),
            final_result: Some(json!("$19.99")),
            ..Default::default()
        }),
        error: None,
        live_url: None,
    }));
    let server = mock_server(backend);

    let response = call_tool(&server, "browser_use", json!({ "task": "Find the price" })).await;
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let data: Value = serde_json::from_str(text).unwrap();
    assert_eq!(data["steps"], json!([]));
    assert_eq!(data["finalResult"], "$19.99");

    let response = call_tool(
        &server,
        "browser_use",
        json!({ "task": "Find the price", "returnStepInfo": true }),
    )
    .await;
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let data: Value = serde_json::from_str(text).unwrap();
    assert_eq!(data["steps"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_delete_missing_profile() {
    let mut api = mockito::Server::new_async().await;
    api.mock("DELETE", "/api/profile/prof-404")
        .with_status(404)
        .with_body(r#"{"message":"Profile not found"}"#)
        .create_async()
        .await;

    let server = http_server(&api.url(), Some("hb_test"));
    let response = call_tool(&server, "delete_profile", json!({ "profileId": "prof-404" })).await;

    assert_eq!(response["result"]["isError"], true);
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Profile with ID prof-404 not found."
    );
}

/// Reads server-sent events off a streaming response
struct EventReader {
    response: reqwest::Response,
    buffer: String,
}

impl EventReader {
    async fn next(&mut self) -> (String, String) {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let raw: String = self.buffer.drain(..end + 2).collect();
                let mut event = String::new();
                let mut data = String::new();
                for line in raw.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        event = value.trim().to_string();
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                // Keep-alive comments carry neither
                if event.is_empty() && data.is_empty() {
                    continue;
                }
                return (event, data);
            }

            let chunk = tokio::time::timeout(Duration::from_secs(5), self.response.chunk())
                .await
                .expect("timed out waiting for an event")
                .unwrap()
                .expect("stream ended");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

async fn open_stream(base: &str, token: Option<&str>) -> EventReader {
    let mut request = reqwest::Client::new().get(format!("{}/sse", base));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    EventReader {
        response,
        buffer: String::new(),
    }
}

async fn post_message(base: &str, endpoint: &str, token: Option<&str>, message: Value) {
    let mut request = reqwest::Client::new()
        .post(format!("{}{}", base, endpoint))
        .json(&message);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_sse_session_round_trip() {
    let server = mock_server(Arc::new(MockBackend::new()));
    let (addr, handle) = server.run_sse("127.0.0.1:0", false).await.unwrap();
    let base = format!("http://{}", addr);

    let mut events = open_stream(&base, None).await;
    let (event, endpoint) = events.next().await;
    assert_eq!(event, "endpoint");
    assert!(endpoint.starts_with("/messages?sessionId="));

    post_message(
        &base,
        &endpoint,
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": initialize_params()
        }),
    )
    .await;

    let (event, data) = events.next().await;
    assert_eq!(event, "message");
    let response: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");

    post_message(&base, &endpoint, None, initialized_notification()).await;
    post_message(
        &base,
        &endpoint,
        None,
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
    )
    .await;

    let (_, data) = events.next().await;
    let response: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(response["id"], 2);
    assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 9);

    let unknown = reqwest::Client::new()
        .post(format!("{}/messages?sessionId=nope", base))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn test_sse_bearer_token_authenticates_and_authorizes_backend_calls() {
    let mut api = mockito::Server::new_async().await;
    let me = api
        .mock("GET", "/api/me")
        .match_header("x-api-key", "hb_bearer")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    api.mock("GET", "/api/me")
        .match_header("x-api-key", "hb_wrong")
        .with_status(401)
        .create_async()
        .await;
    let create = api
        .mock("POST", "/api/profile")
        .match_header("x-api-key", "hb_bearer")
        .with_body(r#"{"id":"prof-1"}"#)
        .create_async()
        .await;

    // No configured key: the bearer token is the only credential
    let server = http_server(&api.url(), None);
    let (addr, handle) = server.run_sse("127.0.0.1:0", true).await.unwrap();
    let base = format!("http://{}", addr);

    let anonymous = reqwest::get(format!("{}/sse", base)).await.unwrap();
    assert_eq!(anonymous.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert!(anonymous
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .is_some());

    let wrong = reqwest::Client::new()
        .get(format!("{}/sse", base))
        .bearer_auth("hb_wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(
        body["error_description"],
        "Invalid API key or validation service error (Status: 401)"
    );

    let mut events = open_stream(&base, Some("hb_bearer")).await;
    let (_, endpoint) = events.next().await;

    post_message(
        &base,
        &endpoint,
        Some("hb_bearer"),
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": initialize_params() }),
    )
    .await;
    let (_, data) = events.next().await;
    let response: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(response["id"], 1);
    post_message(&base, &endpoint, Some("hb_bearer"), initialized_notification()).await;

    post_message(
        &base,
        &endpoint,
        Some("hb_bearer"),
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": "create_profile", "arguments": {} }
        }),
    )
    .await;

    let (_, data) = events.next().await;
    let response: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(response["id"], 7);
    assert_eq!(response["result"]["isError"], false);
    assert!(response["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("prof-1"));

    // Stream open and every message post were verified; only one remote check
    me.assert_async().await;
    create.assert_async().await;

    handle.abort();
}
