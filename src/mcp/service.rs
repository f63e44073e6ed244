//! MCP request handling on top of the rmcp SDK.
//!
//! The SDK owns JSON-RPC framing, `ping`, cancellation and request
//! concurrency; [`HyperbrowserService`] answers `initialize`, `tools/*` and
//! `resources/*`. Each connection gets its own clone of the service, bound
//! to that connection's [`InvocationContext`].

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, ErrorData as McpError, Implementation,
    InitializeRequestParams, InitializeResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ReadResourceRequestParams, ReadResourceResult,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde_json::{json, Value};

use super::context::InvocationContext;
use super::resources::{ResourceError, ResourceRegistry};
use super::tools::{ToolError, ToolRegistry};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "hyperbrowser";

const INSTRUCTIONS: &str = "Hyperbrowser cloud browsers as tools. \
    scrape_webpage, crawl_webpages and extract_structured_data read the web; \
    browser_use, openai_computer_use_agent and claude_computer_use_agent run \
    multi-step tasks in a remote browser; create_profile, delete_profile and \
    list_profiles manage persistent profiles. Read hyperbrowser://welcome for details.";

/// Protocol revision to answer with: the client's if we speak it, else
/// the oldest one we support
pub fn negotiate_protocol_version(requested: &ProtocolVersion) -> ProtocolVersion {
    [
        ProtocolVersion::V_2025_06_18,
        ProtocolVersion::V_2025_03_26,
        ProtocolVersion::V_2024_11_05,
    ]
    .into_iter()
    .find(|supported| supported == requested)
    .unwrap_or(ProtocolVersion::V_2024_11_05)
}

/// The Hyperbrowser tools and documents, bound to one connection
#[derive(Debug, Clone)]
pub struct HyperbrowserService {
    tools: Arc<ToolRegistry>,
    resources: ResourceRegistry,
    context: InvocationContext,
}

impl HyperbrowserService {
    pub fn new(tools: Arc<ToolRegistry>, resources: ResourceRegistry) -> Self {
        Self {
            tools,
            resources,
            context: InvocationContext::Stdio,
        }
    }

    /// A copy of this service for a connection with the given context
    pub fn with_context(&self, context: InvocationContext) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn invalid_arguments(&self, tool: &str, error: ToolError) -> McpError {
        match error {
            ToolError::NotFound(_) => McpError::invalid_params(error.to_string(), None),
            ToolError::InvalidParams(e) => McpError::invalid_params(
                format!("Invalid arguments for tool {}: {}", tool, e),
                None,
            ),
        }
    }
}

impl ServerHandler for HyperbrowserService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Hyperbrowser".into()),
                description: Some(
                    "Scrape, crawl, extract and automate the web with Hyperbrowser cloud browsers"
                        .into(),
                ),
                icons: None,
                website_url: Some("https://hyperbrowser.ai".into()),
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    async fn initialize(
        &self,
        request: InitializeRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        let protocol_version = negotiate_protocol_version(&request.protocol_version);
        let client_name = request.client_info.name.as_str();
        tracing::info!(
            protocol = ?protocol_version,
            "Initializing session for {}",
            client_name
        );

        Ok(ServerInfo {
            protocol_version,
            ..self.get_info()
        })
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.tools.all().iter().map(|t| t.descriptor()).collect();
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let name: &str = &request.name;
        let args = Value::Object(request.arguments.clone().unwrap_or_default());
        tracing::debug!("Calling tool {}", name);

        let result = self
            .tools
            .execute(name, &args, &self.context)
            .await
            .map_err(|e| self.invalid_arguments(name, e))?;

        if result.is_error == Some(true) {
            let text = result
                .content
                .first()
                .and_then(|c| c.as_text())
                .map(|t| t.text.as_str())
                .unwrap_or_default();
            tracing::info!("Tool {} returned an error: {}", name, text);
        }

        Ok(result)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: self.resources.list(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.read(&request.uri) {
            Ok(contents) => Ok(ReadResourceResult {
                contents: vec![contents],
            }),
            Err(e @ ResourceError::NotFound(_)) => Err(McpError::resource_not_found(
                e.to_string(),
                Some(json!({ "uri": request.uri })),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_negotiation() {
        assert_eq!(
            negotiate_protocol_version(&ProtocolVersion::V_2025_03_26),
            ProtocolVersion::V_2025_03_26
        );
        assert_eq!(
            negotiate_protocol_version(&ProtocolVersion::V_2025_06_18),
            ProtocolVersion::V_2025_06_18
        );
    }

    #[test]
    fn test_server_info_advertises_tools_and_resources() {
        let service = HyperbrowserService::new(
            Arc::new(ToolRegistry::new()),
            ResourceRegistry::new(),
        );
        let info = serde_json::to_value(service.get_info()).unwrap();

        assert_eq!(info["serverInfo"]["name"], SERVER_NAME);
        assert!(info["capabilities"]["tools"].is_object());
        assert!(info["capabilities"]["resources"].is_object());
    }

    #[test]
    fn test_with_context_keeps_tools() {
        let service = HyperbrowserService::new(
            Arc::new(ToolRegistry::new()),
            ResourceRegistry::new(),
        );
        let network = service.with_context(InvocationContext::Network {
            credential: Some("hb_conn".to_string()),
        });

        assert_eq!(service.context(), &InvocationContext::Stdio);
        assert_eq!(network.context().credential(), Some("hb_conn"));
        assert!(network.tools().is_empty());
    }
}
