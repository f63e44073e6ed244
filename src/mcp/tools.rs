//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use serde_json::{json, Value};

use super::context::InvocationContext;
use super::handlers::{
    AgentTaskHandler, ClientProvider, CrawlWebpagesHandler, CreateProfileHandler,
    DeleteProfileHandler, ExtractStructuredDataHandler, ListProfilesHandler,
    ScrapeWebpageHandler,
};
use crate::client::AgentKind;
use crate::models::ParamError;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "scrape_webpage")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

impl Tool {
    /// The `tools/list` entry for this tool
    pub fn descriptor(&self) -> rmcp::model::Tool {
        let schema: JsonObject = match &self.input_schema {
            Value::Object(map) => map.clone(),
            _ => JsonObject::new(),
        };
        rmcp::model::Tool::new(self.name.clone(), self.description.clone(), Arc::new(schema))
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments.
    ///
    /// Invalid arguments are reported as `Err`; every other failure is a
    /// result flagged `isError`.
    async fn execute(
        &self,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ParamError>;
}

/// Errors from dispatching a tool call
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidParams(#[from] ParamError),
}

/// Registry for all MCP tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every Hyperbrowser tool
    pub fn hyperbrowser(clients: Arc<ClientProvider>) -> Self {
        let mut registry = Self::new();
        registry.register_hyperbrowser_tools(&clients);
        registry
    }

    fn register_hyperbrowser_tools(&mut self, clients: &Arc<ClientProvider>) {
        // 1. scrape_webpage
        self.register(Tool {
            name: "scrape_webpage".to_string(),
            description: "Scrape a webpage and extract its content in various formats. This tool allows fetching content from a single URL with configurable browser behavior options. Use this for extracting text content, HTML structure, collecting links, or capturing screenshots of webpages.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "format": "uri",
                        "description": "The URL of the webpage to scrape"
                    },
                    "apiKey": api_key_schema(),
                    "sessionOptions": session_options_schema(),
                    "outputFormat": output_format_schema()
                },
                "required": ["url", "outputFormat"]
            }),
            handler: Arc::new(ScrapeWebpageHandler {
                clients: clients.clone(),
            }),
        });

        // 2. crawl_webpages
        self.register(Tool {
            name: "crawl_webpages".to_string(),
            description: "Crawl a website starting from a URL and explore linked pages. This tool allows systematic collection of content from multiple pages within a domain. Use this for larger data collection tasks, content indexing, or site mapping.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "format": "uri",
                        "description": "The URL of the webpage to crawl."
                    },
                    "apiKey": api_key_schema(),
                    "sessionOptions": session_options_schema(),
                    "outputFormat": output_format_schema(),
                    "followLinks": {
                        "type": "boolean",
                        "description": "Whether to follow links on the crawled webpages"
                    },
                    "maxPages": bound_schema("Maximum number of pages to crawl"),
                    "ignoreSitemap": {
                        "type": "boolean",
                        "default": false
                    }
                },
                "required": ["url", "outputFormat", "followLinks"]
            }),
            handler: Arc::new(CrawlWebpagesHandler {
                clients: clients.clone(),
            }),
        });

        // 3. extract_structured_data
        self.register(Tool {
            name: "extract_structured_data".to_string(),
            description: "Extract structured data from one or more webpages according to a specified schema. This tool parses webpage content and returns JSON-formatted data based on your prompt instructions. Ideal for extracting product information, article metadata, contact details, or any structured content from websites.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "urls": {
                        "type": "array",
                        "items": { "type": "string", "format": "uri" },
                        "description": "The list of URLs of the webpages to extract structured information from. Can include wildcards (e.g. https://example.com/*)"
                    },
                    "apiKey": api_key_schema(),
                    "prompt": {
                        "type": "string",
                        "description": "The prompt to use for the extraction"
                    },
                    "schema": {
                        "description": "The json schema to use for the extraction. Must provide an object describing a spec compliant json schema, any other types are invalid."
                    },
                    "sessionOptions": session_options_schema()
                },
                "required": ["urls", "prompt"]
            }),
            handler: Arc::new(ExtractStructuredDataHandler {
                clients: clients.clone(),
            }),
        });

        // 4-6. Browser agents
        let agents = [
            (
                "browser_use",
                AgentKind::BrowserUse,
                "Perform a certain task inside a browser session. Will perform the entirety of the task inside the browser, and return the results.",
            ),
            (
                "openai_computer_use_agent",
                AgentKind::OpenAiCua,
                "Use OpenAI's Computer Use Agent (CUA) to autonomously perform complex, multi-step browser tasks in a cloud browser: navigating sites, filling forms, and interacting with web applications. Provide a detailed, step-by-step task description with all relevant context and the expected outcome. Returns the final result, or an error message if the task fails.",
            ),
            (
                "claude_computer_use_agent",
                AgentKind::ClaudeCua,
                "Use Anthropic's Claude Computer Use agent to autonomously perform complex, multi-step browser tasks in a cloud browser. Best for tasks needing careful reasoning across several pages. Provide a detailed task description with all relevant context and the expected outcome. Returns the final result, or an error message if the task fails.",
            ),
        ];

        for (name, agent, description) in agents {
            self.register(Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema: agent_task_schema(),
                handler: Arc::new(AgentTaskHandler {
                    clients: clients.clone(),
                    agent,
                }),
            });
        }

        // 7. create_profile
        self.register(Tool {
            name: "create_profile".to_string(),
            description: "Creates a new persistent Hyperbrowser profile.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(CreateProfileHandler {
                clients: clients.clone(),
            }),
        });

        // 8. delete_profile
        self.register(Tool {
            name: "delete_profile".to_string(),
            description: "Deletes an existing persistent Hyperbrowser profile.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "profileId": {
                        "type": "string",
                        "minLength": 1,
                        "description": "ID of the profile to delete"
                    }
                },
                "required": ["profileId"]
            }),
            handler: Arc::new(DeleteProfileHandler {
                clients: clients.clone(),
            }),
        });

        // 9. list_profiles
        self.register(Tool {
            name: "list_profiles".to_string(),
            description:
                "Lists existing persistent Hyperbrowser profiles, with optional pagination."
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "page": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Page number"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Number of profiles per page"
                    }
                }
            }),
            handler: Arc::new(ListProfilesHandler {
                clients: clients.clone(),
            }),
        });
    }

    /// Register a new tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// All registered tools, ordered by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    pub async fn execute(
        &self,
        name: &str,
        args: &Value,
        context: &InvocationContext,
    ) -> Result<CallToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        Ok(tool.handler.execute(args, context).await?)
    }
}

fn api_key_schema() -> Value {
    json!({
        "type": "string",
        "description": "The API key to use for the scrape"
    })
}

fn session_options_schema() -> Value {
    json!({
        "type": "object",
        "description": "Options for the browser session. Avoid setting these if not mentioned explicitly",
        "properties": {
            "useProxy": {
                "type": "boolean",
                "default": false,
                "description": "Whether to use a proxy. Recommended true."
            },
            "useStealth": {
                "type": "boolean",
                "default": false,
                "description": "Whether to use stealth mode. Recommended false."
            },
            "solveCaptchas": {
                "type": "boolean",
                "default": false,
                "description": "Whether to solve captchas. Recommended false."
            },
            "acceptCookies": {
                "type": "boolean",
                "default": false,
                "description": "Whether to automatically close the accept cookies popup. Recommended false."
            }
        }
    })
}

fn output_format_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "string",
            "enum": ["markdown", "html", "links", "screenshot"]
        },
        "minItems": 1,
        "description": "The format of the output"
    })
}

fn bound_schema(description: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 1000,
        "default": 10,
        "description": description
    })
}

fn agent_task_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task": {
                "type": "string",
                "description": "The task to perform inside the browser"
            },
            "apiKey": api_key_schema(),
            "sessionOptions": session_options_schema(),
            "returnStepInfo": {
                "type": "boolean",
                "default": false,
                "description": "Whether to return step-by-step information about the task. Should be false by default. May contain excessive information."
            },
            "maxSteps": bound_schema("Maximum number of steps the agent may take")
        },
        "required": ["task"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockBackend, MockClientFactory};
    use crate::config::ApiKeyConfig;

    fn registry() -> ToolRegistry {
        let factory = Arc::new(MockClientFactory::new(Arc::new(MockBackend::new())));
        ToolRegistry::hyperbrowser(Arc::new(ClientProvider::new(
            factory,
            ApiKeyConfig::default(),
        )))
    }

    #[test]
    fn test_registers_nine_tools() {
        let registry = registry();
        let names: Vec<_> = registry.all().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "browser_use",
                "claude_computer_use_agent",
                "crawl_webpages",
                "create_profile",
                "delete_profile",
                "extract_structured_data",
                "list_profiles",
                "openai_computer_use_agent",
                "scrape_webpage",
            ]
        );
    }

    #[test]
    fn test_input_schemas_compile() {
        for tool in registry().all() {
            assert!(
                crate::models::is_valid_json_schema(&tool.input_schema),
                "schema of {} does not compile",
                tool.name
            );
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let registry = registry();
        let descriptor = registry.get("delete_profile").unwrap().descriptor();
        let value = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(value["name"], "delete_profile");
        assert_eq!(value["inputSchema"]["required"], json!(["profileId"]));
        assert_eq!(value["inputSchema"]["properties"]["profileId"]["minLength"], 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry()
            .execute("take_screenshot", &Value::Null, &InvocationContext::Stdio)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "take_screenshot"));
    }
}
