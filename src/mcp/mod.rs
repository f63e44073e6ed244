//! MCP (Model Context Protocol) implementation.

pub mod auth;
mod context;
pub mod handlers;
mod resources;
pub mod server;
pub mod service;
pub mod sse;
mod tools;

pub use auth::{AuthError, AuthInfo, TokenVerifier};
pub use context::InvocationContext;
pub use handlers::ClientProvider;
pub use resources::{ResourceError, ResourceRegistry};
pub use server::{McpServer, ServerError};
pub use service::HyperbrowserService;
pub use tools::{Tool, ToolError, ToolHandler, ToolRegistry};
