//! # Hyperbrowser MCP
//!
//! A Model Context Protocol (MCP) server exposing Hyperbrowser's cloud
//! browsers as tools: scraping, crawling, structured extraction, browser
//! agents and persistent profiles.
//!
//! ## Architecture
//!
//! - [`models`]: Tool parameters and Hyperbrowser request/response payloads
//! - [`client`]: The [`client::Backend`] trait and its HTTP implementation
//! - [`mcp`]: Tool handlers, the rmcp service, stdio and SSE transports
//! - [`utils`]: Shared HTTP client and image encoding
//! - [`config`]: Configuration management

pub mod client;
pub mod config;
pub mod mcp;
pub mod models;
pub mod utils;

pub use client::{Backend, ClientError};
pub use mcp::{InvocationContext, McpServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
