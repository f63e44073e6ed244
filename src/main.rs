use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hyperbrowser_mcp::config::{find_config_file, load_config, ApiKeyConfig, ConfigFile};
use hyperbrowser_mcp::mcp::McpServer;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hyperbrowser MCP - Drive Hyperbrowser cloud browsers from MCP clients
#[derive(Parser, Debug)]
#[command(name = "hyperbrowser-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server for Hyperbrowser scraping, crawling, extraction and browser agents", long_about = None)]
struct Cli {
    /// Serve over HTTP/SSE instead of stdio
    #[arg(long)]
    sse: bool,

    /// Require bearer authentication on the SSE transport (only together with --sse)
    #[arg(long)]
    serve: bool,

    /// Host to bind to in SSE mode (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to in SSE mode (overrides the config file)
    #[arg(long, short)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(long, short)]
    quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the effective configuration (without secrets) as TOML and exit
    #[arg(long)]
    print_config: bool,
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable text
    Text,
    /// One JSON object per line
    Json,
}

impl Cli {
    fn log_filter(&self) -> String {
        let level = if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        format!("hyperbrowser_mcp={}", level)
    }

    /// Bearer authentication is only enabled when both flags are present
    fn auth_enabled(&self) -> bool {
        self.sse && self.serve
    }
}

fn init_tracing(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_filter()),
    );

    // stdout carries the stdio protocol, so logs go to stderr
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let mut config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if cli.print_config {
        print!("{}", ConfigFile::from(&config).to_toml()?);
        return Ok(());
    }

    let api_key = ApiKeyConfig::from_env(config.backend.api_key.clone());
    if api_key.key().is_none() {
        tracing::warn!("No API key configured; tools will need an apiKey argument or a bearer token");
    }

    let server = McpServer::new(config.clone(), api_key)?;

    if cli.sse {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let (bound_addr, handle) = server.run_sse(&addr, cli.auth_enabled()).await?;
        tracing::info!("Hyperbrowser MCP server running on SSE at {}", bound_addr);

        tokio::select! {
            result = handle => {
                result
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?
                    .context("SSE server failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
            }
        }
    } else {
        tracing::info!("Hyperbrowser MCP server running on stdio");
        server.run_stdio().await?;
    }

    Ok(())
}
