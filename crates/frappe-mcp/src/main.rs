//! Frappe MCP server binary: serves MCP over stdio, logs to stderr.

use frappe_mcp::client::{FrappeClient, FrappeConfig};
use frappe_mcp::retry::RetryConfig;
use frappe_mcp::tools::{all_tools, ToolServices};
use frappe_mcp::{transport, McpServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = FrappeConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Incomplete configuration; requests will fail authentication");
    }

    tracing::info!(site = %config.base_url, "Frappe MCP server starting");

    let site = config.base_url.clone();
    let retry = RetryConfig::creation(config.max_retries);
    let client = FrappeClient::new(config)?;
    let services = ToolServices::new(Arc::new(client), site, retry);

    let server = McpServer::frappe();
    server.register_tools(all_tools(&services)).await;

    transport::serve_stdio(&server).await?;

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
