//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server exposing the summarize and ask tools over stdio for editor and agent
//! integrations. Shares all runtime configuration with the HTTP binary. Logs go to the file
//! layer only because stdout carries protocol frames.
use anyhow::{Context, Result};
use docnav::{config, logging, mcp::DocNavMcpServer, pipeline::DocumentPipeline};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing_file_only();
    let config = config::init_config().context("failed to load configuration")?;

    let pipeline =
        DocumentPipeline::from_config(config).context("failed to initialize model backend")?;
    let server = DocNavMcpServer::new(Arc::new(pipeline));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
