//! precache-agent entry point.
//!
//! Boots the worker (install, then activate), then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use precache_client::{AgentConfig, Client, FetchClient, FetchConfig, TaskOutcome, Worker};
use precache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

/// Client id under which the MCP session is registered with the worker.
const SESSION_CLIENT_ID: &str = "mcp-stdio";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting precache-agent on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config)?)?);
    let worker = Arc::new(Worker::new(AgentConfig::from_app(&config)?, network, Arc::new(cache.clone())));
    worker.clients().add(Client::new(SESSION_CLIENT_ID, config.origin.clone())).await;

    worker.install().await;
    report("install", &worker.drain().await);

    if worker.skips_waiting() {
        worker.activate().await;
        report("activate", &worker.drain().await);
    }

    let handler = handler::PrecacheServer::new(worker.clone(), cache);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    report("shutdown", &worker.terminate().await);
    Ok(())
}

fn report(phase: &str, outcomes: &[TaskOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed == 0 {
        tracing::info!(phase, tasks = outcomes.len(), "pending work completed");
    } else {
        tracing::warn!(phase, tasks = outcomes.len(), failed, "pending work completed with failures");
    }
}
