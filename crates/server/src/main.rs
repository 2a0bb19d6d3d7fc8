//! storyshell server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use storyshell_client::{FetchConfig, HttpFetcher, Registration, ServiceWorker, WorkerConfig};
use storyshell_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
#[cfg(test)]
mod test_support;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        api_origin = %config.api_origin,
        "Starting storyshell server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config))?);
    let worker = ServiceWorker::new(WorkerConfig::from_app_config(&config)?, db.clone(), fetcher, Registration::new())
        .await?;

    // Requests are served by the strategies whatever the lifecycle outcome.
    match worker.on_install().await {
        Ok(_) => {
            if let Err(err) = worker.on_activate().await {
                tracing::warn!(error = %err, "activation failed");
            }
        }
        Err(err) => tracing::warn!(error = %err, "install failed, continuing without a fresh app shell"),
    }

    let handler = handler::StoryShellServer::new(db, Arc::new(worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
