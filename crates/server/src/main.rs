//! shellcache server entry point.
//!
//! Loads configuration, opens the namespace store, runs install and
//! activate, then boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{Engine, FetchConfig, HttpOrigin, Origin};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), app_origin = %config.app_origin, "Starting shellcache server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?.with_quota(config.max_store_bytes);
    let origin: Arc<dyn Origin> = Arc::new(HttpOrigin::new(FetchConfig::from(&config))?);
    let engine = Arc::new(Engine::from_config(&config, db, origin)?);

    let lifecycle = engine.lifecycle();
    match lifecycle.install().await {
        Ok(_) => match lifecycle.activate().await {
            Ok(deleted) => tracing::info!(?deleted, "activated"),
            Err(e) => tracing::warn!(error = %e, "activate failed, passing requests through"),
        },
        Err(e) => tracing::warn!(error = %e, "install failed, passing requests through"),
    }

    let (control, _control_task) = engine.spawn_control();
    let handler = handler::ShellcacheServer::new(engine, control);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
