//! offcache worker entry point.
//!
//! Boots the offline cache router on the stdio transport: the host runtime
//! writes lifecycle, fetch and message events to stdin and reads replies from
//! stdout. Logging goes to stderr to keep stdout clean for the protocol.

use std::sync::Arc;

use anyhow::{Context, Result};
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::{CacheDb, RouterConfig};
use tracing_subscriber::EnvFilter;

mod error;
mod events;
mod handler;
mod host;
mod lifecycle;
mod routing;
mod shortcuts;
mod stdio;
mod strategies;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = RouterConfig::load().context("loading configuration")?;
    tracing::info!(
        cache = %config.current_cache_name(),
        origin = %config.origin,
        assets = config.assets.len(),
        "Starting offcache worker on stdio transport"
    );

    let storage = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config))?;

    let (out, replies) = stdio::outbound();
    let host = stdio::StdioHost::new(out.clone(), config.host_shortcuts);
    let worker = handler::ServiceWorker::new(&config, Arc::new(storage), Arc::new(network), Arc::new(host))?;

    stdio::serve(Arc::new(worker), out, replies, tokio::io::stdin(), tokio::io::stdout()).await?;

    tracing::info!("offcache worker stopped");
    Ok(())
}
