//! Install and activate.
//!
//! Install seeds the current store with the asset manifest; activate purges
//! every store that isn't the current one and takes over open pages.

use std::time::Duration;

use futures_util::future::join_all;
use offcache_client::{FetchOptions, Network};
use offcache_core::{CacheStorage, CacheStore, Error, Request};
use serde::Serialize;
use url::Url;

use crate::host::Host;

/// How hard install tries to fetch each asset.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first.
    pub retries: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache: String,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub cache: String,
    pub deleted: Vec<String>,
}

/// Seed `cache` with every manifest asset, bypassing intermediate HTTP caches.
///
/// Assets are fetched concurrently and retried independently; an asset that
/// still fails is reported, not fatal. Only failing to open the store aborts.
pub async fn install(
    cache: &CacheStore, network: &dyn Network, host: &dyn Host, manifest: &[Url], retry: RetryPolicy,
) -> Result<InstallReport, Error> {
    cache.open().await?;
    tracing::info!(cache = cache.name(), assets = manifest.len(), "installing");

    let outcomes = join_all(manifest.iter().map(|url| seed(cache, network, url, retry))).await;

    let mut report = InstallReport { cache: cache.name().to_string(), cached: Vec::new(), failed: Vec::new() };
    for (url, ok) in manifest.iter().zip(outcomes) {
        if ok {
            report.cached.push(url.to_string());
        } else {
            report.failed.push(url.to_string());
        }
    }

    if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "some assets were not cached");
    }

    if let Err(e) = host.skip_waiting().await {
        tracing::warn!(error = %e, "skip_waiting rejected");
    }

    Ok(report)
}

async fn seed(cache: &CacheStore, network: &dyn Network, url: &Url, retry: RetryPolicy) -> bool {
    let request = Request::get(url.clone());
    let attempts = retry.retries + 1;

    for attempt in 1..=attempts {
        match network.fetch(&request, FetchOptions::reload()).await {
            Ok(response) if response.is_success() => match cache.put(&request, &response).await {
                Ok(()) => return true,
                Err(e @ Error::EntryTooLarge(_)) => {
                    tracing::warn!(%url, error = %e, "asset exceeds the cache entry limit");
                    return false;
                }
                Err(e) => tracing::warn!(%url, attempt, error = %e, "failed to store asset"),
            },
            Ok(response) => {
                tracing::warn!(%url, attempt, status = response.status, "asset fetch returned error status");
            }
            Err(e) => tracing::warn!(%url, attempt, error = %e, "asset fetch failed"),
        }

        if attempt < attempts && !retry.delay.is_zero() {
            tokio::time::sleep(retry.delay).await;
        }
    }

    false
}

/// Delete every store except `current`, then claim open clients.
pub async fn activate(storage: &dyn CacheStorage, current: &str, host: &dyn Host) -> Result<ActivateReport, Error> {
    let mut deleted = Vec::new();
    for name in storage.keys().await? {
        if name != current && storage.delete(&name).await? {
            tracing::info!(cache = %name, "deleted old cache");
            deleted.push(name);
        }
    }
    storage.open(current).await?;

    if let Err(e) = host.claim_clients().await {
        tracing::warn!(error = %e, "claim_clients rejected");
    }

    tracing::info!(cache = current, purged = deleted.len(), "activated");
    Ok(ActivateReport { cache: current.to_string(), deleted })
}
