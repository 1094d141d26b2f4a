//! Network-first with offline fallback, and the uncached network-only path.

use offcache_client::{FetchOptions, Network};
use offcache_core::{CacheStore, Request, Response};
use url::Url;

use super::{lookup, network_error_response, service_unavailable_response, store};

/// Try the network, keeping a copy of 2xx responses; fall back to the cached
/// entry, then (for navigations) to the cached offline page, then to a 408.
pub async fn network_first(
    request: &Request, cache: &CacheStore, network: &dyn Network, offline_page: &Url,
) -> Response {
    let err = match network.fetch(request, FetchOptions::default()).await {
        Ok(response) => {
            if response.is_success() {
                store(cache, request, &response).await;
            }
            return response;
        }
        Err(e) => e,
    };

    tracing::debug!(url = %request.url, error = %err, "network-first falling back to cache");

    if let Some(hit) = lookup(cache, request).await {
        return hit;
    }

    if request.is_navigation() {
        let offline = Request::get(offline_page.clone());
        if let Some(page) = lookup(cache, &offline).await {
            tracing::info!(url = %request.url, "serving offline page");
            return page;
        }
        tracing::warn!(offline_page = %offline_page, "offline page missing from cache");
    }

    network_error_response()
}

/// Straight to the network; the cache is never read or written.
///
/// Used for credential and session endpoints, which must never be served stale.
pub async fn network_only(request: &Request, network: &dyn Network) -> Response {
    match network.fetch(request, FetchOptions::default()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "auth request failed");
            service_unavailable_response()
        }
    }
}
