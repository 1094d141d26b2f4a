//! Cache-first and best-effort cache-then-network.

use offcache_client::{FetchOptions, Network};
use offcache_core::{CacheStore, Request, Response};

use super::{lookup, network_error_response, store};

/// Serve from cache; on a miss fetch, keep a copy of 2xx responses.
///
/// A miss with no network yields a 408.
pub async fn cache_first(request: &Request, cache: &CacheStore, network: &dyn Network) -> Response {
    if let Some(hit) = lookup(cache, request).await {
        tracing::debug!(url = %request.url, "cache-first hit");
        return hit;
    }

    match network.fetch(request, FetchOptions::default()).await {
        Ok(response) => {
            if response.is_success() {
                store(cache, request, &response).await;
            }
            response
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache-first miss and network failed");
            network_error_response()
        }
    }
}

/// Serve from cache if present, else straight from the network without storing.
pub async fn cache_then_network(request: &Request, cache: &CacheStore, network: &dyn Network) -> Response {
    if let Some(hit) = lookup(cache, request).await {
        return hit;
    }

    match network.fetch(request, FetchOptions::default()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "uncached request failed");
            network_error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, get, memory_store};

    #[tokio::test]
    async fn test_hit_skips_network() {
        let (storage, cache) = memory_store();
        let network = FakeNetwork::new();
        let req = get("/audio/standup.mp3");
        cache.put(&req, &Response::new(200, vec![0xff, 0xfb])).await.unwrap();

        let resp = cache_first(&req, &cache, &network).await;

        assert_eq!(resp.body, vec![0xff, 0xfb]);
        assert_eq!(network.calls(), 0);
        assert_eq!(storage.writes(), 1);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let (_storage, cache) = memory_store();
        let network = FakeNetwork::new();
        let req = get("/audio/standup.mp3");
        network.respond(&req.url, Response::new(200, vec![1, 2, 3]));

        let resp = cache_first(&req, &cache, &network).await;
        assert_eq!(resp.status, 200);
        assert_eq!(network.calls(), 1);

        let again = cache_first(&req, &cache, &network).await;
        assert_eq!(again.body, vec![1, 2, 3]);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_large_recording_served_but_not_stored() {
        let (storage, cache) = memory_store();
        let cache = cache.with_max_entry_bytes(1024);
        let network = FakeNetwork::new();
        let req = get("/audio/meeting.mp3");
        network.respond(&req.url, Response::new(200, vec![0u8; 4096]).with_header("content-type", "audio/mpeg"));

        let resp = cache_first(&req, &cache, &network).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.len(), 4096);
        assert_eq!(storage.writes(), 0);

        let again = cache_first(&req, &cache, &network).await;
        assert_eq!(again.status, 200);
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_error_status_not_stored() {
        let (storage, cache) = memory_store();
        let network = FakeNetwork::new();
        let req = get("/audio/missing.mp3");

        let resp = cache_first(&req, &cache, &network).await;

        assert_eq!(resp.status, 404);
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_is_408() {
        let (_storage, cache) = memory_store();
        let network = FakeNetwork::new();
        network.set_offline(true);

        let resp = cache_first(&get("/audio/standup.mp3"), &cache, &network).await;
        assert_eq!(resp.status, 408);
    }

    #[tokio::test]
    async fn test_cache_then_network_does_not_store() {
        let (storage, cache) = memory_store();
        let network = FakeNetwork::new();
        let req = get("/favicon.ico");
        network.respond(&req.url, Response::new(200, vec![0]));

        let resp = cache_then_network(&req, &cache, &network).await;

        assert_eq!(resp.status, 200);
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_cache_then_network_prefers_cache() {
        let (_storage, cache) = memory_store();
        let network = FakeNetwork::new();
        let req = get("/favicon.ico");
        cache.put(&req, &Response::new(200, vec![7])).await.unwrap();

        let resp = cache_then_network(&req, &cache, &network).await;
        assert_eq!(resp.body, vec![7]);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_then_network_offline_is_408() {
        let (_storage, cache) = memory_store();
        let network = FakeNetwork::new();
        network.set_offline(true);

        assert_eq!(cache_then_network(&get("/favicon.ico"), &cache, &network).await.status, 408);
    }
}
