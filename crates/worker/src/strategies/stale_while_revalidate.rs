//! Stale-while-revalidate.
//!
//! The cache read is issued first and the network fetch starts as soon as it
//! returns, on its own task, so a refresh can never land before the read it
//! is meant to follow. The cached entry, when present, is returned right away;
//! the refresh overwrites it once it resolves with a 2xx. Callers may
//! therefore see a stale value while a newer one lands for the next request.

use std::sync::Arc;

use offcache_client::{FetchOptions, Network};
use offcache_core::{CacheStore, Error, Request, Response};
use tokio::task::JoinHandle;

use super::{lookup, service_unavailable_response, store};

/// Background refresh of one cache entry.
pub type Refresh = JoinHandle<Result<Response, Error>>;

/// Result of a stale-while-revalidate call.
#[derive(Debug)]
pub struct Revalidated {
    pub response: Response,
    /// Still-running refresh when the response came from the cache.
    pub refresh: Option<Refresh>,
}

pub async fn stale_while_revalidate(request: Request, cache: CacheStore, network: Arc<dyn Network>) -> Revalidated {
    let cached = lookup(&cache, &request).await;
    let refresh = tokio::spawn(revalidate(request.clone(), cache.clone(), network));

    if let Some(hit) = cached {
        tracing::debug!(url = %request.url, "serving stale entry while revalidating");
        return Revalidated { response: hit, refresh: Some(refresh) };
    }

    let response = match refresh.await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::warn!(url = %request.url, error = %e, "revalidation failed with nothing cached");
            service_unavailable_response()
        }
        Err(e) => {
            tracing::error!(url = %request.url, error = %e, "revalidation task panicked");
            service_unavailable_response()
        }
    };

    Revalidated { response, refresh: None }
}

async fn revalidate(request: Request, cache: CacheStore, network: Arc<dyn Network>) -> Result<Response, Error> {
    let response = match network.fetch(&request, FetchOptions::default()).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_network() {
                tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed");
            } else {
                tracing::warn!(url = %request.url, error = %e, "revalidation fetch failed");
            }
            return Err(e);
        }
    };

    if response.is_success() {
        store(&cache, &request, &response).await;
    } else {
        tracing::debug!(url = %request.url, status = response.status, "keeping cached entry over error status");
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, get, memory_store};

    #[tokio::test]
    async fn test_miss_waits_for_network_and_stores() {
        let (_storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        let req = get("/api/recordings");
        network.respond(&req.url, Response::json(200, &serde_json::json!([{"id": 1}])));

        let result = stale_while_revalidate(req.clone(), cache.clone(), network.clone()).await;

        assert_eq!(result.response.status, 200);
        assert!(result.refresh.is_none());
        assert!(cache.match_request(&req).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_returns_stale_then_refreshes() {
        let (_storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        let req = get("/api/recordings");
        cache.put(&req, &Response::text(200, "stale")).await.unwrap();
        network.respond(&req.url, Response::text(200, "fresh"));

        let result = stale_while_revalidate(req.clone(), cache.clone(), network.clone()).await;
        assert_eq!(result.response.body_text(), "stale");

        result.refresh.unwrap().await.unwrap().unwrap();
        let hit = cache.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body_text(), "fresh");
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_hit_survives_network_failure() {
        let (_storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        let req = get("/api/recordings");
        cache.put(&req, &Response::text(200, "stale")).await.unwrap();
        network.set_offline(true);

        let result = stale_while_revalidate(req.clone(), cache.clone(), network.clone()).await;
        assert_eq!(result.response.body_text(), "stale");

        let err = result.refresh.unwrap().await.unwrap().unwrap_err();
        assert!(err.is_network());
        assert_eq!(cache.match_request(&req).await.unwrap().unwrap().body_text(), "stale");
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_miss_and_offline_is_503_json() {
        let (storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        network.set_offline(true);

        let result = stale_while_revalidate(get("/api/recordings"), cache, network).await;

        assert_eq!(result.response.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&result.response.body).unwrap();
        assert_eq!(body["error"], "Service temporarily unavailable. Please try again later.");
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn test_error_status_does_not_overwrite() {
        let (_storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        let req = get("/api/recordings");
        cache.put(&req, &Response::text(200, "good")).await.unwrap();
        network.respond(&req.url, Response::text(502, "bad gateway"));

        let result = stale_while_revalidate(req.clone(), cache.clone(), network).await;
        result.refresh.unwrap().await.unwrap().unwrap();

        assert_eq!(cache.match_request(&req).await.unwrap().unwrap().body_text(), "good");
    }

    #[tokio::test]
    async fn test_cache_read_precedes_refresh() {
        let (storage, cache) = memory_store();
        let network = Arc::new(FakeNetwork::new());
        let req = get("/api/recordings");
        network.respond(&req.url, Response::text(200, "fresh"));

        let result = stale_while_revalidate(req, cache, network.clone()).await;

        assert_eq!(result.response.body_text(), "fresh");
        assert_eq!(storage.reads(), 1);
        assert_eq!(network.calls(), 1);
    }
}
