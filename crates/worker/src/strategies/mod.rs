//! Cache strategies.
//!
//! Every strategy resolves to a [`Response`]; failures fold into synthetic
//! responses so a fetch event is never left unanswered. Cache read and write
//! errors are logged and treated as misses.

pub mod cache_first;
pub mod network_first;
pub mod stale_while_revalidate;

pub use cache_first::{cache_first, cache_then_network};
pub use network_first::{network_first, network_only};
pub use stale_while_revalidate::{Revalidated, stale_while_revalidate};

use offcache_core::{CacheStore, Error, Request, Response};

pub const NETWORK_ERROR_BODY: &str = "Network error occurred";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable. Please try again later.";

/// 408 plain text, for exhausted cache-first / network-first chains.
pub fn network_error_response() -> Response {
    Response::text(408, NETWORK_ERROR_BODY)
}

/// 503 JSON, for API requests with no network and nothing cached.
pub fn service_unavailable_response() -> Response {
    Response::json(503, &serde_json::json!({ "error": SERVICE_UNAVAILABLE_MESSAGE }))
}

pub(crate) async fn lookup(cache: &CacheStore, request: &Request) -> Option<Response> {
    match cache.match_request(request).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(cache = cache.name(), url = %request.url, error = %e, "cache lookup failed");
            None
        }
    }
}

pub(crate) async fn store(cache: &CacheStore, request: &Request, response: &Response) {
    match cache.put(request, response).await {
        Ok(()) => {}
        Err(Error::EntryTooLarge(detail)) => {
            tracing::debug!(cache = cache.name(), %detail, "not caching large response");
        }
        Err(e) => tracing::warn!(cache = cache.name(), url = %request.url, error = %e, "cache write failed"),
    }
}
