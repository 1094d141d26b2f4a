//! Request identity keys.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the storage key for a request identity (method + fragment-less URL).
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage key for a request.
pub fn request_key(request: &Request) -> String {
    compute_request_key(&request.method, &request.cache_url())
}
