//! The cache store registry abstraction.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Registry of named cache stores.
///
/// Mirrors the host cache registry: stores are created on `open`, entries are
/// overwritten by request identity on `put`, and whole stores are dropped on
/// `delete`. Implementations must be safe to share between concurrent fetch
/// handlers; concurrent writes to one identity are last-writer-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Look up the snapshot stored for `request` in store `name`.
    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Store `response` under the identity of `request`, creating the store if needed.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Drop a store and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of all stores, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Identities (`METHOD url`) of every entry in a store.
    async fn entries(&self, name: &str) -> Result<Vec<String>, Error>;
}

/// Handle on one named store.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn CacheStorage>,
    name: String,
    max_entry_bytes: Option<usize>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self { storage, name: name.into(), max_entry_bytes: None }
    }

    /// Refuse to store bodies larger than `limit` bytes.
    pub fn with_max_entry_bytes(mut self, limit: usize) -> Self {
        self.max_entry_bytes = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn open(&self) -> Result<(), Error> {
        self.storage.open(&self.name).await
    }

    /// Cached snapshot for `request`, tagged with the request URL when the
    /// stored snapshot has none.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let found = self.storage.match_request(&self.name, request).await?;
        Ok(found.map(|mut resp| {
            if resp.url.is_none() {
                resp.url = Some(request.cache_url());
            }
            resp
        }))
    }

    /// Store a snapshot. Bodies over the entry limit are rejected with
    /// [`Error::EntryTooLarge`] and leave the store untouched.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        if let Some(limit) = self.max_entry_bytes
            && response.body.len() > limit
        {
            return Err(Error::EntryTooLarge(format!(
                "{}: {} bytes exceeds {}",
                request.identity(),
                response.body.len(),
                limit
            )));
        }
        self.storage.put(&self.name, request, response).await
    }

    pub async fn entries(&self) -> Result<Vec<String>, Error> {
        self.storage.entries(&self.name).await
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("max_entry_bytes", &self.max_entry_bytes)
            .finish()
    }
}
