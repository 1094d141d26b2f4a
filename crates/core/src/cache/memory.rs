//! In-memory cache registry.
//!
//! Backs ephemeral runs and tests. Counts reads and writes so callers can
//! assert that a code path never touched the cache.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::request_key;
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Request, Response};

#[derive(Debug, Clone)]
struct StoredEntry {
    identity: String,
    response: Response,
}

#[derive(Debug, Default)]
struct Store {
    entries: BTreeMap<String, StoredEntry>,
}

/// Cache registry held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<Vec<(String, Store)>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `match_request` calls served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `put` calls applied.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("cache name must not be empty".into()));
        }
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|(n, _)| n == name) {
            stores.push((name.to_string(), Store::default()));
        }
        Ok(())
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let key = request_key(request);
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, store)| store.entries.get(&key))
            .map(|entry| entry.response.clone()))
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let key = request_key(request);
        let entry = StoredEntry { identity: request.identity(), response: response.clone() };

        let mut stores = self.stores.write().await;
        match stores.iter_mut().find(|(n, _)| n == name) {
            Some((_, store)) => {
                store.entries.insert(key, entry);
            }
            None => {
                let mut store = Store::default();
                store.entries.insert(key, entry);
                stores.push((name.to_string(), store));
            }
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|(n, _)| n != name);
        Ok(stores.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        let mut ids: Vec<String> = stores
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, store)| store.entries.values().map(|e| e.identity.clone()).collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_match_and_counters() {
        let storage = MemoryStorage::new();
        let req = get("https://app.test/audio/1.mp3");

        assert!(storage.match_request("v1", &req).await.unwrap().is_none());
        storage.put("v1", &req, &Response::new(200, vec![1, 2, 3])).await.unwrap();
        let hit = storage.match_request("v1", &req).await.unwrap().unwrap();

        assert_eq!(hit.body, vec![1, 2, 3]);
        assert_eq!(storage.reads(), 2);
        assert_eq!(storage.writes(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_keys() {
        let storage = MemoryStorage::new();
        storage.open("recorder-cache-v1").await.unwrap();
        storage.open("recorder-cache-v2").await.unwrap();

        assert!(storage.delete("recorder-cache-v1").await.unwrap());
        assert!(!storage.delete("recorder-cache-v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["recorder-cache-v2"]);
    }

    #[tokio::test]
    async fn test_entries_lists_identities() {
        let storage = MemoryStorage::new();
        storage.put("v1", &get("https://app.test/b"), &Response::text(200, "")).await.unwrap();
        storage.put("v1", &get("https://app.test/a"), &Response::text(200, "")).await.unwrap();
        storage.put("v1", &get("https://app.test/a"), &Response::text(200, "again")).await.unwrap();

        assert_eq!(
            storage.entries("v1").await.unwrap(),
            vec!["GET https://app.test/a".to_string(), "GET https://app.test/b".to_string()]
        );
    }
}
