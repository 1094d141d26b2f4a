//! Fakes shared by the worker's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offcache_client::{FetchOptions, Network};
use offcache_core::{CacheStore, Error, MemoryStorage, Request, Response};
use url::Url;

use crate::host::Host;
use crate::shortcuts::Shortcut;

pub const ORIGIN: &str = "http://localhost:8000/";
pub const CACHE: &str = "recorder-cache-v1";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn get(path: &str) -> Request {
    Request::get(url(path))
}

pub fn navigate(path: &str) -> Request {
    Request::navigate(url(path))
}

pub fn memory_store() -> (Arc<MemoryStorage>, CacheStore) {
    let storage = Arc::new(MemoryStorage::new());
    let store = CacheStore::new(storage.clone(), CACHE);
    (storage, store)
}

/// Scripted network: canned responses per URL, 404 otherwise.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<HashMap<String, Response>>,
    failures: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, FetchOptions)>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &Url, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    /// Fail the next `times` fetches of `url`.
    pub fn fail(&self, url: &Url, times: usize) {
        self.failures.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Identities and options of every fetch made, in order.
    pub fn seen(&self) -> Vec<(String, FetchOptions)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((request.identity(), options));

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        let key = request.cache_url();
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&key)
                && *left > 0
            {
                *left -= 1;
                return Err(Error::Network(format!("scripted failure for {key}")));
            }
        }

        let response = self.responses.lock().unwrap().get(&key).cloned();
        Ok(response.unwrap_or_else(|| Response::text(404, "not found")).with_url(key))
    }
}

/// Host that records every command it receives.
pub struct RecordingHost {
    commands: Mutex<Vec<String>>,
    shortcuts: Mutex<Option<Vec<Shortcut>>>,
    supports_shortcuts: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self { commands: Mutex::new(Vec::new()), shortcuts: Mutex::new(None), supports_shortcuts: true }
    }

    pub fn without_shortcuts() -> Self {
        Self { supports_shortcuts: false, ..Self::new() }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn shortcuts(&self) -> Option<Vec<Shortcut>> {
        self.shortcuts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.commands.lock().unwrap().push("skip_waiting".into());
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.commands.lock().unwrap().push("claim_clients".into());
        Ok(())
    }

    async fn set_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), Error> {
        if !self.supports_shortcuts {
            return Err(Error::HostUnsupported("shortcuts".into()));
        }
        self.commands.lock().unwrap().push("set_shortcuts".into());
        *self.shortcuts.lock().unwrap() = Some(shortcuts.to_vec());
        Ok(())
    }
}
