//! Event dispatcher.
//!
//! This module defines the worker that maps each inbound event to its
//! handler: install and activate drive the lifecycle, fetch events are
//! classified and routed to a cache strategy, and messages reach the
//! shortcut updater or the host.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};

use offcache_client::Network;
use offcache_core::{CacheStorage, CacheStore, Error, Request, Response, RouterConfig};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::WorkerError;
use crate::events::{ClientMessage, Event, Reply};
use crate::host::Host;
use crate::lifecycle::{self, ActivateReport, InstallReport, RetryPolicy};
use crate::routing::{RouteClass, Routes};
use crate::shortcuts;
use crate::strategies::{self, Revalidated, stale_while_revalidate::Refresh};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the worker will never control pages.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// What to do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Respond { route: RouteClass, response: Response },
    /// Not intercepted; the host performs the request.
    Passthrough,
}

/// Cache refreshes still running after their response was served.
#[derive(Default)]
pub struct BackgroundTasks {
    pending: Mutex<Vec<Refresh>>,
}

impl BackgroundTasks {
    fn push(&self, refresh: Refresh) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|task| !task.is_finished());
            pending.push(refresh);
        }
    }

    /// Wait for every refresh started so far; returns how many failed.
    pub async fn drain(&self) -> usize {
        let pending = match self.pending.lock() {
            Ok(mut pending) => mem::take(&mut *pending),
            Err(_) => return 0,
        };

        let mut failed = 0;
        for task in pending {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "background refresh failed, cached entry kept");
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "background refresh panicked");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            tracing::info!(failed, "background refreshes did not update the cache");
        }
        failed
    }
}

/// The offline cache router.
pub struct ServiceWorker {
    routes: Routes,
    storage: Arc<dyn CacheStorage>,
    cache: CacheStore,
    network: Arc<dyn Network>,
    host: Arc<dyn Host>,
    retry: RetryPolicy,
    state: RwLock<WorkerState>,
    background: BackgroundTasks,
}

impl ServiceWorker {
    pub fn new(
        config: &RouterConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let routes = Routes::from_config(config)?;
        let cache =
            CacheStore::new(storage.clone(), config.current_cache_name()).with_max_entry_bytes(config.max_bytes);
        Ok(Self {
            routes,
            storage,
            cache,
            network,
            host,
            retry: RetryPolicy { retries: config.install_retries, delay: config.install_retry_delay() },
            state: RwLock::new(WorkerState::Parsed),
            background: BackgroundTasks::default(),
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Handle one event and produce its reply.
    pub async fn dispatch(&self, event: Event) -> Reply {
        match event {
            Event::Install => match self.install().await {
                Ok(report) => Reply::Installed(report),
                Err(e) => error_reply(None, &e),
            },
            Event::Activate => match self.activate().await {
                Ok(report) => Reply::Activated(report),
                Err(e) => error_reply(None, &e),
            },
            Event::Fetch { id, request } => match self.handle_fetch(request).await {
                FetchOutcome::Respond { route, response } => Reply::Response { id, route, response },
                FetchOutcome::Passthrough => Reply::Passthrough { id },
            },
            Event::Message { data } => {
                self.handle_message(data).await;
                Reply::Ack
            }
        }
    }

    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        self.transition(&[WorkerState::Parsed, WorkerState::Installed], "parsed", WorkerState::Installing)
            .await?;

        let result = lifecycle::install(
            &self.cache,
            self.network.as_ref(),
            self.host.as_ref(),
            self.routes.manifest(),
            self.retry,
        )
        .await;

        let mut state = self.state.write().await;
        match result {
            Ok(report) => {
                *state = WorkerState::Installed;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                *state = WorkerState::Redundant;
                Err(e.into())
            }
        }
    }

    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.transition(&[WorkerState::Installed, WorkerState::Activated], "installed", WorkerState::Activating)
            .await?;

        let result = lifecycle::activate(self.storage.as_ref(), self.cache.name(), self.host.as_ref()).await;

        let mut state = self.state.write().await;
        match result {
            Ok(report) => {
                *state = WorkerState::Activated;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "activate failed");
                *state = WorkerState::Installed;
                Err(e.into())
            }
        }
    }

    async fn transition(
        &self, from: &[WorkerState], expected: &'static str, to: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(WorkerError::InvalidState { expected, actual: *state });
        }
        *state = to;
        Ok(())
    }

    /// Classify a request and run it through its strategy.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().await.can_intercept_fetch() {
            tracing::debug!(url = %request.url, "not active yet, passing through");
            return FetchOutcome::Passthrough;
        }

        let route = self.routes.classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, ?route, "routing request");

        let network = self.network.as_ref();
        let response = match route {
            RouteClass::Passthrough => return FetchOutcome::Passthrough,
            RouteClass::Auth => strategies::network_only(&request, network).await,
            RouteClass::Api => {
                let Revalidated { response, refresh } =
                    strategies::stale_while_revalidate(request, self.cache.clone(), self.network.clone()).await;
                if let Some(refresh) = refresh {
                    self.background.push(refresh);
                }
                response
            }
            RouteClass::Media | RouteClass::Asset => strategies::cache_first(&request, &self.cache, network).await,
            RouteClass::Navigation => {
                strategies::network_first(&request, &self.cache, network, self.routes.offline_page()).await
            }
            RouteClass::Other => strategies::cache_then_network(&request, &self.cache, network).await,
        };

        FetchOutcome::Respond { route, response }
    }

    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::SkipWaiting => {
                if let Err(e) = self.host.skip_waiting().await {
                    tracing::warn!(error = %e, "skip_waiting rejected");
                }
            }
            ClientMessage::UpdateShortcuts { shortcuts: candidates } => {
                shortcuts::update(self.host.as_ref(), &candidates, self.routes.origin()).await;
            }
            ClientMessage::Unknown => tracing::debug!("ignoring unknown client message"),
        }
    }
}

pub(crate) fn error_reply(id: Option<String>, err: &WorkerError) -> Reply {
    Reply::Error { id, code: err.code(), message: err.to_string() }
}
