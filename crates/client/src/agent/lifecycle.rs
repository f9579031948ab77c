//! The worker: wires install, activate and fetch events to the agent
//! components and tracks the work the host must wait for.
//!
//! ### States
//! `Parsed -> Installing -> Installed -> Activating -> Activated`, and
//! `Redundant` once [`Worker::terminate`] ran. Install failures are caught
//! and recorded in the pending outcomes, so the worker still moves on to
//! `Installed`; activation's version check then repopulates the cache.
//!
//! The install body holds the flusher's single-flight slot, so activation
//! and root-navigation flushes start only after it finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use super::AgentConfig;
use super::clients::{Clients, WorkerId};
use super::flush::Flusher;
use super::installer::Installer;
use super::intercept::Interceptor;
use super::pending::{PendingWork, TaskOutcome};
use super::version::VersionChecker;
use precache_core::{CacheStore, Network, Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

pub struct Worker {
    id: WorkerId,
    config: Arc<AgentConfig>,
    state: Arc<RwLock<WorkerState>>,
    skip_waiting: AtomicBool,
    clients: Arc<Clients>,
    installer: Installer,
    flusher: Flusher,
    interceptor: Interceptor,
    pending: PendingWork,
}

impl Worker {
    pub fn new(config: AgentConfig, network: Arc<dyn Network>, store: Arc<dyn CacheStore>) -> Self {
        let config = Arc::new(config);
        let installer = Installer::new(network.clone(), store.clone(), config.clone());
        let checker = VersionChecker::new(network.clone(), store.clone(), config.clone());
        let flusher = Flusher::new(store.clone(), installer.clone(), checker);
        let interceptor = Interceptor::new(network, store, config.clone(), flusher.clone());

        Self {
            id: WorkerId::next(),
            config,
            state: Arc::new(RwLock::new(WorkerState::Parsed)),
            skip_waiting: AtomicBool::new(false),
            clients: Arc::new(Clients::new()),
            installer,
            flusher,
            interceptor,
            pending: PendingWork::new(),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    pub fn flusher(&self) -> &Flusher {
        &self.flusher
    }

    /// Whether the worker asked to be activated without waiting for older
    /// workers' clients to go away.
    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::Relaxed)
    }

    /// Handle the install event: populate the cache in the background.
    pub async fn install(&self) {
        self.set_state(WorkerState::Installing).await;

        let slot = self.flusher.hold().await;
        let installer = self.installer.clone();
        let state = self.state.clone();
        self.pending
            .wait_until("install", async move {
                let result = installer.install().await.map(|_| ());
                if let Err(e) = &result {
                    tracing::error!("install event failed: {e}");
                }
                let mut current = state.write().await;
                if *current == WorkerState::Installing {
                    *current = WorkerState::Installed;
                }
                drop(current);
                drop(slot);
                result
            })
            .await;

        self.skip_waiting.store(true, Ordering::Relaxed);
    }

    /// Handle the activate event: take control of every client, then bring
    /// the cache up to date. Waits for a running install to finish first.
    pub async fn activate(&self) {
        drop(self.flusher.hold().await);
        self.set_state(WorkerState::Activating).await;
        let claimed = self.clients.claim(self.id).await;
        tracing::info!(worker = self.id.get(), claimed, "claimed clients");

        let flusher = self.flusher.clone();
        let state = self.state.clone();
        let worker = self.id.get();
        self.pending
            .wait_until("activate", async move {
                let outcome = flusher.maybe_flush().await;
                tracing::debug!(?outcome, "activation version check");
                *state.write().await = WorkerState::Activated;
                tracing::info!(worker, "worker activated and ready to handle requests");
                Ok(())
            })
            .await;
    }

    /// Handle a fetch event.
    pub async fn fetch(&self, request: &Request) -> Response {
        self.interceptor.handle(request).await
    }

    /// Await all pending work and return how it ended.
    pub async fn drain(&self) -> Vec<TaskOutcome> {
        let outcomes = self.pending.drain().await;
        for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
            tracing::warn!(task = %outcome.label, error = ?outcome.error, "pending task failed");
        }
        outcomes
    }

    /// Drain pending work and retire the worker.
    pub async fn terminate(&self) -> Vec<TaskOutcome> {
        let outcomes = self.drain().await;
        self.set_state(WorkerState::Redundant).await;
        for client in self.clients.controlled_by(self.id).await {
            self.clients.remove(&client.id).await;
        }
        tracing::info!(worker = self.id.get(), "worker is redundant");
        outcomes
    }

    async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        let previous = *current;
        tracing::debug!(worker = self.id.get(), from = ?previous, to = ?state, "worker state change");
        *current = state;
    }
}
