//! Pages (clients) that a worker may control.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

/// Unique identifier of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A controlled (or controllable) page.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct Client {
    pub id: String,
    pub url: String,
    /// Worker currently controlling this client.
    pub controller: Option<WorkerId>,
}

impl Client {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self { id: id.into(), url: url.into(), controller: None }
    }
}

/// Registry of clients.
#[derive(Debug, Default)]
pub struct Clients {
    clients: RwLock<HashMap<String, Client>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, replacing one with the same id.
    pub async fn add(&self, client: Client) {
        self.clients.write().await.insert(client.id.clone(), client);
    }

    pub async fn remove(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    /// Take control of every registered client. Returns how many changed controller.
    pub async fn claim(&self, worker: WorkerId) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for client in clients.values_mut() {
            if client.controller != Some(worker) {
                client.controller = Some(worker);
                claimed += 1;
            }
        }
        claimed
    }

    /// Clients controlled by `worker`, sorted by id.
    pub async fn controlled_by(&self, worker: WorkerId) -> Vec<Client> {
        let mut controlled: Vec<Client> = self
            .clients
            .read()
            .await
            .values()
            .filter(|c| c.controller == Some(worker))
            .cloned()
            .collect();
        controlled.sort_by(|a, b| a.id.cmp(&b.id));
        controlled
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}
