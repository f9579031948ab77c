//! Capability traits the agent is written against.
//!
//! The agent never talks to SQLite or reqwest directly; it holds
//! `Arc<dyn CacheStore>` and `Arc<dyn Network>` so hosts and tests can swap
//! either side.

use crate::{CachedResponse, Error, Request, Response};

/// Named cache partitions of request -> response pairs.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Names of all partitions, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Find the stored response for an exact request match, searching
    /// partitions oldest first.
    async fn match_request(&self, request: &Request) -> Result<Option<CachedResponse>, Error>;

    /// Store a batch of responses in one partition, replacing entries for the
    /// same requests.
    async fn put_all(&self, name: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error>;
}

/// Network fetch capability.
///
/// Non-success statuses are returned as responses; only transport failures
/// are errors.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
