//! Core types and shared functionality for precache.
//!
//! This crate provides:
//! - Request/response types shared by the agent and its collaborators
//! - The `CacheStore` and `Network` capability traits
//! - Cache partitions with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod store;

pub use cache::{CacheDb, EntrySummary, PartitionSummary};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use exchange::{CacheMode, CachedResponse, Credentials, FALLBACK_BODY, Request, Response, ResponseSource};
pub use store::{CacheStore, Network};
