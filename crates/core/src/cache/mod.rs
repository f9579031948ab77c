//! SQLite-backed cache partitions.
//!
//! This module provides the persistent cache store using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Named partitions (one per cache version) deleted wholesale
//! - Exact request matching through a SHA-256 request key
//! - Batch writes in a single transaction
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntrySummary;
pub use partitions::PartitionSummary;
