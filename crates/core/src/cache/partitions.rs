//! Partition management and the `CacheStore` implementation.

use super::connection::CacheDb;
use crate::{CacheStore, CachedResponse, Error, Request};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Size information about one partition.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    pub body_bytes: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Create a partition if it does not exist.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and its entries.
    ///
    /// Returns whether a partition was removed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts and body sizes per partition, in creation order.
    pub async fn partition_summaries(&self) -> Result<Vec<PartitionSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0), p.created_at
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name
                     ORDER BY p.rowid ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(PartitionSummary {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)?.max(0) as u64,
                            body_bytes: row.get::<_, i64>(2)?.max(0) as u64,
                            created_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.open_partition(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.partition_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_partition(name).await
    }

    async fn match_request(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        self.match_entry(request).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }
}
