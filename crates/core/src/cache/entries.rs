//! Stored request -> response entries.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::exchange::{headers_from_pairs, headers_to_pairs};
use crate::{CachedResponse, Error, Request};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Metadata about one stored entry, without the body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub partition: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body_bytes: u64,
    pub cached_at: String,
}

/// Row as read from SQLite, before header and status decoding.
struct StoredRow {
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    cached_at: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
            cached_at: row.get(5)?,
        })
    }

    fn into_cached(self) -> Result<CachedResponse, Error> {
        let pairs: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::InvalidHeaders(e.to_string()))?;
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| Error::InvalidHeaders(format!("stored status {} out of range", self.status)))?;

        Ok(CachedResponse {
            url: self.url,
            status,
            status_text: self.status_text,
            headers: headers_from_pairs(&pairs)?,
            body: self.body.into(),
            cached_at: self.cached_at,
        })
    }
}

impl CacheDb {
    /// Find the stored response for a request, searching partitions oldest first.
    pub async fn match_entry(&self, request: &Request) -> Result<Option<CachedResponse>, Error> {
        let key = compute_request_key(request.method.as_str(), &request.cache_url());
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url, e.status, e.status_text, e.headers_json, e.body, e.cached_at
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                )?;

                match stmt.query_row(params![key], StoredRow::from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_cached).transpose()
    }

    /// Write a batch of entries into a partition in one transaction.
    ///
    /// The partition is created if missing. Existing entries for the same
    /// requests are replaced.
    pub async fn put_entries(&self, partition: &str, entries: Vec<(Request, CachedResponse)>) -> Result<(), Error> {
        let partition = partition.to_string();
        let rows = entries
            .into_iter()
            .map(|(request, response)| -> Result<_, Error> {
                let headers_json = serde_json::to_string(&headers_to_pairs(&response.headers))
                    .map_err(|e| Error::InvalidHeaders(e.to_string()))?;
                Ok((
                    compute_request_key(request.method.as_str(), &request.cache_url()),
                    request.method.as_str().to_string(),
                    request.cache_url(),
                    response,
                    headers_json,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let count = rows.len();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, chrono::Utc::now().to_rfc3339()],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (
                            partition, key_hash, method, url, status, status_text, headers_json, body, cached_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(partition, key_hash) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            status_text = excluded.status_text,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            cached_at = excluded.cached_at",
                    )?;
                    for (key, method, url, response, headers_json) in &rows {
                        stmt.execute(params![
                            partition,
                            key,
                            method,
                            url,
                            response.status.as_u16(),
                            response.status_text,
                            headers_json,
                            response.body.as_ref(),
                            response.cached_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!("stored {} entries", count);
        Ok(())
    }

    /// Metadata of the entry a GET for `url` would match.
    pub async fn get_entry(&self, url: &str) -> Result<Option<EntrySummary>, Error> {
        let key = compute_request_key("GET", url);
        self.conn
            .call(move |conn| -> Result<Option<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.partition, e.method, e.url, e.status, e.status_text, e.headers_json,
                            LENGTH(e.body), e.cached_at
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                )?;

                let result = stmt.query_row(params![key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                let (partition, method, url, status, status_text, headers_json, len, cached_at) = match result {
                    Ok(r) => r,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers = serde_json::from_str(&headers_json).map_err(|e| Error::InvalidHeaders(e.to_string()))?;
                Ok(Some(EntrySummary {
                    partition,
                    method,
                    url,
                    status,
                    status_text,
                    headers,
                    body_bytes: len.max(0) as u64,
                    cached_at,
                }))
            })
            .await
            .map_err(Error::from)
    }
}
