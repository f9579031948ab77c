//! Unified error types for precache.
//!
//! Display strings carry a stable `CODE:` prefix so that log lines and MCP
//! error payloads can be matched on without parsing the detail.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the precache agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The manifest could not be fetched with a success status.
    #[error("MANIFEST_FETCH_ERROR: {url} returned status {status}")]
    ManifestFetch { url: String, status: u16 },

    /// The manifest body is not the expected JSON structure.
    #[error("MANIFEST_PARSE_ERROR: {0}")]
    ManifestParse(String),

    /// A resource of the bulk add failed to fetch or store.
    #[error("BULK_CACHE_WRITE_ERROR: {resource}: {reason}")]
    BulkCacheWrite { resource: String, reason: String },

    /// The version marker could not be fetched.
    #[error("MARKER_FETCH_ERROR: {0}")]
    MarkerFetch(String),

    /// A cache partition could not be deleted.
    #[error("CACHE_DELETION_ERROR: {name}: {reason}")]
    CacheDeletion { name: String, reason: String },

    /// Fetch handling failed and was converted into a fallback response.
    #[error("INTERCEPTION_FAILURE: {0}")]
    Interception(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Transport-level network failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Stored headers could not be decoded.
    #[error("CACHE_ERROR: invalid stored headers: {0}")]
    InvalidHeaders(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// The store connection failed in a way not covered by [`Error::Database`].
    #[error("CACHE_ERROR: {0}")]
    Store(String),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            other => Error::Store(other.to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::ManifestFetch { .. } => -32020,
            Error::ManifestParse(_) => -32021,
            Error::BulkCacheWrite { .. } => -32022,
            Error::MarkerFetch(_) => -32023,
            Error::CacheDeletion { .. } => -32024,
            Error::Interception(_) => -32025,
            Error::CacheMiss(_) => -32001,
            Error::Network(_) => -32008,
            Error::FetchTooLarge(_) => -32007,
            Error::InvalidHeaders(_) | Error::Database(_) | Error::Store(_) | Error::MigrationFailed(_) => -32002,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
