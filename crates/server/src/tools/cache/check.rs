//! cache_check tool implementation.
//!
//! Runs the version check (and flush, when stale) on demand.

use precache_client::{FlushOutcome, Worker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_check tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheCheckParams {
    /// Flush and reinstall even if the version marker is unchanged.
    #[serde(default)]
    pub force: bool,
}

/// Output from the cache_check tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheCheckOutput {
    pub outcome: FlushOutcome,
    /// ISO8601 timestamp of when the check finished.
    pub checked_at: String,
}

pub async fn check_impl(worker: &Worker, params: CacheCheckParams) -> Result<CallToolResult, McpError> {
    let outcome = if params.force {
        worker.flusher().force_flush().await
    } else {
        worker.flusher().maybe_flush().await
    };

    json_result(&CacheCheckOutput { outcome, checked_at: chrono::Utc::now().to_rfc3339() })
}
