//! cache_status tool implementation.

use precache_client::{Client, Worker, WorkerState};
use precache_core::{CacheDb, PartitionSummary};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use crate::tools::json_result;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub worker_id: u64,
    pub state: WorkerState,
    /// Name of the current partition.
    pub cache_version: String,
    /// Clients controlled by this worker.
    pub clients: Vec<Client>,
    /// Partitions oldest first.
    pub partitions: Vec<PartitionSummary>,
}

pub async fn status_impl(worker: &Worker, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let output = CacheStatusOutput {
        worker_id: worker.id().get(),
        state: worker.state().await,
        cache_version: worker.config().cache_version.clone(),
        clients: worker.clients().controlled_by(worker.id()).await,
        partitions: db.partition_summaries().await?,
    };
    json_result(&output)
}
