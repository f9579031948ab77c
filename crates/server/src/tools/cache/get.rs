//! cache_get tool implementation.
//!
//! Looks up the cached entry for a URL without serving it.

use precache_client::Worker;
use precache_client::fetch::resolve;
use precache_core::{CacheDb, EntrySummary, Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cached entry, without its body.
    pub entry: EntrySummary,
}

pub async fn get_impl(worker: &Worker, cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let key = Request::get(url).cache_url();

    let entry = cache.get_entry(&key).await?.ok_or(Error::CacheMiss(key))?;
    json_result(&CacheGetOutput { entry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{origin, output, worker};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let server = origin("build-1").await;
        let (worker, cache) = worker(&server).await;

        let params = CacheGetParams { url: "/MILESTONE".to_string() };
        let err = get_impl(&worker, &cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let server = origin("build-1").await;
        let (worker, cache) = worker(&server).await;
        worker.install().await;
        worker.drain().await;

        let params = CacheGetParams { url: "/MILESTONE#top".to_string() };
        let result = get_impl(&worker, &cache, params).await.unwrap();
        let out: serde_json::Value = output(&result);

        assert_eq!(out["entry"]["partition"], "v1");
        assert_eq!(out["entry"]["status"], 200);
        assert_eq!(out["entry"]["body_bytes"], 7);
    }
}
