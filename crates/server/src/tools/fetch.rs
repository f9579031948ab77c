//! fetch tool implementation.
//!
//! Dispatches a fetch event to the worker, exactly as a controlled page
//! would, and reports where the response came from.

use http::Method;
use precache_client::Worker;
use precache_client::fetch::{UrlError, resolve};
use precache_core::exchange::headers_to_pairs;
use precache_core::{Error, Request, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub source: ResponseSource,
}

pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| match e {
        UrlError::Empty => Error::InvalidInput("url cannot be empty".into()),
        other => Error::InvalidUrl(other.to_string()),
    })?;

    let method = match params.method.as_deref() {
        None => Method::GET,
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {m}")))?,
    };

    let request = Request::new(method, url);
    let response = worker.fetch(&request).await;

    let output = FetchOutput {
        url: request.url.to_string(),
        status: response.status.as_u16(),
        status_text: response.status_text.clone(),
        headers: headers_to_pairs(&response.headers),
        body: response.text(),
        source: response.source,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{origin, output, worker};

    #[tokio::test]
    async fn test_fetch_after_install_hits_cache() {
        let server = origin("build-1").await;
        let (worker, _db) = worker(&server).await;
        worker.install().await;
        worker.drain().await;

        let params = FetchParams { url: "/MILESTONE".into(), method: None };
        let result = fetch_impl(&worker, params).await.unwrap();
        let out: serde_json::Value = output(&result);

        assert_eq!(out["source"], "cache");
        assert_eq!(out["body"], "build-1");
        assert_eq!(out["status"], 200);
        let coep = out["headers"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|h| h[0] == "cross-origin-embedder-policy")
            .count();
        assert_eq!(coep, 1);
    }

    #[tokio::test]
    async fn test_fetch_miss_goes_to_network() {
        let server = origin("build-1").await;
        let (worker, _db) = worker(&server).await;

        let params = FetchParams { url: "/MILESTONE".into(), method: Some("get".into()) };
        let result = fetch_impl(&worker, params).await.unwrap();
        let out: serde_json::Value = output(&result);

        assert_eq!(out["source"], "network");
        assert_eq!(out["body"], "build-1");
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let server = origin("build-1").await;
        let (worker, _db) = worker(&server).await;

        let result = fetch_impl(&worker, FetchParams { url: "  ".into(), method: None }).await;
        assert_eq!(result.unwrap_err().code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let server = origin("build-1").await;
        let (worker, _db) = worker(&server).await;

        let params = FetchParams { url: "/".into(), method: Some("GE T".into()) };
        assert!(fetch_impl(&worker, params).await.is_err());
    }
}
