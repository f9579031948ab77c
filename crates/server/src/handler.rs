//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and the cache.
use std::sync::Arc;

use crate::tools::cache::{CacheCheckParams, CacheGetParams, check_impl, get_impl, status_impl};
use crate::tools::fetch::{FetchParams, fetch_impl};

use precache_client::Worker;
use precache_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for precache-agent.
#[derive(Clone)]
pub struct PrecacheServer {
    worker: Arc<Worker>,
    cache: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PrecacheServer {
    /// Create a new server handler around an activated worker.
    pub fn new(worker: Arc<Worker>, cache: CacheDb) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a URL through the caching agent. Same-origin GETs are served from the cache when present; everything else goes to the network. Fetching the root path first checks the version marker."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Compare the cached version marker with the origin's and flush and reinstall the cache when it changed. Set force to reinstall unconditionally."
    )]
    async fn cache_check(&self, params: Parameters<CacheCheckParams>) -> Result<CallToolResult, McpError> {
        check_impl(&self.worker, params.0).await
    }

    #[tool(description = "Show the worker state, controlled clients, and cache partitions with their sizes.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, &self.cache).await
    }

    #[tool(description = "Show metadata of the cached entry for a URL. Fails with CACHE_MISS when nothing is cached.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, &self.cache, params.0).await
    }
}

impl ServerHandler for PrecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "precache-agent".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
