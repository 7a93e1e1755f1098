//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheClearParams, CacheGetParams, clear_impl, get_impl, list_impl};
use crate::tools::fetch::{FetchParams, fetch_impl};

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
use shellcache_client::{ControlHandle, Engine};

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<Engine>,
    control: ControlHandle,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler around a running engine and its control channel.
    pub fn new(engine: Arc<Engine>, control: ControlHandle) -> Self {
        Self { tool_router: Self::tool_router(), engine, control }
    }

    /// Resolve a request through the cache engine.
    #[tool(
        description = "Resolve a URL through the cache engine. Returns status, headers, body, and how it was resolved \
                       (resource class, strategy, namespace, and whether it came from network, cache or a fallback)."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    /// List namespaces.
    #[tool(description = "List cache namespaces with entry counts and byte totals, plus the current registry.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.engine).await
    }

    /// Look up one stored entry.
    #[tool(description = "Get a stored entry by namespace and URL. Never contacts the origin.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    /// Delete a namespace.
    #[tool(description = "Delete a cache namespace by name. Replies with {\"success\": bool}.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.control, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
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
