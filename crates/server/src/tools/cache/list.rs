//! cache_list tool implementation.
//!
//! Lists existing namespaces with their sizes, next to the registry of
//! namespaces the running version considers current.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Engine, LifecycleState};
use shellcache_core::NamespaceStats;

use crate::error::ToolError;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub state: LifecycleState,
    /// Current namespace names.
    pub registry: Vec<String>,
    pub namespaces: Vec<NamespaceStats>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let namespaces = engine.db().namespace_stats().await?;
    let output = CacheListOutput {
        state: engine.lifecycle().state(),
        registry: engine.registry().iter().map(ToString::to_string).collect(),
        namespaces,
    };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
