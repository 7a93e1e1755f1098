//! cache_clear tool implementation.
//!
//! Sends a clearNamespace request over the control channel and relays
//! the acknowledgement.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{ControlHandle, ControlMessage, ControlReply};

use crate::error::ToolError;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Namespace name to delete, e.g. `images-v1`.
    pub name: String,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(control: &ControlHandle, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let reply: ControlReply = control.send(ControlMessage::ClearNamespace { name: params.name }).await?;
    let json = serde_json::to_string_pretty(&reply).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
