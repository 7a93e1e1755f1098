//! cache_get tool implementation.
//!
//! Looks up a stored entry by namespace and URL without creating the
//! namespace or touching the origin.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Engine, canonicalize};
use shellcache_core::request::SAFE_METHOD;
use shellcache_core::{Error, Request};

use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Namespace name, e.g. `shell-v1`.
    pub namespace: String,

    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub namespace: String,
    pub key: String,
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body as UTF-8 text; absent for binary bodies.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// RFC 3339 time the entry was written.
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &Engine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let namespace = params.namespace.trim();
    if namespace.is_empty() {
        return Err(ToolError::InvalidInput("namespace must not be empty".into()).into());
    }

    let url = canonicalize(&params.url, Some(engine.app_origin())).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(params.method.as_deref().unwrap_or(SAFE_METHOD), url);
    let key = engine.executor().cache_key(&request);

    let db = engine.db();
    if !db.list_namespaces().await?.iter().any(|name| name == namespace) {
        return Err(Error::NoCacheEntry(format!("no namespace {namespace}")).into());
    }
    let handle = db.open_namespace(namespace).await?;
    let entry = db
        .get_entry(&handle, &key)
        .await?
        .ok_or_else(|| Error::NoCacheEntry(format!("{} in {namespace}", request.url)))?;

    let output = CacheGetOutput {
        namespace: namespace.to_string(),
        key: entry.key,
        url: entry.url,
        status: entry.status,
        headers: entry.headers,
        body_bytes: entry.body.len(),
        body: String::from_utf8(entry.body).ok(),
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
