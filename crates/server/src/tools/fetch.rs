//! fetch tool implementation.
//!
//! Resolves one request through the engine, exactly as an intercepted
//! client request would be.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Engine, Resolution, canonicalize};
use shellcache_core::request::SAFE_METHOD;
use shellcache_core::{Destination, Error, Request, ResourceClass, ResponseSource, Strategy};

use crate::error::ToolError;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Destination hint: document, image, font, script, style or other.
    #[serde(default)]
    pub destination: Option<Destination>,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body as UTF-8 text; absent for binary bodies.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// network, cache or fallback.
    pub source: ResponseSource,
    /// Resource class; absent for non-cacheable requests.
    pub class: Option<ResourceClass>,
    pub strategy: Strategy,
    pub namespace: Option<String>,
}

impl From<Resolution> for FetchOutput {
    fn from(resolution: Resolution) -> Self {
        let response = resolution.response;
        Self {
            url: response.url,
            status: response.status,
            headers: response.headers,
            body_bytes: response.body.len(),
            body: String::from_utf8(response.body.to_vec()).ok(),
            source: response.source,
            class: resolution.class,
            strategy: resolution.strategy,
            namespace: resolution.namespace,
        }
    }
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(engine: &Engine, params: FetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, Some(engine.app_origin())).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = params.method.as_deref().map(str::trim).unwrap_or(SAFE_METHOD);
    if method.is_empty() {
        return Err(ToolError::InvalidInput("method must not be empty".into()).into());
    }

    let mut request = Request::new(method, url);
    if let Some(destination) = params.destination {
        request = request.with_destination(destination);
    }
    if let Some(accept) = params.accept {
        request = request.with_header("accept", accept);
    }

    let resolution = engine.handle(&request).await?;
    tracing::info!(url = %request.url, summary = ?resolution.summary(), "fetch resolved");

    let output = FetchOutput::from(resolution);
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{mock_app, output_json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn params(url: &str) -> FetchParams {
        FetchParams { url: url.to_string(), method: None, destination: None, accept: None }
    }

    #[tokio::test]
    async fn test_fetch_shell_asset_from_cache() {
        let (_server, engine) = mock_app().await;

        let result = fetch_impl(&engine, params("/index.html")).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["class"], "static-shell");
        assert_eq!(output["source"], "cache");
        assert_eq!(output["namespace"], "shell-v1");
        assert_eq!(output["body"], "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_fetch_same_origin_page_from_network() {
        let (server, engine) = mock_app().await;
        Mock::given(method("GET"))
            .and(path("/about.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"<p>about</p>".to_vec(), "text/html"))
            .mount(&server)
            .await;

        let result = fetch_impl(&engine, params("/about.html")).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["class"], "same-origin-other");
        assert_eq!(output["strategy"], "network-first-fallback-to-cache");
        assert_eq!(output["source"], "network");
        assert_eq!(output["status"], 200);
    }

    #[tokio::test]
    async fn test_fetch_post_is_not_classified() {
        let (server, engine) = mock_app().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let result = fetch_impl(&engine, FetchParams { method: Some("post".into()), ..params("/submit") })
            .await
            .unwrap();
        let output = output_json(&result);

        assert!(output["class"].is_null());
        assert_eq!(output["strategy"], "network-only");
        assert_eq!(output["status"], 201);
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (_server, engine) = mock_app().await;
        assert!(fetch_impl(&engine, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_empty_method() {
        let (_server, engine) = mock_app().await;
        let result = fetch_impl(&engine, FetchParams { method: Some(" ".into()), ..params("/index.html") }).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_params_deserialize_destination() {
        let params: FetchParams =
            serde_json::from_str(r#"{"url": "/logo.png", "destination": "image"}"#).unwrap();
        assert_eq!(params.destination, Some(Destination::Image));
        assert!(params.method.is_none());
    }
}
