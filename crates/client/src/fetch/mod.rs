//! Origin fetch interface and its HTTP implementation.
//!
//! ### Outcomes
//! - Any HTTP status is a response, not an error; the executor decides
//!   what to store
//! - Timeouts map to `FETCH_TIMEOUT`, transport failures to `NETWORK_ERROR`
//! - Bodies over the configured limit map to `FETCH_TOO_LARGE`
//!
//! All three count as "no response" for fallback purposes.

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

pub use url::{UrlError, canonicalize};

use shellcache_core::{AppConfig, Error, Request, Response, ResponseSource};

/// The remote origin behind the engine.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch a request from the origin.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP origin.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Origin backed by a reqwest client.
pub struct HttpOrigin {
    http: Client,
    config: FetchConfig,
}

impl HttpOrigin {
    /// Create a new HTTP origin with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() { Error::FetchTimeout(e.to_string()) } else { Error::NetworkError(e.to_string()) }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("bad method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let final_url = response.url().to_string();
        let mut headers = BTreeMap::new();
        for name in response.headers().keys() {
            let values: Vec<&str> = response
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            if !values.is_empty() {
                headers.insert(name.as_str().to_ascii_lowercase(), values.join(", "));
            }
        }
        // Decompression already happened; the stored body is the decoded one.
        headers.remove(header::CONTENT_ENCODING.as_str());
        headers.remove(header::CONTENT_LENGTH.as_str());

        let bytes = response.bytes().await.map_err(transport_error)?;
        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            fetch_ms,
            bytes.len()
        );

        Ok(Response { url: final_url, status, headers, body: bytes, source: ResponseSource::Network })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, p: &str) -> Request {
        Request::get(reqwest::Url::parse(&format!("{}{}", server.uri(), p)).unwrap())
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), max_bytes: 10, timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.max_bytes, 10);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_http_origin_new() {
        assert!(HttpOrigin::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_carries_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"[{"id":1}]"#.as_bytes().to_vec(), "application/json"),
            )
            .mount(&server)
            .await;

        let origin = HttpOrigin::new(FetchConfig::default()).unwrap();
        let response = origin.fetch(&request(&server, "/api/products")).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_json());
        assert_eq!(response.body.as_ref(), br#"[{"id":1}]"#);
        assert_eq!(response.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let origin = HttpOrigin::new(FetchConfig::default()).unwrap();
        let response = origin.fetch(&request(&server, "/missing")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_fetch_forwards_request_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_eq("accept", "text/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let origin = HttpOrigin::new(FetchConfig::default()).unwrap();
        let response = origin
            .fetch(&request(&server, "/page").with_header("Accept", "text/html"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let origin = HttpOrigin::new(FetchConfig { max_bytes: 16, ..Default::default() }).unwrap();
        let result = origin.fetch(&request(&server, "/big")).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let origin = HttpOrigin::new(FetchConfig { timeout: Duration::from_millis(50), ..Default::default() }).unwrap();
        let result = origin.fetch(&request(&server, "/slow")).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
        assert!(result.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let origin = HttpOrigin::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap();
        let request = Request::get(reqwest::Url::parse("http://127.0.0.1:9/").unwrap());
        let result = origin.fetch(&request).await;
        assert!(result.unwrap_err().is_network());
    }
}
