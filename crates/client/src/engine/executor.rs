//! Strategy execution.
//!
//! Resolves one request against the store and the origin according to a
//! [`Plan`]. Storage failures never fail a resolution: failed reads are
//! misses, failed writes are logged and skipped.

use std::sync::Arc;

use shellcache_core::cache::hash::request_cache_key;
use shellcache_core::policy::{ContentPolicy, Fallback};
use shellcache_core::{
    CacheDb, CachedEntry, Error, NamespaceHandle, NamespaceName, Plan, Request, Response, ResponseSource, Strategy,
};

use super::fence::WriteFence;
use super::inflight::{FlightKey, FlightResult, InFlight};
use crate::fetch::Origin;

/// Served when an image cannot be fetched and is not cached.
pub const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#e5e7eb"/><path d="M50 150l35-45 25 30 20-25 30 40z" fill="#9ca3af"/><circle cx="135" cy="70" r="14" fill="#9ca3af"/></svg>"##;

/// Where the offline document lives.
#[derive(Debug, Clone)]
pub struct OfflineDocument {
    pub request: Request,
    pub namespace: NamespaceName,
}

#[derive(Clone)]
pub struct Executor {
    db: CacheDb,
    origin: Arc<dyn Origin>,
    flights: InFlight,
    fence: WriteFence,
    key_headers: Arc<[String]>,
    offline: Option<OfflineDocument>,
}

impl Executor {
    pub fn new(db: CacheDb, origin: Arc<dyn Origin>, fence: WriteFence) -> Self {
        Self { db, origin, flights: InFlight::new(), fence, key_headers: Arc::from(Vec::new()), offline: None }
    }

    /// Request headers that participate in cache keys.
    pub fn with_key_headers(mut self, key_headers: &[String]) -> Self {
        self.key_headers = Arc::from(key_headers.to_vec());
        self
    }

    pub fn with_offline_document(mut self, offline: Option<OfflineDocument>) -> Self {
        self.offline = offline;
        self
    }

    pub fn flights(&self) -> &InFlight {
        &self.flights
    }

    /// Cache key for `request` under this executor's key headers.
    pub fn cache_key(&self, request: &Request) -> String {
        request_cache_key(request, &self.key_headers)
    }

    /// Resolve `request` according to `plan`.
    pub async fn resolve(&self, request: &Request, plan: &Plan) -> Result<Response, Error> {
        match (plan.strategy, &plan.namespace) {
            (Strategy::NetworkOnly, _) => self.origin.fetch(request).await,
            (strategy, None) => {
                Err(Error::InvalidNamespace(format!("{} for {} has no namespace", strategy, plan.class)))
            }
            (Strategy::CacheFirst, Some(namespace)) => {
                let key = self.cache_key(request);
                if let Some(hit) = self.lookup(namespace, &key).await {
                    return Ok(hit);
                }
                self.fetch_or_fallback(request, plan, namespace, &key).await
            }
            (Strategy::StaleWhileRevalidate, Some(namespace)) => {
                let key = self.cache_key(request);
                if let Some(hit) = self.lookup(namespace, &key).await {
                    self.refresh(request, plan, namespace, &key);
                    return Ok(hit);
                }
                self.fetch_or_fallback(request, plan, namespace, &key).await
            }
            (Strategy::NetworkFirst | Strategy::NetworkFirstFallbackToCache, Some(namespace)) => {
                let key = self.cache_key(request);
                match self.fetch_and_store(request, plan, namespace, &key).await {
                    Err(e) if e.is_network() => {
                        if let Some(hit) = self.lookup(namespace, &key).await {
                            tracing::debug!(url = %request.url, error = %e, "origin failed, serving cached copy");
                            return Ok(hit);
                        }
                        self.fallback(request, plan, e).await
                    }
                    other => other,
                }
            }
        }
    }

    async fn fetch_or_fallback(
        &self, request: &Request, plan: &Plan, namespace: &NamespaceName, key: &str,
    ) -> Result<Response, Error> {
        match self.fetch_and_store(request, plan, namespace, key).await {
            Err(e) if e.is_network() => self.fallback(request, plan, e).await,
            other => other,
        }
    }

    /// Fetch through the coalescing flight for `(namespace, key)`.
    async fn fetch_and_store(
        &self, request: &Request, plan: &Plan, namespace: &NamespaceName, key: &str,
    ) -> FlightResult {
        let flight = FlightKey::new(namespace.to_string(), key);
        self.flights.run(flight, || self.flight(request, plan, namespace, key)).await
    }

    /// Start a background refresh unless one is already running.
    fn refresh(&self, request: &Request, plan: &Plan, namespace: &NamespaceName, key: &str) {
        let flight = FlightKey::new(namespace.to_string(), key);
        let url = request.url.clone();
        let fut = self.flight(request, plan, namespace, key);
        let _ = self.flights.join_or_start(flight, move || async move {
            let result = fut.await;
            if let Err(e) = &result {
                tracing::warn!(url = %url, error = %e, "background refresh failed, keeping cached copy");
            }
            result
        });
    }

    /// The detached body of a flight: fetch, then store if allowed.
    ///
    /// The namespace handle is opened before the fetch so a namespace
    /// deleted meanwhile rejects the write instead of being recreated.
    fn flight(
        &self, request: &Request, plan: &Plan, namespace: &NamespaceName, key: &str,
    ) -> impl Future<Output = FlightResult> + Send + use<> {
        let this = self.clone();
        let request = request.clone();
        let namespace = namespace.to_string();
        let key = key.to_string();
        let content = match plan.strategy {
            Strategy::NetworkFirstFallbackToCache => ContentPolicy::Any,
            _ => plan.content,
        };

        async move {
            let handle = match this.db.open_namespace(&namespace).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(namespace = %namespace, error = %e, "namespace unavailable, not caching");
                    None
                }
            };

            let response = this.origin.fetch(&request).await?;

            if let Some(handle) = handle
                && storable(&response, content)
            {
                this.store(&handle, &key, &request, &response).await;
            }
            Ok(response)
        }
    }

    async fn store(&self, handle: &NamespaceHandle, key: &str, request: &Request, response: &Response) {
        let _fence = self.fence.shared(handle.name()).await;
        let entry = CachedEntry::from_response(key, request, response);
        match self.db.put_entry(handle, &entry).await {
            Ok(()) => tracing::debug!(namespace = handle.name(), url = %request.url, "stored response"),
            Err(e) => tracing::warn!(namespace = handle.name(), url = %request.url, error = %e, "could not cache response"),
        }
    }

    /// Read an entry; any storage failure is a miss.
    async fn lookup(&self, namespace: &NamespaceName, key: &str) -> Option<Response> {
        let name = namespace.to_string();
        let result = async {
            let handle = self.db.open_namespace(&name).await?;
            self.db.get_entry(&handle, key).await
        }
        .await;

        match result {
            Ok(Some(entry)) => {
                tracing::debug!(namespace = %name, url = %entry.url, "cache hit");
                Some(entry.into_response())
            }
            Ok(None) => {
                tracing::debug!(namespace = %name, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(namespace = %name, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn fallback(&self, request: &Request, plan: &Plan, error: Error) -> Result<Response, Error> {
        match plan.fallback {
            Fallback::PlaceholderImage => {
                tracing::debug!(url = %request.url, error = %error, "serving placeholder image");
                Ok(placeholder_image(request))
            }
            Fallback::OfflineDocument if request.is_navigation() => match self.offline_document().await {
                Some(document) => {
                    tracing::debug!(url = %request.url, error = %error, "serving offline document");
                    Ok(document)
                }
                None => Err(error),
            },
            _ => Err(error),
        }
    }

    async fn offline_document(&self) -> Option<Response> {
        let offline = self.offline.as_ref()?;
        let key = self.cache_key(&offline.request);
        let mut response = self.lookup(&offline.namespace, &key).await?;
        response.source = ResponseSource::Fallback;
        Some(response)
    }
}

fn storable(response: &Response, content: ContentPolicy) -> bool {
    response.is_success()
        && match content {
            ContentPolicy::Any => true,
            ContentPolicy::Json => response.is_json(),
        }
}

/// The generated image served when nothing else is available. Never stored.
pub fn placeholder_image(request: &Request) -> Response {
    let mut response = Response::new(request.url.as_str(), 200, PLACEHOLDER_SVG)
        .with_header("content-type", "image/svg+xml")
        .with_header("cache-control", "no-store");
    response.source = ResponseSource::Fallback;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOrigin;
    use shellcache_core::{Destination, ResourceClass};
    use std::time::Duration;
    use url::Url;

    const APP: &str = "https://app.example.com";

    struct Fixture {
        executor: Executor,
        origin: Arc<MockOrigin>,
        db: CacheDb,
    }

    async fn fixture(origin: MockOrigin) -> Fixture {
        let db = CacheDb::open_in_memory().await.unwrap();
        let origin = Arc::new(origin);
        let offline = OfflineDocument {
            request: Request::get(Url::parse(&format!("{APP}/index.html")).unwrap()),
            namespace: ns("shell-v1"),
        };
        let executor = Executor::new(db.clone(), origin.clone(), WriteFence::new())
            .with_offline_document(Some(offline));
        Fixture { executor, origin, db }
    }

    fn ns(name: &str) -> NamespaceName {
        name.parse().unwrap()
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn plan(class: ResourceClass, strategy: Strategy, namespace: &str) -> Plan {
        Plan {
            class,
            strategy,
            namespace: Some(ns(namespace)),
            content: ContentPolicy::Any,
            fallback: Fallback::None,
        }
    }

    fn image_plan() -> Plan {
        Plan { fallback: Fallback::PlaceholderImage, ..plan(ResourceClass::Image, Strategy::CacheFirst, "images-v1") }
    }

    fn api_plan() -> Plan {
        Plan { content: ContentPolicy::Json, ..plan(ResourceClass::RemoteApi, Strategy::NetworkFirst, "api-v1") }
    }

    async fn stored(f: &Fixture, namespace: &str, request: &Request) -> Option<CachedEntry> {
        let handle = f.db.open_namespace(namespace).await.unwrap();
        f.db.get_entry(&handle, &f.executor.cache_key(request)).await.unwrap()
    }

    async fn seed(f: &Fixture, namespace: &str, request: &Request, response: &Response) {
        let handle = f.db.open_namespace(namespace).await.unwrap();
        let entry = CachedEntry::from_response(&f.executor.cache_key(request), request, response);
        f.db.put_entry(&handle, &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_first_miss_then_hit() {
        let url = "https://images.cdn.net/p/42.jpg";
        let f = fixture(MockOrigin::new().respond(url, 200, "image/jpeg", "jpeg-bytes")).await;
        let request = get(url);

        let first = f.executor.resolve(&request, &image_plan()).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.body.as_ref(), b"jpeg-bytes");

        let second = f.executor.resolve(&request, &image_plan()).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.body, first.body);
        assert_eq!(second.status, first.status);
        assert_eq!(f.origin.calls(url), 1);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_is_returned_not_stored() {
        let url = "https://fonts.gstatic.com/s/missing.woff2";
        let f = fixture(MockOrigin::new().respond(url, 404, "text/plain", "not found")).await;
        let request = get(url);
        let plan = plan(ResourceClass::Font, Strategy::CacheFirst, "fonts-v1");

        let response = f.executor.resolve(&request, &plan).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(stored(&f, "fonts-v1", &request).await.is_none());

        f.executor.resolve(&request, &plan).await.unwrap();
        assert_eq!(f.origin.calls(url), 2);
    }

    #[tokio::test]
    async fn test_image_miss_with_network_failure_yields_placeholder() {
        let url = "https://images.cdn.net/p/7.jpg";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let request = get(url);

        let response = f.executor.resolve(&request, &image_plan()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert_eq!(response.body.as_ref(), PLACEHOLDER_SVG.as_bytes());
        assert!(stored(&f, "images-v1", &request).await.is_none());
    }

    #[tokio::test]
    async fn test_font_miss_with_network_failure_propagates() {
        let url = "https://fonts.gstatic.com/s/a.woff2";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let plan = plan(ResourceClass::Font, Strategy::CacheFirst, "fonts-v1");

        let result = f.executor.resolve(&get(url), &plan).await;
        assert!(matches!(result, Err(Error::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_serves_cached_and_refreshes() {
        let url = "https://app.example.com/index.html";
        let f = fixture(MockOrigin::new().respond(url, 200, "text/html", "v1")).await;
        let request = get(url);
        let plan = plan(ResourceClass::StaticShell, Strategy::StaleWhileRevalidate, "shell-v1");

        let first = f.executor.resolve(&request, &plan).await.unwrap();
        assert_eq!(first.body.as_ref(), b"v1");

        f.origin.set_response(url, 200, "text/html", "v2");
        let second = f.executor.resolve(&request, &plan).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.body.as_ref(), b"v1");

        let mut refreshed = false;
        for _ in 0..50 {
            if stored(&f, "shell-v1", &request).await.is_some_and(|e| e.body == b"v2") {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed);
        assert_eq!(f.origin.calls(url), 2);
    }

    #[tokio::test]
    async fn test_concurrent_hits_share_one_refresh() {
        let url = "https://app.example.com/index.html";
        let f = fixture(
            MockOrigin::new()
                .respond(url, 200, "text/html", "v2")
                .with_delay(Duration::from_millis(50)),
        )
        .await;
        let request = get(url);
        seed(&f, "shell-v1", &request, &Response::new(url, 200, "v1")).await;
        let plan = plan(ResourceClass::StaticShell, Strategy::StaleWhileRevalidate, "shell-v1");

        let (a, b, c) = tokio::join!(
            f.executor.resolve(&request, &plan),
            f.executor.resolve(&request, &plan),
            f.executor.resolve(&request, &plan)
        );
        for response in [a, b, c] {
            let response = response.unwrap();
            assert_eq!(response.source, ResponseSource::Cache);
            assert_eq!(response.body.as_ref(), b"v1");
        }

        for _ in 0..50 {
            if f.executor.flights().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(f.executor.flights().is_empty());
        assert_eq!(f.origin.calls(url), 1);
        assert_eq!(stored(&f, "shell-v1", &request).await.unwrap().body, b"v2");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_swallows_refresh_failure() {
        let url = "https://app.example.com/manifest.json";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let request = get(url);
        seed(&f, "shell-v1", &request, &Response::new(url, 200, "{}")).await;
        let plan = plan(ResourceClass::StaticShell, Strategy::StaleWhileRevalidate, "shell-v1");

        let response = f.executor.resolve(&request, &plan).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let entry = stored(&f, "shell-v1", &request).await.unwrap();
        assert_eq!(entry.body, b"{}");
        assert!(f.executor.flights().is_empty());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cached_json() {
        let url = "https://api.example.com/products";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let request = get(url);
        let cached = Response::new(url, 200, r#"[{"id":1}]"#).with_header("content-type", "application/json");
        seed(&f, "api-v1", &request, &cached).await;

        let response = f.executor.resolve(&request, &api_plan()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body, cached.body);
        assert_eq!(response.headers, cached.headers);
    }

    #[tokio::test]
    async fn test_network_first_stores_only_json() {
        let json_url = "https://api.example.com/products";
        let html_url = "https://api.example.com/status";
        let f = fixture(
            MockOrigin::new()
                .respond(json_url, 200, "application/json; charset=utf-8", "[]")
                .respond(html_url, 200, "text/html", "<p>ok</p>"),
        )
        .await;

        f.executor.resolve(&get(json_url), &api_plan()).await.unwrap();
        f.executor.resolve(&get(html_url), &api_plan()).await.unwrap();

        assert!(stored(&f, "api-v1", &get(json_url)).await.is_some());
        assert!(stored(&f, "api-v1", &get(html_url)).await.is_none());
    }

    #[tokio::test]
    async fn test_network_first_live_response_wins_over_cache() {
        let url = "https://api.example.com/products";
        let f = fixture(MockOrigin::new().respond(url, 200, "application/json", "[2]")).await;
        let request = get(url);
        seed(&f, "api-v1", &request, &Response::new(url, 200, "[1]")).await;

        let response = f.executor.resolve(&request, &api_plan()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.body.as_ref(), b"[2]");
        assert_eq!(stored(&f, "api-v1", &request).await.unwrap().body, b"[2]");
    }

    #[tokio::test]
    async fn test_network_first_error_status_does_not_fall_back() {
        let url = "https://api.example.com/products";
        let f = fixture(MockOrigin::new().respond(url, 500, "application/json", "{}")).await;
        let request = get(url);
        seed(&f, "api-v1", &request, &Response::new(url, 200, "[1]")).await;

        let response = f.executor.resolve(&request, &api_plan()).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(stored(&f, "api-v1", &request).await.unwrap().body, b"[1]");
    }

    #[tokio::test]
    async fn test_network_first_miss_propagates() {
        let url = "https://api.example.com/orders";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let result = f.executor.resolve(&get(url), &api_plan()).await;
        assert!(matches!(result, Err(Error::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_fallback_to_cache_stores_any_content() {
        let url = "https://app.example.com/zadania.html";
        let f = fixture(MockOrigin::new().respond(url, 200, "text/html", "<h1>tasks</h1>")).await;
        let request = get(url);
        let plan = Plan {
            content: ContentPolicy::Json,
            ..plan(ResourceClass::SameOriginOther, Strategy::NetworkFirstFallbackToCache, "pages-v1")
        };

        f.executor.resolve(&request, &plan).await.unwrap();
        assert!(stored(&f, "pages-v1", &request).await.is_some());
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_offline_document() {
        let page = "https://app.example.com/zadania.html";
        let f = fixture(MockOrigin::new().fail(page)).await;
        let index = get("https://app.example.com/index.html");
        seed(&f, "shell-v1", &index, &Response::new(index.url.as_str(), 200, "<html>shell</html>")).await;
        let plan = Plan {
            fallback: Fallback::OfflineDocument,
            ..plan(ResourceClass::SameOriginOther, Strategy::NetworkFirstFallbackToCache, "pages-v1")
        };

        let navigation = get(page).with_destination(Destination::Document);
        let response = f.executor.resolve(&navigation, &plan).await.unwrap();
        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(response.body.as_ref(), b"<html>shell</html>");

        let script = get(page).with_destination(Destination::Script);
        assert!(f.executor.resolve(&script, &plan).await.is_err());
    }

    #[tokio::test]
    async fn test_network_only_never_touches_store() {
        let url = "https://tracker.example.org/pixel";
        let f = fixture(MockOrigin::new().respond(url, 200, "image/gif", "gif")).await;
        let request = get(url);
        let plan = Plan::network_only(ResourceClass::CrossOriginOther);

        f.executor.resolve(&request, &plan).await.unwrap();
        f.executor.resolve(&request, &plan).await.unwrap();

        assert_eq!(f.origin.calls(url), 2);
        assert!(f.db.list_namespaces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_only_failure_propagates() {
        let url = "https://tracker.example.org/pixel";
        let f = fixture(MockOrigin::new().fail(url)).await;
        let result = f.executor.resolve(&get(url), &Plan::network_only(ResourceClass::CrossOriginOther)).await;
        assert!(matches!(result, Err(Error::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let url = "https://images.cdn.net/p/1.jpg";
        let f = fixture(
            MockOrigin::new()
                .respond(url, 200, "image/jpeg", "one")
                .with_delay(Duration::from_millis(50)),
        )
        .await;
        let request = get(url);
        let plan = image_plan();

        let (a, b, c) = tokio::join!(
            f.executor.resolve(&request, &plan),
            f.executor.resolve(&request, &plan),
            f.executor.resolve(&request, &plan)
        );

        assert_eq!(f.origin.calls(url), 1);
        assert_eq!(a.unwrap().body, b.unwrap().body);
        assert_eq!(c.unwrap().body.as_ref(), b"one");
    }

    #[tokio::test]
    async fn test_aborted_caller_still_populates_cache() {
        let url = "https://images.cdn.net/p/slow.jpg";
        let f = fixture(
            MockOrigin::new()
                .respond(url, 200, "image/jpeg", "slow")
                .with_delay(Duration::from_millis(60)),
        )
        .await;
        let request = get(url);

        let aborted = tokio::time::timeout(Duration::from_millis(10), f.executor.resolve(&request, &image_plan())).await;
        assert!(aborted.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(stored(&f, "images-v1", &request).await.is_some());
    }

    #[tokio::test]
    async fn test_quota_exceeded_write_is_absorbed() {
        let url = "https://images.cdn.net/p/big.jpg";
        let db = CacheDb::open_in_memory().await.unwrap().with_quota(Some(4));
        let origin = Arc::new(MockOrigin::new().respond(url, 200, "image/jpeg", "more than four bytes"));
        let executor = Executor::new(db.clone(), origin.clone(), WriteFence::new());
        let request = get(url);

        let response = executor.resolve(&request, &image_plan()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);

        let handle = db.open_namespace("images-v1").await.unwrap();
        assert!(db.get_entry(&handle, &executor.cache_key(&request)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_after_namespace_deletion_is_rejected() {
        let url = "https://images.cdn.net/p/late.jpg";
        let f = fixture(
            MockOrigin::new()
                .respond(url, 200, "image/jpeg", "late")
                .with_delay(Duration::from_millis(60)),
        )
        .await;
        let request = get(url);
        let plan = image_plan();

        let resolve = f.executor.resolve(&request, &plan);
        let delete = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            f.db.delete_namespace("images-v1").await.unwrap()
        };
        let (response, deleted) = tokio::join!(resolve, delete);

        assert!(deleted);
        assert_eq!(response.unwrap().body.as_ref(), b"late");
        assert!(!f.db.list_namespaces().await.unwrap().contains(&"images-v1".to_string()));
    }

    #[tokio::test]
    async fn test_key_headers_split_entries() {
        let url = "https://api.example.com/products";
        let f = fixture(MockOrigin::new().respond(url, 200, "application/json", "[]")).await;
        let executor = f.executor.clone().with_key_headers(&["Accept-Language".to_string()]);

        let pl = get(url).with_header("accept-language", "pl");
        let en = get(url).with_header("accept-language", "en");
        assert_ne!(executor.cache_key(&pl), executor.cache_key(&en));
    }
}
