//! Scripted in-process origin for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shellcache_core::{Error, Request, Response};

use crate::fetch::Origin;

#[derive(Debug, Clone)]
enum Outcome {
    Respond(Response),
    Fail,
}

/// Origin double: per-URL scripted outcomes, fetch counting, optional delay.
///
/// Unscripted URLs fail with a network error.
#[derive(Debug, Default)]
pub struct MockOrigin {
    routes: Mutex<HashMap<String, Outcome>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MockOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(self, url: &str, status: u16, content_type: &str, body: &str) -> Self {
        self.set_response(url, status, content_type, body);
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.set_failure(url);
        self
    }

    pub fn set_response(&self, url: &str, status: u16, content_type: &str, body: &str) {
        let response = Response::new(url, status, body.to_string()).with_header("content-type", content_type);
        self.routes.lock().unwrap().insert(url.to_string(), Outcome::Respond(response));
    }

    pub fn set_failure(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Outcome::Fail);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Origin for MockOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.routes.lock().unwrap().get(&url).cloned();
        match outcome {
            Some(Outcome::Respond(response)) => Ok(response),
            Some(Outcome::Fail) | None => Err(Error::NetworkError(format!("unreachable: {url}"))),
        }
    }
}
