//! HTTP-shaped request and response values passed through the engine.
//!
//! These are deliberately small: the engine only needs method, URL,
//! a destination hint and headers on the way in, and status, headers and
//! body on the way out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// The safe read method. Everything else bypasses the engine.
pub const SAFE_METHOD: &str = "GET";

/// Destination hint attached to a request by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Font,
    Script,
    Style,
    Other,
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            "font" => Ok(Self::Font),
            "script" => Ok(Self::Script),
            "style" => Ok(Self::Style),
            "" | "other" => Ok(Self::Other),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// An incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Option<Destination>,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, destination: None, headers: BTreeMap::new() }
    }

    /// A safe-read request for `url`.
    pub fn get(url: Url) -> Self {
        Self::new(SAFE_METHOD, url)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_safe_method(&self) -> bool {
        self.method == SAFE_METHOD
    }

    /// Whether this request is a page navigation.
    pub fn is_navigation(&self) -> bool {
        self.destination == Some(Destination::Document)
            || self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// A terminal response, whether live, cached or generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Status in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body is JSON according to its content type (`application/json`, `+json`).
    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(|ct| {
            let mime = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json") || mime == "text/json"
        })
    }
}
