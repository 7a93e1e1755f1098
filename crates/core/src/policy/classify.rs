//! Resource classification.
//!
//! Decision order, first match wins:
//!
//! 1. Anything but the safe read method is non-cacheable
//! 2. Explicitly bypassed hosts are cross-origin traffic
//! 3. Destination hint `image`
//! 4. Image CDN allowlist
//! 5. API host allowlist
//! 6. Font host allowlist
//! 7. The application's own host: pinned shell asset or other same-origin
//! 8. Everything else is cross-origin traffic

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::config::{AppConfig, ConfigError};
use crate::request::{Destination, Request};

/// The category a request is bucketed into for strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceClass {
    StaticShell,
    Image,
    RemoteApi,
    Font,
    SameOriginOther,
    CrossOriginOther,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 6] = [
        ResourceClass::StaticShell,
        ResourceClass::Image,
        ResourceClass::RemoteApi,
        ResourceClass::Font,
        ResourceClass::SameOriginOther,
        ResourceClass::CrossOriginOther,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticShell => "static-shell",
            Self::Image => "image",
            Self::RemoteApi => "remote-api",
            Self::Font => "font",
            Self::SameOriginOther => "same-origin-other",
            Self::CrossOriginOther => "cross-origin-other",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown resource class: {s}")))
    }
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not a safe read; the caller sends it straight to the origin.
    NonCacheable,
    Class(ResourceClass),
}

/// Maps requests to resource classes using configured host lists.
#[derive(Debug, Clone)]
pub struct Classifier {
    app_origin: Url,
    pinned_paths: BTreeSet<String>,
    image_hosts: Vec<String>,
    api_hosts: Vec<String>,
    font_hosts: Vec<String>,
    bypass_hosts: Vec<String>,
}

impl Classifier {
    /// A classifier with empty allowlists for the given application origin.
    pub fn new(app_origin: Url) -> Self {
        Self {
            app_origin,
            pinned_paths: BTreeSet::new(),
            image_hosts: Vec::new(),
            api_hosts: Vec::new(),
            font_hosts: Vec::new(),
            bypass_hosts: Vec::new(),
        }
    }

    /// Build from configuration.
    ///
    /// Pinned shell paths are the same-origin precache assets.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut classifier = Self::new(config.app_origin_url()?)
            .with_image_hosts(&config.image_hosts)
            .with_api_hosts(&config.api_hosts)
            .with_font_hosts(&config.font_hosts)
            .with_bypass_hosts(&config.bypass_hosts);

        for (_, asset) in config.precache_assets()? {
            if classifier.is_same_origin(&asset) {
                classifier.pinned_paths.insert(asset.path().to_string());
            }
        }

        Ok(classifier)
    }

    pub fn with_pinned_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinned_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_image_hosts(mut self, hosts: &[String]) -> Self {
        self.image_hosts = normalize_hosts(hosts);
        self
    }

    pub fn with_api_hosts(mut self, hosts: &[String]) -> Self {
        self.api_hosts = normalize_hosts(hosts);
        self
    }

    pub fn with_font_hosts(mut self, hosts: &[String]) -> Self {
        self.font_hosts = normalize_hosts(hosts);
        self
    }

    pub fn with_bypass_hosts(mut self, hosts: &[String]) -> Self {
        self.bypass_hosts = normalize_hosts(hosts);
        self
    }

    pub fn app_origin(&self) -> &Url {
        &self.app_origin
    }

    /// Classify a request. Deterministic and side-effect free.
    pub fn classify(&self, request: &Request) -> Classification {
        if !request.is_safe_method() {
            return Classification::NonCacheable;
        }

        let host = request.url.host_str().unwrap_or_default().to_ascii_lowercase();

        let class = if matches_any(&host, &self.bypass_hosts) {
            ResourceClass::CrossOriginOther
        } else if request.destination == Some(Destination::Image) || matches_any(&host, &self.image_hosts) {
            ResourceClass::Image
        } else if matches_any(&host, &self.api_hosts) {
            ResourceClass::RemoteApi
        } else if matches_any(&host, &self.font_hosts) {
            ResourceClass::Font
        } else if self.is_same_origin(&request.url) {
            if self.pinned_paths.contains(request.url.path()) {
                ResourceClass::StaticShell
            } else {
                ResourceClass::SameOriginOther
            }
        } else {
            ResourceClass::CrossOriginOther
        };

        Classification::Class(class)
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        let host = url.host_str().map(str::to_ascii_lowercase);
        let own = self.app_origin.host_str().map(str::to_ascii_lowercase);
        host.is_some() && host == own && url.port_or_known_default() == self.app_origin.port_or_known_default()
    }
}

fn normalize_hosts(hosts: &[String]) -> Vec<String> {
    hosts
        .iter()
        .map(|h| h.trim().trim_start_matches("*.").trim_end_matches('.').to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Exact host or any subdomain of an allowlisted entry.
fn matches_any(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        host == pattern || host.strip_suffix(pattern.as_str()).is_some_and(|prefix| prefix.ends_with('.'))
    })
}
