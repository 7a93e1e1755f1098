//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::namespace::{NamespaceName, Registry};
use crate::policy::{ContentPolicy, Fallback, Strategy};

mod validation;

pub use validation::ConfigError;

/// One current namespace: a kind and its version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub kind: String,
    pub version: String,
}

impl NamespaceConfig {
    fn new(kind: &str, version: &str) -> Self {
        Self { kind: kind.into(), version: version.into() }
    }
}

/// Assets fetched into a namespace at install time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheConfig {
    /// Namespace kind to fill.
    pub namespace: String,

    /// Absolute URLs, or paths resolved against `app_origin`.
    pub assets: Vec<String>,
}

/// Override of one strategy-table row. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Namespace kind the class is stored in.
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub cache_content: Option<ContentPolicy>,

    #[serde(default)]
    pub fallback: Option<Fallback>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite namespace store.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for origin requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on stored body bytes across all namespaces.
    ///
    /// Set via SHELLCACHE_MAX_STORE_BYTES environment variable.
    #[serde(default)]
    pub max_store_bytes: Option<u64>,

    /// Origin of the application itself (scheme, host, port).
    ///
    /// Set via SHELLCACHE_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Image CDN hosts.
    #[serde(default)]
    pub image_hosts: Vec<String>,

    /// Remote API hosts.
    #[serde(default)]
    pub api_hosts: Vec<String>,

    /// Web font hosts.
    #[serde(default)]
    pub font_hosts: Vec<String>,

    /// Hosts that are always passed straight through to the network.
    #[serde(default)]
    pub bypass_hosts: Vec<String>,

    /// Request headers that participate in the cache key.
    #[serde(default)]
    pub key_headers: Vec<String>,

    /// Namespaces current for this version. Anything else is purged on activate.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<NamespaceConfig>,

    /// Assets pre-populated at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<PrecacheConfig>,

    /// Shell document served to offline navigations.
    #[serde(default = "default_offline_document")]
    pub offline_document: Option<String>,

    /// Strategy-table overrides keyed by resource class name.
    #[serde(default)]
    pub bindings: BTreeMap<String, BindingConfig>,

    /// Maximum concurrent fetches during install.
    ///
    /// Set via SHELLCACHE_INSTALL_CONCURRENCY environment variable.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_app_origin() -> String {
    "http://localhost:8080".into()
}

fn default_namespaces() -> Vec<NamespaceConfig> {
    vec![
        NamespaceConfig::new("shell", "1"),
        NamespaceConfig::new("images", "1"),
        NamespaceConfig::new("api", "1"),
        NamespaceConfig::new("fonts", "1"),
        NamespaceConfig::new("pages", "1"),
    ]
}

fn default_precache() -> Vec<PrecacheConfig> {
    vec![PrecacheConfig {
        namespace: "shell".into(),
        assets: vec!["/".into(), "/index.html".into(), "/manifest.json".into()],
    }]
}

fn default_offline_document() -> Option<String> {
    Some("/index.html".into())
}

fn default_install_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_store_bytes: None,
            app_origin: default_app_origin(),
            image_hosts: Vec::new(),
            api_hosts: Vec::new(),
            font_hosts: Vec::new(),
            bypass_hosts: Vec::new(),
            key_headers: Vec::new(),
            namespaces: default_namespaces(),
            precache: default_precache(),
            offline_document: default_offline_document(),
            bindings: BTreeMap::new(),
            install_concurrency: default_install_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The application's own origin as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `app_origin` is not an http(s) URL with a host.
    pub fn app_origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.app_origin).map_err(|e| ConfigError::Invalid {
            field: "app_origin".into(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::Invalid {
                field: "app_origin".into(),
                reason: "must be an http(s) URL with a host".into(),
            });
        }
        Ok(url)
    }

    /// Resolve an asset reference (absolute URL or origin-relative path).
    pub fn resolve_asset(&self, asset: &str) -> Result<Url, ConfigError> {
        let base = self.app_origin_url()?;
        base.join(asset.trim()).map_err(|e| ConfigError::Invalid {
            field: "precache".into(),
            reason: format!("{asset}: {e}"),
        })
    }

    /// Build the registry of current namespaces.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let names = self
            .namespaces
            .iter()
            .map(|ns| NamespaceName::new(&ns.kind, &ns.version))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Invalid { field: "namespaces".into(), reason: e.to_string() })?;
        Registry::new(names).map_err(|e| ConfigError::Invalid { field: "namespaces".into(), reason: e.to_string() })
    }

    /// Every precache asset, resolved, paired with its namespace kind.
    pub fn precache_assets(&self) -> Result<Vec<(String, Url)>, ConfigError> {
        let mut assets = Vec::new();
        for set in &self.precache {
            for asset in &set.assets {
                assets.push((set.namespace.clone(), self.resolve_asset(asset)?));
            }
        }
        Ok(assets)
    }

    /// The offline document URL, if configured.
    pub fn offline_document_url(&self) -> Result<Option<Url>, ConfigError> {
        self.offline_document.as_deref().map(|doc| self.resolve_asset(doc)).transpose()
    }
}
