//! Strategy table: resource class to retrieval strategy and namespace.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::classify::ResourceClass;
use crate::Error;
use crate::config::AppConfig;
use crate::namespace::{NamespaceName, Registry};

/// Retrieval algorithm used to resolve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache; fetch and store only on a miss.
    CacheFirst,
    /// Serve from cache and refresh it in the background.
    #[serde(alias = "cache-first-with-background-refresh")]
    StaleWhileRevalidate,
    /// Fetch first, honoring the binding's content policy when storing.
    NetworkFirst,
    /// Fetch first, store any successful response.
    NetworkFirstFallbackToCache,
    /// Always fetch; never read or write the store.
    NetworkOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
            Self::NetworkFirst => "network-first",
            Self::NetworkFirstFallbackToCache => "network-first-fallback-to-cache",
            Self::NetworkOnly => "network-only",
        }
    }

    pub fn uses_cache(&self) -> bool {
        *self != Self::NetworkOnly
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which successful responses a network-first binding may store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentPolicy {
    #[default]
    Any,
    /// Only JSON-bearing bodies.
    Json,
}

/// Generated response used when nothing else is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Fallback {
    #[default]
    None,
    /// A fixed placeholder image.
    PlaceholderImage,
    /// The cached offline document, for navigations.
    OfflineDocument,
}

/// One row of the strategy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub strategy: Strategy,
    /// Namespace kind; unused by network-only bindings.
    pub namespace: Option<String>,
    pub content: ContentPolicy,
    pub fallback: Fallback,
}

impl Binding {
    fn new(strategy: Strategy, namespace: Option<&str>) -> Self {
        Self { strategy, namespace: namespace.map(str::to_string), content: ContentPolicy::Any, fallback: Fallback::None }
    }

    fn content(mut self, content: ContentPolicy) -> Self {
        self.content = content;
        self
    }

    fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// A resolved binding: what the executor needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub class: ResourceClass,
    pub strategy: Strategy,
    /// Current namespace; `None` for network-only.
    pub namespace: Option<NamespaceName>,
    pub content: ContentPolicy,
    pub fallback: Fallback,
}

impl Plan {
    /// A pass-through plan that never touches the store.
    pub fn network_only(class: ResourceClass) -> Self {
        Self { class, strategy: Strategy::NetworkOnly, namespace: None, content: ContentPolicy::Any, fallback: Fallback::None }
    }
}

/// Maps every resource class to a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    bindings: BTreeMap<ResourceClass, Binding>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let bindings = BTreeMap::from([
            (ResourceClass::StaticShell, Binding::new(Strategy::StaleWhileRevalidate, Some("shell"))),
            (
                ResourceClass::Image,
                Binding::new(Strategy::CacheFirst, Some("images")).fallback(Fallback::PlaceholderImage),
            ),
            (
                ResourceClass::RemoteApi,
                Binding::new(Strategy::NetworkFirst, Some("api")).content(ContentPolicy::Json),
            ),
            (ResourceClass::Font, Binding::new(Strategy::CacheFirst, Some("fonts"))),
            (
                ResourceClass::SameOriginOther,
                Binding::new(Strategy::NetworkFirstFallbackToCache, Some("pages")).fallback(Fallback::OfflineDocument),
            ),
            (ResourceClass::CrossOriginOther, Binding::new(Strategy::NetworkOnly, None)),
        ]);
        Self { bindings }
    }
}

impl StrategyTable {
    /// Default table with the configured overrides applied.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let mut table = Self::default();
        for (name, overrides) in &config.bindings {
            let class: ResourceClass = name.parse()?;
            let binding = table.bindings.entry(class).or_insert_with(|| Binding::new(Strategy::NetworkOnly, None));
            if let Some(strategy) = overrides.strategy {
                binding.strategy = strategy;
            }
            if let Some(namespace) = &overrides.namespace {
                binding.namespace = Some(namespace.clone());
            }
            if let Some(content) = overrides.cache_content {
                binding.content = content;
            }
            if let Some(fallback) = overrides.fallback {
                binding.fallback = fallback;
            }
        }
        Ok(table)
    }

    pub fn binding(&self, class: ResourceClass) -> Option<&Binding> {
        self.bindings.get(&class)
    }

    /// Check that every caching binding names a registered namespace kind.
    pub fn check(&self, registry: &Registry) -> Result<(), Error> {
        for class in ResourceClass::ALL {
            self.plan(class, registry)?;
        }
        Ok(())
    }

    /// Resolve the binding for `class` against the current registry.
    pub fn plan(&self, class: ResourceClass, registry: &Registry) -> Result<Plan, Error> {
        let binding = self
            .binding(class)
            .ok_or_else(|| Error::InvalidInput(format!("no binding for {class}")))?;

        if !binding.strategy.uses_cache() {
            return Ok(Plan { fallback: binding.fallback, ..Plan::network_only(class) });
        }

        let kind = binding
            .namespace
            .as_deref()
            .ok_or_else(|| Error::InvalidNamespace(format!("{class} uses {} but names no namespace", binding.strategy)))?;
        let namespace = registry
            .current(kind)
            .ok_or_else(|| Error::InvalidNamespace(format!("{class} is bound to unregistered kind {kind:?}")))?;

        Ok(Plan {
            class,
            strategy: binding.strategy,
            namespace: Some(namespace.clone()),
            content: binding.content,
            fallback: binding.fallback,
        })
    }
}
