//! Request-resolution engine.
//!
//! Wires the classifier and strategy table from core to the executor and
//! the lifecycle manager. One [`Engine`] serves every request of a running
//! instance:
//!
//! - non-cacheable requests go straight to the origin
//! - until the lifecycle reaches `active`, every request goes straight to the origin
//! - everything else is planned and resolved by the executor

pub mod control;
pub mod executor;
pub mod fence;
pub mod inflight;
pub mod lifecycle;

use std::sync::Arc;

use serde::Serialize;
use shellcache_core::{
    AppConfig, CacheDb, Classification, Classifier, Error, Plan, Registry, Request, ResourceClass, Response, Strategy,
    StrategyTable,
};
use url::Url;

pub use control::{ControlHandle, ControlMessage, ControlReply};
pub use executor::{Executor, OfflineDocument, PLACEHOLDER_SVG};
pub use fence::WriteFence;
pub use inflight::{FlightKey, InFlight};
pub use lifecycle::{Lifecycle, LifecycleState, ManifestEntry};

use crate::fetch::Origin;

/// How a request was resolved, alongside the response itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `None` for non-cacheable requests.
    pub class: Option<ResourceClass>,
    pub strategy: Strategy,
    pub namespace: Option<String>,
    pub response: Response,
}

/// Summary of a resolution without the body, for logs and tool output.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSummary<'a> {
    pub class: Option<ResourceClass>,
    pub strategy: Strategy,
    pub namespace: Option<&'a str>,
    pub status: u16,
    pub source: shellcache_core::ResponseSource,
}

impl Resolution {
    fn passthrough(class: Option<ResourceClass>, response: Response) -> Self {
        Self { class, strategy: Strategy::NetworkOnly, namespace: None, response }
    }

    pub fn summary(&self) -> ResolutionSummary<'_> {
        ResolutionSummary {
            class: self.class,
            strategy: self.strategy,
            namespace: self.namespace.as_deref(),
            status: self.response.status,
            source: self.response.source,
        }
    }
}

pub struct Engine {
    classifier: Classifier,
    table: StrategyTable,
    registry: Registry,
    origin: Arc<dyn Origin>,
    executor: Executor,
    lifecycle: Arc<Lifecycle>,
    db: CacheDb,
}

impl Engine {
    /// Build an engine from validated configuration.
    pub fn from_config(config: &AppConfig, db: CacheDb, origin: Arc<dyn Origin>) -> Result<Self, Error> {
        let classifier = Classifier::from_config(config)?;
        let table = StrategyTable::from_config(config)?;
        let registry = config.registry()?;
        table.check(&registry)?;

        let manifest = config
            .precache_assets()?
            .into_iter()
            .map(|(kind, url)| {
                let namespace = registry
                    .current(&kind)
                    .cloned()
                    .ok_or_else(|| Error::InvalidNamespace(format!("precache kind {kind:?} is not registered")))?;
                Ok(ManifestEntry { namespace, url })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let offline = match config.offline_document_url()? {
            Some(url) => table
                .plan(ResourceClass::StaticShell, &registry)?
                .namespace
                .map(|namespace| OfflineDocument { request: Request::get(url), namespace }),
            None => None,
        };

        let fence = WriteFence::new();
        let executor = Executor::new(db.clone(), Arc::clone(&origin), fence.clone())
            .with_key_headers(&config.key_headers)
            .with_offline_document(offline);
        let lifecycle = Lifecycle::new(db.clone(), Arc::clone(&origin), fence, registry.clone(), manifest)
            .with_key_headers(&config.key_headers)
            .with_concurrency(config.install_concurrency);

        Ok(Self { classifier, table, registry, origin, executor, lifecycle: Arc::new(lifecycle), db })
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The application's own origin; relative URLs resolve against it.
    pub fn app_origin(&self) -> &Url {
        self.classifier.app_origin()
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Spawn the control loop for this engine's lifecycle.
    pub fn spawn_control(&self) -> (ControlHandle, tokio::task::JoinHandle<()>) {
        control::spawn(Arc::clone(&self.lifecycle))
    }

    pub fn classify(&self, request: &Request) -> Classification {
        self.classifier.classify(request)
    }

    /// The plan a cacheable request would be resolved with.
    pub fn plan(&self, class: ResourceClass) -> Result<Plan, Error> {
        self.table.plan(class, &self.registry)
    }

    /// Resolve one request.
    pub async fn handle(&self, request: &Request) -> Result<Resolution, Error> {
        let class = match self.classify(request) {
            Classification::NonCacheable => {
                tracing::debug!(method = %request.method, url = %request.url, "non-cacheable, passing through");
                let response = self.origin.fetch(request).await?;
                return Ok(Resolution::passthrough(None, response));
            }
            Classification::Class(class) => class,
        };

        let state = self.lifecycle.state();
        if state != LifecycleState::Active {
            tracing::debug!(url = %request.url, %state, "lifecycle not active, passing through");
            let response = self.origin.fetch(request).await?;
            return Ok(Resolution::passthrough(Some(class), response));
        }

        let plan = self.plan(class)?;
        tracing::debug!(url = %request.url, %class, strategy = %plan.strategy, "resolving");
        let response = self.executor.resolve(request, &plan).await?;

        Ok(Resolution {
            class: Some(class),
            strategy: plan.strategy,
            namespace: plan.namespace.map(|namespace| namespace.to_string()),
            response,
        })
    }
}
