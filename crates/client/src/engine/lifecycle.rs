//! Install / activate lifecycle and namespace clearing.
//!
//! State machine: `uninitialized -> installing -> installed -> activating -> active`.
//! Install, activate and clear share one mutex so none of them ever runs
//! concurrently with another.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellcache_core::cache::hash::request_cache_key;
use shellcache_core::{CacheDb, CachedEntry, Error, NamespaceHandle, NamespaceName, Registry, Request, Response};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use url::Url;

use super::fence::WriteFence;
use crate::fetch::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Installing,
    Installed,
    Activating,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
        };
        f.write_str(s)
    }
}

/// One asset to pre-populate at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub namespace: NamespaceName,
    pub url: Url,
}

pub struct Lifecycle {
    db: CacheDb,
    origin: Arc<dyn Origin>,
    fence: WriteFence,
    registry: Registry,
    manifest: Vec<ManifestEntry>,
    key_headers: Vec<String>,
    concurrency: usize,
    state: watch::Sender<LifecycleState>,
    ops: Mutex<()>,
}

impl Lifecycle {
    pub fn new(
        db: CacheDb, origin: Arc<dyn Origin>, fence: WriteFence, registry: Registry, manifest: Vec<ManifestEntry>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Uninitialized);
        Self {
            db,
            origin,
            fence,
            registry,
            manifest,
            key_headers: Vec::new(),
            concurrency: 4,
            state,
            ops: Mutex::new(()),
        }
    }

    pub fn with_key_headers(mut self, key_headers: &[String]) -> Self {
        self.key_headers = key_headers.to_vec();
        self
    }

    /// Maximum concurrent manifest fetches during install.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn set_state(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::info!(from = %previous, to = %next, "lifecycle transition");
    }

    /// Fetch every manifest asset and store them all, or store nothing.
    ///
    /// Returns the number of entries written. A failure returns the state to
    /// `uninitialized` so the whole step can be retried.
    ///
    /// # Errors
    ///
    /// - `ManifestFetchFailed` if any asset fails to fetch or returns a non-success status
    /// - `StorageUnavailable` / `StorageQuotaExceeded` if the batch write fails
    /// - `Lifecycle` if the instance is not `uninitialized`
    pub async fn install(&self) -> Result<usize, Error> {
        let _ops = self.ops.lock().await;
        self.install_locked().await
    }

    async fn install_locked(&self) -> Result<usize, Error> {
        let state = self.state();
        if state != LifecycleState::Uninitialized {
            return Err(Error::Lifecycle(format!("cannot install from {state}")));
        }

        self.set_state(LifecycleState::Installing);
        match self.populate().await {
            Ok(count) => {
                self.set_state(LifecycleState::Installed);
                tracing::info!(entries = count, "install complete");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "install failed, nothing stored");
                self.set_state(LifecycleState::Uninitialized);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, Error> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for entry in &self.manifest {
            let origin = Arc::clone(&self.origin);
            let semaphore = Arc::clone(&semaphore);
            let entry = entry.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| manifest_error(&entry.url, e))?;
                let request = Request::get(entry.url.clone());
                let response = origin.fetch(&request).await.map_err(|e| manifest_error(&entry.url, e))?;
                if !response.is_success() {
                    return Err(manifest_error(&entry.url, format!("status {}", response.status)));
                }
                Ok::<(NamespaceName, Request, Response), Error>((entry.namespace, request, response))
            });
        }

        let mut fetched = Vec::with_capacity(self.manifest.len());
        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(|e| Error::Lifecycle(format!("install task failed: {e}")))?;
            match outcome {
                Ok(asset) => fetched.push(asset),
                Err(e) => {
                    set.abort_all();
                    return Err(e);
                }
            }
        }

        let mut handles: HashMap<String, NamespaceHandle> = HashMap::new();
        let mut batch = Vec::with_capacity(fetched.len());
        for (namespace, request, response) in fetched {
            let name = namespace.to_string();
            let handle = match handles.get(&name) {
                Some(handle) => handle.clone(),
                None => {
                    let handle = self.db.open_namespace(&name).await?;
                    handles.insert(name, handle.clone());
                    handle
                }
            };
            let key = request_cache_key(&request, &self.key_headers);
            batch.push((handle, CachedEntry::from_response(&key, &request, &response)));
        }

        self.db.put_entries(&batch).await?;
        Ok(batch.len())
    }

    /// Delete every existing namespace that is not current.
    ///
    /// An instance that has not installed yet (or whose install failed)
    /// runs install first. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let _ops = self.ops.lock().await;

        match self.state() {
            LifecycleState::Uninitialized => {
                self.install_locked().await?;
            }
            LifecycleState::Installed => {}
            state => return Err(Error::Lifecycle(format!("cannot activate from {state}"))),
        }

        self.set_state(LifecycleState::Activating);
        match self.purge().await {
            Ok(deleted) => {
                self.set_state(LifecycleState::Active);
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "activate failed");
                self.set_state(LifecycleState::Installed);
                Err(e)
            }
        }
    }

    async fn purge(&self) -> Result<Vec<String>, Error> {
        let existing = self.db.list_namespaces().await?;
        let stale = self.registry.stale(existing.iter().map(String::as_str));
        for name in &stale {
            self.delete_fenced(name).await?;
            tracing::info!(namespace = %name, "deleted stale namespace");
        }
        Ok(stale)
    }

    /// Delete one namespace on request.
    ///
    /// Returns whether the namespace existed.
    pub async fn clear_namespace(&self, name: &str) -> Result<bool, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidNamespace("namespace name must not be empty".into()));
        }
        let _ops = self.ops.lock().await;
        let deleted = self.delete_fenced(name).await?;
        tracing::info!(namespace = %name, existed = deleted, "cleared namespace");
        Ok(deleted)
    }

    async fn delete_fenced(&self, name: &str) -> Result<bool, Error> {
        let _fence = self.fence.exclusive(name).await;
        self.db.delete_namespace(name).await
    }
}

fn manifest_error(url: &Url, reason: impl ToString) -> Error {
    Error::ManifestFetchFailed { url: url.to_string(), reason: reason.to_string() }
}
