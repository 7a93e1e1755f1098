//! Per-key fetch coalescing.
//!
//! A flight is a detached task that fetches one `(namespace, key)` pair and
//! writes the result to the store. Resolvers that arrive while it runs
//! subscribe to its result instead of starting another fetch. Dropping a
//! receiver never cancels the task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use shellcache_core::{Error, Response};
use tokio::sync::broadcast;

pub type FlightResult = Result<Response, Error>;

/// Identity of a flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightKey {
    pub namespace: String,
    pub key: String,
}

impl FlightKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), key: key.into() }
    }
}

type Flights = Arc<Mutex<HashMap<FlightKey, broadcast::Sender<FlightResult>>>>;

/// Registry of running flights.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    flights: Flights,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the running flight for `key`, or start one from `make`.
    ///
    /// `make` is only called when no flight is running. The returned
    /// receiver yields exactly one result.
    pub fn join_or_start<F, Fut>(&self, key: FlightKey, make: F) -> broadcast::Receiver<FlightResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult> + Send + 'static,
    {
        let mut flights = lock(&self.flights);
        if let Some(tx) = flights.get(&key) {
            tracing::debug!(namespace = %key.namespace, key = %key.key, "joined in-flight fetch");
            return tx.subscribe();
        }

        let (tx, rx) = broadcast::channel(1);
        flights.insert(key.clone(), tx.clone());
        drop(flights);

        let guard = FlightGuard { flights: Arc::clone(&self.flights), key };
        let fut = make();
        tokio::spawn(async move {
            let result = fut.await;
            // Unregister before publishing so no late subscriber misses the result.
            drop(guard);
            let _ = tx.send(result);
        });

        rx
    }

    /// Run or join the flight for `key` and wait for its result.
    pub async fn run<F, Fut>(&self, key: FlightKey, make: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult> + Send + 'static,
    {
        let mut rx = self.join_or_start(key, make);
        rx.recv()
            .await
            .map_err(|e| Error::NetworkError(format!("fetch task ended without a result: {e}")))?
    }

    /// Number of running flights.
    pub fn len(&self) -> usize {
        lock(&self.flights).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the flight entry when the task finishes or unwinds.
struct FlightGuard {
    flights: Flights,
    key: FlightKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock(&self.flights).remove(&self.key);
    }
}

fn lock(flights: &Flights) -> MutexGuard<'_, HashMap<FlightKey, broadcast::Sender<FlightResult>>> {
    flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
