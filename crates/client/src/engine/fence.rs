//! Per-namespace write fence.
//!
//! Store writes hold the fence shared; namespace deletion holds it
//! exclusively, so a deletion waits for in-progress writes to drain and
//! no write starts while the deletion runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockMap = Arc<Mutex<HashMap<String, Arc<RwLock<()>>>>>;

#[derive(Debug, Clone, Default)]
pub struct WriteFence {
    locks: LockMap,
}

/// A held fence. Dropping it releases the lock and forgets the namespace
/// once nobody else holds or waits on it.
#[derive(Debug)]
pub struct FenceGuard<G> {
    guard: Option<G>,
    namespace: String,
    locks: LockMap,
}

impl<G> Drop for FenceGuard<G> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(&self.namespace).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.namespace);
        }
    }
}

impl WriteFence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, namespace: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(namespace.to_string()).or_default())
    }

    fn hold<G>(&self, namespace: &str, guard: G) -> FenceGuard<G> {
        FenceGuard { guard: Some(guard), namespace: namespace.to_string(), locks: Arc::clone(&self.locks) }
    }

    /// Held for the duration of one store write.
    pub async fn shared(&self, namespace: &str) -> FenceGuard<OwnedRwLockReadGuard<()>> {
        let guard = self.lock_for(namespace).read_owned().await;
        self.hold(namespace, guard)
    }

    /// Held for the duration of a namespace deletion.
    pub async fn exclusive(&self, namespace: &str) -> FenceGuard<OwnedRwLockWriteGuard<()>> {
        let guard = self.lock_for(namespace).write_owned().await;
        self.hold(namespace, guard)
    }

    /// Number of namespaces currently fenced.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_exclusive_waits_for_writers() {
        let fence = WriteFence::new();
        let writer = fence.shared("shell-v1").await;

        let blocked = timeout(Duration::from_millis(30), fence.exclusive("shell-v1")).await;
        assert!(blocked.is_err());

        drop(writer);
        let acquired = timeout(Duration::from_millis(30), fence.exclusive("shell-v1")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_writers_share() {
        let fence = WriteFence::new();
        let _a = fence.shared("images-v1").await;
        let b = timeout(Duration::from_millis(30), fence.shared("images-v1")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let fence = WriteFence::new();
        let _deleting = fence.exclusive("shell-v4").await;
        let write = timeout(Duration::from_millis(30), fence.shared("shell-v5")).await;
        assert!(write.is_ok());
    }

    #[tokio::test]
    async fn test_released_namespaces_are_forgotten() {
        let fence = WriteFence::new();
        drop(fence.exclusive("junk-v1").await);
        drop(fence.shared("shell-v1").await);
        assert!(fence.is_empty());

        let writer = fence.shared("images-v1").await;
        let waiting = {
            let fence = fence.clone();
            tokio::spawn(async move { drop(fence.exclusive("images-v1").await) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(writer);
        assert_eq!(fence.len(), 1);

        waiting.await.unwrap();
        assert!(fence.is_empty());
    }
}
