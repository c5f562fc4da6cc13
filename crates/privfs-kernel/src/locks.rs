//! Per-name async locks for serialising same-entry operations.
//!
//! Off unless `storage.serialize_same_name` is set. Without it, two
//! operations on the same name race and the host decides the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A table of async mutexes keyed by entry path.
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // Poisoning only happens if a holder panicked mid-insert; the map is still usable
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop slots nobody holds or waits on
        locks.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        self.slot(key).lock_owned().await
    }

    /// Take `key` if nobody holds it.
    #[cfg(test)]
    fn try_acquire(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        self.slot(key).try_lock_owned().ok()
    }

    /// Number of keys currently held or waited on.
    #[cfg(test)]
    fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let locks = NameLocks::new();
        let guard = locks.acquire("notes.txt").await;
        assert!(locks.try_acquire("notes.txt").is_none());
        drop(guard);
        assert!(locks.try_acquire("notes.txt").is_some());
    }

    #[tokio::test]
    async fn different_names_do_not_block() {
        let locks = NameLocks::new();
        let _a = locks.acquire("a.txt").await;
        assert!(locks.try_acquire("b.txt").is_some());
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = NameLocks::new();
        {
            let _a = locks.acquire("a.txt").await;
            let _b = locks.acquire("b.txt").await;
            assert_eq!(locks.active(), 2);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn waiters_run_in_turn() {
        let locks = Arc::new(NameLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.acquire("x").await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let _guard = locks.acquire("x").await;
                order.lock().unwrap().push("second");
            })
        };

        tokio::task::yield_now().await;
        order.lock().unwrap().push("first");
        drop(first);
        waiter.await.unwrap();

        assert_eq!(*order.lock().unwrap(), ["first", "second"]);
    }
}
