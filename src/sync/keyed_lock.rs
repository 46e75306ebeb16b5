//! Per-key mutual exclusion for mutation sequences.
//!
//! `KeyedLocks::acquire("postDelete-alice", fut)` guarantees that no other
//! future holding the same key runs concurrently within this process.
//! Waiters are served in FIFO order. The lock is released when the lease
//! drops, so errors, panics and cancelled requests all release it.
//!
//! This is not a distributed lock: two instances of the service behind a
//! load balancer do not exclude each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock shared by everyone using one key, plus how many of them there are
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fut` while holding the lock for `key` and returns its output
    pub async fn acquire<F, T>(&self, key: impl Into<String>, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _lease = self.lease(key).await;
        fut.await
    }

    /// Waits for the lock on `key`; the returned lease releases it on drop
    pub async fn lease(&self, key: impl Into<String>) -> KeyLease<'_> {
        let key = key.into();
        let lock = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };

        // Gives the slot back if this future is dropped while waiting
        let mut pending = Pending {
            locks: self,
            key: &key,
            armed: true,
        };
        let guard = lock.lock_owned().await;
        pending.armed = false;
        drop(pending);
        tracing::trace!(key = %key, "acquired key lock");

        KeyLease {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn release(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(key);
            }
        }
    }
}

struct Pending<'a> {
    locks: &'a KeyedLocks,
    key: &'a str,
    armed: bool,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.locks.release(self.key);
        }
    }
}

/// Held lock on one key
pub struct KeyLease<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
        tracing::trace!(key = %self.key, "released key lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_runs_one_at_a_time() {
        let locks = Arc::new(KeyedLocks::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let running = running.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    locks
                        .acquire("postDelete-alice", async {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _alice = locks.lease("postDelete-alice").await;

        let bob = tokio::time::timeout(Duration::from_millis(100), locks.lease("postDelete-bob")).await;
        assert!(bob.is_ok());
        assert_eq!(locks.active_keys(), 2);
    }

    #[tokio::test]
    async fn test_lease_released_on_error_result() {
        let locks = KeyedLocks::new();
        let result: Result<(), &str> = locks.acquire("tagCreate-alice", async { Err("boom") }).await;
        assert!(result.is_err());

        let again = tokio::time::timeout(Duration::from_millis(100), locks.lease("tagCreate-alice")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_lease_released_on_panic() {
        let locks = Arc::new(KeyedLocks::new());
        let cloned = locks.clone();
        let joined = tokio::spawn(async move {
            cloned
                .acquire("follow-alice", async {
                    panic!("handler blew up");
                })
                .await
        })
        .await;
        assert!(joined.is_err());

        let again = tokio::time::timeout(Duration::from_millis(100), locks.lease("follow-alice")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_slot() {
        let locks = KeyedLocks::new();
        let held = locks.lease("nftBuy-users/a/posts/p1").await;

        let waiter = tokio::time::timeout(Duration::from_millis(20), locks.lease("nftBuy-users/a/posts/p1")).await;
        assert!(waiter.is_err());
        assert_eq!(locks.active_keys(), 1);

        drop(held);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_waiters_served_in_order() {
        let locks = Arc::new(KeyedLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = locks.lease("like-alice").await;

        let mut tasks = Vec::new();
        for i in 0..3 {
            let locks = locks.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                locks
                    .acquire("like-alice", async move {
                        order.lock().unwrap().push(i);
                    })
                    .await
            }));
            // Let each waiter queue up before spawning the next
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(first);
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
