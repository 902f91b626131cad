//! Bounded admission pool for concurrent forward sessions.
//!
//! A fixed-capacity counting pool: every live session holds one [`Slot`],
//! and the total outstanding never exceeds the configured capacity. Slots
//! are fungible tokens, not identities. `acquire()` blocks until a slot
//! frees; release happens when the `Slot` is dropped, which makes
//! exactly-once release hold on every path a session can take, including
//! panics inside its task.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default maximum number of concurrent forward sessions.
pub const DEFAULT_CAPACITY: usize = 20;

/// An admission token. Dropping it returns the slot to the pool.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Fixed-capacity pool of admission slots.
///
/// Cloning yields another handle to the same pool, so all listeners share
/// one capacity bound.
#[derive(Clone)]
pub struct SlotPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl SlotPool {
    /// Create a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Acquire a slot, waiting until one is free.
    ///
    /// There is no fairness guarantee beyond the semaphore's own queueing,
    /// and no bounded wait: callers that must not block forever should wrap
    /// this in a timeout.
    pub async fn acquire(&self) -> Slot {
        // The semaphore is never closed, so this cannot fail.
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("slot semaphore closed");
        Slot { _permit: permit }
    }

    /// Acquire a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<Slot> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| Slot { _permit: permit })
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_pool_counts() {
        let pool = SlotPool::new(3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(), 3);

        let slot = pool.acquire().await;
        assert_eq!(pool.available(), 2);

        drop(slot);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_pool_blocks() {
        let pool = SlotPool::new(1);
        let held = pool.acquire().await;

        assert!(pool.try_acquire().is_none());

        // acquire() must block while the slot is held...
        let blocked = timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err());

        // ...and wake up once it frees
        drop(held);
        timeout(Duration::from_secs(1), pool.acquire())
            .await
            .expect("acquire should succeed after release");
    }

    #[tokio::test]
    async fn test_release_on_drop_from_many_tasks() {
        let pool = SlotPool::new(4);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let _slot = pool.acquire().await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pool.available(), 4);
    }

    #[tokio::test]
    async fn test_clone_shares_capacity() {
        let pool = SlotPool::new(2);
        let other = pool.clone();

        let _a = pool.acquire().await;
        let _b = other.acquire().await;

        assert_eq!(pool.available(), 0);
        assert_eq!(other.available(), 0);
        assert!(other.try_acquire().is_none());
    }
}
