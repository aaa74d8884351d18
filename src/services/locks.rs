//! Per-assessment serialization boundary.
//!
//! Each assessment is one logical unit of mutual exclusion: every
//! item-state or integrity mutation for a given assessment id runs
//! under that assessment's lock, which upholds the at-most-one-active-
//! item invariant under duplicate/racing requests. Different
//! assessments proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-assessment locks.
#[derive(Default)]
pub struct AssessmentLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AssessmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one assessment, creating it on first use.
    pub async fn acquire(&self, assessment_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(assessment_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry for a terminal assessment, but only when no
    /// guard or queued waiter still references it. Removing earlier
    /// would hand a later `acquire` a fresh mutex and let it run
    /// alongside the current holder.
    pub async fn release(&self, assessment_id: Uuid) {
        let mut map = self.inner.lock().await;
        if let Some(lock) = map.get(&assessment_id) {
            // The map's clone is the only reference iff nobody holds
            // or waits on the mutex.
            if Arc::strong_count(lock) == 1 {
                map.remove(&assessment_id);
            }
        }
    }

    pub async fn entry_count(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_assessment_serializes() {
        let locks = Arc::new(AssessmentLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let locks2 = locks.clone();
        let handle = tokio::spawn(async move {
            let _guard = locks2.acquire(id).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_release_while_guard_held_keeps_serialization() {
        let locks = Arc::new(AssessmentLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        locks.release(id).await;
        assert_eq!(locks.entry_count().await, 1);

        // A later acquire must queue behind the live guard, not enter
        // through a replacement mutex.
        let locks2 = locks.clone();
        let handle = tokio::spawn(async move {
            let _guard = locks2.acquire(id).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_release_without_holders_removes_entry() {
        let locks = AssessmentLocks::new();
        let id = Uuid::new_v4();

        drop(locks.acquire(id).await);
        locks.release(id).await;
        assert_eq!(locks.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_different_assessments_do_not_block() {
        let locks = AssessmentLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        // Acquiring a different assessment's lock must not deadlock.
        let _b = locks.acquire(Uuid::new_v4()).await;
    }
}
