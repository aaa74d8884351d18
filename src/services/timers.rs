//! Deadline timer registry.
//!
//! One cancellable tokio task per active item, firing once at
//! `server_deadline_at`. Submission cancels the task; expiry is a
//! single well-defined event instead of a wall-clock comparison
//! re-derived on every request.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Pending deadline tasks keyed by item id.
#[derive(Default)]
pub struct DeadlineTimers {
    inner: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl DeadlineTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a deadline task for an item, aborting any stale one.
    pub async fn register(&self, item_id: Uuid, handle: JoinHandle<()>) {
        let mut map = self.inner.lock().await;
        if let Some(old) = map.insert(item_id, handle) {
            old.abort();
        }
    }

    /// Cancel the pending deadline task for an item, if any.
    pub async fn cancel(&self, item_id: Uuid) {
        let mut map = self.inner.lock().await;
        if let Some(handle) = map.remove(&item_id) {
            handle.abort();
        }
    }

    /// Remove a finished task's entry without aborting.
    pub async fn forget(&self, item_id: Uuid) {
        let mut map = self.inner.lock().await;
        map.remove(&item_id);
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.len()
    }
}
