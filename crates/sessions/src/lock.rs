//! Per-session concurrency control.
//!
//! For a given `(channel_type, chat_id)` at most one turn is in
//! flight; a second message arriving mid-turn waits for the permit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-session run locks.
///
/// Each session key maps to a `Semaphore(1)`. Holding the permit
/// grants exclusive access for one turn; it auto-releases on drop.
pub struct SessionLockMap {
    locks: Mutex<HashMap<(String, String), Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a session, waiting until any in-flight
    /// turn finishes.
    pub async fn acquire(
        &self,
        channel_type: &str,
        chat_id: &str,
    ) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry((channel_type.to_owned(), chat_id.to_owned()))
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| SessionBusy)
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop lock entries for sessions that aren't actively held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

/// Error returned when a session's lock has been closed.
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy: a turn is already in progress")
    }
}

impl std::error::Error for SessionBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();

        let permit1 = map.acquire("telegram", "c1").await.unwrap();
        drop(permit1);

        let permit2 = map.acquire("telegram", "c1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_sessions_concurrent() {
        let map = Arc::new(SessionLockMap::new());

        let p1 = map.acquire("telegram", "c1").await.unwrap();
        let p2 = map.acquire("discord", "c1").await.unwrap();

        assert_eq!(map.session_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_session_waits() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("telegram", "c1").await.unwrap();

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("telegram", "c1").await.unwrap();
            42
        });

        // Give the waiter a moment to queue.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        drop(p1);

        let result = handle.await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn prune_removes_idle_entries() {
        let map = SessionLockMap::new();
        {
            let _p = map.acquire("telegram", "c1").await.unwrap();
            map.prune_idle();
            assert_eq!(map.session_count(), 1); // held: kept
        }
        map.prune_idle();
        assert_eq!(map.session_count(), 0); // released: pruned
    }
}
