//! Per-session request serialization.
//!
//! Two requests against the same session id would both archive, both read
//! the same history and both append, interleaving their turns. Holding the
//! session's permit for the whole request makes the second one wait.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each session id maps to a `Semaphore(1)`. Process-local only.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
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

    fn semaphore(&self, session_id: &str) -> Arc<Semaphore> {
        self.locks
            .lock()
            .entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Wait for the session's permit. It releases on drop.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        self.semaphore(session_id)
            .acquire_owned()
            .await
            .map_err(|_| SessionBusy)
    }

    /// Take the permit only if nobody holds it.
    pub fn try_acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        self.semaphore(session_id)
            .try_acquire_owned()
            .map_err(|_| SessionBusy)
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Forget sessions nobody holds or waits on. Permits and waiters keep
    /// their own reference to the semaphore, so a count of one means idle.
    pub fn prune_idle(&self) {
        self.locks
            .lock()
            .retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}

/// Another request holds the session.
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy with another request")
    }
}

impl std::error::Error for SessionBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();

        let permit1 = map.acquire("s1").await.unwrap();
        drop(permit1);

        let permit2 = map.acquire("s1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_sessions_concurrent() {
        let map = SessionLockMap::new();

        let p1 = map.acquire("s1").await.unwrap();
        let p2 = map.acquire("s2").await.unwrap();
        assert_eq!(map.session_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_session_waits() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("s1").await.unwrap();
        assert!(map.try_acquire("s1").is_err());

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("s1").await.unwrap();
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(p1);

        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn prune_keeps_held_sessions() {
        let map = SessionLockMap::new();
        let held = map.acquire("busy").await.unwrap();
        drop(map.acquire("idle").await.unwrap());

        map.prune_idle();
        assert_eq!(map.session_count(), 1);
        assert!(map.try_acquire("busy").is_err());

        drop(held);
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }
}
