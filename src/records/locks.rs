//! Per-record reader/writer locks

use crate::domain::RecordId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockMap = HashMap<RecordId, Arc<RwLock<()>>>;

/// One async `RwLock` per record id, present only while in use
///
/// Writers of the same record are serialized and readers wait for a write in
/// progress. Different records never contend. An entry is dropped when the
/// last guard or waiter for it goes away, so a later caller always finds
/// either the live lock or none.
#[derive(Default)]
pub struct RecordLocks {
    locks: Mutex<LockMap>,
}

/// Held lock on one record; releases its registry entry when dropped
pub struct RecordGuard<G> {
    // Field order matters: the guard must drop before the lease
    _guard: G,
    _lease: Lease,
}

pub type ReadGuard = RecordGuard<OwnedRwLockReadGuard<()>>;
pub type WriteGuard = RecordGuard<OwnedRwLockWriteGuard<()>>;

/// Interest in one entry, from acquisition until release
struct Lease {
    id: RecordId,
    registry: Arc<RecordLocks>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access to `id`
    pub async fn read(self: &Arc<Self>, id: RecordId) -> ReadGuard {
        let lease = Lease {
            id,
            registry: Arc::clone(self),
        };
        let guard = self.entry(id).read_owned().await;
        RecordGuard {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Exclusive access to `id`
    pub async fn write(self: &Arc<Self>, id: RecordId) -> WriteGuard {
        let lease = Lease {
            id,
            registry: Arc::clone(self),
        };
        let guard = self.entry(id).write_owned().await;
        RecordGuard {
            _guard: guard,
            _lease: lease,
        }
    }

    /// Ids that currently have a guard or a waiter
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: RecordId) -> Arc<RwLock<()>> {
        Arc::clone(self.map().entry(id).or_default())
    }

    fn release(&self, id: RecordId) {
        let mut locks = self.map();
        // Only the map's own reference left
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = Arc::new(RecordLocks::new());
        let id = RecordId::new();

        let writer = locks.write(id).await;
        assert_eq!(locks.len(), 1);
        drop(writer);
        assert!(locks.is_empty());

        for _ in 0..100 {
            let _reader = locks.read(RecordId::new()).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_another_task_waits() {
        let locks = Arc::new(RecordLocks::new());
        let id = RecordId::new();
        let writer = locks.write(id).await;

        let waiting = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _reader = locks.read(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(writer);
        // The waiter still holds the same lock, so the entry survives
        assert_eq!(locks.len(), 1);
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_writer_excludes_readers() {
        let locks = Arc::new(RecordLocks::new());
        let id = RecordId::new();
        let _writer = locks.write(id).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.read(id)).await;
        assert!(blocked.is_err());
        let other = tokio::time::timeout(Duration::from_millis(20), locks.read(RecordId::new())).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_wait_releases_entry() {
        let locks = Arc::new(RecordLocks::new());
        let id = RecordId::new();
        let writer = locks.write(id).await;

        let timed_out = tokio::time::timeout(Duration::from_millis(10), locks.write(id)).await;
        assert!(timed_out.is_err());
        assert_eq!(locks.len(), 1);

        drop(writer);
        assert!(locks.is_empty());
    }
}
