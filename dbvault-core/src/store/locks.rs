//! Per-connection serialization of store operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::ConnectionId;

/// Table of per-connection async mutexes
///
/// Entries are created on demand and dropped again once no task holds or
/// waits for them, so the table only grows with concurrently active ids.
#[derive(Default)]
pub(crate) struct KeyLocks {
    table: Mutex<HashMap<ConnectionId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one connection id, released on drop
pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    id: ConnectionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the lock for `id`
    pub(crate) async fn acquire(&self, id: &ConnectionId) -> KeyGuard<'_> {
        let mutex = {
            let mut table = self.table();
            Arc::clone(table.entry(id.clone()).or_default())
        };

        let guard = mutex.lock_owned().await;

        KeyGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of ids that currently have a lock entry
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }

    // The table is only touched between awaits, never across one
    fn table(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<AsyncMutex<()>>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = self.locks.table();
        if table
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            table.remove(&self.id);
        }
    }
}
