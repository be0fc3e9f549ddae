//! Process-lifetime credential cache.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::{ConnectionId, CredentialBundle};

/// What the store knows about one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CacheEntry {
    /// Credentials are known
    Present(CredentialBundle),
    /// The connection is known to have no credentials
    Absent,
}

impl CacheEntry {
    pub(crate) fn into_option(self) -> Option<CredentialBundle> {
        match self {
            Self::Present(bundle) => Some(bundle),
            Self::Absent => None,
        }
    }
}

/// Read-through cache shared by every store operation
///
/// Entries never expire. The lock is never held across a backend call.
#[derive(Default)]
pub(crate) struct CredentialCache {
    entries: RwLock<HashMap<ConnectionId, CacheEntry>>,
}

impl CredentialCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, id: &ConnectionId) -> Option<CacheEntry> {
        self.entries.read().await.get(id).cloned()
    }

    pub(crate) async fn insert(&self, id: ConnectionId, entry: CacheEntry) {
        self.entries.write().await.insert(id, entry);
    }

    /// Removes the entry, returning true if there was one
    pub(crate) async fn remove(&self, id: &ConnectionId) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    pub(crate) async fn ids(&self) -> Vec<ConnectionId> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
