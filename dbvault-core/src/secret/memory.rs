//! In-process secret backend
//!
//! Keeps secrets in memory only. Useful when persistence is explicitly not
//! wanted and as a controllable backend in tests: availability can be toggled,
//! failures injected per key, and calls are counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use crate::error::{BackendOperation, SecretError, SecretResult};

use super::backend::{BackendCapability, SecretBackend};

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, SecretString>,
    failing_keys: HashMap<String, SecretError>,
    latency: Option<Duration>,
    probe_latency: Option<Duration>,
}

/// Volatile backend holding secrets in a `HashMap`
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
    store_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Snapshot of how often each operation was invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Number of `store` calls
    pub store: usize,
    /// Number of `retrieve` calls
    pub retrieve: usize,
    /// Number of `delete` calls
    pub delete: usize,
}

impl MemoryBackend {
    /// Creates an empty, available backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the backend as reachable or not
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Makes every operation on `key` fail with `error`
    pub async fn fail_key(&self, key: impl Into<String>, error: SecretError) {
        self.state.write().await.failing_keys.insert(key.into(), error);
    }

    /// Removes an injected failure
    pub async fn heal_key(&self, key: &str) {
        self.state.write().await.failing_keys.remove(key);
    }

    /// Delays every operation by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Delays `probe` by `latency`
    pub async fn set_probe_latency(&self, latency: Option<Duration>) {
        self.state.write().await.probe_latency = latency;
    }

    /// Highest number of operations that were sleeping out their latency at once
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Returns true if a value is stored under `key`
    pub async fn contains(&self, key: &str) -> bool {
        self.state.read().await.values.contains_key(key)
    }

    /// Returns the number of stored values
    pub async fn len(&self) -> usize {
        self.state.read().await.values.len()
    }

    /// Returns true if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.values.is_empty()
    }

    /// Returns how often each operation has been called
    #[must_use]
    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            store: self.store_calls.load(Ordering::SeqCst),
            retrieve: self.retrieve_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    /// Applies latency and injected failures shared by all operations
    async fn before(&self, operation: BackendOperation, key: &str) -> SecretResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SecretError::Unavailable(
                "memory backend switched off".to_string(),
            ));
        }

        let (latency, injected) = {
            let state = self.state.read().await;
            (state.latency, state.failing_keys.get(key).cloned())
        };

        if let Some(latency) = latency {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        match injected {
            Some(SecretError::OperationFailed { message, .. }) => {
                Err(SecretError::OperationFailed { operation, message })
            }
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SecretBackend for MemoryBackend {
    async fn store(&self, key: &str, value: &SecretString) -> SecretResult<()> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.before(BackendOperation::Store, key).await?;
        self.state
            .write()
            .await
            .values
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> SecretResult<SecretString> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.before(BackendOperation::Retrieve, key).await?;
        self.state
            .read()
            .await
            .values
            .get(key)
            .cloned()
            .ok_or(SecretError::NotFound)
    }

    async fn delete(&self, key: &str) -> SecretResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.before(BackendOperation::Delete, key).await?;
        self.state.write().await.values.remove(key);
        Ok(())
    }

    async fn probe(&self) -> BackendCapability {
        let latency = self.state.read().await.probe_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            BackendCapability::Unavailable("memory backend switched off".to_string())
        } else {
            BackendCapability::Available
        }
    }

    fn backend_id(&self) -> &'static str {
        "memory"
    }

    fn display_name(&self) -> &'static str {
        "In-memory (not persisted)"
    }
}

/// Backend that never exposes any operation
///
/// Stands in for a secret bridge that predates the store/retrieve/delete
/// operations, or for configurations that select no backend at all.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Creates a backend that always reports `reason` from its probe
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SecretBackend for UnavailableBackend {
    async fn store(&self, _key: &str, _value: &SecretString) -> SecretResult<()> {
        Err(SecretError::Unavailable(self.reason.clone()))
    }

    async fn retrieve(&self, _key: &str) -> SecretResult<SecretString> {
        Err(SecretError::Unavailable(self.reason.clone()))
    }

    async fn delete(&self, _key: &str) -> SecretResult<()> {
        Err(SecretError::Unavailable(self.reason.clone()))
    }

    async fn probe(&self) -> BackendCapability {
        BackendCapability::Unavailable(self.reason.clone())
    }

    fn backend_id(&self) -> &'static str {
        "none"
    }

    fn display_name(&self) -> &'static str {
        "No secret backend"
    }
}
