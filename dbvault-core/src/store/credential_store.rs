//! Credential store with read-through caching and degraded mode
//!
//! The `CredentialStore` maps connection ids to credential bundles. It writes
//! through to a `SecretBackend` when the backend is available, keeps every
//! bundle in a process-lifetime cache, serializes operations per connection
//! id, and keeps working from the cache alone when the backend is missing.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SecretSettings;
use crate::error::{BackendOperation, SecretError, SecretResult, StoreResult};
use crate::models::{ConnectionId, CredentialBundle};
use crate::secret::{BackendCapability, SecretBackend};

use super::cache::{CacheEntry, CredentialCache};
use super::diagnostics::{DiagnosticSink, NoOpSink, StoreEvent, StoreEventKind};
use super::locks::KeyLocks;

/// Backend lookups in flight at once during a preload
const PRELOAD_CONCURRENCY: usize = 8;

/// Outcome of `clear_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Cache entries removed
    pub evicted: usize,
    /// Backend keys deleted
    pub deleted: usize,
    /// Backend deletes that failed
    pub failed: usize,
    /// Backend deletes skipped because the backend was unavailable
    pub skipped: usize,
}

/// Outcome of `preload_credentials`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Number of ids that have credentials
    pub found: usize,
    /// Ids without credentials (or whose lookup failed)
    pub missing: Vec<String>,
    /// Ids rejected as malformed
    pub invalid: Vec<String>,
}

/// Secure credential store
///
/// Create one instance per process and share it as `Arc<CredentialStore>`.
/// Callers only ever see `StoreError::InvalidArgument`; backend failures are
/// logged, reported to the `DiagnosticSink`, and absorbed.
pub struct CredentialStore {
    /// Platform secret store
    backend: Arc<dyn SecretBackend>,
    /// Namespace prefix for backend keys
    key_prefix: String,
    /// Upper bound for every backend call
    timeout: Duration,
    /// Session cache
    cache: CredentialCache,
    /// Ids whose backend key this process has written
    written: RwLock<HashSet<ConnectionId>>,
    /// Per-id operation locks
    locks: KeyLocks,
    /// Receiver of absorbed failures
    sink: Arc<dyn DiagnosticSink>,
}

impl CredentialStore {
    /// Creates a store over `backend` configured by `settings`
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, settings: &SecretSettings) -> Self {
        Self {
            backend,
            key_prefix: settings.key_prefix.clone(),
            timeout: settings.backend_timeout(),
            cache: CredentialCache::new(),
            written: RwLock::new(HashSet::new()),
            locks: KeyLocks::new(),
            sink: Arc::new(NoOpSink),
        }
    }

    /// Routes diagnostics to `sink`
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the identifier of the underlying backend
    #[must_use]
    pub fn backend_id(&self) -> &'static str {
        self.backend.backend_id()
    }

    /// Returns the display name of the underlying backend
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.display_name()
    }

    /// Stores credentials for a connection, replacing any previous bundle
    ///
    /// An empty bundle removes the connection's credentials. The cache is
    /// always updated; a backend that is unavailable or failing only costs
    /// durability, which is logged and reported as a diagnostic.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidArgument` for an empty connection id
    #[tracing::instrument(skip(self, bundle), fields(backend = self.backend.backend_id()))]
    pub async fn set_credentials(
        &self,
        connection_id: &str,
        bundle: CredentialBundle,
    ) -> StoreResult<()> {
        let id = ConnectionId::new(connection_id)?;
        if bundle.is_empty() {
            debug!("Empty bundle, removing credentials");
            self.remove(&id).await;
            return Ok(());
        }

        let _guard = self.locks.acquire(&id).await;
        let key = id.backend_key(&self.key_prefix);

        match self.capability().await {
            BackendCapability::Available => {
                let stored = match bundle.to_backend_value() {
                    Ok(value) => {
                        self.bounded(BackendOperation::Store, self.backend.store(&key, &value))
                            .await
                    }
                    Err(e) => Err(e),
                };
                match stored {
                    Ok(()) => {
                        self.written.write().await.insert(id.clone());
                        debug!("Credentials persisted");
                    }
                    Err(error) => self.report_failure(&id, BackendOperation::Store, error),
                }
            }
            BackendCapability::Unavailable(reason) => {
                warn!(
                    %reason,
                    "Secret backend unavailable, credentials held in memory only and lost at exit"
                );
                self.report_degraded(&id, BackendOperation::Store, reason);
            }
        }

        self.cache.insert(id, CacheEntry::Present(bundle)).await;
        Ok(())
    }

    /// Returns the credentials for a connection, or `None` if it has none
    ///
    /// Cached answers are returned without contacting the backend. Backend
    /// failures yield `None`, never stale data.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidArgument` for an empty connection id
    #[tracing::instrument(skip(self), fields(backend = self.backend.backend_id()))]
    pub async fn get_credentials(&self, connection_id: &str) -> StoreResult<Option<CredentialBundle>> {
        let id = ConnectionId::new(connection_id)?;

        if let Some(entry) = self.cache.get(&id).await {
            return Ok(entry.into_option());
        }

        let _guard = self.locks.acquire(&id).await;

        // A writer holding the lock may have filled the cache meanwhile
        if let Some(entry) = self.cache.get(&id).await {
            return Ok(entry.into_option());
        }

        if let BackendCapability::Unavailable(reason) = self.capability().await {
            debug!(%reason, "Secret backend unavailable, no cached credentials");
            self.report_degraded(&id, BackendOperation::Retrieve, reason);
            return Ok(None);
        }

        let key = id.backend_key(&self.key_prefix);
        match self
            .bounded(BackendOperation::Retrieve, self.backend.retrieve(&key))
            .await
        {
            Ok(value) => {
                let bundle = CredentialBundle::from_backend_value(&value);
                if bundle.is_empty() {
                    self.cache.insert(id, CacheEntry::Absent).await;
                    return Ok(None);
                }
                self.cache
                    .insert(id, CacheEntry::Present(bundle.clone()))
                    .await;
                debug!("Credentials loaded from backend");
                Ok(Some(bundle))
            }
            Err(SecretError::NotFound) => {
                self.cache.insert(id, CacheEntry::Absent).await;
                Ok(None)
            }
            Err(error) => {
                self.report_failure(&id, BackendOperation::Retrieve, error);
                Ok(None)
            }
        }
    }

    /// Removes the credentials of a connection
    ///
    /// Removing a connection that has no credentials succeeds.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidArgument` for an empty connection id
    #[tracing::instrument(skip(self), fields(backend = self.backend.backend_id()))]
    pub async fn remove_credentials(&self, connection_id: &str) -> StoreResult<()> {
        let id = ConnectionId::new(connection_id)?;
        self.remove(&id).await;
        Ok(())
    }

    /// Returns true if the connection has credentials
    ///
    /// # Errors
    /// Returns `StoreError::InvalidArgument` for an empty connection id
    pub async fn has_credentials(&self, connection_id: &str) -> StoreResult<bool> {
        Ok(self.get_credentials(connection_id).await?.is_some())
    }

    /// Forgets every credential this process knows about
    ///
    /// Empties the cache and deletes the backend key of every connection this
    /// process has written. Keys that were only read, or that earlier
    /// processes wrote, stay in the backend; they read as absent for the rest
    /// of this process.
    #[tracing::instrument(skip(self), fields(backend = self.backend.backend_id()))]
    pub async fn clear_all(&self) -> ClearReport {
        let written: BTreeSet<ConnectionId> = self.written.read().await.iter().cloned().collect();
        let cached: BTreeSet<ConnectionId> = self.cache.ids().await.into_iter().collect();

        let capability = self.capability().await;
        let mut report = ClearReport::default();

        for id in written.union(&cached).cloned() {
            let _guard = self.locks.acquire(&id).await;
            if self.cache.remove(&id).await {
                report.evicted += 1;
            }

            if !written.contains(&id) {
                self.cache.insert(id, CacheEntry::Absent).await;
                continue;
            }

            match &capability {
                BackendCapability::Available => {
                    let key = id.backend_key(&self.key_prefix);
                    match self
                        .bounded(BackendOperation::Delete, self.backend.delete(&key))
                        .await
                    {
                        Ok(()) => {
                            self.written.write().await.remove(&id);
                            report.deleted += 1;
                        }
                        Err(error) => {
                            report.failed += 1;
                            self.report_failure(&id, BackendOperation::Delete, error);
                            self.cache.insert(id, CacheEntry::Absent).await;
                        }
                    }
                }
                BackendCapability::Unavailable(reason) => {
                    report.skipped += 1;
                    self.report_degraded(&id, BackendOperation::Delete, reason.clone());
                    self.cache.insert(id, CacheEntry::Absent).await;
                }
            }
        }

        info!(
            evicted = report.evicted,
            deleted = report.deleted,
            failed = report.failed,
            skipped = report.skipped,
            "Credential store cleared"
        );
        report
    }

    /// Warms the cache for `connection_ids`
    ///
    /// Up to eight lookups run at once. A malformed id or a failing lookup
    /// only affects that id.
    pub async fn preload_credentials<I, S>(&self, connection_ids: I) -> PreloadReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = connection_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let results: Vec<_> = stream::iter(ids.iter().map(|id| self.get_credentials(id)))
            .buffered(PRELOAD_CONCURRENCY)
            .collect()
            .await;

        let mut report = PreloadReport::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(Some(_)) => report.found += 1,
                Ok(None) => report.missing.push(id),
                Err(_) => report.invalid.push(id),
            }
        }

        debug!(
            found = report.found,
            missing = report.missing.len(),
            invalid = report.invalid.len(),
            "Credentials preloaded"
        );
        report
    }

    /// Probes the backend
    pub async fn backend_status(&self) -> BackendCapability {
        self.capability().await
    }

    /// Verifies the backend with a store, retrieve and delete round trip
    ///
    /// Uses a throwaway key and bypasses the cache.
    ///
    /// # Errors
    /// Returns `SecretError::Unavailable` when the probe fails, the backend's
    /// error when an operation fails, or `SecretError::InvalidValue` when the
    /// value read back differs
    pub async fn health_check(&self) -> SecretResult<()> {
        if let BackendCapability::Unavailable(reason) = self.capability().await {
            return Err(SecretError::Unavailable(reason));
        }

        let key = format!("{}__health_check__{}", self.key_prefix, Uuid::new_v4().simple());
        let expected = SecretString::from(Uuid::new_v4().to_string());

        self.bounded(BackendOperation::Store, self.backend.store(&key, &expected))
            .await?;

        let round_trip = match self
            .bounded(BackendOperation::Retrieve, self.backend.retrieve(&key))
            .await
        {
            Ok(value) if value.expose_secret() == expected.expose_secret() => Ok(()),
            Ok(_) => Err(SecretError::InvalidValue(
                "health check value read back differs".to_string(),
            )),
            Err(e) => Err(e),
        };

        if let Err(e) = self
            .bounded(BackendOperation::Delete, self.backend.delete(&key))
            .await
        {
            warn!(error = %e, "Failed to clean up health check secret");
        }

        round_trip
    }

    /// Number of cache entries
    pub async fn cached_len(&self) -> usize {
        self.cache.len().await
    }

    /// Backend keys this process has written and not since deleted
    pub async fn written_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .written
            .read()
            .await
            .iter()
            .map(|id| id.backend_key(&self.key_prefix))
            .collect();
        keys.sort();
        keys
    }

    /// Removes credentials for a validated id
    ///
    /// If the backend copy could not be deleted the cache keeps an `Absent`
    /// marker, so the stale backend value is not read back later.
    async fn remove(&self, id: &ConnectionId) {
        let _guard = self.locks.acquire(id).await;

        match self.capability().await {
            BackendCapability::Available => {
                let key = id.backend_key(&self.key_prefix);
                match self
                    .bounded(BackendOperation::Delete, self.backend.delete(&key))
                    .await
                {
                    Ok(()) => {
                        self.cache.remove(id).await;
                        self.written.write().await.remove(id);
                        debug!("Credentials removed");
                    }
                    Err(error) => {
                        self.report_failure(id, BackendOperation::Delete, error);
                        self.cache.insert(id.clone(), CacheEntry::Absent).await;
                    }
                }
            }
            BackendCapability::Unavailable(reason) => {
                warn!(%reason, "Secret backend unavailable, credentials removed from memory only");
                self.report_degraded(id, BackendOperation::Delete, reason);
                self.cache.insert(id.clone(), CacheEntry::Absent).await;
            }
        }
    }

    /// Probes the backend, treating a hanging probe as unavailable
    async fn capability(&self) -> BackendCapability {
        tokio::time::timeout(self.timeout, self.backend.probe())
            .await
            .unwrap_or_else(|_| {
                BackendCapability::Unavailable(format!("probe timed out after {:?}", self.timeout))
            })
    }

    /// Bounds a backend call by the configured timeout
    async fn bounded<T>(
        &self,
        operation: BackendOperation,
        call: impl Future<Output = SecretResult<T>> + Send,
    ) -> SecretResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(SecretError::Timeout {
                operation,
                after: self.timeout,
            }))
    }

    fn report_failure(&self, id: &ConnectionId, operation: BackendOperation, error: SecretError) {
        warn!(
            connection_id = %id,
            %operation,
            error = %error,
            "Secret backend operation failed"
        );
        self.sink.record(&StoreEvent::new(
            id.clone(),
            StoreEventKind::BackendFailure { operation, error },
        ));
    }

    fn report_degraded(&self, id: &ConnectionId, operation: BackendOperation, reason: String) {
        self.sink.record(&StoreEvent::new(
            id.clone(),
            StoreEventKind::Degraded { operation, reason },
        ));
    }
}
