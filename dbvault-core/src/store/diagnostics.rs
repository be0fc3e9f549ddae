//! Diagnostic events emitted by the credential store.
//!
//! Backend failures never reach the callers of the store as errors. Instead
//! each absorbed failure or degradation is recorded as a `StoreEvent` and
//! handed to a `DiagnosticSink`, so tests and operators can still observe it.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::{BackendOperation, SecretError};
use crate::models::ConnectionId;

/// What happened to a store operation
#[derive(Debug, Clone)]
pub enum StoreEventKind {
    /// The backend was unavailable; the operation ran against the cache only
    Degraded {
        /// Backend operation that was skipped
        operation: BackendOperation,
        /// Reason reported by the probe
        reason: String,
    },
    /// The backend was reachable but the operation failed or timed out
    BackendFailure {
        /// Backend operation that failed
        operation: BackendOperation,
        /// Error reported by the backend
        error: SecretError,
    },
}

/// A single diagnostic event
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Connection the operation targeted
    pub connection_id: ConnectionId,
    /// What happened
    pub kind: StoreEventKind,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl StoreEvent {
    /// Creates an event stamped with the current time
    #[must_use]
    pub fn new(connection_id: ConnectionId, kind: StoreEventKind) -> Self {
        Self {
            connection_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Returns the backend operation the event concerns
    #[must_use]
    pub const fn operation(&self) -> BackendOperation {
        match &self.kind {
            StoreEventKind::Degraded { operation, .. }
            | StoreEventKind::BackendFailure { operation, .. } => *operation,
        }
    }

    /// Returns true for a degraded (cache-only) operation
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self.kind, StoreEventKind::Degraded { .. })
    }
}

/// Receiver of store diagnostics
pub trait DiagnosticSink: Send + Sync {
    /// Records one event. Must not block.
    fn record(&self, event: &StoreEvent);
}

/// A sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl DiagnosticSink for NoOpSink {
    fn record(&self, _event: &StoreEvent) {
        // No-op
    }
}

/// A sink that forwards events to a callback
pub struct CallbackSink<F>
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    /// Creates a sink invoking `callback` for every event
    #[must_use]
    pub const fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DiagnosticSink for CallbackSink<F>
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    fn record(&self, event: &StoreEvent) {
        (self.callback)(event);
    }
}

/// A sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StoreEvent>>,
}

impl CollectingSink {
    /// Creates an empty collecting sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the recorded events
    pub fn drain(&self) -> Vec<StoreEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, event: &StoreEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
