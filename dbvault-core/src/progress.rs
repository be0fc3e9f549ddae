//! Progress reporting for bulk credential operations.
//!
//! Migration of legacy credentials walks many records one by one; callers
//! observe it and may stop it through a `ProgressReporter`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One step of a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    /// Records handled so far
    pub done: usize,
    /// Records in the whole run
    pub total: usize,
    /// Connection the step concerns
    pub connection_id: &'a str,
}

impl Progress<'_> {
    /// Completion as a fraction in `0.0..=1.0`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Receives progress updates and answers cancellation requests.
pub trait ProgressReporter: Send + Sync {
    /// Called after each record
    fn report(&self, progress: Progress<'_>);

    /// Checked before each record; returning true stops the run.
    fn is_cancelled(&self) -> bool;
}

/// Forwards progress to a callback.
pub struct CallbackProgressReporter<F>
where
    F: Fn(Progress<'_>) + Send + Sync,
{
    callback: F,
    cancel: CancelHandle,
}

impl<F> CallbackProgressReporter<F>
where
    F: Fn(Progress<'_>) + Send + Sync,
{
    /// Creates a reporter invoking `callback` for every record
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            cancel: CancelHandle::default(),
        }
    }

    /// Returns a handle that stops the run from elsewhere
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl<F> ProgressReporter for CallbackProgressReporter<F>
where
    F: Fn(Progress<'_>) + Send + Sync,
{
    fn report(&self, progress: Progress<'_>) {
        (self.callback)(progress);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Writes each step to the `tracing` log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report(&self, progress: Progress<'_>) {
        tracing::debug!(
            done = progress.done,
            total = progress.total,
            connection_id = progress.connection_id,
            "Migration progress"
        );
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressReporter;

impl NoOpProgressReporter {
    /// Creates a new no-op reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, _progress: Progress<'_>) {
        // No-op
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}
