//! One-shot import of legacy plaintext credentials
//!
//! Older versions kept connection secrets in plaintext. `migrate_legacy`
//! moves such records into a `CredentialStore`. It is only ever run on
//! request and can be repeated safely: records already present with the same
//! values are left untouched.

mod source;

use tracing::{debug, info, warn};

use crate::error::MigrationResult;
use crate::progress::{Progress, ProgressReporter};
use crate::store::CredentialStore;

pub use source::{JsonFileSource, LegacyCredential, LegacyCredentialSource};

/// A legacy record that was not migrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Connection id as found in the source
    pub connection_id: String,
    /// Why the record was skipped
    pub reason: String,
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records written to the store
    pub migrated: usize,
    /// Records whose credentials were already stored
    pub unchanged: usize,
    /// Records that were not migrated
    pub skipped: Vec<SkippedRecord>,
    /// True if the run stopped early on request
    pub cancelled: bool,
}

impl MigrationReport {
    /// Returns the number of records looked at
    #[must_use]
    pub fn total_processed(&self) -> usize {
        self.migrated + self.unchanged + self.skipped.len()
    }

    /// Returns a one-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Migrated: {}, Unchanged: {}, Skipped: {}{}",
            self.migrated,
            self.unchanged,
            self.skipped.len(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }

    fn skip(&mut self, connection_id: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            connection_id: connection_id.to_string(),
            reason: reason.into(),
        });
    }
}

/// Copies every record of `source` into `store`
///
/// Records are processed in source order. Empty records and invalid ids are
/// skipped; a record equal to what the store already returns is counted as
/// unchanged and not rewritten.
///
/// # Errors
///
/// Returns an error only if the source itself cannot be loaded.
pub async fn migrate_legacy(
    store: &CredentialStore,
    source: &dyn LegacyCredentialSource,
    reporter: &dyn ProgressReporter,
) -> MigrationResult<MigrationReport> {
    let records = source.load()?;
    let total = records.len();
    info!(source = %source.describe(), total, "Migrating legacy credentials");

    let mut report = MigrationReport::default();

    for (index, record) in records.iter().enumerate() {
        if reporter.is_cancelled() {
            warn!(done = index, total, "Legacy migration cancelled");
            report.cancelled = true;
            break;
        }

        let id = record.connection_id.as_str();
        let bundle = record.to_bundle();

        if bundle.is_empty() {
            report.skip(id, "record holds no credentials");
        } else {
            match store.get_credentials(id).await {
                Err(e) => report.skip(id, e.to_string()),
                Ok(Some(current)) if current == bundle => {
                    debug!(connection_id = id, "Legacy credentials already stored");
                    report.unchanged += 1;
                }
                Ok(_) => match store.set_credentials(id, bundle).await {
                    Ok(()) => report.migrated += 1,
                    Err(e) => report.skip(id, e.to_string()),
                },
            }
        }

        reporter.report(Progress {
            done: index + 1,
            total,
            connection_id: id,
        });
    }

    info!(summary = %report.summary(), "Legacy migration finished");
    Ok(report)
}
