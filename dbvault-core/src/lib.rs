//! `dbvault` Core Library
//!
//! This crate provides secure storage for database connection credentials:
//! a cached, per-connection serialized `CredentialStore` over pluggable
//! platform secret backends, with graceful degradation to an in-memory cache
//! when no backend is reachable, plus a one-shot importer for legacy
//! plaintext credentials.

pub mod config;
pub mod error;
pub mod migration;
pub mod models;
pub mod progress;
pub mod secret;
pub mod store;

pub use config::{AppSettings, ConfigManager, SecretBackendType, SecretSettings};
pub use error::{
    BackendOperation, ConfigError, ConfigResult, DbVaultError, MigrationError, MigrationResult,
    SecretError, SecretResult, StoreError, StoreResult,
};
pub use migration::{
    migrate_legacy, JsonFileSource, LegacyCredential, LegacyCredentialSource, MigrationReport,
    SkippedRecord,
};
pub use models::{ConnectionId, CredentialBundle};
pub use progress::{
    CallbackProgressReporter, CancelHandle, LogProgressReporter, NoOpProgressReporter, Progress,
    ProgressReporter,
};
pub use secret::{
    create_backend, BackendCapability, LibSecretBackend, MemoryBackend, PlatformInfo,
    SecretBackend, UnavailableBackend,
};
#[cfg(feature = "os-keyring")]
pub use secret::KeyringBackend;
pub use store::{
    CallbackSink, ClearReport, CollectingSink, CredentialStore, DiagnosticSink, NoOpSink,
    PreloadReport, StoreEvent, StoreEventKind,
};
