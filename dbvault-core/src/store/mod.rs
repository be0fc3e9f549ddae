//! Credential storage
//!
//! `CredentialStore` is the only entry point callers need: it validates ids,
//! caches bundles for the life of the process, writes through to the
//! configured `SecretBackend`, and degrades to cache-only operation when no
//! backend is reachable.

mod cache;
mod credential_store;
mod diagnostics;
mod locks;

pub use credential_store::{ClearReport, CredentialStore, PreloadReport};
pub use diagnostics::{
    CallbackSink, CollectingSink, DiagnosticSink, NoOpSink, StoreEvent, StoreEventKind,
};
