//! Secret backend adapters for `dbvault`
//!
//! This module provides the `SecretBackend` trait and its implementations:
//! - libsecret for GNOME Keyring/KDE Wallet via `secret-tool` (Linux default)
//! - the native OS keychain through the `keyring` crate (`os-keyring` feature)
//! - an in-memory backend and an always-unavailable backend
//!
//! `create_backend` builds the backend selected in `SecretSettings`.

mod backend;
mod libsecret;
mod memory;
#[cfg(feature = "os-keyring")]
mod os_keychain;
mod status;

use std::sync::Arc;

use crate::config::{SecretBackendType, SecretSettings};

pub use backend::{BackendCapability, SecretBackend};
pub use libsecret::LibSecretBackend;
pub use memory::{CallCounts, MemoryBackend, UnavailableBackend};
#[cfg(feature = "os-keyring")]
pub use os_keychain::KeyringBackend;
pub use status::PlatformInfo;

/// Builds the backend selected by `settings`
///
/// A selection that is not compiled into this build yields an
/// `UnavailableBackend`, so the store starts in degraded mode instead of
/// failing.
#[must_use]
pub fn create_backend(settings: &SecretSettings) -> Arc<dyn SecretBackend> {
    match settings.backend {
        SecretBackendType::LibSecret => Arc::new(LibSecretBackend::new(&settings.service_name)),
        #[cfg(feature = "os-keyring")]
        SecretBackendType::Keyring => Arc::new(KeyringBackend::new(&settings.service_name)),
        #[cfg(not(feature = "os-keyring"))]
        SecretBackendType::Keyring => {
            tracing::warn!("Keyring backend requested but this build lacks the os-keyring feature");
            Arc::new(UnavailableBackend::new(
                "built without the os-keyring feature",
            ))
        }
        SecretBackendType::Memory => Arc::new(MemoryBackend::new()),
        SecretBackendType::None => Arc::new(UnavailableBackend::new("no secret backend configured")),
    }
}
