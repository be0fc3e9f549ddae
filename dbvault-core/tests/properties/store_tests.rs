//! Property-based tests for credential store semantics
//!
//! Covers round trips with and without a backend, removal, empty bundles,
//! `clear_all`, and the preload/overwrite scenarios.

use std::sync::Arc;

use dbvault_core::config::SecretSettings;
use dbvault_core::secret::{CallCounts, MemoryBackend, SecretBackend};
use dbvault_core::store::{CollectingSink, CredentialStore, DiagnosticSink};
use dbvault_core::{CredentialBundle, SecretError};
use proptest::prelude::*;
use secrecy::SecretString;

// ========== Generators ==========

/// Strategy for generating connection ids
fn arb_connection_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,24}".prop_map(String::from)
}

/// Strategy for generating secret values
fn arb_secret() -> impl Strategy<Value = String> {
    "[ -~]{1,40}".prop_map(String::from)
}

/// Strategy for generating non-empty bundles
fn arb_bundle() -> impl Strategy<Value = CredentialBundle> {
    (
        proptest::option::of(arb_secret()),
        proptest::option::of(arb_secret()),
        proptest::option::of(arb_secret()),
    )
        .prop_filter("bundle must hold a field", |(a, b, c)| {
            a.is_some() || b.is_some() || c.is_some()
        })
        .prop_map(|(password, ssh_password, key)| {
            let mut bundle = CredentialBundle::empty();
            if let Some(p) = password {
                bundle = bundle.password(p);
            }
            if let Some(p) = ssh_password {
                bundle = bundle.ssh_password(p);
            }
            if let Some(k) = key {
                bundle = bundle.ssh_private_key(k);
            }
            bundle
        })
}

fn new_store(available: bool) -> (Arc<MemoryBackend>, CredentialStore) {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_available(available);
    let store = CredentialStore::new(
        Arc::clone(&backend) as Arc<dyn SecretBackend>,
        &SecretSettings::default(),
    );
    (backend, store)
}

fn key(id: &str) -> String {
    format!("dbvault.connection.{id}")
}

// ========== Property Tests ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A stored bundle is returned as-is whether or not a backend is present
    #[test]
    fn set_then_get_returns_bundle(
        id in arb_connection_id(),
        bundle in arb_bundle(),
        available in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (_, store) = new_store(available);
            store.set_credentials(&id, bundle.clone()).await.unwrap();
            let got = store.get_credentials(&id).await.unwrap();
            prop_assert_eq!(got, Some(bundle));
            Ok(())
        })?;
    }

    /// A fresh store over the same backend reads back what was persisted
    #[test]
    fn persisted_bundle_survives_new_store(
        id in arb_connection_id(),
        bundle in arb_bundle(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(true);
            store.set_credentials(&id, bundle.clone()).await.unwrap();

            let fresh = CredentialStore::new(
                backend as Arc<dyn SecretBackend>,
                &SecretSettings::default(),
            );
            prop_assert_eq!(fresh.get_credentials(&id).await.unwrap(), Some(bundle));
            Ok(())
        })?;
    }

    /// Removing makes the id read as absent, with or without a backend
    #[test]
    fn remove_then_get_is_none(
        id in arb_connection_id(),
        bundle in arb_bundle(),
        available in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(available);
            store.set_credentials(&id, bundle).await.unwrap();
            store.remove_credentials(&id).await.unwrap();

            prop_assert_eq!(store.get_credentials(&id).await.unwrap(), None);
            if available {
                prop_assert!(!backend.contains(&key(&id)).await);
            }
            Ok(())
        })?;
    }

    /// Storing an empty bundle is the same as removing
    #[test]
    fn empty_set_is_remove(
        id in arb_connection_id(),
        bundle in arb_bundle(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(true);
            store.set_credentials(&id, bundle).await.unwrap();
            store.set_credentials(&id, CredentialBundle::empty()).await.unwrap();

            prop_assert_eq!(store.get_credentials(&id).await.unwrap(), None);
            prop_assert!(!backend.contains(&key(&id)).await);
            Ok(())
        })?;
    }

    /// clear_all forgets every cached id and deletes written backend keys
    #[test]
    fn clear_all_forgets_everything(
        entries in proptest::collection::hash_map(arb_connection_id(), arb_bundle(), 1..8),
        available in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(available);
            for (id, bundle) in &entries {
                store.set_credentials(id, bundle.clone()).await.unwrap();
            }

            let report = store.clear_all().await;
            prop_assert_eq!(report.evicted, entries.len());

            for id in entries.keys() {
                prop_assert_eq!(store.get_credentials(id).await.unwrap(), None);
            }
            if available {
                prop_assert_eq!(report.deleted, entries.len());
                prop_assert!(backend.is_empty().await);
                prop_assert!(store.written_keys().await.is_empty());
            } else {
                // Nothing reached the backend, so there is nothing to delete
                prop_assert_eq!(report.deleted + report.skipped, 0);
            }
            Ok(())
        })?;
    }

    /// Without a backend nothing errors and nothing is persisted
    #[test]
    fn unavailable_backend_never_errors(
        id in arb_connection_id(),
        bundle in arb_bundle(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(false);
            prop_assert!(store.set_credentials(&id, bundle).await.is_ok());
            prop_assert!(store.get_credentials(&id).await.is_ok());
            prop_assert!(store.remove_credentials(&id).await.is_ok());
            prop_assert!(store.remove_credentials(&id).await.is_ok());
            prop_assert_eq!(backend.call_counts().store, 0);
            Ok(())
        })?;
    }

    /// Blank ids are rejected without touching the backend
    #[test]
    fn blank_ids_are_rejected(id in "[ \t\n]{0,5}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (backend, store) = new_store(true);
            prop_assert!(store.set_credentials(&id, CredentialBundle::with_password("p")).await.is_err());
            prop_assert!(store.get_credentials(&id).await.is_err());
            prop_assert!(store.remove_credentials(&id).await.is_err());
            prop_assert_eq!(backend.call_counts(), CallCounts::default());
            Ok(())
        })?;
    }
}

// ========== Scenarios ==========

#[test]
fn overwrite_then_remove() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(true);

        store
            .set_credentials("conn-1", CredentialBundle::with_password("p1"))
            .await
            .unwrap();
        store
            .set_credentials("conn-1", CredentialBundle::with_password("p2"))
            .await
            .unwrap();
        let got = store.get_credentials("conn-1").await.unwrap().unwrap();
        assert_eq!(got.expose_password(), Some("p2"));

        store.remove_credentials("conn-1").await.unwrap();
        assert_eq!(store.get_credentials("conn-1").await.unwrap(), None);
        assert!(!backend.contains("dbvault.connection.conn-1").await);
    });
}

#[test]
fn overwrite_replaces_all_fields() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (_, store) = new_store(true);

        store
            .set_credentials(
                "conn-1",
                CredentialBundle::with_password("p1").ssh_password("s1"),
            )
            .await
            .unwrap();
        store
            .set_credentials("conn-1", CredentialBundle::with_password("p2"))
            .await
            .unwrap();

        let got = store.get_credentials("conn-1").await.unwrap().unwrap();
        assert_eq!(got.expose_ssh_password(), None);
    });
}

#[test]
fn unavailable_backend_serves_from_cache() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(false);
        let sink = Arc::new(CollectingSink::new());
        let store = store.with_diagnostics(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

        store
            .set_credentials("conn-2", CredentialBundle::with_password("x"))
            .await
            .unwrap();
        let got = store.get_credentials("conn-2").await.unwrap().unwrap();
        assert_eq!(got.expose_password(), Some("x"));

        assert!(backend.is_empty().await);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_degraded());
    });
}

#[test]
fn preload_isolates_failures() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(true);
        for (id, password) in [("a", "pa"), ("b", "pb"), ("c", "pc")] {
            backend
                .store(
                    &key(id),
                    &SecretString::from(format!(r#"{{"password":"{password}"}}"#)),
                )
                .await
                .unwrap();
        }
        backend
            .fail_key(key("b"), SecretError::PermissionDenied("locked".to_string()))
            .await;

        let report = store.preload_credentials(["a", "b", "c", ""]).await;
        assert_eq!(report.found, 2);
        assert_eq!(report.missing, vec!["b".to_string()]);
        assert_eq!(report.invalid, vec![String::new()]);

        let a = store.get_credentials("a").await.unwrap().unwrap();
        let c = store.get_credentials("c").await.unwrap().unwrap();
        assert_eq!(a.expose_password(), Some("pa"));
        assert_eq!(c.expose_password(), Some("pc"));
        assert_eq!(backend.call_counts().retrieve, 3);
    });
}

#[test]
fn legacy_plain_password_is_read() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(true);
        backend
            .store(&key("old"), &SecretString::from("hunter2"))
            .await
            .unwrap();

        let got = store.get_credentials("old").await.unwrap().unwrap();
        assert_eq!(got.expose_password(), Some("hunter2"));
        assert!(store.has_credentials("old").await.unwrap());
    });
}

#[test]
fn removing_unknown_id_is_ok() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (_, store) = new_store(true);
        assert!(store.remove_credentials("never-stored").await.is_ok());
        assert!(!store.has_credentials("never-stored").await.unwrap());
    });
}

#[test]
fn backend_recovery_resumes_persistence() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(false);

        store
            .set_credentials("a", CredentialBundle::with_password("pa"))
            .await
            .unwrap();
        assert_eq!(store.get_credentials("b").await.unwrap(), None);
        assert!(backend.is_empty().await);

        backend.set_available(true);
        backend
            .store(&key("b"), &SecretString::from(r#"{"password":"pb"}"#))
            .await
            .unwrap();

        // Degraded misses are not cached, so the recovered backend is consulted
        let b = store.get_credentials("b").await.unwrap().unwrap();
        assert_eq!(b.expose_password(), Some("pb"));

        store
            .set_credentials("c", CredentialBundle::with_password("pc"))
            .await
            .unwrap();
        assert!(backend.contains(&key("c")).await);

        let a = store.get_credentials("a").await.unwrap().unwrap();
        assert_eq!(a.expose_password(), Some("pa"));
        assert!(!backend.contains(&key("a")).await);
    });
}

#[test]
fn clear_all_leaves_keys_that_were_only_read() {
    tokio::runtime::Runtime::new().unwrap().block_on(async {
        let (backend, store) = new_store(true);
        backend
            .store(&key("elsewhere"), &SecretString::from("legacy"))
            .await
            .unwrap();

        assert!(store.has_credentials("elsewhere").await.unwrap());
        let report = store.clear_all().await;

        assert_eq!(report.evicted, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(backend.call_counts().delete, 0);
        assert!(backend.contains(&key("elsewhere")).await);
        assert_eq!(store.get_credentials("elsewhere").await.unwrap(), None);
    });
}
