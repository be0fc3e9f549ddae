//! Concurrency and timeout behaviour of the credential store

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbvault_core::config::SecretSettings;
use dbvault_core::secret::{MemoryBackend, SecretBackend};
use dbvault_core::store::{CollectingSink, CredentialStore, DiagnosticSink, StoreEventKind};
use dbvault_core::{CredentialBundle, SecretError};
use proptest::prelude::*;

fn multi_thread_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn shared_store(backend: &Arc<MemoryBackend>, timeout_ms: u64) -> Arc<CredentialStore> {
    let settings = SecretSettings {
        backend_timeout_ms: timeout_ms,
        ..Default::default()
    };
    Arc::new(CredentialStore::new(
        Arc::clone(backend) as Arc<dyn SecretBackend>,
        &settings,
    ))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every task reads back exactly what it wrote to its own id
    #[test]
    fn parallel_tasks_read_their_writes(count in 2usize..24) {
        let rt = multi_thread_runtime();
        rt.block_on(async {
            let backend = Arc::new(MemoryBackend::new());
            backend.set_latency(Some(Duration::from_millis(1))).await;
            let store = shared_store(&backend, 3000);

            let tasks: Vec<_> = (0..count)
                .map(|i| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        let id = format!("conn-{i}");
                        let password = format!("secret-{i}");
                        store
                            .set_credentials(&id, CredentialBundle::with_password(password.clone()))
                            .await
                            .unwrap();
                        let got = store.get_credentials(&id).await.unwrap().unwrap();
                        got.expose_password() == Some(password.as_str())
                    })
                })
                .collect();

            for task in tasks {
                prop_assert!(task.await.unwrap());
            }
            prop_assert_eq!(backend.len().await, count);
            Ok(())
        })?;
    }
}

#[test]
fn same_key_writers_leave_last_value() {
    let rt = multi_thread_runtime();
    rt.block_on(async {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_latency(Some(Duration::from_millis(2))).await;
        let store = shared_store(&backend, 3000);

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .set_credentials("shared", CredentialBundle::with_password(format!("v{i}")))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        // Cache and backend agree on whichever write landed last
        let cached = store.get_credentials("shared").await.unwrap().unwrap();
        let fresh = CredentialStore::new(
            Arc::clone(&backend) as Arc<dyn SecretBackend>,
            &SecretSettings::default(),
        );
        let persisted = fresh.get_credentials("shared").await.unwrap().unwrap();
        assert_eq!(cached, persisted);
    });
}

#[test]
fn concurrent_readers_share_one_backend_read() {
    let rt = multi_thread_runtime();
    rt.block_on(async {
        let backend = Arc::new(MemoryBackend::new());
        let seed = shared_store(&backend, 3000);
        seed.set_credentials("hot", CredentialBundle::with_password("p"))
            .await
            .unwrap();

        backend.set_latency(Some(Duration::from_millis(20))).await;
        let store = shared_store(&backend, 3000);

        let readers: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_credentials("hot").await.unwrap() })
            })
            .collect();
        for reader in readers {
            assert!(reader.await.unwrap().is_some());
        }

        assert_eq!(backend.call_counts().retrieve, 1);
    });
}

#[test]
fn slow_backend_does_not_hang_callers() {
    let rt = multi_thread_runtime();
    rt.block_on(async {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_latency(Some(Duration::from_secs(10))).await;
        let sink = Arc::new(CollectingSink::new());
        let store = CredentialStore::new(
            Arc::clone(&backend) as Arc<dyn SecretBackend>,
            &SecretSettings {
                backend_timeout_ms: 50,
                ..Default::default()
            },
        )
        .with_diagnostics(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

        let started = Instant::now();
        store
            .set_credentials("slow", CredentialBundle::with_password("p"))
            .await
            .unwrap();
        let got = store.get_credentials("slow").await.unwrap();
        store.remove_credentials("slow").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(got, Some(CredentialBundle::with_password("p")));
        assert_eq!(store.get_credentials("slow").await.unwrap(), None);

        let timeouts = sink
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    StoreEventKind::BackendFailure {
                        error: SecretError::Timeout { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(timeouts, 2);
    });
}

#[test]
fn hanging_availability_check_degrades_to_cache() {
    let rt = multi_thread_runtime();
    rt.block_on(async {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_probe_latency(Some(Duration::from_secs(5))).await;
        let sink = Arc::new(CollectingSink::new());
        let store = CredentialStore::new(
            Arc::clone(&backend) as Arc<dyn SecretBackend>,
            &SecretSettings {
                backend_timeout_ms: 50,
                ..Default::default()
            },
        )
        .with_diagnostics(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

        let started = Instant::now();
        store
            .set_credentials("stuck", CredentialBundle::with_password("p"))
            .await
            .unwrap();
        let got = store.get_credentials("stuck").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        assert_eq!(got, Some(CredentialBundle::with_password("p")));
        assert_eq!(backend.call_counts().store, 0);
        assert!(backend.is_empty().await);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_degraded());
    });
}

#[test]
fn preload_limits_lookups_in_flight() {
    let rt = multi_thread_runtime();
    rt.block_on(async {
        let backend = Arc::new(MemoryBackend::new());
        let ids: Vec<String> = (0..32).map(|i| format!("conn-{i}")).collect();
        for id in &ids {
            backend
                .store(
                    &format!("dbvault.connection.{id}"),
                    &secrecy::SecretString::from(r#"{"password":"p"}"#),
                )
                .await
                .unwrap();
        }
        backend.set_latency(Some(Duration::from_millis(30))).await;
        let store = shared_store(&backend, 3000);

        let report = store.preload_credentials(&ids).await;

        assert_eq!(report.found, ids.len());
        assert!(report.missing.is_empty());
        assert_eq!(backend.call_counts().retrieve, ids.len());
        assert!(backend.peak_concurrency() > 1);
        assert!(backend.peak_concurrency() <= 8);
    });
}
