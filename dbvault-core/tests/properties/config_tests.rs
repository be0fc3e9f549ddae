//! Property-based tests for settings persistence

use dbvault_core::config::{
    AppSettings, ConfigManager, LoggingSettings, SecretBackendType, SecretSettings,
};
use proptest::prelude::*;

fn arb_backend() -> impl Strategy<Value = SecretBackendType> {
    prop_oneof![
        Just(SecretBackendType::LibSecret),
        Just(SecretBackendType::Keyring),
        Just(SecretBackendType::Memory),
        Just(SecretBackendType::None),
    ]
}

fn arb_settings() -> impl Strategy<Value = AppSettings> {
    (
        arb_backend(),
        "[a-z][a-z0-9-]{0,15}",
        "[a-z.]{0,20}",
        1u64..=60_000,
        prop_oneof![Just("error"), Just("warn"), Just("info"), Just("debug")],
    )
        .prop_map(|(backend, service_name, key_prefix, timeout, level)| AppSettings {
            secrets: SecretSettings {
                backend,
                service_name,
                key_prefix,
                backend_timeout_ms: timeout,
            },
            logging: LoggingSettings {
                level: level.to_string(),
            },
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Saved settings load back unchanged
    #[test]
    fn settings_survive_save_and_load(settings in arb_settings()) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().join("nested"));

        manager.save_settings(&settings).unwrap();
        prop_assert_eq!(manager.load_settings().unwrap(), settings);
    }
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_config_dir(dir.path());
    assert_eq!(manager.load_settings().unwrap(), AppSettings::default());
}

#[test]
fn invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_config_dir(dir.path());
    std::fs::write(
        manager.settings_path(),
        "[secrets]\nbackend_timeout_ms = 0\n",
    )
    .unwrap();
    assert!(manager.load_settings().is_err());
}
