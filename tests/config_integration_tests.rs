//! Integration tests for ConfigManager and the files it owns
//!
//! These tests verify:
//! - Settings loading, saving and defaults
//! - Environment overrides on top of the YAML file
//! - Credential preferences round trip through the YAML store
//! - The save/restore record

use camino::Utf8PathBuf;
use proofread_bridge::config::{KEY_REPOSITORY, KEY_SECRET, KEY_USERNAME, LOGIN_NAMESPACE};
use proofread_bridge::config::{PreferenceStore, YamlPreferenceStore};
use proofread_bridge::models::SavedInstanceState;
use proofread_bridge::{BridgeSettings, ConfigManager, Credentials};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join("bridge.yaml"));
}

#[test]
fn test_create_config_manager_makes_missing_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("nested").join("data");

    let manager = ConfigManager::new(&nested).unwrap();
    assert!(manager.config_dir().exists());
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Settings file doesn't exist, should return defaults
    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.display.width, 1920);
    assert_eq!(settings.display.height, 1080);
    assert_eq!(settings.logging.dir, "logs");
    assert!(settings.metrics_summary_on_exit);
}

#[test]
fn test_save_and_reload_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = BridgeSettings::default();
    settings.display.width = 1024;
    settings.display.height = 768;
    settings.strict_protocol = true;
    settings.logging.debug_mode = true;
    manager.save_settings(&settings).unwrap();

    assert!(manager.settings_path().exists());

    let reloaded = manager.load_settings().unwrap();
    assert_eq!(reloaded.display.width, 1024);
    assert_eq!(reloaded.display.height, 768);
    assert!(reloaded.strict_protocol);
    assert!(reloaded.logging.debug_mode);
}

#[test]
fn test_partial_settings_file_keeps_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "display:\n  width: 640\nmetrics_summary_on_exit: false\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.display.width, 640);
    assert_eq!(settings.display.height, 1080);
    assert!(!settings.metrics_summary_on_exit);
    assert_eq!(settings.logging.prefix, "proofread-bridge");
}

#[test]
fn test_malformed_settings_file_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "display: [unclosed\n").unwrap();

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "logging:\n  prefix: from-file\n").unwrap();

    // Only this test touches the logging prefix, so the variable cannot race
    // with other tests in this binary.
    unsafe { std::env::set_var("PROOFREAD__LOGGING__PREFIX", "from-env") };
    let settings = manager.load_settings();
    unsafe { std::env::remove_var("PROOFREAD__LOGGING__PREFIX") };

    assert_eq!(settings.unwrap().logging.prefix, "from-env");
}

#[test]
fn test_credentials_round_trip_through_yaml_store() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let store = manager.credential_store();
    assert!(store.prefill().unwrap().is_empty());

    store
        .persist(&Credentials::new("alice", "s3cret", "alice@host:1/fly"))
        .unwrap();

    // A fresh manager over the same directory sees the same values
    let reopened = ConfigManager::new(&config_path).unwrap();
    let prefill = reopened.credential_store().prefill().unwrap();

    let mut fields = Credentials::default();
    prefill.apply_to(&mut fields);
    assert_eq!(fields, Credentials::new("alice", "s3cret", "alice@host:1/fly"));
}

#[test]
fn test_preference_file_uses_short_keys() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    manager
        .credential_store()
        .persist(&Credentials::new("bob", "pw", "fly"))
        .unwrap();

    let store: YamlPreferenceStore = manager.preference_store();
    let path = store.namespace_path(LOGIN_NAMESPACE);
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("u: bob"), "unexpected file: {}", contents);

    assert_eq!(store.get(LOGIN_NAMESPACE, KEY_USERNAME).unwrap().as_deref(), Some("bob"));
    assert_eq!(store.get(LOGIN_NAMESPACE, KEY_SECRET).unwrap().as_deref(), Some("pw"));
    assert_eq!(store.get(LOGIN_NAMESPACE, KEY_REPOSITORY).unwrap().as_deref(), Some("fly"));
}

#[test]
fn test_partial_preferences_prefill_only_present_fields() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let store = manager.preference_store();
    store
        .put(LOGIN_NAMESPACE, &[(KEY_REPOSITORY, "saved/repo")])
        .unwrap();

    let mut fields = Credentials::new("typed", "", "");
    manager.credential_store().prefill().unwrap().apply_to(&mut fields);
    assert_eq!(fields.username, "typed");
    assert_eq!(fields.repository, "saved/repo");
}

#[test]
fn test_instance_state_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.load_instance_state().unwrap(), None);

    let fatal = SavedInstanceState::Fatal {
        message: "engine crashed".to_string(),
    };
    manager.save_instance_state(&fatal).unwrap();
    assert_eq!(manager.load_instance_state().unwrap(), Some(fatal));

    manager.clear_instance_state().unwrap();
    assert_eq!(manager.load_instance_state().unwrap(), None);

    // Clearing twice is fine
    manager.clear_instance_state().unwrap();
}

#[test]
fn test_corrupt_instance_state_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    manager
        .save_instance_state(&SavedInstanceState::Login {
            fields: Credentials::default(),
        })
        .unwrap();
    fs::write(config_path.join("instance_state.yaml"), "kind: nonsense\n").unwrap();

    assert!(manager.load_instance_state().is_err());
}
