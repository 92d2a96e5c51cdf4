//! Integration tests for LoginFlow against the YAML-backed stores
//!
//! These tests verify:
//! - Pre-fill from stored credentials and restore from saved state
//! - Outcome presentation (success, recoverable, fatal)
//! - Credentials are written only after a successful session
//! - The fatal screen survives save/restore and never rebuilds the form
//! - The diagnostic tap burst

use camino::Utf8PathBuf;
use proofread_bridge::config::{LOGIN_NAMESPACE, PreferenceStore};
use proofread_bridge::models::{
    DisplaySettings, LoginField, SavedInstanceState, Screen, SessionPhase,
};
use proofread_bridge::services::{
    LoginFlow, SubmitError, TRIGGERED_ERROR, TapVerdict, environment_snapshot, focus_for_error,
};
use proofread_bridge::{BridgeMetrics, ConfigManager, Credentials, SessionOutcome, StateManager};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn create_test_config_manager() -> (ConfigManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();
    (manager, temp_dir)
}

fn flow(config: &ConfigManager) -> (LoginFlow, StateManager, Arc<BridgeMetrics>) {
    let state = StateManager::new();
    let metrics = Arc::new(BridgeMetrics::new());
    let flow = LoginFlow::new(
        state.clone(),
        config.credential_store(),
        DisplaySettings::default(),
        Arc::clone(&metrics),
    );
    (flow, state, metrics)
}

fn credentials() -> Credentials {
    Credentials::new("alice", "secret", "alice@example.org:4433/fly")
}

fn stored_username(config: &ConfigManager) -> Option<String> {
    config
        .preference_store()
        .get(LOGIN_NAMESPACE, "u")
        .unwrap()
}

#[test]
fn test_start_prefills_from_store() {
    let (config, _temp_dir) = create_test_config_manager();
    config.credential_store().persist(&credentials()).unwrap();

    let (mut flow, state, _) = flow(&config);
    flow.start(None);

    assert_eq!(state.snapshot().login.fields, credentials());
}

#[test]
fn test_start_with_empty_store_leaves_fields_blank() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);

    flow.start(None);

    assert_eq!(state.snapshot().login.fields, Credentials::default());
    assert!(state.snapshot().login.submit_enabled);
}

#[test]
fn test_restored_fields_win_over_store() {
    let (config, _temp_dir) = create_test_config_manager();
    config.credential_store().persist(&credentials()).unwrap();
    let typed = Credentials::new("bob", "", "half-typed");

    let (mut flow, state, _) = flow(&config);
    flow.start(Some(SavedInstanceState::Login {
        fields: typed.clone(),
    }));

    assert_eq!(state.snapshot().login.fields, typed);
}

#[test]
fn test_submit_locks_form() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);

    flow.submit(credentials()).unwrap();

    let snapshot = state.snapshot();
    assert!(!snapshot.login.submit_enabled);
    assert!(snapshot.login.progress_visible);
    assert_eq!(snapshot.session, SessionPhase::Opening);
    assert!(flow.is_pending());

    assert_eq!(flow.submit(credentials()), Err(SubmitError::Pending));
}

#[test]
fn test_success_unlocks_and_persists() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();
    flow.on_session_opened(&credentials());

    flow.on_outcome(SessionOutcome::Success);

    let snapshot = state.snapshot();
    assert!(snapshot.login.submit_enabled);
    assert!(!snapshot.login.progress_visible);
    assert!(snapshot.login.error_message.is_none());
    assert_eq!(snapshot.session, SessionPhase::Closed);
    assert_eq!(stored_username(&config).as_deref(), Some("alice"));
}

#[test]
fn test_opened_session_keeps_credentials_after_engine_errors() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();

    flow.on_session_opened(&credentials());
    assert_eq!(stored_username(&config).as_deref(), Some("alice"));

    flow.on_outcome(SessionOutcome::fatal("engine crashed"));

    assert!(state.snapshot().is_fatal());
    assert_eq!(stored_username(&config).as_deref(), Some("alice"));
    let prefill = config.credential_store().prefill().unwrap();
    assert!(!prefill.is_empty());
}

#[test]
fn test_recoverable_shows_error_and_never_persists() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, metrics) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();

    flow.on_outcome(SessionOutcome::recoverable("wrong password"));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.login.error_message.as_deref(), Some("wrong password"));
    assert!(snapshot.login.submit_enabled);
    assert!(!snapshot.login.progress_visible);
    assert_eq!(snapshot.login.focus, Some(LoginField::Secret));
    assert!(!snapshot.is_fatal());
    assert_eq!(stored_username(&config), None);
    assert!(
        !config
            .preference_store()
            .namespace_path(LOGIN_NAMESPACE)
            .exists()
    );

    assert_eq!(metrics.recoverable_outcomes.load(Ordering::Relaxed), 1);
}

#[test]
fn test_retry_after_recoverable_clears_error() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();
    flow.on_outcome(SessionOutcome::recoverable("repository busy"));

    flow.submit(credentials()).unwrap();

    assert!(state.snapshot().login.error_message.is_none());
}

#[test]
fn test_fatal_outcome_replaces_screen() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();

    flow.on_outcome(SessionOutcome::fatal("engine crashed"));

    let snapshot = state.snapshot();
    match &snapshot.screen {
        Screen::Fatal {
            message,
            environment,
        } => {
            assert_eq!(message, "engine crashed");
            assert!(environment.contains(proofread_bridge::APP_NAME));
        }
        Screen::Login => panic!("expected the fatal screen"),
    }
    assert_eq!(stored_username(&config), None);
    assert_eq!(flow.submit(credentials()), Err(SubmitError::Fatal));
}

#[test]
fn test_fatal_screen_ignores_later_outcomes() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);
    flow.submit(credentials()).unwrap();
    flow.on_outcome(SessionOutcome::fatal("first"));

    flow.on_outcome(SessionOutcome::Success);
    flow.on_outcome(SessionOutcome::fatal("second"));

    assert_eq!(state.read(|s| s.fatal_message().map(str::to_string)).as_deref(), Some("first"));
    assert_eq!(stored_username(&config), None);
}

#[test]
fn test_fatal_survives_save_and_restore() {
    let (config, _temp_dir) = create_test_config_manager();
    config.credential_store().persist(&credentials()).unwrap();

    {
        let (mut flow, _, _) = flow(&config);
        flow.start(None);
        flow.submit(credentials()).unwrap();
        flow.on_outcome(SessionOutcome::fatal("engine crashed"));
        config.save_instance_state(&flow.save_state()).unwrap();
    }

    // Simulated process restart
    let restored = config.load_instance_state().unwrap();
    assert_eq!(
        restored,
        Some(SavedInstanceState::Fatal {
            message: "engine crashed".to_string()
        })
    );

    let (mut flow, state, _) = flow(&config);
    flow.start(restored);

    let snapshot = state.snapshot();
    assert_eq!(snapshot.fatal_message(), Some("engine crashed"));
    // The login form was never rebuilt, so nothing was pre-filled
    assert_eq!(snapshot.login.fields, Credentials::default());
    assert_eq!(flow.submit(credentials()), Err(SubmitError::Fatal));
    assert!(matches!(flow.save_state(), SavedInstanceState::Fatal { .. }));
}

#[test]
fn test_save_state_keeps_typed_fields() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, _, _) = flow(&config);
    flow.start(None);

    let typed = Credentials::new("carol", "pw", "");
    flow.edit_fields(typed.clone());

    assert_eq!(flow.save_state(), SavedInstanceState::Login { fields: typed });
}

#[test]
fn test_eighth_rapid_tap_triggers_fatal() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, state, _) = flow(&config);
    flow.start(None);

    for i in 0..7u64 {
        assert_eq!(flow.on_icon_tap_at(1_000 + i * 100), TapVerdict::Recorded);
        assert!(!flow.is_fatal());
    }
    assert_eq!(flow.on_icon_tap_at(1_800), TapVerdict::Fired);

    assert_eq!(state.snapshot().fatal_message(), Some(TRIGGERED_ERROR));
}

#[test]
fn test_slow_taps_never_trigger() {
    let (config, _temp_dir) = create_test_config_manager();
    let (mut flow, _, _) = flow(&config);
    flow.start(None);

    for i in 0..40u64 {
        assert_eq!(flow.on_icon_tap_at(i * 1_000), TapVerdict::Recorded);
    }
    assert!(!flow.is_fatal());
}

#[test]
fn test_focus_for_error_messages() {
    let fields = credentials();
    assert_eq!(
        focus_for_error("unknown user", &fields),
        Some(LoginField::Username)
    );
    assert_eq!(
        focus_for_error("Wrong password", &fields),
        Some(LoginField::Secret)
    );
    assert_eq!(
        focus_for_error("repository invalid", &fields),
        Some(LoginField::Repository)
    );
    assert_eq!(focus_for_error("timeout", &fields), None);

    let blank_secret = Credentials::new("alice", "", "fly");
    assert_eq!(
        focus_for_error("timeout", &blank_secret),
        Some(LoginField::Secret)
    );
}

#[test]
fn test_environment_snapshot_describes_display() {
    let text = environment_snapshot(DisplaySettings {
        width: 2400,
        height: 1080,
    });
    assert!(text.contains("2400x1080"));
    assert!(text.contains(std::env::consts::OS));
}
