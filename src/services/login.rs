use crate::config::CredentialStore;
use crate::metrics::BridgeMetrics;
use crate::models::{
    Credentials, DisplaySettings, LoginField, SavedInstanceState, Screen, SessionOutcome,
    SessionPhase,
};
use crate::services::diagnostic::{DiagnosticTrigger, TRIGGERED_ERROR, TapVerdict};
use crate::state::StateManager;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("A submission is already pending")]
    Pending,

    #[error("The fatal error screen is showing")]
    Fatal,
}

/// Login form logic: collects credentials, hands them to a session and
/// presents the session's outcome.
///
/// All presentation goes through the [`StateManager`]; the flow itself only
/// remembers the credentials of the submission in flight.
pub struct LoginFlow {
    state: StateManager,
    credentials: CredentialStore,
    trigger: DiagnosticTrigger,
    display: DisplaySettings,
    metrics: Arc<BridgeMetrics>,
    pending: Option<Credentials>,
}

impl LoginFlow {
    pub fn new(
        state: StateManager,
        credentials: CredentialStore,
        display: DisplaySettings,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            state,
            credentials,
            trigger: DiagnosticTrigger::new(),
            display,
            metrics,
            pending: None,
        }
    }

    /// Bring the form up, restoring saved state or pre-filling from the store.
    pub fn start(&mut self, saved: Option<SavedInstanceState>) {
        match saved {
            Some(SavedInstanceState::Fatal { message }) => {
                tracing::info!("Restoring fatal error screen");
                self.show_fatal(message);
            }
            Some(SavedInstanceState::Login { fields }) => {
                tracing::debug!("Restoring login fields");
                self.state.set_login_fields(fields);
            }
            None => match self.credentials.prefill() {
                Ok(prefill) if !prefill.is_empty() => {
                    tracing::debug!("Pre-filling login fields from the credential store");
                    self.state
                        .update(|state| prefill.apply_to(&mut state.login.fields));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not read stored credentials: {}", e),
            },
        }
    }

    /// Field edits from the form.
    pub fn edit_fields(&self, fields: Credentials) {
        self.state.set_login_fields(fields);
    }

    /// Lock the form and record the submission. The caller launches the session.
    pub fn submit(&mut self, credentials: Credentials) -> Result<(), SubmitError> {
        if self.state.read(|state| state.is_fatal()) {
            return Err(SubmitError::Fatal);
        }
        if self.pending.is_some() || !self.state.read(|state| state.login.submit_enabled) {
            return Err(SubmitError::Pending);
        }

        self.state.update(|state| {
            state.login.submit_enabled = false;
            state.login.progress_visible = true;
            state.login.error_message = None;
            state.login.fields = credentials.clone();
            state.session = SessionPhase::Opening;
        });
        tracing::info!("Login submitted for {:?}", credentials.username);
        self.pending = Some(credentials);
        Ok(())
    }

    /// The engine accepted the credentials: remember them for the next start.
    pub fn on_session_opened(&self, credentials: &Credentials) {
        match self.credentials.persist(credentials) {
            Ok(()) => tracing::debug!("Stored credentials for {:?}", credentials.username),
            Err(e) => tracing::warn!("Failed to store credentials: {}", e),
        }
    }

    /// Present the outcome of the submitted session.
    pub fn on_outcome(&mut self, outcome: SessionOutcome) {
        self.pending = None;

        if self.state.read(|state| state.is_fatal()) {
            tracing::debug!("Fatal screen showing, ignoring outcome {:?}", outcome);
            return;
        }

        match outcome {
            SessionOutcome::Success => {
                tracing::info!("Session ended normally");
                self.unlock(None);
            }
            SessionOutcome::RecoverableError { message } => {
                tracing::info!("Session failed: {}", message);
                self.metrics.record_recoverable();
                // Recoverable carries on into the normal-end effects
                self.unlock(Some(message));
            }
            SessionOutcome::FatalError { message } => {
                tracing::error!("Session failed fatally: {}", message);
                self.metrics.record_fatal();
                self.show_fatal(message);
            }
        }
    }

    /// Icon tap from the login screen.
    pub fn on_icon_tap(&mut self) -> TapVerdict {
        let verdict = self.trigger.on_tap();
        self.after_tap(verdict)
    }

    /// Icon tap at an explicit uptime in milliseconds.
    pub fn on_icon_tap_at(&mut self, t: u64) -> TapVerdict {
        let verdict = self.trigger.on_tap_at(t);
        self.after_tap(verdict)
    }

    fn after_tap(&mut self, verdict: TapVerdict) -> TapVerdict {
        if verdict == TapVerdict::Fired {
            self.metrics.record_fatal();
            self.show_fatal(TRIGGERED_ERROR.to_string());
        }
        verdict
    }

    /// Record for process save/restore. A fatal message is the only thing kept.
    pub fn save_state(&self) -> SavedInstanceState {
        self.state.read(|state| match state.fatal_message() {
            Some(message) => SavedInstanceState::Fatal {
                message: message.to_string(),
            },
            None => SavedInstanceState::Login {
                fields: state.login.fields.clone(),
            },
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_fatal(&self) -> bool {
        self.state.read(|state| state.is_fatal())
    }

    fn unlock(&self, error: Option<String>) {
        self.state.update(|state| {
            let focus = error
                .as_deref()
                .map(|message| focus_for_error(message, &state.login.fields));
            state.login.progress_visible = false;
            state.login.submit_enabled = true;
            if let Some(Some(field)) = focus {
                state.login.focus = Some(field);
            }
            state.login.error_message = error;
            state.session = SessionPhase::Closed;
        });
    }

    fn show_fatal(&mut self, message: String) {
        if self.state.read(|state| state.is_fatal()) {
            return;
        }
        let environment = environment_snapshot(self.display);
        self.state.update(|state| {
            state.screen = Screen::Fatal {
                message,
                environment,
            };
            state.login.progress_visible = false;
            state.session = SessionPhase::Closed;
        });
    }
}

/// Field most likely at fault for an inline error message.
pub fn focus_for_error(message: &str, fields: &Credentials) -> Option<LoginField> {
    let lower = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(&["user"]) {
        return Some(LoginField::Username);
    }
    if mentions(&["password", "secret", "credential"]) {
        return Some(LoginField::Secret);
    }
    if mentions(&["repository", "repo", "locator", "host", "port", "group"]) {
        return Some(LoginField::Repository);
    }

    [
        (LoginField::Username, &fields.username),
        (LoginField::Secret, &fields.secret),
        (LoginField::Repository, &fields.repository),
    ]
    .into_iter()
    .find(|(_, text)| text.is_empty())
    .map(|(field, _)| field)
}

/// Text shown under a fatal error describing the host configuration.
pub fn environment_snapshot(display: DisplaySettings) -> String {
    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "{} {}\nos: {} ({})\ndisplay: {}x{}\nlocale: {}",
        crate::APP_NAME,
        crate::VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH,
        display.width,
        display.height,
        locale
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryPreferenceStore;

    fn flow() -> (LoginFlow, StateManager, MemoryPreferenceStore) {
        let state = StateManager::new();
        let prefs = MemoryPreferenceStore::new();
        let flow = LoginFlow::new(
            state.clone(),
            CredentialStore::new(Arc::new(prefs.clone())),
            DisplaySettings::default(),
            Arc::new(BridgeMetrics::new()),
        );
        (flow, state, prefs)
    }

    #[test]
    fn test_submit_locks_form() {
        let (mut flow, state, _) = flow();
        state.update(|s| s.login.error_message = Some("old".into()));

        flow.submit(Credentials::new("u", "p", "r")).unwrap();

        let snapshot = state.snapshot();
        assert!(!snapshot.login.submit_enabled);
        assert!(snapshot.login.progress_visible);
        assert!(snapshot.login.error_message.is_none());
        assert_eq!(flow.submit(Credentials::default()), Err(SubmitError::Pending));
    }

    #[test]
    fn test_session_opened_persists_credentials() {
        let (mut flow, state, prefs) = flow();
        let credentials = Credentials::new("alice", "pw", "h:1/fly");
        flow.submit(credentials.clone()).unwrap();
        flow.on_session_opened(&credentials);
        assert_eq!(prefs.namespace("login").get("u").map(String::as_str), Some("alice"));

        flow.on_outcome(SessionOutcome::Success);

        let snapshot = state.snapshot();
        assert!(snapshot.login.submit_enabled);
        assert!(!snapshot.login.progress_visible);
    }

    #[test]
    fn test_outcome_alone_never_persists() {
        let (mut flow, _, prefs) = flow();
        flow.submit(Credentials::new("alice", "pw", "h:1/fly")).unwrap();
        flow.on_outcome(SessionOutcome::Success);

        assert!(prefs.namespace("login").is_empty());
    }

    #[test]
    fn test_recoverable_shows_error_without_persisting() {
        let (mut flow, state, prefs) = flow();
        flow.submit(Credentials::new("alice", "pw", "bad locator")).unwrap();
        flow.on_outcome(SessionOutcome::recoverable("repository invalid"));

        let snapshot = state.snapshot();
        assert!(snapshot.login.submit_enabled);
        assert!(!snapshot.login.progress_visible);
        assert_eq!(
            snapshot.login.error_message.as_deref(),
            Some("repository invalid")
        );
        assert_eq!(snapshot.login.focus, Some(LoginField::Repository));
        assert!(prefs.namespace("login").is_empty());
    }

    #[test]
    fn test_fatal_is_sticky() {
        let (mut flow, state, _) = flow();
        flow.submit(Credentials::default()).unwrap();
        flow.on_outcome(SessionOutcome::fatal("engine crashed"));

        assert_eq!(state.snapshot().fatal_message(), Some("engine crashed"));
        assert_eq!(flow.submit(Credentials::default()), Err(SubmitError::Fatal));
        assert_eq!(
            flow.save_state(),
            SavedInstanceState::Fatal {
                message: "engine crashed".into()
            }
        );
    }

    #[test]
    fn test_focus_policy() {
        let empty = Credentials::default();
        let full = Credentials::new("u", "p", "r");
        assert_eq!(
            focus_for_error("User name required", &full),
            Some(LoginField::Username)
        );
        assert_eq!(
            focus_for_error("wrong password", &full),
            Some(LoginField::Secret)
        );
        assert_eq!(
            focus_for_error("invalid PORT", &full),
            Some(LoginField::Repository)
        );
        assert_eq!(
            focus_for_error("timeout", &Credentials::new("u", "", "")),
            Some(LoginField::Secret)
        );
        assert_eq!(focus_for_error("timeout", &empty), Some(LoginField::Username));
        assert_eq!(focus_for_error("timeout", &full), None);
    }

    #[test]
    fn test_icon_burst_shows_triggered_error() {
        let (mut flow, state, _) = flow();
        for i in 0..7 {
            assert_eq!(flow.on_icon_tap_at(i * 10), TapVerdict::Recorded);
        }
        assert_eq!(flow.on_icon_tap_at(80), TapVerdict::Fired);
        assert_eq!(state.snapshot().fatal_message(), Some(TRIGGERED_ERROR));
    }

    #[test]
    fn test_environment_snapshot() {
        let text = environment_snapshot(DisplaySettings {
            width: 640,
            height: 480,
        });
        assert!(text.contains(crate::APP_NAME));
        assert!(text.contains("640x480"));
        assert!(text.contains(std::env::consts::OS));
    }
}
