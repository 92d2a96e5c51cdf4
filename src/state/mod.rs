// State management module
//
// This module provides the StateManager which wraps HostState with thread-safe access
// using Arc<RwLock<T>> and emits change events for renderers and observers.

use crate::models::{
    Credentials, HostState, LoginField, ProgressIndicator, Screen, SessionPhase,
};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Which progress widget changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressSlot {
    Login,
    Opening,
    Model,
    Image,
}

/// Change events emitted when state is modified
///
/// Observers subscribe instead of polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The host switched between the login form and the fatal error page
    ScreenChanged { fatal: bool },

    /// Submit control enabled/disabled
    SubmitEnabledChanged { enabled: bool },

    /// Inline login error changed
    ErrorMessageChanged { message: Option<String> },

    /// Focus moved to another login field
    FocusChanged { field: Option<LoginField> },

    /// Login field texts replaced (pre-fill or restore)
    FieldsChanged,

    /// A progress indicator changed mode, value or visibility
    ProgressChanged {
        slot: ProgressSlot,
        visible: bool,
        indeterminate: bool,
        value: i32,
    },

    /// Overlay repository title changed
    TitleChanged { title: String },

    /// One of the value displays changed
    ValueDisplayChanged { primary: bool, text: String },

    /// Session attempt moved to another phase
    SessionPhaseChanged { phase: SessionPhase },

    /// Overlay window added or removed
    OverlayAttachmentChanged { attached: bool },
}

/// Thread-safe state manager with event emission
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// # Related Types
///
/// - [`crate::models::HostState`]: The underlying state structure
/// - [`StateChange`]: Event types emitted on state mutations
/// - [`crate::ui::controller::HostController`]: Owns the UI thread that performs updates
pub struct StateManager {
    /// The host state protected by RwLock for thread-safe access
    state: Arc<RwLock<HostState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// The broadcast channel buffers 256 events per subscriber.
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(HostState::default())),
            state_tx,
        }
    }

    /// Get a cloned snapshot of the current state
    pub fn snapshot(&self) -> HostState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let fatal = state_manager.read(|state| state.is_fatal());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&HostState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Returns the events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut HostState),
    {
        self.update_with(update_fn).1
    }

    /// Like [`update()`](Self::update) but hands back the closure's result as well.
    pub fn update_with<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut HostState) -> R,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        let result = update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        (result, changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &HostState, new: &HostState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.screen != new.screen {
            changes.push(StateChange::ScreenChanged {
                fatal: matches!(new.screen, Screen::Fatal { .. }),
            });
        }

        // Login page
        if old.login.fields != new.login.fields {
            changes.push(StateChange::FieldsChanged);
        }
        if old.login.submit_enabled != new.login.submit_enabled {
            changes.push(StateChange::SubmitEnabledChanged {
                enabled: new.login.submit_enabled,
            });
        }
        if old.login.progress_visible != new.login.progress_visible {
            changes.push(StateChange::ProgressChanged {
                slot: ProgressSlot::Login,
                visible: new.login.progress_visible,
                indeterminate: true,
                value: 0,
            });
        }
        if old.login.error_message != new.login.error_message {
            changes.push(StateChange::ErrorMessageChanged {
                message: new.login.error_message.clone(),
            });
        }
        if old.login.focus != new.login.focus {
            changes.push(StateChange::FocusChanged {
                field: new.login.focus,
            });
        }

        // Overlay widgets
        let (old_o, new_o) = (&old.overlay, &new.overlay);
        if old_o.repo_title != new_o.repo_title {
            changes.push(StateChange::TitleChanged {
                title: new_o.repo_title.clone().unwrap_or_default(),
            });
        }
        for (slot, before, after) in [
            (ProgressSlot::Opening, &old_o.opening_progress, &new_o.opening_progress),
            (ProgressSlot::Model, &old_o.model_progress, &new_o.model_progress),
            (ProgressSlot::Image, &old_o.image_progress, &new_o.image_progress),
        ] {
            if before != after {
                changes.push(progress_change(slot, after.as_ref()));
            }
        }
        if old_o.primary_value != new_o.primary_value {
            changes.push(StateChange::ValueDisplayChanged {
                primary: true,
                text: new_o.primary_value.clone().unwrap_or_default(),
            });
        }
        if old_o.secondary_value != new_o.secondary_value {
            changes.push(StateChange::ValueDisplayChanged {
                primary: false,
                text: new_o.secondary_value.clone().unwrap_or_default(),
            });
        }

        if old.session != new.session {
            changes.push(StateChange::SessionPhaseChanged { phase: new.session });
        }
        if old.overlay_attached != new.overlay_attached {
            changes.push(StateChange::OverlayAttachmentChanged {
                attached: new.overlay_attached,
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Replace the login field texts
    pub fn set_login_fields(&self, fields: Credentials) -> Vec<StateChange> {
        self.update(|state| state.login.fields = fields)
    }

    /// Move the session to another phase
    pub fn set_session_phase(&self, phase: SessionPhase) -> Vec<StateChange> {
        self.update(|state| state.session = phase)
    }

    /// Record whether the overlay window is currently added
    pub fn set_overlay_attached(&self, attached: bool) -> Vec<StateChange> {
        self.update(|state| state.overlay_attached = attached)
    }
}

fn progress_change(slot: ProgressSlot, indicator: Option<&ProgressIndicator>) -> StateChange {
    let indicator = indicator.cloned().unwrap_or_default();
    StateChange::ProgressChanged {
        slot,
        visible: indicator.visible,
        indeterminate: indicator.indeterminate,
        value: indicator.value,
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Clones share the same state and channel
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
