// Host Controller - Wires the bridge components to the UI thread
//
// This module contains the HostShell, the state owned by the UI thread, and the
// HostController that drives it. The shell coordinates:
// - LoginFlow (form state machine and outcome presentation)
// - SessionBridge (engine session, overlay, immersive display)
// - CommandDispatcher (engine commands → overlay widgets)
// - StateManager (presentation state and change events)
//
// It handles:
// - Host lifecycle events → component calls
// - Running the blocking engine open off the UI thread
// - Holding a termination that arrives while the open is still in flight

use crate::config::{ConfigManager, CredentialStore};
use crate::models::{
    ActionCommand, BridgeSettings, Credentials, OverlayLayout, OverlayWidgets, SavedInstanceState,
    SessionOutcome, SessionPhase,
};
use crate::services::{
    BridgeContext, ChromeFlags, CommandDispatcher, CommandSink, Dispatch, LoginFlow,
    OutcomeSender, OverlayParams, ProtocolPolicy, SessionBridge,
};
use crate::state::StateManager;
use crate::ui::bridge::{EventLoopBridge, EventLoopBridgeHandle, LoopExit};
use crate::ui::lifecycle::{HostEvent, HostEventKind, LifecycleHooks};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Where the current session is, from the UI thread's point of view
pub enum SessionSlot {
    Idle,
    /// `open` is running on a blocking worker; `early` holds a termination
    /// that arrived before it returned
    Opening { early: Option<SessionOutcome> },
    Live(SessionBridge),
}

impl SessionSlot {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Idle => SessionPhase::Idle,
            Self::Opening { .. } => SessionPhase::Opening,
            Self::Live(_) => SessionPhase::Live,
        }
    }
}

/// Everything the UI thread owns
pub struct HostShell {
    state: StateManager,
    login: LoginFlow,
    context: BridgeContext,
    layout: OverlayLayout,
    params: OverlayParams,
    policy: ProtocolPolicy,
    persistence: Option<ConfigManager>,
    ui: EventLoopBridgeHandle<HostShell>,
    slot: SessionSlot,
    dispatcher: Option<CommandDispatcher>,
    saved: Option<SavedInstanceState>,
    created: bool,
    destroyed: bool,
    exit_requested: bool,
}

impl HostShell {
    /// Create: restore saved state or pre-fill, once
    pub fn on_create(&mut self) {
        if self.created {
            tracing::debug!("Create already handled");
            return;
        }
        self.created = true;

        let restored = match &self.persistence {
            Some(config) => config.load_instance_state().unwrap_or_else(|e| {
                tracing::warn!("Could not restore instance state: {:#}", e);
                None
            }),
            None => self.saved.clone(),
        };
        self.login.start(restored);
        tracing::info!("Host created");
    }

    /// Resume or focus gained
    pub fn on_display_mode_lost(&mut self) {
        if let SessionSlot::Live(bridge) = &self.slot {
            bridge.reassert_display_mode();
        }
    }

    pub fn on_layout_settled(&mut self) {
        if let SessionSlot::Live(bridge) = &self.slot {
            bridge.on_layout_settled();
        }
    }

    pub fn on_chrome_visibility(&mut self, flags: ChromeFlags) {
        if let SessionSlot::Live(bridge) = &self.slot {
            bridge.on_chrome_visibility(flags);
        }
    }

    /// Back ends a running session normally; with no session it leaves the host.
    pub fn on_back(&mut self) {
        match self.slot {
            SessionSlot::Idle => self.exit_requested = true,
            _ => self.terminate(SessionOutcome::Success),
        }
    }

    /// Destroy removes the overlay unconditionally.
    pub fn on_destroy(&mut self) {
        tracing::info!("Host destroyed");
        self.destroyed = true;
        self.exit_requested = true;
        self.terminate(SessionOutcome::Success);
    }

    pub fn on_save_state(&mut self) {
        let saved = self.login.save_state();
        if let Some(config) = &self.persistence {
            if let Err(e) = config.save_instance_state(&saved) {
                tracing::warn!("Could not save instance state: {:#}", e);
            }
        }
        self.saved = Some(saved);
    }

    pub fn on_fields_edited(&mut self, fields: Credentials) {
        self.login.edit_fields(fields);
    }

    pub fn on_login_clicked(&mut self, credentials: Credentials) {
        if !self.created || self.destroyed {
            tracing::warn!("Login clicked outside the host's lifetime, ignoring");
            return;
        }
        match self.login.submit(credentials.clone()) {
            Ok(()) => self.launch_session(credentials),
            Err(e) => tracing::warn!("Login rejected: {}", e),
        }
    }

    pub fn on_icon_tapped(&mut self) {
        self.login.on_icon_tap();
    }

    pub fn on_quit_clicked(&mut self) {
        self.exit_requested = true;
    }

    fn launch_session(&mut self, credentials: Credentials) {
        let finishing = Arc::new(AtomicBool::new(false));
        let metrics = Arc::clone(&self.context.metrics);

        let commands = self.ui.clone();
        let sink = CommandSink::new(
            Arc::clone(&finishing),
            move |command| commands.update_ui(move |shell: &mut HostShell| shell.on_command(command)),
            Arc::clone(&metrics),
        );
        let outcomes = self.ui.clone();
        let outcome = OutcomeSender::new(move |outcome| {
            outcomes.update_ui(move |shell: &mut HostShell| shell.on_session_outcome(outcome))
        });

        self.dispatcher = Some(CommandDispatcher::new(self.policy, finishing));
        let layout = self.layout.clone();
        self.state.update(|state| {
            state.overlay = OverlayWidgets::for_layout(&layout);
            state.session = SessionPhase::Opening;
        });

        let mut bridge = SessionBridge::new(
            self.context.clone(),
            self.layout.clone(),
            self.params,
            sink,
            outcome,
        );
        self.slot = SessionSlot::Opening { early: None };

        self.ui.spawn_blocking(
            move || {
                let result = bridge.open(&credentials);
                (bridge, result, credentials)
            },
            |shell: &mut HostShell, (bridge, result, credentials)| {
                shell.on_open_completed(bridge, result, &credentials)
            },
        );
    }

    fn on_open_completed(
        &mut self,
        mut bridge: SessionBridge,
        result: Result<(), SessionOutcome>,
        credentials: &Credentials,
    ) {
        let early = match std::mem::replace(&mut self.slot, SessionSlot::Idle) {
            SessionSlot::Opening { early } => early,
            other => {
                tracing::error!("Open completed while no open was pending");
                self.slot = other;
                bridge.teardown();
                return;
            }
        };

        if bridge.engine_accepted() {
            self.login.on_session_opened(credentials);
        }

        if let Err(outcome) = result {
            // Already settled through the result channel
            tracing::debug!("Open failed: {:?}", outcome);
            return;
        }

        if let Some(outcome) = early {
            tracing::info!("Applying termination received during open");
            bridge.finish(outcome);
            return;
        }

        self.state.update(|state| {
            state.session = SessionPhase::Live;
            state.overlay_attached = true;
        });
        bridge.on_layout_settled();
        self.slot = SessionSlot::Live(bridge);
    }

    fn on_command(&mut self, command: ActionCommand) {
        if matches!(self.slot, SessionSlot::Idle) {
            tracing::debug!(code = command.code, "No session, dropping command");
            self.context.metrics.record_command_after_close();
            return;
        }
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };

        let (dispatch, _) = self.state.update_with(|state| {
            dispatcher.apply(command.code, &command.argument, &mut state.overlay)
        });

        let metrics = &self.context.metrics;
        match dispatch {
            Dispatch::Applied => metrics.record_command_applied(),
            Dispatch::Ignored => metrics.record_command_ignored(),
            Dispatch::Rejected(_) => metrics.record_command_rejected(),
            Dispatch::Query(_) => metrics.record_query(),
            Dispatch::Terminate(outcome) => {
                metrics.record_command_applied();
                self.terminate(outcome);
            }
        }
    }

    /// End the current session with `outcome`, or hold it if the open is in flight.
    fn terminate(&mut self, outcome: SessionOutcome) {
        if let SessionSlot::Opening { early } = &mut self.slot {
            if early.is_none() {
                *early = Some(outcome);
            }
            return;
        }
        match std::mem::replace(&mut self.slot, SessionSlot::Idle) {
            SessionSlot::Live(mut bridge) => {
                bridge.finish(outcome);
                self.state.set_overlay_attached(false);
            }
            _ => tracing::debug!("No session to terminate"),
        }
    }

    fn on_session_outcome(&mut self, outcome: SessionOutcome) {
        self.dispatcher = None;
        self.login.on_outcome(outcome);
    }

    /// No session and no pending submission, or the host is exiting
    pub fn is_settled(&self) -> bool {
        self.exit_requested
            || (self.created
                && !self.login.is_pending()
                && matches!(self.slot, SessionSlot::Idle))
    }

    pub fn is_live(&self) -> bool {
        matches!(self.slot, SessionSlot::Live(_))
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.slot.phase()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn saved_state(&self) -> Option<&SavedInstanceState> {
        self.saved.as_ref()
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn login(&self) -> &LoginFlow {
        &self.login
    }
}

/// Posts host events from any thread
#[derive(Clone)]
pub struct HostEventSender {
    ui: EventLoopBridgeHandle<HostShell>,
    hooks: Arc<LifecycleHooks<HostShell>>,
}

impl HostEventSender {
    pub fn emit(&self, event: HostEvent) {
        let hooks = Arc::clone(&self.hooks);
        self.ui.update_ui(move |shell| {
            hooks.dispatch(shell, &event);
        });
    }
}

/// Host controller that owns the UI thread's loop and state
///
/// # Example
/// ```ignore
/// let mut controller = HostController::new(state, context, credentials, &settings, handle);
/// controller.emit(HostEvent::Create);
/// controller.emit(HostEvent::LoginClicked(credentials));
/// controller.run_until_settled(Duration::from_secs(30));
/// ```
pub struct HostController {
    bridge: EventLoopBridge<HostShell>,
    shell: HostShell,
    hooks: Arc<LifecycleHooks<HostShell>>,
}

impl HostController {
    pub fn new(
        state: StateManager,
        context: BridgeContext,
        credentials: CredentialStore,
        settings: &BridgeSettings,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        let bridge = EventLoopBridge::new(tokio_handle, Arc::clone(&context.metrics));
        let display_settings = settings.display;
        let login = LoginFlow::new(
            state.clone(),
            credentials,
            display_settings,
            Arc::clone(&context.metrics),
        );

        let shell = HostShell {
            state,
            login,
            context,
            layout: OverlayLayout::standard(display_settings.width, display_settings.height),
            params: OverlayParams::for_display(display_settings),
            policy: ProtocolPolicy::from_strict(settings.strict_protocol),
            persistence: None,
            ui: bridge.clone_handle(),
            slot: SessionSlot::Idle,
            dispatcher: None,
            saved: None,
            created: false,
            destroyed: false,
            exit_requested: false,
        };

        tracing::info!(
            "Host controller initialized ({}x{}, {:?} protocol)",
            display_settings.width,
            display_settings.height,
            shell.policy
        );

        Self {
            bridge,
            shell,
            hooks: Arc::new(Self::standard_hooks()),
        }
    }

    /// Inflate a different overlay layout for future sessions
    pub fn with_layout(mut self, layout: OverlayLayout) -> Self {
        self.shell.layout = layout;
        self
    }

    /// Persist and restore instance state through this manager
    pub fn with_persistence(mut self, config: ConfigManager) -> Self {
        self.shell.persistence = Some(config);
        self
    }

    /// Seed the in-memory restore record used when no persistence is set
    pub fn with_saved_state(mut self, saved: SavedInstanceState) -> Self {
        self.shell.saved = Some(saved);
        self
    }

    /// Register an extra handler; it runs after the built-in one for the same event
    pub fn with_hook<F>(mut self, kind: HostEventKind, handler: F) -> Self
    where
        F: Fn(&mut HostShell, &HostEvent) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.hooks).on(kind, handler);
        self
    }

    /// Built-in routing of host events to the shell
    pub fn standard_hooks() -> LifecycleHooks<HostShell> {
        let mut hooks = LifecycleHooks::<HostShell>::new();
        hooks
            .on(HostEventKind::Create, |shell, _| shell.on_create())
            .on(HostEventKind::Resume, |shell, _| shell.on_display_mode_lost())
            .on(HostEventKind::WindowFocusChanged, |shell, event| {
                if matches!(event, HostEvent::WindowFocusChanged(true)) {
                    shell.on_display_mode_lost();
                }
            })
            .on(HostEventKind::LayoutSettled, |shell, _| {
                shell.on_layout_settled()
            })
            .on(HostEventKind::ChromeVisibilityChanged, |shell, event| {
                if let HostEvent::ChromeVisibilityChanged(flags) = event {
                    shell.on_chrome_visibility(*flags);
                }
            })
            .on(HostEventKind::BackPressed, |shell, _| shell.on_back())
            .on(HostEventKind::Destroy, |shell, _| shell.on_destroy())
            .on(HostEventKind::SaveState, |shell, _| shell.on_save_state())
            .on(HostEventKind::FieldsEdited, |shell, event| {
                if let HostEvent::FieldsEdited(fields) = event {
                    shell.on_fields_edited(fields.clone());
                }
            })
            .on(HostEventKind::LoginClicked, |shell, event| {
                if let HostEvent::LoginClicked(credentials) = event {
                    shell.on_login_clicked(credentials.clone());
                }
            })
            .on(HostEventKind::IconTapped, |shell, _| shell.on_icon_tapped())
            .on(HostEventKind::QuitClicked, |shell, _| shell.on_quit_clicked());
        hooks
    }

    /// Deliver an event on the calling (UI) thread. Returns how many handlers ran.
    pub fn emit(&mut self, event: HostEvent) -> usize {
        self.hooks.dispatch(&mut self.shell, &event)
    }

    /// Sender for posting events from other threads
    pub fn event_sender(&self) -> HostEventSender {
        HostEventSender {
            ui: self.bridge.clone_handle(),
            hooks: Arc::clone(&self.hooks),
        }
    }

    /// Run the UI loop until the login flow settles
    pub fn run_until_settled(&mut self, timeout: Duration) -> LoopExit {
        self.bridge
            .run_until(&mut self.shell, timeout, HostShell::is_settled)
    }

    /// Run the UI loop until `done` holds
    pub fn run_until<F>(&mut self, timeout: Duration, done: F) -> LoopExit
    where
        F: FnMut(&HostShell) -> bool,
    {
        self.bridge.run_until(&mut self.shell, timeout, done)
    }

    /// Run the tasks already queued
    pub fn drain(&mut self) -> usize {
        self.bridge.drain(&mut self.shell)
    }

    pub fn shell(&self) -> &HostShell {
        &self.shell
    }

    pub fn state(&self) -> &StateManager {
        &self.shell.state
    }
}
