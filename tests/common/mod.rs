//! Shared fixtures for the integration tests: a scriptable engine and a host harness.

#![allow(dead_code)]

use proofread_bridge::BridgeMetrics;
use proofread_bridge::config::{CredentialStore, MemoryPreferenceStore};
use proofread_bridge::models::{ActionCommand, BridgeSettings, Credentials, OverlayLayout};
use proofread_bridge::services::{
    BridgeContext, CommandSink, Engine, EngineRejection, HeadlessChrome, HeadlessWindowManager,
};
use proofread_bridge::ui::HostController;
use proofread_bridge::StateManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

/// Engine that accepts or rejects every open and can emit commands from inside `open`.
#[derive(Default)]
pub struct ScriptedEngine {
    sink: Mutex<Option<CommandSink>>,
    rejection: Option<String>,
    during_open: Vec<ActionCommand>,
    geometry: Mutex<Vec<Vec<i32>>>,
    opens: AtomicUsize,
}

impl ScriptedEngine {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            rejection: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Commands sent through the sink before `open` returns
    pub fn with_commands_during_open(mut self, commands: Vec<ActionCommand>) -> Self {
        self.during_open = commands;
        self
    }

    pub fn sink(&self) -> CommandSink {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("engine was never attached")
    }

    pub fn geometry_reports(&self) -> Vec<Vec<i32>> {
        self.geometry.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Engine for ScriptedEngine {
    fn attach(&self, sink: CommandSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn open(&self, _credentials: &Credentials) -> Result<(), EngineRejection> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.rejection {
            return Err(EngineRejection::new(message.clone()));
        }
        let sink = self.sink();
        for command in &self.during_open {
            sink.apply(command.code, &command.argument);
        }
        Ok(())
    }

    fn report_geometry(&self, records: &[i32]) {
        self.geometry.lock().unwrap().push(records.to_vec());
    }
}

/// A host controller over a [`ScriptedEngine`] and the headless window layer.
pub struct Harness {
    pub controller: HostController,
    pub engine: Arc<ScriptedEngine>,
    pub windows: Arc<HeadlessWindowManager>,
    pub chrome: Arc<HeadlessChrome>,
    pub metrics: Arc<BridgeMetrics>,
    pub prefs: MemoryPreferenceStore,
    pub state: StateManager,
    pub runtime: tokio::runtime::Runtime,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::with_layout(engine, None)
    }

    pub fn with_layout(engine: ScriptedEngine, layout: Option<OverlayLayout>) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let engine = Arc::new(engine);
        let windows = Arc::new(HeadlessWindowManager::new());
        let chrome = Arc::new(HeadlessChrome::new());
        let metrics = Arc::new(BridgeMetrics::new());
        let prefs = MemoryPreferenceStore::new();
        let state = StateManager::new();

        let context = BridgeContext {
            engine: engine.clone(),
            windows: windows.clone(),
            chrome: chrome.clone(),
            metrics: Arc::clone(&metrics),
        };
        let settings = BridgeSettings {
            strict_protocol: false,
            ..BridgeSettings::default()
        };
        let mut controller = HostController::new(
            state.clone(),
            context,
            CredentialStore::new(Arc::new(prefs.clone())),
            &settings,
            runtime.handle().clone(),
        );
        if let Some(layout) = layout {
            controller = controller.with_layout(layout);
        }

        Self {
            controller,
            engine,
            windows,
            chrome,
            metrics,
            prefs,
            state,
            runtime,
        }
    }

    /// Rebuild the controller, e.g. to register extra hooks.
    pub fn map_controller<F>(mut self, f: F) -> Self
    where
        F: FnOnce(HostController) -> HostController,
    {
        self.controller = f(self.controller);
        self
    }

    /// Create the host, submit and wait for the session to go live.
    pub fn open_live_session(&mut self) {
        use proofread_bridge::ui::{HostEvent, LoopExit};

        self.controller.emit(HostEvent::Create);
        self.controller.emit(HostEvent::LoginClicked(Credentials::new(
            "alice",
            "secret",
            "alice@example.org:4433/fly",
        )));
        let exit = self.controller.run_until(WAIT, |shell| shell.is_live());
        assert_eq!(exit, LoopExit::Settled, "session never went live");
    }
}
