//! Proofread Bridge - headless host for the bridge protocol
//!
//! Main entry point for the binary.
//!
//! # Overview
//!
//! Runs one complete login → session → teardown cycle against the in-process
//! loopback engine and the headless window layer. It initializes:
//! - Configuration loading ([`ConfigManager`]) with `PROOFREAD__*` overrides
//! - Logging infrastructure (file rotation + console output)
//! - Tokio runtime (blocking pool for the engine open call)
//! - State management ([`StateManager`])
//! - Host controller ([`HostController`] - the UI thread)
//!
//! # Execution Flow
//!
//! 1. Load settings from `Proofread Data/bridge.yaml`
//! 2. Initialize logging → logs/proofread-bridge.<date>
//! 3. Create tokio runtime
//! 4. Create the host controller and emit Create (restores or pre-fills the form)
//! 5. Submit the form's credentials (or the `PROOFREAD_REPOSITORY` locator)
//! 6. Once the engine's script is done, press Back to end the session
//! 7. Run the UI loop until the login flow settles, save state, destroy
//! 8. Shut the runtime down and log the metrics summary

use anyhow::Result;
use proofread_bridge::models::{Credentials, SessionPhase};
use proofread_bridge::services::{
    BridgeContext, HeadlessChrome, HeadlessWindowManager, LoopbackEngine,
};
use proofread_bridge::ui::{HostController, HostEvent, LoopExit};
use proofread_bridge::{APP_NAME, BridgeMetrics, ConfigManager, StateManager, VERSION};
use std::sync::Arc;
use std::time::Duration;

const CONFIG_DIR: &str = "Proofread Data";

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let settings = config_manager.load_settings()?;

    // Setup logging with both file and console output
    let _log_guard = proofread_bridge::logging::setup_from_settings(&settings.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("proofread-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let data_manager = if settings.data_dir == CONFIG_DIR {
        config_manager
    } else {
        ConfigManager::new(&settings.data_dir)?
    };

    let state_manager = StateManager::new();
    let metrics = Arc::new(BridgeMetrics::new());
    let engine = Arc::new(LoopbackEngine::new());

    let context = BridgeContext {
        engine: engine.clone(),
        windows: Arc::new(HeadlessWindowManager::new()),
        chrome: Arc::new(HeadlessChrome::new()),
        metrics: Arc::clone(&metrics),
    };

    let mut controller = HostController::new(
        state_manager.clone(),
        context,
        data_manager.credential_store(),
        &settings,
        runtime.handle().clone(),
    )
    .with_persistence(data_manager);

    controller.emit(HostEvent::Create);

    if let Some(message) = state_manager.read(|s| s.fatal_message().map(str::to_string)) {
        tracing::error!("Fatal error from a previous run: {}", message);
    } else {
        let mut credentials = state_manager.read(|s| s.login.fields.clone());
        if let Ok(repository) = std::env::var("PROOFREAD_REPOSITORY") {
            credentials.repository = repository;
        }
        if credentials == Credentials::default() {
            credentials = Credentials::new(whoami(), "", "local/demo");
        }
        controller.emit(HostEvent::LoginClicked(credentials));

        // Press Back once the engine has gone quiet
        let events = controller.event_sender();
        let watcher_engine = Arc::clone(&engine);
        let watcher_state = state_manager.clone();
        std::thread::Builder::new()
            .name("back-presser".into())
            .spawn(move || {
                // The script thread exists once the open has returned
                while watcher_state.read(|s| s.session == SessionPhase::Opening) {
                    std::thread::sleep(Duration::from_millis(10));
                }
                let sent = watcher_engine.wait_idle();
                tracing::info!("Engine script finished after {} commands", sent);
                events.emit(HostEvent::BackPressed);
            })?;

        match controller.run_until_settled(Duration::from_secs(60)) {
            LoopExit::Settled => tracing::info!("Login flow settled"),
            LoopExit::TimedOut => tracing::warn!("Login flow did not settle in time"),
        }
    }

    let snapshot = state_manager.snapshot();
    if let Some(error) = &snapshot.login.error_message {
        tracing::warn!("Session ended with error: {}", error);
    }
    if snapshot.session == SessionPhase::Closed && !snapshot.is_fatal() {
        tracing::info!("Session closed normally");
    }

    controller.emit(HostEvent::SaveState);
    controller.emit(HostEvent::Destroy);
    controller.drain();

    runtime.shutdown_timeout(Duration::from_secs(5));

    if settings.metrics_summary_on_exit {
        metrics.log_summary();
    }

    tracing::info!("Application shutdown complete");
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "proofreader".to_string())
}
