use crate::metrics::BridgeMetrics;
use crate::models::{Credentials, GeometryBatch, OverlayLayout, SessionOutcome};
use crate::services::engine::{CommandSink, Engine};
use crate::services::geometry::GeometryReporter;
use crate::services::overlay::{
    ChromeFlags, DisplayModeWatchdog, OverlayGuard, OverlayParams, SystemChrome, WindowManager,
};
use std::fmt;
use std::sync::Arc;

type OutcomeCallback = Box<dyn FnOnce(SessionOutcome) + Send>;

/// Sending half of the result channel. Delivers at most one outcome.
pub struct OutcomeSender {
    callback: Option<OutcomeCallback>,
}

impl OutcomeSender {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(SessionOutcome) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Deliver the outcome. Returns false if one was already delivered.
    pub fn send(&mut self, outcome: SessionOutcome) -> bool {
        match self.callback.take() {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => {
                tracing::debug!("Session outcome already settled, dropping {:?}", outcome);
                false
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        self.callback.is_none()
    }
}

impl fmt::Debug for OutcomeSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeSender")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Shared platform handles every session is built from.
#[derive(Clone)]
pub struct BridgeContext {
    pub engine: Arc<dyn Engine>,
    pub windows: Arc<dyn WindowManager>,
    pub chrome: Arc<dyn SystemChrome>,
    pub metrics: Arc<BridgeMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgePhase {
    Created,
    Live,
    TornDown,
}

/// Lifecycle of one engine session.
///
/// Opens the session, owns the overlay window while it is live, keeps the
/// display immersive, reports control geometry and settles the session's
/// outcome exactly once.
pub struct SessionBridge {
    engine: Arc<dyn Engine>,
    windows: Arc<dyn WindowManager>,
    watchdog: DisplayModeWatchdog,
    reporter: GeometryReporter,
    metrics: Arc<BridgeMetrics>,
    layout: OverlayLayout,
    params: OverlayParams,
    sink: CommandSink,
    overlay: Option<OverlayGuard>,
    outcome: OutcomeSender,
    phase: BridgePhase,
    accepted: bool,
}

impl SessionBridge {
    pub fn new(
        context: BridgeContext,
        layout: OverlayLayout,
        params: OverlayParams,
        sink: CommandSink,
        outcome: OutcomeSender,
    ) -> Self {
        Self {
            watchdog: DisplayModeWatchdog::new(context.chrome),
            reporter: GeometryReporter::new(Arc::clone(&context.engine), Arc::clone(&context.metrics)),
            engine: context.engine,
            windows: context.windows,
            metrics: context.metrics,
            layout,
            params,
            sink,
            overlay: None,
            outcome,
            phase: BridgePhase::Created,
            accepted: false,
        }
    }

    /// Open the engine session and, on success, put up the overlay.
    ///
    /// Blocks for as long as the engine does. A rejected open settles the
    /// outcome and also returns it; a successful one returns `Ok` and the
    /// outcome is settled later by [`finish`](Self::finish).
    pub fn open(&mut self, credentials: &Credentials) -> Result<(), SessionOutcome> {
        if self.phase != BridgePhase::Created {
            tracing::warn!("Session already opened, ignoring second open");
            return Err(SessionOutcome::recoverable("session already opened"));
        }

        self.engine.attach(self.sink.clone());

        tracing::info!(
            "Opening session for {:?} on {:?}",
            credentials.username,
            credentials.repository
        );
        match self.engine.open(credentials) {
            Err(rejection) if !rejection.message.is_empty() => {
                tracing::info!("Engine rejected session: {}", rejection);
                let outcome = SessionOutcome::recoverable(rejection.message);
                self.finish(outcome.clone());
                return Err(outcome);
            }
            Err(_) => tracing::debug!("Engine returned an empty rejection, treating as success"),
            Ok(()) => {}
        }
        self.accepted = true;
        self.metrics.record_session_opened();

        match OverlayGuard::attach(Arc::clone(&self.windows), &self.params, self.layout.clone()) {
            Ok(guard) => self.overlay = Some(guard),
            Err(e) => {
                tracing::error!("Failed to add overlay window: {}", e);
                let outcome = SessionOutcome::fatal(e.to_string());
                self.finish(outcome.clone());
                return Err(outcome);
            }
        }

        self.watchdog.reassert();
        self.phase = BridgePhase::Live;
        tracing::info!("Session live");
        Ok(())
    }

    /// Tear the session down and settle its outcome.
    pub fn finish(&mut self, outcome: SessionOutcome) {
        self.teardown();
        self.outcome.send(outcome);
    }

    /// Remove the overlay, then close the command sink. Returns false when
    /// the session was already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.phase == BridgePhase::TornDown {
            return false;
        }
        self.sink.mark_finishing();
        if let Some(mut overlay) = self.overlay.take() {
            overlay.remove();
        }
        self.sink.close();
        self.phase = BridgePhase::TornDown;
        tracing::info!("Session torn down");
        true
    }

    /// Re-apply immersive fullscreen (resume, focus gained, layout pass).
    pub fn reassert_display_mode(&self) {
        if self.is_live() {
            self.watchdog.reassert();
        }
    }

    /// Layout pass: re-assert fullscreen and send the geometry table.
    pub fn on_layout_settled(&self) -> Option<GeometryBatch> {
        let overlay = self.overlay.as_ref()?;
        self.watchdog.reassert();
        Some(self.reporter.report(overlay.layout()))
    }

    /// Chrome visibility callback. Runs a layout pass when the chrome came back.
    pub fn on_chrome_visibility(&self, flags: ChromeFlags) -> Option<GeometryBatch> {
        if !self.is_live() || !self.watchdog.on_visibility(flags) {
            return None;
        }
        self.on_layout_settled()
    }

    /// The engine accepted the open, even if the overlay later failed.
    pub fn engine_accepted(&self) -> bool {
        self.accepted
    }

    pub fn is_live(&self) -> bool {
        self.phase == BridgePhase::Live
    }

    pub fn is_torn_down(&self) -> bool {
        self.phase == BridgePhase::TornDown
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_settled()
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn sink(&self) -> &CommandSink {
        &self.sink
    }
}

impl Drop for SessionBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBridge")
            .field("phase", &self.phase)
            .field("overlay", &self.overlay)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
