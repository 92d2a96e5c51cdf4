// Bridge metrics module
//
// Lightweight counters for the traffic crossing the engine boundary

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Protocol traffic counters
///
/// Atomic so the engine's threads and the UI thread can record without locks.
/// Logged on shutdown via [`log_summary`](Self::log_summary).
#[derive(Debug)]
pub struct BridgeMetrics {
    /// Commands that produced a UI effect
    pub commands_applied: AtomicU64,

    /// Commands with codes outside the protocol table
    pub commands_ignored: AtomicU64,

    /// Commands dropped as protocol violations
    pub commands_rejected: AtomicU64,

    /// Code 7 queries answered
    pub queries_answered: AtomicU64,

    /// Commands received after the session was closed
    pub commands_after_close: AtomicU64,

    /// Geometry batches sent to the engine
    pub geometry_reports: AtomicU64,

    /// Engine sessions successfully opened
    pub sessions_opened: AtomicU64,

    pub recoverable_outcomes: AtomicU64,

    pub fatal_outcomes: AtomicU64,

    /// Tasks posted to the UI thread
    pub ui_tasks_marshaled: AtomicU64,

    /// Tasks that could not be posted (event loop gone)
    pub ui_tasks_lost: AtomicU64,

    start_time: Instant,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            commands_applied: AtomicU64::new(0),
            commands_ignored: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            queries_answered: AtomicU64::new(0),
            commands_after_close: AtomicU64::new(0),
            geometry_reports: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            recoverable_outcomes: AtomicU64::new(0),
            fatal_outcomes: AtomicU64::new(0),
            ui_tasks_marshaled: AtomicU64::new(0),
            ui_tasks_lost: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_command_applied(&self) {
        self.commands_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_ignored(&self) {
        self.commands_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_rejected(&self) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_after_close(&self) {
        self.commands_after_close.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geometry_report(&self) {
        self.geometry_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recoverable(&self) {
        self.recoverable_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fatal(&self) {
        self.fatal_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_task(&self) {
        self.ui_tasks_marshaled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_task_lost(&self) {
        self.ui_tasks_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Total commands received from the engine, including queries
    pub fn commands_total(&self) -> u64 {
        self.commands_applied.load(Ordering::Relaxed)
            + self.commands_ignored.load(Ordering::Relaxed)
            + self.commands_rejected.load(Ordering::Relaxed)
            + self.queries_answered.load(Ordering::Relaxed)
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Bridge Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Commands: {} total ({} applied, {} ignored, {} rejected, {} queries, {} after close)",
            self.commands_total(),
            self.commands_applied.load(Ordering::Relaxed),
            self.commands_ignored.load(Ordering::Relaxed),
            self.commands_rejected.load(Ordering::Relaxed),
            self.queries_answered.load(Ordering::Relaxed),
            self.commands_after_close.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Sessions: {} opened, {} recoverable, {} fatal",
            self.sessions_opened.load(Ordering::Relaxed),
            self.recoverable_outcomes.load(Ordering::Relaxed),
            self.fatal_outcomes.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Geometry reports: {}, UI tasks: {} marshaled, {} lost",
            self.geometry_reports.load(Ordering::Relaxed),
            self.ui_tasks_marshaled.load(Ordering::Relaxed),
            self.ui_tasks_lost.load(Ordering::Relaxed)
        );
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
