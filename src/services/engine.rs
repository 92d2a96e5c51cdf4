use crate::metrics::BridgeMetrics;
use crate::models::{ActionCode, ActionCommand, Credentials};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Error string returned by the engine when it refuses to open a session.
///
/// An empty message is not an error; see [`SessionBridge::open`](super::SessionBridge::open).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineRejection {
    pub message: String,
}

impl EngineRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The native processing engine, seen from the presentation shell.
///
/// `open` may block without bound; callers run it off the UI thread.
/// Inbound commands arrive through the [`CommandSink`] handed over in `attach`.
#[cfg_attr(test, mockall::automock)]
pub trait Engine: Send + Sync {
    /// Hand the engine its command entry point. Called before `open`.
    fn attach(&self, sink: CommandSink);

    /// Open a session. A non-empty rejection message is a recoverable failure.
    fn open(&self, credentials: &Credentials) -> Result<(), EngineRejection>;

    /// Replace the engine's hit-rectangle table with a flat
    /// `(code, left, top, right, bottom)*` batch.
    fn report_geometry(&self, records: &[i32]);
}

type PostFn = dyn Fn(ActionCommand) + Send + Sync;

/// Thread-safe entry point the engine calls for every command.
///
/// Code 7 is answered synchronously from the finishing flag. Every other
/// command is posted, unchanged and in emission order, to the UI thread.
/// After [`close`](Self::close) commands are dropped.
#[derive(Clone)]
pub struct CommandSink {
    finishing: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    post: Arc<PostFn>,
    metrics: Arc<BridgeMetrics>,
}

impl CommandSink {
    pub fn new<F>(finishing: Arc<AtomicBool>, post: F, metrics: Arc<BridgeMetrics>) -> Self
    where
        F: Fn(ActionCommand) + Send + Sync + 'static,
    {
        Self {
            finishing,
            closed: Arc::new(AtomicBool::new(false)),
            post: Arc::new(post),
            metrics,
        }
    }

    /// Deliver one command. Returns the integer reply (only code 7 has a meaningful one).
    pub fn apply(&self, code: i32, argument: &str) -> i32 {
        if code == ActionCode::QueryFinishing.code() {
            self.metrics.record_query();
            return i32::from(self.is_finishing());
        }

        if self.is_closed() {
            tracing::debug!(code, "Dropping command received after session teardown");
            self.metrics.record_command_after_close();
            return 0;
        }

        tracing::trace!(code, argument, "Engine command");
        (self.post)(ActionCommand::new(code, argument));
        0
    }

    pub fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::Acquire)
    }

    pub(crate) fn mark_finishing(&self) {
        self.finishing.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for CommandSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSink")
            .field("finishing", &self.is_finishing())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_sink() -> (CommandSink, Arc<Mutex<Vec<ActionCommand>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink_received = Arc::clone(&received);
        let sink = CommandSink::new(
            Arc::new(AtomicBool::new(false)),
            move |cmd| sink_received.lock().unwrap().push(cmd),
            Arc::new(BridgeMetrics::new()),
        );
        (sink, received)
    }

    #[test]
    fn test_commands_posted_in_order() {
        let (sink, received) = recording_sink();
        sink.apply(8, "title");
        sink.apply(100, "-1");
        sink.apply(999, "x");

        let codes: Vec<i32> = received.lock().unwrap().iter().map(|c| c.code).collect();
        assert_eq!(codes, vec![8, 100, 999]);
    }

    #[test]
    fn test_finishing_query_is_synchronous() {
        let (sink, received) = recording_sink();
        assert_eq!(sink.apply(7, ""), 0);
        sink.mark_finishing();
        assert_eq!(sink.apply(7, ""), 1);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_closed_sink_drops_commands() {
        let (sink, received) = recording_sink();
        sink.close();
        sink.apply(8, "late");
        assert!(received.lock().unwrap().is_empty());
        assert_eq!(
            sink.metrics
                .commands_after_close
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(
            EngineRejection::new("repository invalid").to_string(),
            "repository invalid"
        );
    }
}
