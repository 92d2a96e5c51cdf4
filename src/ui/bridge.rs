// EventLoopBridge - Marshals work onto the single UI thread
//
// The presentation layer is single-threaded: one thread owns the host state and
// runs tasks in arrival order. Work arrives from:
// 1. The engine's own threads (commands, via the CommandSink)
// 2. Tokio blocking workers (the session open call)
// 3. Tokio async tasks
//
// The bridge provides:
// - An ordered, unbounded task queue (nothing is dropped or coalesced)
// - Spawning async and blocking work with results posted back to the UI thread
// - The UI loop itself (run_until / drain)

use crate::metrics::BridgeMetrics;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

type UiTask<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Why [`EventLoopBridge::run_until`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The predicate became true
    Settled,
    /// The deadline passed first
    TimedOut,
}

/// Owns the receiving end of the UI task queue
///
/// The thread that calls [`run_until`](Self::run_until) or [`drain`](Self::drain)
/// is the UI thread; it is the only one that gets `&mut T`.
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let mut bridge = EventLoopBridge::<Shell>::new(runtime.handle().clone(), metrics);
/// let handle = bridge.clone_handle();
///
/// handle.spawn_blocking(
///     || slow_engine_call(),
///     |shell, result| shell.on_result(result),
/// );
///
/// bridge.run_until(&mut shell, Duration::from_secs(5), |shell| shell.is_done());
/// ```
pub struct EventLoopBridge<T> {
    /// Handle to the tokio runtime for spawning async and blocking work
    tokio_handle: tokio::runtime::Handle,

    /// Sending side, cloned into every handle
    ui_update_tx: mpsc::UnboundedSender<UiTask<T>>,

    /// Receiving side, drained on the UI thread
    ui_update_rx: mpsc::UnboundedReceiver<UiTask<T>>,

    metrics: Arc<BridgeMetrics>,
}

impl<T: 'static> EventLoopBridge<T> {
    pub fn new(tokio_handle: tokio::runtime::Handle, metrics: Arc<BridgeMetrics>) -> Self {
        // Unbounded: engine commands must never be dropped under backpressure
        let (ui_update_tx, ui_update_rx) = mpsc::unbounded_channel();
        Self {
            tokio_handle,
            ui_update_tx,
            ui_update_rx,
            metrics,
        }
    }

    /// Clone a lightweight handle for posting from other threads
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<T> {
        EventLoopBridgeHandle {
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Run queued tasks against `host` until `done(host)` holds or `timeout` passes.
    ///
    /// Blocks the calling thread. Must not be called from inside the tokio runtime.
    pub fn run_until<F>(&mut self, host: &mut T, timeout: Duration, mut done: F) -> LoopExit
    where
        F: FnMut(&T) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done(host) {
                return LoopExit::Settled;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("UI loop timed out after {:?}", timeout);
                return LoopExit::TimedOut;
            }

            let rx = &mut self.ui_update_rx;
            let next = self
                .tokio_handle
                .block_on(async { tokio::time::timeout(remaining, rx.recv()).await });
            match next {
                Ok(Some(task)) => task(host),
                // The bridge keeps a sender alive, so the queue never closes
                Ok(None) => return LoopExit::Settled,
                Err(_) => {}
            }
        }
    }

    /// Run every task already queued, without waiting. Returns how many ran.
    pub fn drain(&mut self, host: &mut T) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.ui_update_rx.try_recv() {
            task(host);
            ran += 1;
        }
        ran
    }
}

/// Lightweight handle that can be cloned and sent to any thread
pub struct EventLoopBridgeHandle<T> {
    tokio_handle: tokio::runtime::Handle,
    ui_update_tx: mpsc::UnboundedSender<UiTask<T>>,
    metrics: Arc<BridgeMetrics>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T> Clone for EventLoopBridgeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T: 'static> EventLoopBridgeHandle<T> {
    /// Schedule a UI update from any thread
    ///
    /// Tasks run on the UI thread in the order they were posted.
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        match self.ui_update_tx.send(Box::new(update)) {
            Ok(()) => self.metrics.record_ui_task(),
            Err(_) => {
                tracing::warn!("Failed to send UI update - event loop has stopped");
                self.metrics.record_ui_task_lost();
            }
        }
    }

    /// Spawn an async task on the tokio runtime
    pub fn spawn_async<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(async move {
            future_factory().await;
        });
    }

    /// Run blocking `work` on the tokio blocking pool, then `complete` on the UI thread
    pub fn spawn_blocking<W, R, C>(&self, work: W, complete: C)
    where
        W: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
        C: FnOnce(&mut T, R) + Send + 'static,
    {
        let handle = self.clone();
        self.tokio_handle.spawn_blocking(move || {
            let result = work();
            handle.update_ui(move |host| complete(host, result));
        });
    }
}
