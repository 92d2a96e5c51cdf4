use std::collections::VecDeque;
use std::time::Instant;

/// Taps remembered before the window check starts.
pub const HISTORY_CAPACITY: usize = 7;

/// A full history older than this does not fire.
pub const TRIGGER_WINDOW_MS: u64 = 5000;

/// Fatal message shown when the trigger fires.
pub const TRIGGERED_ERROR: &str = "triggered error";

/// Tap timestamps in milliseconds, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickHistory {
    taps: VecDeque<u64>,
}

impl ClickHistory {
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.taps.len() >= HISTORY_CAPACITY
    }

    pub fn oldest(&self) -> Option<u64> {
        self.taps.back().copied()
    }

    pub fn newest(&self) -> Option<u64> {
        self.taps.front().copied()
    }

    fn record(&mut self, t: u64) {
        self.taps.push_front(t);
        while self.taps.len() > HISTORY_CAPACITY {
            self.taps.pop_back();
        }
    }

    fn clear(&mut self) {
        self.taps.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapVerdict {
    Recorded,
    Fired,
}

/// Forces the fatal error presentation after a rapid burst of icon taps.
#[derive(Debug, Clone)]
pub struct DiagnosticTrigger {
    history: ClickHistory,
    epoch: Instant,
}

impl DiagnosticTrigger {
    pub fn new() -> Self {
        Self {
            history: ClickHistory::default(),
            epoch: Instant::now(),
        }
    }

    /// Tap now, on the monotonic clock.
    pub fn on_tap(&mut self) -> TapVerdict {
        let now = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.on_tap_at(now)
    }

    /// Tap at an explicit uptime in milliseconds.
    ///
    /// A timestamp earlier than the oldest remembered tap is only recorded;
    /// it never fires.
    pub fn on_tap_at(&mut self, t: u64) -> TapVerdict {
        let elapsed = self
            .history
            .oldest()
            .filter(|_| self.history.is_full())
            .and_then(|oldest| t.checked_sub(oldest));

        if let Some(elapsed) = elapsed.filter(|&elapsed| elapsed < TRIGGER_WINDOW_MS) {
            tracing::warn!(
                "Diagnostic trigger fired: {} taps within {} ms",
                HISTORY_CAPACITY + 1,
                elapsed
            );
            self.history.clear();
            TapVerdict::Fired
        } else {
            self.history.record(t);
            TapVerdict::Recorded
        }
    }

    pub fn history(&self) -> &ClickHistory {
        &self.history
    }
}

impl Default for DiagnosticTrigger {
    fn default() -> Self {
        Self::new()
    }
}
