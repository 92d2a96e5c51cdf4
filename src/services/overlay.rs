//! Overlay window layer.
//!
//! [`WindowManager`] and [`SystemChrome`] are the platform seam: the first adds and
//! removes the transparent overlay window, the second controls the status and
//! navigation chrome. [`OverlayGuard`] owns one added overlay and removes it on drop.
//! The headless implementations back the binary and the tests.

use crate::models::{DisplaySettings, OverlayLayout};
use std::ops::BitOr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Handle of a window added through a [`WindowManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Window manager refused the overlay: {0}")]
    Rejected(String),

    #[error("Window {0:?} is not attached")]
    NotAttached(WindowId),
}

/// Window attributes of the overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayParams {
    pub width: i32,
    pub height: i32,
    pub touchable: bool,
    pub focusable: bool,
    pub transparent: bool,
    pub always_on_top: bool,
}

impl OverlayParams {
    /// Non-interactive transparent layer covering the whole display.
    pub fn for_display(display: DisplaySettings) -> Self {
        Self {
            width: display.width,
            height: display.height,
            touchable: false,
            focusable: false,
            transparent: true,
            always_on_top: true,
        }
    }
}

pub trait WindowManager: Send + Sync {
    fn add_overlay(
        &self,
        params: &OverlayParams,
        layout: &OverlayLayout,
    ) -> Result<WindowId, WindowError>;

    fn remove_overlay(&self, id: WindowId) -> Result<(), WindowError>;
}

/// Scoped ownership of an added overlay window and its view tree.
///
/// The window is removed exactly once: by [`remove`](Self::remove) or on drop.
pub struct OverlayGuard {
    manager: Arc<dyn WindowManager>,
    id: Option<WindowId>,
    layout: OverlayLayout,
}

impl OverlayGuard {
    pub fn attach(
        manager: Arc<dyn WindowManager>,
        params: &OverlayParams,
        layout: OverlayLayout,
    ) -> Result<Self, WindowError> {
        let id = manager.add_overlay(params, &layout)?;
        tracing::info!(
            "Overlay {:?} added ({}x{})",
            id,
            params.width,
            params.height
        );
        Ok(Self {
            manager,
            id: Some(id),
            layout,
        })
    }

    pub fn id(&self) -> Option<WindowId> {
        self.id
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn is_attached(&self) -> bool {
        self.id.is_some()
    }

    /// Remove the window. Returns false if it was already removed.
    pub fn remove(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        match self.manager.remove_overlay(id) {
            Ok(()) => tracing::info!("Overlay {:?} removed", id),
            Err(e) => tracing::warn!("Failed to remove overlay {:?}: {}", id, e),
        }
        true
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for OverlayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayGuard")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// What happened to the headless window stack, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Added(WindowId),
    Removed(WindowId),
}

/// In-process window manager that records every add and remove.
#[derive(Debug, Default)]
pub struct HeadlessWindowManager {
    next_id: AtomicU64,
    fail_next_add: AtomicBool,
    attached: Mutex<Vec<(WindowId, OverlayParams)>>,
    events: Mutex<Vec<WindowEvent>>,
}

impl HeadlessWindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `add_overlay` fail.
    pub fn fail_next_add(&self) {
        self.fail_next_add.store(true, Ordering::SeqCst);
    }

    pub fn attached(&self) -> Vec<(WindowId, OverlayParams)> {
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<WindowEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: WindowEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl WindowManager for HeadlessWindowManager {
    fn add_overlay(
        &self,
        params: &OverlayParams,
        _layout: &OverlayLayout,
    ) -> Result<WindowId, WindowError> {
        if self.fail_next_add.swap(false, Ordering::SeqCst) {
            return Err(WindowError::Rejected("permission denied".into()));
        }
        let id = WindowId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, *params));
        self.record(WindowEvent::Added(id));
        Ok(id)
    }

    fn remove_overlay(&self, id: WindowId) -> Result<(), WindowError> {
        let mut attached = self.attached.lock().unwrap_or_else(PoisonError::into_inner);
        let index = attached
            .iter()
            .position(|(w, _)| *w == id)
            .ok_or(WindowError::NotAttached(id))?;
        attached.remove(index);
        drop(attached);
        self.record(WindowEvent::Removed(id));
        Ok(())
    }
}

/// System UI visibility bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChromeFlags(u32);

impl ChromeFlags {
    pub const NONE: ChromeFlags = ChromeFlags(0);
    pub const HIDE_NAVIGATION: ChromeFlags = ChromeFlags(0x0002);
    pub const FULLSCREEN: ChromeFlags = ChromeFlags(0x0004);
    pub const LAYOUT_STABLE: ChromeFlags = ChromeFlags(0x0100);
    pub const LAYOUT_HIDE_NAVIGATION: ChromeFlags = ChromeFlags(0x0200);
    pub const LAYOUT_FULLSCREEN: ChromeFlags = ChromeFlags(0x0400);
    pub const IMMERSIVE_STICKY: ChromeFlags = ChromeFlags(0x1000);

    /// Everything the bridge asserts for immersive fullscreen.
    pub const IMMERSIVE: ChromeFlags = ChromeFlags(
        Self::HIDE_NAVIGATION.0
            | Self::FULLSCREEN.0
            | Self::LAYOUT_STABLE.0
            | Self::LAYOUT_HIDE_NAVIGATION.0
            | Self::LAYOUT_FULLSCREEN.0
            | Self::IMMERSIVE_STICKY.0,
    );

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ChromeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: ChromeFlags) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for ChromeFlags {
    type Output = ChromeFlags;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

pub trait SystemChrome: Send + Sync {
    fn apply(&self, flags: ChromeFlags);
    fn current(&self) -> ChromeFlags;
}

/// Chrome that only remembers the flags it was given.
#[derive(Debug, Default)]
pub struct HeadlessChrome {
    flags: Mutex<ChromeFlags>,
    applications: AtomicU64,
}

impl HeadlessChrome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user revealing the status/navigation bars.
    pub fn reveal(&self) -> ChromeFlags {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        *flags = flags.without(ChromeFlags::FULLSCREEN | ChromeFlags::HIDE_NAVIGATION);
        *flags
    }

    /// How many times flags were applied
    pub fn applications(&self) -> u64 {
        self.applications.load(Ordering::Relaxed)
    }
}

impl SystemChrome for HeadlessChrome {
    fn apply(&self, flags: ChromeFlags) {
        *self.flags.lock().unwrap_or_else(PoisonError::into_inner) = flags;
        self.applications.fetch_add(1, Ordering::Relaxed);
    }

    fn current(&self) -> ChromeFlags {
        *self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps the host in immersive fullscreen.
#[derive(Clone)]
pub struct DisplayModeWatchdog {
    chrome: Arc<dyn SystemChrome>,
}

impl DisplayModeWatchdog {
    pub fn new(chrome: Arc<dyn SystemChrome>) -> Self {
        Self { chrome }
    }

    pub fn reassert(&self) {
        tracing::trace!("Re-asserting immersive display mode");
        self.chrome.apply(ChromeFlags::IMMERSIVE);
    }

    /// Visibility callback. Returns true when the chrome came back and
    /// fullscreen was re-asserted; the caller then runs a layout pass.
    pub fn on_visibility(&self, flags: ChromeFlags) -> bool {
        if flags.contains(ChromeFlags::FULLSCREEN) {
            return false;
        }
        tracing::debug!("System chrome reappeared (flags {:#06x})", flags.bits());
        self.reassert();
        true
    }
}
