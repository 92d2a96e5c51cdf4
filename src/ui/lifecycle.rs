// Host lifecycle events and explicit handler registration
//
// Handlers run on the UI thread, in registration order, for the events they
// were registered for. The controller guarantees Create runs before any engine
// command and that Destroy's handlers run after the overlay is removed.

use crate::models::Credentials;
use crate::services::ChromeFlags;
use std::sync::Arc;

/// Host lifecycle and input events
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Create,
    Resume,
    WindowFocusChanged(bool),
    /// A layout pass finished
    LayoutSettled,
    /// System UI visibility callback with the new flags
    ChromeVisibilityChanged(ChromeFlags),
    BackPressed,
    Destroy,
    SaveState,
    /// Form field texts edited
    FieldsEdited(Credentials),
    LoginClicked(Credentials),
    IconTapped,
    /// Quit button on the fatal error page
    QuitClicked,
}

/// Payload-free discriminant used as the registration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Create,
    Resume,
    WindowFocusChanged,
    LayoutSettled,
    ChromeVisibilityChanged,
    BackPressed,
    Destroy,
    SaveState,
    FieldsEdited,
    LoginClicked,
    IconTapped,
    QuitClicked,
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            Self::Create => HostEventKind::Create,
            Self::Resume => HostEventKind::Resume,
            Self::WindowFocusChanged(_) => HostEventKind::WindowFocusChanged,
            Self::LayoutSettled => HostEventKind::LayoutSettled,
            Self::ChromeVisibilityChanged(_) => HostEventKind::ChromeVisibilityChanged,
            Self::BackPressed => HostEventKind::BackPressed,
            Self::Destroy => HostEventKind::Destroy,
            Self::SaveState => HostEventKind::SaveState,
            Self::FieldsEdited(_) => HostEventKind::FieldsEdited,
            Self::LoginClicked(_) => HostEventKind::LoginClicked,
            Self::IconTapped => HostEventKind::IconTapped,
            Self::QuitClicked => HostEventKind::QuitClicked,
        }
    }
}

pub type HostHandler<T> = dyn Fn(&mut T, &HostEvent) + Send + Sync;

/// Ordered handler registry
pub struct LifecycleHooks<T> {
    handlers: Vec<(HostEventKind, Arc<HostHandler<T>>)>,
}

impl<T> LifecycleHooks<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler; handlers for the same kind run in registration order
    pub fn on<F>(&mut self, kind: HostEventKind, handler: F) -> &mut Self
    where
        F: Fn(&mut T, &HostEvent) + Send + Sync + 'static,
    {
        self.handlers.push((kind, Arc::new(handler)));
        self
    }

    /// Run every handler registered for this event. Returns how many ran.
    pub fn dispatch(&self, host: &mut T, event: &HostEvent) -> usize {
        let kind = event.kind();
        tracing::trace!("Host event {:?}", kind);
        let mut ran = 0;
        for (_, handler) in self.handlers.iter().filter(|(k, _)| *k == kind) {
            handler(host, event);
            ran += 1;
        }
        ran
    }

    pub fn handler_count(&self, kind: HostEventKind) -> usize {
        self.handlers.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl<T> Default for LifecycleHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T> Clone for LifecycleHooks<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}
