// UI module - the single UI thread and host lifecycle
//
// This module contains:
// - EventLoopBridge: Ordered task queue marshaling work onto the UI thread
// - LifecycleHooks: Explicit handler registration for host events
// - HostController: Owns the UI-thread shell wiring login, session and dispatch together

pub mod bridge;
pub mod controller;
pub mod lifecycle;

pub use bridge::{EventLoopBridge, EventLoopBridgeHandle, LoopExit};
pub use controller::{HostController, HostEventSender, HostShell, SessionSlot};
pub use lifecycle::{HostEvent, HostEventKind, LifecycleHooks};
