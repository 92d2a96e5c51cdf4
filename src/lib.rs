// Proofread Bridge - presentation shell for a native proofreading engine
//
// This is the library crate containing the bridge protocol, the state machines
// that drive it, and the UI-thread plumbing. The binary crate (main.rs) runs a
// headless host against the in-process loopback engine.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::BridgeMetrics;
pub use models::{BridgeSettings, Credentials, HostState, SessionOutcome};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
