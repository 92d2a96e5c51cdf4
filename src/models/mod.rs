//! Data models for the proofread bridge.
//!
//! - [`Credentials`] and [`RepositoryLocator`]: what the login flow collects and how a
//!   repository locator string is structured
//! - [`ControlId`], [`Rect`], [`GeometryBatch`], [`HIT_RECT_TABLE`]: the geometry protocol
//!   sent to the engine after every layout pass
//! - [`ActionCode`] and [`ActionCommand`]: the engine → UI command protocol
//! - [`SessionOutcome`], [`ResultCode`], [`SavedInstanceState`]: the result channel and
//!   what survives save/restore
//! - [`HostState`]: the presentation state held by [`StateManager`](crate::state::StateManager)
//! - [`BridgeSettings`]: configuration

pub mod command;
pub mod config;
pub mod credentials;
pub mod geometry;
pub mod host_state;
pub mod outcome;

pub use command::{ActionCode, ActionCommand};
pub use config::{BridgeSettings, DisplaySettings, LoggingSettings};
pub use credentials::{Credentials, LocatorError, RepositoryLocator};
pub use geometry::{
    ControlId, DisplayId, GeometryBatch, GeometryError, GeometryRecord, HIT_RECT_TABLE,
    OverlayLayout, RECORD_WIDTH, Rect,
};
pub use host_state::{
    HostState, LoginField, LoginPage, OverlayWidgets, ProgressIndicator, Screen, SessionPhase,
};
pub use outcome::{ResultCode, SavedInstanceState, SessionOutcome};
