//! Services module - the bridge protocol and the state machines that drive it.
//!
//! Nothing here depends on the UI thread machinery in [`crate::ui`]; every
//! component takes its collaborators explicitly and is testable on its own.
//!
//! # Components
//!
//! - [`Engine`] and [`CommandSink`]: the engine boundary. The engine opens sessions,
//!   receives geometry and calls back into the sink with `(code, argument)` commands.
//! - [`CommandDispatcher`]: applies one command to the overlay widgets and reports
//!   queries and terminations as a [`Dispatch`].
//! - [`GeometryReporter`]: resolves the fixed control table against the overlay layout
//!   and sends the flat batch to the engine.
//! - [`SessionBridge`]: lifecycle of one session (open, overlay, immersive display,
//!   teardown, exactly-once outcome).
//! - [`LoginFlow`]: the login form's state machine and outcome presentation.
//! - [`DiagnosticTrigger`]: tap-burst detector that forces the fatal presentation.
//! - [`overlay`]: the window manager and system chrome seams with headless implementations.
//! - [`LoopbackEngine`]: in-process engine used by the binary and the tests.

pub mod diagnostic;
pub mod dispatcher;
pub mod engine;
pub mod geometry;
pub mod login;
pub mod loopback;
pub mod overlay;
pub mod session;

pub use diagnostic::{ClickHistory, DiagnosticTrigger, TRIGGERED_ERROR, TapVerdict};
pub use dispatcher::{CommandDispatcher, Dispatch, ProtocolPolicy, ProtocolViolation};
pub use engine::{CommandSink, Engine, EngineRejection};
pub use geometry::GeometryReporter;
pub use login::{LoginFlow, SubmitError, environment_snapshot, focus_for_error};
pub use loopback::{LoopbackEngine, REPOSITORY_INVALID};
pub use overlay::{
    ChromeFlags, DisplayModeWatchdog, HeadlessChrome, HeadlessWindowManager, OverlayGuard,
    OverlayParams, SystemChrome, WindowError, WindowEvent, WindowId, WindowManager,
};
pub use session::{BridgeContext, OutcomeSender, SessionBridge};
