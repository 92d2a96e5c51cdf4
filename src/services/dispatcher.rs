use crate::models::host_state::{
    IMAGE_PROGRESS_DONE, IMAGE_PROGRESS_INDETERMINATE, IMAGE_PROGRESS_SCALE,
};
use crate::models::{ActionCode, DisplayId, OverlayWidgets, ProgressIndicator, SessionOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// A command the engine should never have sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("code {code}: argument {argument:?} is not an integer")]
    BadArgument { code: i32, argument: String },

    #[error("code {code}: overlay has no {display:?} display")]
    MissingDisplay { code: i32, display: DisplayId },
}

/// How protocol violations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPolicy {
    /// Panic on a malformed argument. Used in development builds to surface
    /// engine bugs immediately. Missing displays are still only logged.
    Strict,
    /// Log a warning and leave the UI untouched.
    Lenient,
}

impl ProtocolPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A UI effect was applied
    Applied,
    /// Code outside the table, or an optional display that is absent
    Ignored,
    /// Read-only query with its reply
    Query(i32),
    /// The engine ended the session
    Terminate(SessionOutcome),
    /// Dropped as a protocol violation
    Rejected(ProtocolViolation),
}

impl Dispatch {
    /// Integer reply returned to the engine
    pub fn reply(&self) -> i32 {
        match self {
            Self::Query(reply) => *reply,
            _ => 0,
        }
    }
}

/// Interprets engine commands against the overlay widgets.
///
/// Never blocks and never touches anything but the widgets it is handed;
/// terminations are reported back as [`Dispatch::Terminate`] for the
/// session owner to act on.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    policy: ProtocolPolicy,
    finishing: Arc<AtomicBool>,
}

impl CommandDispatcher {
    pub fn new(policy: ProtocolPolicy, finishing: Arc<AtomicBool>) -> Self {
        Self { policy, finishing }
    }

    pub fn policy(&self) -> ProtocolPolicy {
        self.policy
    }

    pub fn apply(&self, code: i32, argument: &str, widgets: &mut OverlayWidgets) -> Dispatch {
        let Some(action) = ActionCode::from_code(code) else {
            tracing::trace!(code, "Ignoring unknown action code");
            return Dispatch::Ignored;
        };

        match self.effect(action, argument, widgets) {
            Ok(dispatch) => dispatch,
            Err(violation) => self.violation(violation),
        }
    }

    fn effect(
        &self,
        action: ActionCode,
        argument: &str,
        widgets: &mut OverlayWidgets,
    ) -> Result<Dispatch, ProtocolViolation> {
        let code = action.code();
        let dispatch = match action {
            ActionCode::FatalTermination => Dispatch::Terminate(SessionOutcome::fatal(argument)),
            ActionCode::RecoverableTermination => {
                Dispatch::Terminate(SessionOutcome::recoverable(argument))
            }
            ActionCode::QueryFinishing => {
                Dispatch::Query(i32::from(self.finishing.load(Ordering::Acquire)))
            }
            ActionCode::SetTitle => {
                let title = required(&mut widgets.repo_title, code, DisplayId::RepoTitle)?;
                *title = argument.to_string();
                Dispatch::Applied
            }
            ActionCode::ShowOpeningProgress => {
                required(&mut widgets.opening_progress, code, DisplayId::OpeningProgress)?
                    .visible = true;
                Dispatch::Applied
            }
            ActionCode::ShowModelProgress => {
                required(&mut widgets.model_progress, code, DisplayId::ModelProgress)?.visible =
                    true;
                Dispatch::Applied
            }
            ActionCode::HideModelProgress => {
                required(&mut widgets.model_progress, code, DisplayId::ModelProgress)?.visible =
                    false;
                Dispatch::Applied
            }
            ActionCode::StartImageProgress => {
                let value = parse_value(code, argument)?;
                let progress = image_progress(widgets, code)?;
                progress.max = IMAGE_PROGRESS_SCALE;
                progress.visible = true;
                if value == IMAGE_PROGRESS_INDETERMINATE {
                    progress.indeterminate = true;
                } else {
                    progress.indeterminate = false;
                    progress.value = value;
                }
                Dispatch::Applied
            }
            ActionCode::UpdateImageProgress => {
                let value = parse_value(code, argument)?;
                let progress = image_progress(widgets, code)?;
                if value == IMAGE_PROGRESS_DONE {
                    progress.visible = false;
                } else {
                    progress.value = value;
                }
                Dispatch::Applied
            }
            ActionCode::SetSecondaryValue => set_optional(&mut widgets.secondary_value, argument),
            ActionCode::SetPrimaryValue => set_optional(&mut widgets.primary_value, argument),
        };
        Ok(dispatch)
    }

    fn violation(&self, violation: ProtocolViolation) -> Dispatch {
        match (&violation, self.policy) {
            // A layout without the widget is tolerated under every policy
            (ProtocolViolation::MissingDisplay { .. }, _) => {
                tracing::warn!("Ignoring command for a missing display: {}", violation);
                Dispatch::Rejected(violation)
            }
            (ProtocolViolation::BadArgument { .. }, ProtocolPolicy::Strict) => {
                tracing::error!("Engine protocol violation: {}", violation);
                panic!("engine protocol violation: {violation}");
            }
            (ProtocolViolation::BadArgument { .. }, ProtocolPolicy::Lenient) => {
                tracing::warn!("Ignoring engine protocol violation: {}", violation);
                Dispatch::Rejected(violation)
            }
        }
    }
}

fn required<T>(
    widget: &mut Option<T>,
    code: i32,
    display: DisplayId,
) -> Result<&mut T, ProtocolViolation> {
    widget
        .as_mut()
        .ok_or(ProtocolViolation::MissingDisplay { code, display })
}

fn image_progress(
    widgets: &mut OverlayWidgets,
    code: i32,
) -> Result<&mut ProgressIndicator, ProtocolViolation> {
    required(&mut widgets.image_progress, code, DisplayId::ImageProgress)
}

fn parse_value(code: i32, argument: &str) -> Result<i32, ProtocolViolation> {
    argument
        .parse()
        .map_err(|_| ProtocolViolation::BadArgument {
            code,
            argument: argument.to_string(),
        })
}

fn set_optional(display: &mut Option<String>, argument: &str) -> Dispatch {
    match display {
        Some(text) => {
            *text = argument.to_string();
            Dispatch::Applied
        }
        None => Dispatch::Ignored,
    }
}
