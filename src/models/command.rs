/// Action codes of the engine → UI command protocol.
///
/// The numeric values are the wire contract with the engine and must never
/// change. Codes outside this table are ignored by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    /// -2: fatal termination, argument is the message
    FatalTermination,
    /// -1: recoverable termination, argument is the message
    RecoverableTermination,
    /// 7: query whether the host is finishing
    QueryFinishing,
    /// 8: set the repository title text
    SetTitle,
    /// 20: show the "opening" progress indicator
    ShowOpeningProgress,
    /// 21: show the "model" progress indicator
    ShowModelProgress,
    /// 22: hide the "model" progress indicator
    HideModelProgress,
    /// 100: start/reset the image progress indicator
    StartImageProgress,
    /// 101: update or hide the image progress indicator
    UpdateImageProgress,
    /// 120: secondary value display text
    SetSecondaryValue,
    /// 121: primary value display text
    SetPrimaryValue,
}

impl ActionCode {
    pub fn from_code(code: i32) -> Option<Self> {
        let action = match code {
            -2 => Self::FatalTermination,
            -1 => Self::RecoverableTermination,
            7 => Self::QueryFinishing,
            8 => Self::SetTitle,
            20 => Self::ShowOpeningProgress,
            21 => Self::ShowModelProgress,
            22 => Self::HideModelProgress,
            100 => Self::StartImageProgress,
            101 => Self::UpdateImageProgress,
            120 => Self::SetSecondaryValue,
            121 => Self::SetPrimaryValue,
            _ => return None,
        };
        Some(action)
    }

    pub fn code(self) -> i32 {
        match self {
            Self::FatalTermination => -2,
            Self::RecoverableTermination => -1,
            Self::QueryFinishing => 7,
            Self::SetTitle => 8,
            Self::ShowOpeningProgress => 20,
            Self::ShowModelProgress => 21,
            Self::HideModelProgress => 22,
            Self::StartImageProgress => 100,
            Self::UpdateImageProgress => 101,
            Self::SetSecondaryValue => 120,
            Self::SetPrimaryValue => 121,
        }
    }

    /// Codes whose effect is purely a read of host state.
    pub fn is_query(self) -> bool {
        matches!(self, Self::QueryFinishing)
    }
}

/// One command as received from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCommand {
    pub code: i32,
    pub argument: String,
}

impl ActionCommand {
    pub fn new(code: i32, argument: impl Into<String>) -> Self {
        Self {
            code,
            argument: argument.into(),
        }
    }

    pub fn of(action: ActionCode, argument: impl Into<String>) -> Self {
        Self::new(action.code(), argument)
    }

    pub fn action(&self) -> Option<ActionCode> {
        ActionCode::from_code(self.code)
    }
}
