use crate::models::credentials::Credentials;
use serde::{Deserialize, Serialize};

/// Terminal result of one session attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Session ended normally (or was never disturbed).
    Success,
    /// Bad credentials or a transient failure; the flow stays usable.
    RecoverableError { message: String },
    /// Unrecoverable failure; the presentation is replaced for good.
    FatalError { message: String },
}

impl SessionOutcome {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::RecoverableError {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::FatalError {
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalError { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::RecoverableError { message } | Self::FatalError { message } => Some(message),
        }
    }

    /// Encode for the integer result channel.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Success => ResultCode::Normal,
            Self::RecoverableError { .. } => ResultCode::Recoverable,
            Self::FatalError { .. } => ResultCode::Fatal,
        }
    }

    /// Decode from the integer result channel. Unknown codes carry no outcome.
    pub fn from_result(code: i32, message: Option<String>) -> Option<Self> {
        let message = message.unwrap_or_default();
        match ResultCode::from_i32(code)? {
            ResultCode::Normal => Some(Self::Success),
            ResultCode::Recoverable => Some(Self::RecoverableError { message }),
            ResultCode::Fatal => Some(Self::FatalError { message }),
        }
    }
}

/// Integer codes of the caller ⇄ login flow result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Normal,
    Recoverable,
    Fatal,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Recoverable => -1,
            Self::Fatal => -2,
        }
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            -1 => Some(Self::Recoverable),
            -2 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// What survives a process-level save/restore.
///
/// A fatal message, once set, is the only thing saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SavedInstanceState {
    Login { fields: Credentials },
    Fatal { message: String },
}
