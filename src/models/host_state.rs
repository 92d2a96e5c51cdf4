use crate::models::credentials::Credentials;
use crate::models::geometry::{DisplayId, OverlayLayout};

/// Scale the engine uses for determinate image progress.
pub const IMAGE_PROGRESS_SCALE: i32 = 1000;

/// Sentinel value for code 100 meaning "indeterminate".
pub const IMAGE_PROGRESS_INDETERMINATE: i32 = -1;

/// Sentinel value for code 101 meaning "hide".
pub const IMAGE_PROGRESS_DONE: i32 = 1001;

/// A progress bar widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressIndicator {
    pub visible: bool,
    pub indeterminate: bool,
    pub max: i32,
    pub value: i32,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self {
            visible: false,
            indeterminate: true,
            max: 100,
            value: 0,
        }
    }
}

/// Display widgets of the overlay. A `None` widget is absent from the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayWidgets {
    pub repo_title: Option<String>,
    pub opening_progress: Option<ProgressIndicator>,
    pub model_progress: Option<ProgressIndicator>,
    pub image_progress: Option<ProgressIndicator>,
    pub primary_value: Option<String>,
    pub secondary_value: Option<String>,
}

impl OverlayWidgets {
    /// Fresh widgets for the displays the layout carries.
    pub fn for_layout(layout: &OverlayLayout) -> Self {
        let text = |id| layout.has_display(id).then(String::new);
        let progress = |id| layout.has_display(id).then(ProgressIndicator::default);
        Self {
            repo_title: text(DisplayId::RepoTitle),
            opening_progress: progress(DisplayId::OpeningProgress),
            model_progress: progress(DisplayId::ModelProgress),
            image_progress: progress(DisplayId::ImageProgress),
            primary_value: text(DisplayId::PrimaryValue),
            secondary_value: text(DisplayId::SecondaryValue),
        }
    }
}

/// Login form fields, used for focus placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Secret,
    Repository,
}

/// State of the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPage {
    pub fields: Credentials,
    pub submit_enabled: bool,
    pub progress_visible: bool,
    pub error_message: Option<String>,
    pub focus: Option<LoginField>,
}

impl Default for LoginPage {
    fn default() -> Self {
        Self {
            fields: Credentials::default(),
            submit_enabled: true,
            progress_visible: false,
            error_message: None,
            focus: None,
        }
    }
}

/// What the whole host window is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Login,
    Fatal {
        message: String,
        environment: String,
    },
}

/// Where the current session attempt stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Opening,
    Live,
    Closed,
}

/// Central presentation state of the host.
///
/// Only the UI thread mutates it, through
/// [`StateManager::update`](crate::state::StateManager::update).
#[derive(Debug, Clone, Default)]
pub struct HostState {
    pub screen: Screen,
    pub login: LoginPage,
    pub overlay: OverlayWidgets,
    pub session: SessionPhase,
    pub overlay_attached: bool,
}

impl HostState {
    pub fn fatal_message(&self) -> Option<&str> {
        match &self.screen {
            Screen::Fatal { message, .. } => Some(message),
            Screen::Login => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_message().is_some()
    }
}
