use crate::models::{
    ActionCode, ActionCommand, Credentials, GeometryBatch, RepositoryLocator,
};
use crate::services::engine::{CommandSink, Engine, EngineRejection};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Rejection message for an unparsable repository locator.
pub const REPOSITORY_INVALID: &str = "repository invalid";

/// In-process engine speaking the bridge protocol.
///
/// Validates the locator on open, then replays a command script from its own
/// thread through the attached sink. Stops early once the host reports it is
/// finishing. Keeps the last geometry table it was sent.
pub struct LoopbackEngine {
    sink: Mutex<Option<CommandSink>>,
    script: Option<Vec<ActionCommand>>,
    fatal_ending: Option<String>,
    step_delay: Duration,
    geometry: Mutex<Option<GeometryBatch>>,
    worker: Mutex<Option<JoinHandle<usize>>>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            script: None,
            fatal_ending: None,
            step_delay: Duration::from_millis(20),
            geometry: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Replay this script instead of the one derived from the locator.
    pub fn with_script(mut self, script: Vec<ActionCommand>) -> Self {
        self.script = Some(script);
        self
    }

    /// End the script with a fatal termination.
    pub fn ending_with_fatal(mut self, message: impl Into<String>) -> Self {
        self.fatal_ending = Some(message.into());
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Commands a real engine emits while loading a repository.
    pub fn default_script(locator: &RepositoryLocator) -> Vec<ActionCommand> {
        let mut script = vec![
            ActionCommand::of(ActionCode::ShowOpeningProgress, ""),
            ActionCommand::of(ActionCode::SetTitle, locator.to_string()),
            ActionCommand::of(ActionCode::ShowModelProgress, ""),
            ActionCommand::of(ActionCode::StartImageProgress, "-1"),
            ActionCommand::of(ActionCode::StartImageProgress, "0"),
        ];
        script.extend(
            [250, 500, 750, 1000]
                .into_iter()
                .map(|v| ActionCommand::of(ActionCode::UpdateImageProgress, v.to_string())),
        );
        script.extend([
            ActionCommand::of(ActionCode::UpdateImageProgress, "1001"),
            ActionCommand::of(ActionCode::HideModelProgress, ""),
            ActionCommand::of(ActionCode::SetPrimaryValue, "0.0"),
            ActionCommand::of(ActionCode::SetSecondaryValue, "0"),
        ]);
        script
    }

    /// Last geometry table received, if any.
    pub fn last_geometry(&self) -> Option<GeometryBatch> {
        self.geometry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait for the script thread to finish. Returns the number of commands it sent.
    pub fn wait_idle(&self) -> usize {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match worker.map(JoinHandle::join) {
            Some(Ok(sent)) => sent,
            Some(Err(_)) => {
                tracing::error!("Loopback engine thread panicked");
                0
            }
            None => 0,
        }
    }

    fn spawn_script(&self, sink: CommandSink, script: Vec<ActionCommand>) {
        let delay = self.step_delay;
        let spawned = std::thread::Builder::new()
            .name("loopback-engine".into())
            .spawn(move || {
                let mut sent = 0;
                for command in script {
                    std::thread::sleep(delay);
                    if sink.apply(ActionCode::QueryFinishing.code(), "") == 1 {
                        tracing::debug!("Host is finishing, stopping script");
                        break;
                    }
                    sink.apply(command.code, &command.argument);
                    sent += 1;
                }
                sent
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            Err(e) => tracing::error!("Failed to spawn loopback engine thread: {}", e),
        }
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for LoopbackEngine {
    fn attach(&self, sink: CommandSink) {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn open(&self, credentials: &Credentials) -> Result<(), EngineRejection> {
        let locator = RepositoryLocator::parse(&credentials.repository).map_err(|e| {
            tracing::debug!("Locator {:?} rejected: {}", credentials.repository, e);
            EngineRejection::new(REPOSITORY_INVALID)
        })?;
        if credentials.username.is_empty() {
            return Err(EngineRejection::new("user name required"));
        }

        let Some(sink) = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            return Err(EngineRejection::new("no command sink attached"));
        };

        let mut script = self
            .script
            .clone()
            .unwrap_or_else(|| Self::default_script(&locator));
        if let Some(message) = &self.fatal_ending {
            script.push(ActionCommand::of(ActionCode::FatalTermination, message.clone()));
        }

        tracing::info!("Loopback engine opened {}", locator);
        self.spawn_script(sink, script);
        Ok(())
    }

    fn report_geometry(&self, records: &[i32]) {
        match GeometryBatch::from_flat(records) {
            Ok(batch) => {
                tracing::trace!("Loopback engine received {} hit rects", batch.len());
                *self.geometry.lock().unwrap_or_else(PoisonError::into_inner) = Some(batch);
            }
            Err(e) => tracing::warn!("Loopback engine rejected geometry: {}", e),
        }
    }
}
