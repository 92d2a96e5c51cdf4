use serde::{Deserialize, Serialize};

/// Bridge settings, loaded from `bridge.yaml` plus `PROOFREAD__*` environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Directory holding preference files and the saved instance state
    pub data_dir: String,

    pub logging: LoggingSettings,

    pub display: DisplaySettings,

    /// Panic on engine protocol violations instead of logging and ignoring them
    pub strict_protocol: bool,

    pub metrics_summary_on_exit: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            data_dir: "Proofread Data".to_string(),
            logging: LoggingSettings::default(),
            display: DisplaySettings::default(),
            strict_protocol: cfg!(debug_assertions),
            metrics_summary_on_exit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug_mode: bool,
    pub console_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "proofread-bridge".to_string(),
            debug_mode: false,
            console_output: true,
        }
    }
}

/// Display size in device pixels; the overlay is sized to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub width: i32,
    pub height: i32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}
