pub mod preferences;

pub use preferences::{
    CredentialPrefill, CredentialStore, KEY_REPOSITORY, KEY_SECRET, KEY_USERNAME,
    LOGIN_NAMESPACE, MemoryPreferenceStore, PreferenceError, PreferenceStore, YamlPreferenceStore,
};

use crate::models::{BridgeSettings, SavedInstanceState};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;
use std::sync::Arc;

/// Prefix of environment variables overriding settings, e.g. `PROOFREAD__DISPLAY__WIDTH`.
pub const ENV_PREFIX: &str = "PROOFREAD";

/// Configuration manager for the bridge's YAML files.
///
/// Manages, under one data directory:
/// - Settings (`bridge.yaml`), overridable from the environment
/// - Preference namespaces (`prefs/<namespace>.yaml`), including the login pre-fill
/// - The saved instance state (`instance_state.yaml`)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    prefs_dir: Utf8PathBuf,
    instance_state_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified data directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "Proofread Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("bridge.yaml"),
            prefs_dir: config_dir.join("prefs"),
            instance_state_path: config_dir.join("instance_state.yaml"),
            config_dir,
        })
    }

    /// Load settings from `bridge.yaml` layered under `PROOFREAD__*` environment variables.
    ///
    /// A missing file yields the defaults.
    pub fn load_settings(&self) -> Result<BridgeSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: BridgeSettings = Config::builder()
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save settings to `bridge.yaml`.
    pub fn save_settings(&self, settings: &BridgeSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Preference store rooted at `prefs/`.
    pub fn preference_store(&self) -> YamlPreferenceStore {
        YamlPreferenceStore::new(&self.prefs_dir)
    }

    /// Credential store over the YAML preference files.
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(Arc::new(self.preference_store()))
    }

    /// Write the save/restore record.
    pub fn save_instance_state(&self, state: &SavedInstanceState) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(state)
            .context("Failed to serialize instance state to YAML")?;

        fs::write(&self.instance_state_path, yaml_string).with_context(|| {
            format!(
                "Failed to write instance state: {}",
                self.instance_state_path
            )
        })?;

        tracing::debug!("Saved instance state to {}", self.instance_state_path);
        Ok(())
    }

    /// Read the save/restore record, if one was written.
    pub fn load_instance_state(&self) -> Result<Option<SavedInstanceState>> {
        if !self.instance_state_path.exists() {
            return Ok(None);
        }

        let file_contents = fs::read_to_string(&self.instance_state_path).with_context(|| {
            format!("Failed to read instance state: {}", self.instance_state_path)
        })?;

        let state: SavedInstanceState =
            serde_yaml_ng::from_str(&file_contents).with_context(|| {
                format!(
                    "Failed to parse instance state: {}",
                    self.instance_state_path
                )
            })?;

        tracing::info!("Restored instance state from {}", self.instance_state_path);
        Ok(Some(state))
    }

    /// Forget the save/restore record. A fatal record is never cleared by the bridge itself.
    pub fn clear_instance_state(&self) -> Result<()> {
        if self.instance_state_path.exists() {
            fs::remove_file(&self.instance_state_path).with_context(|| {
                format!(
                    "Failed to remove instance state: {}",
                    self.instance_state_path
                )
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
