//! Configuration management for overlay input
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.
//! The `input` section mirrors the host application's settings surface; the
//! `timing` section exposes the poller and retry constants.

pub mod watcher;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Input settings as exposed to the user
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputSettings {
    #[serde(default = "default_true")]
    pub enable_custom_hotkey: bool,
    #[serde(default = "default_hotkey")]
    pub custom_hotkey: String,
    #[serde(default = "default_true")]
    pub use_controller_to_open: bool,
    #[serde(default = "default_combo")]
    pub controller_combo: String,
}

/// Poller intervals and hotkey retry policy
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval")]
    pub toggle_poll_interval_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub navigation_poll_interval_ms: u64,
    /// 0 disables the navigation cooldown
    #[serde(default = "default_navigation_cooldown")]
    pub navigation_cooldown_ms: u64,
    #[serde(default = "default_retry_interval")]
    pub hotkey_retry_interval_ms: u64,
    #[serde(default = "default_retry_limit")]
    pub hotkey_retry_limit: u32,
}

/// Input configuration consumed by the listener
///
/// Replaced wholesale on every `apply_settings` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Gesture to register, `None` when the custom hotkey is off
    pub custom_hotkey: Option<String>,
    pub controller_toggle_enabled: bool,
    pub controller_combo: String,
}

/// Config shared between the listener and its toggle poller
pub type SharedInputConfig = Arc<RwLock<InputConfig>>;

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            enable_custom_hotkey: default_true(),
            custom_hotkey: default_hotkey(),
            use_controller_to_open: default_true(),
            controller_combo: default_combo(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            toggle_poll_interval_ms: default_poll_interval(),
            navigation_poll_interval_ms: default_poll_interval(),
            navigation_cooldown_ms: default_navigation_cooldown(),
            hotkey_retry_interval_ms: default_retry_interval(),
            hotkey_retry_limit: default_retry_limit(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::from(&InputSettings::default())
    }
}

impl From<&InputSettings> for InputConfig {
    fn from(settings: &InputSettings) -> Self {
        let gesture = settings.custom_hotkey.trim();
        let custom_hotkey = if settings.enable_custom_hotkey && !gesture.is_empty() {
            Some(gesture.to_string())
        } else {
            None
        };

        Self {
            custom_hotkey,
            controller_toggle_enabled: settings.use_controller_to_open,
            controller_combo: settings.controller_combo.clone(),
        }
    }
}

impl TimingConfig {
    pub fn toggle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.toggle_poll_interval_ms)
    }

    pub fn navigation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.navigation_poll_interval_ms)
    }

    /// `None` when the cooldown is disabled
    pub fn navigation_cooldown(&self) -> Option<Duration> {
        (self.navigation_cooldown_ms > 0).then(|| Duration::from_millis(self.navigation_cooldown_ms))
    }

    pub fn hotkey_retry_interval(&self) -> Duration {
        Duration::from_millis(self.hotkey_retry_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        let timing = &self.timing;

        if timing.toggle_poll_interval_ms == 0 {
            anyhow::bail!("timing.toggle_poll_interval_ms must be greater than 0");
        }
        if timing.navigation_poll_interval_ms == 0 {
            anyhow::bail!("timing.navigation_poll_interval_ms must be greater than 0");
        }
        if timing.hotkey_retry_interval_ms == 0 {
            anyhow::bail!("timing.hotkey_retry_interval_ms must be greater than 0");
        }

        // Unknown combo names are allowed (the chord just never fires), but worth a warning
        if self.input.use_controller_to_open
            && crate::input::combo::resolve(&self.input.controller_combo).is_empty()
        {
            tracing::warn!(
                "⚠️  Unrecognized controller_combo '{}' (known: {}); controller toggle will never fire",
                self.input.controller_combo,
                crate::input::combo::known_names().join(", ")
            );
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_hotkey() -> String { "Ctrl+Shift+O".to_string() }
fn default_combo() -> String { "Start+Back".to_string() }
fn default_poll_interval() -> u64 { 100 }
fn default_navigation_cooldown() -> u64 { 150 }
fn default_retry_interval() -> u64 { 500 }
fn default_retry_limit() -> u32 { 10 }
