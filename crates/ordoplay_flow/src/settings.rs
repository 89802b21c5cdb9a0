// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime settings for flow graphs.
//!
//! Stored as RON next to the project so designers can toggle diagnostics
//! without rebuilding.

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "flow_settings.ron";

/// Flow runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Format version
    pub version: u32,
    /// Log a note when a disabled node drops a signal
    pub log_on_signal_disabled: bool,
    /// Log a note when a pass-through node forwards a signal
    pub log_on_signal_passthrough: bool,
    /// Keep per-pin activation logs
    pub record_pin_activations: bool,
    /// Nested deliveries allowed before a signal is dropped
    pub max_propagation_depth: usize,
    /// Queued deliveries to busy nodes allowed per dispatch
    pub max_deferred_signals: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            log_on_signal_disabled: false,
            log_on_signal_passthrough: false,
            record_pin_activations: cfg!(debug_assertions),
            max_propagation_depth: 256,
            max_deferred_signals: 4096,
        }
    }
}

impl FlowSettings {
    /// Settings with every diagnostic switched on
    pub fn verbose() -> Self {
        Self {
            log_on_signal_disabled: true,
            log_on_signal_passthrough: true,
            record_pin_activations: true,
            ..Self::default()
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        ron::ser::to_string_pretty(self, config)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self> {
        let settings: FlowSettings = ron::from_str(s)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(FlowError::UnsupportedFileVersion {
                kind: "Settings",
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::debug!(path = %path.display(), "Loaded flow settings");
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
