//! Configuration for the conversation engine.
//!
//! Settings are an explicitly constructed value passed into the
//! controller at creation and refreshed via an explicit update call;
//! nothing in the engine reads a process-wide singleton.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User-facing settings: where the chat endpoint lives and how replies
/// are spoken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat endpoint host, including scheme (e.g. `http://localhost`).
    pub host: String,
    /// Chat endpoint port.
    pub port: u16,
    /// Identifier of the synthesis voice to speak replies with.
    ///
    /// Empty until the user picks one or the engine adopts the
    /// platform default voice.
    pub voice_id: String,
    /// Speech playback rate multiplier (1.0 = normal).
    pub rate: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_owned(),
            port: 8000,
            voice_id: String::new(),
            rate: 1.0,
        }
    }
}

impl Settings {
    /// Full endpoint base URL, host and port joined.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load settings from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::LarkError::Config(e.to_string()))
    }

    /// Save settings to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the settings cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LarkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default settings file path: `~/.config/lark/settings.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("lark").join("settings.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("lark")
                .join("settings.toml")
        } else {
            PathBuf::from("/tmp/lark-config/settings.toml")
        }
    }
}
