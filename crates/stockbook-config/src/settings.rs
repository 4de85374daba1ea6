//! Runtime-mutable application settings
//!
//! Unlike the static YAML config, these change while the service runs (the
//! blocking date moves forward as periods are closed) and are persisted to a
//! small JSON document so they survive restarts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// The date through which balances are closed and safe to cache.
    /// `None` means no period has been closed yet.
    #[serde(default)]
    pub blocking_date: Option<NaiveDateTime>,
    /// Default export format for reference-data downloads
    #[serde(default = "default_export_format")]
    pub export_format: String,
}

fn default_export_format() -> String {
    "csv".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            blocking_date: None,
            export_format: default_export_format(),
        }
    }
}

/// JSON-file-backed store for [`AppSettings`]
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: AppSettings,
}

impl SettingsStore {
    /// Open the store, loading the file if it exists.
    ///
    /// A missing or unreadable file is not an error: the store starts from
    /// defaults and the first `save` creates the file.
    pub fn open(path: PathBuf) -> Self {
        let settings = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Settings file {} is invalid, using defaults: {}", path.display(), e);
                    AppSettings::default()
                }
            },
            Err(_) => {
                log::debug!("Settings file {} not found, using defaults", path.display());
                AppSettings::default()
            }
        };

        Self { path, settings }
    }

    /// Current settings
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// The blocking date, if one is set
    pub fn blocking_date(&self) -> Option<NaiveDateTime> {
        self.settings.blocking_date
    }

    /// Set the blocking date and persist
    pub fn set_blocking_date(&mut self, date: Option<NaiveDateTime>) -> Result<(), ConfigError> {
        self.settings.blocking_date = date;
        self.save()
    }

    /// Replace the settings wholesale and persist
    pub fn update(&mut self, settings: AppSettings) -> Result<(), ConfigError> {
        self.settings = settings;
        self.save()
    }

    /// Write the settings file
    pub fn save(&self) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(&self.settings).map_err(|_| ConfigError::IoError)?;
        std::fs::write(&self.path, content).map_err(|_| ConfigError::IoError)?;
        Ok(())
    }
}

// ==================== Tests ====================
