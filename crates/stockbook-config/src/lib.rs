//! Configuration management for stockbook
//!
//! Two layers live here: the static YAML `Config` loaded once at startup,
//! and the runtime-mutable `AppSettings` (blocking date, default export
//! format) persisted as a JSON document through `SettingsStore`.

pub mod error;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::{ConfigError, ConfigErrorCode, ConfigErrorSeverity, ConfigResult};
pub use settings::{AppSettings, SettingsStore};

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Data file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the single-slot balance checkpoint file
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    /// Path to the runtime settings file
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    /// Seed the ledger with the demo reference set on startup
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("balances_cache.json")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.json")
}

fn default_true() -> bool {
    true
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            checkpoint_file: default_checkpoint_file(),
            settings_file: default_settings_file(),
            seed_demo_data: default_true(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Data file locations
    #[serde(default)]
    pub data: DataConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
            path: path.to_string_lossy().to_string(),
        })?;

        let config: Config = serde_yaml::from_str(&content).map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.data.checkpoint_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "data.checkpoint_file".to_string(),
                reason: "Checkpoint file path must not be empty".to_string(),
            });
        }

        if self.data.settings_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "data.settings_file".to_string(),
                reason: "Settings file path must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.data.checkpoint_file, PathBuf::from("balances_cache.json"));
        assert!(config.data.seed_demo_data);
    }

    #[test]
    fn test_default_matches_section_absent_yaml() {
        // Config::default() is the no-config-file startup path; it must
        // agree with the serde field defaults used for absent sections
        let fallback = Config::default();
        assert!(fallback.validate().is_ok());
        assert_eq!(fallback.server.host, "0.0.0.0");
        assert_eq!(fallback.server.port, 8080);
        assert_eq!(fallback.data.checkpoint_file, PathBuf::from("balances_cache.json"));
        assert_eq!(fallback.data.settings_file, PathBuf::from("settings.json"));
        assert!(fallback.data.seed_demo_data);
        assert_eq!(fallback.logging.level, "info");

        let parsed: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(parsed.server.port, fallback.server.port);
        assert_eq!(parsed.data.checkpoint_file, fallback.data.checkpoint_file);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "server:\n  port: 9000\ndata:\n  checkpoint_file: /tmp/cp.json\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.data.checkpoint_file, PathBuf::from("/tmp/cp.json"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let yaml = "server:\n  port: 0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_error() {
        let err = Config::load(PathBuf::from("/nonexistent/stockbook.yaml")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::FileNotFound);
    }
}
