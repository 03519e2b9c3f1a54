//! Configuration management for HostPulse
//!
//! Handles:
//! - Per-dimension thresholds and enabled checks
//! - Cooldown window and alert recipient
//! - First-run bootstrap of a default file
//! - OS-specific default locations (config file, cooldown state)

use crate::metrics::MetricId;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "HOSTPULSE_CONFIG";

const DEFAULT_CONFIG_HEADER: &str = "\
# HostPulse configuration
# Set `recipient` (phone number or Apple ID) to enable iMessage alerts.
# Leave it empty to only print alerts locally.

";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the {0} directory")]
    NoDefaultDir(&'static str),
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write default config {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config {path:?} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config {path:?} is invalid: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recipient: String,
    pub cooldown_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub checks: Checks,
    pub sampling: SamplingConfig,
}

/// One threshold per alertable dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub temperature_c: f64,
    pub battery_below: u8,
}

/// Enabled checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checks {
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    pub temperature: bool,
    pub battery: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Filesystem path whose usage is reported as `disk`
    pub disk_path: PathBuf,
}

/// Result of loading the config file
#[derive(Debug)]
pub enum ConfigLoad {
    Loaded(Settings),
    /// No file existed; a default one was written at this path
    Created(PathBuf),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            cooldown_minutes: 30,
            state_file: None,
            thresholds: Thresholds::default(),
            checks: Checks::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 85.0,
            disk_percent: 80.0,
            temperature_c: 90.0,
            battery_below: 20,
        }
    }
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            cpu: true,
            memory: true,
            disk: true,
            temperature: true,
            battery: true,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from("/"),
        }
    }
}

impl Checks {
    pub fn is_enabled(&self, metric: MetricId) -> bool {
        match metric {
            MetricId::Cpu => self.cpu,
            MetricId::Memory => self.memory,
            MetricId::Disk => self.disk,
            MetricId::Temperature => self.temperature,
            MetricId::Battery => self.battery,
        }
    }
}

impl Settings {
    /// Load the config, writing a default file when none exists
    pub async fn load_or_bootstrap(path: &Path) -> Result<ConfigLoad, ConfigError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Self::load(path).await.map(ConfigLoad::Loaded);
        }

        Settings::default().save(path).await?;
        info!("Created default configuration at {:?}", path);
        Ok(ConfigLoad::Created(path.to_path_buf()))
    }

    /// Load and validate an existing config file
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        settings.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(settings)
    }

    /// Write the config, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = format!("{}{}", DEFAULT_CONFIG_HEADER, toml::to_string_pretty(self)?);

        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, content).await
        };
        write.await.map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        let t = &self.thresholds;
        for (name, value) in [
            ("thresholds.cpu_percent", t.cpu_percent),
            ("thresholds.memory_percent", t.memory_percent),
            ("thresholds.disk_percent", t.disk_percent),
            ("thresholds.temperature_c", t.temperature_c),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if t.battery_below > 100 {
            return Err(format!(
                "thresholds.battery_below must be at most 100, got {}",
                t.battery_below
            ));
        }
        if self.sampling.disk_path.as_os_str().is_empty() {
            return Err("sampling.disk_path must not be empty".to_string());
        }
        Ok(())
    }

    /// Configured recipient, `None` when blank
    pub fn recipient(&self) -> Option<&str> {
        let recipient = self.recipient.trim();
        (!recipient.is_empty()).then_some(recipient)
    }

    /// Cooldown state file location
    pub fn state_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => {
                let mut path =
                    dirs::data_local_dir().ok_or(ConfigError::NoDefaultDir("local data"))?;
                path.push("hostpulse");
                path.push("state.json");
                Ok(path)
            }
        }
    }

    /// Config file location: `$HOSTPULSE_CONFIG`, else the OS config directory
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::platform_config_file_path(),
        }
    }

    /// Default location, ignoring the environment override
    pub fn platform_config_file_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoDefaultDir("config"))?;
        path.push("hostpulse");
        path.push("config.toml");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Settings::default();
        assert_eq!(config.cooldown_minutes, 30);
        assert_eq!(config.thresholds.cpu_percent, 90.0);
        assert_eq!(config.thresholds.battery_below, 20);
        assert!(config.checks.is_enabled(MetricId::Battery));
        assert_eq!(config.recipient(), None);
    }

    #[test]
    fn test_config_file_path() {
        let path = Settings::platform_config_file_path().unwrap();
        assert!(path.to_string_lossy().contains("hostpulse"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_partial_config_uses_defaults_and_ignores_unknown_keys() {
        let settings: Settings = toml::from_str(
            r#"
            recipient = "+15551234567"
            poll_seconds = 60

            [thresholds]
            cpu_percent = 75
            gpu_percent = 70

            [checks]
            battery = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.recipient(), Some("+15551234567"));
        assert_eq!(settings.thresholds.cpu_percent, 75.0);
        assert_eq!(settings.thresholds.memory_percent, 85.0);
        assert!(!settings.checks.battery);
        assert!(settings.checks.cpu);
        assert_eq!(settings.cooldown_minutes, 30);
    }

    #[test]
    fn test_blank_recipient_is_none() {
        let settings = Settings {
            recipient: "   ".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.recipient(), None);
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        let mut settings = Settings::default();
        settings.thresholds.disk_percent = -1.0;
        assert!(settings.validate().unwrap_err().contains("disk_percent"));

        let mut settings = Settings::default();
        settings.thresholds.battery_below = 150;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_state_file() {
        let settings = Settings {
            state_file: Some(PathBuf::from("/tmp/pulse.json")),
            ..Settings::default()
        };
        assert_eq!(settings.state_path().unwrap(), PathBuf::from("/tmp/pulse.json"));
    }

    #[tokio::test]
    async fn test_bootstrap_writes_default_then_loads_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        match Settings::load_or_bootstrap(&path).await.unwrap() {
            ConfigLoad::Created(created) => assert_eq!(created, path),
            other => panic!("expected bootstrap, got {:?}", other),
        }

        match Settings::load_or_bootstrap(&path).await.unwrap() {
            ConfigLoad::Loaded(settings) => assert_eq!(settings, Settings::default()),
            other => panic!("expected loaded config, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsable_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "thresholds = [not toml").unwrap();

        let err = Settings::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_invalid_values_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[thresholds]\ncpu_percent = -5\n").unwrap();

        let err = Settings::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
