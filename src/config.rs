// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;
use crate::drivers::{SerialSettings, DEFAULT_MAX_RANGE, DEFAULT_RESOLUTION};
use crate::types::{PollInterval, SourceKind};

pub const CONFIG_ENV: &str = "VOLTAGE_READER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "voltage_reader.json";
/// Keysight 34461A, serial MY55060040
pub const DEFAULT_RESOURCE: &str = "USB0::0x0957::0xB318::MY55060040::INSTR";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceKind,
    pub resource: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub max_range: f64,
    pub resolution: f64,
    pub buffer_capacity: usize,
    pub default_interval: PollInterval,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            resource: DEFAULT_RESOURCE.to_owned(),
            baud_rate: 9600,
            read_timeout_ms: 2_000,
            max_range: DEFAULT_MAX_RANGE,
            resolution: DEFAULT_RESOLUTION,
            buffer_capacity: DEFAULT_CAPACITY,
            default_interval: PollInterval::default(),
        }
    }
}

impl AppConfig {
    /// Reads the settings file named by `VOLTAGE_READER_CONFIG`, or
    /// `voltage_reader.json` in the working directory. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn serial(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_range, 100.0);
        assert_eq!(config.resolution, 3.0e-5);
        assert_eq!(config.buffer_capacity, 100);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "source": "hardware", "resource": "ASRL/dev/ttyUSB0::INSTR", "default_interval": "1 s" }"#,
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.source, SourceKind::Hardware);
        assert_eq!(config.resource, "ASRL/dev/ttyUSB0::INSTR");
        assert_eq!(config.default_interval, PollInterval::S1);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.serial().read_timeout, Duration::from_secs(2));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid settings file"));
    }
}
