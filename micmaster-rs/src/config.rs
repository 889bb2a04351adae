//! Configuration loading and management

use crate::update::{ApplyOptions, DEFAULT_RELEASES_URL};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "MICMASTER_DATA_DIR";

/// Overrides the "latest release" endpoint.
pub const RELEASES_URL_ENV: &str = "MICMASTER_RELEASES_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine a configuration directory for this user")]
    NoDataDir,

    #[error("Failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding settings, log and update files
    pub data_dir: PathBuf,

    pub settings_path: PathBuf,

    pub log_path: PathBuf,

    /// Where a downloaded update is written
    pub update_artifact_path: PathBuf,

    /// Copy of the running executable that performs the update
    pub updater_path: PathBuf,

    pub releases_url: String,

    pub current_version: String,

    pub auto_mute_period: Duration,

    /// Longest the control loop blocks waiting for events
    pub drain_interval: Duration,

    pub http_timeout: Duration,

    pub apply: ApplyOptions,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("MicMaster"),
        };

        let mut config = Self::with_data_dir(data_dir);
        if let Ok(url) = std::env::var(RELEASES_URL_ENV) {
            if !url.trim().is_empty() {
                config.releases_url = url;
            }
        }
        Ok(config)
    }

    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let exe = std::env::consts::EXE_SUFFIX;
        Self {
            settings_path: data_dir.join("settings.json"),
            log_path: data_dir.join("app.log"),
            update_artifact_path: data_dir.join(format!("MicMaster_update{exe}")),
            updater_path: data_dir.join(format!("MicMaster_updater{exe}")),
            data_dir,
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            auto_mute_period: Duration::from_secs(5),
            drain_interval: Duration::from_millis(50),
            http_timeout: Duration::from_secs(10),
            apply: ApplyOptions::default(),
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::CreateDir {
            path: self.data_dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = Config::with_data_dir("/tmp/micmaster");
        assert_eq!(config.settings_path, Path::new("/tmp/micmaster/settings.json"));
        assert_eq!(config.log_path, Path::new("/tmp/micmaster/app.log"));
        assert!(config
            .update_artifact_path
            .to_string_lossy()
            .contains("MicMaster_update"));
        assert_eq!(config.auto_mute_period, Duration::from_secs(5));
        assert_eq!(config.apply.max_attempts, 30);
        assert_eq!(config.current_version, "1.0.5");
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path().join("nested").join("MicMaster"));
        config.ensure_dirs().unwrap();
        assert!(config.data_dir.is_dir());
    }
}
