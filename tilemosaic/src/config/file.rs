//! Configuration file handling for ~/.tilemosaic/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::settings::ConfigFile;
use crate::downloader::DownloaderConfig;
use crate::retriever::RetrievalConfig;
use crate::source::WmsConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilemosaic/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilemosaic/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// The file as it would be written by [`Self::save_to`].
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// Runtime configuration for the download pool.
    pub fn to_downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig::default()
            .with_workers(self.download.workers)
            .with_retry_backoff(Duration::from_millis(self.download.retry_backoff_ms))
    }

    /// Runtime configuration for the retrieval service.
    pub fn to_retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::default()
            .with_workers(self.retrieval.workers)
            .with_fuzzy(self.retrieval.fuzzy)
            .with_downloader(self.to_downloader_config())
    }

    /// WMS connection settings, when both `url` and `layer` are configured.
    pub fn to_wms_config(&self) -> Option<WmsConfig> {
        let url = self.source.url.as_deref()?;
        let layer = self.source.layer.as_deref()?;
        Some(
            WmsConfig::new(url, layer)
                .with_format(self.source.format.clone())
                .with_max_retries(self.source.max_retries)
                .with_timeout(Duration::from_secs(self.source.timeout))
                .with_nudge(self.source.nudge_x, self.source.nudge_y),
        )
    }
}

/// Get the path to the config directory (~/.tilemosaic).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilemosaic")
}

/// Get the path to the config file (~/.tilemosaic/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert!(config.source.url.is_none());
        assert_eq!(config.source.format, DEFAULT_SOURCE_FORMAT);
        assert_eq!(config.source.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retrieval.workers, DEFAULT_RETRIEVAL_WORKERS);
        assert_eq!(config.download.workers, DEFAULT_DOWNLOAD_WORKERS);
        assert!(config.cache.enabled);
        assert!(config.cache.directory.ends_with(".tilemosaic/cache"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.source.url = Some("https://maps.example.org/wms".to_string());
        config.source.layer = Some("mola_color".to_string());
        config.source.nudge_x = 0.25;
        config.retrieval.fuzzy = false;
        config.download.workers = 12;
        config.cache.directory = temp_dir.path().join("tiles");
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_runtime_conversions() {
        let mut config = ConfigFile::default();
        config.retrieval.workers = 2;
        config.download.workers = 8;
        config.download.retry_backoff_ms = 5;

        let retrieval = config.to_retrieval_config();
        assert_eq!(retrieval.workers, 2);
        assert_eq!(retrieval.downloader.workers, 8);
        assert_eq!(retrieval.downloader.retry_backoff, Duration::from_millis(5));
    }

    #[test]
    fn test_wms_config_requires_url_and_layer() {
        let mut config = ConfigFile::default();
        assert!(config.to_wms_config().is_none());

        config.source.url = Some("http://x/wms".to_string());
        assert!(config.to_wms_config().is_none());

        config.source.layer = Some("mola".to_string());
        config.source.timeout = 9;
        let wms = config.to_wms_config().unwrap();
        assert_eq!(wms.layer, "mola");
        assert_eq!(wms.timeout, Duration::from_secs(9));
    }
}
