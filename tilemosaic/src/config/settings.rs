//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Map source settings
    pub source: SourceSettings,
    /// Retrieval pool settings
    pub retrieval: RetrievalSettings,
    /// Download pool settings
    pub download: DownloadSettings,
    /// Cache settings
    pub cache: CacheSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// WMS source configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// GetMap endpoint URL
    pub url: Option<String>,
    /// WMS layer name
    pub layer: Option<String>,
    /// Image MIME type
    pub format: String,
    /// Fetch attempts per tile
    pub max_retries: u32,
    /// Timeout in seconds for each fetch attempt
    pub timeout: u64,
    /// Longitude correction in degrees
    pub nudge_x: f64,
    /// Latitude correction in degrees
    pub nudge_y: f64,
}

/// Retrieval pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    /// Requests partitioned concurrently
    pub workers: usize,
    /// Look up stale placeholders for tiles not cached at this resolution
    pub fuzzy: bool,
}

/// Download pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// Concurrent tile downloads
    pub workers: usize,
    /// Base retry delay in milliseconds
    pub retry_backoff_ms: u64,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Use the disk cache
    pub enabled: bool,
    /// Cache directory path
    pub directory: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
