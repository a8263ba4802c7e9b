//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;

// =============================================================================
// Source defaults
// =============================================================================

/// Default image format requested from WMS servers.
pub const DEFAULT_SOURCE_FORMAT: &str = "image/png";

/// Default fetch attempts per tile.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default timeout for a single fetch attempt, in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Pool sizes
// =============================================================================

/// Default number of requests partitioned and dispatched concurrently.
pub const DEFAULT_RETRIEVAL_WORKERS: usize = 5;

/// Default number of concurrent tile downloads, shared by all requests.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 50;

/// Default base delay between fetch attempts, in milliseconds.
///
/// Doubles on each retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// Whether stale placeholder tiles are looked up by default.
pub const DEFAULT_FUZZY_ENABLED: bool = true;

// =============================================================================
// Cache and logging
// =============================================================================

/// Whether the disk tile cache is used by default.
pub const DEFAULT_CACHE_ENABLED: bool = true;

/// Cache subdirectory under the config directory.
pub const DEFAULT_CACHE_DIR_NAME: &str = "cache";

/// Log file name under the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "tilemosaic.log";

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            source: SourceSettings {
                url: None,
                layer: None,
                format: DEFAULT_SOURCE_FORMAT.to_string(),
                max_retries: DEFAULT_MAX_RETRIES,
                timeout: DEFAULT_SOURCE_TIMEOUT_SECS,
                nudge_x: 0.0,
                nudge_y: 0.0,
            },
            retrieval: RetrievalSettings {
                workers: DEFAULT_RETRIEVAL_WORKERS,
                fuzzy: DEFAULT_FUZZY_ENABLED,
            },
            download: DownloadSettings {
                workers: DEFAULT_DOWNLOAD_WORKERS,
                retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            },
            cache: CacheSettings {
                enabled: DEFAULT_CACHE_ENABLED,
                directory: config_dir.join(DEFAULT_CACHE_DIR_NAME),
            },
            logging: LoggingSettings {
                file: config_dir.join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
