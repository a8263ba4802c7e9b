//! Download pool configuration.

use crate::config::{DEFAULT_DOWNLOAD_WORKERS, DEFAULT_RETRY_BACKOFF_MS};
use std::time::Duration;

/// Configuration for the shared download pool.
///
/// # Example
///
/// ```
/// use tilemosaic::downloader::DownloaderConfig;
/// use std::time::Duration;
///
/// let config = DownloaderConfig::default()
///     .with_workers(8)
///     .with_retry_backoff(Duration::from_millis(10));
/// assert_eq!(config.workers, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Concurrent fetches across all requests
    pub workers: usize,
    /// Delay before the first retry; doubles for each later retry
    pub retry_backoff: Duration,
}

impl DownloaderConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Delay before attempt `attempt` (zero-based; attempt 0 has none).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = (attempt - 1).min(16);
        self.retry_backoff.saturating_mul(1 << shift)
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_DOWNLOAD_WORKERS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.workers, 50);
        assert_eq!(config.retry_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles() {
        let config = DownloaderConfig::default().with_retry_backoff(Duration::from_millis(10));
        assert_eq!(config.backoff_for(0), Duration::ZERO);
        assert_eq!(config.backoff_for(1), Duration::from_millis(10));
        assert_eq!(config.backoff_for(2), Duration::from_millis(20));
        assert_eq!(config.backoff_for(3), Duration::from_millis(40));
    }

    #[test]
    fn test_workers_at_least_one() {
        assert_eq!(DownloaderConfig::default().with_workers(0).workers, 1);
    }
}
