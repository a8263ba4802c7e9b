//! Retrieval service configuration.

use crate::config::{DEFAULT_FUZZY_ENABLED, DEFAULT_RETRIEVAL_WORKERS};
use crate::downloader::DownloaderConfig;

/// Configuration for [`RetrievalService`](super::RetrievalService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Retrievals partitioning and dispatching at the same time
    pub workers: usize,
    /// Whether stale placeholders are looked up for uncached tiles
    pub fuzzy: bool,
    /// Shared download pool settings
    pub downloader: DownloaderConfig,
}

impl RetrievalConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_downloader(mut self, downloader: DownloaderConfig) -> Self {
        self.downloader = downloader;
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_RETRIEVAL_WORKERS,
            fuzzy: DEFAULT_FUZZY_ENABLED,
            downloader: DownloaderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.workers, 5);
        assert!(config.fuzzy);
        assert_eq!(config.downloader.workers, 50);
    }

    #[test]
    fn test_builders() {
        let config = RetrievalConfig::default()
            .with_workers(0)
            .with_fuzzy(false)
            .with_downloader(DownloaderConfig::default().with_workers(3));
        assert_eq!(config.workers, 1);
        assert!(!config.fuzzy);
        assert_eq!(config.downloader.workers, 3);
    }
}
