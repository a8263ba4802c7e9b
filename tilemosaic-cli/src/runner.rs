//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and construction of
//! the map source and retrieval service.

use crate::error::CliError;
use std::path::Path;
use std::sync::Arc;
use tilemosaic::cache::{DiskTileCache, NoOpTileCache, TileCache};
use tilemosaic::config::{ConfigFile, DEFAULT_LOG_FILE_NAME};
use tilemosaic::logging::{init_logging, LoggingGuard};
use tilemosaic::retriever::RetrievalService;
use tilemosaic::source::{AsyncReqwestClient, MapSource, WmsMapSource};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the config file and starts logging.
    ///
    /// Logs go to the configured file; they are echoed to stdout only in
    /// debug mode so progress output stays readable.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string());

        let logging_guard = init_logging(log_dir, &log_file, debug_mode, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilemosaic v{}", tilemosaic::VERSION);
        info!("tilemosaic CLI: {} command", command);
    }

    /// Builds the WMS source from config, with command-line overrides.
    pub fn create_source(
        &self,
        url: Option<String>,
        layer: Option<String>,
    ) -> Result<Arc<dyn MapSource>, CliError> {
        let mut config = self.config.clone();
        if url.is_some() {
            config.source.url = url;
        }
        if layer.is_some() {
            config.source.layer = layer;
        }

        let wms = config.to_wms_config().ok_or_else(|| {
            CliError::Config("no map source configured (missing url or layer)".to_string())
        })?;
        let client = AsyncReqwestClient::new(wms.timeout).map_err(CliError::HttpClient)?;

        info!(url = %wms.base_url, layer = %wms.layer, "Using WMS source");
        Ok(Arc::new(WmsMapSource::new(client, wms)))
    }

    /// Builds the retrieval service. Must be called inside the runtime.
    pub fn create_service(
        &self,
        no_cache: bool,
        no_fuzzy: bool,
    ) -> Result<RetrievalService, CliError> {
        let cache: Arc<dyn TileCache> = if no_cache || !self.config.cache.enabled {
            info!("Disk cache disabled");
            Arc::new(NoOpTileCache::new())
        } else {
            let dir = &self.config.cache.directory;
            info!(directory = %dir.display(), "Using disk cache");
            Arc::new(DiskTileCache::new(dir.clone()).map_err(CliError::CacheInit)?)
        };

        let config = self.config.to_retrieval_config();
        let fuzzy = config.fuzzy && !no_fuzzy;
        Ok(RetrievalService::new(config.with_fuzzy(fuzzy), cache))
    }
}
