//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilemosaic::cache::CacheError;
use tilemosaic::config::ConfigFileError;
use tilemosaic::request::RequestError;
use tilemosaic::source::HttpError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Invalid request arguments
    Request(RequestError),
    /// Failed to build the HTTP client
    HttpClient(HttpError),
    /// Failed to open the disk cache
    CacheInit(CacheError),
    /// Failed to clear the disk cache
    CacheClear(String),
    /// Failed to read disk cache statistics
    CacheStats(String),
    /// Interrupted before the composite finished
    Cancelled,
    /// Failed to write the output image
    FileWrite {
        path: String,
        error: image::ImageError,
    },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(_) = self {
            eprintln!();
            eprintln!("Run 'tilemosaic config init' to create a config file, then set");
            eprintln!("[source] url and layer, or pass --url and --layer.");
        }

        let code = match self {
            CliError::Cancelled => 130,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Request(e) => write!(f, "Invalid request: {}", e),
            CliError::HttpClient(e) => write!(f, "{}", e),
            CliError::CacheInit(e) => write!(f, "Failed to open cache: {}", e),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
            CliError::Cancelled => write!(f, "Interrupted"),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Request(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::CacheInit(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<RequestError> for CliError {
    fn from(e: RequestError) -> Self {
        CliError::Request(e)
    }
}
