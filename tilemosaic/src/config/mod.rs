//! Configuration for tilemosaic.
//!
//! User settings live in an INI file at `~/.tilemosaic/config.ini`:
//!
//! ```ini
//! [source]
//! url = https://maps.example.org/wms
//! layer = mola_shaded
//!
//! [download]
//! workers = 50
//! ```
//!
//! [`ConfigFile`] holds the parsed file; `to_retrieval_config()` and
//! `to_wms_config()` turn it into the runtime structs the pipeline takes.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, DownloadSettings, LoggingSettings, RetrievalSettings,
    SourceSettings,
};
