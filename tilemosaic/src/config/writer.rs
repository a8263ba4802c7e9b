//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let url = config.source.url.as_deref().unwrap_or("");
    let layer = config.source.layer.as_deref().unwrap_or("");

    format!(
        r#"[source]
; WMS GetMap endpoint, without query parameters
; Example: url = https://maps.example.org/cgi-bin/wms
url = {}
; Layer name sent as the LAYERS parameter
layer = {}
; Image format requested from the server (default: image/png)
format = {}
; Fetch attempts per tile before it is marked as failed (default: 3)
max_retries = {}
; Timeout in seconds for each fetch attempt (default: 30)
timeout = {}
; World-space correction in degrees for servers with known misalignment
nudge_x = {}
nudge_y = {}

[retrieval]
; Requests partitioned and dispatched concurrently (default: 5)
workers = {}
; Show stale lower-resolution placeholders while downloads run (default: true)
fuzzy = {}

[download]
; Concurrent tile downloads shared by all requests (default: 50)
workers = {}
; Base delay between fetch attempts in milliseconds, doubled per retry (default: 100)
retry_backoff_ms = {}

[cache]
; Keep downloaded tiles on disk (default: true)
enabled = {}
; Tiles are stored as <directory>/<source>/<ppd>/<y>/<x>.png
directory = {}

[logging]
; Log file, truncated at the start of each session
file = {}
"#,
        url,
        layer,
        config.source.format,
        config.source.max_retries,
        config.source.timeout,
        config.source.nudge_x,
        config.source.nudge_y,
        config.retrieval.workers,
        config.retrieval.fuzzy,
        config.download.workers,
        config.download.retry_backoff_ms,
        config.cache.enabled,
        path_to_string(&config.cache.directory),
        path_to_string(&config.logging.file),
    )
}

/// Renders a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_string_has_all_sections() {
        let text = to_config_string(&ConfigFile::default());
        for section in ["[source]", "[retrieval]", "[download]", "[cache]", "[logging]"] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("workers = 50"));
        assert!(text.contains("fuzzy = true"));
    }

    #[test]
    fn test_unset_url_written_empty() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("\nurl = \n"));
    }
}
