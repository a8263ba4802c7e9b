//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("url") {
            config.source.url = non_empty(v);
        }
        if let Some(v) = section.get("layer") {
            config.source.layer = non_empty(v);
        }
        if let Some(v) = section.get("format") {
            let v = v.trim();
            if !v.starts_with("image/") {
                return Err(invalid("source", "format", v, "must be an image MIME type"));
            }
            config.source.format = v.to_string();
        }
        if let Some(v) = section.get("max_retries") {
            config.source.max_retries = parse_positive(
                "source",
                "max_retries",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("timeout") {
            config.source.timeout = parse_positive(
                "source",
                "timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("nudge_x") {
            config.source.nudge_x = parse_degrees("source", "nudge_x", v)?;
        }
        if let Some(v) = section.get("nudge_y") {
            config.source.nudge_y = parse_degrees("source", "nudge_y", v)?;
        }
    }

    // [retrieval] section
    if let Some(section) = ini.section(Some("retrieval")) {
        if let Some(v) = section.get("workers") {
            config.retrieval.workers =
                parse_positive("retrieval", "workers", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("fuzzy") {
            config.retrieval.fuzzy = parse_bool(v);
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("workers") {
            config.download.workers =
                parse_positive("download", "workers", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("retry_backoff_ms") {
            config.download.retry_backoff_ms =
                v.trim().parse().map_err(|_| {
                    invalid(
                        "download",
                        "retry_backoff_ms",
                        v,
                        "must be a non-negative integer (milliseconds)",
                    )
                })?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("enabled") {
            config.cache.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Parses an integer that must be greater than zero.
fn parse_positive<T>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(section, key, value, reason)),
    }
}

fn parse_degrees(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    match value.trim().parse::<f64>() {
        Ok(d) if d.is_finite() => Ok(d),
        _ => Err(invalid(section, key, value, "must be a number of degrees")),
    }
}

/// Parse a boolean value from a string.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
