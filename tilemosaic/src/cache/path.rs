//! Cache path construction.

use super::types::CacheKey;
use std::path::{Path, PathBuf};

/// File extension of cached tiles.
pub const TILE_EXTENSION: &str = "png";

/// Construct the full path for a cached tile.
///
/// ```text
/// <cache_dir>/<source>/<ppd>/<y>/<x>.png
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use tilemosaic::cache::{cache_path, CacheKey};
/// use tilemosaic::tile::TileKey;
///
/// let key = CacheKey::new("mola", 64, TileKey::new(12, 7));
/// assert_eq!(
///     cache_path(&PathBuf::from("/cache"), &key),
///     PathBuf::from("/cache/mola/64/7/12.png")
/// );
/// ```
pub fn cache_path(cache_dir: &Path, key: &CacheKey) -> PathBuf {
    source_directory(cache_dir, &key.source)
        .join(key.ppd.to_string())
        .join(key.tile.y().to_string())
        .join(format!("{}.{}", key.tile.x(), TILE_EXTENSION))
}

/// Directory holding every tile of one source.
pub fn source_directory(cache_dir: &Path, source: &str) -> PathBuf {
    cache_dir.join(sanitize(source))
}

/// Makes a source name safe to use as a single path component.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
