//! PNG-per-tile disk cache.

use super::path::{cache_path, TILE_EXTENSION};
use super::r#trait::TileCache;
use super::types::{CacheError, CacheKey};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Tile cache storing one PNG file per tile.
///
/// Layout is described in [`cache_path`]. Writes go to a temporary file in
/// the destination directory and are renamed into place, so readers never
/// observe a partial tile.
pub struct DiskTileCache {
    cache_dir: PathBuf,
}

impl DiskTileCache {
    /// Opens (and creates if needed) a cache rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Location of a tile file.
    pub fn tile_path(&self, key: &CacheKey) -> PathBuf {
        cache_path(&self.cache_dir, key)
    }
}

impl TileCache for DiskTileCache {
    fn name(&self) -> &str {
        "disk"
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.tile_path(key).is_file()
    }

    fn get_tile(&self, key: &CacheKey) -> Option<RgbaImage> {
        let path = self.tile_path(key);
        if !path.is_file() {
            return None;
        }

        match image::open(&path) {
            Ok(image) => {
                trace!(path = %path.display(), "Disk cache hit");
                Some(image.to_rgba8())
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable cached tile, treating as absent"
                );
                None
            }
        }
    }

    fn store_tile(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError> {
        let path = self.tile_path(key);
        let Some(parent) = path.parent() else {
            return Err(CacheError::Io(std::io::Error::other(format!(
                "tile path {} has no parent",
                path.display()
            ))));
        };
        fs::create_dir_all(parent)?;

        let temp = parent.join(format!(
            ".{}.{}.{}.tmp",
            key.tile.x(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = image
            .save_with_format(&temp, ImageFormat::Png)
            .map_err(CacheError::from)
            .and_then(|()| fs::rename(&temp, &path).map_err(CacheError::from));

        if written.is_err() {
            let _ = fs::remove_file(&temp);
        }
        written
    }
}

/// True for files that hold a cached tile.
pub(super) fn is_tile_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileKey;
    use image::Rgba;
    use tempfile::TempDir;

    fn create_temp_cache() -> (DiskTileCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskTileCache::new(temp_dir.path()).unwrap();
        (cache, temp_dir)
    }

    fn key(x: i32, y: i32) -> CacheKey {
        CacheKey::new("mola", 16, TileKey::new(x, y))
    }

    #[test]
    fn test_store_and_get() {
        let (cache, _temp) = create_temp_cache();
        let image = RgbaImage::from_pixel(256, 256, Rgba([5, 6, 7, 255]));

        assert!(!cache.contains(&key(3, 4)));
        cache.store_tile(&key(3, 4), &image).unwrap();
        assert!(cache.contains(&key(3, 4)));
        assert_eq!(cache.get_tile(&key(3, 4)), Some(image));
    }

    #[test]
    fn test_layout_on_disk() {
        let (cache, temp) = create_temp_cache();
        cache.store_tile(&key(3, 4), &RgbaImage::new(4, 4)).unwrap();
        assert!(temp.path().join("mola/16/4/3.png").is_file());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (cache, temp) = create_temp_cache();
        cache.store_tile(&key(1, 1), &RgbaImage::new(4, 4)).unwrap();
        cache.store_tile(&key(1, 1), &RgbaImage::new(4, 4)).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path().join("mola/16/1"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("1.png")]);
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let (cache, _temp) = create_temp_cache();
        let path = cache.tile_path(&key(0, 0));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a png").unwrap();

        assert!(cache.contains(&key(0, 0)));
        assert!(cache.get_tile(&key(0, 0)).is_none());
    }

    #[test]
    fn test_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        {
            let cache = DiskTileCache::new(temp_dir.path()).unwrap();
            cache.store_tile(&key(0, 0), &RgbaImage::new(2, 2)).unwrap();
        }
        let cache = DiskTileCache::new(temp_dir.path()).unwrap();
        assert!(cache.get_tile(&key(0, 0)).is_some());
    }

    #[test]
    fn test_fuzzy_from_disk() {
        let (cache, _temp) = create_temp_cache();
        cache
            .store_tile(
                &CacheKey::new("mola", 8, TileKey::new(0, 0)),
                &RgbaImage::from_pixel(256, 256, Rgba([90, 0, 0, 255])),
            )
            .unwrap();

        let fuzzy = cache.get_fuzzy_tile(&key(1, 1)).unwrap();
        assert_eq!(fuzzy.get_pixel(0, 0)[0], 90);
    }
}
