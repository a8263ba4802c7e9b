//! Tile cache trait definition for dependency injection.

use super::fuzzy::derive_fuzzy;
use super::types::{CacheCheck, CacheError, CacheKey};
use crate::request::Request;
use crate::tile::Tile;
use image::RgbaImage;
use std::sync::Arc;

/// Synchronous store of previously downloaded tiles.
///
/// Implementations are shared between the retrieval pool and blocking
/// worker threads, so they must be `Send + Sync`. The retrieval pipeline
/// reaches them through [`super::CacheLayer`], which moves every call off
/// the async runtime.
///
/// # Example
///
/// ```
/// use tilemosaic::cache::{CacheKey, MemoryTileCache, TileCache};
/// use tilemosaic::tile::TileKey;
/// use image::RgbaImage;
///
/// let cache = MemoryTileCache::new();
/// let key = CacheKey::new("mola", 4, TileKey::new(0, 0));
///
/// assert!(cache.get_tile(&key).is_none());
/// cache.store_tile(&key, &RgbaImage::new(256, 256)).unwrap();
/// assert!(cache.contains(&key));
/// ```
pub trait TileCache: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// True when a tile is held at exactly this resolution.
    fn contains(&self, key: &CacheKey) -> bool;

    /// Loads a cached tile.
    ///
    /// May return `None` even after `contains` said yes, for example when
    /// the entry was evicted or is unreadable.
    fn get_tile(&self, key: &CacheKey) -> Option<RgbaImage>;

    /// Persists a tile.
    fn store_tile(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError>;

    /// Builds a stale placeholder for a tile that is not cached.
    fn get_fuzzy_tile(&self, key: &CacheKey) -> Option<RgbaImage> {
        derive_fuzzy(key, |coarse| self.get_tile(coarse))
    }

    /// Splits tiles into cached and non-cached without loading anything.
    fn check_cache(&self, request: &Request, tiles: &[Arc<Tile>]) -> CacheCheck {
        let mut check = CacheCheck::default();
        for tile in tiles {
            if self.contains(&CacheKey::for_tile(request, tile)) {
                check.cached.push(Arc::clone(tile));
            } else {
                check.non_cached.push(Arc::clone(tile));
            }
        }
        check
    }
}

/// Cache that never holds anything.
///
/// Every tile is reported non-cached and stores are accepted and dropped.
#[derive(Debug, Clone, Default)]
pub struct NoOpTileCache;

impl NoOpTileCache {
    pub fn new() -> Self {
        Self
    }
}

impl TileCache for NoOpTileCache {
    fn name(&self) -> &str {
        "none"
    }

    fn contains(&self, _key: &CacheKey) -> bool {
        false
    }

    fn get_tile(&self, _key: &CacheKey) -> Option<RgbaImage> {
        None
    }

    fn store_tile(&self, _key: &CacheKey, _image: &RgbaImage) -> Result<(), CacheError> {
        Ok(())
    }

    fn get_fuzzy_tile(&self, _key: &CacheKey) -> Option<RgbaImage> {
        None
    }
}
