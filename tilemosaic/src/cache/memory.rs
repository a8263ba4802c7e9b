//! In-process tile cache.

use super::r#trait::TileCache;
use super::types::{CacheError, CacheKey};
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hit/miss counters for a memory cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

/// Tile cache backed by a hash map.
///
/// Entries never expire. Used for tests and for sessions that should not
/// touch the disk.
pub struct MemoryTileCache {
    tiles: Mutex<HashMap<CacheKey, Arc<RgbaImage>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl MemoryTileCache {
    pub fn new() -> Self {
        Self {
            tiles: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    /// Inserts a tile directly, bypassing statistics.
    pub fn insert(&self, key: CacheKey, image: RgbaImage) {
        self.tiles.lock().insert(key, Arc::new(image));
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.tiles.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.lock().is_empty()
    }

    pub fn stats(&self) -> MemoryCacheStats {
        MemoryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryTileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache for MemoryTileCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn contains(&self, key: &CacheKey) -> bool {
        self.tiles.lock().contains_key(key)
    }

    fn get_tile(&self, key: &CacheKey) -> Option<RgbaImage> {
        let found = self.tiles.lock().get(key).cloned();
        match found {
            Some(image) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(RgbaImage::clone(&image))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn store_tile(&self, key: &CacheKey, image: &RgbaImage) -> Result<(), CacheError> {
        self.tiles.lock().insert(key.clone(), Arc::new(image.clone()));
        self.stores.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
