//! Asynchronous adapter between the retriever and a synchronous cache.
//!
//! ```text
//!   Retriever ──check_cache──▶ CacheLayer ──spawn_blocking──▶ TileCache
//!       ▲                          │
//!       └──── TileSink callbacks ◀─┘   (one per tile, image or None)
//! ```

use super::r#trait::TileCache;
use super::types::{CacheCheck, CacheError, CacheKey};
use crate::request::Request;
use crate::retriever::TileSink;
use crate::tile::Tile;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Runs cache lookups and stores on the blocking thread pool.
#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn TileCache>,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn TileCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<dyn TileCache> {
        &self.cache
    }

    /// Classifies tiles as cached or not, without loading them.
    pub fn check_cache(&self, request: &Request, tiles: &[Arc<Tile>]) -> CacheCheck {
        self.cache.check_cache(request, tiles)
    }

    /// [`Self::check_cache`] moved off the async runtime.
    pub async fn check_cache_blocking(
        &self,
        request: Arc<Request>,
        tiles: Vec<Arc<Tile>>,
    ) -> Result<CacheCheck, CacheError> {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || cache.check_cache(&request, &tiles))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))
    }

    /// Loads cached tiles, answering each through `cached_tile_arrived`.
    ///
    /// A tile the cache cannot produce is answered with `None`. Stops early
    /// once the request is cancelled.
    pub fn get_tiles(&self, sink: Arc<dyn TileSink>, tiles: Vec<Arc<Tile>>) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || {
            for tile in tiles {
                if sink.request().is_cancelled() {
                    trace!(request_id = %sink.request().id(), "Cache lookups abandoned");
                    return;
                }
                let key = CacheKey::for_tile(sink.request(), &tile);
                let image = cache.get_tile(&key);
                sink.cached_tile_arrived(tile, image);
            }
        })
    }

    /// Looks up stale placeholders, answering each through `fuzzy_tile_arrived`.
    pub fn get_fuzzy_tiles(
        &self,
        sink: Arc<dyn TileSink>,
        tiles: Vec<Arc<Tile>>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || {
            for tile in tiles {
                if sink.request().is_cancelled() {
                    trace!(request_id = %sink.request().id(), "Fuzzy lookups abandoned");
                    return;
                }
                // A download may have won the race already.
                let image = if tile.is_final() {
                    None
                } else {
                    cache.get_fuzzy_tile(&CacheKey::for_tile(sink.request(), &tile))
                };
                sink.fuzzy_tile_arrived(tile, image);
            }
        })
    }

    /// Persists a tile's final image in the background.
    ///
    /// Failures are logged and otherwise ignored. Returns `None` when the
    /// tile has no final image.
    pub fn store_map_data(&self, request: &Request, tile: &Tile) -> Option<JoinHandle<()>> {
        let image = tile.final_image()?;
        let key = CacheKey::for_tile(request, tile);
        let cache = Arc::clone(&self.cache);

        Some(tokio::task::spawn_blocking(move || {
            match cache.store_tile(&key, &image) {
                Ok(()) => debug!(tile = %key.tile, ppd = key.ppd, "Tile written to cache"),
                Err(e) => warn!(
                    tile = %key.tile,
                    ppd = key.ppd,
                    cache = cache.name(),
                    error = %e,
                    "Failed to write tile to cache"
                ),
            }
        }))
    }
}
