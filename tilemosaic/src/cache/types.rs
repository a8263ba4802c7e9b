//! Core types for the tile cache.

use crate::request::Request;
use crate::tile::{Tile, TileKey};
use std::sync::Arc;
use thiserror::Error;

/// Cache key uniquely identifying a cached tile.
///
/// Includes everything needed to locate the tile: source name,
/// resolution and grid coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source name
    pub source: String,
    /// Pixels per degree
    pub ppd: u32,
    /// Grid coordinates
    pub tile: TileKey,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, ppd: u32, tile: TileKey) -> Self {
        Self {
            source: source.into(),
            ppd,
            tile,
        }
    }

    /// Key for one tile of a request.
    pub fn for_tile(request: &Request, tile: &Tile) -> Self {
        Self::new(request.source().name(), tile.ppd(), tile.key())
    }

    /// Same tile position at a different resolution.
    pub fn with_level(&self, ppd: u32, tile: TileKey) -> Self {
        Self {
            source: self.source.clone(),
            ppd,
            tile,
        }
    }
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tile could not be encoded or decoded
    #[error("Cache image error: {0}")]
    Image(#[from] image::ImageError),

    /// Background task failed before completing
    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Split of a request's tiles by cache presence.
#[derive(Debug, Default, Clone)]
pub struct CacheCheck {
    /// Tiles the cache claims to hold at the requested resolution
    pub cached: Vec<Arc<Tile>>,
    /// Everything else
    pub non_cached: Vec<Arc<Tile>>,
}
