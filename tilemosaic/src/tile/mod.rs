//! Tiles: fixed-size grid cells of a request's extent.
//!
//! A [`Tile`] moves through a small state machine as data arrives:
//!
//! ```text
//!            set_fuzzy             set_final
//!   Missing ───────────▶ Fuzzy ───────────────▶ Final
//!      │                                          ▲
//!      └──────────────────────────────────────────┘
//!                       set_final
//! ```
//!
//! The first final image wins and is never replaced. Fuzzy images arriving
//! after it are dropped. An error message may sit alongside Missing or
//! Fuzzy and means no further fetch attempts will be made.

mod grid;
mod key;

pub use grid::{
    tile_extent, tile_size_degrees, tiles_for_extent, tiles_for_request, LAT_LIMIT, LAT_ORIGIN,
    TILE_PIXELS,
};
pub use key::TileKey;

use crate::geom::WorldRect;
use image::RgbaImage;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Where a tile is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// No image yet
    Missing,
    /// Only a stale placeholder
    Fuzzy,
    /// Authoritative image; terminal
    Final,
}

#[derive(Default)]
struct TileData {
    final_image: Option<Arc<RgbaImage>>,
    fuzzy_image: Option<Arc<RgbaImage>>,
    error: Option<String>,
}

/// One grid cell of a request.
///
/// Identity is the grid key alone: two tiles indexing the same cell are
/// equal regardless of the images they carry. Image and error slots are
/// guarded per tile, so the cache path and the download path can race on
/// the same tile safely.
pub struct Tile {
    key: TileKey,
    extent: WorldRect,
    ppd: u32,
    data: Mutex<TileData>,
}

impl Tile {
    pub fn new(key: TileKey, ppd: u32) -> Self {
        Self {
            key,
            extent: tile_extent(key, ppd),
            ppd,
            data: Mutex::new(TileData::default()),
        }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    /// World rectangle in the source's coordinate space.
    pub fn extent(&self) -> &WorldRect {
        &self.extent
    }

    pub fn ppd(&self) -> u32 {
        self.ppd
    }

    /// Stores the authoritative image.
    ///
    /// Returns `false` and discards `image` when a final image is already
    /// present. A successful write clears any earlier error.
    pub fn set_final(&self, image: Arc<RgbaImage>) -> bool {
        let mut data = self.data.lock();
        if data.final_image.is_some() {
            return false;
        }
        data.final_image = Some(image);
        data.error = None;
        true
    }

    /// Stores a stale placeholder unless a final image already arrived.
    pub fn set_fuzzy(&self, image: Arc<RgbaImage>) -> bool {
        let mut data = self.data.lock();
        if data.final_image.is_some() {
            return false;
        }
        data.fuzzy_image = Some(image);
        true
    }

    /// Records an unrecoverable fetch failure.
    ///
    /// Ignored once the tile is final.
    pub fn set_error(&self, message: impl Into<String>) -> bool {
        let mut data = self.data.lock();
        if data.final_image.is_some() {
            return false;
        }
        data.error = Some(message.into());
        true
    }

    pub fn state(&self) -> TileState {
        let data = self.data.lock();
        if data.final_image.is_some() {
            TileState::Final
        } else if data.fuzzy_image.is_some() {
            TileState::Fuzzy
        } else {
            TileState::Missing
        }
    }

    pub fn is_final(&self) -> bool {
        self.data.lock().final_image.is_some()
    }

    pub fn final_image(&self) -> Option<Arc<RgbaImage>> {
        self.data.lock().final_image.clone()
    }

    pub fn fuzzy_image(&self) -> Option<Arc<RgbaImage>> {
        self.data.lock().fuzzy_image.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.data.lock().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.data.lock().error.is_some()
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key)
            .field("ppd", &self.ppd)
            .field("state", &self.state())
            .field("error", &self.error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::collections::HashSet;

    fn image(value: u8) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_pixel(
            TILE_PIXELS,
            TILE_PIXELS,
            Rgba([value, value, value, 255]),
        ))
    }

    #[test]
    fn test_new_tile_is_missing() {
        let tile = Tile::new(TileKey::new(2, 3), 16);
        assert_eq!(tile.state(), TileState::Missing);
        assert!(tile.final_image().is_none());
        assert!(tile.error().is_none());
        assert_eq!(*tile.extent(), tile_extent(TileKey::new(2, 3), 16));
    }

    #[test]
    fn test_fuzzy_then_final() {
        let tile = Tile::new(TileKey::new(0, 0), 4);
        assert!(tile.set_fuzzy(image(1)));
        assert_eq!(tile.state(), TileState::Fuzzy);
        assert!(tile.set_final(image(2)));
        assert_eq!(tile.state(), TileState::Final);
    }

    #[test]
    fn test_first_final_wins() {
        let tile = Tile::new(TileKey::new(0, 0), 4);
        assert!(tile.set_final(image(1)));
        assert!(!tile.set_final(image(2)));
        assert_eq!(tile.final_image().unwrap().get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn test_fuzzy_after_final_is_discarded() {
        let tile = Tile::new(TileKey::new(0, 0), 4);
        tile.set_final(image(1));
        assert!(!tile.set_fuzzy(image(9)));
        assert!(tile.fuzzy_image().is_none());
        assert_eq!(tile.state(), TileState::Final);
    }

    #[test]
    fn test_error_alongside_fuzzy() {
        let tile = Tile::new(TileKey::new(0, 0), 4);
        tile.set_fuzzy(image(1));
        assert!(tile.set_error("HTTP 503"));
        assert_eq!(tile.state(), TileState::Fuzzy);
        assert_eq!(tile.error().as_deref(), Some("HTTP 503"));
    }

    #[test]
    fn test_error_ignored_after_final() {
        let tile = Tile::new(TileKey::new(0, 0), 4);
        tile.set_final(image(1));
        assert!(!tile.set_error("late failure"));
        assert!(!tile.has_error());
    }

    #[test]
    fn test_identity_ignores_content() {
        let a = Tile::new(TileKey::new(5, 1), 8);
        let b = Tile::new(TileKey::new(5, 1), 8);
        b.set_final(image(3));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(Arc::new(a));
        assert!(!set.insert(Arc::new(b)));
    }
}
