//! Stale placeholder derivation from coarser cached levels.
//!
//! A tile at `ppd` covers the same ground as a `1/f` block of the tile at
//! `ppd / f`. When the fine tile is not cached, that block is cut out of
//! the coarse tile and scaled up:
//!
//! ```text
//!   coarse tile (ppd / 2)          fine tile (ppd)
//!   ┌─────────┬─────────┐          ┌───────────────────┐
//!   │ (0, 1)  │ (1, 1)  │          │                   │
//!   ├─────────┼─────────┤  ──────▶ │   block (1, 0)    │
//!   │ (0, 0)  │ (1, 0)  │  resize  │   scaled 2x       │
//!   └─────────┴─────────┘          └───────────────────┘
//! ```

use super::types::CacheKey;
use crate::tile::{TileKey, TILE_PIXELS};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Largest resolution ratio searched for a placeholder.
pub const MAX_FUZZY_FACTOR: u32 = 256;

/// Builds a placeholder for `key` from the nearest coarser cached level.
///
/// `lookup` is asked for the covering tile at `ppd / 2`, `ppd / 4`, and so
/// on while the ratio divides `ppd` evenly. The first hit wins.
pub fn derive_fuzzy<F>(key: &CacheKey, lookup: F) -> Option<RgbaImage>
where
    F: Fn(&CacheKey) -> Option<RgbaImage>,
{
    let mut factor = 2;
    while factor <= MAX_FUZZY_FACTOR && key.ppd % factor == 0 {
        let coarse_key = key.with_level(key.ppd / factor, covering_tile(key.tile, factor));
        if let Some(coarse) = lookup(&coarse_key) {
            if let Some(image) = upscale_block(&coarse, key.tile, factor) {
                return Some(image);
            }
        }
        factor *= 2;
    }
    None
}

/// Coarse tile containing `tile` when tiles are `factor` times larger.
fn covering_tile(tile: TileKey, factor: u32) -> TileKey {
    let f = factor as i32;
    TileKey::new(tile.x().div_euclid(f), tile.y().div_euclid(f))
}

/// Cuts the fine tile's block out of the coarse raster and resizes it.
fn upscale_block(coarse: &RgbaImage, tile: TileKey, factor: u32) -> Option<RgbaImage> {
    let block_w = coarse.width() / factor;
    let block_h = coarse.height() / factor;
    if block_w == 0 || block_h == 0 {
        return None;
    }

    let f = factor as i32;
    let col = tile.x().rem_euclid(f) as u32;
    // Rows count north from the south edge; raster rows run south from the top.
    let row = tile.y().rem_euclid(f) as u32;
    let x = col * block_w;
    let y = (factor - 1 - row) * block_h;

    let block = imageops::crop_imm(coarse, x, y, block_w, block_h).to_image();
    Some(imageops::resize(
        &block,
        TILE_PIXELS,
        TILE_PIXELS,
        FilterType::Triangle,
    ))
}
