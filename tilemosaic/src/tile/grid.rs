//! Tile grid partitioning.
//!
//! Tiles are fixed 256×256-pixel rasters, so a tile spans `256 / ppd`
//! degrees on each side. Columns are anchored at longitude 0 and rows at
//! latitude -90:
//!
//! ```text
//!   lat
//!    90 ┬──────────┬──────────┬───
//!       │  (0, 1)  │  (1, 1)  │
//!       ├──────────┼──────────┼───
//!       │  (0, 0)  │  (1, 0)  │
//!   -90 ┴──────────┴──────────┴─── lon
//!       0       256/ppd    512/ppd
//! ```
//!
//! An unwrapped extent is folded into `[0, 360)` first, so a view crossing
//! the date line yields tiles from both ends of the grid, each once.

use super::{Tile, TileKey};
use crate::geom::{snap, wrap_world_rect, WorldRect};
use crate::request::Request;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Edge length of every tile raster in pixels.
pub const TILE_PIXELS: u32 = 256;

/// Southern edge of row 0.
pub const LAT_ORIGIN: f64 = -90.0;

/// Northern limit of the grid.
pub const LAT_LIMIT: f64 = 90.0;

/// Edge length of one tile in degrees at the given resolution.
#[inline]
pub fn tile_size_degrees(ppd: u32) -> f64 {
    TILE_PIXELS as f64 / ppd as f64
}

/// World rectangle covered by a tile.
pub fn tile_extent(key: TileKey, ppd: u32) -> WorldRect {
    let size = tile_size_degrees(ppd);
    WorldRect::new(
        key.x() as f64 * size,
        LAT_ORIGIN + key.y() as f64 * size,
        size,
        size,
    )
}

/// Indices of the tiles touching the pixel span `[min_px, max_px)`.
///
/// The far edge is rounded up to whole pixels and then backed off by one
/// pixel, so an edge landing exactly on a tile boundary does not pull in
/// the next tile.
fn index_range(min_px: f64, max_px: f64) -> RangeInclusive<i32> {
    let tile = TILE_PIXELS as f64;
    let first = (snap(min_px) / tile).floor() as i32;
    let last = ((snap(max_px).ceil() - 1.0) / tile).floor() as i32;
    first..=last.max(first)
}

/// Keys of the tiles needed to cover an extent, in row-major order.
///
/// The extent is clipped to the latitude range of the grid. Keys reached
/// through more than one wrapped piece are returned once.
pub fn tiles_for_extent(extent: &WorldRect, ppd: u32) -> Vec<TileKey> {
    if ppd == 0 {
        return Vec::new();
    }

    let Some(clipped) = extent.intersection(&WorldRect::from_bounds(
        f64::MIN,
        LAT_ORIGIN,
        f64::MAX,
        LAT_LIMIT,
    )) else {
        return Vec::new();
    };

    let scale = ppd as f64;
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for piece in wrap_world_rect(&clipped) {
        if piece.is_empty() {
            continue;
        }
        let columns = index_range(piece.min_x * scale, piece.max_x * scale);
        let rows = index_range(
            (piece.min_y - LAT_ORIGIN) * scale,
            (piece.max_y - LAT_ORIGIN) * scale,
        );
        for y in rows {
            for x in columns.clone() {
                let key = TileKey::new(x, y);
                if seen.insert(key) {
                    keys.push(key);
                }
            }
        }
    }

    keys
}

/// Partitions a request into tiles.
///
/// Tiling runs on the nudged extent so tile rectangles line up with what
/// the source serves.
pub fn tiles_for_request(request: &Request) -> Vec<Arc<Tile>> {
    tiles_for_extent(&request.source_extent(), request.ppd())
        .into_iter()
        .map(|key| Arc::new(Tile::new(key, request.ppd())))
        .collect()
}
