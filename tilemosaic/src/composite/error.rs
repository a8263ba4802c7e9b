//! Errors raised while assembling a composite.

use crate::request::RequestId;
use crate::tile::TileKey;
use thiserror::Error;

/// Composite bookkeeping failures.
///
/// Both variants indicate a logic error upstream rather than bad input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositeError {
    /// Tile raster and composite disagree on pixels per degree
    #[error("tile {tile} has {tile_scale} px/deg, composite expects {expected} px/deg")]
    ScaleMismatch {
        tile: TileKey,
        tile_scale: f64,
        expected: f64,
    },

    /// The composite was marked finished a second time
    #[error("composite for {0} already marked finished")]
    AlreadyFinished(RequestId),
}
