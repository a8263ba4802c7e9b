//! The accumulating answer to one request.
//!
//! [`CompositeData`] owns a raster sized to the request extent and two
//! region sets recording where authoritative ("finished") and stale
//! ("fuzzy") pixels have been written:
//!
//! ```text
//!   request extent
//!   ┌──────────────────────────────┐
//!   │ finished │ finished │ fuzzy  │
//!   ├──────────┼──────────┼────────┤
//!   │ fuzzy    │ missing  │ missing│
//!   └──────────────────────────────┘
//! ```
//!
//! The owning retriever mutates it under the request lock; consumers only
//! ever see deep copies taken with [`CompositeData::snapshot`].

mod error;

pub use error::CompositeError;

use crate::geom::{clip_to_period, snap, unwrapped_occurrences, RegionSet, WorldRect};
use crate::request::Request;
use crate::tile::Tile;
use image::{imageops, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// Relative tolerance when comparing tile and composite scales.
const SCALE_TOLERANCE: f64 = 1e-6;

/// Which image of a tile is being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Authoritative pixels; recorded in the finished area
    Final,
    /// Stale placeholder pixels; recorded in the fuzzy area
    Fuzzy,
}

/// Pixel dimensions of the raster for an extent at a resolution.
pub fn raster_size(extent: &WorldRect, ppd: u32) -> (u32, u32) {
    let scale = ppd as f64;
    (
        snap(extent.width() * scale).ceil().max(1.0) as u32,
        snap(extent.height() * scale).ceil().max(1.0) as u32,
    )
}

/// Raster and region bookkeeping for one request.
///
/// `Clone` is a deep copy: the clone shares nothing mutable with the
/// original apart from the request's cancellation flag.
#[derive(Clone)]
pub struct CompositeData {
    request: Arc<Request>,
    image: Option<RgbaImage>,
    finished_area: RegionSet,
    fuzzy_area: RegionSet,
    finished: bool,
}

impl CompositeData {
    /// Creates an empty composite; the raster is allocated on first merge.
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request,
            image: None,
            finished_area: RegionSet::new(),
            fuzzy_area: RegionSet::new(),
            finished: false,
        }
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// The raster, if any tile has been merged yet.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Consumes the composite, returning the raster.
    ///
    /// A composite nothing was merged into yields a fully transparent raster.
    pub fn into_image(self) -> RgbaImage {
        let (w, h) = raster_size(self.request.extent(), self.request.ppd());
        self.image.unwrap_or_else(|| RgbaImage::new(w, h))
    }

    /// Raster dimensions for this request.
    pub fn dimensions(&self) -> (u32, u32) {
        raster_size(self.request.extent(), self.request.ppd())
    }

    /// Region holding authoritative pixels, in request coordinates.
    pub fn finished_area(&self) -> &RegionSet {
        &self.finished_area
    }

    /// Region holding stale pixels, in request coordinates.
    pub fn fuzzy_area(&self) -> &RegionSet {
        &self.fuzzy_area
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Region of the extent that has no data at all.
    pub fn missing_area(&self) -> RegionSet {
        let mut missing = RegionSet::from_rect(*self.request.extent());
        missing.difference(&self.finished_area);
        missing.difference(&self.fuzzy_area);
        missing
    }

    /// Share of the extent covered by authoritative pixels, in `[0, 1]`.
    pub fn finished_fraction(&self) -> f64 {
        let total = self.request.extent().area();
        if total <= 0.0 {
            return 0.0;
        }
        (self.finished_area.area() / total).clamp(0.0, 1.0)
    }

    /// Deep copy for hand-off to a consumer.
    pub fn snapshot(&self) -> CompositeData {
        self.clone()
    }

    /// Flags the composite as complete.
    ///
    /// Completing twice is reported as an error since it means a tile was
    /// counted twice.
    pub fn mark_finished(&mut self) -> Result<(), CompositeError> {
        if self.finished {
            return Err(CompositeError::AlreadyFinished(self.request.id()));
        }
        self.finished = true;
        Ok(())
    }

    /// Copies one tile's image into the raster.
    ///
    /// The tile's extent lives in the source's nudged coordinate space, so
    /// occurrences are found against the nudged request extent and recorded
    /// back in request coordinates. A tile without an image of the given
    /// kind is skipped. Returns the number of occurrences written.
    pub fn merge_tile(&mut self, tile: &Tile, kind: MergeKind) -> Result<usize, CompositeError> {
        let tile_image = match kind {
            MergeKind::Final => tile.final_image(),
            MergeKind::Fuzzy => tile.fuzzy_image(),
        };
        let Some(tile_image) = tile_image else {
            return Ok(0);
        };

        let scale = self.request.ppd() as f64;
        let tile_extent = tile.extent();
        let tile_scale = tile_image.width() as f64 / tile_extent.width();
        if ((tile_scale - scale) / scale).abs() > SCALE_TOLERANCE {
            return Err(CompositeError::ScaleMismatch {
                tile: tile.key(),
                tile_scale,
                expected: scale,
            });
        }

        // Pixels past 360 degrees belong to the first column's longitudes.
        let Some(wrapped_extent) = clip_to_period(tile_extent) else {
            return Ok(0);
        };

        let (dx, dy) = self.request.source().nudge();
        let extent = self.request.source_extent();
        let (width, height) = self.dimensions();
        let raster = self
            .image
            .get_or_insert_with(|| RgbaImage::new(width, height));

        let occurrences = unwrapped_occurrences(&wrapped_extent, &extent);
        for occurrence in &occurrences {
            let shifted = occurrence.shifted;
            let overlap = occurrence.overlap;

            // Raster rows run north to south.
            let tx0 = to_px((overlap.min_x - shifted.min_x) * tile_scale);
            let tx1 = to_px((overlap.max_x - shifted.min_x) * tile_scale);
            let ty0 = to_px((shifted.max_y - overlap.max_y) * tile_scale);
            let ty1 = to_px((shifted.max_y - overlap.min_y) * tile_scale);
            let cx = to_px((overlap.min_x - extent.min_x) * scale);
            let cy = to_px((extent.max_y - overlap.max_y) * scale);

            copy_block(raster, &tile_image, (tx0, ty0, tx1, ty1), (cx, cy));

            let region = overlap.translate(-dx, -dy);
            match kind {
                MergeKind::Final => {
                    self.fuzzy_area.subtract(&region);
                    self.finished_area.add(region);
                }
                MergeKind::Fuzzy => self.fuzzy_area.add(region),
            }
        }

        Ok(occurrences.len())
    }
}

impl fmt::Debug for CompositeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeData")
            .field("request", &self.request.id())
            .field("dimensions", &self.dimensions())
            .field("allocated", &self.image.is_some())
            .field("finished_area", &self.finished_area.area())
            .field("fuzzy_area", &self.fuzzy_area.area())
            .field("finished", &self.finished)
            .finish()
    }
}

#[inline]
fn to_px(value: f64) -> i64 {
    snap(value).round() as i64
}

/// Copies the tile pixel block `(x0, y0, x1, y1)` to `at` in the canvas,
/// clipped to both rasters.
fn copy_block(canvas: &mut RgbaImage, tile: &RgbaImage, block: (i64, i64, i64, i64), at: (i64, i64)) {
    let (x0, y0, x1, y1) = block;
    let x0 = x0.clamp(0, tile.width() as i64);
    let y0 = y0.clamp(0, tile.height() as i64);
    let x1 = x1.clamp(x0, tile.width() as i64);
    let y1 = y1.clamp(y0, tile.height() as i64);
    if x1 == x0 || y1 == y0 {
        return;
    }

    let block = imageops::crop_imm(
        tile,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image();
    imageops::replace(canvas, &block, at.0, at.1);
}
