//! Callback seam between a retriever and the collaborators feeding it.

use crate::request::Request;
use crate::source::FetchError;
use crate::tile::Tile;
use image::RgbaImage;
use std::sync::Arc;

/// Receives tile arrivals on behalf of one request.
///
/// The cache layer and the downloader only see this trait, never the
/// retriever itself. Every method may be called from any thread.
pub trait TileSink: Send + Sync {
    /// The request the arrivals belong to.
    fn request(&self) -> &Arc<Request>;

    /// Share of the request's tiles already resolved, in `[0, 1]`.
    ///
    /// Read by the downloader when queueing to rank competing requests.
    fn resolved_fraction(&self) -> f64;

    /// A cache lookup finished; `None` means the cache could not produce
    /// the tile after all.
    fn cached_tile_arrived(&self, tile: Arc<Tile>, image: Option<RgbaImage>);

    /// A stale placeholder lookup finished.
    fn fuzzy_tile_arrived(&self, tile: Arc<Tile>, image: Option<RgbaImage>);

    /// A download finished, successfully or after giving up.
    fn tile_downloaded(&self, tile: Arc<Tile>, result: Result<RgbaImage, FetchError>);
}
