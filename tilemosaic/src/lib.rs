//! Tiled map retrieval, caching and compositing.
//!
//! A caller describes the region it wants as a [`request::Request`]: a map
//! source, a world extent in degrees and a resolution in pixels per degree.
//! The [`retriever::RetrievalService`] cuts the extent into 256×256 pixel
//! tiles, serves what it can from the [`cache`], shows stale placeholders
//! ("fuzzy" tiles) while fresh ones download, fetches the rest through the
//! shared [`downloader`] pool and paints everything into one
//! [`composite::CompositeData`] raster. The caller's
//! [`receiver::DataReceiver`] sees a snapshot after every change and exactly
//! one finished snapshot at the end.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilemosaic::cache::DiskTileCache;
//! use tilemosaic::geom::WorldRect;
//! use tilemosaic::request::{Projection, Request};
//! use tilemosaic::retriever::{RetrievalConfig, RetrievalService};
//!
//! let cache = Arc::new(DiskTileCache::new("/tmp/tiles")?);
//! let service = RetrievalService::new(RetrievalConfig::default(), cache);
//! let request = Request::new(source, WorldRect::new(0.0, -30.0, 40.0, 30.0), 16, Projection::default())?;
//!
//! let handle = service.fetch(request, |_| {});
//! if let Some(data) = handle.wait().await {
//!     data.into_image().save("mosaic.png")?;
//! }
//! ```

pub mod cache;
pub mod composite;
pub mod config;
pub mod downloader;
pub mod geom;
pub mod logging;
pub mod receiver;
pub mod request;
pub mod retriever;
pub mod source;
pub mod tile;

/// Version of the tilemosaic library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
