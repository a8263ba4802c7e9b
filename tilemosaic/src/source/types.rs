//! Tile source types and traits.

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_SOURCE_TIMEOUT_SECS};
use crate::geom::WorldRect;
use crate::request::Projection;
use crate::tile::TileKey;
use image::RgbaImage;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Boxed future returned by [`MapSource::fetch_tile`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<RgbaImage, FetchError>> + Send + 'a>>;

/// Errors from a single tile fetch.
///
/// The variant decides the retry policy: retryable failures are attempted
/// again up to the source's limit, fatal failures end the tile at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transient transport or server condition
    #[error("transient fetch failure: {0}")]
    Retryable(String),

    /// Malformed request or unambiguous rejection
    #[error("fetch rejected: {0}")]
    Fatal(String),
}

impl FetchError {
    pub fn retryable(message: impl Into<String>) -> Self {
        FetchError::Retryable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        FetchError::Fatal(message.into())
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Retryable(_))
    }

    /// The underlying message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            FetchError::Retryable(msg) | FetchError::Fatal(msg) => msg,
        }
    }
}

/// Everything a source needs to fetch one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFetch {
    /// Grid coordinates of the tile
    pub key: TileKey,
    /// World extent in the source's (nudged) coordinate space
    pub extent: WorldRect,
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// Pixels per degree
    pub ppd: u32,
    /// Projection context for URL construction
    pub projection: Projection,
}

/// A remote provider of map tile imagery.
///
/// Implementations are shared across requests and worker tasks, so they
/// must be `Send + Sync`. The trait is object safe; requests hold an
/// `Arc<dyn MapSource>`.
pub trait MapSource: Send + Sync {
    /// Name used for logging and as the cache namespace.
    fn name(&self) -> &str;

    /// World-space translation correcting known misalignment of this source.
    fn nudge(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Maximum fetch attempts per tile.
    fn max_retries(&self) -> u32 {
        DEFAULT_MAX_RETRIES
    }

    /// Timeout applied to each fetch attempt.
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS)
    }

    /// Fetches the image for one tile.
    fn fetch_tile<'a>(&'a self, fetch: &'a TileFetch) -> FetchFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_retryable() {
        let err = FetchError::retryable("connection reset");
        assert!(err.is_retryable());
        assert_eq!(err.message(), "connection reset");
        assert_eq!(err.to_string(), "transient fetch failure: connection reset");
    }

    #[test]
    fn test_fetch_error_fatal() {
        let err = FetchError::fatal("HTTP 404");
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "fetch rejected: HTTP 404");
    }

    #[test]
    fn test_map_source_is_object_safe() {
        fn assert_object_safe(_: Option<&dyn MapSource>) {}
        assert_object_safe(None);
    }
}
