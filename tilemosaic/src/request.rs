//! Immutable retrieval request descriptors.
//!
//! A [`Request`] names what a caller wants painted: a source, a world
//! extent and a resolution. Everything but the cancellation flag is fixed
//! at construction, so requests are shared freely as `Arc<Request>` and read
//! without locking.

use crate::geom::WorldRect;
use crate::source::MapSource;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Projection context passed through to the source for URL construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    /// Plain cylindrical lon/lat
    #[default]
    Equirectangular,
    /// Cylindrical projection about a rotated pole
    ObliqueCylindrical { center_lon: f64, center_lat: f64 },
}

impl Projection {
    /// Spatial reference identifier sent to the server.
    pub fn srs(&self) -> String {
        match self {
            Projection::Equirectangular => "EPSG:4326".to_string(),
            Projection::ObliqueCylindrical {
                center_lon,
                center_lat,
            } => format!("AUTO:ocyl,{},{}", center_lon, center_lat),
        }
    }
}

/// Argument errors raised when constructing a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// Resolution must be positive
    #[error("pixels-per-degree must be positive")]
    ZeroResolution,

    /// Extent contains NaN or infinite coordinates
    #[error("extent {0} has non-finite coordinates")]
    NonFiniteExtent(WorldRect),

    /// Extent covers no area
    #[error("extent {0} is empty")]
    EmptyExtent(WorldRect),
}

/// What a caller wants fetched.
pub struct Request {
    id: RequestId,
    source: Arc<dyn MapSource>,
    extent: WorldRect,
    ppd: u32,
    projection: Projection,
    cancel: CancellationToken,
}

impl Request {
    /// Creates a request, validating its arguments.
    pub fn new(
        source: Arc<dyn MapSource>,
        extent: WorldRect,
        ppd: u32,
        projection: Projection,
    ) -> Result<Arc<Self>, RequestError> {
        if ppd == 0 {
            return Err(RequestError::ZeroResolution);
        }
        if !extent.is_finite() {
            return Err(RequestError::NonFiniteExtent(extent));
        }
        if extent.is_empty() {
            return Err(RequestError::EmptyExtent(extent));
        }

        Ok(Arc::new(Self {
            id: RequestId::next(),
            source,
            extent,
            ppd,
            projection,
            cancel: CancellationToken::new(),
        }))
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn source(&self) -> &Arc<dyn MapSource> {
        &self.source
    }

    pub fn extent(&self) -> &WorldRect {
        &self.extent
    }

    pub fn ppd(&self) -> u32 {
        self.ppd
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Extent translated into the source's coordinate space by its nudge.
    pub fn source_extent(&self) -> WorldRect {
        let (dx, dy) = self.source.nudge();
        self.extent.translate(dx, dy)
    }

    /// Abandons all in-flight and future work for this request.
    ///
    /// Idempotent. Results still trickling in are discarded silently.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that resolves when the request is cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl PartialEq for Request {
    /// Two requests are equal when they ask for the same thing.
    fn eq(&self, other: &Self) -> bool {
        self.source.name() == other.source.name()
            && self.extent == other.extent
            && self.ppd == other.ppd
            && self.projection == other.projection
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("source", &self.source.name())
            .field("extent", &self.extent)
            .field("ppd", &self.ppd)
            .field("projection", &self.projection)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FetchError, FetchFuture, TileFetch};

    struct NamedSource(&'static str, (f64, f64));

    impl MapSource for NamedSource {
        fn name(&self) -> &str {
            self.0
        }

        fn nudge(&self) -> (f64, f64) {
            self.1
        }

        fn fetch_tile<'a>(&'a self, _fetch: &'a TileFetch) -> FetchFuture<'a> {
            Box::pin(async { Err(FetchError::fatal("unused")) })
        }
    }

    fn source() -> Arc<dyn MapSource> {
        Arc::new(NamedSource("test", (0.0, 0.0)))
    }

    #[test]
    fn test_new_validates_ppd() {
        let err = Request::new(
            source(),
            WorldRect::new(0.0, 0.0, 1.0, 1.0),
            0,
            Projection::default(),
        )
        .unwrap_err();
        assert_eq!(err, RequestError::ZeroResolution);
    }

    #[test]
    fn test_new_rejects_empty_extent() {
        let extent = WorldRect::new(0.0, 0.0, 0.0, 1.0);
        let err = Request::new(source(), extent, 4, Projection::default()).unwrap_err();
        assert_eq!(err, RequestError::EmptyExtent(extent));
    }

    #[test]
    fn test_new_rejects_nan() {
        let extent = WorldRect::new(f64::NAN, 0.0, 1.0, 1.0);
        let err = Request::new(source(), extent, 4, Projection::default()).unwrap_err();
        assert!(matches!(err, RequestError::NonFiniteExtent(_)));
    }

    #[test]
    fn test_cancel_is_sticky() {
        let req = Request::new(
            source(),
            WorldRect::new(0.0, 0.0, 1.0, 1.0),
            4,
            Projection::default(),
        )
        .unwrap();
        assert!(!req.is_cancelled());
        req.cancel();
        req.cancel();
        assert!(req.is_cancelled());
    }

    #[test]
    fn test_ids_are_unique() {
        let extent = WorldRect::new(0.0, 0.0, 1.0, 1.0);
        let a = Request::new(source(), extent, 4, Projection::default()).unwrap();
        let b = Request::new(source(), extent, 4, Projection::default()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_source_extent_applies_nudge() {
        let req = Request::new(
            Arc::new(NamedSource("nudged", (0.5, -1.0))),
            WorldRect::new(10.0, 10.0, 5.0, 5.0),
            4,
            Projection::default(),
        )
        .unwrap();
        assert_eq!(req.source_extent(), WorldRect::new(10.5, 9.0, 5.0, 5.0));
    }

    #[test]
    fn test_projection_srs() {
        assert_eq!(Projection::Equirectangular.srs(), "EPSG:4326");
        let ocyl = Projection::ObliqueCylindrical {
            center_lon: 137.4,
            center_lat: -4.6,
        };
        assert_eq!(ocyl.srs(), "AUTO:ocyl,137.4,-4.6");
    }
}
