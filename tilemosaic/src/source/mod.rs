//! Map tile source abstraction.
//!
//! A [`MapSource`] turns one tile's world rectangle into an image. The
//! retrieval pipeline only depends on the trait; [`WmsMapSource`] is the
//! bundled implementation speaking OGC WMS over HTTP.
//!
//! ```ignore
//! use tilemosaic::source::{AsyncReqwestClient, WmsConfig, WmsMapSource};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = AsyncReqwestClient::new(Duration::from_secs(30))?;
//! let source = Arc::new(WmsMapSource::new(
//!     client,
//!     WmsConfig::new("https://maps.example.org/wms", "mola_shaded"),
//! ));
//! ```

mod http;
mod types;
mod wms;

pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpError, HttpResponse};
pub use types::{FetchError, FetchFuture, MapSource, TileFetch};
pub use wms::{WmsConfig, WmsMapSource};
