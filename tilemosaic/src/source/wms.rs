//! OGC Web Map Service (WMS 1.1.1) tile source.

use super::http::{AsyncHttpClient, HttpError, HttpResponse};
use super::types::{FetchError, FetchFuture, MapSource, TileFetch};
use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_SOURCE_TIMEOUT_SECS};
use image::RgbaImage;
use std::time::Duration;
use tracing::debug;

/// Longest service-exception excerpt carried into an error message.
const MAX_EXCEPTION_EXCERPT: usize = 200;

/// Connection settings for one WMS layer.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsConfig {
    /// Source name used for logging and cache namespacing
    pub name: String,
    /// GetMap endpoint, without WMS query parameters
    pub base_url: String,
    /// Value for the LAYERS parameter
    pub layer: String,
    /// Image MIME type for the FORMAT parameter
    pub format: String,
    /// Attempts per tile before giving up
    pub max_retries: u32,
    /// Timeout per attempt
    pub timeout: Duration,
    /// World-space (dx, dy) correction applied by the retriever
    pub nudge: (f64, f64),
}

impl WmsConfig {
    /// Creates a configuration with defaults for everything but the endpoint.
    pub fn new(base_url: impl Into<String>, layer: impl Into<String>) -> Self {
        let layer = layer.into();
        Self {
            name: layer.clone(),
            base_url: base_url.into(),
            layer,
            format: "image/png".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            nudge: (0.0, 0.0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_nudge(mut self, dx: f64, dy: f64) -> Self {
        self.nudge = (dx, dy);
        self
    }
}

/// Tile source issuing WMS GetMap requests.
pub struct WmsMapSource<C> {
    client: C,
    config: WmsConfig,
}

impl<C: AsyncHttpClient> WmsMapSource<C> {
    pub fn new(client: C, config: WmsConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &WmsConfig {
        &self.config
    }

    /// Builds the GetMap URL for one tile.
    pub fn get_map_url(&self, fetch: &TileFetch) -> Result<String, FetchError> {
        let bbox = format!(
            "{},{},{},{}",
            fetch.extent.min_x, fetch.extent.min_y, fetch.extent.max_x, fetch.extent.max_y
        );
        let width = fetch.width.to_string();
        let height = fetch.height.to_string();
        let srs = fetch.projection.srs();

        let url = reqwest::Url::parse_with_params(
            &self.config.base_url,
            &[
                ("SERVICE", "WMS"),
                ("VERSION", "1.1.1"),
                ("REQUEST", "GetMap"),
                ("LAYERS", self.config.layer.as_str()),
                ("STYLES", ""),
                ("SRS", srs.as_str()),
                ("BBOX", bbox.as_str()),
                ("WIDTH", width.as_str()),
                ("HEIGHT", height.as_str()),
                ("FORMAT", self.config.format.as_str()),
            ],
        )
        .map_err(|e| FetchError::fatal(format!("invalid WMS URL '{}': {}", self.config.base_url, e)))?;

        Ok(url.into())
    }
}

impl<C: AsyncHttpClient> MapSource for WmsMapSource<C> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn nudge(&self) -> (f64, f64) {
        self.config.nudge
    }

    fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    fn request_timeout(&self) -> Duration {
        self.config.timeout
    }

    fn fetch_tile<'a>(&'a self, fetch: &'a TileFetch) -> FetchFuture<'a> {
        Box::pin(async move {
            let url = self.get_map_url(fetch)?;
            debug!(source = %self.config.name, tile = ?fetch.key, "WMS GetMap");

            let response = self.client.get(&url).await.map_err(classify_transport)?;
            decode_response(response, fetch)
        })
    }
}

/// Maps transport failures onto the retry policy.
fn classify_transport(err: HttpError) -> FetchError {
    match err {
        HttpError::Timeout(_) | HttpError::Connect(_) | HttpError::Request(_) => {
            FetchError::retryable(err.to_string())
        }
        HttpError::Client(_) => FetchError::fatal(err.to_string()),
    }
}

/// Turns a GetMap response into an image or a classified error.
fn decode_response(response: HttpResponse, fetch: &TileFetch) -> Result<RgbaImage, FetchError> {
    if !response.is_success() {
        let msg = format!("HTTP {}", response.status);
        return Err(if response.status >= 500 || response.status == 429 {
            FetchError::retryable(msg)
        } else {
            FetchError::fatal(msg)
        });
    }

    let is_xml = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("xml"));
    if is_xml {
        let text = String::from_utf8_lossy(&response.body);
        let excerpt: String = text.chars().take(MAX_EXCEPTION_EXCERPT).collect();
        return Err(FetchError::fatal(format!("WMS service exception: {}", excerpt)));
    }

    let image = image::load_from_memory(&response.body)
        .map_err(|e| FetchError::fatal(format!("undecodable tile image: {}", e)))?
        .to_rgba8();

    if image.width() != fetch.width || image.height() != fetch.height {
        return Err(FetchError::fatal(format!(
            "expected {}x{} tile, got {}x{}",
            fetch.width,
            fetch.height,
            image.width(),
            image.height()
        )));
    }

    Ok(image)
}
