//! Integration tests for the retrieval pipeline.
//!
//! These drive a full `RetrievalService` against a scripted map source and
//! in-memory caches, covering:
//! - Whole-world and date-line-spanning requests
//! - Cancellation before any tile arrives
//! - Retry exhaustion and fatal failures
//! - Cache hits, write-through and fuzzy placeholders
//! - Rerouting tiles the cache claimed but could not produce

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tilemosaic::cache::{CacheError, CacheKey, MemoryTileCache, TileCache};
use tilemosaic::composite::CompositeData;
use tilemosaic::downloader::DownloaderConfig;
use tilemosaic::geom::WorldRect;
use tilemosaic::receiver::ChannelReceiver;
use tilemosaic::request::{Projection, Request};
use tilemosaic::retriever::{RetrievalConfig, RetrievalHandle, RetrievalService, RetrievalStatus};
use tilemosaic::source::{FetchError, FetchFuture, MapSource, TileFetch};
use tilemosaic::tile::{TileKey, TILE_PIXELS};

// =============================================================================
// Test Helpers
// =============================================================================

const SOURCE_NAME: &str = "grid";

/// Color a tile is painted with; red encodes the column.
fn tile_color(key: TileKey) -> Rgba<u8> {
    Rgba([(key.x() * 10) as u8, (key.y() * 10) as u8, 128, 255])
}

/// Source painting each tile a solid color derived from its key.
struct GridSource {
    failing: HashSet<TileKey>,
    fatal: bool,
    delay: Duration,
    slow: HashMap<TileKey, Duration>,
    calls: Mutex<HashMap<TileKey, u32>>,
}

impl GridSource {
    fn new() -> Self {
        Self {
            failing: HashSet::new(),
            fatal: false,
            delay: Duration::ZERO,
            slow: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn failing(mut self, key: TileKey, fatal: bool) -> Self {
        self.failing.insert(key);
        self.fatal = fatal;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Holds one tile back so it arrives after the others.
    fn with_slow_tile(mut self, key: TileKey, delay: Duration) -> Self {
        self.slow.insert(key, delay);
        self
    }

    fn calls_for(&self, key: TileKey) -> u32 {
        self.calls.lock().get(&key).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }
}

impl MapSource for GridSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn max_retries(&self) -> u32 {
        3
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn fetch_tile<'a>(&'a self, fetch: &'a TileFetch) -> FetchFuture<'a> {
        Box::pin(async move {
            *self.calls.lock().entry(fetch.key).or_insert(0) += 1;
            let delay = self.slow.get(&fetch.key).copied().unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&fetch.key) {
                return Err(if self.fatal {
                    FetchError::fatal("HTTP 404")
                } else {
                    FetchError::retryable("HTTP 503")
                });
            }
            Ok(RgbaImage::from_pixel(
                fetch.width,
                fetch.height,
                tile_color(fetch.key),
            ))
        })
    }
}

/// Cache that claims to hold every tile but can produce none of them.
#[derive(Default)]
struct LyingCache {
    stored: Mutex<Vec<CacheKey>>,
}

impl TileCache for LyingCache {
    fn name(&self) -> &str {
        "lying"
    }

    fn contains(&self, _key: &CacheKey) -> bool {
        true
    }

    fn get_tile(&self, _key: &CacheKey) -> Option<RgbaImage> {
        None
    }

    fn store_tile(&self, key: &CacheKey, _image: &RgbaImage) -> Result<(), CacheError> {
        self.stored.lock().push(key.clone());
        Ok(())
    }
}

fn service(cache: Arc<dyn TileCache>) -> RetrievalService {
    let config = RetrievalConfig::default().with_downloader(
        DownloaderConfig::default()
            .with_workers(4)
            .with_retry_backoff(Duration::from_millis(1)),
    );
    RetrievalService::new(config, cache)
}

fn request(source: &Arc<GridSource>, extent: WorldRect, ppd: u32) -> Arc<Request> {
    let source: Arc<dyn MapSource> = source.clone();
    Request::new(source, extent, ppd, Projection::default()).unwrap()
}

/// Starts a fetch recording every update.
fn fetch_recorded(
    service: &RetrievalService,
    request: Arc<Request>,
) -> (RetrievalHandle, Arc<Mutex<Vec<CompositeData>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let handle = service.fetch(request, move |data: CompositeData| sink.lock().push(data));
    (handle, updates)
}

async fn wait_finished(handle: &RetrievalHandle) -> CompositeData {
    tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .expect("retrieval timed out")
        .expect("retrieval was cancelled")
}

async fn eventually(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn assert_single_finish_last(updates: &[CompositeData]) {
    let finished: Vec<usize> = updates
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_finished())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(finished, vec![updates.len() - 1], "exactly one finish, delivered last");
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_whole_planet_at_one_ppd() {
    // Column 1 reaches past 360 degrees; hold it back so it lands last.
    let source = Arc::new(
        GridSource::new().with_slow_tile(TileKey::new(1, 0), Duration::from_millis(100)),
    );
    let service = service(Arc::new(MemoryTileCache::new()));
    let extent = WorldRect::new(0.0, -90.0, 360.0, 180.0);
    let (handle, updates) = fetch_recorded(&service, request(&source, extent, 1));

    let data = wait_finished(&handle).await;

    assert!(data.is_finished());
    assert_eq!(data.dimensions(), (360, 180));
    assert!(data.finished_area().covers(&extent));
    assert!(data.fuzzy_area().is_empty());
    assert!(data.missing_area().is_empty());

    let image = data.image().unwrap();
    assert_eq!(image.get_pixel(0, 0)[0], 0);
    assert_eq!(image.get_pixel(100, 90)[0], 0);
    assert_eq!(image.get_pixel(255, 179)[0], 0);
    assert_eq!(image.get_pixel(256, 0)[0], 10);
    assert_eq!(image.get_pixel(359, 179)[0], 10);

    // 256-degree tiles: two columns reach past the antimeridian, one row.
    let progress = handle.progress();
    assert_eq!(progress.tiles, 2);
    assert_eq!(progress.downloaded.received, 2);
    assert_eq!(source.total_calls(), 2);
    assert_eq!(handle.status(), RetrievalStatus::Finished);

    assert_single_finish_last(&updates.lock());
}

#[tokio::test]
async fn test_cancel_before_arrival_fires_no_callbacks() {
    let source = Arc::new(GridSource::new().with_delay(Duration::from_millis(200)));
    let service = service(Arc::new(MemoryTileCache::new()));
    let req = request(&source, WorldRect::new(0.0, -90.0, 64.0, 32.0), 8);
    let (handle, updates) = fetch_recorded(&service, req);

    handle.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("wait did not return");
    assert!(result.is_none());

    // Let any in-flight fetch complete and be discarded.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(updates.lock().is_empty());
    assert_eq!(handle.status(), RetrievalStatus::Cancelled);
    assert!(!handle.snapshot().is_finished());
}

#[tokio::test]
async fn test_exhausted_retries_still_finish() {
    let broken = TileKey::new(1, 0);
    let source = Arc::new(GridSource::new().failing(broken, false));
    let service = service(Arc::new(MemoryTileCache::new()));
    let (handle, updates) =
        fetch_recorded(&service, request(&source, WorldRect::new(0.0, -90.0, 64.0, 32.0), 8));

    let data = wait_finished(&handle).await;

    assert_eq!(source.calls_for(broken), 3);
    assert_eq!(source.calls_for(TileKey::new(0, 0)), 1);

    let tiles = handle.tiles();
    let failed = tiles.iter().find(|t| t.key() == broken).unwrap();
    assert!(failed.has_error());
    assert!(!failed.is_final());
    assert_eq!(failed.error().as_deref(), Some("HTTP 503"));

    assert!((data.finished_area().area() - 32.0 * 32.0).abs() < 1e-9);
    assert!(data
        .missing_area()
        .covers(&WorldRect::new(32.0, -90.0, 32.0, 32.0)));

    assert_single_finish_last(&updates.lock());
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let broken = TileKey::new(0, 0);
    let source = Arc::new(GridSource::new().failing(broken, true));
    let service = service(Arc::new(MemoryTileCache::new()));
    let (handle, _updates) =
        fetch_recorded(&service, request(&source, WorldRect::new(0.0, -90.0, 32.0, 32.0), 8));

    let data = wait_finished(&handle).await;

    assert_eq!(source.calls_for(broken), 1);
    assert!(data.finished_area().is_empty());
    assert_eq!(handle.tiles()[0].error().as_deref(), Some("HTTP 404"));
}

#[tokio::test]
async fn test_wraparound_extent_paints_each_occurrence() {
    // Column 11 spans 352..384 degrees; it arrives after column 0.
    let source = Arc::new(
        GridSource::new().with_slow_tile(TileKey::new(11, 0), Duration::from_millis(100)),
    );
    let service = service(Arc::new(MemoryTileCache::new()));
    let extent = WorldRect::new(-10.0, -90.0, 380.0, 16.0);
    let (handle, _updates) = fetch_recorded(&service, request(&source, extent, 8));

    let data = wait_finished(&handle).await;

    // 32-degree columns 0..=11 cover the whole period once each.
    assert_eq!(handle.progress().tiles, 12);
    assert_eq!(source.total_calls(), 12);
    assert!(data.finished_area().covers(&extent));

    let image = data.into_image();
    assert_eq!(image.dimensions(), (380 * 8, 16 * 8));
    // Longitude -5 and 355 are the same place: column 11.
    assert_eq!(image.get_pixel(40, 10)[0], 110);
    assert_eq!(image.get_pixel(2920, 10)[0], 110);
    // Longitude 28: column 0 only.
    assert_eq!(image.get_pixel(304, 10)[0], 0);
    // Longitudes 0..24 and 360..370 lie under column 11's overhang but
    // belong to column 0.
    assert_eq!(image.get_pixel(80, 10)[0], 0);
    assert_eq!(image.get_pixel(240, 10)[0], 0);
    assert_eq!(image.get_pixel(2960, 10)[0], 0);
    assert_eq!(image.get_pixel(3000, 10)[0], 0);
    assert_eq!(image.get_pixel(3039, 10)[0], 0);
}

#[tokio::test]
async fn test_cache_inconsistency_reroutes_to_download() {
    let source = Arc::new(GridSource::new());
    let cache = Arc::new(LyingCache::default());
    let service = service(cache.clone());
    let extent = WorldRect::new(0.0, -90.0, 64.0, 32.0);
    let (handle, updates) = fetch_recorded(&service, request(&source, extent, 8));

    let data = wait_finished(&handle).await;

    let progress = handle.progress();
    assert_eq!(progress.tiles, 2);
    assert_eq!(progress.cached.requested, 2);
    assert_eq!(progress.cached.received, 2);
    assert_eq!(progress.downloaded.requested, 2);
    assert_eq!(progress.downloaded.received, 2);
    // Each rerouted tile counts as two resolve operations.
    assert_eq!(progress.resolves_issued, 4);
    assert_eq!(progress.double_completions, 0);
    assert!(data.finished_area().covers(&extent));

    eventually(|| cache.stored.lock().len() == 2).await;
    assert_single_finish_last(&updates.lock());
}

#[tokio::test]
async fn test_resolve_count_matches_tiles() {
    let source = Arc::new(GridSource::new());
    let cache = Arc::new(MemoryTileCache::new());
    let hit = TileKey::new(0, 0);
    cache.insert(
        CacheKey::new(SOURCE_NAME, 8, hit),
        RgbaImage::from_pixel(TILE_PIXELS, TILE_PIXELS, Rgba([1, 2, 3, 255])),
    );
    let service = service(cache.clone());

    let (receiver, mut rx) = ChannelReceiver::new();
    let req = request(&source, WorldRect::new(0.0, -90.0, 96.0, 32.0), 8);
    let handle = service.fetch(req, receiver);

    let data = wait_finished(&handle).await;

    let progress = handle.progress();
    assert_eq!(progress.tiles, 3);
    assert_eq!(progress.resolves_issued, 3);
    assert_eq!(progress.cached.requested, 1);
    assert_eq!(progress.downloaded.requested, 2);
    assert_eq!(source.calls_for(hit), 0);
    assert_eq!(source.total_calls(), 2);

    // Cache hit painted from the cache, not the source.
    assert_eq!(data.image().unwrap().get_pixel(0, 255), &Rgba([1, 2, 3, 255]));

    // Downloads are written through; the cache hit is not rewritten.
    eventually(|| cache.len() == 3).await;
    assert_eq!(cache.stats().stores, 2);

    let mut received = Vec::new();
    while let Ok(update) = rx.try_recv() {
        received.push(update);
    }
    assert_eq!(received.len(), 3);
    assert_single_finish_last(&received);
}

#[tokio::test]
async fn test_fuzzy_placeholder_shown_before_final() {
    let source = Arc::new(GridSource::new().with_delay(Duration::from_millis(150)));
    let cache = Arc::new(MemoryTileCache::new());
    // Coarser tile at 4 ppd covering the 8 ppd tile (0, 0).
    cache.insert(
        CacheKey::new(SOURCE_NAME, 4, TileKey::new(0, 0)),
        RgbaImage::from_pixel(TILE_PIXELS, TILE_PIXELS, Rgba([7, 7, 7, 255])),
    );
    let service = service(cache);
    let extent = WorldRect::new(0.0, -90.0, 32.0, 32.0);
    let (handle, updates) = fetch_recorded(&service, request(&source, extent, 8));

    let data = wait_finished(&handle).await;

    let updates = updates.lock();
    let first = &updates[0];
    assert!(!first.is_finished());
    assert!(first.fuzzy_area().covers(&extent));
    assert_eq!(first.image().unwrap().get_pixel(0, 0), &Rgba([7, 7, 7, 255]));

    assert!(data.finished_area().covers(&extent));
    assert!(data.fuzzy_area().is_empty());
    assert_eq!(data.image().unwrap().get_pixel(0, 0), &tile_color(TileKey::new(0, 0)));

    let progress = handle.progress();
    assert_eq!(progress.fuzzy.requested, 1);
    assert_eq!(progress.fuzzy.received, 1);
    assert_single_finish_last(&updates);
}

#[tokio::test]
async fn test_extent_beyond_pole_finishes_immediately() {
    let source = Arc::new(GridSource::new());
    let service = service(Arc::new(MemoryTileCache::new()));
    let (handle, updates) =
        fetch_recorded(&service, request(&source, WorldRect::new(0.0, 95.0, 10.0, 5.0), 8));

    let data = wait_finished(&handle).await;

    assert_eq!(handle.progress().tiles, 0);
    assert_eq!(source.total_calls(), 0);
    assert!(data.finished_area().is_empty());
    assert_eq!(updates.lock().len(), 1);
}
