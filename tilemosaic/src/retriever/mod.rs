//! Per-request orchestration.
//!
//! A [`Retriever`] owns one request's tiles and composite. It partitions the
//! request into tiles, asks the cache which of them it holds, and dispatches
//! three streams of work:
//!
//! ```text
//!                      ┌─▶ CacheLayer::get_tiles ───────▶ cached_tile_arrived   (Final)
//!   run ─▶ check_cache ┼─▶ CacheLayer::get_fuzzy_tiles ─▶ fuzzy_tile_arrived    (Fuzzy)
//!                      └─▶ Downloader::submit ──────────▶ tile_downloaded       (Final / error)
//! ```
//!
//! Every arrival is merged into the composite under the request lock and
//! reported to the [`DataReceiver`]. When the cached and non-cached pending
//! sets are both empty the composite is marked finished and delivered one
//! last time.

mod config;
mod handle;
mod progress;
mod service;
mod sink;

pub use config::RetrievalConfig;
pub use handle::{RetrievalHandle, RetrievalStatus};
pub use progress::{Counter, ProgressSnapshot};
pub use service::RetrievalService;
pub use sink::TileSink;

use crate::cache::{CacheCheck, CacheLayer};
use crate::composite::{CompositeData, MergeKind};
use crate::downloader::Downloader;
use crate::receiver::DataReceiver;
use crate::request::Request;
use crate::source::FetchError;
use crate::tile::{tiles_for_request, Tile, TileKey};
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Arrival counters per path.
#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    cached: Counter,
    fuzzy: Counter,
    downloaded: Counter,
}

/// Everything guarded by the request lock.
struct RetrieverState {
    data: CompositeData,
    tiles: Vec<Arc<Tile>>,
    cached_pending: HashSet<TileKey>,
    non_cached_pending: HashSet<TileKey>,
    counters: Counters,
    double_completions: usize,
}

impl RetrieverState {
    fn pending(&self) -> usize {
        self.cached_pending.len() + self.non_cached_pending.len()
    }

    fn all_fetched(&self) -> bool {
        self.cached_pending.is_empty() && self.non_cached_pending.is_empty()
    }

    fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            tiles: self.tiles.len(),
            pending: self.pending(),
            cached: self.counters.cached,
            fuzzy: self.counters.fuzzy,
            downloaded: self.counters.downloaded,
            resolves_issued: self.counters.cached.requested + self.counters.downloaded.requested,
            double_completions: self.double_completions,
        }
    }
}

/// Retrieval of one request.
pub struct Retriever {
    request: Arc<Request>,
    this: Weak<Retriever>,
    cache: CacheLayer,
    downloader: Arc<Downloader>,
    receiver: Arc<dyn DataReceiver>,
    fuzzy: bool,
    status: watch::Sender<RetrievalStatus>,
    state: Mutex<RetrieverState>,
    cache_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl Retriever {
    pub fn new(
        request: Arc<Request>,
        cache: CacheLayer,
        downloader: Arc<Downloader>,
        receiver: Arc<dyn DataReceiver>,
        fuzzy: bool,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(RetrievalStatus::Queued);
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(RetrieverState {
                data: CompositeData::new(Arc::clone(&request)),
                tiles: Vec::new(),
                cached_pending: HashSet::new(),
                non_cached_pending: HashSet::new(),
                counters: Counters::default(),
                double_completions: 0,
            }),
            request,
            this: this.clone(),
            cache,
            downloader,
            receiver,
            fuzzy,
            status,
            cache_writes: Mutex::new(Vec::new()),
        })
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Tiles covering the request; empty until [`Self::run`] starts.
    pub fn tiles(&self) -> Vec<Arc<Tile>> {
        self.state.lock().tiles.clone()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.state.lock().progress()
    }

    /// Deep copy of the composite.
    pub fn snapshot(&self) -> CompositeData {
        self.state.lock().data.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RetrievalStatus> {
        self.status.subscribe()
    }

    /// Waits for every write-through started so far to land in the cache.
    pub async fn flush_cache_writes(&self) {
        let writes = std::mem::take(&mut *self.cache_writes.lock());
        for write in writes {
            if let Err(e) = write.await {
                warn!(request_id = %self.request.id(), error = %e, "Cache write task failed");
            }
        }
    }

    /// Partitions the request and dispatches its tiles.
    ///
    /// Returns once everything is handed off; arrivals continue on the cache
    /// and download pools.
    pub async fn run(self: Arc<Self>) {
        if self.request.is_cancelled() {
            debug!(request_id = %self.request.id(), "Request cancelled before dispatch");
            return;
        }
        self.status.send_replace(RetrievalStatus::Dispatched);

        let incomplete: Vec<Arc<Tile>> = {
            let mut state = self.state.lock();
            if state.tiles.is_empty() {
                state.tiles = tiles_for_request(&self.request);
            }
            state.tiles.iter().filter(|t| !t.is_final()).cloned().collect()
        };

        if incomplete.is_empty() {
            debug!(request_id = %self.request.id(), "No incomplete tiles");
            let mut state = self.state.lock();
            self.finish(&mut state);
            return;
        }

        let check = match self
            .cache
            .check_cache_blocking(Arc::clone(&self.request), incomplete.clone())
            .await
        {
            Ok(check) => check,
            Err(e) => {
                warn!(
                    request_id = %self.request.id(),
                    error = %e,
                    "Cache check failed, downloading every tile"
                );
                CacheCheck {
                    cached: Vec::new(),
                    non_cached: incomplete,
                }
            }
        };
        let CacheCheck { cached, non_cached } = check;

        {
            let mut state = self.state.lock();
            if self.request.is_cancelled() {
                return;
            }
            state.cached_pending = cached.iter().map(|t| t.key()).collect();
            state.non_cached_pending = non_cached.iter().map(|t| t.key()).collect();
            state.counters.cached.requested += cached.len();
            state.counters.downloaded.requested += non_cached.len();
            if self.fuzzy {
                state.counters.fuzzy.requested += non_cached.len();
            }
        }

        info!(
            request_id = %self.request.id(),
            source = self.request.source().name(),
            ppd = self.request.ppd(),
            cached = cached.len(),
            non_cached = non_cached.len(),
            "Request dispatched"
        );

        let sink: Arc<dyn TileSink> = self.clone();
        if !cached.is_empty() {
            self.cache.get_tiles(Arc::clone(&sink), cached);
        }
        if self.fuzzy && !non_cached.is_empty() {
            self.cache
                .get_fuzzy_tiles(Arc::clone(&sink), non_cached.clone());
        }
        self.downloader.submit(sink, non_cached);
    }

    /// Merges a tile that has an image of `kind`, logging merge failures.
    fn merge(&self, state: &mut RetrieverState, tile: &Tile, kind: MergeKind) {
        match state.data.merge_tile(tile, kind) {
            Ok(occurrences) => trace!(
                request_id = %self.request.id(),
                tile = %tile.key(),
                ?kind,
                occurrences,
                "Tile merged"
            ),
            Err(e) => error!(
                request_id = %self.request.id(),
                tile = %tile.key(),
                error = %e,
                "Tile merge failed"
            ),
        }
    }

    /// Reports progress, or finishes when nothing is pending.
    fn after_resolve(&self, state: &mut RetrieverState) {
        if state.all_fetched() {
            self.finish(state);
        } else {
            self.receiver.on_update(state.data.snapshot());
        }
    }

    fn finish(&self, state: &mut RetrieverState) {
        match state.data.mark_finished() {
            Ok(()) => {
                info!(
                    request_id = %self.request.id(),
                    tiles = state.tiles.len(),
                    finished_fraction = state.data.finished_fraction(),
                    "Request finished"
                );
                self.receiver.on_update(state.data.snapshot());
                self.status.send_replace(RetrievalStatus::Finished);
            }
            Err(e) => {
                state.double_completions += 1;
                error!(
                    request_id = %self.request.id(),
                    error = %e,
                    "Request completed twice; a tile was counted more than once"
                );
            }
        }
    }

    fn resolve(&self, pending: &mut HashSet<TileKey>, tile: &Tile, path: &str) {
        if !pending.remove(&tile.key()) {
            warn!(
                request_id = %self.request.id(),
                tile = %tile.key(),
                path,
                "Arrival for a tile that was not pending"
            );
        }
    }
}

impl TileSink for Retriever {
    fn request(&self) -> &Arc<Request> {
        &self.request
    }

    fn resolved_fraction(&self) -> f64 {
        self.state.lock().progress().fraction()
    }

    fn cached_tile_arrived(&self, tile: Arc<Tile>, image: Option<RgbaImage>) {
        let mut state = self.state.lock();
        if self.request.is_cancelled() {
            return;
        }
        state.counters.cached.received += 1;

        let Some(image) = image else {
            // Claimed cached but unreadable: download it instead.
            warn!(
                request_id = %self.request.id(),
                tile = %tile.key(),
                "Cache could not produce a tile it reported, downloading"
            );
            let key = tile.key();
            state.cached_pending.remove(&key);
            state.non_cached_pending.insert(key);
            state.counters.downloaded.requested += 1;
            drop(state);

            match self.this.upgrade() {
                Some(sink) => self.downloader.submit(sink, vec![tile]),
                None => debug!(request_id = %self.request.id(), "Retriever dropped before reroute"),
            }
            return;
        };

        tile.set_final(Arc::new(image));
        self.merge(&mut state, &tile, MergeKind::Final);
        let pending = &mut state.cached_pending;
        self.resolve(pending, &tile, "cache");
        self.after_resolve(&mut state);
    }

    fn fuzzy_tile_arrived(&self, tile: Arc<Tile>, image: Option<RgbaImage>) {
        let mut state = self.state.lock();
        if self.request.is_cancelled() {
            return;
        }
        state.counters.fuzzy.received += 1;

        let Some(image) = image else {
            return;
        };
        if state.data.is_finished() {
            trace!(request_id = %self.request.id(), tile = %tile.key(), "Late fuzzy tile ignored");
            return;
        }
        if tile.set_fuzzy(Arc::new(image)) {
            self.merge(&mut state, &tile, MergeKind::Fuzzy);
            self.receiver.on_update(state.data.snapshot());
        }
    }

    fn tile_downloaded(&self, tile: Arc<Tile>, result: Result<RgbaImage, FetchError>) {
        let mut state = self.state.lock();
        if self.request.is_cancelled() {
            return;
        }
        state.counters.downloaded.received += 1;

        match result {
            Ok(image) => {
                tile.set_final(Arc::new(image));
                self.merge(&mut state, &tile, MergeKind::Final);
                // Started before the finished callback so callers that flush
                // on finish see this write.
                if let Some(write) = self.cache.store_map_data(&self.request, &tile) {
                    self.cache_writes.lock().push(write);
                }
            }
            Err(e) => {
                tile.set_error(e.message());
            }
        }

        let pending = &mut state.non_cached_pending;
        self.resolve(pending, &tile, "download");
        self.after_resolve(&mut state);
    }
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("request_id", &self.request.id())
            .field("fuzzy", &self.fuzzy)
            .field("progress", &self.progress())
            .finish()
    }
}
