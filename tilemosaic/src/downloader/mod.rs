//! Shared download pool.
//!
//! One [`Downloader`] serves every retrieval in the process. Tiles the cache
//! cannot supply are queued here and fetched by a fixed number of worker
//! tasks. The queue is ordered so the request with the smallest resolved
//! fraction is served first; a small interactive request submitted while a
//! bulk request is mid-flight jumps ahead of the bulk request's remaining
//! tiles.
//!
//! Each queued tile is fetched with retries and exponential backoff, then
//! handed back to its owner through [`TileSink::tile_downloaded`]. Tiles of a
//! cancelled request are dropped without a callback.

mod config;
mod queue;
mod task;

pub use config::DownloaderConfig;

use crate::retriever::TileSink;
use crate::tile::Tile;
use parking_lot::Mutex;
use queue::FetchQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// State shared by the handle and its workers.
struct Shared {
    queue: Mutex<FetchQueue>,
    notify: Notify,
    shutdown: CancellationToken,
    active: AtomicUsize,
    config: DownloaderConfig,
}

/// Priority-ordered pool of download workers.
pub struct Downloader {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Downloader {
    /// Starts the worker tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: DownloaderConfig) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(FetchQueue::default()),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
            active: AtomicUsize::new(0),
            config,
        });

        let workers = (0..shared.config.workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&shared))))
            .collect();

        info!(workers = shared.config.workers, "Download pool started");

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.shared.config
    }

    /// Queues tiles for download on behalf of `owner`.
    ///
    /// The owner's resolved fraction is read once, now, and fixes the
    /// priority of every tile in this batch.
    pub fn submit(&self, owner: Arc<dyn TileSink>, tiles: Vec<Arc<Tile>>) {
        if tiles.is_empty() {
            return;
        }
        if self.shared.shutdown.is_cancelled() {
            debug!(
                request = %owner.request().id(),
                tiles = tiles.len(),
                "Download pool shut down, dropping tiles"
            );
            return;
        }

        let count = tiles.len();
        let resolved = owner.resolved_fraction();
        self.shared.queue.lock().push_all(&owner, resolved, tiles);
        trace!(request = %owner.request().id(), tiles = count, "Tiles queued for download");

        for _ in 0..count {
            self.shared.notify.notify_one();
        }
    }

    /// Tiles waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Fetches currently in progress.
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Stops the workers and discards queued tiles.
    ///
    /// Fetches in flight finish their current attempt but report nothing.
    pub fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.shutdown.cancel();
        let dropped = {
            let mut queue = self.shared.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        info!(dropped, "Download pool shutting down");
    }

    /// Shuts down and waits for every worker to exit.
    pub async fn join(&self) {
        self.shutdown();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn worker_loop(id: usize, shared: Arc<Shared>) {
    trace!(worker = id, "Download worker started");

    loop {
        if shared.shutdown.is_cancelled() {
            break;
        }

        let next = shared.queue.lock().pop();
        let job = match next {
            Some(job) => job,
            None => {
                tokio::select! {
                    _ = shared.notify.notified() => {}
                    _ = shared.shutdown.cancelled() => break,
                }
                continue;
            }
        };

        shared.active.fetch_add(1, Ordering::Relaxed);
        let outcome = task::run_fetch(job.owner, job.tile, &shared.config, &shared.shutdown).await;
        shared.active.fetch_sub(1, Ordering::Relaxed);
        trace!(worker = id, ?outcome, "Download finished");
    }

    trace!(worker = id, "Download worker stopped");
}
