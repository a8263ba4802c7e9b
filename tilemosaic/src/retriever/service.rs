//! Process-wide entry point owning the retrieval and download pools.

use super::config::RetrievalConfig;
use super::handle::RetrievalHandle;
use super::Retriever;
use crate::cache::{CacheLayer, TileCache};
use crate::downloader::Downloader;
use crate::receiver::DataReceiver;
use crate::request::Request;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, Instrument};

/// Runs retrievals against a shared cache and download pool.
///
/// Create one per process and share it. Must be created from within a
/// Tokio runtime, since the download workers start immediately.
pub struct RetrievalService {
    config: RetrievalConfig,
    cache: CacheLayer,
    downloader: Arc<Downloader>,
    permits: Arc<Semaphore>,
}

impl RetrievalService {
    pub fn new(config: RetrievalConfig, cache: Arc<dyn TileCache>) -> Self {
        let downloader = Arc::new(Downloader::new(config.downloader.clone()));
        let permits = Arc::new(Semaphore::new(config.workers.max(1)));

        info!(
            retrieval_workers = config.workers,
            download_workers = config.downloader.workers,
            fuzzy = config.fuzzy,
            cache = cache.name(),
            "Retrieval service started"
        );

        Self {
            config,
            cache: CacheLayer::new(cache),
            downloader,
            permits,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The shared download pool, for observing occupancy.
    pub fn downloader(&self) -> &Arc<Downloader> {
        &self.downloader
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Starts retrieving `request`, reporting to `receiver`.
    ///
    /// Never fails: per-tile problems end up as tile errors and missing
    /// area in the finished composite.
    pub fn fetch(
        &self,
        request: Arc<Request>,
        receiver: impl DataReceiver + 'static,
    ) -> RetrievalHandle {
        self.fetch_shared(request, Arc::new(receiver))
    }

    /// [`Self::fetch`] with an already shared receiver.
    pub fn fetch_shared(
        &self,
        request: Arc<Request>,
        receiver: Arc<dyn DataReceiver>,
    ) -> RetrievalHandle {
        let retriever = Retriever::new(
            Arc::clone(&request),
            self.cache.clone(),
            Arc::clone(&self.downloader),
            receiver,
            self.config.fuzzy,
        );
        let handle = RetrievalHandle::new(Arc::clone(&retriever));

        let permits = Arc::clone(&self.permits);
        let token = request.cancellation_token().clone();
        let span = tracing::debug_span!("retrieval", request_id = %request.id());

        tokio::spawn(
            async move {
                let permit = tokio::select! {
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                    _ = token.cancelled() => {
                        debug!("Cancelled while waiting for a retrieval permit");
                        return;
                    }
                };
                retriever.run().await;
                drop(permit);
            }
            .instrument(span),
        );

        handle
    }

    /// Stops the download pool. Retrievals in progress will not finish.
    pub fn shutdown(&self) {
        self.permits.close();
        self.downloader.shutdown();
    }
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("config", &self.config)
            .field("cache", &self.cache.cache().name())
            .field("queued", &self.downloader.queued())
            .field("active", &self.downloader.active())
            .finish()
    }
}
