//! Caller-side handle to a running retrieval.

use super::progress::ProgressSnapshot;
use super::Retriever;
use crate::composite::CompositeData;
use crate::request::Request;
use crate::tile::Tile;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a retrieval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetrievalStatus {
    /// Waiting for a retrieval permit
    #[default]
    Queued,
    /// Tiles partitioned and handed to the cache and downloader
    Dispatched,
    /// Every tile resolved and the finished composite delivered
    Finished,
    /// The request was cancelled before finishing
    Cancelled,
}

impl RetrievalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// Handle returned by [`RetrievalService::fetch`](super::RetrievalService::fetch).
///
/// Cloneable; all clones observe the same retrieval.
///
/// ```ignore
/// let handle = service.fetch(request, |data: CompositeData| {
///     println!("{:.0}% finished", data.finished_fraction() * 100.0);
/// });
///
/// match handle.wait().await {
///     Some(data) => data.into_image().save("out.png")?,
///     None => println!("cancelled"),
/// }
/// ```
#[derive(Clone)]
pub struct RetrievalHandle {
    retriever: Arc<Retriever>,
    status_rx: watch::Receiver<RetrievalStatus>,
}

impl RetrievalHandle {
    pub(crate) fn new(retriever: Arc<Retriever>) -> Self {
        let status_rx = retriever.subscribe();
        Self {
            retriever,
            status_rx,
        }
    }

    pub fn request(&self) -> &Arc<Request> {
        self.retriever.request()
    }

    /// Cancels the underlying request. Idempotent.
    pub fn cancel(&self) {
        self.retriever.request().cancel();
    }

    /// Current status; `Cancelled` once the request is cancelled unless it
    /// had already finished.
    pub fn status(&self) -> RetrievalStatus {
        let status = *self.status_rx.borrow();
        if status != RetrievalStatus::Finished && self.request().is_cancelled() {
            RetrievalStatus::Cancelled
        } else {
            status
        }
    }

    /// Tiles covering the request; empty until the retrieval is dispatched.
    pub fn tiles(&self) -> Vec<Arc<Tile>> {
        self.retriever.tiles()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.retriever.progress()
    }

    /// Deep copy of the composite as it stands.
    pub fn snapshot(&self) -> CompositeData {
        self.retriever.snapshot()
    }

    /// Waits for the cache write-through of every downloaded tile so far.
    ///
    /// Call after the finished composite arrives and before shutting the
    /// runtime down, or the last writes may be lost.
    pub async fn flush_cache_writes(&self) {
        self.retriever.flush_cache_writes().await;
    }

    /// Waits for the retrieval to end.
    ///
    /// Returns the finished composite, or `None` if the request was
    /// cancelled first.
    pub async fn wait(&self) -> Option<CompositeData> {
        let mut status_rx = self.status_rx.clone();
        let token = self.request().cancellation_token().clone();

        loop {
            if *status_rx.borrow_and_update() == RetrievalStatus::Finished {
                return Some(self.snapshot());
            }
            if token.is_cancelled() {
                return None;
            }

            tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        let data = self.snapshot();
                        return data.is_finished().then_some(data);
                    }
                }
                _ = token.cancelled() => {}
            }
        }
    }
}

impl fmt::Debug for RetrievalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalHandle")
            .field("request_id", &self.request().id())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RetrievalStatus::Queued.is_terminal());
        assert!(!RetrievalStatus::Dispatched.is_terminal());
        assert!(RetrievalStatus::Finished.is_terminal());
        assert!(RetrievalStatus::Cancelled.is_terminal());
    }
}
