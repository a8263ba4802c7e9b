//! One tile download with retry, backoff and cancellation checks.

use super::config::DownloaderConfig;
use crate::retriever::TileSink;
use crate::source::{FetchError, TileFetch};
use crate::tile::{Tile, TILE_PIXELS};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a download attempt sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// The owner was told the result
    Delivered,
    /// The request was cancelled or the pool shut down; the owner was not told
    Cancelled,
}

/// Builds the source-facing description of a tile.
pub(crate) fn tile_fetch(owner: &dyn TileSink, tile: &Tile) -> TileFetch {
    let request = owner.request();
    TileFetch {
        key: tile.key(),
        extent: *tile.extent(),
        width: TILE_PIXELS,
        height: TILE_PIXELS,
        ppd: tile.ppd(),
        projection: request.projection().clone(),
    }
}

/// Downloads one tile and notifies its owner exactly once.
///
/// Cancellation is observed before the first attempt, during backoff and
/// after the final result; an attempt already on the wire runs to completion
/// and its result is discarded.
pub(crate) async fn run_fetch(
    owner: Arc<dyn TileSink>,
    tile: Arc<Tile>,
    config: &DownloaderConfig,
    shutdown: &CancellationToken,
) -> FetchOutcome {
    let request = Arc::clone(owner.request());
    let cancelled = || request.is_cancelled() || shutdown.is_cancelled();

    if cancelled() {
        return FetchOutcome::Cancelled;
    }

    let source = request.source();
    let fetch = tile_fetch(owner.as_ref(), &tile);
    let max_attempts = source.max_retries().max(1);
    let timeout = source.request_timeout();

    let mut last_error = FetchError::retryable("no attempt made");
    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = config.backoff_for(attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = request.cancellation_token().cancelled() => return FetchOutcome::Cancelled,
                _ = shutdown.cancelled() => return FetchOutcome::Cancelled,
            }
        }

        let result = match tokio::time::timeout(timeout, source.fetch_tile(&fetch)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::retryable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        };

        if cancelled() {
            return FetchOutcome::Cancelled;
        }

        match result {
            Ok(image) => {
                debug!(
                    request = %request.id(),
                    tile = %tile.key(),
                    attempt = attempt + 1,
                    "Tile downloaded"
                );
                owner.tile_downloaded(tile, Ok(image));
                return FetchOutcome::Delivered;
            }
            Err(e) => {
                let retryable = e.is_retryable();
                debug!(
                    request = %request.id(),
                    tile = %tile.key(),
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    "Tile fetch attempt failed"
                );
                last_error = e;
                if !retryable {
                    break;
                }
            }
        }
    }

    warn!(
        request = %request.id(),
        source = source.name(),
        tile = %tile.key(),
        error = %last_error,
        "Giving up on tile"
    );
    owner.tile_downloaded(tile, Err(last_error));
    FetchOutcome::Delivered
}
