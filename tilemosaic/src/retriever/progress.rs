//! Progress counters for one retrieval.

/// Requested/received pair for one arrival path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub requested: usize,
    pub received: usize,
}

impl Counter {
    /// Arrivals still outstanding.
    pub fn outstanding(&self) -> usize {
        self.requested.saturating_sub(self.received)
    }
}

/// Point-in-time view of a retrieval's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Tiles covering the request
    pub tiles: usize,
    /// Tiles not yet resolved by a cache hit or a download
    pub pending: usize,
    pub cached: Counter,
    pub fuzzy: Counter,
    pub downloaded: Counter,
    /// Cache gets plus downloads issued; a rerouted tile counts twice
    pub resolves_issued: usize,
    /// Times the request was marked finished more than once
    pub double_completions: usize,
}

impl ProgressSnapshot {
    /// Share of tiles resolved, in `[0, 1]`.
    ///
    /// A request with no tiles counts as fully resolved.
    pub fn fraction(&self) -> f64 {
        if self.tiles == 0 {
            return 1.0;
        }
        (self.tiles - self.pending.min(self.tiles)) as f64 / self.tiles as f64
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}
