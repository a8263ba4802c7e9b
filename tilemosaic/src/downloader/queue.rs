//! Priority queue of pending tile fetches.

use crate::retriever::TileSink;
use crate::tile::Tile;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// A tile waiting for a download worker.
///
/// Ordered so that tiles from the request with the smallest resolved
/// fraction come first, then FIFO by sequence number. The fraction is
/// captured when the tile is queued and never refreshed, so a bulk request
/// that has made progress since does not overtake its own earlier tiles.
pub(crate) struct QueuedFetch {
    pub owner: Arc<dyn TileSink>,
    pub tile: Arc<Tile>,
    /// Owner's resolved fraction at enqueue time.
    pub resolved: f64,
    /// Sequence number for FIFO ordering within equal fractions.
    pub sequence: u64,
}

impl PartialEq for QueuedFetch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedFetch {}

impl PartialOrd for QueuedFetch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedFetch {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest: less resolved first, then older first
        other
            .resolved
            .total_cmp(&self.resolved)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl std::fmt::Debug for QueuedFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedFetch")
            .field("request_id", &self.owner.request().id())
            .field("tile", &self.tile.key())
            .field("resolved", &self.resolved)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Heap plus the sequence counter feeding it.
#[derive(Default)]
pub(crate) struct FetchQueue {
    heap: BinaryHeap<QueuedFetch>,
    next_sequence: u64,
}

impl FetchQueue {
    /// Queues tiles for one owner at the rank given by `resolved`.
    ///
    /// The caller reads the owner's fraction before locking the queue; the
    /// owner's own lock must never be taken while the queue is held.
    pub fn push_all(&mut self, owner: &Arc<dyn TileSink>, resolved: f64, tiles: Vec<Arc<Tile>>) {
        for tile in tiles {
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            self.heap.push(QueuedFetch {
                owner: Arc::clone(owner),
                tile,
                resolved,
                sequence,
            });
        }
    }

    pub fn pop(&mut self) -> Option<QueuedFetch> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
