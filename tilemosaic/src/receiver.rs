//! Consumers of composite updates.
//!
//! A [`DataReceiver`] is told about every merged arrival and, exactly once,
//! about the finished composite. Calls come from pool threads while the
//! request's lock is held, so a receiver must return quickly and must not
//! call back into the retrieval it is observing.

use crate::composite::CompositeData;
use tokio::sync::mpsc;

/// Receives composite snapshots for one request.
pub trait DataReceiver: Send + Sync {
    /// Called with a deep copy of the composite after each change.
    ///
    /// The last call carries a snapshot whose `is_finished()` is true.
    fn on_update(&self, data: CompositeData);
}

impl<F> DataReceiver for F
where
    F: Fn(CompositeData) + Send + Sync,
{
    fn on_update(&self, data: CompositeData) {
        self(data)
    }
}

/// Forwards snapshots into an unbounded channel.
///
/// Snapshots sent after the receiving half is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelReceiver {
    tx: mpsc::UnboundedSender<CompositeData>,
}

impl ChannelReceiver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompositeData>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DataReceiver for ChannelReceiver {
    fn on_update(&self, data: CompositeData) {
        let _ = self.tx.send(data);
    }
}
