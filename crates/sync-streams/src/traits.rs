//! `Source`, `Sink`, and `Transport` contracts (spec §4.B).
//!
//! A [`Source`] is a lazily pullable, back-pressured stream: the
//! producer must await consumer readiness before the next item is
//! delivered. A [`Sink`] is its dual. A [`Transport`] pairs a `Source`
//! and a `Sink` belonging to the same peer. Implementations must
//! deliver messages in per-producer order, support cancellation from
//! either end, and propagate errors to both ends.

use crate::error::StreamError;
use async_trait::async_trait;

/// A pullable stream of items with back-pressure.
#[async_trait]
pub trait Source<T>: Send {
    /// Pull the next item, awaiting one if none is ready yet.
    ///
    /// Returns `Ok(None)` once the source is exhausted (closed
    /// cleanly, no more items will ever arrive).
    async fn recv(&mut self) -> Result<Option<T>, StreamError>;

    /// Stop pulling from this source; further `recv` calls return
    /// `Ok(None)`.
    fn close(&mut self);
}

/// A pushable stream of items with back-pressure.
#[async_trait]
pub trait Sink<T>: Send {
    /// Push an item, awaiting room if the sink is currently full.
    async fn send(&mut self, item: T) -> Result<(), StreamError>;

    /// Close the sink, signaling no more items will be sent.
    async fn close(&mut self) -> Result<(), StreamError>;

    /// Abort the sink immediately with a reason, without a graceful close.
    fn abort(&mut self, reason: &'static str);
}

/// A `Source` and `Sink` pair belonging to the same peer.
pub struct Transport<T> {
    /// The receiving half.
    pub source: Box<dyn Source<T> + Send>,
    /// The sending half.
    pub sink: Box<dyn Sink<T> + Send>,
}

impl<T> Transport<T> {
    /// Pair a source and sink into one transport.
    pub fn new(source: Box<dyn Source<T> + Send>, sink: Box<dyn Sink<T> + Send>) -> Self {
        Self { source, sink }
    }

    /// Split back into independent source and sink halves.
    pub fn split(self) -> (Box<dyn Source<T> + Send>, Box<dyn Sink<T> + Send>) {
        (self.source, self.sink)
    }
}
