//! Fan-out writer: one write, many independent readers (spec §4.B).
//!
//! Each registered reader gets its own bounded delivery queue and its
//! own relay task. `write` pushes into every reader's unbounded relay
//! immediately — it never waits on a slow reader — and each relay task
//! drains its item into the reader's bounded queue one at a time, in
//! arrival order. The effect matches the spec's contract exactly:
//! readers created after a write do not see past items, no reader ever
//! loses a message, and a slow reader's back-pressure is confined to
//! its own queue rather than stalling the writer or other readers.

use crate::channel::ChannelSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A fan-out writer for items of type `T`.
///
/// `T` must be `Clone` because the same logical item is delivered to
/// every registered reader independently.
pub struct FanOutWriter<T> {
    readers: Arc<dashmap::DashMap<u64, mpsc::UnboundedSender<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for FanOutWriter<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FanOutWriter<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty fan-out writer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: Arc::new(dashmap::DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a new reader with the given bounded queue capacity.
    ///
    /// Only items written *after* this call are visible to the
    /// returned source.
    pub fn register_reader(&self, capacity: usize) -> ChannelSource<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (relay_tx, mut relay_rx) = mpsc::unbounded_channel::<T>();
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));

        self.readers.insert(id, relay_tx);
        let readers = Arc::clone(&self.readers);
        tokio::spawn(async move {
            while let Some(item) = relay_rx.recv().await {
                if out_tx.send(item).await.is_err() {
                    break;
                }
            }
            readers.remove(&id);
        });

        ChannelSource::new(out_rx)
    }

    /// Write an item to every currently registered reader.
    ///
    /// Never blocks on a slow reader: delivery into each reader's
    /// bounded queue happens on that reader's own relay task.
    pub fn write(&self, item: T) {
        self.readers.retain(|_, relay| relay.send(item.clone()).is_ok());
    }

    /// Number of currently registered (not-yet-closed) readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}
