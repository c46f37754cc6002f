//! Batching transform (spec §4.B): groups items by size or time,
//! whichever limit is hit first.

use crate::error::StreamError;
use crate::traits::Source;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Wraps a `Source`, emitting `Vec<T>` batches instead of individual
/// items.
pub struct BatchingTransform<T> {
    inner: Box<dyn Source<T> + Send>,
    max_batch_size: usize,
    max_batch_delay: Duration,
}

impl<T: Send + 'static> BatchingTransform<T> {
    /// Wrap `inner`, batching up to `max_batch_size` items or
    /// `max_batch_delay`, whichever comes first.
    #[must_use]
    pub fn new(inner: Box<dyn Source<T> + Send>, max_batch_size: usize, max_batch_delay: Duration) -> Self {
        Self {
            inner,
            max_batch_size: max_batch_size.max(1),
            max_batch_delay,
        }
    }

    /// Pull the next batch. Returns `Ok(None)` once the inner source is
    /// exhausted and no partial batch remains.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<T>>, StreamError> {
        let mut batch = Vec::with_capacity(self.max_batch_size);
        let deadline = Instant::now() + self.max_batch_delay;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                biased;
                item = self.inner.recv() => {
                    match item? {
                        Some(item) => {
                            batch.push(item);
                            if batch.len() >= self.max_batch_size {
                                return Ok(Some(batch));
                            }
                        }
                        None => {
                            return Ok(if batch.is_empty() { None } else { Some(batch) });
                        }
                    }
                }
                () = sleep(remaining) => {
                    return Ok(if batch.is_empty() { None } else { Some(batch) });
                }
            }
        }
    }
}
