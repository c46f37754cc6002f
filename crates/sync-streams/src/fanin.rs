//! Fan-in reader: merge several sources into one (spec §4.B).
//!
//! Items from different sources may be arbitrarily interleaved; within
//! a single source, order is preserved because each source is drained
//! by a single dedicated task that only moves to the next item once
//! the merged output has accepted the current one.

use crate::channel::ChannelSource;
use crate::traits::Source;
use tokio::sync::mpsc;

/// Merge several sources into a single source.
///
/// The returned source yields items as soon as any input source
/// produces one; it closes once every input source has closed.
pub fn fan_in<T>(sources: Vec<Box<dyn Source<T> + Send>>, capacity: usize) -> ChannelSource<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    for mut source in sources {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Ok(Some(item)) = source.recv().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
    }

    ChannelSource::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelSink, ChannelSource};
    use crate::traits::Sink;
    use std::collections::HashSet;

    #[tokio::test]
    async fn merges_all_sources() {
        let (tx_a, rx_a) = mpsc::channel(8);
        let (tx_b, rx_b) = mpsc::channel(8);
        let mut sink_a = ChannelSink::new(tx_a);
        let mut sink_b = ChannelSink::new(tx_b);

        sink_a.send(1u32).await.unwrap();
        sink_a.send(2u32).await.unwrap();
        sink_b.send(3u32).await.unwrap();
        drop(sink_a);
        drop(sink_b);

        let sources: Vec<Box<dyn Source<u32> + Send>> = vec![
            Box::new(ChannelSource::new(rx_a)),
            Box::new(ChannelSource::new(rx_b)),
        ];
        let mut merged = fan_in(sources, 8);

        let mut seen = HashSet::new();
        while let Some(item) = merged.recv().await.unwrap() {
            seen.insert(item);
        }
        assert_eq!(seen, HashSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn preserves_order_within_one_source() {
        let (tx, rx) = mpsc::channel(8);
        let mut sink = ChannelSink::new(tx);
        for i in 0..10 {
            sink.send(i).await.unwrap();
        }
        drop(sink);

        let sources: Vec<Box<dyn Source<u32> + Send>> = vec![Box::new(ChannelSource::new(rx))];
        let mut merged = fan_in(sources, 8);

        for i in 0..10 {
            assert_eq!(merged.recv().await.unwrap(), Some(i));
        }
        assert_eq!(merged.recv().await.unwrap(), None);
    }
}
