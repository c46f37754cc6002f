//! Single-node, in-process `PubSub` backend (spec §4.F).
//!
//! Built directly on [`sync_streams::FanOutWriter`]: each topic gets
//! its own fan-out writer, each `subscribe` call registers a fresh
//! reader on that writer, wrapped in a filter that drops the
//! subscriber's own publishes.

use crate::error::PubSubError;
use crate::message::PubSubMessage;
use crate::trait_def::PubSub;
use async_trait::async_trait;
use dashmap::DashMap;
use sync_streams::{FanOutWriter, Source, StreamError};

const READER_CAPACITY: usize = 256;

/// An in-memory pub/sub fabric for a single server process.
#[derive(Default)]
pub struct InMemoryPubSub {
    topics: DashMap<String, FanOutWriter<PubSubMessage>>,
}

impl InMemoryPubSub {
    /// Create an empty in-memory fabric.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, topic: &str, message: Vec<u8>, source_id: &str) -> Result<(), PubSubError> {
        let writer = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(FanOutWriter::new);
        writer.write(PubSubMessage::new(source_id, message));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        own_source_id: &str,
    ) -> Result<Box<dyn Source<PubSubMessage> + Send>, PubSubError> {
        let writer = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(FanOutWriter::new);
        let inner = writer.register_reader(READER_CAPACITY);
        Ok(Box::new(SelfFilteringSource {
            inner: Box::new(inner),
            own_source_id: own_source_id.to_string(),
        }))
    }
}

struct SelfFilteringSource {
    inner: Box<dyn Source<PubSubMessage> + Send>,
    own_source_id: String,
}

#[async_trait::async_trait]
impl Source<PubSubMessage> for SelfFilteringSource {
    async fn recv(&mut self) -> Result<Option<PubSubMessage>, StreamError> {
        loop {
            match self.inner.recv().await? {
                Some(msg) if msg.source_id == self.own_source_id => continue,
                other => return Ok(other),
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = InMemoryPubSub::new();
        let mut a = bus.subscribe("doc1", "node-a").await.unwrap();
        let mut b = bus.subscribe("doc1", "node-b").await.unwrap();

        bus.publish("doc1", vec![1, 2, 3], "node-c").await.unwrap();

        assert_eq!(
            a.recv().await.unwrap().unwrap().payload,
            vec![1, 2, 3]
        );
        assert_eq!(
            b.recv().await.unwrap().unwrap().payload,
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn subscriber_does_not_see_its_own_publish() {
        let bus = InMemoryPubSub::new();
        let mut a = bus.subscribe("doc1", "node-a").await.unwrap();

        bus.publish("doc1", vec![1], "node-a").await.unwrap();
        bus.publish("doc1", vec![2], "node-b").await.unwrap();

        let received = a.recv().await.unwrap().unwrap();
        assert_eq!(received.payload, vec![2]);
        assert_eq!(received.source_id, "node-b");
    }

    #[tokio::test]
    async fn distinct_topics_do_not_cross_talk() {
        let bus = InMemoryPubSub::new();
        let mut sub_doc1 = bus.subscribe("doc1", "node-a").await.unwrap();
        let _sub_doc2 = bus.subscribe("doc2", "node-a").await.unwrap();

        bus.publish("doc2", vec![9], "node-b").await.unwrap();
        bus.publish("doc1", vec![1], "node-b").await.unwrap();

        assert_eq!(sub_doc1.recv().await.unwrap().unwrap().payload, vec![1]);
    }
}
