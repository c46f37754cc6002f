//! After writing, record the message ID in a pending set with a
//! timeout; subscribe to an ack topic on the pub/sub fabric; remove
//! pending IDs as acks arrive; `wait_for_acks` resolves once the set
//! empties or the timeout elapses (spec §4.C, §4.J sender side).

use crate::error::MiddlewareError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use sync_pubsub::PubSub;
use sync_streams::{Sink, StreamError};
use sync_wire::Message;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A `Sink` that tracks delivery acks for everything it writes.
pub struct AckTrackingSink {
    inner: Box<dyn Sink<Message> + Send>,
    pending: Arc<DashMap<String, Instant>>,
    timeout: Duration,
    listener: JoinHandle<()>,
}

impl AckTrackingSink {
    /// Wrap `inner`, subscribing to `ack_topic` on `pubsub` to learn of
    /// acks. `own_source_id` is this sink's identity on the bus (so it
    /// never observes its own echoed publishes, per the pub/sub
    /// self-loop rule).
    pub async fn new(
        inner: Box<dyn Sink<Message> + Send>,
        pubsub: Arc<dyn PubSub>,
        ack_topic: String,
        own_source_id: String,
        timeout: Duration,
    ) -> Result<Self, MiddlewareError> {
        let pending: Arc<DashMap<String, Instant>> = Arc::new(DashMap::new());
        let mut ack_source = pubsub
            .subscribe(&ack_topic, &own_source_id)
            .await
            .map_err(|e| MiddlewareError::SubscriptionFailed(e.to_string().into()))?;

        let pending_for_task = Arc::clone(&pending);
        let listener = tokio::spawn(async move {
            while let Ok(Some(bus_message)) = ack_source.recv().await {
                if let Ok(Message::Ack(ack)) = Message::decode(&bus_message.payload) {
                    pending_for_task.remove(&ack.payload.message_id);
                }
            }
        });

        Ok(Self {
            inner,
            pending,
            timeout,
            listener,
        })
    }

    /// Resolve once every message written so far has been acked, or
    /// fail once `timeout` has elapsed with acks still outstanding.
    pub async fn wait_for_acks(&self) -> Result<(), MiddlewareError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.pending.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MiddlewareError::AckTimeout {
                    missing: self.pending.len(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Number of writes still awaiting an ack.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for AckTrackingSink {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl Sink<Message> for AckTrackingSink {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        let message_id = item.id().to_base64();
        self.pending.insert(message_id, Instant::now());
        self.inner.send(item).await
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close().await
    }

    fn abort(&mut self, reason: &'static str) {
        self.inner.abort(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_pubsub::InMemoryPubSub;
    use sync_streams::channel::ChannelSink;
    use sync_wire::message::{AckMessage, AwarenessMessage, Context};
    use sync_wire::AwarenessPayload;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn wait_for_acks_resolves_once_ack_arrives() {
        let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::new());
        let (tx, _rx) = mpsc::channel(4);

        let mut sink = AckTrackingSink::new(
            Box::new(ChannelSink::new(tx)),
            Arc::clone(&pubsub),
            "doc1-acks".into(),
            "server".into(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let message = Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        ));
        let message_id = message.id().to_base64();
        sink.send(message).await.unwrap();
        assert_eq!(sink.pending_count(), 1);

        let ack = Message::Ack(AckMessage::new(Context::local(), message_id));
        pubsub
            .publish("doc1-acks", ack.encode(), "client-a")
            .await
            .unwrap();

        sink.wait_for_acks().await.unwrap();
        assert_eq!(sink.pending_count(), 0);
    }

    #[tokio::test]
    async fn wait_for_acks_times_out_when_ack_never_arrives() {
        let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::new());
        let (tx, _rx) = mpsc::channel(4);

        let mut sink = AckTrackingSink::new(
            Box::new(ChannelSink::new(tx)),
            pubsub,
            "doc1-acks".into(),
            "server".into(),
            Duration::from_millis(30),
        )
        .await
        .unwrap();

        sink.send(Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        )))
        .await
        .unwrap();

        let result = sink.wait_for_acks().await;
        assert!(matches!(
            result,
            Err(MiddlewareError::AckTimeout { missing: 1 })
        ));
    }
}
