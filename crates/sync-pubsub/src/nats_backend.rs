//! NATS-backed `PubSub` (spec §4.F), gated behind the `nats-backend`
//! feature.

use crate::error::PubSubError;
use crate::message::PubSubMessage;
use crate::trait_def::PubSub;
use async_trait::async_trait;
use sync_streams::{ChannelSource, Source};
use tokio::sync::mpsc;

/// A `PubSub` fabric backed by a NATS core pub/sub subject per topic.
pub struct NatsPubSub {
    client: async_nats::Client,
}

impl NatsPubSub {
    /// Wrap an already-connected NATS client.
    #[must_use]
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Connect to a NATS server at `url`.
    pub async fn connect(url: &str) -> Result<Self, PubSubError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| PubSubError::BackendUnavailable(e.to_string().into()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PubSub for NatsPubSub {
    async fn publish(&self, topic: &str, message: Vec<u8>, source_id: &str) -> Result<(), PubSubError> {
        let envelope = PubSubMessage::new(source_id, message).encode();
        self.client
            .publish(topic.to_string(), envelope.into())
            .await
            .map_err(|e| PubSubError::PublishFailed(e.to_string().into()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        own_source_id: &str,
    ) -> Result<Box<dyn Source<PubSubMessage> + Send>, PubSubError> {
        let mut subscriber = self
            .client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| PubSubError::SubscribeFailed(e.to_string().into()))?;

        let (tx, rx) = mpsc::channel(256);
        let own_source_id = own_source_id.to_string();
        tokio::spawn(async move {
            use futures_util::StreamExt;
            while let Some(msg) = subscriber.next().await {
                let decoded = match PubSubMessage::decode(&msg.payload) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                if decoded.source_id == own_source_id {
                    continue;
                }
                if tx.send(decoded).await.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChannelSource::new(rx)))
    }
}
