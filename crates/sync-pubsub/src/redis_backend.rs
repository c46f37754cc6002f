//! Redis-backed `PubSub` (spec §4.F), gated behind the `redis-backend`
//! feature. Multi-node deployments publish on a Redis channel named
//! after the topic; every node subscribed to that channel receives the
//! envelope and re-filters on `source_id` the same way the in-memory
//! backend does.

use crate::error::PubSubError;
use crate::message::PubSubMessage;
use crate::trait_def::PubSub;
use async_trait::async_trait;
use redis::AsyncCommands;
use sync_streams::{ChannelSource, Source, StreamError};
use tokio::sync::mpsc;

/// A `PubSub` fabric backed by Redis pub/sub channels.
pub struct RedisPubSub {
    client: redis::Client,
}

impl RedisPubSub {
    /// Connect to a Redis instance at `redis_url` (e.g. `redis://127.0.0.1/`).
    pub fn new(redis_url: &str) -> Result<Self, PubSubError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PubSubError::BackendUnavailable(e.to_string().into()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, topic: &str, message: Vec<u8>, source_id: &str) -> Result<(), PubSubError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PubSubError::BackendUnavailable(e.to_string().into()))?;
        let envelope = PubSubMessage::new(source_id, message).encode();
        conn.publish::<_, _, ()>(topic, envelope)
            .await
            .map_err(|e| PubSubError::PublishFailed(e.to_string().into()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        own_source_id: &str,
    ) -> Result<Box<dyn Source<PubSubMessage> + Send>, PubSubError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| PubSubError::SubscribeFailed(e.to_string().into()))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| PubSubError::SubscribeFailed(e.to_string().into()))?;

        let (tx, rx) = mpsc::channel(256);
        let own_source_id = own_source_id.to_string();
        tokio::spawn(async move {
            use futures_util::StreamExt;
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                let decoded = match PubSubMessage::decode(&payload) {
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

impl From<StreamError> for PubSubError {
    fn from(err: StreamError) -> Self {
        PubSubError::SubscribeFailed(err.to_string().into())
    }
}
