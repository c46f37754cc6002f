//! The `PubSub` contract (spec §4.F).

use crate::error::PubSubError;
use crate::message::PubSubMessage;
use async_trait::async_trait;
use sync_streams::Source;

/// A topic-keyed publish/subscribe fabric.
///
/// Implementations MUST deliver every publish to every subscriber of
/// the same topic (at-least-once) and MUST filter out a subscriber's
/// own publishes (messages whose `source_id` equals the subscriber's
/// own `source_id`) before they reach that subscriber — this crate's
/// [`crate::in_memory::InMemoryPubSub`] and the optional backends all
/// enforce this centrally so callers never have to.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish `message` on `topic`, tagged with `source_id`.
    async fn publish(&self, topic: &str, message: Vec<u8>, source_id: &str) -> Result<(), PubSubError>;

    /// Subscribe to `topic`. Messages originally published with
    /// `source_id == own_source_id` are never delivered back.
    async fn subscribe(
        &self,
        topic: &str,
        own_source_id: &str,
    ) -> Result<Box<dyn Source<PubSubMessage> + Send>, PubSubError>;
}
