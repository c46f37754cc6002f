//! After a non-ack message is successfully written, synthesize and
//! publish an ack whose `messageId` equals the written message's
//! content ID (spec §4.C).

use async_trait::async_trait;
use sync_streams::{Sink, StreamError};
use sync_wire::message::{AckMessage, Context};
use sync_wire::Message;

/// Wraps a write sink and a target for the synthesized acks (typically
/// the originating client's own outbound sink).
pub struct AckSink {
    inner: Box<dyn Sink<Message> + Send>,
    ack_target: Box<dyn Sink<Message> + Send>,
    context: Context,
}

impl AckSink {
    /// `inner` is where the original message is written (e.g. storage
    /// or the session fan-out); `ack_target` receives the synthesized
    /// ack; `context` is attached to the ack.
    #[must_use]
    pub fn new(
        inner: Box<dyn Sink<Message> + Send>,
        ack_target: Box<dyn Sink<Message> + Send>,
        context: Context,
    ) -> Self {
        Self {
            inner,
            ack_target,
            context,
        }
    }
}

#[async_trait]
impl Sink<Message> for AckSink {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        let is_ack = matches!(item, Message::Ack(_));
        let message_id = item.id().to_base64();
        self.inner.send(item).await?;
        if !is_ack {
            let ack = Message::Ack(AckMessage::new(self.context.clone(), message_id));
            self.ack_target.send(ack).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close().await?;
        self.ack_target.close().await
    }

    fn abort(&mut self, reason: &'static str) {
        self.inner.abort(reason);
        self.ack_target.abort(reason);
    }
}
