//! `isAuthorized` gate: unauthorized messages are dropped silently,
//! never errored (spec §4.C).

use async_trait::async_trait;
use std::sync::Arc;
use sync_streams::{Sink, Source, StreamError};
use sync_wire::Message;

/// Which side of a connection a message is traveling toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Arriving from the peer.
    Inbound,
    /// Leaving toward the peer.
    Outbound,
}

/// Decides whether a message may pass in a given direction.
pub trait Validator: Send + Sync {
    /// Return `false` to silently drop `message`.
    fn is_authorized(&self, message: &Message, direction: Direction) -> bool;
}

/// A `Validator` built from a plain closure.
pub struct FnValidator<F>(pub F);

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Message, Direction) -> bool + Send + Sync,
{
    fn is_authorized(&self, message: &Message, direction: Direction) -> bool {
        (self.0)(message, direction)
    }
}

/// A `Source` that drops unauthorized inbound messages.
pub struct ValidatingSource {
    inner: Box<dyn Source<Message> + Send>,
    validator: Arc<dyn Validator>,
}

impl ValidatingSource {
    /// Wrap `inner`, checking every pulled message against `validator`.
    #[must_use]
    pub fn new(inner: Box<dyn Source<Message> + Send>, validator: Arc<dyn Validator>) -> Self {
        Self { inner, validator }
    }
}

#[async_trait]
impl Source<Message> for ValidatingSource {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        loop {
            match self.inner.recv().await? {
                Some(message) => {
                    if self.validator.is_authorized(&message, Direction::Inbound) {
                        return Ok(Some(message));
                    }
                    tracing::debug!(message_id = %message.id(), "dropped unauthorized inbound message");
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// A `Sink` that drops unauthorized outbound messages.
pub struct ValidatingSink {
    inner: Box<dyn Sink<Message> + Send>,
    validator: Arc<dyn Validator>,
}

impl ValidatingSink {
    /// Wrap `inner`, checking every pushed message against `validator`.
    #[must_use]
    pub fn new(inner: Box<dyn Sink<Message> + Send>, validator: Arc<dyn Validator>) -> Self {
        Self { inner, validator }
    }
}

#[async_trait]
impl Sink<Message> for ValidatingSink {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        if !self.validator.is_authorized(&item, Direction::Outbound) {
            tracing::debug!(message_id = %item.id(), "dropped unauthorized outbound message");
            return Ok(());
        }
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
    use sync_streams::channel::{ChannelSink, ChannelSource};
    use sync_wire::message::{AwarenessMessage, Context};
    use sync_wire::AwarenessPayload;
    use tokio::sync::mpsc;

    fn awareness_msg() -> Message {
        Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        ))
    }

    #[tokio::test]
    async fn unauthorized_outbound_message_is_dropped_not_errored() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ValidatingSink::new(
            Box::new(ChannelSink::new(tx)),
            Arc::new(FnValidator(|_: &Message, _: Direction| false)),
        );
        sink.send(awareness_msg()).await.unwrap();
        drop(sink);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn authorized_inbound_message_passes_through() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(awareness_msg()).await.unwrap();
        drop(tx);

        let mut source = ValidatingSource::new(
            Box::new(ChannelSource::new(rx)),
            Arc::new(FnValidator(|_: &Message, _: Direction| true)),
        );
        assert!(source.recv().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unauthorized_inbound_message_is_skipped() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(awareness_msg()).await.unwrap();
        drop(tx);

        let mut source = ValidatingSource::new(
            Box::new(ChannelSource::new(rx)),
            Arc::new(FnValidator(|_: &Message, _: Direction| false)),
        );
        assert_eq!(source.recv().await.unwrap(), None);
    }
}
