//! Passthrough observation hooks: `onRead` / `onWrite` (spec §4.C).

use async_trait::async_trait;
use std::sync::Arc;
use sync_streams::{Sink, Source, StreamError};
use sync_wire::Message;

/// Observation hook invoked around a read or write, without altering
/// the message or the result.
pub trait Observer: Send + Sync {
    /// Called after a message is pulled from a source.
    fn on_read(&self, _message: &Message) {}
    /// Called before a message is pushed to a sink.
    fn on_write(&self, _message: &Message) {}
}

/// An `Observer` that emits a `tracing` event for every read and write.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_read(&self, message: &Message) {
        tracing::debug!(
            message_id = %message.id(),
            document = ?message.document(),
            "read"
        );
    }

    fn on_write(&self, message: &Message) {
        tracing::debug!(
            message_id = %message.id(),
            document = ?message.document(),
            "write"
        );
    }
}

/// A `Source` that invokes an `Observer` on every pulled message,
/// otherwise a transparent passthrough.
pub struct ObservingSource {
    inner: Box<dyn Source<Message> + Send>,
    observer: Arc<dyn Observer>,
}

impl ObservingSource {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Source<Message> + Send>, observer: Arc<dyn Observer>) -> Self {
        Self { inner, observer }
    }
}

#[async_trait]
impl Source<Message> for ObservingSource {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        let message = self.inner.recv().await?;
        if let Some(message) = &message {
            self.observer.on_read(message);
        }
        Ok(message)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// A `Sink` that invokes an `Observer` on every pushed message,
/// otherwise a transparent passthrough.
pub struct ObservingSink {
    inner: Box<dyn Sink<Message> + Send>,
    observer: Arc<dyn Observer>,
}

impl ObservingSink {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Sink<Message> + Send>, observer: Arc<dyn Observer>) -> Self {
        Self { inner, observer }
    }
}

#[async_trait]
impl Sink<Message> for ObservingSink {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        self.observer.on_write(&item);
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sync_streams::channel::ChannelSink;
    use sync_wire::message::{AwarenessMessage, Context};
    use sync_wire::AwarenessPayload;
    use tokio::sync::mpsc;

    struct CountingObserver(AtomicUsize);

    impl Observer for CountingObserver {
        fn on_write(&self, _message: &Message) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test]
    async fn observer_is_invoked_without_altering_the_write() {
        let (tx, mut rx) = mpsc::channel(4);
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let mut sink = ObservingSink::new(Box::new(ChannelSink::new(tx)), observer.clone());

        sink.send(Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        )))
        .await
        .unwrap();

        assert_eq!(observer.0.load(Ordering::Relaxed), 1);
        assert!(rx.recv().await.is_some());
    }
}
