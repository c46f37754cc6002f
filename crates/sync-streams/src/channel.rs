//! `Source`/`Sink` implementations over `tokio::sync::mpsc`.
//!
//! `tokio::sync::broadcast` is deliberately avoided everywhere in this
//! crate: it drops messages for lagging receivers once its ring buffer
//! wraps, which would violate the "no reader loses messages" contract
//! of the fan-out writer (spec §4.B).

use crate::error::StreamError;
use crate::traits::{Sink, Source};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A `Source` over a bounded `tokio::sync::mpsc::Receiver`.
pub struct ChannelSource<T> {
    rx: Option<mpsc::Receiver<T>>,
}

impl<T> ChannelSource<T> {
    /// Wrap a receiver.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self { rx: Some(rx) }
    }
}

#[async_trait]
impl<T: Send> Source<T> for ChannelSource<T> {
    async fn recv(&mut self) -> Result<Option<T>, StreamError> {
        match &mut self.rx {
            Some(rx) => Ok(rx.recv().await),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.rx = None;
    }
}

/// A `Sink` over a bounded `tokio::sync::mpsc::Sender`.
pub struct ChannelSink<T> {
    tx: Option<mpsc::Sender<T>>,
}

impl<T> ChannelSink<T> {
    /// Wrap a sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl<T: Send> Sink<T> for ChannelSink<T> {
    async fn send(&mut self, item: T) -> Result<(), StreamError> {
        match &self.tx {
            Some(tx) => tx
                .send(item)
                .await
                .map_err(|_| StreamError::aborted("receiver dropped")),
            None => Err(StreamError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.tx = None;
        Ok(())
    }

    fn abort(&mut self, reason: &'static str) {
        self.tx = None;
        tracing::warn!(reason, "sink aborted");
    }
}
