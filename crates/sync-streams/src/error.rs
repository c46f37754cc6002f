//! Stream primitive errors.

use std::borrow::Cow;
use thiserror::Error;

/// Errors produced by `Source`/`Sink`/`Transport` implementations.
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    /// The peer closed its end of the stream.
    #[error("stream closed")]
    Closed,

    /// The stream was aborted with an application-supplied reason.
    #[error("stream aborted: {0}")]
    Aborted(Cow<'static, str>),

    /// An internal channel send/receive failed unexpectedly.
    #[error("channel error: {0}")]
    Channel(Cow<'static, str>),
}

impl StreamError {
    /// Build an aborted error with static context (zero allocation).
    #[must_use]
    pub const fn aborted(reason: &'static str) -> Self {
        StreamError::Aborted(Cow::Borrowed(reason))
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
