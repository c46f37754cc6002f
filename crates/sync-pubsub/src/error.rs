//! Pub/sub errors.

use std::borrow::Cow;
use thiserror::Error;

/// Errors produced by a `PubSub` backend.
#[derive(Debug, Error, Clone)]
pub enum PubSubError {
    /// The backend connection is unavailable.
    #[error("pub/sub backend unavailable: {0}")]
    BackendUnavailable(Cow<'static, str>),

    /// Publishing failed.
    #[error("publish failed: {0}")]
    PublishFailed(Cow<'static, str>),

    /// Subscribing failed.
    #[error("subscribe failed: {0}")]
    SubscribeFailed(Cow<'static, str>),

    /// A message on the bus could not be decoded.
    #[error("malformed bus envelope: {0}")]
    MalformedEnvelope(Cow<'static, str>),
}

/// Result type for pub/sub operations.
pub type Result<T> = std::result::Result<T, PubSubError>;
