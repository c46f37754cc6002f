//! Middleware-specific errors.

use std::borrow::Cow;
use thiserror::Error;

/// Errors that are specific to the middleware layer (as opposed to the
/// underlying `StreamError` surfaced by `Sink`/`Source`).
#[derive(Debug, Error, Clone)]
pub enum MiddlewareError {
    /// The subject's token bucket was empty.
    #[error("rate limit exceeded for {subject}")]
    RateLimitExceeded {
        /// The rate-limited subject (user, document, or connection key).
        subject: String,
    },

    /// A message exceeded the configured maximum size.
    #[error("message size {size} exceeds limit {limit}")]
    MessageTooLarge {
        /// The message's encoded size in bytes.
        size: usize,
        /// The configured limit.
        limit: usize,
    },

    /// `wait_for_acks` did not observe every pending ack before its deadline.
    #[error("timed out waiting for {missing} pending ack(s)")]
    AckTimeout {
        /// Number of acks still outstanding when the timeout fired.
        missing: usize,
    },

    /// The underlying pub/sub subscription used for ack tracking failed.
    #[error("ack tracking subscription failed: {0}")]
    SubscriptionFailed(Cow<'static, str>),
}
