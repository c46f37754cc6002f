//! # sync-middleware
//!
//! Composable wrappers that preserve `Transport` semantics while
//! adding cross-cutting behavior (spec §4.C): authorization gating,
//! token-bucket rate limiting, ack synthesis, ack-delivery tracking,
//! and logging/passthrough observation hooks. Each wrapper takes a
//! `sync_streams::Source`/`Sink` and returns one, so they compose in
//! any order the caller needs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ack_sink;
pub mod ack_tracking_sink;
pub mod error;
pub mod logger;
pub mod rate_limiter;
pub mod validator;

pub use ack_sink::AckSink;
pub use ack_tracking_sink::AckTrackingSink;
pub use error::MiddlewareError;
pub use logger::{Observer, ObservingSink, ObservingSource, TracingObserver};
pub use rate_limiter::{RateLimitConfig, RateLimiter, RateLimitingSink};
pub use validator::{Direction, FnValidator, Validator, ValidatingSink, ValidatingSource};
