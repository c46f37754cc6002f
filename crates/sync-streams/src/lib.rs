//! # sync-streams
//!
//! Back-pressured stream primitives shared by every transport layer in
//! the workspace: the `Source`/`Sink`/`Transport` contracts, a
//! fan-out writer (one write, many independent readers), a fan-in
//! reader (many sources, one reader), and a size-or-delay batching
//! transform.
//!
//! Nothing here is protocol-specific — `sync-middleware` and
//! `sync-session` build their wire-aware behavior on top of these
//! primitives.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod channel;
pub mod error;
pub mod fanin;
pub mod fanout;
pub mod traits;

pub use batch::BatchingTransform;
pub use channel::{ChannelSink, ChannelSource};
pub use error::StreamError;
pub use fanin::fan_in;
pub use fanout::FanOutWriter;
pub use traits::{Sink, Source, Transport};
