//! # sync-pubsub
//!
//! Topic-keyed publish/subscribe fabric that lets many server nodes
//! share the same document (spec §4.F). `InMemoryPubSub` is the
//! always-available single-node backend; `RedisPubSub` and
//! `NatsPubSub` are optional multi-node backends behind Cargo
//! features.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod in_memory;
pub mod message;
pub mod trait_def;

#[cfg(feature = "redis-backend")]
pub mod redis_backend;

#[cfg(feature = "nats-backend")]
pub mod nats_backend;

pub use error::PubSubError;
pub use in_memory::InMemoryPubSub;
pub use message::PubSubMessage;
pub use trait_def::PubSub;

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisPubSub;

#[cfg(feature = "nats-backend")]
pub use nats_backend::NatsPubSub;
