//! # sync-server
//!
//! Ties the wire codec, session registry, and file-transfer protocol
//! together into the permission-gated entry point a transport (a
//! websocket handler, a test harness) drives per connected client
//! (spec §4.H).
//!
//! This crate owns policy and routing, not I/O: [`Server`] takes
//! already-decoded [`sync_wire::Message`]s in and hands already-built
//! reply messages back out, leaving framing and socket plumbing to
//! whatever embeds it — the same transport-blind posture
//! `sync-session` takes one layer down.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod permission;
pub mod server;

pub use client::ClientRegistry;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use permission::{Access, AllowAll, Decision, PermissionChecker};
pub use server::{namespaced, Server};
