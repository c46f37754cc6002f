//! # sync-session
//!
//! Per-document session state machine (spec §4.G): load/dispose
//! lifecycle, the sync handshake, milestone request/response handling,
//! fan-out to joined clients, and pubsub echo dedupe. A
//! [`registry::SessionRegistry`] arbitrates concurrent opens for the
//! same document so two callers never race to construct competing
//! sessions.
//!
//! This crate owns session *logic*; it is deliberately transport-blind
//! — [`session::Session::ingest`] takes a decoded `sync_wire::Message`
//! and returns an [`outcome::Outcome`] describing what to send back and
//! what to fan out, leaving the actual I/O to whatever embeds it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dedupe;
pub mod error;
pub mod events;
pub mod outcome;
pub mod registry;
pub mod session;
pub mod state;
pub mod storage;

pub use dedupe::DedupeCache;
pub use error::{Result, SessionError};
pub use events::SessionEvent;
pub use outcome::Outcome;
pub use registry::SessionRegistry;
pub use session::{Origin, Session, DRAIN_GRACE};
pub use state::SessionState;
pub use storage::{
    DocumentStorage, InMemoryDocumentStorage, InMemoryMilestoneStorage, MilestoneStorage,
    StoredDocument,
};
