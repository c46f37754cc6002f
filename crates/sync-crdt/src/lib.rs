//! # sync-crdt
//!
//! The opaque CRDT contract (spec §4.D, §6) — `merge`, `diff`,
//! `stateVectorOf`, `apply`, `encodeStateAsUpdate` — plus one in-memory
//! reference document (`LwwDoc`, a last-write-wins op log) good enough
//! to drive tests, and the transport bridge connecting a local document
//! and its awareness state to `sync_streams::Transport<Message>`
//! semantics (spec §4.D, §4.K).
//!
//! This crate does not implement a real CRDT algorithm. A production
//! deployment swaps `LwwDoc` for a real document (Yjs, Automerge, or
//! similar) that implements the same `Crdt`/`MergeUpdates` traits.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod awareness;
pub mod error;
pub mod lww;
pub mod traits;
pub mod transport;

pub use awareness::AwarenessState;
pub use error::CrdtError;
pub use lww::LwwDoc;
pub use traits::{ChangeEvent, Crdt, MergeUpdates};
pub use transport::{new_doc_transport, DocHandle, DocSink, DocSource};
