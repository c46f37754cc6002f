//! # sync-collab
//!
//! Real-time collaborative CRDT document sync: the public facade over
//! the `sync-*` crate family, the way `wraith-core`'s `lib.rs` ties
//! together `wraith-crypto`, `wraith-transport`, and friends behind one
//! top-level crate.
//!
//! A deployment depends on this crate alone; it re-exports the wire
//! codec, stream primitives, middleware, CRDT trait, encryption
//! envelope, pub/sub fabric, file transfer, session state machine, and
//! server routing, and aggregates every sub-crate's error type into
//! [`Error`].
//!
//! ```text
//! sync-wire       (A) — message types, binary codec, content IDs
//! sync-streams    (B) — Source/Sink/Transport, fan-out writer
//! sync-middleware (C) — validator, rate limiter, ack sink/tracker
//! sync-crdt       (D) — Crdt trait, DocTransport bridge, awareness
//! sync-crypto     (E) — AES-256-GCM update envelope
//! sync-pubsub     (F) — PubSub trait, in-memory/Redis/NATS backends
//! sync-files      (I) — chunking, Merkle tree, upload/download protocol
//! sync-session    (G) — per-document session state machine, dedupe
//! sync-server     (H) — permission gate, client/session registries
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};

/// Wire codec: message types, binary framing, content-addressed IDs.
pub use sync_wire as wire;
/// Back-pressured stream primitives: `Source`/`Sink`/`Transport`, fan-out.
pub use sync_streams as streams;
/// Transport middleware: validator, rate limiter, ack sink/tracker.
pub use sync_middleware as middleware;
/// The opaque CRDT contract and its transport bridge.
pub use sync_crdt as crdt;
/// AES-256-GCM encryption envelope for document updates.
pub use sync_crypto as crypto;
/// Pub/sub replication fabric.
pub use sync_pubsub as pubsub;
/// Content-addressed chunked file transfer.
pub use sync_files as files;
/// Per-document session state machine.
pub use sync_session as session;
/// Client/session registries, permission gate, and shutdown sequencing.
pub use sync_server as server;

pub use sync_crdt::{Crdt, MergeUpdates};
pub use sync_server::{PermissionChecker, Server, ServerConfig};
pub use sync_session::{Session, SessionRegistry};
pub use sync_wire::Message;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sync_crdt::LwwDoc;
    use sync_files::{InMemoryFileStorage, InMemoryTemporaryUploadStorage};
    use sync_pubsub::InMemoryPubSub;
    use sync_server::AllowAll;
    use sync_session::{InMemoryDocumentStorage, InMemoryMilestoneStorage};

    #[test]
    fn facade_reexports_are_reachable_from_a_single_dependency() {
        let config = ServerConfig::new("node1", Arc::new(AllowAll), Arc::new(InMemoryPubSub::new()));
        let server: Server<LwwDoc, InMemoryTemporaryUploadStorage, InMemoryFileStorage> =
            Server::new(
                config,
                Arc::new(InMemoryDocumentStorage::<LwwDoc>::new()),
                Arc::new(InMemoryMilestoneStorage::new()),
                InMemoryTemporaryUploadStorage::default(),
                InMemoryFileStorage::default(),
            );
        assert!(server.is_accepting());
    }
}
