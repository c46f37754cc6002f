//! Shared helpers for the end-to-end scenario tests in `scenarios.rs`.

use std::sync::Arc;
use sync_crdt::{Crdt, LwwDoc, MergeUpdates};
use sync_files::{InMemoryFileStorage, InMemoryTemporaryUploadStorage};
use sync_pubsub::{InMemoryPubSub, PubSub};
use sync_server::{AllowAll, Server, ServerConfig};
use sync_session::{InMemoryDocumentStorage, InMemoryMilestoneStorage};

/// A server wired entirely to in-memory reference backends, sharing
/// `pub_sub` with any sibling node a test constructs for multi-node
/// scenarios.
pub fn in_memory_server(
    node_id: &str,
    pub_sub: Arc<dyn PubSub>,
) -> Server<LwwDoc, InMemoryTemporaryUploadStorage, InMemoryFileStorage> {
    let config = ServerConfig::new(node_id, Arc::new(AllowAll), pub_sub);
    Server::new(
        config,
        Arc::new(InMemoryDocumentStorage::<LwwDoc>::new()),
        Arc::new(InMemoryMilestoneStorage::new()),
        InMemoryTemporaryUploadStorage::default(),
        InMemoryFileStorage::default(),
    )
}

/// Build a one-writer CRDT update encoding `text` as a fresh document.
pub fn update_with_text(writer: &str, text: &str) -> Vec<u8> {
    let mut doc = LwwDoc::default();
    doc.write_local(writer, text)
}
