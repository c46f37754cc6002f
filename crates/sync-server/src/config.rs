//! Server-wide configuration (spec §4.H, §6 "process surface").

use crate::permission::PermissionChecker;
use std::sync::Arc;
use std::time::Duration;
use sync_files::DEFAULT_MAX_FILE_SIZE;
use sync_pubsub::PubSub;

/// Every knob a deployment needs to stand up a [`crate::Server`].
///
/// Mirrors spec.md §6's process surface (`nodeId`, `checkPermission`,
/// `pubSub`, `maxFileSize`, `sessionCleanupDelayMs`, `ackTimeoutMs`)
/// plus the ambient logging level a deployment wires into `tracing`.
pub struct ServerConfig {
    /// This node's identity, used as the pubsub `source_id` for
    /// messages this node publishes (so a multi-node deployment never
    /// echoes its own publishes back to itself).
    pub node_id: String,
    /// Permission checker consulted by the permission gate.
    pub check_permission: Arc<dyn PermissionChecker>,
    /// Pub/sub fabric used for cross-session and cross-node replication.
    pub pub_sub: Arc<dyn PubSub>,
    /// Largest file a client may upload, in bytes.
    pub max_file_size: u64,
    /// Grace period a drained session waits before disposing
    /// (mirrors [`sync_session::DRAIN_GRACE`]; kept configurable here
    /// since a deployment may want a shorter value for tests).
    pub session_cleanup_delay: Duration,
    /// How long an `ack-tracking-sink` waits for an ACK before timing out.
    pub ack_timeout: Duration,
}

impl ServerConfig {
    /// A config with sensible defaults and the given identity,
    /// permission checker, and pub/sub backend.
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        check_permission: Arc<dyn PermissionChecker>,
        pub_sub: Arc<dyn PubSub>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            check_permission,
            pub_sub,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            session_cleanup_delay: sync_session::DRAIN_GRACE,
            ack_timeout: Duration::from_secs(30),
        }
    }
}
