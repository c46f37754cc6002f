//! Errors surfaced by the reference CRDT document and transport bridge.

use std::borrow::Cow;
use thiserror::Error;

/// Errors from decoding a CRDT update/state-vector encoding, or from
/// the document transport bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrdtError {
    /// An update or state-vector byte string was truncated or otherwise malformed.
    #[error("malformed update encoding")]
    MalformedUpdate,

    /// A string field inside an update was not valid UTF-8.
    #[error("invalid utf-8 in update field")]
    InvalidUtf8,

    /// The remote rejected the sync handshake.
    #[error("sync rejected: {reason}")]
    SyncRejected {
        /// The reason given by the remote.
        reason: Cow<'static, str>,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CrdtError>;
