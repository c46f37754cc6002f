//! Session error taxonomy (spec §4.G).

use thiserror::Error;

/// Errors raised while driving a session's state machine or handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An inbound message's `encrypted` flag did not match the session's
    /// fixed encryption posture.
    #[error("message encryption flag does not match session's fixed posture")]
    EncryptionStateMismatch,

    /// A second joiner requested the same document with a different
    /// `encrypted` value than the session was opened with.
    #[error("document {document_id} is already open with a different encryption posture")]
    ConflictingEncryptionPosture {
        /// The document in question.
        document_id: String,
    },

    /// No milestone exists with the given ID.
    #[error("no milestone with id {milestone_id}")]
    UnknownMilestone {
        /// The milestone ID.
        milestone_id: String,
    },

    /// The session has already moved to `Disposed` and can't accept
    /// further operations.
    #[error("session for document {document_id} is disposed")]
    Disposed {
        /// The document in question.
        document_id: String,
    },

    /// Opening the session failed (propagated from a failed storage
    /// fetch during `Initializing`).
    #[error("failed to open session for document {document_id}: {reason}")]
    OpenFailed {
        /// The document in question.
        document_id: String,
        /// Why opening failed.
        reason: String,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SessionError>;
