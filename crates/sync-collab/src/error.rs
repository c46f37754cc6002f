//! Aggregated top-level error, folding every sub-crate's error type
//! together the way `wraith_core::Error` wraps `wraith_crypto::CryptoError`.

use thiserror::Error;

/// Any error that can surface from the collaborative sync stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire codec error (malformed or truncated message bytes).
    #[error("codec error: {0}")]
    Codec(#[from] sync_wire::CodecError),

    /// Transport middleware error (rate limit, ack timeout, ...).
    #[error("middleware error: {0}")]
    Middleware(#[from] sync_middleware::MiddlewareError),

    /// CRDT apply/merge error.
    #[error("crdt error: {0}")]
    Crdt(#[from] sync_crdt::CrdtError),

    /// Encryption envelope error.
    #[error("crypto error: {0}")]
    Crypto(#[from] sync_crypto::CryptoError),

    /// Pub/sub fabric error.
    #[error("pubsub error: {0}")]
    PubSub(#[from] sync_pubsub::PubSubError),

    /// File-transfer protocol error.
    #[error("files error: {0}")]
    Files(#[from] sync_files::FilesError),

    /// Session state machine error.
    #[error("session error: {0}")]
    Session(#[from] sync_session::SessionError),

    /// Server routing/shutdown error.
    #[error("server error: {0}")]
    Server(#[from] sync_server::ServerError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
