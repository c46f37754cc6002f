//! Server error taxonomy.

use thiserror::Error;

/// Errors raised by the server's connection and shutdown plumbing.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server is shutting down and no longer accepts new clients.
    #[error("server is shutting down, not accepting new clients")]
    ShuttingDown,

    /// Opening or reusing a session failed.
    #[error("session error: {0}")]
    Session(#[from] sync_session::SessionError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ServerError>;
