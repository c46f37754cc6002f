//! File transfer error taxonomy (spec §4.I).

use thiserror::Error;

/// Errors raised while handling an upload or download.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilesError {
    /// The declared size exceeded the configured maximum (spec §4.I step 3).
    #[error("file size {size} exceeds the maximum of {max}")]
    TooLarge {
        /// The declared size.
        size: u64,
        /// The configured maximum.
        max: u64,
    },

    /// No upload with this ID is in progress.
    #[error("no upload in progress for file {file_id}")]
    UnknownUpload {
        /// The file ID.
        file_id: String,
    },

    /// No file with this ID exists in storage.
    #[error("no file stored under id {file_id}")]
    UnknownFile {
        /// The file ID.
        file_id: String,
    },

    /// A chunk's Merkle proof did not verify against the upload's
    /// expected root.
    #[error("merkle proof verification failed for chunk {chunk_index}")]
    ProofMismatch {
        /// The chunk index that failed verification.
        chunk_index: u64,
    },

    /// The final assembled root did not match the value the client committed to.
    #[error("completed upload root does not match the declared file id")]
    RootMismatch,

    /// A chunk carried zero bytes, which is never valid on the wire.
    #[error("chunk {chunk_index} carried zero bytes")]
    EmptyChunk {
        /// The chunk index.
        chunk_index: u64,
    },

    /// The download did not receive every chunk before its timeout elapsed.
    #[error("incomplete download: received {received} of {expected} chunks")]
    IncompleteDownload {
        /// Chunks actually received.
        received: u64,
        /// Chunks expected.
        expected: u64,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FilesError>;
