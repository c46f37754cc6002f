//! # sync-files
//!
//! Content-addressed file transfer (spec §4.I): fixed-size chunking, a
//! Merkle tree over chunk hashes for integrity, and an upload/download
//! protocol with resumable uploads. Storage is pluggable; this crate
//! ships one in-memory reference implementation of each storage trait,
//! the same posture as `sync-session`'s document storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod error;
pub mod merkle;
pub mod protocol;
pub mod storage;

pub use chunk::{chunk_data, DEFAULT_CHUNK_SIZE};
pub use error::{FilesError, Result};
pub use merkle::{proof_for, root_of, verify_proof, Hash};
pub use protocol::{FileProtocol, DEFAULT_MAX_FILE_SIZE};
pub use storage::{
    FileStorage, InMemoryFileStorage, InMemoryTemporaryUploadStorage, StoredChunk, StoredFile,
    TemporaryUploadStorage, UploadMetadata,
};
