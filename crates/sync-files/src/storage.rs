//! Pluggable upload/download storage (spec §4.I). The spec scopes
//! concrete storage drivers out; each trait ships one in-memory
//! reference implementation so the protocol layer is exercisable and
//! testable, the same posture as `sync-session`'s `DocumentStorage`.

use crate::error::{FilesError, Result};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Metadata describing an uploaded (or downloadable) file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Original filename.
    pub filename: String,
    /// Size in bytes, including encryption overhead when encrypted.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Client clock timestamp, milliseconds since epoch.
    pub last_modified: u64,
    /// Whether the chunk bytes are an encryption envelope.
    pub encrypted: bool,
    /// `base64(merkleRoot)` the client committed to locally before
    /// sending any chunk. Every chunk's Merkle proof is verified against
    /// this, not against `file_id` (the unrelated upload UUID).
    pub expected_root: String,
}

/// One chunk as stored by the server, with enough of the original
/// `file-part` payload to reconstruct it byte-for-byte during a resume
/// handshake (spec §4.I "Resumability").
#[derive(Debug, Clone)]
pub struct StoredChunk {
    /// Chunk bytes (plaintext or ciphertext per `encrypted`).
    pub data: Vec<u8>,
    /// The Merkle proof the client sent alongside this chunk.
    pub proof: Vec<Vec<u8>>,
    /// Cumulative bytes uploaded as of this chunk, as the client reported it.
    pub bytes_uploaded: u64,
}

struct UploadState {
    metadata: UploadMetadata,
    total_chunks: u64,
    chunks: std::collections::BTreeMap<u64, StoredChunk>,
}

/// A completed, permanently stored file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Original upload metadata.
    pub metadata: UploadMetadata,
    /// Chunk bytes in order.
    pub chunks: Vec<Vec<u8>>,
    /// The Merkle root (equals `base64::decode(file_id)`).
    pub root: [u8; 32],
}

/// Where in-flight (not-yet-complete) uploads live until assembled.
pub trait TemporaryUploadStorage: Send + Sync {
    /// Begin (or resume) an upload. Returns the chunks already held for
    /// `file_id`, if any were found — empty for a brand-new upload.
    fn begin_upload(
        &self,
        file_id: &str,
        metadata: UploadMetadata,
        total_chunks: u64,
    ) -> Vec<(u64, StoredChunk)>;

    /// Record one chunk. Overwrites any prior chunk at the same index
    /// (a client may legitimately resend one it's unsure was stored).
    fn store_chunk(&self, file_id: &str, index: u64, chunk: StoredChunk) -> Result<()>;

    /// The root this upload's chunks are verified against, as committed
    /// at `begin_upload` time.
    fn expected_root(&self, file_id: &str) -> Result<String>;

    /// Gather every stored chunk (in index order) and the metadata for
    /// a finished upload, removing it from temporary storage.
    fn take_upload(&self, file_id: &str) -> Result<(UploadMetadata, Vec<Vec<u8>>)>;
}

/// In-memory reference `TemporaryUploadStorage`.
#[derive(Default)]
pub struct InMemoryTemporaryUploadStorage {
    uploads: DashMap<String, Mutex<UploadState>>,
}

impl InMemoryTemporaryUploadStorage {
    /// An empty temporary upload store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemporaryUploadStorage for InMemoryTemporaryUploadStorage {
    fn begin_upload(
        &self,
        file_id: &str,
        metadata: UploadMetadata,
        total_chunks: u64,
    ) -> Vec<(u64, StoredChunk)> {
        if let Some(existing) = self.uploads.get(file_id) {
            let state = existing.lock().unwrap();
            return state
                .chunks
                .iter()
                .map(|(index, chunk)| (*index, chunk.clone()))
                .collect();
        }
        self.uploads.insert(
            file_id.to_string(),
            Mutex::new(UploadState {
                metadata,
                total_chunks,
                chunks: std::collections::BTreeMap::new(),
            }),
        );
        Vec::new()
    }

    fn store_chunk(&self, file_id: &str, index: u64, chunk: StoredChunk) -> Result<()> {
        let upload = self
            .uploads
            .get(file_id)
            .ok_or_else(|| FilesError::UnknownUpload {
                file_id: file_id.to_string(),
            })?;
        upload.lock().unwrap().chunks.insert(index, chunk);
        Ok(())
    }

    fn expected_root(&self, file_id: &str) -> Result<String> {
        let upload = self
            .uploads
            .get(file_id)
            .ok_or_else(|| FilesError::UnknownUpload {
                file_id: file_id.to_string(),
            })?;
        Ok(upload.lock().unwrap().metadata.expected_root.clone())
    }

    fn take_upload(&self, file_id: &str) -> Result<(UploadMetadata, Vec<Vec<u8>>)> {
        let (_, state) =
            self.uploads
                .remove(file_id)
                .ok_or_else(|| FilesError::UnknownUpload {
                    file_id: file_id.to_string(),
                })?;
        let state = state.into_inner().unwrap();
        let chunks = state.chunks.into_values().map(|c| c.data).collect();
        Ok((state.metadata, chunks))
    }
}

/// Where completed files live permanently, keyed by `base64(merkleRoot)`.
pub trait FileStorage: Send + Sync {
    /// Persist a completed upload, returning the permanent file ID.
    fn store_file_from_upload(
        &self,
        metadata: UploadMetadata,
        chunks: Vec<Vec<u8>>,
        root: [u8; 32],
        file_id: String,
    );

    /// Look up a previously stored file.
    fn get(&self, file_id: &str) -> Option<Arc<StoredFile>>;
}

/// In-memory reference `FileStorage`.
#[derive(Default)]
pub struct InMemoryFileStorage {
    files: DashMap<String, Arc<StoredFile>>,
}

impl InMemoryFileStorage {
    /// An empty file store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileStorage for InMemoryFileStorage {
    fn store_file_from_upload(
        &self,
        metadata: UploadMetadata,
        chunks: Vec<Vec<u8>>,
        root: [u8; 32],
        file_id: String,
    ) {
        self.files.insert(
            file_id,
            Arc::new(StoredFile {
                metadata,
                chunks,
                root,
            }),
        );
    }

    fn get(&self, file_id: &str) -> Option<Arc<StoredFile>> {
        self.files.get(file_id).map(|entry| Arc::clone(&entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> UploadMetadata {
        UploadMetadata {
            filename: "test.txt".into(),
            size: 10,
            mime_type: "text/plain".into(),
            last_modified: 0,
            encrypted: false,
            expected_root: "root-b64".into(),
        }
    }

    #[test]
    fn begin_upload_on_new_file_id_returns_no_existing_chunks() {
        let store = InMemoryTemporaryUploadStorage::new();
        let existing = store.begin_upload("u1", metadata(), 1);
        assert!(existing.is_empty());
    }

    #[test]
    fn expected_root_is_recalled_for_a_known_upload() {
        let store = InMemoryTemporaryUploadStorage::new();
        store.begin_upload("u1", metadata(), 1);
        assert_eq!(store.expected_root("u1").unwrap(), "root-b64");
    }

    #[test]
    fn expected_root_on_unknown_upload_errors() {
        let store = InMemoryTemporaryUploadStorage::new();
        assert!(matches!(
            store.expected_root("missing"),
            Err(FilesError::UnknownUpload { .. })
        ));
    }

    #[test]
    fn begin_upload_on_known_file_id_resumes_with_stored_chunks() {
        let store = InMemoryTemporaryUploadStorage::new();
        store.begin_upload("u1", metadata(), 2);
        store
            .store_chunk(
                "u1",
                0,
                StoredChunk {
                    data: vec![1, 2, 3],
                    proof: vec![],
                    bytes_uploaded: 3,
                },
            )
            .unwrap();

        let existing = store.begin_upload("u1", metadata(), 2);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].0, 0);
    }

    #[test]
    fn store_chunk_on_unknown_upload_errors() {
        let store = InMemoryTemporaryUploadStorage::new();
        let result = store.store_chunk(
            "missing",
            0,
            StoredChunk {
                data: vec![],
                proof: vec![],
                bytes_uploaded: 0,
            },
        );
        assert!(matches!(result, Err(FilesError::UnknownUpload { .. })));
    }

    #[test]
    fn take_upload_removes_it_and_returns_ordered_chunks() {
        let store = InMemoryTemporaryUploadStorage::new();
        store.begin_upload("u1", metadata(), 2);
        store
            .store_chunk(
                "u1",
                1,
                StoredChunk {
                    data: vec![4],
                    proof: vec![],
                    bytes_uploaded: 4,
                },
            )
            .unwrap();
        store
            .store_chunk(
                "u1",
                0,
                StoredChunk {
                    data: vec![1, 2, 3],
                    proof: vec![],
                    bytes_uploaded: 3,
                },
            )
            .unwrap();

        let (meta, chunks) = store.take_upload("u1").unwrap();
        assert_eq!(meta, metadata());
        assert_eq!(chunks, vec![vec![1, 2, 3], vec![4]]);
        assert!(store.take_upload("u1").is_err());
    }

    #[test]
    fn file_storage_roundtrip() {
        let store = InMemoryFileStorage::new();
        assert!(store.get("f1").is_none());
        store.store_file_from_upload(metadata(), vec![vec![1, 2, 3]], [7u8; 32], "f1".into());
        let stored = store.get("f1").unwrap();
        assert_eq!(stored.root, [7u8; 32]);
        assert_eq!(stored.chunks, vec![vec![1, 2, 3]]);
    }
}
