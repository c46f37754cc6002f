//! Upload/download orchestration (spec §4.I).
//!
//! The already-finalized wire table (spec §6) gives `file-upload`
//! (`FilePayload::Upload`) no `resumeFromChunk`/`bytesUploaded` fields,
//! even though spec §4.I's prose describes resumption as an
//! `upload-accepted` handshake carrying them. Rather than reopen the
//! wire codec, resumption here rides the existing chunk-ack channel:
//! on a resumed upload the server reconstructs the `file-part` message
//! for every chunk it already holds (byte-for-byte, from the stored
//! chunk data, proof, and `bytes_uploaded`) and acks each one by its
//! content ID, exactly as if the client had just sent it. A client
//! that tracks which of its chunks have been acked before advancing
//! therefore skips re-sending anything the server already has, with no
//! new wire field required.

use crate::error::{FilesError, Result};
use crate::merkle::{proof_for, root_of, verify_proof};
use crate::storage::{FileStorage, StoredChunk, TemporaryUploadStorage, UploadMetadata};
use sync_wire::content_id::ContentId;
use sync_wire::doc::Permission;
use sync_wire::file::FilePayload;
use sync_wire::message::{AckMessage, Context, FileMessage, Message};

/// Default maximum accepted upload size: 1 GiB (spec §4.I, §8 scenario).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Handles the file-transfer half of a session: upload begin/chunk/
/// complete, and whole-file download.
pub struct FileProtocol<U, F> {
    uploads: U,
    files: F,
    max_file_size: u64,
}

impl<U: TemporaryUploadStorage, F: FileStorage> FileProtocol<U, F> {
    /// Build a protocol handler over the given storage backends.
    pub fn new(uploads: U, files: F, max_file_size: u64) -> Self {
        Self {
            uploads,
            files,
            max_file_size,
        }
    }

    /// Handle a `file-upload` message: validate size, then begin or
    /// resume. Returns the messages to send back to the client — a
    /// denial on rejection, or acks for any chunks already held on a
    /// resumed upload (empty for a brand-new upload).
    pub fn handle_upload_request(
        &self,
        context: Context,
        file_id: &str,
        metadata: UploadMetadata,
        total_chunks: u64,
    ) -> Vec<Message> {
        if metadata.size > self.max_file_size {
            let denial = FileMessage::new(
                "",
                context,
                false,
                FilePayload::Auth {
                    permission: Permission::Denied,
                    file_id: file_id.to_string(),
                    status_code: 413,
                    reason: Some("File exceeds maximum supported size".into()),
                },
            );
            return vec![Message::File(denial)];
        }

        let existing = self.uploads.begin_upload(file_id, metadata, total_chunks);
        existing
            .into_iter()
            .map(|(index, chunk)| {
                let reconstructed = FileMessage::new(
                    "",
                    Context::default(),
                    chunk.data.is_empty(),
                    FilePayload::Part {
                        file_id: file_id.to_string(),
                        chunk_index: index,
                        chunk_data: chunk.data,
                        merkle_proof: chunk.proof,
                        total_chunks,
                        bytes_uploaded: chunk.bytes_uploaded,
                        encrypted: false,
                    },
                );
                Message::Ack(AckMessage::new(
                    context.clone(),
                    reconstructed.id().to_base64(),
                ))
            })
            .collect()
    }

    /// Handle one `file-part` chunk: verify its Merkle proof against
    /// the upload's committed root (from `begin_upload`, not `file_id`),
    /// store it, and return the ack to send back.
    pub fn handle_chunk(
        &self,
        context: Context,
        file_id: &str,
        chunk_index: u64,
        chunk_data: Vec<u8>,
        merkle_proof: Vec<Vec<u8>>,
        total_chunks: u64,
        bytes_uploaded: u64,
        encrypted: bool,
    ) -> Result<Message> {
        if chunk_data.is_empty() {
            return Err(FilesError::EmptyChunk { chunk_index });
        }
        let expected_root = self.uploads.expected_root(file_id)?;
        let root = ContentId::from_base64(&expected_root).ok_or(FilesError::RootMismatch)?;
        let proof: Vec<[u8; 32]> = merkle_proof
            .iter()
            .map(|s| <[u8; 32]>::try_from(s.as_slice()).map_err(|_| FilesError::RootMismatch))
            .collect::<Result<_>>()?;
        if !verify_proof(&chunk_data, chunk_index as usize, &proof, root.as_bytes()) {
            return Err(FilesError::ProofMismatch { chunk_index });
        }

        let original = FileMessage::new(
            "",
            Context::default(),
            encrypted,
            FilePayload::Part {
                file_id: file_id.to_string(),
                chunk_index,
                chunk_data: chunk_data.clone(),
                merkle_proof,
                total_chunks,
                bytes_uploaded,
                encrypted,
            },
        );
        let message_id = original.id().to_base64();

        self.uploads.store_chunk(
            file_id,
            chunk_index,
            StoredChunk {
                data: chunk_data,
                proof: proof.iter().map(|h| h.to_vec()).collect(),
                bytes_uploaded,
            },
        )?;

        Ok(Message::Ack(AckMessage::new(context, message_id)))
    }

    /// Handle `complete-upload`: assemble the stored chunks, verify
    /// their root matches what the client committed to, and persist
    /// the file under its permanent content-addressed ID.
    ///
    /// Returns the permanent file ID (`base64(merkleRoot)`).
    pub fn complete_upload(&self, file_id: &str) -> Result<String> {
        // The client's declared fileId for the upload is a UUID, unrelated
        // to the permanent ID; what must agree is the assembled root and
        // the root the client committed to back at begin_upload.
        let (metadata, chunks) = self.uploads.take_upload(file_id)?;
        let root = root_of(&chunks);
        let permanent_id = ContentId::from_digest(root).to_base64();
        if permanent_id != metadata.expected_root {
            return Err(FilesError::RootMismatch);
        }
        self.files
            .store_file_from_upload(metadata, chunks, root, permanent_id.clone());
        Ok(permanent_id)
    }

    /// Handle a `file-download` request: look the file up and produce
    /// the `file-upload`-shaped metadata reply plus one `file-part` per
    /// chunk, each with its Merkle proof.
    pub fn handle_download_request(&self, file_id: &str) -> Result<Vec<Message>> {
        let stored = self
            .files
            .get(file_id)
            .ok_or_else(|| FilesError::UnknownFile {
                file_id: file_id.to_string(),
            })?;

        let mut messages = vec![Message::File(FileMessage::new(
            "",
            Context::default(),
            stored.metadata.encrypted,
            FilePayload::Upload {
                encrypted: stored.metadata.encrypted,
                file_id: file_id.to_string(),
                expected_root: file_id.to_string(),
                filename: stored.metadata.filename.clone(),
                size: stored.metadata.size,
                mime_type: stored.metadata.mime_type.clone(),
                last_modified: stored.metadata.last_modified,
            },
        ))];

        let total_chunks = stored.chunks.len() as u64;
        let mut bytes_sent = 0u64;
        for (index, chunk) in stored.chunks.iter().enumerate() {
            bytes_sent += chunk.len() as u64;
            let proof = proof_for(&stored.chunks, index)
                .into_iter()
                .map(|h| h.to_vec())
                .collect();
            messages.push(Message::File(FileMessage::new(
                "",
                Context::default(),
                stored.metadata.encrypted,
                FilePayload::Part {
                    file_id: file_id.to_string(),
                    chunk_index: index as u64,
                    chunk_data: chunk.clone(),
                    merkle_proof: proof,
                    total_chunks,
                    bytes_uploaded: bytes_sent,
                    encrypted: stored.metadata.encrypted,
                },
            )));
        }
        Ok(messages)
    }
}
