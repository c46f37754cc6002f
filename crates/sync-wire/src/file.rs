//! `FileMessage` payload variants (spec §3, §6 subtype table 0x03).

use crate::doc::Permission;
use crate::error::CodecError;
use crate::varint;

/// Payload carried by a `FileMessage`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilePayload {
    /// Request to download a file by its content-addressed ID.
    Download {
        /// `base64(merkleRoot)` of the desired file.
        file_id: String,
    },
    /// Initiate (or resume) an upload, or describe a download's metadata.
    Upload {
        /// Whether the file bytes are end-to-end encrypted.
        encrypted: bool,
        /// Client-chosen upload UUID (or the permanent file ID on a download reply).
        file_id: String,
        /// `base64(merkleRoot)` the client computed locally before
        /// sending the first chunk. Distinct from `file_id`: the upload
        /// ID tracks the in-flight upload, this is what every chunk's
        /// proof is verified against. On a download reply this equals
        /// `file_id`, since the permanent file ID already is the root.
        expected_root: String,
        /// Original filename.
        filename: String,
        /// Size in bytes (including encryption overhead when encrypted).
        size: u64,
        /// MIME type.
        mime_type: String,
        /// Last-modified timestamp (client clock, milliseconds since epoch).
        last_modified: u64,
    },
    /// One chunk plus its Merkle proof path.
    Part {
        /// Upload/download file ID this chunk belongs to.
        file_id: String,
        /// Zero-based chunk index.
        chunk_index: u64,
        /// Chunk bytes (plaintext or ciphertext depending on `encrypted`).
        chunk_data: Vec<u8>,
        /// Sibling hashes from this leaf up to the root's child level.
        merkle_proof: Vec<Vec<u8>>,
        /// Total number of chunks in the file.
        total_chunks: u64,
        /// Cumulative bytes uploaded/downloaded so far, including this chunk.
        bytes_uploaded: u64,
        /// Whether `chunk_data` is ciphertext.
        encrypted: bool,
    },
    /// Denial with an HTTP-like status code.
    Auth {
        /// Whether the request was allowed.
        permission: Permission,
        /// The file ID the request concerned.
        file_id: String,
        /// HTTP-style status code (401/403/404/413/500/501/...).
        status_code: u64,
        /// Optional human-readable reason.
        reason: Option<String>,
    },
}

impl FilePayload {
    pub(crate) fn subtype(&self) -> u8 {
        match self {
            FilePayload::Download { .. } => 0x00,
            FilePayload::Upload { .. } => 0x01,
            FilePayload::Part { .. } => 0x02,
            FilePayload::Auth { .. } => 0x03,
        }
    }

    fn write_bool(out: &mut Vec<u8>, value: bool) {
        out.push(if value { 0x01 } else { 0x00 });
    }

    fn read_bool(buf: &[u8], pos: &mut usize) -> Result<bool, CodecError> {
        let byte = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        match byte {
            0x00 => Ok(false),
            0x01 => Ok(true),
            _ => Err(CodecError::InvalidBoolFlag),
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.subtype());
        match self {
            FilePayload::Download { file_id } => varint::write_string(out, file_id),
            FilePayload::Upload {
                encrypted,
                file_id,
                expected_root,
                filename,
                size,
                mime_type,
                last_modified,
            } => {
                Self::write_bool(out, *encrypted);
                varint::write_string(out, file_id);
                varint::write_string(out, expected_root);
                varint::write_string(out, filename);
                varint::write_u64(out, *size);
                varint::write_string(out, mime_type);
                varint::write_u64(out, *last_modified);
            }
            FilePayload::Part {
                file_id,
                chunk_index,
                chunk_data,
                merkle_proof,
                total_chunks,
                bytes_uploaded,
                encrypted,
            } => {
                varint::write_string(out, file_id);
                varint::write_u64(out, *chunk_index);
                varint::write_bytes(out, chunk_data);
                varint::write_u64(out, merkle_proof.len() as u64);
                for sibling in merkle_proof {
                    varint::write_bytes(out, sibling);
                }
                varint::write_u64(out, *total_chunks);
                varint::write_u64(out, *bytes_uploaded);
                Self::write_bool(out, *encrypted);
            }
            FilePayload::Auth {
                permission,
                file_id,
                status_code,
                reason,
            } => {
                out.push(match permission {
                    Permission::Denied => 0x00,
                    Permission::Allowed => 0x01,
                });
                varint::write_string(out, file_id);
                varint::write_u64(out, *status_code);
                match reason {
                    Some(r) => {
                        out.push(0x01);
                        varint::write_string(out, r);
                    }
                    None => out.push(0x00),
                }
            }
        }
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        let subtype = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        Ok(match subtype {
            0x00 => FilePayload::Download {
                file_id: varint::read_string(buf, pos)?,
            },
            0x01 => {
                let encrypted = Self::read_bool(buf, pos)?;
                let file_id = varint::read_string(buf, pos)?;
                let expected_root = varint::read_string(buf, pos)?;
                let filename = varint::read_string(buf, pos)?;
                let size = varint::read_u64(buf, pos)?;
                let mime_type = varint::read_string(buf, pos)?;
                let last_modified = varint::read_u64(buf, pos)?;
                FilePayload::Upload {
                    encrypted,
                    file_id,
                    expected_root,
                    filename,
                    size,
                    mime_type,
                    last_modified,
                }
            }
            0x02 => {
                let file_id = varint::read_string(buf, pos)?;
                let chunk_index = varint::read_u64(buf, pos)?;
                let chunk_data = varint::read_bytes(buf, pos)?;
                let proof_len = varint::read_u64(buf, pos)? as usize;
                let mut merkle_proof = Vec::with_capacity(proof_len);
                for _ in 0..proof_len {
                    merkle_proof.push(varint::read_bytes(buf, pos)?);
                }
                let total_chunks = varint::read_u64(buf, pos)?;
                let bytes_uploaded = varint::read_u64(buf, pos)?;
                let encrypted = Self::read_bool(buf, pos)?;
                FilePayload::Part {
                    file_id,
                    chunk_index,
                    chunk_data,
                    merkle_proof,
                    total_chunks,
                    bytes_uploaded,
                    encrypted,
                }
            }
            0x03 => {
                let permission_byte = *buf.get(*pos).ok_or(CodecError::Truncated)?;
                *pos += 1;
                let permission = match permission_byte {
                    0x00 => Permission::Denied,
                    0x01 => Permission::Allowed,
                    _ => return Err(CodecError::UnknownSubtype),
                };
                let file_id = varint::read_string(buf, pos)?;
                let status_code = varint::read_u64(buf, pos)?;
                let has_reason = Self::read_bool(buf, pos)?;
                let reason = if has_reason {
                    Some(varint::read_string(buf, pos)?)
                } else {
                    None
                };
                FilePayload::Auth {
                    permission,
                    file_id,
                    status_code,
                    reason,
                }
            }
            _ => return Err(CodecError::UnknownSubtype),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: FilePayload) {
        let mut buf = Vec::new();
        payload.encode(&mut buf);
        let mut pos = 0;
        assert_eq!(FilePayload::decode(&buf, &mut pos).unwrap(), payload);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn download_roundtrip() {
        roundtrip(FilePayload::Download {
            file_id: "abc123".into(),
        });
    }

    #[test]
    fn upload_roundtrip_with_empty_filename() {
        roundtrip(FilePayload::Upload {
            encrypted: false,
            file_id: "u1".into(),
            expected_root: "root-b64".into(),
            filename: String::new(),
            size: 10,
            mime_type: "text/plain".into(),
            last_modified: 123456,
        });
    }

    #[test]
    fn part_roundtrip_with_empty_proof() {
        roundtrip(FilePayload::Part {
            file_id: "u1".into(),
            chunk_index: 0,
            chunk_data: vec![1, 2, 3, 4],
            merkle_proof: vec![],
            total_chunks: 1,
            bytes_uploaded: 4,
            encrypted: false,
        });
    }

    #[test]
    fn part_roundtrip_with_proof() {
        roundtrip(FilePayload::Part {
            file_id: "u1".into(),
            chunk_index: 2,
            chunk_data: vec![9; 100],
            merkle_proof: vec![vec![1; 32], vec![2; 32]],
            total_chunks: 5,
            bytes_uploaded: 300,
            encrypted: true,
        });
    }

    #[test]
    fn auth_roundtrip_with_and_without_reason() {
        roundtrip(FilePayload::Auth {
            permission: Permission::Denied,
            file_id: "u1".into(),
            status_code: 413,
            reason: Some("File exceeds maximum supported size".into()),
        });
        roundtrip(FilePayload::Auth {
            permission: Permission::Allowed,
            file_id: "u1".into(),
            status_code: 200,
            reason: None,
        });
    }

    #[test]
    fn zero_length_chunk_decodes_but_caller_must_reject() {
        // The codec itself is permissive; §8 requires the session layer
        // to reject zero-length chunks, not the wire codec.
        roundtrip(FilePayload::Part {
            file_id: "u1".into(),
            chunk_index: 0,
            chunk_data: vec![],
            merkle_proof: vec![],
            total_chunks: 1,
            bytes_uploaded: 0,
            encrypted: false,
        });
    }
}
