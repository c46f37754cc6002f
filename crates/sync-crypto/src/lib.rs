//! # sync-crypto
//!
//! End-to-end encryption envelope for collaborative document updates
//! (spec §4.E). The server only ever stores and forwards the envelope
//! bytes produced here; it never observes plaintext CRDT updates.
//!
//! ## Cryptographic suite
//!
//! | Function | Algorithm | Notes |
//! |----------|-----------|-------|
//! | AEAD | AES-256-GCM | fresh 12-byte IV per update, prepended to ciphertext |
//! | Content addressing | SHA-256 | inner `messageId` must match `SHA-256(plaintext)` |
//!
//! A faux update list groups one or more inner updates under a single
//! wire payload (§4.E): each entry carries its own content-addressed ID
//! so the server can deduplicate identical updates even though it never
//! sees their plaintext.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod envelope;
pub mod error;
pub mod key;
pub mod random;

pub use envelope::{FauxUpdate, FauxUpdateList};
pub use error::CryptoError;
pub use key::DocumentKey;

/// AES-GCM key size in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-GCM IV (nonce) size in bytes.
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Plaintext chunk size used by the file-transfer protocol (spec §4.I).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Ciphertext chunk size for encrypted file transfers.
///
/// `ENCRYPTED_CHUNK_SIZE` is an Open Question in spec.md §9; we fix it
/// to the plaintext chunk size minus the AES-GCM IV and tag overhead so
/// a full plaintext chunk always produces a ciphertext that still fits
/// in one wire chunk. See DESIGN.md.
pub const ENCRYPTED_CHUNK_SIZE: usize = CHUNK_SIZE - IV_SIZE - TAG_SIZE;
