//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (authentication failure)
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,

    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid nonce length
    #[error("invalid nonce length")]
    InvalidNonceLength,

    /// The inner content-id recovered from a decrypted faux update did not
    /// match `SHA-256(plaintext)`.
    #[error("faux update content mismatch: envelope is corrupt or tampered")]
    ContentIdMismatch,

    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,

    /// Envelope bytes were truncated or malformed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),
}
