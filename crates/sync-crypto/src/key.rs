//! Per-document symmetric encryption key.

use crate::{CryptoError, KEY_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An AES-256-GCM key held by the client for one document.
///
/// The key never reaches the server; it is handed directly to the
/// [`crate::envelope`] functions by the caller's transport stack.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DocumentKey([u8; KEY_SIZE]);

impl DocumentKey {
    /// Wrap a raw 32-byte key.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_SIZE];
        crate::random::fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DocumentKey").field(&"[redacted]").finish()
    }
}
