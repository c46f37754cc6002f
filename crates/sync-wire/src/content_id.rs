//! Content-addressed IDs: `base64(SHA-256(bytes))`.
//!
//! Used both as the message deduplication/ACK-correlation key (spec
//! §3, "Invariants") and as the permanent file identifier derived from
//! a Merkle root (spec §4.I).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 content ID, base64-encoded on display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Compute the content ID of `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Wrap a raw 32-byte digest, e.g. a Merkle root computed elsewhere.
    #[must_use]
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// The raw 32-byte digest.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The standard-alphabet, padded base64 string form used on the wire.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Parse a base64-encoded content ID.
    #[must_use]
    pub fn from_base64(s: &str) -> Option<Self> {
        let bytes = BASE64.decode(s).ok()?;
        let digest: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(digest))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_id() {
        let a = ContentId::of(b"hello world");
        let b = ContentId::of(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.to_base64(), b.to_base64());
    }

    #[test]
    fn different_bytes_different_id() {
        assert_ne!(ContentId::of(b"hello"), ContentId::of(b"world"));
    }

    #[test]
    fn base64_roundtrip() {
        let id = ContentId::of(b"round trip me");
        let encoded = id.to_base64();
        let decoded = ContentId::from_base64(&encoded).unwrap();
        assert_eq!(id, decoded);
    }
}
