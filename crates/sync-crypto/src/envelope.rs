//! The encrypted "faux update list" envelope (spec §4.E).
//!
//! A `DocMessage`'s `update`/`sync-step-2` payload, when `encrypted` is
//! set, is replaced by the encoding of a [`FauxUpdateList`]: each real
//! CRDT update becomes one [`FauxUpdate`] whose `message_id` is
//! `base64(SHA-256(plaintext))` and whose `ciphertext` is a fresh
//! 12-byte IV prepended to the AES-256-GCM sealed bytes. The server
//! stores and forwards these opaque blobs; only holders of the
//! document key can recover the plaintext, and the inner content ID
//! still lets the server deduplicate identical updates.

use crate::error::CryptoError;
use crate::key::DocumentKey;
use crate::{IV_SIZE, KEY_SIZE};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sync_wire::{varint, ContentId};

/// `sync-step-1` payloads carry no real state vector once encrypted —
/// the server must not learn anything from a state vector's shape, so
/// encrypting a sync-step-1 replaces it with this fixed placeholder.
pub const FAUX_STATE_VECTOR: &[u8] = &[0x00];

/// One encrypted inner update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FauxUpdate {
    /// `base64(SHA-256(plaintext))`, verified on decrypt.
    pub message_id: String,
    /// `IV (12 bytes) || AES-256-GCM(key, plaintext)`.
    pub ciphertext: Vec<u8>,
}

impl FauxUpdate {
    fn encode(&self, out: &mut Vec<u8>) {
        varint::write_string(out, &self.message_id);
        varint::write_bytes(out, &self.ciphertext);
    }

    fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CryptoError> {
        let message_id = varint::read_string(buf, pos)
            .map_err(|_| CryptoError::MalformedEnvelope("truncated faux update message id"))?;
        let ciphertext = varint::read_bytes(buf, pos)
            .map_err(|_| CryptoError::MalformedEnvelope("truncated faux update ciphertext"))?;
        Ok(Self {
            message_id,
            ciphertext,
        })
    }
}

/// One or more [`FauxUpdate`]s batched under a single wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FauxUpdateList(pub Vec<FauxUpdate>);

impl FauxUpdateList {
    /// Encode as `count varint` followed by each entry's bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        varint::write_u64(&mut out, self.0.len() as u64);
        for entry in &self.0 {
            entry.encode(&mut out);
        }
        out
    }

    /// Decode a previously encoded list.
    pub fn decode(buf: &[u8]) -> Result<Self, CryptoError> {
        let mut pos = 0usize;
        let count = varint::read_u64(buf, &mut pos)
            .map_err(|_| CryptoError::MalformedEnvelope("truncated faux update list count"))?
            as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(FauxUpdate::decode(buf, &mut pos)?);
        }
        Ok(Self(entries))
    }
}

fn cipher_for(key: &DocumentKey) -> Aes256Gcm {
    let key_bytes: &[u8; KEY_SIZE] = key.as_bytes();
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes))
}

fn seal(key: &DocumentKey, plaintext: &[u8]) -> Result<FauxUpdate, CryptoError> {
    let message_id = ContentId::of(plaintext).to_base64();

    let mut iv = [0u8; IV_SIZE];
    crate::random::fill_random(&mut iv)?;

    let cipher = cipher_for(key);
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut ciphertext = Vec::with_capacity(IV_SIZE + sealed.len());
    ciphertext.extend_from_slice(&iv);
    ciphertext.extend_from_slice(&sealed);

    Ok(FauxUpdate {
        message_id,
        ciphertext,
    })
}

fn open(key: &DocumentKey, entry: &FauxUpdate) -> Result<Vec<u8>, CryptoError> {
    if entry.ciphertext.len() < IV_SIZE {
        return Err(CryptoError::InvalidNonceLength);
    }
    let (iv, sealed) = entry.ciphertext.split_at(IV_SIZE);

    let cipher = cipher_for(key);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), sealed)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    if ContentId::of(&plaintext).to_base64() != entry.message_id {
        return Err(CryptoError::ContentIdMismatch);
    }

    Ok(plaintext)
}

/// Encrypt one CRDT update into the wire-ready envelope bytes for a
/// `DocMessage`'s `update`/`sync-step-2` payload.
pub fn encrypt_update(key: &DocumentKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let entry = seal(key, plaintext)?;
    Ok(FauxUpdateList(vec![entry]).encode())
}

/// Decrypt a previously encrypted envelope, returning the plaintext of
/// each inner update in order.
///
/// If more than one entry is present the caller (the CRDT/session
/// layer) is responsible for merging them via the document's `merge`
/// operation and emitting a single update to the local transport (spec
/// §4.E) — this function only undoes the encryption transform.
pub fn decrypt_update(key: &DocumentKey, envelope: &[u8]) -> Result<Vec<Vec<u8>>, CryptoError> {
    let list = FauxUpdateList::decode(envelope)?;
    list.0.iter().map(|entry| open(key, entry)).collect()
}

/// Merge several plaintext updates' envelopes into one encrypted
/// envelope carrying all of them as separate entries, without
/// decrypting anything. Used when batching outgoing updates.
pub fn merge_envelopes(envelopes: &[Vec<u8>]) -> Result<Vec<u8>, CryptoError> {
    let mut merged = FauxUpdateList::default();
    for envelope in envelopes {
        merged.0.extend(FauxUpdateList::decode(envelope)?.0);
    }
    Ok(merged.encode())
}

/// The placeholder payload that replaces a `sync-step-1` state vector
/// when encryption is enabled.
#[must_use]
pub fn encrypt_sync_step1() -> Vec<u8> {
    FAUX_STATE_VECTOR.to_vec()
}

/// Whether `bytes` is the fixed `sync-step-1` placeholder rather than a
/// real state vector.
#[must_use]
pub fn is_faux_state_vector(bytes: &[u8]) -> bool {
    bytes == FAUX_STATE_VECTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let key = DocumentKey::generate().unwrap();
        let plaintext = b"hello".to_vec();
        let envelope = encrypt_update(&key, &plaintext).unwrap();
        let decrypted = decrypt_update(&key, &envelope).unwrap();
        assert_eq!(decrypted, vec![plaintext]);
    }

    #[test]
    fn same_plaintext_twice_produces_different_ciphertext_same_message_id() {
        let key = DocumentKey::generate().unwrap();
        let a = FauxUpdateList::decode(&encrypt_update(&key, b"hello").unwrap()).unwrap();
        let b = FauxUpdateList::decode(&encrypt_update(&key, b"hello").unwrap()).unwrap();
        assert_eq!(a.0[0].message_id, b.0[0].message_id);
        assert_ne!(a.0[0].ciphertext, b.0[0].ciphertext, "fresh IV each time");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key_a = DocumentKey::generate().unwrap();
        let key_b = DocumentKey::generate().unwrap();
        let envelope = encrypt_update(&key_a, b"hello").unwrap();
        assert_eq!(
            decrypt_update(&key_b, &envelope),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let key = DocumentKey::generate().unwrap();
        let envelope = encrypt_update(&key, b"hello").unwrap();
        let mut list = FauxUpdateList::decode(&envelope).unwrap();
        let last = list.0[0].ciphertext.len() - 1;
        list.0[0].ciphertext[last] ^= 0xFF;
        assert_eq!(
            decrypt_update(&key, &list.encode()),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn tampered_message_id_is_detected_even_if_decryption_succeeds() {
        // message_id mismatch can only occur if content addressing is
        // bypassed elsewhere; simulate it directly against `open`.
        let key = DocumentKey::generate().unwrap();
        let mut entry = seal(&key, b"hello").unwrap();
        entry.message_id = ContentId::of(b"not hello").to_base64();
        assert_eq!(open(&key, &entry), Err(CryptoError::ContentIdMismatch));
    }

    #[test]
    fn multiple_entries_roundtrip_in_order() {
        let key = DocumentKey::generate().unwrap();
        let a = encrypt_update(&key, b"first").unwrap();
        let b = encrypt_update(&key, b"second").unwrap();
        let merged = merge_envelopes(&[a, b]).unwrap();
        let decrypted = decrypt_update(&key, &merged).unwrap();
        assert_eq!(decrypted, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn sync_step1_placeholder_is_recognized() {
        let placeholder = encrypt_sync_step1();
        assert!(is_faux_state_vector(&placeholder));
        assert!(!is_faux_state_vector(b"a real state vector"));
    }

    #[test]
    fn empty_envelope_decodes_to_no_entries() {
        let empty = FauxUpdateList::default().encode();
        assert_eq!(decrypt_update(&DocumentKey::generate().unwrap(), &empty).unwrap(), Vec::<Vec<u8>>::new());
    }
}
