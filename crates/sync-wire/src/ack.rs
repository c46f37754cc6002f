//! `AckMessage` payload (spec §3, §6): acknowledges a previously sent
//! message by its content-addressed ID.

use crate::error::CodecError;
use crate::varint;

/// Payload carried by an `AckMessage`: just the acknowledged message's ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPayload {
    /// `base64(SHA-256(encoded_bytes))` of the message being acknowledged.
    pub message_id: String,
}

impl AckPayload {
    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        varint::write_string(out, &self.message_id);
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        Ok(AckPayload {
            message_id: varint::read_string(buf, pos)?,
        })
    }
}
