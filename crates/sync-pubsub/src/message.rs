//! Bus envelope for pub/sub messages (spec §4.F, §6): `(sourceId, payload)`.

use sync_wire::error::CodecError;
use sync_wire::varint;

/// A message as it travels across the pub/sub bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    /// Identifies the node (or, in-process, the session) that published
    /// this message, so subscribers can suppress their own echoes.
    pub source_id: String,
    /// The raw, already wire-encoded message bytes.
    pub payload: Vec<u8>,
}

impl PubSubMessage {
    /// Construct a message for publishing.
    #[must_use]
    pub fn new(source_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            source_id: source_id.into(),
            payload,
        }
    }

    /// Encode as `varstring(sourceId) || varbytes(payload)`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        varint::write_string(&mut out, &self.source_id);
        varint::write_bytes(&mut out, &self.payload);
        out
    }

    /// Decode a previously encoded bus envelope.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut pos = 0usize;
        let source_id = varint::read_string(buf, &mut pos)?;
        let payload = varint::read_bytes(buf, &mut pos)?;
        Ok(Self { source_id, payload })
    }
}
