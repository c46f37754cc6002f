//! `AwarenessMessage` payload variants (spec §3, §6 subtype table 0x01).

use crate::error::CodecError;
use crate::varint;

/// Payload carried by an `AwarenessMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwarenessPayload {
    /// A client's ephemeral presence state changed.
    Update {
        /// Opaque, CRDT-framework-defined awareness update bytes.
        update: Vec<u8>,
    },
    /// Ask peers to (re-)broadcast their current awareness state.
    Request,
}

impl AwarenessPayload {
    pub(crate) fn subtype(&self) -> u8 {
        match self {
            AwarenessPayload::Update { .. } => 0x00,
            AwarenessPayload::Request => 0x01,
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.subtype());
        if let AwarenessPayload::Update { update } = self {
            varint::write_bytes(out, update);
        }
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        let subtype = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        match subtype {
            0x00 => Ok(AwarenessPayload::Update {
                update: varint::read_bytes(buf, pos)?,
            }),
            0x01 => Ok(AwarenessPayload::Request),
            _ => Err(CodecError::UnknownSubtype),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awareness_roundtrip() {
        for payload in [
            AwarenessPayload::Update {
                update: vec![1, 2, 3],
            },
            AwarenessPayload::Update { update: vec![] },
            AwarenessPayload::Request,
        ] {
            let mut buf = Vec::new();
            payload.encode(&mut buf);
            let mut pos = 0;
            assert_eq!(AwarenessPayload::decode(&buf, &mut pos).unwrap(), payload);
        }
    }
}
