//! Frame-level batching and keep-alive frames (spec §4.A, §6).
//!
//! A wire frame is either:
//! - a keep-alive: the exact 7-byte sequence `b"YJSping"` or `b"YJSpong"`
//!   (no version byte, no body), or
//! - a batch of one or more encoded [`crate::message::Message`]s, each
//!   preceded by its own varint length, packed back-to-back with no
//!   overall count prefix — the reader keeps decoding `(length, bytes)`
//!   pairs until the buffer is exhausted.

use crate::error::CodecError;
use crate::message::Message;
use crate::varint;

const PING: &[u8; 7] = b"YJSping";
const PONG: &[u8; 7] = b"YJSpong";

/// A decoded frame: either a keep-alive or a batch of messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Keep-alive request; the peer should reply with `Pong`.
    Ping,
    /// Keep-alive reply.
    Pong,
    /// One or more messages batched into a single transport write.
    Messages(Vec<Message>),
}

/// Encode a ping keep-alive frame.
#[must_use]
pub fn encode_ping() -> Vec<u8> {
    PING.to_vec()
}

/// Encode a pong keep-alive frame.
#[must_use]
pub fn encode_pong() -> Vec<u8> {
    PONG.to_vec()
}

/// Encode a batch of one or more messages: each message preceded by its
/// own varint byte length, concatenated with no overall count prefix.
#[must_use]
pub fn encode_messages(messages: &[Message]) -> Vec<u8> {
    let mut out = Vec::new();
    for message in messages {
        let encoded = message.encode();
        varint::write_u64(&mut out, encoded.len() as u64);
        out.extend_from_slice(&encoded);
    }
    out
}

/// Decode a single frame from a complete buffer (one transport read/datagram).
pub fn decode_frame(buf: &[u8]) -> Result<Frame, CodecError> {
    if buf.len() == 7 && buf == PING {
        return Ok(Frame::Ping);
    }
    if buf.len() == 7 && buf == PONG {
        return Ok(Frame::Pong);
    }

    let mut messages = Vec::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        let len = varint::read_u64(buf, &mut pos)? as usize;
        let end = pos
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or(CodecError::Truncated)?;
        messages.push(Message::decode(&buf[pos..end])?);
        pos = end;
    }
    Ok(Frame::Messages(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awareness::AwarenessPayload;
    use crate::message::{AwarenessMessage, Context};

    #[test]
    fn ping_pong_are_seven_bytes_and_distinct() {
        assert_eq!(encode_ping().len(), 7);
        assert_eq!(encode_pong().len(), 7);
        assert_ne!(encode_ping(), encode_pong());
    }

    #[test]
    fn ping_pong_roundtrip() {
        assert_eq!(decode_frame(&encode_ping()).unwrap(), Frame::Ping);
        assert_eq!(decode_frame(&encode_pong()).unwrap(), Frame::Pong);
    }

    #[test]
    fn single_message_batch_roundtrip() {
        let msg = Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        ));
        let encoded = encode_messages(&[msg.clone()]);
        let decoded = decode_frame(&encoded).unwrap();
        assert_eq!(decoded, Frame::Messages(vec![msg]));
    }

    #[test]
    fn multi_message_batch_roundtrip() {
        let a = Message::Awareness(AwarenessMessage::new(
            "doc1",
            Context::local(),
            false,
            AwarenessPayload::Request,
        ));
        let b = Message::Awareness(AwarenessMessage::new(
            "doc2",
            Context::local(),
            false,
            AwarenessPayload::Update {
                update: vec![1, 2, 3],
            },
        ));
        let encoded = encode_messages(&[a.clone(), b.clone()]);
        let decoded = decode_frame(&encoded).unwrap();
        assert_eq!(decoded, Frame::Messages(vec![a, b]));
    }

    #[test]
    fn empty_batch_decodes_to_empty_message_list() {
        assert_eq!(decode_frame(&[]).unwrap(), Frame::Messages(vec![]));
    }

    #[test]
    fn truncated_batch_length_prefix_errors() {
        // A length prefix claiming more bytes than are actually present.
        let mut buf = Vec::new();
        varint::write_u64(&mut buf, 100);
        assert_eq!(decode_frame(&buf), Err(CodecError::Truncated));
    }
}
