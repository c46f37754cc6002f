//! # sync-wire
//!
//! Binary wire codec for the collaborative sync protocol: message types,
//! deterministic lib0-style varint encoding, and content-addressed
//! message/file IDs.
//!
//! Every message on the wire starts with a 3-byte magic (`0x59 0x4A
//! 0x53`) and a 1-byte version, is one of four categories (`Doc`,
//! `Awareness`, `Ack`, `File`), and is given a stable content ID —
//! `base64(SHA-256(encoded_bytes))` — used for deduplication and
//! acknowledgment correlation. Keep-alive frames (`"YJSping"` /
//! `"YJSpong"`) are a deliberate exception: exactly 7 bytes, no
//! version, no body.
//!
//! This crate only encodes and decodes bytes; it has no opinion on
//! transport, session state, or delivery policy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ack;
pub mod awareness;
pub mod content_id;
pub mod doc;
pub mod error;
pub mod file;
pub mod framing;
pub mod message;
pub mod milestone;
pub mod varint;

pub use ack::AckPayload;
pub use awareness::AwarenessPayload;
pub use content_id::ContentId;
pub use doc::{DocPayload, Permission};
pub use error::CodecError;
pub use file::FilePayload;
pub use framing::{decode_frame, encode_messages, encode_ping, encode_pong, Frame};
pub use message::{AckMessage, AwarenessMessage, Context, DocMessage, FileMessage, Message};
pub use milestone::{LifecycleState, Milestone, MilestoneCreator};
