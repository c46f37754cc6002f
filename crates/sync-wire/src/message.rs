//! Top-level `Message` union, header framing, and content-addressed IDs
//! (spec §3, §4.A, §6).
//!
//! ## Byte order
//!
//! The header table in spec §6 lists `document`, `encrypted`, then
//! `category`, but its own note on the Ack row ("no document, no
//! encrypted byte — magic+version then category+payload") only makes
//! sense if `category` is actually the first field read after the
//! version byte for every message, with `document`/`encrypted` present
//! only when `category != Ack`. A decoder can't know whether to expect
//! `document`/`encrypted` fields without already knowing the category,
//! so category has to come first regardless of the table's listed
//! column order; we follow that byte order.

use crate::ack::AckPayload;
use crate::awareness::AwarenessPayload;
use crate::content_id::ContentId;
use crate::doc::DocPayload;
use crate::error::CodecError;
use crate::file::FilePayload;
use crate::varint;
use std::sync::OnceLock;

/// The 3-byte magic prefix shared by every ordinary message and the
/// keep-alive ping/pong frames.
pub const MAGIC: [u8; 3] = [0x59, 0x4A, 0x53];

/// Current wire protocol version.
pub const VERSION: u8 = 0x01;

/// Server-assigned routing data attached to every message in memory.
///
/// `Context` is never part of the encoded wire bytes (and therefore
/// never part of a message's content ID) — it is assigned by the
/// server when a message arrives on a connection and is purely local
/// routing metadata, the wire bytes being what two independently
/// operating peers must agree on byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    /// The originating client's connection ID, or `"local"` for the
    /// CRDT-doc transport's own loopback messages (spec §4.D).
    pub client_id: String,
    /// Authenticated user ID, if known.
    pub user_id: Option<String>,
    /// Room name, if the document is namespaced under a room (spec §4.H).
    pub room: Option<String>,
}

impl Context {
    /// A context for the local CRDT-doc transport's own messages.
    #[must_use]
    pub fn local() -> Self {
        Self {
            client_id: "local".into(),
            user_id: None,
            room: None,
        }
    }

    /// Whether this context refers to the local transport loopback.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.client_id == "local"
    }
}

/// A cache cell for a message's lazily computed content ID.
///
/// Cloning never copies a cached value (the clone recomputes on first
/// access) and the cache never participates in equality — it is purely
/// a memoization detail, not message data (spec §9, "lazy getters that
/// cache").
#[derive(Default)]
pub struct IdCache(OnceLock<ContentId>);

impl IdCache {
    fn get_or_compute(&self, f: impl FnOnce() -> ContentId) -> ContentId {
        *self.0.get_or_init(f)
    }
}

impl Clone for IdCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for IdCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdCache")
    }
}

impl PartialEq for IdCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// A document-update/handshake/milestone message.
#[derive(Debug, Clone, PartialEq)]
pub struct DocMessage {
    /// Namespaced document ID this message concerns.
    pub document: String,
    /// Server-assigned routing context.
    pub context: Context,
    /// Whether `payload`'s update bytes are an encryption envelope.
    pub encrypted: bool,
    /// The payload.
    pub payload: DocPayload,
    id: IdCache,
}

impl DocMessage {
    /// Construct a new doc message.
    #[must_use]
    pub fn new(document: impl Into<String>, context: Context, encrypted: bool, payload: DocPayload) -> Self {
        Self {
            document: document.into(),
            context,
            encrypted,
            payload,
            id: IdCache::default(),
        }
    }
}

/// An ephemeral presence-update message.
#[derive(Debug, Clone, PartialEq)]
pub struct AwarenessMessage {
    /// Document this presence update concerns.
    pub document: String,
    /// Server-assigned routing context.
    pub context: Context,
    /// Whether the payload is encrypted (always `false` per spec §4.E scope).
    pub encrypted: bool,
    /// The payload.
    pub payload: AwarenessPayload,
    id: IdCache,
}

impl AwarenessMessage {
    /// Construct a new awareness message.
    #[must_use]
    pub fn new(document: impl Into<String>, context: Context, encrypted: bool, payload: AwarenessPayload) -> Self {
        Self {
            document: document.into(),
            context,
            encrypted,
            payload,
            id: IdCache::default(),
        }
    }
}

/// An acknowledgment correlating to a previously sent message's content ID.
#[derive(Debug, Clone, PartialEq)]
pub struct AckMessage {
    /// Server-assigned routing context.
    pub context: Context,
    /// The payload (just the acknowledged content ID).
    pub payload: AckPayload,
    id: IdCache,
}

impl AckMessage {
    /// Construct a new ack message.
    #[must_use]
    pub fn new(context: Context, message_id: impl Into<String>) -> Self {
        Self {
            context,
            payload: AckPayload {
                message_id: message_id.into(),
            },
            id: IdCache::default(),
        }
    }
}

/// A file-transfer message.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMessage {
    /// Document name; may be empty (files are not document-scoped).
    pub document: String,
    /// Server-assigned routing context.
    pub context: Context,
    /// Whether the chunk/metadata payload is encrypted.
    pub encrypted: bool,
    /// The payload.
    pub payload: FilePayload,
    id: IdCache,
}

impl FileMessage {
    /// Construct a new file message.
    #[must_use]
    pub fn new(document: impl Into<String>, context: Context, encrypted: bool, payload: FilePayload) -> Self {
        Self {
            document: document.into(),
            context,
            encrypted,
            payload,
            id: IdCache::default(),
        }
    }
}

/// Tagged union of the four message kinds (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Document update / handshake / milestone message.
    Doc(DocMessage),
    /// Presence update message.
    Awareness(AwarenessMessage),
    /// Delivery acknowledgment.
    Ack(AckMessage),
    /// File-transfer message.
    File(FileMessage),
}

const CATEGORY_DOC: u8 = 0x00;
const CATEGORY_AWARENESS: u8 = 0x01;
const CATEGORY_ACK: u8 = 0x02;
const CATEGORY_FILE: u8 = 0x03;

impl Message {
    /// The document name this message concerns, if any (`Ack` has none).
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        match self {
            Message::Doc(m) => Some(&m.document),
            Message::Awareness(m) => Some(&m.document),
            Message::Ack(_) => None,
            Message::File(m) => Some(&m.document),
        }
    }

    /// Server-assigned routing context.
    #[must_use]
    pub fn context(&self) -> &Context {
        match self {
            Message::Doc(m) => &m.context,
            Message::Awareness(m) => &m.context,
            Message::Ack(m) => &m.context,
            Message::File(m) => &m.context,
        }
    }

    /// Whether the message's payload is an encryption envelope (`Ack` is never encrypted).
    #[must_use]
    pub fn encrypted(&self) -> bool {
        match self {
            Message::Doc(m) => m.encrypted,
            Message::Awareness(m) => m.encrypted,
            Message::Ack(_) => false,
            Message::File(m) => m.encrypted,
        }
    }

    /// Deterministically encode this message to wire bytes.
    ///
    /// Re-encoding the same logical message always yields byte-identical
    /// output (spec §3 invariant, §8 testable property #1).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);

        match self {
            Message::Doc(m) => {
                out.push(CATEGORY_DOC);
                varint::write_string(&mut out, &m.document);
                out.push(u8::from(m.encrypted));
                m.payload.encode(&mut out);
            }
            Message::Awareness(m) => {
                out.push(CATEGORY_AWARENESS);
                varint::write_string(&mut out, &m.document);
                out.push(u8::from(m.encrypted));
                m.payload.encode(&mut out);
            }
            Message::Ack(m) => {
                out.push(CATEGORY_ACK);
                m.payload.encode(&mut out);
            }
            Message::File(m) => {
                out.push(CATEGORY_FILE);
                varint::write_string(&mut out, &m.document);
                out.push(u8::from(m.encrypted));
                m.payload.encode(&mut out);
            }
        }

        out
    }

    /// Decode a message from wire bytes, validating the header.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < 4 {
            return Err(CodecError::Truncated);
        }
        if buf[0..3] != MAGIC {
            return Err(CodecError::InvalidMagic);
        }
        if buf[3] != VERSION {
            return Err(CodecError::UnsupportedVersion);
        }

        let mut pos = 4usize;
        let category = *buf.get(pos).ok_or(CodecError::Truncated)?;
        pos += 1;

        let context = Context::default();

        Ok(match category {
            CATEGORY_ACK => {
                let payload = AckPayload::decode(buf, &mut pos)?;
                Message::Ack(AckMessage {
                    context,
                    payload,
                    id: IdCache::default(),
                })
            }
            CATEGORY_DOC => {
                let document = varint::read_string(buf, &mut pos)?;
                let encrypted = read_bool(buf, &mut pos)?;
                let payload = DocPayload::decode(buf, &mut pos)?;
                Message::Doc(DocMessage {
                    document,
                    context,
                    encrypted,
                    payload,
                    id: IdCache::default(),
                })
            }
            CATEGORY_AWARENESS => {
                let document = varint::read_string(buf, &mut pos)?;
                let encrypted = read_bool(buf, &mut pos)?;
                let payload = AwarenessPayload::decode(buf, &mut pos)?;
                Message::Awareness(AwarenessMessage {
                    document,
                    context,
                    encrypted,
                    payload,
                    id: IdCache::default(),
                })
            }
            CATEGORY_FILE => {
                let document = varint::read_string(buf, &mut pos)?;
                let encrypted = read_bool(buf, &mut pos)?;
                let payload = FilePayload::decode(buf, &mut pos)?;
                Message::File(FileMessage {
                    document,
                    context,
                    encrypted,
                    payload,
                    id: IdCache::default(),
                })
            }
            _ => return Err(CodecError::UnknownCategory),
        })
    }

    /// The content-addressed ID of this message: `base64(SHA-256(encode(self)))`.
    ///
    /// Computed once and cached (spec §9); the cache is per-instance and
    /// thread-safe via `OnceLock` so messages may be shared across tasks.
    #[must_use]
    pub fn id(&self) -> ContentId {
        let cache = match self {
            Message::Doc(m) => &m.id,
            Message::Awareness(m) => &m.id,
            Message::Ack(m) => &m.id,
            Message::File(m) => &m.id,
        };
        cache.get_or_compute(|| ContentId::of(&self.encode()))
    }
}

fn read_bool(buf: &[u8], pos: &mut usize) -> Result<bool, CodecError> {
    let byte = *buf.get(*pos).ok_or(CodecError::Truncated)?;
    *pos += 1;
    match byte {
        0x00 => Ok(false),
        0x01 => Ok(true),
        _ => Err(CodecError::InvalidBoolFlag),
    }
}
