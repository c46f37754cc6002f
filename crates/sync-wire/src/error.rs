//! Codec error taxonomy (spec §4.A, §7).

use thiserror::Error;

/// Errors that can occur while decoding a wire message.
///
/// All of these surface as decode errors; per spec §4.A and §7 the
/// caller (transport middleware) drops the connection or logs,
/// depending on policy — the codec itself never recovers from them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The 3-byte magic prefix did not match `0x59 0x4A 0x53`.
    #[error("invalid magic bytes")]
    InvalidMagic,

    /// The version byte is not one this codec understands.
    #[error("unsupported protocol version")]
    UnsupportedVersion,

    /// The category tag byte did not match a known category.
    #[error("unknown message category")]
    UnknownCategory,

    /// The subtype byte did not match a known payload variant for its category.
    #[error("unknown payload subtype")]
    UnknownSubtype,

    /// The buffer ended before a length-prefixed field could be fully read.
    #[error("truncated message")]
    Truncated,

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// A boolean-flag byte carried a value other than `0x00`/`0x01`.
    #[error("invalid boolean flag byte")]
    InvalidBoolFlag,
}
