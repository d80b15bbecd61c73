// CBOR item header decoding (RFC 8949, Section 3).
//
// The first byte carries the major type in its top three bits and the
// "additional information" in the low five. Values 24..=27 announce a
// 1/2/4/8-byte big-endian argument; 28..=30 are reserved; 31 marks an
// indefinite-length item (or the break stop code for major type 7).

use std::fmt;

// ---------------------------------------------------------------------------
// Additional-information boundaries
// ---------------------------------------------------------------------------

/// Largest argument that fits inline in the initial byte.
pub const MAX_INLINE_ARG: u8 = 23;
/// First additional-info value that carries an out-of-line argument.
pub const AI_ONE_BYTE: u8 = 24;
/// Last additional-info value that carries an out-of-line argument.
pub const AI_EIGHT_BYTES: u8 = 27;
/// Indefinite-length marker / break stop code.
pub const AI_INDEFINITE: u8 = 31;

/// Tag number of "encoded CBOR data item" (RFC 8949, Section 3.4.5.1).
pub const TAG_ENCODED_CBOR: u64 = 24;

// ---------------------------------------------------------------------------
// Major type
// ---------------------------------------------------------------------------

/// The 3-bit type tag in a CBOR item's initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorType {
    UnsignedInt,
    NegativeInt,
    ByteString,
    TextString,
    Array,
    Map,
    Tag,
    Simple,
}

impl MajorType {
    /// Classify the top three bits of an initial byte.
    #[inline]
    pub fn from_initial_byte(b: u8) -> Self {
        match b >> 5 {
            0 => Self::UnsignedInt,
            1 => Self::NegativeInt,
            2 => Self::ByteString,
            3 => Self::TextString,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Simple,
        }
    }

    /// Numeric major type (0..=7).
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a payload of `value` bytes follows the header.
    #[inline]
    pub fn has_payload(self) -> bool {
        matches!(self, Self::ByteString | Self::TextString)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UnsignedInt => "uint",
            Self::NegativeInt => "nint",
            Self::ByteString => "bstr",
            Self::TextString => "tstr",
            Self::Array => "array",
            Self::Map => "map",
            Self::Tag => "tag",
            Self::Simple => "simple",
        }
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure while decoding headers or partitioning a buffer into tokens.
///
/// Offsets are absolute positions in the buffer handed to the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("truncated header at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedHeader {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("reserved additional information {info} at offset {offset}")]
    ReservedEncoding { offset: usize, info: u8 },

    #[error("truncated string at offset {offset}: need {needed} payload bytes, {available} available")]
    TruncatedString {
        offset: usize,
        needed: u64,
        available: usize,
    },

    #[error("bad content after encoded-CBOR tag at offset {offset}: expected bstr, found {found}")]
    BadTagContent {
        offset: usize,
        found: TagContent,
    },
}

/// What followed a tag-24 header when it was not a byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagContent {
    Item(MajorType),
    EndOfInput,
}

impl fmt::Display for TagContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(major) => write!(f, "{major}"),
            Self::EndOfInput => f.write_str("end of input"),
        }
    }
}

impl TokenizeError {
    /// Shift the reported offset by `base` (used when decoding a sub-slice).
    pub(crate) fn at(self, base: usize) -> Self {
        match self {
            Self::TruncatedHeader {
                offset,
                needed,
                available,
            } => Self::TruncatedHeader {
                offset: offset + base,
                needed,
                available,
            },
            Self::ReservedEncoding { offset, info } => Self::ReservedEncoding {
                offset: offset + base,
                info,
            },
            Self::TruncatedString {
                offset,
                needed,
                available,
            } => Self::TruncatedString {
                offset: offset + base,
                needed,
                available,
            },
            Self::BadTagContent { offset, found } => Self::BadTagContent {
                offset: offset + base,
                found,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A decoded CBOR item header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub major: MajorType,
    /// The item's argument: string/array/map length, tag number, or the
    /// raw value for integers and simple values.
    pub value: u64,
    /// Bytes occupied by the header itself: one of 1, 2, 3, 5, 9.
    pub len: usize,
    /// Set when additional information was 31.
    pub indefinite: bool,
}

impl Header {
    /// True for a tag-24 header ("the next bstr holds CBOR").
    #[inline]
    pub fn is_encoded_cbor_tag(&self) -> bool {
        self.major == MajorType::Tag && !self.indefinite && self.value == TAG_ENCODED_CBOR
    }
}

/// Decode the header at the start of `buf`.
///
/// Only the header bytes are examined; string payloads are not checked here.
pub fn decode_header(buf: &[u8]) -> Result<Header, TokenizeError> {
    let Some(&initial) = buf.first() else {
        return Err(TokenizeError::TruncatedHeader {
            offset: 0,
            needed: 1,
            available: 0,
        });
    };

    let major = MajorType::from_initial_byte(initial);
    let info = initial & 0x1F;

    match info {
        0..=MAX_INLINE_ARG => Ok(Header {
            major,
            value: u64::from(info),
            len: 1,
            indefinite: false,
        }),
        AI_ONE_BYTE..=AI_EIGHT_BYTES => {
            let width = 1usize << (info - AI_ONE_BYTE);
            let needed = 1 + width;
            if buf.len() < needed {
                return Err(TokenizeError::TruncatedHeader {
                    offset: 0,
                    needed,
                    available: buf.len(),
                });
            }
            let value = buf[1..needed]
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            Ok(Header {
                major,
                value,
                len: needed,
                indefinite: false,
            })
        }
        AI_INDEFINITE => Ok(Header {
            major,
            // An indefinite string cannot be sized from its header.
            value: if major.has_payload() {
                0
            } else {
                u64::from(AI_INDEFINITE)
            },
            len: 1,
            indefinite: true,
        }),
        _ => Err(TokenizeError::ReservedEncoding { offset: 0, info }),
    }
}

/// Decode the header at `offset` in `buf`, reporting errors at that offset.
pub fn decode_header_at(buf: &[u8], offset: usize) -> Result<Header, TokenizeError> {
    decode_header(buf.get(offset..).unwrap_or_default()).map_err(|e| e.at(offset))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
