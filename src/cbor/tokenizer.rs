// CBOR tokenizer: partitions a buffer into one byte range per item header.
//
// Containers and tags are not skipped as blocks. Their headers become
// tokens of their own and their children follow in the same left-to-right
// walk, so container structure lives in token order only. Strings carry
// their payload inside the token.
//
// With descent enabled, the payload of a tag-24 byte string is walked as a
// bounded sub-buffer whose tokens appear inline. Nested sub-buffers are
// tracked with an explicit stack of frame end offsets.

use std::ops::Range;

use super::header::{self, Header, MajorType, TagContent, TokenizeError};

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// One item boundary inside a tokenized buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Absolute start offset in the tokenized buffer.
    pub offset: usize,
    /// Length in bytes (header plus string payload, if any).
    pub len: usize,
    /// Major type of the item whose header starts this token.
    pub major: MajorType,
    /// Number of encoded-CBOR payloads enclosing this token.
    pub depth: usize,
}

impl Token {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// The token's bytes within the buffer it was produced from.
    #[inline]
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.range()]
    }
}

// ---------------------------------------------------------------------------
// Token iterator
// ---------------------------------------------------------------------------

/// Lazy token stream over a borrowed buffer.
///
/// Yields `Err` at most once; the iterator is fused afterwards. A clone
/// snapshots the walk; call `tokenize()` again to start over.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    buf: &'a [u8],
    pos: usize,
    descend: bool,
    /// End offsets of the encoded-CBOR payloads currently being walked.
    frames: Vec<usize>,
    /// A tag-24 header was read and its byte string has not been.
    pending_tag: bool,
    failed: bool,
}

/// Tokenize `buf`, optionally descending into tag-24 embedded CBOR.
pub fn tokenize(buf: &[u8], descend: bool) -> Tokens<'_> {
    Tokens {
        buf,
        pos: 0,
        descend,
        frames: Vec::new(),
        pending_tag: false,
        failed: false,
    }
}

impl<'a> Tokens<'a> {
    /// The buffer being tokenized.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Current end of the innermost buffer being walked.
    fn limit(&self) -> usize {
        self.frames.last().copied().unwrap_or(self.buf.len())
    }

    fn step(&mut self, limit: usize) -> Result<Token, TokenizeError> {
        let offset = self.pos;
        let depth = self.frames.len();
        let header = header::decode_header_at(&self.buf[..limit], offset)?;

        if std::mem::take(&mut self.pending_tag) {
            if header.major != MajorType::ByteString {
                return Err(TokenizeError::BadTagContent {
                    offset,
                    found: TagContent::Item(header.major),
                });
            }
            // Zero-length and indefinite byte strings are left opaque.
            if !header.indefinite && header.value > 0 {
                let payload_end = self.payload_end(&header, limit)?;
                self.pos = offset + header.len;
                self.frames.push(payload_end);
                return Ok(Token {
                    offset,
                    len: header.len,
                    major: header.major,
                    depth,
                });
            }
        }

        let end = if header.major.has_payload() {
            self.payload_end(&header, limit)?
        } else {
            offset + header.len
        };

        if self.descend && header.is_encoded_cbor_tag() {
            self.pending_tag = true;
        }

        self.pos = end;
        Ok(Token {
            offset,
            len: end - offset,
            major: header.major,
            depth,
        })
    }

    /// End offset of a string's payload, checked against `limit`.
    fn payload_end(&self, header: &Header, limit: usize) -> Result<usize, TokenizeError> {
        let start = self.pos + header.len;
        let available = limit - start;
        match usize::try_from(header.value) {
            Ok(n) if n <= available => Ok(start + n),
            _ => Err(TokenizeError::TruncatedString {
                offset: self.pos,
                needed: header.value,
                available,
            }),
        }
    }

    /// Close exhausted frames. A tag-24 header must not be the last item of
    /// the buffer (or sub-buffer) it lives in.
    fn unwind(&mut self) -> Result<(), TokenizeError> {
        loop {
            if self.pos < self.limit() {
                return Ok(());
            }
            if self.pending_tag {
                return Err(TokenizeError::BadTagContent {
                    offset: self.pos,
                    found: TagContent::EndOfInput,
                });
            }
            if self.frames.pop().is_none() {
                return Ok(());
            }
        }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let result = self.unwind().and_then(|()| {
            let limit = self.limit();
            if self.pos >= limit {
                Ok(None)
            } else {
                self.step(limit).map(Some)
            }
        });

        match result {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}

// ---------------------------------------------------------------------------
// Collecting helpers
// ---------------------------------------------------------------------------

/// Tokenize the whole buffer in a single attempt.
pub fn collect_tokens(buf: &[u8], descend: bool) -> Result<Vec<Token>, TokenizeError> {
    tokenize(buf, descend).collect()
}

/// Tokenize with descent, retrying once without descent on failure.
///
/// Recovers from byte strings that are tagged as embedded CBOR but do not
/// parse as such. The second attempt's result is returned as is.
pub fn get_cbor_tokens(buf: &[u8]) -> Result<Vec<Token>, TokenizeError> {
    match collect_tokens(buf, true) {
        Ok(tokens) => Ok(tokens),
        Err(e) => {
            log::debug!("tokenizing with descent failed ({e}), retrying without");
            collect_tokens(buf, false)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
