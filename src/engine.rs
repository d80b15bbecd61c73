// Diff engine: ties tokenization to diff construction and the wire envelope.
//
// Provides high-level APIs that orchestrate:
//   - Tokenization (cbor module) under the configured descent policy
//   - Alignment and edit script construction (diff module)
//   - Envelope encoding/decoding and replay against the original

use crate::cbor::{self, Token, TokenizeError};
use crate::diff::{self, ApplyError, Diff, EnvelopeError};

// ---------------------------------------------------------------------------
// Diff options
// ---------------------------------------------------------------------------

/// How the tokenizer treats tag-24 embedded CBOR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Descend {
    /// Descend, and retry without descent if that fails.
    #[default]
    Auto,
    /// Descend; a payload that does not parse is an error.
    Always,
    /// Treat embedded payloads as opaque byte strings.
    Never,
}

/// Configuration for diff computation.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub descend: Descend,
}

/// Tokenize `buf` under the given descent policy.
pub fn tokens(buf: &[u8], descend: Descend) -> Result<Vec<Token>, TokenizeError> {
    match descend {
        Descend::Auto => cbor::get_cbor_tokens(buf),
        Descend::Always => cbor::collect_tokens(buf, true),
        Descend::Never => cbor::collect_tokens(buf, false),
    }
}

// ---------------------------------------------------------------------------
// High-level diff
// ---------------------------------------------------------------------------

/// Compute the edit script between `original` and `target`.
pub fn diff(original: &[u8], target: &[u8], opts: &DiffOptions) -> Result<Diff, TokenizeError> {
    let t1 = tokens(original, opts.descend)?;
    let t2 = tokens(target, opts.descend)?;
    Ok(diff::diff_tokens(original, &t1, target, &t2))
}

/// Compute the edit script and serialize it to its CBOR envelope.
pub fn make_diff(
    original: &[u8],
    target: &[u8],
    opts: &DiffOptions,
) -> Result<Vec<u8>, EngineError> {
    let d = diff(original, target, opts)?;
    Ok(d.to_bytes()?)
}

/// Compute edit scripts for many independent pairs.
///
/// With the `parallel` feature the pairs are processed on the rayon pool.
pub fn compute_diffs(
    pairs: &[(&[u8], &[u8])],
    opts: &DiffOptions,
) -> Vec<Result<Diff, TokenizeError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        pairs
            .par_iter()
            .map(|(original, target)| diff(original, target, opts))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        pairs
            .iter()
            .map(|(original, target)| diff(original, target, opts))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// High-level patch
// ---------------------------------------------------------------------------

/// Reconstruct the target from `original` and an encoded envelope.
pub fn patch(original: &[u8], delta: &[u8]) -> Result<Vec<u8>, ApplyError> {
    diff::apply_encoded(original, delta)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
