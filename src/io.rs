// File-level I/O helpers for diffing and patching.
//
// Provides `diff_file()` and `patch_file()` convenience functions that read
// their inputs fully, run the in-memory engine, and write the result with
// buffered I/O. Optionally computes SHA-256 checksums (feature-gated behind
// `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::cbor::TokenizeError;
use crate::diff::{ApplyError, DiffStats, EnvelopeError};
use crate::engine::{self, DiffOptions};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `diff_file()`.
#[derive(Debug, Clone)]
pub struct DiffFileStats {
    /// Original file size in bytes.
    pub original_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Encoded envelope size in bytes.
    pub delta_size: u64,
    /// Command breakdown of the edit script.
    pub commands: DiffStats,
    /// SHA-256 of the target file (if `file-io` feature is enabled).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `patch_file()`.
#[derive(Debug, Clone)]
pub struct PatchFileStats {
    /// Original file size in bytes.
    pub original_size: u64,
    /// Delta file size in bytes.
    pub delta_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

/// Diff `original_path` against `target_path`, writing the envelope to
/// `delta_path`.
pub fn diff_file(
    original_path: &Path,
    target_path: &Path,
    delta_path: &Path,
    opts: &DiffOptions,
) -> Result<DiffFileStats, FileError> {
    let original = std::fs::read(original_path)?;
    let target = std::fs::read(target_path)?;

    let diff = engine::diff(&original, &target, opts)?;
    let delta = diff.to_bytes()?;
    write_buffered(delta_path, &delta)?;

    Ok(DiffFileStats {
        original_size: original.len() as u64,
        target_size: target.len() as u64,
        delta_size: delta.len() as u64,
        commands: diff.stats(),
        target_sha256: sha256(&target),
    })
}

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Apply the envelope in `delta_path` to `original_path`, writing the
/// reconstruction to `output_path`.
///
/// Nothing is written if the envelope is malformed or out of bounds.
pub fn patch_file(
    original_path: &Path,
    delta_path: &Path,
    output_path: &Path,
) -> Result<PatchFileStats, FileError> {
    let original = std::fs::read(original_path)?;
    let delta = std::fs::read(delta_path)?;

    let output = engine::patch(&original, &delta)?;
    write_buffered(output_path, &output)?;

    Ok(PatchFileStats {
        original_size: original.len() as u64,
        delta_size: delta.len() as u64,
        output_size: output.len() as u64,
        output_sha256: sha256(&output),
    })
}

fn write_buffered(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
