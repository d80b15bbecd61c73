// Edit script replay.
//
// Every command is validated before any output is assembled, so a failing
// call never hands back a partial buffer.

use super::envelope::{Command, Diff, EnvelopeError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error(
        "command {index}: copy range {start}..{end} is out of bounds for an original of {len} bytes"
    )]
    RangeOutOfBounds {
        index: usize,
        start: u64,
        end: u64,
        len: usize,
    },
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),
}

/// Reconstruct the target by replaying `diff` against `original`.
pub fn apply_diff(original: &[u8], diff: &Diff) -> Result<Vec<u8>, ApplyError> {
    let pieces = diff
        .commands()
        .iter()
        .enumerate()
        .map(|(index, cmd)| match cmd {
            Command::Copy { start, end } => checked_range(original.len(), *start, *end)
                .map(|range| &original[range])
                .ok_or(ApplyError::RangeOutOfBounds {
                    index,
                    start: *start,
                    end: *end,
                    len: original.len(),
                }),
            Command::Insert(data) => Ok(data.as_slice()),
        })
        .collect::<Result<Vec<&[u8]>, _>>()?;

    let out = pieces.concat();
    log::trace!(
        "applied {} commands: {} -> {} bytes",
        diff.len(),
        original.len(),
        out.len()
    );
    Ok(out)
}

/// Decode a CBOR envelope and replay it against `original`.
pub fn apply_encoded(original: &[u8], envelope: &[u8]) -> Result<Vec<u8>, ApplyError> {
    let diff = Diff::from_bytes(envelope)?;
    apply_diff(original, &diff)
}

/// `start..end` if `start <= end <= len`.
fn checked_range(len: usize, start: u64, end: u64) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?;
    (start <= end && end <= len).then_some(start..end)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
