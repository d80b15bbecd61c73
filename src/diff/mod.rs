// Token-aligned diffing of CBOR buffers.
//
// - `matcher` : Longest-matching-block sequence alignment (opcodes)
// - `builder` : Edit script construction from two token sequences
// - `applier` : Edit script replay against the original buffer
// - `envelope`: Edit commands and their CBOR wire envelope

pub mod applier;
pub mod builder;
pub mod envelope;
pub mod matcher;

pub use applier::{ApplyError, apply_diff, apply_encoded};
pub use builder::compute_diff;
pub(crate) use builder::diff_tokens;
pub use envelope::{Command, Diff, DiffStats, EnvelopeError};
pub use matcher::{OpTag, Opcode, SequenceMatcher};
