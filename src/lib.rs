//! cbordelta: structure-aware binary diff/patch for CBOR data.
//!
//! Diffs are computed over CBOR item tokens rather than raw bytes, so an
//! edit never splits a header from its payload. Payloads of tag 24
//! (embedded CBOR) are descended into when they parse.
//!
//! The crate provides:
//! - CBOR header decoding and tokenization (`cbor`)
//! - Sequence alignment, edit scripts and their wire envelope (`diff`)
//! - High-level diff/patch APIs with descent policy (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use cbordelta::engine::{self, DiffOptions};
//!
//! let original = [0x83, 0x01, 0x02, 0x03]; // [1, 2, 3]
//! let target = [0x83, 0x01, 0x02, 0x04]; // [1, 2, 4]
//!
//! let delta = engine::make_diff(&original, &target, &DiffOptions::default()).unwrap();
//! let patched = engine::patch(&original, &delta).unwrap();
//! assert_eq!(patched, target);
//! ```

pub mod cbor;
pub mod diff;
pub mod engine;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use diff::{Command, Diff, apply_diff, compute_diff};
