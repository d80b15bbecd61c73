// Token-level diff construction.
//
// Both buffers are tokenized, each distinct token content is interned to a
// small integer, and the id sequences are aligned. Equal runs become copies
// of the original's bytes; inserted or replaced runs carry the target's
// bytes verbatim; deleted runs produce nothing.

use std::collections::HashMap;

use super::envelope::{Command, Diff};
use super::matcher::{OpTag, SequenceMatcher};
use crate::cbor::{Token, TokenizeError, get_cbor_tokens};

/// Compute the edit script that turns `original` into `target`.
pub fn compute_diff(original: &[u8], target: &[u8]) -> Result<Diff, TokenizeError> {
    let t1 = get_cbor_tokens(original)?;
    let t2 = get_cbor_tokens(target)?;
    Ok(diff_tokens(original, &t1, target, &t2))
}

/// Build the edit script from already tokenized buffers.
///
/// `t1` and `t2` must partition `original` and `target` respectively; the
/// crate only calls this with tokenizer output.
pub(crate) fn diff_tokens(original: &[u8], t1: &[Token], target: &[u8], t2: &[Token]) -> Diff {
    let mut interner = Interner::default();
    let a = interner.ids(original, t1);
    let b = interner.ids(target, t2);

    let offset_a = |i: usize| t1.get(i).map_or(original.len(), |t| t.offset);
    let offset_b = |j: usize| t2.get(j).map_or(target.len(), |t| t.offset);

    let mut diff = Diff::new();
    for op in SequenceMatcher::new(&a, &b).opcodes() {
        log::trace!(
            "{:?} a[{}..{}] b[{}..{}]",
            op.tag,
            op.i1,
            op.i2,
            op.j1,
            op.j2
        );
        match op.tag {
            OpTag::Equal => diff.push(Command::Copy {
                start: offset_a(op.i1) as u64,
                end: offset_a(op.i2) as u64,
            }),
            OpTag::Insert | OpTag::Replace => {
                diff.push(Command::Insert(
                    target[offset_b(op.j1)..offset_b(op.j2)].to_vec(),
                ));
            }
            OpTag::Delete => {}
        }
    }

    let stats = diff.stats();
    log::debug!(
        "diff: {} + {} tokens, {} distinct; {} copies ({} bytes), {} inserts ({} bytes)",
        t1.len(),
        t2.len(),
        interner.len(),
        stats.copies,
        stats.copied_bytes,
        stats.inserts,
        stats.inserted_bytes
    );
    diff
}

/// Maps token contents to dense ids so alignment compares integers.
#[derive(Default)]
struct Interner<'a> {
    ids: HashMap<&'a [u8], u32>,
}

impl<'a> Interner<'a> {
    fn ids(&mut self, buf: &'a [u8], tokens: &[Token]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| {
                let next = self.ids.len() as u32;
                *self.ids.entry(t.bytes(buf)).or_insert(next)
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::collect_tokens;
    use crate::diff::apply_diff;

    fn roundtrip(a: &[u8], b: &[u8]) -> Diff {
        let diff = compute_diff(a, b).expect("diff failed");
        assert_eq!(apply_diff(a, &diff).expect("apply failed"), b);
        diff
    }

    #[test]
    fn last_array_element_changed() {
        let a = [0x83, 0x01, 0x02, 0x03];
        let b = [0x83, 0x01, 0x02, 0x04];
        let diff = roundtrip(&a, &b);
        assert_eq!(
            diff.commands(),
            &[Command::Copy { start: 0, end: 3 }, Command::Insert(vec![0x04])]
        );
    }

    #[test]
    fn identity_is_a_single_copy() {
        let a = [0x82, 0x63, b'f', b'o', b'o', 0x19, 0x01, 0x00];
        let diff = roundtrip(&a, &a);
        assert_eq!(diff.commands(), &[Command::Copy { start: 0, end: 8 }]);
    }

    #[test]
    fn empty_buffers() {
        assert!(roundtrip(&[], &[]).is_empty());
        assert_eq!(
            roundtrip(&[], &[0x01]).commands(),
            &[Command::Insert(vec![0x01])]
        );
        assert!(roundtrip(&[0x01], &[]).is_empty());
    }

    #[test]
    fn deletion_emits_no_command() {
        // ["abc", 1, 2] -> ["abc", 2]
        let a = [0x83, 0x63, b'a', b'b', b'c', 0x01, 0x02];
        let b = [0x82, 0x63, b'a', b'b', b'c', 0x02];
        let diff = roundtrip(&a, &b);
        assert_eq!(
            diff.commands(),
            &[
                Command::Insert(vec![0x82]),
                Command::Copy { start: 1, end: 5 },
                Command::Copy { start: 6, end: 7 },
            ]
        );
    }

    #[test]
    fn long_strings_are_copied_whole() {
        let text = "x".repeat(300);
        let mut a = vec![0x82, 0x79, 0x01, 0x2C];
        a.extend_from_slice(text.as_bytes());
        a.push(0x01);
        let mut b = a.clone();
        *b.last_mut().unwrap() = 0x02;

        let diff = roundtrip(&a, &b);
        assert_eq!(diff.stats().inserted_bytes, 1);
        assert_eq!(diff.stats().copied_bytes, a.len() as u64 - 1);
    }

    #[test]
    fn embedded_cbor_is_diffed_structurally() {
        // [24(h'83010203'), 9] -> [24(h'83010204'), 9]
        let a = [0x82, 0xD8, 0x18, 0x44, 0x83, 0x01, 0x02, 0x03, 0x09];
        let b = [0x82, 0xD8, 0x18, 0x44, 0x83, 0x01, 0x02, 0x04, 0x09];
        let diff = roundtrip(&a, &b);
        assert_eq!(
            diff.commands(),
            &[
                Command::Copy { start: 0, end: 7 },
                Command::Insert(vec![0x04]),
                Command::Copy { start: 8, end: 9 },
            ]
        );
    }

    #[test]
    fn diff_tokens_accepts_flat_tokenization() {
        let a = [0x82, 0xD8, 0x18, 0x44, 0x83, 0x01, 0x02, 0x03, 0x09];
        let b = [0x82, 0xD8, 0x18, 0x44, 0x83, 0x01, 0x02, 0x04, 0x09];
        let t1 = collect_tokens(&a, false).unwrap();
        let t2 = collect_tokens(&b, false).unwrap();
        let diff = diff_tokens(&a, &t1, &b, &t2);
        assert_eq!(diff.stats().inserted_bytes, 5);
        assert_eq!(apply_diff(&a, &diff).unwrap(), b);
    }

    /// `[uint; n]` alternating between `first` and the other of 0/1.
    fn alternating(n: u16, first: u8) -> Vec<u8> {
        let mut buf = vec![0x99];
        buf.extend_from_slice(&n.to_be_bytes());
        buf.extend((0..n).map(|i| ((i + u16::from(first)) % 2) as u8));
        buf
    }

    #[test]
    fn swapped_alternating_array_is_one_replace() {
        let a = alternating(16_000, 0);
        let b = alternating(16_000, 1);
        let diff = roundtrip(&a, &b);
        assert_eq!(
            diff.commands(),
            &[Command::Copy { start: 0, end: 3 }, Command::Insert(b[3..].to_vec())]
        );
    }

    #[test]
    fn repetitive_records_roundtrip() {
        // [{"id": i % 20, "ok": bool, "kind": "user"}, ...]: every token of
        // the body repeats far more than 1% of the time.
        let records = |flipped: &[usize]| {
            let mut buf = vec![0x99];
            buf.extend_from_slice(&4000u16.to_be_bytes());
            for i in 0..4000usize {
                let ok = (i % 3 == 0) != flipped.contains(&i);
                buf.extend_from_slice(&[0xA3, 0x62, b'i', b'd', (i % 20) as u8]);
                buf.extend_from_slice(&[0x62, b'o', b'k', if ok { 0xF5 } else { 0xF4 }]);
                buf.extend_from_slice(&[0x64, b'k', b'i', b'n', b'd']);
                buf.extend_from_slice(&[0x64, b'u', b's', b'e', b'r']);
            }
            buf
        };
        let a = records(&[]);
        let b = records(&[10, 2000, 3990]);
        let diff = roundtrip(&a, &b);
        assert_eq!(diff.target_len(), b.len() as u64);
    }

    #[test]
    fn tokenize_errors_propagate() {
        assert!(matches!(
            compute_diff(&[0x01], &[0x1B]),
            Err(TokenizeError::TruncatedHeader { .. })
        ));
        assert!(matches!(
            compute_diff(&[0x5C], &[0x01]),
            Err(TokenizeError::ReservedEncoding { info: 28, .. })
        ));
    }
}
