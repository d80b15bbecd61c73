// Longest-matching-block sequence alignment.
//
// Finds the longest contiguous run common to both sequences, then recurses
// on the pieces to its left and right. The resulting matching blocks are
// turned into equal/replace/insert/delete opcodes that cover both sequences
// left to right.
//
// Once `b` has at least 200 elements, elements making up more than 1% of it
// are "popular" and left out of the position index, which keeps the block
// search cheap on repetitive input. Popular elements can still join a
// block by extending it across equal neighbours. A shared prefix and suffix
// are matched up front, so identical inputs always align as one block.

use std::collections::HashMap;
use std::hash::Hash;

/// `b` lengths from which popular elements are pruned.
const AUTOJUNK_MIN_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    /// `a[i1..i2] == b[j1..j2]`.
    Equal,
    /// `a[i1..i2]` is replaced by `b[j1..j2]`.
    Replace,
    /// `b[j1..j2]` is inserted at `a[i1]` (`i1 == i2`).
    Insert,
    /// `a[i1..i2]` is dropped (`j1 == j2`).
    Delete,
}

/// One step of the edit from `a` to `b`, as half-open index ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub i1: usize,
    pub i2: usize,
    pub j1: usize,
    pub j2: usize,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions of every non-popular element of `b`, ascending.
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// Matcher with popular-element pruning.
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        Self::with_autojunk(a, b, true)
    }

    /// `autojunk = false` indexes every element of `b`. Finds more blocks, but the
    /// search is quadratic when few distinct elements repeat a lot.
    pub fn with_autojunk(a: &'a [T], b: &'a [T], autojunk: bool) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }
        if autojunk && b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            let before = b2j.len();
            b2j.retain(|_, positions| positions.len() <= ntest);
            log::trace!(
                "matcher: {} of {before} distinct elements popular (> {ntest} occurrences)",
                before - b2j.len()
            );
        }
        Self { a, b, b2j }
    }

    /// Longest block in `a[alo..ahi]` / `b[blo..bhi]`.
    ///
    /// Among equally long blocks the one starting earliest in `a` wins, then
    /// the one starting earliest in `b`. The winner is then grown across
    /// equal neighbours on both sides, which is how popular elements end up
    /// in blocks. Returns `size == 0` if none.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let mut best = Match {
            a: alo,
            b: blo,
            size: 0,
        };
        // j2len[j] = length of the match ending at a[i - 1], b[j].
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        let mut next_j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            next_j2len.clear();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            std::mem::swap(&mut j2len, &mut next_j2len);
        }

        while best.a > alo && best.b > blo && self.a[best.a - 1] == self.b[best.b - 1] {
            best.a -= 1;
            best.b -= 1;
            best.size += 1;
        }
        while best.a + best.size < ahi
            && best.b + best.size < bhi
            && self.a[best.a + best.size] == self.b[best.b + best.size]
        {
            best.size += 1;
        }

        best
    }

    /// Non-overlapping matching blocks in ascending order, adjacent blocks
    /// merged, terminated by the sentinel `(a.len(), b.len(), 0)`.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());

        // A shared prefix and suffix always belong to the alignment.
        let prefix = self
            .a
            .iter()
            .zip(self.b)
            .take_while(|(x, y)| x == y)
            .count();
        let suffix = self.a[prefix..]
            .iter()
            .rev()
            .zip(self.b[prefix..].iter().rev())
            .take_while(|(x, y)| x == y)
            .count();

        let mut blocks = Vec::new();
        if prefix > 0 {
            blocks.push(Match {
                a: 0,
                b: 0,
                size: prefix,
            });
        }
        if suffix > 0 {
            blocks.push(Match {
                a: la - suffix,
                b: lb - suffix,
                size: suffix,
            });
        }

        let mut queue = vec![(prefix, la - suffix, prefix, lb - suffix)];
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            if alo >= ahi || blo >= bhi {
                continue;
            }
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            blocks.push(m);
            queue.push((alo, m.a, blo, m.b));
            queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
        }
        blocks.sort_by_key(|m| (m.a, m.b));

        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == m.a && last.b + last.size == m.b => {
                    last.size += m.size;
                }
                _ => merged.push(m),
            }
        }
        merged.push(Match {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    /// Opcodes transforming `a` into `b`, covering both sequences in order.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);

        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    i1: i,
                    i2: m.a,
                    j1: j,
                    j2: m.b,
                });
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                ops.push(Opcode {
                    tag: OpTag::Equal,
                    i1: m.a,
                    i2: i,
                    j1: m.b,
                    j2: j,
                });
            }
        }

        ops
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
