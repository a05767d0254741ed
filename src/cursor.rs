//! Forward decoding cursor over one encoded color class.
//!
//! A cursor is positioned on its first member as soon as it is created and
//! decodes lazily from then on. Exhaustion is signalled by the sentinel
//! `num_docs`, which is larger than every legal member, so merge-style loops
//! can test `value() == num_docs()` regardless of the list's regime.
//!
//! The regime is fixed at construction and kept as a tag with per-regime
//! state:
//!
//! - **Sparse** decodes one gap per step.
//! - **Bitmap** asks the bit cursor for the next set bit.
//! - **Dense** decodes the complement stream while walking a domain counter
//!   upward, stepping over every complement member it meets.

use crate::bits::BitCursor;
use crate::codes::read_delta;
use crate::config::Validation;
use crate::error::{Error, Result};
use crate::policy::{Regime, Thresholds};

#[derive(Clone, Copy, Debug)]
enum CursorState {
    Sparse {
        pos_in_list: u32,
    },
    Bitmap {
        bitmap_begin: u64,
        pos_in_list: u32,
    },
    Dense {
        comp_size: u32,
        comp_pos: u32,
        comp_val: u32,
    },
}

/// Decoding cursor over one color class.
///
/// Holds a borrowed view of the store's bit stream plus a few scalars, so any
/// number of cursors can read the same store concurrently.
#[derive(Clone, Debug)]
pub struct ColorsCursor<'a> {
    it: BitCursor<'a>,
    begin: u64,
    num_docs: u32,
    size: u32,
    curr_val: u32,
    validation: Validation,
    state: CursorState,
}

#[inline]
fn clamp(value: u64, num_docs: u32) -> u32 {
    value.min(num_docs as u64) as u32
}

/// Decode the next complement member, or park `comp_val` on the sentinel.
#[inline]
fn next_comp(
    it: &mut BitCursor<'_>,
    num_docs: u32,
    comp_size: u32,
    comp_pos: &mut u32,
    comp_val: &mut u32,
) {
    *comp_pos += 1;
    if *comp_pos >= comp_size {
        *comp_val = num_docs;
        return;
    }
    *comp_val = clamp(
        read_delta(it).saturating_add(*comp_val as u64 + 1),
        num_docs,
    );
}

/// Step `curr_val` over complement members until it lands on a true member
/// or reaches `num_docs`.
#[inline]
fn skip_complement(
    it: &mut BitCursor<'_>,
    curr_val: &mut u32,
    num_docs: u32,
    comp_size: u32,
    comp_pos: &mut u32,
    comp_val: &mut u32,
) {
    while *curr_val < num_docs && *curr_val == *comp_val {
        *curr_val += 1;
        next_comp(it, num_docs, comp_size, comp_pos, comp_val);
    }
}

impl<'a> ColorsCursor<'a> {
    /// Open the list starting at bit `begin` of `words`.
    pub(crate) fn new(
        words: &'a [u64],
        begin: u64,
        num_docs: u32,
        thresholds: &Thresholds,
        validation: Validation,
    ) -> Self {
        let mut it = BitCursor::new(words, begin);
        let size = clamp(read_delta(&mut it), num_docs);
        let mut curr_val = num_docs;

        let state = match thresholds.classify(size) {
            Regime::Sparse => {
                if size > 0 {
                    curr_val = clamp(read_delta(&mut it), num_docs);
                }
                CursorState::Sparse { pos_in_list: 0 }
            }
            Regime::Bitmap => {
                let bitmap_begin = it.position();
                if size > 0 {
                    curr_val = match it.next_one() {
                        Some(pos) => clamp(pos - bitmap_begin, num_docs),
                        None => num_docs,
                    };
                }
                CursorState::Bitmap {
                    bitmap_begin,
                    pos_in_list: 0,
                }
            }
            Regime::Dense => {
                let comp_size = num_docs - size;
                let mut comp_pos = 0;
                let mut comp_val = if comp_size > 0 {
                    clamp(read_delta(&mut it), num_docs)
                } else {
                    num_docs
                };
                curr_val = 0;
                skip_complement(
                    &mut it,
                    &mut curr_val,
                    num_docs,
                    comp_size,
                    &mut comp_pos,
                    &mut comp_val,
                );
                CursorState::Dense {
                    comp_size,
                    comp_pos,
                    comp_val,
                }
            }
        };

        Self {
            it,
            begin,
            num_docs,
            size,
            curr_val,
            validation,
            state,
        }
    }

    /// Current member, or `num_docs` once exhausted.
    #[inline]
    pub fn value(&self) -> u32 {
        self.curr_val
    }

    /// Alias of [`value`](Self::value).
    #[inline]
    pub fn current_value(&self) -> u32 {
        self.curr_val
    }

    /// Current complement member of a dense list, or `num_docs` once the
    /// complement is exhausted (always `num_docs` for other regimes).
    #[inline]
    pub fn comp_value(&self) -> u32 {
        match self.state {
            CursorState::Dense { comp_val, .. } => comp_val,
            _ => self.num_docs,
        }
    }

    /// Number of members in the list.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Size of the id universe, which is also the exhaustion sentinel.
    #[inline]
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Physical representation of the list.
    #[inline]
    pub fn regime(&self) -> Regime {
        match self.state {
            CursorState::Sparse { .. } => Regime::Sparse,
            CursorState::Bitmap { .. } => Regime::Bitmap,
            CursorState::Dense { .. } => Regime::Dense,
        }
    }

    /// Move to the next member. Past the last member the value saturates at
    /// `num_docs`.
    #[inline]
    pub fn advance(&mut self) {
        if self.curr_val >= self.num_docs {
            return;
        }
        let num_docs = self.num_docs;
        match &mut self.state {
            CursorState::Sparse { pos_in_list } => {
                *pos_in_list += 1;
                if *pos_in_list >= self.size {
                    self.curr_val = num_docs;
                    return;
                }
                let prev = self.curr_val as u64;
                let gap = read_delta(&mut self.it);
                self.curr_val = clamp(gap.saturating_add(prev + 1), num_docs);
            }
            CursorState::Bitmap {
                bitmap_begin,
                pos_in_list,
            } => {
                *pos_in_list += 1;
                if *pos_in_list >= self.size {
                    self.curr_val = num_docs;
                    return;
                }
                self.curr_val = match self.it.next_one() {
                    Some(pos) => clamp(pos - *bitmap_begin, num_docs),
                    None => num_docs,
                };
            }
            CursorState::Dense {
                comp_size,
                comp_pos,
                comp_val,
            } => {
                self.curr_val += 1;
                skip_complement(
                    &mut self.it,
                    &mut self.curr_val,
                    num_docs,
                    *comp_size,
                    comp_pos,
                    comp_val,
                );
            }
        }
    }

    /// Move to the smallest member `>= lower_bound`, or to `num_docs` if none
    /// exists, and return it.
    ///
    /// Bounds at or below the current value leave the cursor where it is.
    /// Under [`Validation::Checked`] a bound above `num_docs` is rejected;
    /// under [`Validation::Trusted`] it is clamped to `num_docs`.
    ///
    /// Sparse and bitmap lists scan forward one member at a time. Dense lists
    /// skip complement members below the bound, jump straight to it, and then
    /// step over it if it is itself a complement member.
    pub fn advance_to(&mut self, lower_bound: u32) -> Result<u32> {
        let lower_bound = match self.validation {
            Validation::Checked if lower_bound > self.num_docs => {
                return Err(Error::OutOfRange {
                    what: "lower_bound",
                    value: lower_bound as u64,
                    bound: self.num_docs as u64,
                });
            }
            Validation::Checked => lower_bound,
            Validation::Trusted => lower_bound.min(self.num_docs),
        };
        if lower_bound <= self.curr_val {
            return Ok(self.curr_val);
        }

        match self.state {
            CursorState::Dense { .. } => self.seek_dense(lower_bound),
            _ => {
                while self.curr_val < lower_bound {
                    self.advance();
                }
            }
        }
        Ok(self.curr_val)
    }

    fn seek_dense(&mut self, lower_bound: u32) {
        let num_docs = self.num_docs;
        if let CursorState::Dense {
            comp_size,
            comp_pos,
            comp_val,
        } = &mut self.state
        {
            while *comp_val < lower_bound {
                next_comp(&mut self.it, num_docs, *comp_size, comp_pos, comp_val);
            }
            self.curr_val = lower_bound;
            skip_complement(
                &mut self.it,
                &mut self.curr_val,
                num_docs,
                *comp_size,
                comp_pos,
                comp_val,
            );
        }
    }

    /// Rewind a dense cursor to walk its complement directly.
    ///
    /// Afterwards [`comp_value`](Self::comp_value) is the smallest id *absent*
    /// from the list and [`advance_comp`](Self::advance_comp) steps through the
    /// `num_docs - size` absent ids in increasing order. `value()` reads 0 and
    /// the member-walking operations should not be mixed with this mode.
    pub fn reinit_for_complement_iteration(&mut self) -> Result<()> {
        let found = self.regime();
        if found != Regime::Dense {
            return Err(Error::WrongRegime {
                expected: Regime::Dense,
                found,
            });
        }
        let num_docs = self.num_docs;
        if let CursorState::Dense {
            comp_size,
            comp_pos,
            comp_val,
        } = &mut self.state
        {
            *comp_pos = 0;
            self.curr_val = 0;
            self.it.at(self.begin);
            read_delta(&mut self.it); // size
            *comp_val = if *comp_size > 0 {
                clamp(read_delta(&mut self.it), num_docs)
            } else {
                num_docs
            };
        }
        Ok(())
    }

    /// Move to the next complement member of a dense list. No effect on other
    /// regimes or once the complement is exhausted.
    #[inline]
    pub fn advance_comp(&mut self) {
        let num_docs = self.num_docs;
        if let CursorState::Dense {
            comp_size,
            comp_pos,
            comp_val,
        } = &mut self.state
        {
            if *comp_val < num_docs {
                next_comp(&mut self.it, num_docs, *comp_size, comp_pos, comp_val);
            }
        }
    }
}

impl Iterator for ColorsCursor<'_> {
    type Item = u32;

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.curr_val >= self.num_docs {
            return (0, Some(0));
        }
        let remaining = match self.state {
            CursorState::Sparse { pos_in_list } | CursorState::Bitmap { pos_in_list, .. } => {
                self.size.saturating_sub(pos_in_list)
            }
            // ids left in the universe minus complement members not yet passed
            CursorState::Dense {
                comp_size,
                comp_pos,
                ..
            } => (self.num_docs - self.curr_val).saturating_sub(comp_size.saturating_sub(comp_pos)),
        };
        (remaining as usize, Some(remaining as usize))
    }

    /// Yield the current member and advance past it.
    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.curr_val >= self.num_docs {
            return None;
        }
        let value = self.curr_val;
        self.advance();
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVectorBuilder;
    use crate::codes::write_delta;
    use crate::encoder::encode_list;

    fn encode(list: &[u32], num_docs: u32) -> (Vec<u64>, Thresholds) {
        let t = Thresholds::new(num_docs);
        let mut bvb = BitVectorBuilder::new();
        encode_list(&mut bvb, list, num_docs, &t).unwrap();
        (bvb.into_words(), t)
    }

    fn open<'a>(words: &'a [u64], t: &Thresholds, num_docs: u32) -> ColorsCursor<'a> {
        ColorsCursor::new(words, 0, num_docs, t, Validation::Checked)
    }

    #[test]
    fn test_sparse_walk() {
        let (words, t) = encode(&[3, 40, 41, 99], 100);
        let mut it = open(&words, &t, 100);
        assert_eq!(it.regime(), Regime::Sparse);
        assert_eq!(it.size(), 4);
        assert_eq!(it.value(), 3);
        it.advance();
        assert_eq!(it.value(), 40);
        it.advance();
        assert_eq!(it.value(), 41);
        it.advance();
        assert_eq!(it.value(), 99);
        it.advance();
        assert_eq!(it.value(), 100);
        it.advance();
        assert_eq!(it.value(), 100);
    }

    #[test]
    fn test_empty_sparse_is_exhausted() {
        let (words, t) = encode(&[], 100);
        let it = open(&words, &t, 100);
        assert_eq!(it.regime(), Regime::Sparse);
        assert_eq!(it.value(), 100);
    }

    #[test]
    fn test_bitmap_walk() {
        let (words, t) = encode(&[0, 1, 9], 10);
        let it = open(&words, &t, 10);
        assert_eq!(it.regime(), Regime::Bitmap);
        assert_eq!(it.collect::<Vec<_>>(), vec![0, 1, 9]);
    }

    #[test]
    fn test_empty_bitmap_is_exhausted() {
        // num_docs = 2: sparse threshold 0, dense threshold 1
        let (words, t) = encode(&[], 2);
        let it = open(&words, &t, 2);
        assert_eq!(it.regime(), Regime::Bitmap);
        assert_eq!(it.value(), 2);
    }

    #[test]
    fn test_dense_walk() {
        let list = [0, 1, 2, 4, 5, 6, 8, 9];
        let (words, t) = encode(&list, 10);
        let it = open(&words, &t, 10);
        assert_eq!(it.regime(), Regime::Dense);
        assert_eq!(it.collect::<Vec<_>>(), list.to_vec());
    }

    #[test]
    fn test_dense_leading_complement() {
        let list = [3, 4, 5, 6, 7, 8, 9];
        let (words, t) = encode(&list, 10);
        let it = open(&words, &t, 10);
        assert_eq!(it.value(), 3);
        assert_eq!(it.collect::<Vec<_>>(), list.to_vec());
    }

    #[test]
    fn test_dense_complement_iteration() {
        let list = [0, 1, 2, 4, 5, 6, 8];
        let (words, t) = encode(&list, 10);
        let mut it = open(&words, &t, 10);
        it.advance();
        it.advance();
        it.reinit_for_complement_iteration().unwrap();

        let mut comp = Vec::new();
        while it.comp_value() < it.num_docs() {
            comp.push(it.comp_value());
            it.advance_comp();
        }
        assert_eq!(comp, vec![3, 7, 9]);
    }

    #[test]
    fn test_complement_on_sparse_is_rejected() {
        let (words, t) = encode(&[1], 100);
        let mut it = open(&words, &t, 100);
        let err = it.reinit_for_complement_iteration().unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_seek_on_every_regime() {
        for (list, num_docs) in [
            (vec![3u32, 40, 41, 99], 100u32),
            (vec![0, 1, 9], 10),
            (vec![0, 1, 2, 4, 5, 6, 8, 9], 10),
        ] {
            let (words, t) = encode(&list, num_docs);
            let mut it = open(&words, &t, num_docs);
            for bound in 0..=num_docs {
                let expected = list
                    .iter()
                    .copied()
                    .find(|&x| x >= bound)
                    .unwrap_or(num_docs);
                assert_eq!(it.advance_to(bound).unwrap(), expected, "bound {}", bound);
            }
        }
    }

    #[test]
    fn test_dense_seek_to_complement_member_lands_on_next_member() {
        let list = [0, 1, 2, 3, 6, 7, 8, 9];
        let (words, t) = encode(&list, 10);
        let mut it = open(&words, &t, 10);
        // 4 and 5 are absent: the cursor must not report them.
        assert_eq!(it.advance_to(4).unwrap(), 6);
        it.advance();
        assert_eq!(it.value(), 7);
    }

    #[test]
    fn test_seek_never_moves_backwards() {
        let (words, t) = encode(&[0, 1, 2, 4, 5, 6, 8, 9], 10);
        let mut it = open(&words, &t, 10);
        assert_eq!(it.advance_to(5).unwrap(), 5);
        assert_eq!(it.advance_to(2).unwrap(), 5);
    }

    #[test]
    fn test_seek_bound_validation() {
        let (words, t) = encode(&[0, 1, 9], 10);
        let mut checked = ColorsCursor::new(&words, 0, 10, &t, Validation::Checked);
        assert!(checked.advance_to(11).is_err());

        let mut trusted = ColorsCursor::new(&words, 0, 10, &t, Validation::Trusted);
        assert_eq!(trusted.advance_to(11).unwrap(), 10);
    }

    #[test]
    fn test_size_hint_counts_remaining_members() {
        let cases: Vec<(Vec<u32>, u32)> = vec![
            (vec![3, 40, 77], 100),
            (vec![0, 1, 9], 10),
            (vec![0, 1, 2, 4, 5, 6, 8, 9], 10),
            ((1..10).collect(), 10),
        ];
        for (list, num_docs) in cases {
            let (words, t) = encode(&list, num_docs);
            let mut it = open(&words, &t, num_docs);
            let mut left = list.len();
            loop {
                assert_eq!(it.size_hint(), (left, Some(left)), "{:?}", list);
                if it.next().is_none() {
                    break;
                }
                left -= 1;
            }
            assert_eq!(left, 0);
        }
    }

    #[test]
    fn test_oversized_gap_ends_at_sentinel() {
        // sparse: size 3, first member 5, then a gap near u64::MAX
        let t = Thresholds::new(100);
        let mut bvb = BitVectorBuilder::new();
        write_delta(&mut bvb, 3);
        write_delta(&mut bvb, 5);
        write_delta(&mut bvb, u64::MAX - 1);
        let words = bvb.into_words();
        assert_eq!(open(&words, &t, 100).collect::<Vec<_>>(), vec![5]);

        // dense: size 6 of 8, complement {3, <huge>}
        let t = Thresholds::new(8);
        let mut bvb = BitVectorBuilder::new();
        write_delta(&mut bvb, 6);
        write_delta(&mut bvb, 3);
        write_delta(&mut bvb, u64::MAX - 1);
        let words = bvb.into_words();
        let it = open(&words, &t, 8);
        assert_eq!(it.regime(), Regime::Dense);
        assert_eq!(it.collect::<Vec<_>>(), vec![0, 1, 2, 4, 5, 6, 7]);
    }
}
