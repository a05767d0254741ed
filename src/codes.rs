//! Universal integer codes.
//!
//! # Theory
//!
//! Elias gamma writes `n + 1` as `⌊log2(n + 1)⌋` zeros, a one, and the
//! remaining low bits: `2⌊log2(n + 1)⌋ + 1` bits in total. Elias delta
//! replaces the unary length prefix with a gamma code of the length, giving
//! `⌊log2(n + 1)⌋ + 2⌊log2(⌊log2(n + 1)⌋ + 1)⌋ + 1` bits. Both are prefix-free
//! and handle `0` because they code `n + 1`.
//!
//! Every size field and gap in the color class stream is an Elias delta code.

use crate::bits::{BitCursor, BitVectorBuilder};

#[inline]
fn msb(x: u64) -> usize {
    debug_assert!(x != 0);
    63 - x.leading_zeros() as usize
}

/// Append the Elias gamma code of `n`.
#[inline]
pub fn write_gamma(bvb: &mut BitVectorBuilder, n: u64) {
    debug_assert!(n < u64::MAX);
    let nn = n + 1;
    let l = msb(nn);
    let hb = 1u64 << l;
    bvb.append_bits(hb, l + 1);
    bvb.append_bits(nn ^ hb, l);
}

/// Read an Elias gamma code.
#[inline]
pub fn read_gamma(it: &mut BitCursor<'_>) -> u64 {
    let l = it.skip_zeros().min(63);
    (it.take(l) | (1u64 << l)) - 1
}

/// Append the Elias delta code of `n`.
#[inline]
pub fn write_delta(bvb: &mut BitVectorBuilder, n: u64) {
    debug_assert!(n < u64::MAX);
    let nn = n + 1;
    let l = msb(nn);
    let hb = 1u64 << l;
    write_gamma(bvb, l as u64);
    bvb.append_bits(nn ^ hb, l);
}

/// Read an Elias delta code.
#[inline]
pub fn read_delta(it: &mut BitCursor<'_>) -> u64 {
    let l = (read_gamma(it) as usize).min(63);
    (it.take(l) | (1u64 << l)) - 1
}

/// Length in bits of the gamma code of `n`.
pub fn gamma_len(n: u64) -> usize {
    2 * msb(n + 1) + 1
}

/// Length in bits of the delta code of `n`.
pub fn delta_len(n: u64) -> usize {
    let l = msb(n + 1);
    gamma_len(l as u64) + l
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_small_values() {
        let mut bvb = BitVectorBuilder::new();
        write_gamma(&mut bvb, 0);
        assert_eq!(bvb.num_bits(), 1);
        write_gamma(&mut bvb, 1);
        assert_eq!(bvb.num_bits(), 4);

        let mut it = BitCursor::new(bvb.words(), 0);
        assert_eq!(read_gamma(&mut it), 0);
        assert_eq!(read_gamma(&mut it), 1);
    }

    #[test]
    fn test_delta_mixed_values() {
        let values = [0u64, 1, 2, 3, 7, 8, 255, 1 << 20, u32::MAX as u64, 1 << 40];
        let mut bvb = BitVectorBuilder::new();
        let mut expected_bits = 0;
        for &v in &values {
            write_delta(&mut bvb, v);
            expected_bits += delta_len(v) as u64;
        }
        assert_eq!(bvb.num_bits(), expected_bits);

        let mut it = BitCursor::new(bvb.words(), 0);
        for &v in &values {
            assert_eq!(read_delta(&mut it), v);
        }
        assert_eq!(it.position(), expected_bits);
    }

    #[test]
    fn test_code_lengths() {
        assert_eq!(gamma_len(0), 1);
        assert_eq!(gamma_len(1), 3);
        assert_eq!(delta_len(0), 1);
        assert_eq!(delta_len(1), 4);
        // 2^32 needs 32 low bits plus gamma(32) = 11 bits.
        assert_eq!(delta_len(u32::MAX as u64), 43);
    }
}
