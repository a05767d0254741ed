//! List encoder: appends one color class to the shared bit stream.
//!
//! # Layout
//!
//! Every list starts with its size as an Elias delta code, followed by:
//!
//! - **Sparse** (`size < sparse`): the first member, then `x - (prev + 1)` for
//!   each later member, all Elias delta coded. Nothing follows an empty list.
//! - **Bitmap** (`sparse <= size < dense`): exactly `num_docs` bits, bit `x`
//!   set iff `x` is a member.
//! - **Dense** (`size >= dense`): the `num_docs - size` ids *absent* from the
//!   list, gap coded exactly like the sparse case. The complement size is
//!   never written; the decoder derives it from `size`.

use crate::bits::BitVectorBuilder;
use crate::codes::write_delta;
use crate::error::{Error, Result};
use crate::policy::{Regime, Thresholds};

/// Upper bound on the delta code length of any value below 2^32.
const MAX_CODE_BITS: u64 = 64;

/// Check that `list` is strictly increasing, in `[0, num_docs)`, and no
/// longer than the universe.
pub fn validate_list(list: &[u32], num_docs: u32) -> Result<()> {
    if list.len() as u64 > num_docs as u64 {
        return Err(Error::InvalidInput(format!(
            "list has {} members but the universe has only {} ids",
            list.len(),
            num_docs
        )));
    }

    for i in 1..list.len() {
        if list[i] <= list[i - 1] {
            return Err(Error::InvalidInput(format!(
                "IDs must be sorted and unique, found {} <= {}",
                list[i],
                list[i - 1]
            )));
        }
    }

    if let Some(&max_id) = list.last() {
        if max_id >= num_docs {
            return Err(Error::InvalidInput(format!(
                "ID {} exceeds universe size {}",
                max_id, num_docs
            )));
        }
    }

    Ok(())
}

/// Upper bound on the bits `encode_list` appends for a list of `size` members.
pub fn max_encoded_bits(size: u32, num_docs: u32, thresholds: &Thresholds) -> u64 {
    let coded = match thresholds.classify(size) {
        Regime::Sparse => size as u64 * MAX_CODE_BITS,
        Regime::Bitmap => num_docs as u64,
        Regime::Dense => num_docs.saturating_sub(size) as u64 * MAX_CODE_BITS,
    };
    MAX_CODE_BITS + coded
}

/// Append the encoding of `list` and return the number of bits written.
///
/// `list` must satisfy [`validate_list`]; this function does not re-check it.
pub fn encode_list(
    bvb: &mut BitVectorBuilder,
    list: &[u32],
    num_docs: u32,
    thresholds: &Thresholds,
) -> Result<u64> {
    let size = list.len() as u32;
    let start = bvb.num_bits();
    bvb.try_reserve(max_encoded_bits(size, num_docs, thresholds))?;

    write_delta(bvb, size as u64);

    match thresholds.classify(size) {
        Regime::Sparse => {
            encode_gaps(bvb, list.iter().copied());
        }
        Regime::Bitmap => {
            let bitmap_start = bvb.num_bits();
            bvb.append_zeros(num_docs as u64)?;
            for &x in list {
                bvb.set(bitmap_start + x as u64);
            }
        }
        Regime::Dense => {
            let mut members = list.iter().copied().peekable();
            let complement = (0..num_docs).filter(move |&x| {
                if members.peek() == Some(&x) {
                    members.next();
                    false
                } else {
                    true
                }
            });
            let written = encode_gaps(bvb, complement);
            debug_assert_eq!(written, num_docs.saturating_sub(size) as u64);
        }
    }

    Ok(bvb.num_bits() - start)
}

/// Absolute first value, then `x - (prev + 1)` gaps. Returns the count written.
fn encode_gaps<I>(bvb: &mut BitVectorBuilder, values: I) -> u64
where
    I: Iterator<Item = u32>,
{
    let mut prev: Option<u32> = None;
    let mut written = 0;
    for x in values {
        let code = match prev {
            None => x as u64,
            Some(p) => {
                debug_assert!(x > p);
                (x - (p + 1)) as u64
            }
        };
        write_delta(bvb, code);
        prev = Some(x);
        written += 1;
    }
    written
}
