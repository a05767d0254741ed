//! Elias-Fano encoding for the monotone sequence of list offsets.
//!
//! # Theory
//!
//! For `n` non-decreasing integers bounded by `u`, each value is split into
//! `L = floor(log2(u / n))` low bits, stored verbatim, and a high part stored
//! in unary: value `i` sets bit `(v_i >> L) + i` of the upper bit vector.
//! Total space is `n * L + n + (u >> L) + 1` bits, i.e. about
//! `n * (2 + log2(u / n))`.
//!
//! Access to the `i`-th value needs the position of the `i`-th one in the
//! upper bits. Every `SAMPLE_RATE`-th position is sampled, so a lookup scans
//! forward from the nearest sample instead of from the start.

use bincode::de::Decoder;
use bincode::error::DecodeError;
use bincode::{Decode, Encode};

use crate::bits::{BitCursor, BitVectorBuilder};
use crate::error::{Error, Result};

/// One upper-bit position is sampled per this many values.
const SAMPLE_RATE: u64 = 256;

/// Scalar fields counted by `num_bits` besides the bit arrays.
const HEADER_WORDS: u64 = 4;

/// Words reserved at a time while decoding a persisted vector.
const DECODE_CHUNK_WORDS: u64 = 1 << 16;

/// Elias-Fano encoded non-decreasing sequence of `u64`.
///
/// Decoding checks every length prefix against the scalar fields before
/// reading the words behind it, and grows vectors in bounded chunks, so a
/// corrupt length cannot trigger a huge allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode)]
pub struct EliasFano {
    len: u64,
    universe: u64,
    low_width: u32,
    upper_len: u64,
    lower: Vec<u64>,
    upper: Vec<u64>,
    samples: Vec<u64>,
}

fn low_width_for(len: u64, universe: u64) -> u32 {
    if len == 0 || universe <= len {
        0
    } else {
        63 - (universe / len).leading_zeros()
    }
}

fn select_in_word(mut word: u64, k: u64) -> u64 {
    for _ in 0..k {
        word &= word - 1;
    }
    word.trailing_zeros() as u64
}

/// Decode a length-prefixed `Vec<u64>` whose length must equal `expected`.
pub(crate) fn decode_words<D: Decoder>(
    decoder: &mut D,
    expected: u64,
    what: &str,
) -> std::result::Result<Vec<u64>, DecodeError> {
    let len = u64::decode(decoder)?;
    if len != expected {
        return Err(DecodeError::OtherString(format!(
            "{} holds {} words, expected {}",
            what, len, expected
        )));
    }
    let mut words = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(DECODE_CHUNK_WORDS);
        words
            .try_reserve(chunk as usize)
            .map_err(|e| DecodeError::OtherString(format!("{}: {}", what, e)))?;
        for _ in 0..chunk {
            words.push(u64::decode(decoder)?);
        }
        remaining -= chunk;
    }
    Ok(words)
}

impl<Context> Decode<Context> for EliasFano {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let corrupt = |msg: String| DecodeError::OtherString(format!("offsets: {}", msg));

        let len = u64::decode(decoder)?;
        let universe = u64::decode(decoder)?;
        let low_width = u32::decode(decoder)?;
        let upper_len = u64::decode(decoder)?;

        if low_width != low_width_for(len, universe) {
            return Err(corrupt(format!("unexpected low width {}", low_width)));
        }
        let expected_upper_len = if len == 0 {
            Some(0)
        } else {
            len.checked_add(universe >> low_width)
                .and_then(|v| v.checked_add(1))
        };
        if expected_upper_len != Some(upper_len) {
            return Err(corrupt(format!("unexpected upper length {}", upper_len)));
        }
        let lower_bits = len
            .checked_mul(low_width as u64)
            .ok_or_else(|| corrupt(format!("length {} overflows lower bits", len)))?;

        let lower = decode_words(decoder, lower_bits.div_ceil(64), "offsets lower bits")?;
        let upper = decode_words(decoder, upper_len.div_ceil(64), "offsets upper bits")?;
        let samples = decode_words(decoder, len.div_ceil(SAMPLE_RATE), "offsets samples")?;

        Ok(Self {
            len,
            universe,
            low_width,
            upper_len,
            lower,
            upper,
            samples,
        })
    }
}

bincode::impl_borrow_decode!(EliasFano);

impl EliasFano {
    /// Encode a non-decreasing sequence.
    pub fn new(values: &[u64]) -> Result<Self> {
        for i in 1..values.len() {
            if values[i] < values[i - 1] {
                return Err(Error::InvalidInput(format!(
                    "values must be non-decreasing, found {} < {} at index {}",
                    values[i],
                    values[i - 1],
                    i
                )));
            }
        }

        let len = values.len() as u64;
        let universe = values.last().copied().unwrap_or(0);
        if len == 0 {
            return Ok(Self::default());
        }

        let low_width = low_width_for(len, universe);
        let low_mask = (1u64 << low_width) - 1;

        let mut lower = BitVectorBuilder::new();
        lower.try_reserve(len * low_width as u64)?;
        for &v in values {
            lower.append_bits(v & low_mask, low_width as usize);
        }

        let upper_len = len + (universe >> low_width) + 1;
        let mut upper = BitVectorBuilder::new();
        upper.append_zeros(upper_len)?;

        let mut samples = Vec::new();
        samples.try_reserve(len.div_ceil(SAMPLE_RATE) as usize)?;
        for (i, &v) in values.iter().enumerate() {
            let pos = (v >> low_width) + i as u64;
            upper.set(pos);
            if i as u64 % SAMPLE_RATE == 0 {
                samples.push(pos);
            }
        }

        Ok(Self {
            len,
            universe,
            low_width,
            upper_len,
            lower: lower.into_words(),
            upper: upper.into_words(),
            samples,
        })
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Return true if the sequence holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest (last) value, or 0 when empty.
    #[inline]
    pub fn universe(&self) -> u64 {
        self.universe
    }

    /// Value at index `i`.
    #[inline]
    pub fn access(&self, i: usize) -> Result<u64> {
        let i = i as u64;
        if i >= self.len {
            return Err(Error::OutOfRange {
                what: "offset index",
                value: i,
                bound: self.len,
            });
        }
        let pos = self.select_upper(i)?;
        let high = pos - i;
        let low = BitCursor::new(&self.lower, i * self.low_width as u64)
            .take(self.low_width as usize);
        Ok((high << self.low_width) | low)
    }

    fn select_upper(&self, i: u64) -> Result<u64> {
        let sampled = self
            .samples
            .get((i / SAMPLE_RATE) as usize)
            .copied()
            .ok_or_else(|| Error::Corrupt(format!("missing select sample for {}", i)))?;
        let mut remaining = i % SAMPLE_RATE;
        let mut block = (sampled / 64) as usize;
        let mut word = self.upper.get(block).copied().unwrap_or(0) & (!0u64 << (sampled % 64));
        loop {
            let ones = word.count_ones() as u64;
            if remaining < ones {
                return Ok(block as u64 * 64 + select_in_word(word, remaining));
            }
            remaining -= ones;
            block += 1;
            word = *self
                .upper
                .get(block)
                .ok_or_else(|| Error::Corrupt(format!("upper bits exhausted selecting {}", i)))?;
        }
    }

    /// Sequential iterator over all values.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            upper: BitCursor::new(&self.upper, 0),
            lower: BitCursor::new(&self.lower, 0),
            low_width: self.low_width,
            index: 0,
            len: self.len,
        }
    }

    /// Space in bits: the scalar header fields, the select samples, and the
    /// exact lengths of the lower and upper bits (word padding excluded).
    ///
    /// The split width minimizes `len * low_width + (universe >> low_width)`,
    /// so this never decreases when values are appended.
    pub fn num_bits(&self) -> u64 {
        64 * (HEADER_WORDS + self.samples.len() as u64)
            + self.len * self.low_width as u64
            + self.upper_len
    }

    /// Check internal consistency of a deserialized sequence.
    ///
    /// Verifies word counts, the population of the upper bits, every select
    /// sample, monotonicity, and that the last value equals `universe`.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(Error::Corrupt(format!("offsets: {}", msg)));

        if self.len == 0 {
            if !self.lower.is_empty() || !self.upper.is_empty() || !self.samples.is_empty() {
                return corrupt("empty sequence carries data".to_string());
            }
            return Ok(());
        }
        if self.low_width != low_width_for(self.len, self.universe) {
            return corrupt(format!("unexpected low width {}", self.low_width));
        }
        let expected_lower = (self.len * self.low_width as u64).div_ceil(64);
        if self.lower.len() as u64 != expected_lower {
            return corrupt(format!(
                "{} lower words, expected {}",
                self.lower.len(),
                expected_lower
            ));
        }
        if self.upper_len != self.len + (self.universe >> self.low_width) + 1
            || self.upper.len() as u64 != self.upper_len.div_ceil(64)
        {
            return corrupt("upper bits length mismatch".to_string());
        }
        let ones: u64 = self.upper.iter().map(|w| w.count_ones() as u64).sum();
        if ones != self.len {
            return corrupt(format!("{} ones in upper bits, expected {}", ones, self.len));
        }
        if self.samples.len() as u64 != self.len.div_ceil(SAMPLE_RATE) {
            return corrupt("select sample count mismatch".to_string());
        }

        let mut upper = BitCursor::new(&self.upper, 0);
        let mut prev = 0u64;
        for (i, value) in self.iter().enumerate() {
            let pos = upper.next_one().unwrap_or(u64::MAX);
            if i as u64 % SAMPLE_RATE == 0 && self.samples[i / SAMPLE_RATE as usize] != pos {
                return corrupt(format!("bad select sample at {}", i));
            }
            if value < prev {
                return corrupt(format!("value {} < {} at index {}", value, prev, i));
            }
            prev = value;
        }
        if prev != self.universe {
            return corrupt(format!(
                "last value {} differs from universe {}",
                prev, self.universe
            ));
        }
        Ok(())
    }
}

/// Sequential decoder returned by [`EliasFano::iter`].
pub struct Iter<'a> {
    upper: BitCursor<'a>,
    lower: BitCursor<'a>,
    low_width: u32,
    index: u64,
    len: u64,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.index == self.len {
            return None;
        }
        let pos = self.upper.next_one()?;
        let high = pos - self.index;
        let low = self.lower.take(self.low_width as usize);
        self.index += 1;
        Some((high << self.low_width) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elias_fano_basic() {
        let values = vec![0, 10, 10, 20, 30, 100, 1000];
        let ef = EliasFano::new(&values).unwrap();

        assert_eq!(ef.len(), 7);
        assert_eq!(ef.universe(), 1000);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.access(i).unwrap(), v);
        }
        assert!(ef.access(7).is_err());
        assert_eq!(ef.iter().collect::<Vec<_>>(), values);
        ef.validate().unwrap();
    }

    #[test]
    fn test_crosses_many_samples() {
        let values: Vec<u64> = (0..2000u64).map(|i| i * i / 3 + (i % 7) * 1000).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        let ef = EliasFano::new(&sorted).unwrap();
        for (i, &v) in sorted.iter().enumerate() {
            assert_eq!(ef.access(i).unwrap(), v);
        }
        ef.validate().unwrap();
    }

    #[test]
    fn test_single_zero() {
        let ef = EliasFano::new(&[0]).unwrap();
        assert_eq!(ef.access(0).unwrap(), 0);
        ef.validate().unwrap();
    }

    #[test]
    fn test_rejects_decreasing() {
        assert!(EliasFano::new(&[5, 3]).is_err());
    }

    #[test]
    fn test_validate_detects_tampering() {
        let mut ef = EliasFano::new(&[0, 64, 128, 4096]).unwrap();
        ef.universe = 4000;
        assert!(ef.validate().is_err());

        let mut ef = EliasFano::new(&[0, 64, 128, 4096]).unwrap();
        ef.upper[0] |= 1 << 63;
        assert!(ef.validate().is_err());
    }

    #[test]
    fn test_space_is_compact() {
        let values: Vec<u64> = (0..10_000u64).map(|i| i * 300).collect();
        let ef = EliasFano::new(&values).unwrap();
        // plain array: 64 bits per value
        assert!(ef.num_bits() < 16 * values.len() as u64);
    }

    fn config() -> bincode::config::Configuration<
        bincode::config::LittleEndian,
        bincode::config::Fixint,
    > {
        bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
    }

    #[test]
    fn test_decode_round_trip() {
        let values: Vec<u64> = (0..600u64).map(|i| i * 37).collect();
        let ef = EliasFano::new(&values).unwrap();
        let bytes = bincode::encode_to_vec(&ef, config()).unwrap();
        let (decoded, read): (EliasFano, usize) =
            bincode::decode_from_slice(&bytes, config()).unwrap();
        assert_eq!(read, bytes.len());
        assert_eq!(decoded, ef);
    }

    #[test]
    fn test_decode_rejects_oversized_lengths() {
        let ef = EliasFano::new(&[0, 64, 128, 4096]).unwrap();
        let bytes = bincode::encode_to_vec(&ef, config()).unwrap();
        for start in 0..=bytes.len() - 8 {
            let mut corrupted = bytes.clone();
            corrupted[start..start + 8].copy_from_slice(&(1u64 << 58).to_le_bytes());
            let result: std::result::Result<(EliasFano, usize), _> =
                bincode::decode_from_slice(&corrupted, config());
            if let Ok((decoded, _)) = result {
                // the window hit payload bits, not a length
                assert_eq!(decoded.len(), 4);
            }
        }
    }
}
