//! Bit-level primitives: an append-only builder and a read cursor.
//!
//! Bits are packed LSB-first into 64-bit words: bit `i` of the stream is
//! bit `i % 64` of word `i / 64`. Both the encoded color classes and the
//! Elias-Fano offset index are stored this way.

use crate::error::Result;

/// Append-only growable bit buffer.
#[derive(Debug, Default, Clone)]
pub struct BitVectorBuilder {
    words: Vec<u64>,
    num_bits: u64,
}

impl BitVectorBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for at least `num_bits` more bits.
    ///
    /// Fails instead of aborting when the allocator refuses the request.
    pub fn try_reserve(&mut self, num_bits: u64) -> Result<()> {
        let needed_words = self.num_bits.saturating_add(num_bits).div_ceil(64) as usize;
        let additional = needed_words.saturating_sub(self.words.len());
        self.words.try_reserve(additional)?;
        Ok(())
    }

    /// Number of bits written so far.
    #[inline]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Append the `len` low bits of `bits`, least significant first.
    ///
    /// `len` must be at most 64 and `bits` must not have bits set at or above `len`.
    #[inline]
    pub fn append_bits(&mut self, bits: u64, len: usize) {
        debug_assert!(len <= 64);
        debug_assert!(len == 64 || bits >> len == 0);
        if len == 0 {
            return;
        }
        let pos_in_word = (self.num_bits % 64) as usize;
        self.num_bits += len as u64;
        if pos_in_word == 0 {
            self.words.push(bits);
        } else {
            if let Some(last) = self.words.last_mut() {
                *last |= bits << pos_in_word;
            }
            if len > 64 - pos_in_word {
                self.words.push(bits >> (64 - pos_in_word));
            }
        }
    }

    /// Append `len` zero bits.
    pub fn append_zeros(&mut self, len: u64) -> Result<()> {
        self.try_reserve(len)?;
        self.num_bits += len;
        self.words.resize(self.num_bits.div_ceil(64) as usize, 0);
        Ok(())
    }

    /// Set the bit at absolute position `pos`, which must already be written.
    #[inline]
    pub fn set(&mut self, pos: u64) {
        debug_assert!(pos < self.num_bits);
        self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }

    /// Borrow the packed words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Consume the builder and return the packed words.
    pub fn into_words(self) -> Vec<u64> {
        self.words
    }
}

/// Random-access read cursor over packed words.
///
/// Reads past the end of the words observe zeros; `skip_zeros` and
/// `next_one` stop at the end instead of looping.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    words: &'a [u64],
    pos: u64,
}

impl<'a> BitCursor<'a> {
    /// Create a cursor at bit position `pos`.
    #[inline]
    pub fn new(words: &'a [u64], pos: u64) -> Self {
        Self { words, pos }
    }

    /// Jump to bit position `pos`.
    #[inline]
    pub fn at(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Current bit position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    fn word(&self, idx: usize) -> u64 {
        self.words.get(idx).copied().unwrap_or(0)
    }

    fn end(&self) -> u64 {
        self.words.len() as u64 * 64
    }

    /// Read `len` bits (at most 64) and advance past them.
    #[inline]
    pub fn take(&mut self, len: usize) -> u64 {
        debug_assert!(len <= 64);
        if len == 0 {
            return 0;
        }
        let block = (self.pos / 64) as usize;
        let shift = (self.pos % 64) as usize;
        let mut value = self.word(block) >> shift;
        if shift + len > 64 {
            value |= self.word(block + 1) << (64 - shift);
        }
        self.pos += len as u64;
        if len == 64 {
            value
        } else {
            value & ((1u64 << len) - 1)
        }
    }

    /// Count zero bits up to the next one bit, consuming that one bit too.
    ///
    /// When no one bit remains the cursor stops at the end of the words.
    #[inline]
    pub fn skip_zeros(&mut self) -> usize {
        let start = self.pos;
        match self.find_one(self.pos) {
            Some(one) => {
                self.pos = one + 1;
                (one - start) as usize
            }
            None => {
                let end = self.end().max(start);
                self.pos = end;
                (end - start) as usize
            }
        }
    }

    /// Position of the next one bit at or after the cursor, consuming it.
    #[inline]
    pub fn next_one(&mut self) -> Option<u64> {
        let one = self.find_one(self.pos)?;
        self.pos = one + 1;
        Some(one)
    }

    fn find_one(&self, from: u64) -> Option<u64> {
        let mut block = (from / 64) as usize;
        if block >= self.words.len() {
            return None;
        }
        let mut word = self.words[block] & (!0u64 << (from % 64));
        loop {
            if word != 0 {
                return Some(block as u64 * 64 + word.trailing_zeros() as u64);
            }
            block += 1;
            if block >= self.words.len() {
                return None;
            }
            word = self.words[block];
        }
    }
}
