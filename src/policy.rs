//! Encoding policy: which physical representation a list gets.
//!
//! The regime is never stored. The decoder re-derives it from the size field
//! that heads every encoded list, so [`Thresholds::classify`] must be the only
//! place sizes are compared against the thresholds, at encode and decode time.

use crate::error::{Error, Result};

/// Physical representation of one color class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Delta-coded gaps between members.
    Sparse,
    /// Fixed-width bitmap of `num_docs` bits.
    Bitmap,
    /// Delta-coded gaps between members of the complement.
    Dense,
}

/// Size thresholds partitioning lists into the three regimes.
///
/// Invariant: `sparse <= dense <= num_docs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    sparse: u32,
    dense: u32,
}

impl Thresholds {
    /// Thresholds for a universe of `num_docs` ids:
    /// `floor(0.25 * num_docs)` and `floor(0.75 * num_docs)`.
    pub fn new(num_docs: u32) -> Self {
        let n = num_docs as u64;
        Self {
            sparse: (n / 4) as u32,
            dense: (3 * n / 4) as u32,
        }
    }

    /// Thresholds read back from storage, checked against the invariant.
    pub fn from_parts(sparse: u32, dense: u32, num_docs: u32) -> Result<Self> {
        if sparse > dense || dense > num_docs {
            return Err(Error::Corrupt(format!(
                "thresholds must satisfy sparse <= dense <= num_docs, got {} / {} / {}",
                sparse, dense, num_docs
            )));
        }
        Ok(Self { sparse, dense })
    }

    /// Lists shorter than this are coded sparse.
    #[inline]
    pub fn sparse(&self) -> u32 {
        self.sparse
    }

    /// Lists at least this long are coded dense.
    #[inline]
    pub fn dense(&self) -> u32 {
        self.dense
    }

    /// Regime of a list with `size` members. Boundary sizes go to the denser regime.
    #[inline]
    pub fn classify(&self, size: u32) -> Regime {
        if size < self.sparse {
            Regime::Sparse
        } else if size < self.dense {
            Regime::Bitmap
        } else {
            Regime::Dense
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_ten_docs() {
        let t = Thresholds::new(10);
        assert_eq!(t.sparse(), 2);
        assert_eq!(t.dense(), 7);

        assert_eq!(t.classify(0), Regime::Sparse);
        assert_eq!(t.classify(1), Regime::Sparse);
        assert_eq!(t.classify(2), Regime::Bitmap);
        assert_eq!(t.classify(6), Regime::Bitmap);
        assert_eq!(t.classify(7), Regime::Dense);
        assert_eq!(t.classify(10), Regime::Dense);
    }

    #[test]
    fn test_tiny_universe_is_all_dense() {
        let t = Thresholds::new(1);
        assert_eq!(t.sparse(), 0);
        assert_eq!(t.dense(), 0);
        assert_eq!(t.classify(0), Regime::Dense);
        assert_eq!(t.classify(1), Regime::Dense);
    }

    #[test]
    fn test_large_universe_no_overflow() {
        let t = Thresholds::new(u32::MAX);
        assert_eq!(t.sparse(), u32::MAX / 4);
        assert_eq!(t.dense(), (3 * u32::MAX as u64 / 4) as u32);
    }

    #[test]
    fn test_from_parts_rejects_broken_invariant() {
        assert!(Thresholds::from_parts(2, 7, 10).is_ok());
        assert!(Thresholds::from_parts(8, 7, 10).is_err());
        assert!(Thresholds::from_parts(2, 11, 10).is_err());
    }
}
