//! Space accounting for a built store.

use std::fmt;

use crate::bits::BitCursor;
use crate::codes::read_delta;
use crate::error::{Error, Result};
use crate::policy::Regime;
use crate::store::HybridColors;

/// Lists, members and bits falling into one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// Number of lists.
    pub num_lists: u64,
    /// Number of members across those lists.
    pub num_ints: u64,
    /// Encoded bits of those lists, size fields included.
    pub num_bits: u64,
}

impl GroupStats {
    fn add(&mut self, size: u64, bits: u64) {
        self.num_lists += 1;
        self.num_ints += size;
        self.num_bits += bits;
    }

    /// Average bits per member, 0 for an empty group.
    pub fn bits_per_int(&self) -> f64 {
        if self.num_ints == 0 {
            0.0
        } else {
            self.num_bits as f64 / self.num_ints as f64
        }
    }
}

/// Lists whose size lies in `(min_size, max_size]`. The first bucket also
/// holds empty lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBucket {
    /// Exclusive lower size bound.
    pub min_size: u32,
    /// Inclusive upper size bound.
    pub max_size: u32,
    /// Totals for the bucket.
    pub stats: GroupStats,
}

/// Breakdown of a store's space by list size and by regime.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceBreakdown {
    /// Size buckets of width `num_docs / num_buckets`; the last reaches `num_docs`.
    pub buckets: Vec<SizeBucket>,
    /// Lists coded as gaps.
    pub sparse: GroupStats,
    /// Lists coded as bitmaps.
    pub bitmap: GroupStats,
    /// Lists coded as complement gaps.
    pub dense: GroupStats,
    /// Bits in the offset index.
    pub offsets_bits: u64,
    /// Total bits of the store, as reported by `num_bits`.
    pub total_bits: u64,
}

impl SpaceBreakdown {
    pub(crate) fn compute(store: &HybridColors, num_buckets: u32) -> Result<Self> {
        if num_buckets == 0 {
            return Err(Error::InvalidInput("num_buckets must be positive".to_string()));
        }
        let num_docs = store.num_docs();
        let bucket_size = (num_docs / num_buckets).max(1);
        let num_buckets = num_buckets.min(num_docs.div_ceil(bucket_size)).max(1);

        let mut buckets: Vec<SizeBucket> = (0..num_buckets)
            .map(|i| SizeBucket {
                min_size: i * bucket_size,
                max_size: if i + 1 == num_buckets {
                    num_docs
                } else {
                    (i + 1) * bucket_size
                },
                stats: GroupStats::default(),
            })
            .collect();
        let mut sparse = GroupStats::default();
        let mut bitmap = GroupStats::default();
        let mut dense = GroupStats::default();

        let thresholds = store.thresholds();
        let mut offsets = store.offsets().iter();
        let mut begin = offsets.next().unwrap_or(0);
        for end in offsets {
            let mut it = BitCursor::new(store.words(), begin);
            let size = read_delta(&mut it).min(num_docs as u64) as u32;
            let bits = end - begin;

            let idx = if size == 0 {
                0
            } else {
                ((size - 1) / bucket_size).min(num_buckets - 1)
            };
            buckets[idx as usize].stats.add(size as u64, bits);
            match thresholds.classify(size) {
                Regime::Sparse => sparse.add(size as u64, bits),
                Regime::Bitmap => bitmap.add(size as u64, bits),
                Regime::Dense => dense.add(size as u64, bits),
            }
            begin = end;
        }

        Ok(Self {
            buckets,
            sparse,
            bitmap,
            dense,
            offsets_bits: store.offsets().num_bits(),
            total_bits: store.num_bits(),
        })
    }

    /// Totals over all lists.
    pub fn total(&self) -> GroupStats {
        let mut total = GroupStats::default();
        for g in [&self.sparse, &self.bitmap, &self.dense] {
            total.num_lists += g.num_lists;
            total.num_ints += g.num_ints;
            total.num_bits += g.num_bits;
        }
        total
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for SpaceBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let total = self.total();
        writeln!(f, "CCs SPACE BREAKDOWN:")?;
        for b in self.buckets.iter().filter(|b| b.stats.num_lists > 0) {
            writeln!(
                f,
                "num. lists of size > {} and <= {}: {} ({:.2}%) -- integers: {} ({:.2}%) -- bits/int: {:.3} -- {:.2}% of total space",
                b.min_size,
                b.max_size,
                b.stats.num_lists,
                percent(b.stats.num_lists, total.num_lists),
                b.stats.num_ints,
                percent(b.stats.num_ints, total.num_ints),
                b.stats.bits_per_int(),
                percent(b.stats.num_bits, self.total_bits),
            )?;
        }
        for (name, g) in [
            ("sparse", &self.sparse),
            ("bitmap", &self.bitmap),
            ("dense", &self.dense),
        ] {
            writeln!(
                f,
                "  {}: {} lists, {} integers, {:.3} bits/int",
                name,
                g.num_lists,
                g.num_ints,
                g.bits_per_int()
            )?;
        }
        writeln!(f, "  colors: {:.3} bits/int", total.bits_per_int())?;
        let offsets_per_int = if total.num_ints == 0 {
            0.0
        } else {
            self.offsets_bits as f64 / total.num_ints as f64
        };
        write!(f, "  offsets: {:.3} bits/int", offsets_per_int)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::BuildConfig;
    use crate::store::HybridColors;
    use crate::traits::InMemorySource;

    fn store() -> HybridColors {
        let lists = vec![
            vec![],
            vec![3],
            vec![0, 1, 9],
            vec![0, 1, 2, 3, 4, 5, 6, 7],
            (0..10).collect(),
        ];
        HybridColors::build(InMemorySource::new(10, lists), &BuildConfig::new()).unwrap()
    }

    #[test]
    fn test_regime_counts() {
        let breakdown = store().space_breakdown(5).unwrap();
        assert_eq!(breakdown.sparse.num_lists, 2);
        assert_eq!(breakdown.bitmap.num_lists, 1);
        assert_eq!(breakdown.dense.num_lists, 2);
        assert_eq!(breakdown.total().num_ints, 22);
    }

    #[test]
    fn test_buckets_cover_all_lists() {
        let s = store();
        let breakdown = s.space_breakdown(5).unwrap();
        assert_eq!(breakdown.buckets.len(), 5);
        assert_eq!(breakdown.buckets[4].max_size, 10);

        let lists: u64 = breakdown.buckets.iter().map(|b| b.stats.num_lists).sum();
        let bits: u64 = breakdown.buckets.iter().map(|b| b.stats.num_bits).sum();
        assert_eq!(lists, 5);
        assert_eq!(bits, s.offsets().universe());
        // sizes 0 and 1 -> bucket 0; 3 -> 1; 8 -> 3; 10 -> 4
        assert_eq!(breakdown.buckets[0].stats.num_lists, 2);
        assert_eq!(breakdown.buckets[1].stats.num_lists, 1);
        assert_eq!(breakdown.buckets[3].stats.num_lists, 1);
        assert_eq!(breakdown.buckets[4].stats.num_lists, 1);
    }

    #[test]
    fn test_display_mentions_buckets() {
        let text = store().space_breakdown(5).unwrap().to_string();
        assert!(text.starts_with("CCs SPACE BREAKDOWN:"));
        assert!(text.contains("num. lists of size > 8 and <= 10: 1"));
    }

    #[test]
    fn test_zero_buckets_rejected() {
        assert!(store().space_breakdown(0).is_err());
    }
}
