//! The color class store: one shared bit stream plus an offset index.

use std::io::{Read, Write};

use bincode::config::{self, Fixint, LittleEndian};
use bincode::de::Decoder;
use bincode::error::DecodeError;
use bincode::{Decode, Encode};
use tracing::{debug, info};

use crate::bits::BitVectorBuilder;
use crate::config::{BuildConfig, Validation};
use crate::cursor::ColorsCursor;
use crate::encoder::{encode_list, validate_list};
use crate::error::{Error, Result};
use crate::offsets::{decode_words, EliasFano};
use crate::policy::Thresholds;
use crate::stats::SpaceBreakdown;
use crate::traits::ColorClassSource;

fn bincode_config() -> config::Configuration<LittleEndian, Fixint> {
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Persisted fields, in storage order.
#[derive(Clone, Debug, PartialEq, Eq, Encode)]
struct HybridColorsInner {
    num_docs: u32,
    sparse_threshold: u32,
    dense_threshold: u32,
    offsets: EliasFano,
    colors: Vec<u64>,
}

impl<Context> Decode<Context> for HybridColorsInner {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let num_docs = u32::decode(decoder)?;
        let sparse_threshold = u32::decode(decoder)?;
        let dense_threshold = u32::decode(decoder)?;
        let offsets = EliasFano::decode(decoder)?;
        // the last offset is the stream length in bits
        let colors = decode_words(decoder, offsets.universe().div_ceil(64), "bit stream")?;
        Ok(Self {
            num_docs,
            sparse_threshold,
            dense_threshold,
            offsets,
            colors,
        })
    }
}

/// Immutable store of color classes.
///
/// Each list is coded sparse, as a bitmap, or as a complement depending on
/// its size, and all codes are concatenated into one bit stream. An
/// Elias-Fano index over the start offsets gives direct access to any list.
///
/// # Example
///
/// ```rust
/// use hybrid_colors::{BuildConfig, HybridColors, InMemorySource};
///
/// let lists = vec![vec![0u32, 1, 9], (0..10).collect()];
/// let source = InMemorySource::new(10, lists);
/// let store = HybridColors::build(source, &BuildConfig::new()).unwrap();
///
/// let members: Vec<u32> = store.colors(0).unwrap().collect();
/// assert_eq!(members, vec![0, 1, 9]);
///
/// let mut it = store.colors(0).unwrap();
/// assert_eq!(it.advance_to(5).unwrap(), 9);
/// ```
#[derive(Clone, Debug)]
pub struct HybridColors {
    data: HybridColorsInner,
    thresholds: Thresholds,
    validation: Validation,
}

impl HybridColors {
    /// Name of this color class representation.
    pub fn type_name() -> &'static str {
        "hybrid"
    }

    /// Encode every list of `source`, in order.
    ///
    /// # Errors
    ///
    /// Under [`Validation::Checked`], a malformed list or a member total that
    /// differs from `source.num_ints()` aborts the build. Failure to reserve
    /// memory for the bit stream aborts it in either mode.
    pub fn build<S>(mut source: S, config: &BuildConfig) -> Result<Self>
    where
        S: ColorClassSource,
    {
        let num_docs = source.num_docs();
        let num_ints = source.num_ints();
        info!(num_docs, num_ints, "building hybrid color classes");

        let mut builder = HybridColorsBuilder::new(num_docs, config)?;
        while source.has_next() {
            builder.push(source.list())?;
            source.advance();
        }

        if config.validation() == Validation::Checked && builder.num_ints() != num_ints {
            return Err(Error::TotalsMismatch {
                expected: num_ints,
                found: builder.num_ints(),
            });
        }
        builder.finish()
    }

    /// Reassemble a store from its persisted fields, validating them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] when the thresholds break
    /// `sparse <= dense <= num_docs`, the offset index is malformed or not
    /// monotone, it does not start at 0, or its last offset disagrees with
    /// the length of `colors`.
    pub fn from_parts(
        num_docs: u32,
        sparse_threshold: u32,
        dense_threshold: u32,
        offsets: EliasFano,
        colors: Vec<u64>,
    ) -> Result<Self> {
        Self::from_inner(HybridColorsInner {
            num_docs,
            sparse_threshold,
            dense_threshold,
            offsets,
            colors,
        })
    }

    fn from_inner(data: HybridColorsInner) -> Result<Self> {
        if data.num_docs == 0 {
            return Err(Error::Corrupt("num_docs is zero".to_string()));
        }
        let thresholds =
            Thresholds::from_parts(data.sparse_threshold, data.dense_threshold, data.num_docs)?;

        data.offsets.validate()?;
        if data.offsets.is_empty() {
            return Err(Error::Corrupt("offset index is empty".to_string()));
        }
        let first = data.offsets.access(0)?;
        if first != 0 {
            return Err(Error::Corrupt(format!("first offset is {}, expected 0", first)));
        }
        let total_bits = data.offsets.universe();
        if data.colors.len() as u64 != total_bits.div_ceil(64) {
            return Err(Error::Corrupt(format!(
                "last offset {} does not match a stream of {} words",
                total_bits,
                data.colors.len()
            )));
        }

        Ok(Self {
            data,
            thresholds,
            validation: Validation::default(),
        })
    }

    /// Set the validation mode used by cursors of this store.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Validation mode used by cursors of this store.
    pub fn validation(&self) -> Validation {
        self.validation
    }

    /// Cursor positioned on the first member of list `color_class_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `color_class_id >= num_color_classes()`.
    #[inline]
    pub fn colors(&self, color_class_id: u64) -> Result<ColorsCursor<'_>> {
        let num_color_classes = self.num_color_classes();
        if color_class_id >= num_color_classes {
            return Err(Error::OutOfRange {
                what: "color_class_id",
                value: color_class_id,
                bound: num_color_classes,
            });
        }
        let begin = self.data.offsets.access(color_class_id as usize)?;
        Ok(ColorsCursor::new(
            &self.data.colors,
            begin,
            self.data.num_docs,
            &self.thresholds,
            self.validation,
        ))
    }

    /// Size of the id universe.
    #[inline]
    pub fn num_docs(&self) -> u32 {
        self.data.num_docs
    }

    /// Number of stored lists.
    #[inline]
    pub fn num_color_classes(&self) -> u64 {
        self.data.offsets.len() as u64 - 1
    }

    /// Space taken by the offset index plus the bit stream, in bits.
    pub fn num_bits(&self) -> u64 {
        self.data.offsets.num_bits() + self.data.colors.len() as u64 * 64
    }

    /// Regime thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Space usage grouped by list size and by regime.
    pub fn space_breakdown(&self, num_buckets: u32) -> Result<SpaceBreakdown> {
        SpaceBreakdown::compute(self, num_buckets)
    }

    pub(crate) fn offsets(&self) -> &EliasFano {
        &self.data.offsets
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.data.colors
    }

    /// Exports the store.
    ///
    /// Fields are written in the order `num_docs`, `sparse_threshold`,
    /// `dense_threshold`, offset index, bit stream.
    ///
    /// # Errors
    ///
    /// When bincode generates an error, it will be returned as is.
    pub fn write<W>(&self, mut wtr: W) -> Result<usize>
    where
        W: Write,
    {
        let num_bytes = bincode::encode_into_std_write(&self.data, &mut wtr, bincode_config())?;
        Ok(num_bytes)
    }

    /// Creates a store from a reader and validates it before use.
    ///
    /// # Errors
    ///
    /// Bincode errors are returned as is; structural problems, including a
    /// length prefix that disagrees with the fields before it, are reported
    /// as [`Error::Corrupt`].
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let data: HybridColorsInner = bincode::decode_from_std_read(&mut rdr, bincode_config())
            .map_err(|e| match e {
                DecodeError::OtherString(msg) => Error::Corrupt(msg),
                e => Error::Decode(e),
            })?;
        let store = Self::from_inner(data)?;
        debug!(
            num_docs = store.num_docs(),
            num_color_classes = store.num_color_classes(),
            num_bits = store.num_bits(),
            "loaded hybrid color classes"
        );
        Ok(store)
    }
}

/// Single-pass, append-only builder for [`HybridColors`].
#[derive(Debug)]
pub struct HybridColorsBuilder {
    num_docs: u32,
    thresholds: Thresholds,
    validation: Validation,
    progress_interval: u64,
    bvb: BitVectorBuilder,
    offsets: Vec<u64>,
    num_ints: u64,
}

impl HybridColorsBuilder {
    /// Start a build over the universe `[0, num_docs)`.
    ///
    /// # Errors
    ///
    /// Rejects `num_docs == 0` and fails if the up-front reservation of
    /// `config.reserve_bits()` bits cannot be satisfied.
    pub fn new(num_docs: u32, config: &BuildConfig) -> Result<Self> {
        if num_docs == 0 {
            return Err(Error::InvalidInput("num_docs must be positive".to_string()));
        }
        let thresholds = Thresholds::new(num_docs);
        info!(
            sparse_threshold = thresholds.sparse(),
            dense_threshold = thresholds.dense(),
            "regime thresholds"
        );

        let mut bvb = BitVectorBuilder::new();
        bvb.try_reserve(config.reserve_bits())?;

        Ok(Self {
            num_docs,
            thresholds,
            validation: config.validation(),
            progress_interval: config.progress_interval(),
            bvb,
            offsets: vec![0],
            num_ints: 0,
        })
    }

    /// Encode the next list and return the number of bits it took.
    ///
    /// # Errors
    ///
    /// Under [`Validation::Checked`] a list that is not strictly increasing,
    /// has an id `>= num_docs`, or is longer than the universe is rejected and
    /// nothing is appended.
    pub fn push(&mut self, list: &[u32]) -> Result<u64> {
        if self.validation == Validation::Checked {
            validate_list(list, self.num_docs)?;
        }
        self.offsets.try_reserve(1)?;
        let bits = encode_list(&mut self.bvb, list, self.num_docs, &self.thresholds)?;
        self.offsets.push(self.bvb.num_bits());
        self.num_ints += list.len() as u64;

        let num_lists = self.num_color_classes();
        if self.progress_interval != 0 && num_lists % self.progress_interval == 0 {
            debug!(num_lists, num_bits = self.bvb.num_bits(), "processed lists");
        }
        Ok(bits)
    }

    /// Lists encoded so far.
    pub fn num_color_classes(&self) -> u64 {
        self.offsets.len() as u64 - 1
    }

    /// Members encoded so far.
    pub fn num_ints(&self) -> u64 {
        self.num_ints
    }

    /// Length of the bit stream so far.
    pub fn num_bits(&self) -> u64 {
        self.bvb.num_bits()
    }

    /// Build the offset index and freeze the store.
    pub fn finish(self) -> Result<HybridColors> {
        let offsets = EliasFano::new(&self.offsets)?;
        let mut colors = self.bvb.into_words();
        colors.shrink_to_fit();
        let thresholds = self.thresholds;

        let store = HybridColors {
            data: HybridColorsInner {
                num_docs: self.num_docs,
                sparse_threshold: thresholds.sparse(),
                dense_threshold: thresholds.dense(),
                offsets,
                colors,
            },
            thresholds,
            validation: self.validation,
        };

        let num_ints = self.num_ints.max(1) as f64;
        let offsets_bits = store.offsets().num_bits();
        let lists_bits = store.words().len() as u64 * 64;
        info!(
            num_lists = store.num_color_classes(),
            num_ints = self.num_ints,
            total_bits = store.num_bits(),
            offsets_bits,
            lists_bits,
            offsets_bits_per_int = offsets_bits as f64 / num_ints,
            lists_bits_per_int = lists_bits as f64 / num_ints,
            "built hybrid color classes"
        );
        Ok(store)
    }
}
