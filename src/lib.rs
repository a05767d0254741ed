//! Compact storage for color classes.
//!
//! `hybrid_colors` stores the color classes of a pangenome index: sorted,
//! duplicate-free sets of reference ids drawn from a universe `[0, num_docs)`.
//! Hundreds of millions of such sets share one bit stream, and any of them can
//! be decoded lazily, in order, with forward seeking.
//!
//! # Coding
//!
//! Each set is coded in one of three ways, chosen from its size alone:
//!
//! - **Sparse** (`size < num_docs / 4`): Elias delta coded gaps.
//! - **Bitmap** (up to `3 * num_docs / 4`): one bit per id of the universe.
//! - **Dense** (otherwise): Elias delta coded gaps of the *complement*.
//!
//! The size is written first, so the decoder re-derives the regime without a
//! stored tag. An Elias-Fano sequence over the start offsets gives direct
//! access to any set.
//!
//! # Example
//!
//! ```rust
//! use hybrid_colors::{BuildConfig, HybridColors, InMemorySource, Regime};
//!
//! let lists = vec![
//!     vec![0u32, 1, 9],     // bitmap
//!     (0..10).collect(),    // dense, empty complement
//!     vec![4],              // sparse
//! ];
//! let store = HybridColors::build(InMemorySource::new(10, lists), &BuildConfig::new()).unwrap();
//!
//! let mut it = store.colors(0).unwrap();
//! assert_eq!(it.regime(), Regime::Bitmap);
//! assert_eq!(it.value(), 0);
//! assert_eq!(it.advance_to(5).unwrap(), 9);
//! it.advance();
//! assert_eq!(it.value(), store.num_docs()); // exhausted
//! ```
//!
//! # References
//!
//! - Elias, P. (1975). "Universal codeword sets and representations of the integers"
//! - Elias, P. (1974). "Efficient storage and retrieval by content and address"
//! - Fano, R. (1971). "On the number of bits required to implement an associative memory"
//! - Fan et al. (2023). "Fulgor: a fast and compact k-mer index for large-scale
//!   matching and color queries"

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod codes;
mod config;
mod cursor;
mod encoder;
mod error;
pub mod offsets;
mod policy;
mod stats;
mod store;
mod traits;

pub use config::{BuildConfig, Validation};
pub use cursor::ColorsCursor;
pub use encoder::{encode_list, validate_list};
pub use error::{Error, Result};
pub use offsets::EliasFano;
pub use policy::{Regime, Thresholds};
pub use stats::{GroupStats, SizeBucket, SpaceBreakdown};
pub use store::{HybridColors, HybridColorsBuilder};
pub use traits::{ColorClassSource, InMemorySource};
