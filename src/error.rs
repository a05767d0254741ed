//! Error types for color class storage.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::policy::Regime;

/// Error variants for building, querying and loading a color class store.
#[derive(Debug, Error)]
pub enum Error {
    /// A list handed to the encoder breaks the input contract
    /// (not strictly increasing, out of range, or longer than the universe).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The producer's reported totals disagree with what was actually encoded.
    #[error("totals mismatch: source reported {expected} integers, found {found}")]
    TotalsMismatch {
        /// Total reported by the source.
        expected: u64,
        /// Total counted while encoding.
        found: u64,
    },

    /// An index or seek bound lies outside its legal range.
    #[error("{what} {value} out of range (bound {bound})")]
    OutOfRange {
        /// Name of the offending argument.
        what: &'static str,
        /// Value that was passed.
        value: u64,
        /// Exclusive (ids) or inclusive (seek bounds) limit.
        bound: u64,
    },

    /// An operation only valid for one regime was called on another.
    #[error("operation requires a {expected:?} list, cursor holds a {found:?} list")]
    WrongRegime {
        /// Regime the operation needs.
        expected: Regime,
        /// Regime of the cursor.
        found: Regime,
    },

    /// Growing the bit buffer failed.
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// A loaded store failed structural validation.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Deserialization failed.
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// An I/O error occurred during serialization or deserialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for caller-contract violations: bad input lists,
    /// mismatched totals, out-of-range ids or bounds, wrong-regime calls.
    ///
    /// These are programming errors, as opposed to resource exhaustion,
    /// corrupt data on load, or I/O failures.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::TotalsMismatch { .. }
                | Self::OutOfRange { .. }
                | Self::WrongRegime { .. }
        )
    }
}

/// A specialized Result type for color class operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_split() {
        let oob = Error::OutOfRange {
            what: "color_class_id",
            value: 5,
            bound: 3,
        };
        assert!(oob.is_contract_violation());
        assert!(Error::InvalidInput("x".to_string()).is_contract_violation());
        assert!(!Error::Corrupt("x".to_string()).is_contract_violation());
    }

    #[test]
    fn test_display() {
        let err = Error::TotalsMismatch {
            expected: 10,
            found: 9,
        };
        assert_eq!(
            err.to_string(),
            "totals mismatch: source reported 10 integers, found 9"
        );
    }
}
