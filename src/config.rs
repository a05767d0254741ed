//! Build and query configuration.

/// How much the store trusts its callers.
///
/// The default is [`Validation::Checked`], or [`Validation::Trusted`] when
/// the crate is compiled with the `unchecked` feature. Load-time validation
/// of a deserialized store runs in both modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    /// Reject bad lists, mismatched totals and out-of-range seek bounds.
    Checked,
    /// Skip per-list checks and clamp seek bounds to `num_docs`.
    ///
    /// Malformed input then yields an unspecified (but memory-safe) store.
    Trusted,
}

impl Default for Validation {
    fn default() -> Self {
        if cfg!(feature = "unchecked") {
            Self::Trusted
        } else {
            Self::Checked
        }
    }
}

/// Options for building a [`HybridColors`](crate::HybridColors) store.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    validation: Validation,
    reserve_bits: u64,
    progress_interval: u64,
}

impl BuildConfig {
    /// Default options: 8 MiB of bits reserved up front, progress logged
    /// every 500 000 lists.
    pub fn new() -> Self {
        Self {
            validation: Validation::default(),
            reserve_bits: 1 << 26,
            progress_interval: 500_000,
        }
    }

    /// Set the validation mode.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Bits to reserve in the output stream before encoding starts.
    pub fn with_reserve_bits(mut self, reserve_bits: u64) -> Self {
        self.reserve_bits = reserve_bits;
        self
    }

    /// Log progress every `progress_interval` lists (0 disables it).
    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    /// Validation mode.
    pub fn validation(&self) -> Validation {
        self.validation
    }

    /// Bits reserved up front.
    pub fn reserve_bits(&self) -> u64 {
        self.reserve_bits
    }

    /// Lists between progress log lines.
    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = BuildConfig::new()
            .with_validation(Validation::Trusted)
            .with_reserve_bits(0)
            .with_progress_interval(10);
        assert_eq!(config.validation(), Validation::Trusted);
        assert_eq!(config.reserve_bits(), 0);
        assert_eq!(config.progress_interval(), 10);
    }

    #[test]
    fn test_default_follows_feature() {
        let expected = if cfg!(feature = "unchecked") {
            Validation::Trusted
        } else {
            Validation::Checked
        };
        assert_eq!(BuildConfig::default().validation(), expected);
    }
}
