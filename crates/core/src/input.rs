//! Step input shape
//!
//! Binding flags and environment variables into a [`StepInput`] is the CLI's
//! job; this module only defines the shape and validates it.

use crate::{Error, Result};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Accepted zstd compression levels
pub const COMPRESSION_LEVELS: RangeInclusive<i32> = 1..=19;

/// Compression level used when none is configured
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Typed step input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInput {
    /// Enable debug logging and per-file store output
    pub verbose: bool,
    /// Raw multi-line `KEY = PATH1, PATH2` spec text
    pub key_path_pairs: String,
    /// zstd level, 1..=19
    pub compression_level: i32,
    /// Whitespace-separated archiver arguments
    pub custom_tar_args: String,
}

impl StepInput {
    /// Create an input with default options for the given spec text
    #[must_use]
    pub fn new(key_path_pairs: impl Into<String>) -> Self {
        Self {
            verbose: false,
            key_path_pairs: key_path_pairs.into(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            custom_tar_args: String::new(),
        }
    }

    /// Set the compression level
    #[must_use]
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Set custom archiver arguments
    #[must_use]
    pub fn with_custom_tar_args(mut self, args: impl Into<String>) -> Self {
        self.custom_tar_args = args.into();
        self
    }

    /// Enable verbose output
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check required fields and ranges
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a blank spec or an out-of-range
    /// compression level.
    pub fn validate(&self) -> Result<()> {
        if self.key_path_pairs.trim().is_empty() {
            return Err(Error::configuration("key_path_pairs is required"));
        }
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(Error::configuration(format!(
                "compression_level must be between {} and {}, got {}",
                COMPRESSION_LEVELS.start(),
                COMPRESSION_LEVELS.end(),
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Custom archiver arguments split on whitespace
    #[must_use]
    pub fn tar_args(&self) -> Vec<String> {
        self.custom_tar_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let input = StepInput::new("a = b");
        assert!(!input.verbose);
        assert_eq!(input.compression_level, DEFAULT_COMPRESSION_LEVEL);
        assert!(input.tar_args().is_empty());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_compression_level_bounds() {
        assert!(StepInput::new("a = b").with_compression_level(1).validate().is_ok());
        assert!(StepInput::new("a = b").with_compression_level(19).validate().is_ok());

        for level in [0, 20, -3] {
            let err = StepInput::new("a = b")
                .with_compression_level(level)
                .validate()
                .unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }));
            assert!(err.to_string().contains(&level.to_string()));
        }
    }

    #[test]
    fn test_blank_spec_is_rejected() {
        let err = StepInput::new("  \n ").validate().unwrap_err();
        assert!(err.to_string().contains("key_path_pairs"));
    }

    #[test]
    fn test_tar_args_tokenized_on_whitespace() {
        let input = StepInput::new("a = b").with_custom_tar_args("  --exclude=*.log \t -h\n--foo ");
        assert_eq!(input.tar_args(), vec!["--exclude=*.log", "-h", "--foo"]);
    }
}
