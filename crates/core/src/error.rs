//! Error types for the multisave core

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::orchestrator::SaveFailure;
use crate::spec::LineError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Step-level error.
///
/// Line and entry failures are collected and logged in aggregate; only the
/// conditions below fail the step.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Step input could not be bound or is out of range
    #[error("Configuration error: {message}")]
    #[diagnostic(code(multisave::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Every processed line of the key-path spec was rejected
    #[error("no key-path pairs found in input")]
    #[diagnostic(
        code(multisave::spec::no_entries),
        help("Lines should follow the `KEY = PATH1, PATH2, ...` format")
    )]
    NoValidEntries {
        /// Per-line errors, in line order
        errors: Vec<LineError>,
    },

    /// Every attempted save failed
    #[error("save failed")]
    #[diagnostic(
        code(multisave::save::all_failed),
        help("Run with --verbose for per-entry details")
    )]
    AllSavesFailed {
        /// One failure per attempted entry, in completion order
        failures: Vec<SaveFailure>,
    },

    /// The run report could not be written
    #[error("report I/O failed for {}: {source}", path.display())]
    #[diagnostic(code(multisave::report::io))]
    ReportIo {
        /// Report file path
        path: PathBuf,
        /// Underlying I/O or encoding failure
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }
}

/// Result type for multisave operations
pub type Result<T> = std::result::Result<T, Error>;
