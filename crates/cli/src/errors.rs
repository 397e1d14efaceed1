//! CLI error type and rendering

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::cli::EXIT_FAILURE;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a CLI run
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The step itself failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Step(#[from] multisave_core::Error),

    /// The step ran but its report could not be written
    #[error("Failed to write run report to {}", path.display())]
    #[diagnostic(
        code(multisave::cli::report),
        help("Check that the report location is writable")
    )]
    Report {
        /// Requested report path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: multisave_core::Error,
    },
}

/// Exit code for an error
#[must_use]
pub const fn exit_code_for(_err: &CliError) -> i32 {
    EXIT_FAILURE
}

/// Render an error with miette's report handler on stderr
pub fn render_error(err: CliError) {
    let report = miette::Report::new(err);
    #[allow(clippy::print_stderr)]
    {
        eprintln!("{report:?}");
    }
}
