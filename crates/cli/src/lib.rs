//! multisave command line interface
//!
//! Binds step inputs from flags and environment variables, saves every
//! configured cache key to the local store, and maps the result to an exit
//! code.

pub mod cli;
pub mod errors;
pub mod run;
pub mod tracing;

pub use cli::{Cli, EXIT_FAILURE, EXIT_OK};
pub use errors::{CliError, exit_code_for, render_error};
pub use run::run;
