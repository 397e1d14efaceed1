//! Multi-key cache saving for CI steps
//!
//! This crate is the core of the `multisave` step:
//! - Parsing the `KEY = PATH1, PATH2, ...` spec into bounded cache entries
//! - Saving every entry concurrently through a pluggable [`CacheStore`]
//! - Folding per-entry failures into a single step outcome
//!
//! # Failure policy
//!
//! Bad spec lines and failed saves are collected and logged. The step only
//! fails when no line yields an entry, or when every attempted save fails.

pub mod input;
pub mod orchestrator;
pub mod report;
pub mod spec;
pub mod step;
pub mod store;

mod error;

pub use error::{Error, Result};
pub use input::StepInput;
pub use orchestrator::{SaveFailure, SaveOptions, SaveOrchestrator, SaveOutcome, SavedEntry};
pub use report::{RunReport, RunStatus, write_report};
pub use spec::{
    CacheEntrySpec, EntrySet, LineError, LineErrorKind, ParseOutcome, SpecLimits, SpecParser,
    parse_spec,
};
pub use step::{StepOutcome, run_step, run_step_with};
pub use store::{CacheStore, STEP_ID, SaveRequest, SaveStatus, StoreError, StoreResult};

/// multisave version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
