//! Step entry point: validate, parse, save, apply policy.

use crate::input::StepInput;
use crate::orchestrator::{SaveOptions, SaveOrchestrator, SaveOutcome};
use crate::spec::{LineError, SpecParser};
use crate::store::CacheStore;
use crate::Result;
use std::sync::Arc;

/// Result of a step run that did not fail
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Lines rejected by the parser
    pub parse_errors: Vec<LineError>,
    /// Save results
    pub save: SaveOutcome,
}

impl StepOutcome {
    /// True when anything was rejected or failed along the way
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.parse_errors.is_empty() || !self.save.failed.is_empty()
    }
}

/// Run the step with the default spec limits
///
/// # Errors
///
/// Returns an error if the input is invalid, no key-path pair is usable, or
/// every save fails.
pub async fn run_step(input: &StepInput, store: Arc<dyn CacheStore>) -> Result<StepOutcome> {
    run_step_with(input, store, &SpecParser::default()).await
}

/// Run the step with an explicit parser
///
/// The input is validated here even when the caller already checked it.
///
/// # Errors
///
/// Returns an error if the input is invalid, no key-path pair is usable, or
/// every save fails.
#[tracing::instrument(
    name = "run_step",
    skip_all,
    fields(store = store.name(), compression_level = input.compression_level)
)]
pub async fn run_step_with(
    input: &StepInput,
    store: Arc<dyn CacheStore>,
    parser: &SpecParser,
) -> Result<StepOutcome> {
    input.validate()?;

    let parsed = parser.parse(&input.key_path_pairs)?;
    let save = SaveOrchestrator::new(store, SaveOptions::from(input))
        .save_all(&parsed.entries)
        .await
        .into_result()?;

    Ok(StepOutcome {
        parse_errors: parsed.errors,
        save,
    })
}
