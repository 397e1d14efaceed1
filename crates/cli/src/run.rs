//! One CLI invocation: bind, save, report

use crate::cli::Cli;
use crate::errors::CliError;
use chrono::Utc;
use multisave_core::{Error, RunReport, StepInput, StepOutcome, run_step, write_report};
use multisave_store::LocalCacheStore;
use std::sync::Arc;

/// Run the step described by `cli`.
///
/// The report, when requested, is written for failed runs too.
///
/// # Errors
///
/// Returns the step failure, or a report write failure after a successful step.
#[tracing::instrument(
    name = "multisave",
    skip_all,
    fields(correlation_id = %crate::tracing::correlation_id())
)]
pub async fn run(cli: &Cli) -> Result<StepOutcome, CliError> {
    let started_at = Utc::now();
    let input = cli.to_input();
    log_input(cli, &input);

    let result = execute(cli, &input).await;
    log_summary(&result);

    if let Some(path) = &cli.report {
        let report = RunReport::from_result(&result, started_at);
        if let Err(source) = write_report(&report, path) {
            // The step failure is the more useful error to surface
            if let Err(step_err) = result {
                tracing::error!(path = %path.display(), "Failed to write run report: {source}");
                return Err(step_err.into());
            }
            return Err(CliError::Report {
                path: path.clone(),
                source,
            });
        }
        tracing::debug!(path = %path.display(), "Run report written");
    }

    Ok(result?)
}

async fn execute(cli: &Cli, input: &StepInput) -> multisave_core::Result<StepOutcome> {
    // Before the store creates its root; run_step validates again
    input.validate()?;

    let base_dir = std::env::current_dir()
        .map_err(|e| Error::configuration(format!("Cannot read working directory: {e}")))?;
    let store = LocalCacheStore::from_env(base_dir, cli.cache_dir.clone())
        .map_err(|e| Error::configuration(e.to_string()))?;
    tracing::debug!(root = %store.root().display(), "Using local cache store");

    run_step(input, Arc::new(store)).await
}

fn log_input(cli: &Cli, input: &StepInput) {
    tracing::info!(
        verbose = input.verbose,
        compression_level = input.compression_level,
        custom_tar_args = %input.custom_tar_args,
        cache_dir = ?cli.cache_dir,
        "Step inputs"
    );
    tracing::info!("key_path_pairs:\n{}", input.key_path_pairs);
}

fn log_summary(result: &multisave_core::Result<StepOutcome>) {
    match result {
        Ok(outcome) if outcome.is_partial() => tracing::warn!(
            attempted = outcome.save.attempted,
            saved = outcome.save.saved.len(),
            failed = outcome.save.failed.len(),
            rejected_lines = outcome.parse_errors.len(),
            "Cache save finished with failures"
        ),
        Ok(outcome) => tracing::info!(
            saved = outcome.save.saved.len(),
            "All cache entries saved"
        ),
        Err(e) => tracing::error!("Cache save failed: {e}"),
    }
}
