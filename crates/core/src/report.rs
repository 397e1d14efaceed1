//! JSON run report

use crate::orchestrator::{SaveFailure, SavedEntry};
use crate::spec::LineError;
use crate::step::StepOutcome;
use crate::store::STEP_ID;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every entry saved and every line parsed
    Success,
    /// The step succeeded but something was rejected or failed
    PartialFailure,
    /// The step failed
    Failed,
}

/// Summary of one step run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// multisave version
    pub version: String,
    /// Step identifier
    pub step_id: String,
    /// Overall status
    pub status: RunStatus,
    /// Step failure message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of save tasks launched
    pub attempted: usize,
    /// Completed saves
    pub saved: Vec<SavedEntry>,
    /// Failed saves
    pub failed: Vec<SaveFailure>,
    /// Rejected spec lines
    pub parse_errors: Vec<LineError>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run duration
    pub duration_ms: u64,
}

impl RunReport {
    /// Build a report from a step result
    #[must_use]
    pub fn from_result(result: &Result<StepOutcome>, started_at: DateTime<Utc>) -> Self {
        #[allow(clippy::cast_sign_loss)]
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        let mut report = Self {
            version: crate::VERSION.to_string(),
            step_id: STEP_ID.to_string(),
            status: RunStatus::Success,
            error: None,
            attempted: 0,
            saved: Vec::new(),
            failed: Vec::new(),
            parse_errors: Vec::new(),
            started_at,
            duration_ms,
        };

        match result {
            Ok(outcome) => {
                if outcome.is_partial() {
                    report.status = RunStatus::PartialFailure;
                }
                report.attempted = outcome.save.attempted;
                report.saved.clone_from(&outcome.save.saved);
                report.failed.clone_from(&outcome.save.failed);
                report.parse_errors.clone_from(&outcome.parse_errors);
            }
            Err(e) => {
                report.status = RunStatus::Failed;
                report.error = Some(e.to_string());
                match e {
                    Error::NoValidEntries { errors } => report.parse_errors.clone_from(errors),
                    Error::AllSavesFailed { failures } => {
                        report.attempted = failures.len();
                        report.failed.clone_from(failures);
                    }
                    Error::Configuration { .. } | Error::ReportIo { .. } => {}
                }
            }
        }

        report
    }
}

/// Writes the run report to a JSON file
///
/// # Errors
///
/// Returns [`Error::ReportIo`] if the file cannot be created or written.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let io_err = |source: std::io::Error| Error::ReportIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    serde_json::to_writer_pretty(file, report).map_err(|e| io_err(e.into()))?;
    Ok(())
}
