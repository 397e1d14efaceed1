//! Save Orchestrator
//!
//! Fans one save task out per cache entry, fans the results back in through
//! a bounded channel, and applies the partial-failure policy: the step only
//! fails when every attempted save failed.

use crate::input::StepInput;
use crate::spec::{CacheEntrySpec, EntrySet, list_details};
use crate::store::{CacheStore, STEP_ID, SaveRequest, SaveStatus, StoreError, StoreResult};
use crate::{Error, Result};
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Options shared by every save task of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Emit per-file detail
    pub verbose: bool,
    /// zstd level, 1..=19
    pub compression_level: i32,
    /// Extra archiver arguments, already tokenized
    pub custom_tar_args: Vec<String>,
}

impl From<&StepInput> for SaveOptions {
    fn from(input: &StepInput) -> Self {
        Self {
            verbose: input.verbose,
            compression_level: input.compression_level,
            custom_tar_args: input.tar_args(),
        }
    }
}

/// A save that completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedEntry {
    /// Cache key
    pub key: String,
    /// What the store did
    pub status: SaveStatus,
    /// Time spent in the store call
    pub duration_ms: u64,
}

/// A save that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailure {
    /// Cache key
    pub key: String,
    /// Store error message
    pub message: String,
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Aggregate result of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// Number of save tasks launched
    pub attempted: usize,
    /// Completed saves, in completion order
    pub saved: Vec<SavedEntry>,
    /// Failed saves, in completion order
    pub failed: Vec<SaveFailure>,
}

impl SaveOutcome {
    /// True when no attempted save succeeded
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.failed.len() == self.attempted
    }

    /// Apply the partial-failure policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllSavesFailed`] when every attempted save failed.
    pub fn into_result(self) -> Result<Self> {
        if self.is_total_failure() {
            return Err(Error::AllSavesFailed {
                failures: self.failed,
            });
        }
        Ok(self)
    }
}

type TaskReport = (String, StoreResult<SaveStatus>, u64);

/// Drives one concurrent save per entry against a [`CacheStore`]
pub struct SaveOrchestrator {
    store: Arc<dyn CacheStore>,
    options: SaveOptions,
}

impl SaveOrchestrator {
    /// Create an orchestrator for the given store
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, options: SaveOptions) -> Self {
        Self { store, options }
    }

    fn request_for(&self, entry: &CacheEntrySpec) -> SaveRequest {
        SaveRequest {
            step_id: STEP_ID.to_string(),
            verbose: self.options.verbose,
            key: entry.key.clone(),
            paths: entry.paths.clone(),
            is_unique: entry.is_unique,
            compression_level: self.options.compression_level,
            custom_tar_args: self.options.custom_tar_args.clone(),
        }
    }

    /// Save every entry concurrently and wait for all of them.
    ///
    /// Every launched task contributes exactly one result. A task that dies
    /// before reporting is recorded as a failure for its key.
    pub async fn save_all(&self, entries: &EntrySet) -> SaveOutcome {
        let attempted = entries.len();
        let mut outcome = SaveOutcome {
            attempted,
            ..SaveOutcome::default()
        };
        if attempted == 0 {
            return outcome;
        }

        tracing::info!(
            entries = attempted,
            store = self.store.name(),
            "Saving cache entries"
        );

        let (tx, mut rx) = mpsc::channel::<TaskReport>(attempted);
        let mut handles = Vec::with_capacity(attempted);

        for entry in entries.values() {
            let request = self.request_for(entry);
            let store = Arc::clone(&self.store);
            let tx = tx.clone();
            let span = tracing::info_span!("save_entry", key = %entry.key, unique = entry.is_unique);

            let handle = tokio::spawn(
                async move {
                    let start = Instant::now();
                    let result = store.save(&request).await;
                    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    // One send per task into a channel sized to the task count
                    if tx.try_send((request.key, result, duration_ms)).is_err() {
                        tracing::error!("Result channel rejected a save report");
                    }
                }
                .instrument(span),
            );
            handles.push((entry.key.clone(), handle));
        }
        drop(tx);

        let joined = join_all(
            handles
                .into_iter()
                .map(|(key, handle)| async move { (key, handle.await) }),
        )
        .await;

        while let Some((key, result, duration_ms)) = rx.recv().await {
            match result {
                Ok(status) => {
                    match &status {
                        SaveStatus::Saved { archive, size_bytes } => tracing::info!(
                            key = %key,
                            archive = %archive.display(),
                            size_bytes,
                            duration_ms,
                            "Cache entry saved"
                        ),
                        SaveStatus::AlreadyExists => tracing::info!(
                            key = %key,
                            "Unique cache key already stored, skipping"
                        ),
                    }
                    outcome.saved.push(SavedEntry {
                        key,
                        status,
                        duration_ms,
                    });
                }
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, duration_ms, "Cache entry save failed");
                    outcome.failed.push(SaveFailure {
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }

        for (key, joined) in joined {
            if let Err(e) = joined {
                tracing::error!(key = %key, error = %e, "Save task aborted before reporting");
                outcome.failed.push(SaveFailure {
                    key,
                    message: StoreError::Task(e.to_string()).to_string(),
                });
            }
        }

        if !outcome.failed.is_empty() {
            tracing::warn!(
                failed = outcome.failed.len(),
                attempted,
                "save failures\n{}",
                list_details(&outcome.failed)
            );
        }

        outcome
    }
}
