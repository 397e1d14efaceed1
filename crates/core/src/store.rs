//! Cache Store Abstraction
//!
//! Defines the `CacheStore` trait the orchestrator saves through. The core
//! never inspects store errors beyond their message and never retries.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Step identifier passed to every store call
pub const STEP_ID: &str = "multikey-save-cache";

/// Error types for cache store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error with path context for better diagnostics
    #[error("Failed to {operation} '{path}': {source}")]
    IoWithContext {
        /// What was being done, e.g. "create directory"
        operation: &'static str,
        /// Path the operation touched
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// None of the requested paths exist
    #[error("no files to cache for key '{key}': none of the paths exist")]
    NothingToArchive {
        /// Cache key of the entry
        key: String,
    },

    /// Archive creation failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Metadata serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A path or exclude pattern is not a valid glob
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as written
        pattern: String,
        /// Parser message
        message: String,
    },

    /// Store setup problem, e.g. no writable cache directory
    #[error("Cache store configuration error: {0}")]
    Configuration(String),

    /// The save task itself died before reporting
    #[error("Save task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Create an IO error with path context
    pub fn io_with_context(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::IoWithContext {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type for cache store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything a store needs to save one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Identifier of the calling step
    pub step_id: String,
    /// Emit per-file detail
    pub verbose: bool,
    /// Cache key
    pub key: String,
    /// Paths to archive, in input order
    pub paths: Vec<String>,
    /// Treat the key as immutable once stored
    pub is_unique: bool,
    /// zstd level, 1..=19
    pub compression_level: i32,
    /// Extra archiver arguments, already tokenized
    pub custom_tar_args: Vec<String>,
}

/// How a successful save ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveStatus {
    /// A new archive was written
    Saved {
        /// Where the archive landed
        archive: PathBuf,
        /// Archive size in bytes
        size_bytes: u64,
    },
    /// A unique key was already stored; nothing was written
    AlreadyExists,
}

/// Pluggable cache store
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Save the request's paths under its key
    async fn save(&self, request: &SaveRequest) -> StoreResult<SaveStatus>;

    /// Short store name for logs
    fn name(&self) -> &'static str;
}
