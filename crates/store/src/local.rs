//! Filesystem-backed cache store
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<sha256(key)>/archive.tar.zst
//! <root>/<sha256(key)>/metadata.json
//! ```

use crate::archive::{ArchiveOptions, write_tar_zst};
use crate::paths::{TarArgs, resolve_sources};
use crate::root::resolve_cache_root;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use multisave_core::{CacheStore, SaveRequest, SaveStatus, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const ARCHIVE_FILE: &str = "archive.tar.zst";
const METADATA_FILE: &str = "metadata.json";

/// Stored alongside every archive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Cache key
    pub key: String,
    /// Step that wrote the entry
    pub step_id: String,
    /// Paths as requested
    pub paths: Vec<String>,
    /// Names actually written to the archive
    pub archived: Vec<String>,
    /// Whether the key was marked unique
    pub is_unique: bool,
    /// zstd level used
    pub compression_level: i32,
    /// Archive size in bytes
    pub size_bytes: u64,
    /// When the archive was written
    pub created_at: DateTime<Utc>,
    /// Version of the tool that wrote the entry
    pub version: String,
}

/// A stored entry
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Archive file
    pub archive: PathBuf,
    /// Parsed metadata
    pub metadata: EntryMetadata,
}

/// Cache store writing zstd tar archives below a root directory
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    root: PathBuf,
    base_dir: PathBuf,
}

impl LocalCacheStore {
    /// Store rooted at `root`; relative cache paths resolve against `base_dir`
    pub fn new(root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted at `explicit_root`, `MULTISAVE_CACHE_DIR`, or a platform default
    ///
    /// # Errors
    ///
    /// Returns an error when no writable cache directory can be found.
    pub fn from_env(base_dir: impl Into<PathBuf>, explicit_root: Option<PathBuf>) -> StoreResult<Self> {
        let root = resolve_cache_root(explicit_root)?;
        Ok(Self::new(root, base_dir))
    }

    /// Cache root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(hex::encode(digest))
    }

    /// Look up a stored key
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata exists but cannot be read or parsed.
    pub fn lookup(&self, key: &str) -> StoreResult<Option<StoredEntry>> {
        let dir = self.entry_dir(key);
        let archive = dir.join(ARCHIVE_FILE);
        let meta_path = dir.join(METADATA_FILE);
        if !archive.exists() || !meta_path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(&meta_path).map_err(|e| StoreError::io_with_context("read", &meta_path, e))?;
        let metadata: EntryMetadata = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(StoredEntry { archive, metadata }))
    }

    fn save_blocking(&self, request: &SaveRequest) -> StoreResult<SaveStatus> {
        let dir = self.entry_dir(&request.key);
        let archive = dir.join(ARCHIVE_FILE);

        if request.is_unique && archive.exists() {
            tracing::debug!(key = %request.key, archive = %archive.display(), "Archive exists for unique key");
            return Ok(SaveStatus::AlreadyExists);
        }

        let tar_args = TarArgs::parse(&request.custom_tar_args)?;
        let sources = resolve_sources(&self.base_dir, &request.paths)?;
        if sources.is_empty() {
            return Err(StoreError::NothingToArchive {
                key: request.key.clone(),
            });
        }

        fs::create_dir_all(&dir).map_err(|e| StoreError::io_with_context("create", &dir, e))?;

        // Write aside, then rename so readers never see a partial archive
        let tmp = dir.join(format!("{ARCHIVE_FILE}.{}.tmp", std::process::id()));
        let summary = match write_tar_zst(
            &sources,
            &tmp,
            &ArchiveOptions {
                level: request.compression_level,
                tar_args: &tar_args,
                verbose: request.verbose,
            },
        ) {
            Ok(summary) => summary,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };
        fs::rename(&tmp, &archive).map_err(|e| StoreError::io_with_context("rename", &tmp, e))?;

        let metadata = EntryMetadata {
            key: request.key.clone(),
            step_id: request.step_id.clone(),
            paths: request.paths.clone(),
            archived: summary.entries,
            is_unique: request.is_unique,
            compression_level: request.compression_level,
            size_bytes: summary.size_bytes,
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let meta_path = dir.join(METADATA_FILE);
        fs::write(&meta_path, json)
            .map_err(|e| StoreError::io_with_context("write", &meta_path, e))?;

        tracing::info!(
            key = %request.key,
            size_bytes = summary.size_bytes,
            archive = %archive.display(),
            "Cache saved"
        );

        Ok(SaveStatus::Saved {
            archive,
            size_bytes: summary.size_bytes,
        })
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn save(&self, request: &SaveRequest) -> StoreResult<SaveStatus> {
        let store = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || store.save_blocking(&request))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
