//! Local directory cache store for multisave
//!
//! Each key is archived as a zstd-compressed tarball under a cache root,
//! next to a small JSON metadata file:
//! - Paths resolve against a working directory, with `~` and glob expansion
//! - Unique keys are never overwritten once stored
//! - A subset of tar arguments (`--exclude`, `-h`) is honored

mod archive;
mod local;
mod paths;
mod root;

pub use archive::{ArchiveOptions, ArchiveSummary, write_tar_zst};
pub use local::{EntryMetadata, LocalCacheStore, StoredEntry};
pub use paths::{ArchiveSource, TarArgs, expand_tilde, resolve_sources};
pub use root::{CACHE_DIR_ENV, resolve_cache_root};
