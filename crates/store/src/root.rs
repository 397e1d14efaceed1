//! Cache root resolution
//!
//! The root is the first usable directory out of the `--cache-dir` /
//! `MULTISAVE_CACHE_DIR` override, the platform cache directory (which already
//! honors `XDG_CACHE_HOME` on Linux) and the temp directory.

use multisave_core::{StoreError, StoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "MULTISAVE_CACHE_DIR";

const APP_DIR: &str = "multisave";

fn candidates(
    explicit: Option<PathBuf>,
    platform_cache: Option<PathBuf>,
    temp_dir: &Path,
) -> Vec<PathBuf> {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .into_iter()
        .chain(platform_cache.map(|dir| dir.join(APP_DIR)))
        .chain(std::iter::once(temp_dir.join(APP_DIR)))
        .collect()
}

/// Create `dir` if needed and check that files can be created inside it
fn is_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    match create_probe(dir) {
        Ok(probe) => {
            let _ = fs::remove_file(probe);
            true
        }
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cache directory not writable");
            false
        }
    }
}

fn create_probe(dir: &Path) -> std::io::Result<PathBuf> {
    let probe = dir.join(format!(".multisave-probe-{}", std::process::id()));
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)?;
    Ok(probe)
}

fn pick_root(candidates: Vec<PathBuf>) -> StoreResult<PathBuf> {
    let tried = candidates.len();
    candidates.into_iter().find(|dir| is_writable(dir)).ok_or_else(|| {
        StoreError::Configuration(format!("none of {tried} cache directory candidates is writable"))
    })
}

/// Resolve the cache root, preferring `explicit`, then `MULTISAVE_CACHE_DIR`
///
/// # Errors
///
/// Returns [`StoreError::Configuration`] when no candidate directory is writable.
pub fn resolve_cache_root(explicit: Option<PathBuf>) -> StoreResult<PathBuf> {
    let explicit = explicit.or_else(|| {
        std::env::var_os(CACHE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });
    let root = pick_root(candidates(explicit, dirs::cache_dir(), &std::env::temp_dir()))?;
    tracing::debug!(root = %root.display(), "Resolved cache root");
    Ok(root)
}
