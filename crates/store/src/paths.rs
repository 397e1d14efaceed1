//! Path evaluation and archiver argument handling
//!
//! Requested paths may be relative to the working directory, start with `~/`,
//! or contain glob patterns. Each one that exists becomes an [`ArchiveSource`]
//! with a stable name inside the archive.

use multisave_core::{StoreError, StoreResult};
use std::path::{Component, Path, PathBuf};

/// A filesystem path and the name it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    /// Where to read from
    pub path: PathBuf,
    /// Relative name inside the archive
    pub name: PathBuf,
}

/// Archiver arguments the local store understands
#[derive(Debug, Clone, Default)]
pub struct TarArgs {
    /// `--exclude` patterns
    pub excludes: Vec<glob::Pattern>,
    /// `-h` / `--dereference`
    pub dereference: bool,
}

impl TarArgs {
    /// Parse tokenized archiver arguments.
    ///
    /// Recognized: `--exclude=PATTERN`, `--exclude PATTERN`, `-h`,
    /// `--dereference`. Anything else is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPattern`] for a malformed exclude pattern.
    pub fn parse(args: &[String]) -> StoreResult<Self> {
        let mut parsed = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-h" | "--dereference" => parsed.dereference = true,
                "--exclude" => match iter.next() {
                    Some(pattern) => parsed.excludes.push(compile(pattern)?),
                    None => tracing::warn!("Ignoring --exclude without a pattern"),
                },
                other => {
                    if let Some(pattern) = other.strip_prefix("--exclude=") {
                        parsed.excludes.push(compile(pattern)?);
                    } else {
                        tracing::warn!(arg = %other, "Ignoring unsupported archiver argument");
                    }
                }
            }
        }

        Ok(parsed)
    }

    /// Whether an archive entry name is excluded
    #[must_use]
    pub fn is_excluded(&self, name: &Path) -> bool {
        let file_name = name.file_name().map(Path::new);
        self.excludes.iter().any(|pattern| {
            pattern.matches_path(name) || file_name.is_some_and(|f| pattern.matches_path(f))
        })
    }
}

fn compile(pattern: &str) -> StoreResult<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Expand a leading `~` to the home directory
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Glob pattern for a requested path; only the requested part may hold wildcards
fn glob_pattern(base_dir: &Path, requested: &Path) -> String {
    let requested = requested.to_string_lossy();
    if Path::new(requested.as_ref()).is_absolute() {
        return requested.into_owned();
    }
    let base = glob::Pattern::escape(&base_dir.to_string_lossy());
    format!(
        "{}{}{requested}",
        base.trim_end_matches(std::path::MAIN_SEPARATOR),
        std::path::MAIN_SEPARATOR
    )
}

/// Name a path gets inside the archive.
///
/// Clean relative requests keep their spelling; anything else is stored
/// under its absolute path without the root.
fn archive_name(fs_path: &Path, base_dir: &Path, requested_relative: bool) -> PathBuf {
    if requested_relative {
        if let Ok(relative) = fs_path.strip_prefix(base_dir) {
            if !relative.components().any(|c| c == Component::ParentDir) {
                let cleaned: PathBuf = relative
                    .components()
                    .filter(|c| *c != Component::CurDir)
                    .collect();
                if !cleaned.as_os_str().is_empty() {
                    return cleaned;
                }
            }
        }
    }

    let absolute = fs_path
        .canonicalize()
        .unwrap_or_else(|_| fs_path.to_path_buf());
    absolute
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// Turn requested paths into archive sources.
///
/// Missing paths and globs without matches are skipped with a warning.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPattern`] for a malformed glob.
pub fn resolve_sources(base_dir: &Path, paths: &[String]) -> StoreResult<Vec<ArchiveSource>> {
    let mut sources: Vec<ArchiveSource> = Vec::new();

    for requested in paths {
        let expanded = expand_tilde(requested);
        let fs_path = base_dir.join(&expanded);

        let matches: Vec<PathBuf> = if is_glob(requested) {
            let pattern = glob_pattern(base_dir, &expanded);
            let walker = glob::glob(&pattern).map_err(|e| StoreError::InvalidPattern {
                pattern: requested.clone(),
                message: e.to_string(),
            })?;
            walker.filter_map(Result::ok).collect()
        } else if fs_path.symlink_metadata().is_ok() {
            vec![fs_path]
        } else {
            Vec::new()
        };

        if matches.is_empty() {
            tracing::warn!(path = %requested, "Cache path does not exist, skipping");
            continue;
        }

        for path in matches {
            if sources.iter().any(|s| s.path == path) {
                continue;
            }
            let name = archive_name(&path, base_dir, expanded.is_relative());
            sources.push(ArchiveSource { path, name });
        }
    }

    Ok(sources)
}
