//! Key-path spec parsing
//!
//! Turns the multi-line `KEY = PATH1, PATH2, ...` text of the step input into
//! an ordered, bounded set of cache entries. Each line is evaluated on its
//! own: a bad line is recorded and skipped, and the parse only fails when no
//! line produced an entry.
//!
//! ```text
//! [u] node-modules-abc123 = node_modules
//! pip-packages-xyz789 = venv/, .cache/pip
//! ```

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Maximum number of spec lines evaluated per run
pub const DEFAULT_KEY_LIMIT: usize = 10;

/// Maximum number of paths kept per key
pub const DEFAULT_PATH_LIMIT: usize = 10;

/// Line prefix that marks a key as unique
pub const DEFAULT_UNIQUE_MARKER: &str = "[u]";

/// Bounds and markers applied while parsing a spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLimits {
    /// Lines beyond this count are dropped with a warning
    pub key_limit: usize,
    /// Paths beyond this count are dropped with a warning
    pub path_limit: usize,
    /// Prefix marking an entry as unique
    pub unique_marker: String,
}

impl Default for SpecLimits {
    fn default() -> Self {
        Self {
            key_limit: DEFAULT_KEY_LIMIT,
            path_limit: DEFAULT_PATH_LIMIT,
            unique_marker: DEFAULT_UNIQUE_MARKER.to_string(),
        }
    }
}

impl SpecLimits {
    /// Set the maximum number of evaluated lines
    #[must_use]
    pub fn with_key_limit(mut self, key_limit: usize) -> Self {
        self.key_limit = key_limit;
        self
    }

    /// Set the maximum number of paths per key
    #[must_use]
    pub fn with_path_limit(mut self, path_limit: usize) -> Self {
        self.path_limit = path_limit;
        self
    }

    /// Set the uniqueness marker
    #[must_use]
    pub fn with_unique_marker(mut self, marker: impl Into<String>) -> Self {
        self.unique_marker = marker.into();
        self
    }
}

/// One validated cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntrySpec {
    /// Cache key as written by the user, trimmed
    pub key: String,
    /// Paths to archive under this key, in input order
    pub paths: Vec<String>,
    /// Whether the line carried the uniqueness marker
    pub is_unique: bool,
}

/// Entries keyed by cache key, in order of first occurrence
pub type EntrySet = IndexMap<String, CacheEntrySpec>;

/// Why a single spec line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineErrorKind {
    /// The line has no `=` separator (blank lines included)
    #[error("invalid input (lines should follow the `KEY = PATH1, PATH2, ...` format): {text}")]
    Malformed {
        /// Raw line text
        text: String,
    },

    /// The line names a key but no usable path
    #[error("no paths found for key: {key}")]
    NoPaths {
        /// Trimmed key
        key: String,
    },
}

/// A rejected spec line
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {kind}")]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    /// What was wrong with it
    #[source]
    pub kind: LineErrorKind,
}

/// Result of a successful parse
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// Valid entries
    pub entries: EntrySet,
    /// Rejected lines, in line order
    pub errors: Vec<LineError>,
}

impl ParseOutcome {
    /// True when some lines were rejected even though entries were found
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parser for the key-path spec text
#[derive(Debug, Clone, Default)]
pub struct SpecParser {
    limits: SpecLimits,
}

impl SpecParser {
    /// Create a parser with the given limits
    #[must_use]
    pub const fn new(limits: SpecLimits) -> Self {
        Self { limits }
    }

    /// Limits this parser applies
    #[must_use]
    pub const fn limits(&self) -> &SpecLimits {
        &self.limits
    }

    /// Parse raw spec text into entries.
    ///
    /// At most `key_limit` lines are evaluated. Later lines with a key that
    /// was already seen replace the earlier entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoValidEntries`] when no evaluated line yields an entry.
    pub fn parse(&self, raw: &str) -> Result<ParseOutcome> {
        let mut entries = EntrySet::new();
        let mut errors = Vec::new();

        let mut lines = raw.split('\n');
        for (idx, line) in lines.by_ref().take(self.limits.key_limit).enumerate() {
            match self.parse_line(line) {
                Ok(entry) => {
                    if let Some(previous) = entries.insert(entry.key.clone(), entry) {
                        tracing::debug!(
                            key = %previous.key,
                            line = idx + 1,
                            "Key repeated; later entry replaces the earlier one"
                        );
                    }
                }
                Err(kind) => errors.push(LineError {
                    line: idx + 1,
                    kind,
                }),
            }
        }

        if lines.next().is_some() {
            tracing::warn!(
                limit = self.limits.key_limit,
                "Skipping additional keys as the limit of {} keys has been reached",
                self.limits.key_limit
            );
        }

        if !errors.is_empty() {
            tracing::warn!(
                count = errors.len(),
                "key-path pair evaluation failures\n{}",
                list_details(&errors)
            );
        }

        if entries.is_empty() {
            return Err(Error::NoValidEntries { errors });
        }

        tracing::debug!(entries = entries.len(), rejected = errors.len(), "Parsed key-path spec");
        Ok(ParseOutcome { entries, errors })
    }

    fn parse_line(&self, line: &str) -> std::result::Result<CacheEntrySpec, LineErrorKind> {
        let trimmed = line.trim();
        let marker = self.limits.unique_marker.as_str();

        let (body, is_unique) = match trimmed.strip_prefix(marker) {
            Some(rest) if !marker.is_empty() => (rest.trim(), true),
            _ => (trimmed, false),
        };

        let Some((key, paths)) = body.split_once('=') else {
            return Err(LineErrorKind::Malformed {
                text: line.to_string(),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            tracing::warn!(line = %line.trim(), "Accepting entry with an empty cache key");
        }

        let mut tokens = paths.split(',').map(str::trim).filter(|p| !p.is_empty());
        let paths: Vec<String> = tokens
            .by_ref()
            .take(self.limits.path_limit)
            .map(str::to_string)
            .collect();

        if tokens.next().is_some() {
            tracing::warn!(
                key = %key,
                limit = self.limits.path_limit,
                "Skipping additional paths for key '{}' as the limit of {} paths has been reached",
                key,
                self.limits.path_limit
            );
        }

        if paths.is_empty() {
            return Err(LineErrorKind::NoPaths {
                key: key.to_string(),
            });
        }

        Ok(CacheEntrySpec {
            key: key.to_string(),
            paths,
            is_unique,
        })
    }
}

/// Parse with the default limits and marker
///
/// # Errors
///
/// Returns [`Error::NoValidEntries`] when no evaluated line yields an entry.
pub fn parse_spec(raw: &str) -> Result<ParseOutcome> {
    SpecParser::default().parse(raw)
}

/// Render one `    - <item>` line per item
pub(crate) fn list_details<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("    - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
