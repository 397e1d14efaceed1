//! zstd-compressed tar archives of cache sources

use crate::paths::{ArchiveSource, TarArgs};
use multisave_core::{StoreError, StoreResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// What ended up in an archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive entry names, in write order
    pub entries: Vec<String>,
    /// Compressed size in bytes
    pub size_bytes: u64,
}

/// Settings for one archive write
#[derive(Debug, Clone)]
pub struct ArchiveOptions<'a> {
    /// zstd level
    pub level: i32,
    /// Exclusions and symlink handling
    pub tar_args: &'a TarArgs,
    /// Log every archived entry
    pub verbose: bool,
}

fn archive_err(stage: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Archive(format!("{stage} failed: {e}"))
}

/// Write `sources` into a zstd-compressed tar file at `dst_file`
///
/// # Errors
///
/// Returns an error if the file cannot be created or an entry cannot be read.
pub fn write_tar_zst(
    sources: &[ArchiveSource],
    dst_file: &Path,
    options: &ArchiveOptions<'_>,
) -> StoreResult<ArchiveSummary> {
    let file =
        fs::File::create(dst_file).map_err(|e| StoreError::io_with_context("create", dst_file, e))?;
    let mut enc =
        zstd::Encoder::new(file, options.level).map_err(|e| archive_err("zstd encoder", e))?;
    if let Ok(threads) = std::thread::available_parallelism() {
        let threads = u32::try_from(threads.get()).unwrap_or(1);
        if let Err(e) = enc.multithread(threads) {
            tracing::debug!(error = %e, "zstd multithreading unavailable");
        }
    }

    let mut builder = tar::Builder::new(enc);
    builder.follow_symlinks(options.tar_args.dereference);

    let mut entries = Vec::new();
    for source in sources {
        let walker = WalkDir::new(&source.path)
            .follow_links(options.tar_args.dereference)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry_name(source, entry.path());
                !options.tar_args.is_excluded(&name)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(std::io::Error::kind)
                    == Some(std::io::ErrorKind::NotFound) =>
                {
                    // Files can disappear while a build tool is still cleaning up
                    tracing::warn!(root = %source.path.display(), "Skipping vanished file: {e}");
                    continue;
                }
                Err(e) => return Err(archive_err("walk", e)),
            };

            let name = entry_name(source, entry.path());
            let appended = if entry.file_type().is_dir() {
                builder.append_dir(&name, entry.path())
            } else {
                builder.append_path_with_name(entry.path(), &name)
            };
            appended.map_err(|e| archive_err(&format!("tar append {}", name.display()), e))?;

            if options.verbose {
                tracing::debug!(entry = %name.display(), "Archived");
            }
            entries.push(name.to_string_lossy().into_owned());
        }
    }

    let enc = builder
        .into_inner()
        .map_err(|e| archive_err("tar finalize", e))?;
    enc.finish().map_err(|e| archive_err("zstd finish", e))?;

    let size_bytes = fs::metadata(dst_file)
        .map_err(|e| StoreError::io_with_context("stat", dst_file, e))?
        .len();

    Ok(ArchiveSummary {
        entries,
        size_bytes,
    })
}

fn entry_name(source: &ArchiveSource, path: &Path) -> std::path::PathBuf {
    match path.strip_prefix(&source.path) {
        Ok(rel) if !rel.as_os_str().is_empty() => source.name.join(rel),
        _ => source.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_names(archive: &Path) -> Vec<String> {
        let file = fs::File::open(archive).unwrap();
        let decoder = zstd::Decoder::new(file).unwrap();
        let mut reader = tar::Archive::new(decoder);
        reader
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                e.path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn archives_files_and_directories() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("deps/sub")).unwrap();
        fs::write(src.path().join("deps/a.txt"), "a").unwrap();
        fs::write(src.path().join("deps/sub/b.txt"), "b").unwrap();
        fs::write(src.path().join("top.txt"), "top").unwrap();

        let sources = vec![
            ArchiveSource {
                path: src.path().join("deps"),
                name: "deps".into(),
            },
            ArchiveSource {
                path: src.path().join("top.txt"),
                name: "top.txt".into(),
            },
        ];
        let dst = TempDir::new().unwrap();
        let archive = dst.path().join("archive.tar.zst");
        let tar_args = TarArgs::default();

        let summary = write_tar_zst(
            &sources,
            &archive,
            &ArchiveOptions {
                level: 19,
                tar_args: &tar_args,
                verbose: true,
            },
        )
        .unwrap();

        assert!(summary.size_bytes > 0);
        assert_eq!(
            summary.entries,
            vec!["deps", "deps/a.txt", "deps/sub", "deps/sub/b.txt", "top.txt"]
        );
        assert_eq!(read_names(&archive), summary.entries);

        let file = fs::File::open(&archive).unwrap();
        let mut reader = tar::Archive::new(zstd::Decoder::new(file).unwrap());
        let mut top = reader
            .entries()
            .unwrap()
            .map(Result::unwrap)
            .find(|e| e.path().unwrap().ends_with("top.txt"))
            .unwrap();
        let mut content = String::new();
        top.read_to_string(&mut content).unwrap();
        assert_eq!(content, "top");
    }

    #[test]
    fn excluded_entries_are_skipped() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("cache/tmp")).unwrap();
        fs::write(src.path().join("cache/keep.bin"), "k").unwrap();
        fs::write(src.path().join("cache/debug.log"), "l").unwrap();
        fs::write(src.path().join("cache/tmp/x"), "x").unwrap();

        let sources = vec![ArchiveSource {
            path: src.path().join("cache"),
            name: "cache".into(),
        }];
        let tar_args =
            TarArgs::parse(&["--exclude=*.log".to_string(), "--exclude=cache/tmp".to_string()])
                .unwrap();
        let dst = TempDir::new().unwrap();

        let summary = write_tar_zst(
            &sources,
            &dst.path().join("a.tar.zst"),
            &ArchiveOptions {
                level: 1,
                tar_args: &tar_args,
                verbose: false,
            },
        )
        .unwrap();

        assert_eq!(summary.entries, vec!["cache", "cache/keep.bin"]);
    }

    #[test]
    fn unwritable_destination_is_an_io_error() {
        let dst = TempDir::new().unwrap();
        let tar_args = TarArgs::default();
        let err = write_tar_zst(
            &[],
            &dst.path().join("missing-dir/a.tar.zst"),
            &ArchiveOptions {
                level: 3,
                tar_args: &tar_args,
                verbose: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::IoWithContext { operation: "create", .. }));
    }
}
