//! Command line and environment binding

use crate::tracing::TracingFormat;
use clap::Parser;
use clap::builder::BoolishValueParser;
use multisave_core::StepInput;
use multisave_core::input::DEFAULT_COMPRESSION_LEVEL;
use std::path::PathBuf;

/// Successful exit code
pub const EXIT_OK: i32 = 0;
/// Exit code for any step failure
pub const EXIT_FAILURE: i32 = 1;

/// Save multiple cache keys in one step.
///
/// Every input can also be set through the environment variable of the same
/// name, which is how CI step runners pass them.
#[derive(Parser, Debug)]
#[command(name = "multisave", version, about, long_about = None)]
pub struct Cli {
    /// Log per-entry and per-file details
    #[arg(
        long,
        env = "verbose",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub verbose: bool,

    /// Newline-separated `KEY = PATH1, PATH2` lines, optionally prefixed with `[u]`
    #[arg(long, env = "key_path_pairs")]
    pub key_path_pairs: Option<String>,

    /// zstd compression level (1-19)
    #[arg(
        long,
        env = "compression_level",
        default_value_t = DEFAULT_COMPRESSION_LEVEL,
        allow_negative_numbers = true
    )]
    pub compression_level: i32,

    /// Extra archiver arguments, separated by whitespace
    #[arg(
        long,
        env = "custom_tar_args",
        default_value = "",
        allow_hyphen_values = true
    )]
    pub custom_tar_args: String,

    /// Cache root directory
    #[arg(long, env = "MULTISAVE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t)]
    pub log_format: TracingFormat,
}

impl Cli {
    /// Step input bound from flags and environment
    #[must_use]
    pub fn to_input(&self) -> StepInput {
        StepInput::new(self.key_path_pairs.clone().unwrap_or_default())
            .with_verbose(self.verbose)
            .with_compression_level(self.compression_level)
            .with_custom_tar_args(self.custom_tar_args.clone())
    }
}

/// Parse the process arguments.
///
/// Help and version requests exit 0; any other parse error is reported and
/// exits with [`EXIT_FAILURE`].
#[must_use]
pub fn parse() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_FAILURE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("multisave").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse_from(&["--key-path-pairs", "a = b"]);
        assert!(!cli.verbose);
        assert_eq!(cli.compression_level, 3);
        assert_eq!(cli.custom_tar_args, "");
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_to_input() {
        let cli = parse_from(&[
            "--verbose",
            "--key-path-pairs",
            "[u]a = b\nc = d",
            "--compression-level",
            "19",
            "--custom-tar-args",
            "--exclude=*.log -h",
        ]);
        let input = cli.to_input();

        assert!(input.verbose);
        assert_eq!(input.key_path_pairs, "[u]a = b\nc = d");
        assert_eq!(input.compression_level, 19);
        assert_eq!(input.tar_args(), vec!["--exclude=*.log", "-h"]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_level_binds_but_fails_validation() {
        let cli = parse_from(&["--key-path-pairs", "a = b", "--compression-level", "-1"]);
        assert_eq!(cli.compression_level, -1);
        assert!(cli.to_input().validate().is_err());
    }

    #[test]
    fn test_missing_pairs_fail_validation() {
        let cli = parse_from(&[]);
        assert!(cli.key_path_pairs.is_none());
        assert!(cli.to_input().validate().is_err());
    }

    #[test]
    fn test_log_format_and_paths() {
        let cli = parse_from(&[
            "--key-path-pairs",
            "a = b",
            "--log-format",
            "json",
            "--cache-dir",
            "/tmp/cache",
            "--report",
            "out/report.json",
        ]);
        assert_eq!(cli.log_format, TracingFormat::Json);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cli.report, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn test_invalid_log_format() {
        let result = Cli::try_parse_from(["multisave", "--log-format", "dev"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["multisave", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }
}
