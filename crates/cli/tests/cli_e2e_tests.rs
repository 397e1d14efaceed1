//! End-to-end runs of the multisave binary against a temporary workspace.
#![allow(deprecated)] // cargo_bin is deprecated but still supported by assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Workspace {
    work: TempDir,
    cache: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let work = TempDir::new().unwrap();
        fs::create_dir_all(work.path().join("node_modules/pkg")).unwrap();
        fs::write(work.path().join("node_modules/pkg/index.js"), "module.exports = 1").unwrap();
        fs::create_dir_all(work.path().join("vendor")).unwrap();
        fs::write(work.path().join("vendor/lib.rb"), "puts 1").unwrap();
        Self {
            work,
            cache: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self, pairs: &str) -> Command {
        let mut cmd = Command::cargo_bin("multisave").unwrap();
        cmd.current_dir(self.work.path())
            .env_remove("verbose")
            .env_remove("compression_level")
            .env_remove("custom_tar_args")
            .env_remove("RUST_LOG")
            .env("key_path_pairs", pairs)
            .arg("--cache-dir")
            .arg(self.cache.path());
        cmd
    }

    fn archives(&self) -> usize {
        fs::read_dir(self.cache.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().join("archive.tar.zst").is_file())
            .count()
    }
}

fn read_report(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn saves_every_key() {
    let ws = Workspace::new();
    let report = ws.work.path().join("out/report.json");

    ws.cmd("npm-deps = node_modules\n[u]gems = vendor, missing")
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stderr(predicate::str::contains("Step inputs"));

    assert_eq!(ws.archives(), 2);
    let report = read_report(&report);
    assert_eq!(report["status"], "success");
    assert_eq!(report["step_id"], "multikey-save-cache");
    assert_eq!(report["attempted"], 2);
    assert_eq!(report["saved"].as_array().unwrap().len(), 2);
}

#[test]
fn partial_failure_still_succeeds() {
    let ws = Workspace::new();
    let report = ws.work.path().join("report.json");

    ws.cmd("gone = does/not/exist\nok = vendor\nthis line is malformed")
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stderr(predicate::str::contains("gone"));

    assert_eq!(ws.archives(), 1);
    let report = read_report(&report);
    assert_eq!(report["status"], "partial_failure");
    assert_eq!(report["failed"][0]["key"], "gone");
    assert_eq!(report["parse_errors"][0]["line"], 3);
}

#[test]
fn all_saves_failing_exits_one() {
    let ws = Workspace::new();
    let report = ws.work.path().join("report.json");

    ws.cmd("a = nope\nb = also/nope")
        .arg("--report")
        .arg(&report)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("save failed"));

    assert_eq!(ws.archives(), 0);
    let report = read_report(&report);
    assert_eq!(report["status"], "failed");
    assert_eq!(report["error"], "save failed");
    assert_eq!(report["failed"].as_array().unwrap().len(), 2);
}

#[test]
fn no_valid_lines_exits_one() {
    let ws = Workspace::new();
    ws.cmd("just text\nkey =")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no key-path pairs found in input"));
    assert_eq!(ws.archives(), 0);
}

#[test]
fn out_of_range_compression_level_exits_one() {
    let ws = Workspace::new();
    ws.cmd("a = vendor")
        .args(["--compression-level", "20"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("compression_level"));
    assert_eq!(ws.archives(), 0);
}

#[test]
fn invalid_input_leaves_the_cache_dir_alone() {
    let ws = Workspace::new();
    let cache_dir = ws.cache.path().join("not-yet");
    Command::cargo_bin("multisave")
        .unwrap()
        .current_dir(ws.work.path())
        .env_remove("verbose")
        .env_remove("custom_tar_args")
        .env_remove("RUST_LOG")
        .env("key_path_pairs", "a = vendor")
        .args(["--compression-level", "0", "--cache-dir"])
        .arg(&cache_dir)
        .assert()
        .code(1);
    assert!(!cache_dir.exists());
}

#[test]
fn missing_pairs_exit_one() {
    let ws = Workspace::new();
    ws.cmd("")
        .env_remove("key_path_pairs")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("key_path_pairs is required"));
}

#[test]
fn unique_key_is_kept_across_runs() {
    let ws = Workspace::new();
    ws.cmd("[u]gems = vendor").assert().success();
    fs::write(ws.work.path().join("vendor/new.rb"), "puts 2").unwrap();
    ws.cmd("[u]gems = vendor")
        .args(["--log-format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unique cache key already stored"));
}

#[test]
fn verbose_comes_from_the_environment() {
    let ws = Workspace::new();
    ws.cmd("npm = node_modules")
        .env("verbose", "true")
        .assert()
        .success()
        .stderr(predicate::str::contains("node_modules/pkg/index.js"));
}
