//! Exit status of the `mrc-simulator` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn mrc_simulator(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mrc-simulator"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_skipped_records_still_succeed() {
    let tmp = TempDir::new().unwrap();
    let trace = tmp.path().join("trace.csv");
    fs::write(&trace, "1,a,1,9,1,get,0\n2,b,xx,9,1,get,0\n3,a,1,9,1,get,0\n").unwrap();
    let out = tmp.path().join("mrc");

    let output = mrc_simulator(&[
        "simulate",
        "twitter",
        path_arg(&trace),
        "-o",
        path_arg(&out),
        "--step",
        "1",
        "--min",
        "1",
        "--max",
        "4",
        "--sample-shift",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(out.join("1").is_file());
}

#[test]
fn test_output_path_that_is_a_file_fails() {
    let tmp = TempDir::new().unwrap();
    let trace = tmp.path().join("trace.csv");
    fs::write(&trace, "1,a,1,9,1,get,0\n").unwrap();
    let out = tmp.path().join("mrc");
    fs::write(&out, "occupied").unwrap();

    let output = mrc_simulator(&["simulate", "twitter", path_arg(&trace), "-o", path_arg(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read_to_string(&out).unwrap(), "occupied");
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a directory"));
}

#[test]
fn test_missing_trace_fails() {
    let tmp = TempDir::new().unwrap();
    let trace = tmp.path().join("absent.csv");
    let out = tmp.path().join("mrc");

    let output = mrc_simulator(&["simulate", "twitter", path_arg(&trace), "-o", path_arg(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.csv"));
}

#[test]
fn test_unknown_profile_fails() {
    let tmp = TempDir::new().unwrap();
    let trace = tmp.path().join("trace.csv");
    fs::write(&trace, "1,a,1,9,1,get,0\n").unwrap();
    let out = tmp.path().join("mrc");

    let output = mrc_simulator(&["simulate", "memcached", path_arg(&trace), "-o", path_arg(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_wrong_argument_count_fails() {
    assert_eq!(mrc_simulator(&["simulate", "twitter"]).status.code(), Some(1));
    assert_eq!(
        mrc_simulator(&["simulate", "twitter", "a.csv", "b.csv"])
            .status
            .code(),
        Some(1)
    );
}

#[test]
fn test_zero_interval_fails() {
    let output = mrc_simulator(&["simulate", "twitter", "trace.csv", "-i", "0"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_succeeds() {
    let output = mrc_simulator(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("simulate"));
}
