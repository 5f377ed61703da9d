//! Error path integration tests.
//!
//! Configuration and source errors must fail before any worker starts and leave files
//! untouched.

use std::fs;

use linestage_lib::errors::LineStageError;
use linestage_lib::line_store::{LineState, LineStore};
use linestage_lib::pipeline::{PipelineConfig, StageCounts, run_pipeline};
use linestage_lib::sink::CollectingSink;
use linestage_lib::source::read_lines;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{run_linestage, write_input};

#[rstest]
#[case(["0", "1", "1", "1"])]
#[case(["1", "0", "1", "1"])]
#[case(["1", "1", "-2", "1"])]
#[case(["1", "1", "1", "-1"])]
fn test_non_positive_thread_count_is_rejected(#[case] counts: [&str; 4]) {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["a b".to_string()]);

    let mut args = vec!["transform", "-i", input.to_str().unwrap(), "-n"];
    args.extend(counts);
    let output = run_linestage(&args);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid thread count"), "stderr: {stderr}");
    assert_eq!(fs::read_to_string(&input).unwrap(), "a b\n");
}

#[test]
fn test_missing_thread_counts_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["a".to_string()]);
    let output = run_linestage(&["transform", "-i", input.to_str().unwrap(), "-n", "1", "1"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.txt");
    let output =
        run_linestage(&["transform", "-i", missing.to_str().unwrap(), "-n", "1", "1", "1", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.txt"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["a".to_string()]);
    let out = dir.path().join("nowhere").join("out.txt");
    let output = run_linestage(&[
        "transform",
        "-i",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-n",
        "1",
        "1",
        "1",
        "1",
    ]);
    assert!(!output.status.success());
    assert!(!out.exists());
}

#[test]
fn test_zero_write_attempts_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["a".to_string()]);
    let output = run_linestage(&[
        "transform",
        "-i",
        input.to_str().unwrap(),
        "-n",
        "1",
        "1",
        "1",
        "1",
        "--max-write-attempts",
        "0",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max-write-attempts"));
}

#[test]
fn test_library_rejects_zero_count_before_launch() {
    let store = LineStore::new(["a b"]);
    let sink = CollectingSink::new();
    let err = run_pipeline(&PipelineConfig::new(StageCounts::new(0, 1, 1, 1)), &store, &sink)
        .unwrap_err();
    assert!(matches!(err, LineStageError::InvalidThreadCount { value: 0, .. }));
    assert_eq!(store.count_in_state(LineState::Unread), 1);
    assert!(sink.is_empty());
}

#[test]
fn test_source_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = read_lines(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, LineStageError::SourceUnavailable { .. }));
}
