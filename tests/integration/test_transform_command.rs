//! Integration tests for the transform command.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{
    assert_same_lines_any_order, numbered_lines, read_lines, run_linestage,
    run_linestage_with_log, transformed, write_input,
};

#[test]
fn test_transform_rewrites_input_in_place() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["ab cd".to_string(), "EF".to_string()]);

    let output = run_linestage(&["transform", "-i", input.to_str().unwrap(), "-n", "1", "1", "1", "1"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let mut lines = read_lines(&input);
    lines.sort();
    assert_eq!(lines, vec!["AB_CD", "EF"]);
    // Only the input remains; the staging file was renamed over it.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[cfg(unix)]
#[test]
fn test_transform_in_place_keeps_input_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["ab cd".to_string()]);
    fs::set_permissions(&input, fs::Permissions::from_mode(0o644)).unwrap();

    let output = run_linestage(&["transform", "-i", input.to_str().unwrap(), "-n", "1", "1", "1", "1"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(read_lines(&input), vec!["AB_CD"]);
    assert_eq!(fs::metadata(&input).unwrap().permissions().mode() & 0o777, 0o644);
}

#[test]
fn test_transform_rejects_non_utf8_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("binary.txt");
    let bytes = [b'a', b' ', 0xff, 0xfe, b'\n'];
    fs::write(&input, bytes).unwrap();

    let output = run_linestage(&["transform", "-i", input.to_str().unwrap(), "-n", "1", "1", "1", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("UTF-8"));
    assert_eq!(fs::read(&input).unwrap(), bytes);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_transform_accepts_data_alias() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "data.txt", &["x y".to_string()]);
    let output = run_linestage(&["transform", "-d", input.to_str().unwrap(), "-n", "2", "2", "2", "2"]);
    assert!(output.status.success());
    assert_eq!(read_lines(&input), vec!["X_Y"]);
}

#[test]
fn test_transform_to_separate_output_in_input_order() {
    let dir = TempDir::new().unwrap();
    let lines = numbered_lines(500, 21);
    let input = write_input(dir.path(), "in.txt", &lines);
    let out = dir.path().join("out.txt");

    let output = run_linestage(&[
        "transform",
        "-i",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-n",
        "4",
        "3",
        "3",
        "2",
        "--order",
        "input",
        "--max-delay-us",
        "20",
        "--seed",
        "5",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let expected: Vec<String> = lines.iter().map(|l| transformed(l)).collect();
    assert_eq!(read_lines(&out), expected);
    assert_eq!(read_lines(&input), lines);
}

#[test]
fn test_transform_completion_order_has_every_line() {
    let dir = TempDir::new().unwrap();
    let lines = numbered_lines(300, 8);
    let input = write_input(dir.path(), "in.txt", &lines);
    let out = dir.path().join("out.txt");

    let output = run_linestage(&[
        "transform",
        "-i",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-n",
        "3",
        "2",
        "2",
        "3",
        "--max-delay-us",
        "10",
        "--pipeline-stats",
    ]);
    assert!(output.status.success());

    let expected: Vec<String> = lines.iter().map(|l| transformed(l)).collect();
    assert_same_lines_any_order(&read_lines(&out), &expected);
}

#[test]
fn test_transform_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "empty.txt", &[]);
    let output = run_linestage(&["transform", "-i", input.to_str().unwrap(), "-n", "1", "1", "1", "1"]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&input).unwrap(), "");
}

#[test]
fn test_transform_keeps_blank_lines() {
    let dir = TempDir::new().unwrap();
    let lines = vec!["a b".to_string(), String::new(), "c".to_string()];
    let input = write_input(dir.path(), "in.txt", &lines);
    let out = dir.path().join("out.txt");
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
        "--order",
        "input",
    ]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&out).unwrap(), "A_B\n\nC\n");
}

#[test]
fn test_transform_logs_recorded_transitions() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "in.txt", &["a b".to_string(), "c".to_string()]);
    let out = dir.path().join("out.txt");
    let output = run_linestage_with_log(
        &[
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
            "--record-transitions",
        ],
        "debug",
    );
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let states = "unread -> read -> transforms-done -> written";
    for line in 1..=2 {
        let expected = format!("Line {line} transitions: {states}");
        assert!(stderr.contains(&expected), "missing {expected:?} in stderr");
    }
}
