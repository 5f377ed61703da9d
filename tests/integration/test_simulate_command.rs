//! Integration tests for the simulate command, alone and feeding transform.

use std::collections::HashSet;

use tempfile::TempDir;

use crate::helpers::{read_lines, run_linestage, transformed};

#[test]
fn test_simulate_is_reproducible_with_seed() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    for path in [&a, &b] {
        let output = run_linestage(&[
            "simulate",
            "-o",
            path.to_str().unwrap(),
            "--lines",
            "100",
            "--seed",
            "42",
        ]);
        assert!(output.status.success());
    }
    let lines = read_lines(&a);
    assert_eq!(lines.len(), 100);
    assert_eq!(lines, read_lines(&b));
    assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 100);
}

#[test]
fn test_simulated_input_round_trips_through_transform() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sim.txt");
    let out = dir.path().join("out.txt");

    let output = run_linestage(&[
        "simulate",
        "-o",
        input.to_str().unwrap(),
        "--lines",
        "400",
        "--words-per-line",
        "3",
        "--seed",
        "9",
    ]);
    assert!(output.status.success());

    let output = run_linestage(&[
        "transform",
        "-i",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-n",
        "2",
        "2",
        "2",
        "2",
        "--order",
        "input",
        "--max-delay-us",
        "5",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let expected: Vec<String> = read_lines(&input).iter().map(|l| transformed(l)).collect();
    assert_eq!(read_lines(&out), expected);
}

#[test]
fn test_simulate_rejects_zero_lines() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("x.txt");
    let output = run_linestage(&["simulate", "-o", out.to_str().unwrap(), "--lines", "0"]);
    assert!(!output.status.success());
    assert!(!out.exists());
}
