//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read a file's lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).expect("Failed to read output").lines().map(String::from).collect()
}

/// Asserts that `actual` holds exactly the lines of `expected`, each once, in any order.
///
/// # Panics
///
/// Panics on a missing, extra or duplicated line.
pub fn assert_same_lines_any_order(actual: &[String], expected: &[String]) {
    assert_eq!(actual.len(), expected.len(), "line count mismatch");
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for line in expected {
        *counts.entry(line.as_str()).or_default() += 1;
    }
    for line in actual {
        let count = counts.entry(line.as_str()).or_default();
        *count -= 1;
        assert!(*count >= 0, "unexpected or duplicated line {line:?}");
    }
    assert!(counts.values().all(|&c| c == 0), "missing lines");
}
