//! Test input generation.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use linestage_lib::rng::create_rng;
use linestage_lib::simulate::LineShape;

/// `count` distinct lines of lowercase words separated by spaces.
pub fn numbered_lines(count: usize, seed: u64) -> Vec<String> {
    LineShape::default().with_words_per_line(4).generate_lines(count, &mut create_rng(Some(seed)))
}

/// Expected output of the transform for one input line.
pub fn transformed(line: &str) -> String {
    line.to_ascii_uppercase().replace(' ', "_")
}

/// Write `lines` newline-terminated to `dir/name`.
pub fn write_input(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut text = lines.join("\n");
    if !lines.is_empty() {
        text.push('\n');
    }
    fs::write(&path, text).expect("Failed to write input file");
    path
}

/// Run the linestage binary with `args`.
pub fn run_linestage(args: &[&str]) -> Output {
    run_linestage_with_log(args, "warn")
}

/// Run the linestage binary with `args`, logging at `level`.
pub fn run_linestage_with_log(args: &[&str], level: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_linestage"))
        .args(args)
        .env("RUST_LOG", level)
        .output()
        .expect("Failed to run linestage")
}
