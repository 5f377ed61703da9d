//! Generate random text input for the transform command.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use linestage_lib::logging::OperationTimer;
use linestage_lib::rng::create_rng;
use linestage_lib::simulate::LineShape;
use linestage_lib::sink::write_lines;
use linestage_lib::validation::{validate_output_dir, validate_positive};

use crate::commands::command::Command;

/// Write numbered lines of random lowercase words separated by spaces.
#[derive(Debug, Parser)]
#[command(
    name = "simulate",
    about = "\x1b[38;5;166m[UTILITIES]\x1b[0m      \x1b[36mGenerate random text input\x1b[0m",
    long_about = r#"
Generate a text file of random lines for exercising the transform command.

Each line starts with its 1-based line number followed by random lowercase words separated
by single spaces, so every line is distinct and both transforms change it.

Example usage:
  linestage simulate -o input.txt --lines 10000 --seed 42
"#
)]
pub struct Simulate {
    /// Output text file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Number of lines to generate
    #[arg(short = 'l', long = "lines", default_value = "1000")]
    pub lines: usize,

    /// Random words per line
    #[arg(short = 'w', long = "words-per-line", default_value = "6")]
    pub words_per_line: usize,

    /// Random seed for reproducible output
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl Command for Simulate {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_positive(self.lines, "lines")?;
        validate_output_dir(&self.output)?;

        info!("Output: {}", self.output.display());
        if let Some(seed) = self.seed {
            info!("Random seed: {seed}");
        }

        let timer = OperationTimer::new("Generating lines");
        let mut rng = create_rng(self.seed);
        let shape = LineShape::default().with_words_per_line(self.words_per_line);
        let lines = shape.generate_lines(self.lines, &mut rng);

        let file = File::create(&self.output)
            .with_context(|| format!("Failed to create output: {}", self.output.display()))?;
        write_lines(&mut BufWriter::new(file), &lines)
            .with_context(|| format!("Failed to write output: {}", self.output.display()))?;

        timer.log_completion(lines.len() as u64);
        Ok(())
    }
}
