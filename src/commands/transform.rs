//! Run the four-stage pipeline over a text file.
//!
//! Lines are upper-cased and have spaces replaced with underscores by concurrent worker
//! pools, then written to a staging file next to the destination which is renamed into
//! place only if every line was written.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use tempfile::NamedTempFile;

use linestage_lib::errors::LineStageError;
use linestage_lib::logging::{OperationTimer, log_run_summary};
use linestage_lib::pipeline::{PipelineSummary, run_pipeline};
use linestage_lib::sink::{AppendFileSink, CollectingSink, write_lines};
use linestage_lib::source::load_store;
use linestage_lib::validation::{validate_file_exists, validate_output_dir};

use crate::commands::command::Command;
use crate::commands::common::{PipelineOptions, StageThreadOptions};

/// Order of lines in the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputOrder {
    /// Lines appear in the order writers finish them
    #[default]
    Completion,
    /// Lines appear in input order
    Input,
}

/// Upper-case lines and replace spaces with underscores using concurrent stage pools.
#[derive(Debug, Parser)]
#[command(
    name = "transform",
    about = "\x1b[38;5;30m[PIPELINE]\x1b[0m       \x1b[36mTransform a text file with concurrent stage pools\x1b[0m",
    long_about = r#"
Transform every line of a text file with four concurrent worker pools.

Reader threads mark lines as read. Upper-case threads convert letters to upper case and
replace threads turn spaces into underscores, in either order. Writer threads append each
finished line to a staging file, which is renamed over the output once every line has been
written. Without --output the input file is rewritten in place.

By default lines are written in the order writers finish them, which need not match the
input. Use --order input to emit them in input order.

The input must be UTF-8 text. Only ASCII letters are upper-cased; other characters are
copied unchanged. A rewritten file keeps the permissions of the file it replaces.

Example usage:
  linestage transform -i notes.txt -n 4 3 3 2
  linestage transform -i notes.txt -o NOTES.txt -n 1 1 1 1 --order input
"#
)]
pub struct Transform {
    /// Input text file
    #[arg(short = 'i', long = "input", short_alias = 'd', alias = "data")]
    pub input: PathBuf,

    /// Output file (defaults to rewriting the input in place)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub threads: StageThreadOptions,

    /// Order of lines in the output
    #[arg(long = "order", value_enum, default_value_t = OutputOrder::Completion)]
    pub order: OutputOrder,

    #[command(flatten)]
    pub pipeline: PipelineOptions,
}

impl Transform {
    fn destination(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.input)
    }

    /// Create the staging file in the destination's directory so the final rename stays
    /// on one filesystem.
    fn create_staging(destination: &Path) -> Result<NamedTempFile> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".linestage-").suffix(".tmp");
        // New outputs get the usual umask-filtered mode rather than tempfile's 0600.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        builder
            .tempfile_in(dir)
            .map_err(|source| LineStageError::DestinationWrite {
                path: destination.to_path_buf(),
                source,
            })
            .context("Failed to create staging file")
    }

    /// Give the staging file the permissions of an existing destination, so renaming over
    /// it keeps the destination's mode.
    fn copy_destination_permissions(staging: &NamedTempFile, destination: &Path) -> Result<()> {
        let Ok(metadata) = fs::metadata(destination) else {
            return Ok(());
        };
        staging.as_file().set_permissions(metadata.permissions()).map_err(|source| {
            LineStageError::DestinationWrite { path: staging.path().to_path_buf(), source }
        })?;
        Ok(())
    }
}

impl Command for Transform {
    fn execute(&self, command_line: &str) -> Result<()> {
        validate_file_exists(&self.input)?;
        let destination = self.destination().to_path_buf();
        validate_output_dir(&destination)?;
        let counts = self.threads.stage_counts()?;
        let config = self.pipeline.to_config(counts)?;

        debug!("Command line: {command_line}");
        info!("Input: {}", self.input.display());
        info!("Output: {}", destination.display());
        info!("Output order: {:?}", self.order);
        if let Some(seed) = config.seed {
            info!("Random seed: {seed}");
        }

        let timer = OperationTimer::new("Transforming lines");
        let store = load_store(&self.input, config.record_transitions)?;
        let mut staging = Self::create_staging(&destination)?;

        let summary: PipelineSummary = match self.order {
            OutputOrder::Completion => {
                let sink = AppendFileSink::new(staging.path());
                run_pipeline(&config, &store, &sink)?
            }
            OutputOrder::Input => {
                let sink = CollectingSink::new();
                let summary = run_pipeline(&config, &store, &sink)?;
                let staging_path = staging.path().to_path_buf();
                let mut writer = BufWriter::new(staging.as_file_mut());
                write_lines(&mut writer, sink.into_ordered().into_iter().map(|(_, line)| line))
                    .map_err(|source| LineStageError::DestinationWrite {
                        path: staging_path,
                        source,
                    })?;
                summary
            }
        };

        log_run_summary(&summary);
        // The staging file is removed on drop, leaving the destination untouched.
        let summary = summary.into_result()?;

        staging.as_file().sync_all().map_err(|source| LineStageError::DestinationWrite {
            path: staging.path().to_path_buf(),
            source,
        })?;
        Self::copy_destination_permissions(&staging, &destination)?;
        staging.persist(&destination).map_err(|e| LineStageError::DestinationWrite {
            path: destination.clone(),
            source: e.error,
        })?;

        timer.log_completion(summary.written);
        info!("Wrote {}", destination.display());
        Ok(())
    }
}
