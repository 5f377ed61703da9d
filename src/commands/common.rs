//! Common CLI options shared across commands.
//!
//! These are composed into command structs using `#[command(flatten)]`.

use std::time::Duration;

use clap::Args;

use linestage_lib::errors::{LineStageError, Result};
use linestage_lib::pipeline::{PipelineConfig, StageCounts, WriteRetryPolicy};

/// Worker counts for the four stages.
#[derive(Debug, Clone, Args)]
pub struct StageThreadOptions {
    /// Number of reader, upper-case, replace and writer threads
    #[arg(
        short = 'n',
        long = "threads",
        num_args = 4,
        required = true,
        allow_negative_numbers = true,
        value_names = ["READERS", "UPPERS", "REPLACERS", "WRITERS"]
    )]
    pub threads: Vec<i64>,
}

impl StageThreadOptions {
    /// Convert to validated stage counts.
    ///
    /// # Errors
    ///
    /// Returns an error if any count is zero or negative, or if the option was repeated.
    pub fn stage_counts(&self) -> Result<StageCounts> {
        match self.threads.as_slice() {
            &[readers, uppers, replacers, writers] => {
                StageCounts::from_signed(readers, uppers, replacers, writers)
            }
            other => Err(LineStageError::InvalidParameter {
                parameter: "threads".to_string(),
                reason: format!("expected exactly 4 counts, got {}", other.len()),
            }),
        }
    }
}

/// Tuning options for a pipeline run.
#[derive(Debug, Clone, Args)]
pub struct PipelineOptions {
    /// Upper bound in microseconds of the random pause after each line (0 disables)
    #[arg(long = "max-delay-us", default_value = "1000")]
    pub max_delay_us: u64,

    /// Longest time in microseconds an idle writer waits before sweeping again
    #[arg(long = "writer-backoff-us", default_value = "100")]
    pub writer_backoff_us: u64,

    /// Attempts per line before a failing append marks it failed
    #[arg(long = "max-write-attempts", default_value = "3")]
    pub max_write_attempts: u32,

    /// Seed for the per-worker delay generators
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Seconds without progress before a stall warning is logged (0 disables)
    #[arg(long = "stall-timeout", default_value = "10")]
    pub stall_timeout: u64,

    /// Log progress every this many written lines
    #[arg(long = "progress-interval", default_value = "100000")]
    pub progress_interval: u64,

    /// Log per-stage statistics at the end of the run
    #[arg(long = "pipeline-stats", default_value = "false")]
    pub pipeline_stats: bool,

    /// Record every line's state transitions and log them at debug level
    #[arg(long = "record-transitions", default_value = "false")]
    pub record_transitions: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_delay_us: 1000,
            writer_backoff_us: 100,
            max_write_attempts: 3,
            seed: None,
            stall_timeout: 10,
            progress_interval: 100_000,
            pipeline_stats: false,
            record_transitions: false,
        }
    }
}

impl PipelineOptions {
    /// Build a validated pipeline configuration for `counts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn to_config(&self, counts: StageCounts) -> Result<PipelineConfig> {
        let config = PipelineConfig::new(counts)
            .with_max_delay(Duration::from_micros(self.max_delay_us))
            .with_writer_backoff(Duration::from_micros(self.writer_backoff_us))
            .with_retry(WriteRetryPolicy { max_attempts: self.max_write_attempts })
            .with_seed(self.seed)
            .with_stall_timeout(self.stall_timeout)
            .with_progress_interval(self.progress_interval)
            .with_stats(self.pipeline_stats)
            .with_transition_log(self.record_transitions);
        config.validate()?;
        Ok(config)
    }
}
