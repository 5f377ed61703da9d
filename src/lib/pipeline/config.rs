//! Pipeline configuration.

use std::time::Duration;

use crate::errors::{LineStageError, Result};

use super::stage::StageRole;

/// Number of worker threads for each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCounts {
    pub readers: usize,
    pub uppers: usize,
    pub replacers: usize,
    pub writers: usize,
}

impl StageCounts {
    #[must_use]
    pub fn new(readers: usize, uppers: usize, replacers: usize, writers: usize) -> Self {
        Self { readers, uppers, replacers, writers }
    }

    /// Build counts from signed values as they arrive from a command line, rejecting
    /// zero and negative values.
    ///
    /// ```
    /// use linestage_lib::pipeline::StageCounts;
    ///
    /// let counts = StageCounts::from_signed(4, 3, 3, 2).unwrap();
    /// assert_eq!(counts.total(), 12);
    /// assert!(StageCounts::from_signed(1, 0, 1, 1).is_err());
    /// assert!(StageCounts::from_signed(1, 1, -2, 1).is_err());
    /// ```
    pub fn from_signed(readers: i64, uppers: i64, replacers: i64, writers: i64) -> Result<Self> {
        let convert = |role: StageRole, value: i64| -> Result<usize> {
            match usize::try_from(value) {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(LineStageError::InvalidThreadCount { stage: role.to_string(), value }),
            }
        };
        Ok(Self {
            readers: convert(StageRole::Reader, readers)?,
            uppers: convert(StageRole::Upper, uppers)?,
            replacers: convert(StageRole::Replacer, replacers)?,
            writers: convert(StageRole::Writer, writers)?,
        })
    }

    /// Worker count for `role`.
    #[must_use]
    pub fn for_role(&self, role: StageRole) -> usize {
        match role {
            StageRole::Reader => self.readers,
            StageRole::Upper => self.uppers,
            StageRole::Replacer => self.replacers,
            StageRole::Writer => self.writers,
        }
    }

    /// Total number of worker threads across all stages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.readers + self.uppers + self.replacers + self.writers
    }

    /// Reject any zero count.
    pub fn validate(&self) -> Result<()> {
        for role in StageRole::ALL {
            if self.for_role(role) == 0 {
                return Err(LineStageError::InvalidThreadCount {
                    stage: role.to_string(),
                    value: 0,
                });
            }
        }
        Ok(())
    }
}

impl Default for StageCounts {
    fn default() -> Self {
        Self::new(1, 1, 1, 1)
    }
}

/// How many times a line may fail to append before it is marked failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRetryPolicy {
    /// Attempts per line, including the first. Must be at least 1.
    pub max_attempts: u32,
}

impl Default for WriteRetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl WriteRetryPolicy {
    /// Fail a line on its first append error.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }

    /// True once `attempts` failed appends exhaust the policy.
    #[must_use]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads per stage.
    pub counts: StageCounts,
    /// Upper bound of the random pause after each line in the sweep stages.
    /// Zero disables the pause.
    pub max_delay: Duration,
    /// Longest time an idle writer waits for a ready signal before sweeping again.
    pub writer_backoff: Duration,
    /// Retry policy for failed appends.
    pub retry: WriteRetryPolicy,
    /// Seed for the per-worker delay generators. `None` uses OS entropy.
    pub seed: Option<u64>,
    /// Record every state transition of every line and log them at debug level after the
    /// run. The runner turns on the store's transition log.
    pub record_transitions: bool,
    /// Collect per-stage statistics and log them at the end of the run.
    pub collect_stats: bool,
    /// Seconds without a line finishing before a stall warning is logged (0 = disabled).
    pub stall_timeout_secs: u64,
    /// Log progress every this many written lines.
    pub progress_interval: u64,
}

impl PipelineConfig {
    #[must_use]
    pub fn new(counts: StageCounts) -> Self {
        Self {
            counts,
            max_delay: Duration::from_micros(1000),
            writer_backoff: Duration::from_micros(100),
            retry: WriteRetryPolicy::default(),
            seed: None,
            record_transitions: false,
            collect_stats: false,
            stall_timeout_secs: 10,
            progress_interval: 100_000,
        }
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_writer_backoff(mut self, backoff: Duration) -> Self {
        self.writer_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: WriteRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_transition_log(mut self, record: bool) -> Self {
        self.record_transitions = record;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, collect: bool) -> Self {
        self.collect_stats = collect;
        self
    }

    #[must_use]
    pub fn with_stall_timeout(mut self, timeout_secs: u64) -> Self {
        self.stall_timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check the configuration before any worker is launched.
    pub fn validate(&self) -> Result<()> {
        self.counts.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(LineStageError::InvalidParameter {
                parameter: "max-write-attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.writer_backoff.is_zero() {
            return Err(LineStageError::InvalidParameter {
                parameter: "writer-backoff".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(StageCounts::default())
    }
}
