//! Launches the four worker pools over a [`LineStore`] and waits for them.

use std::thread;
use std::time::{Duration, Instant};

use log::{Level, debug, error, info, log_enabled, warn};

use crate::completion::CompletionTracker;
use crate::errors::{LineStageError, Result};
use crate::line_store::{LineState, LineStore};
use crate::progress::ProgressTracker;
use crate::sink::LineSink;

use super::config::PipelineConfig;
use super::pool::{
    WorkerContext, WorkerId, join_workers, run_sweep_worker, run_writer_worker, spawn_pool,
};
use super::stage::{ReaderStage, ReplaceStage, StageRole, UpperStage, WriterStage};
use super::stats::PipelineStats;
use super::watchdog::{StallWatchdog, StopSignal};

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineSummary {
    /// Lines in the store.
    pub total: u64,
    /// Lines appended to the sink.
    pub written: u64,
    /// Lines that exhausted their write attempts.
    pub failed: u64,
    /// 0-based indices of failed lines, ascending.
    pub failed_indices: Vec<usize>,
    pub elapsed: Duration,
    /// Per-stage statistics, when collection was enabled.
    pub stats: Option<PipelineStats>,
}

impl PipelineSummary {
    /// A summary of a run over no lines.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total: 0,
            written: 0,
            failed: 0,
            failed_indices: Vec::new(),
            elapsed: Duration::ZERO,
            stats: None,
        }
    }

    /// True if every line was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.written == self.total
    }

    /// Convert a partial run into [`LineStageError::IncompleteOutput`].
    ///
    /// # Errors
    ///
    /// Returns an error if any line was not written.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(LineStageError::IncompleteOutput {
                written: self.written,
                failed: self.failed,
                total: self.total,
            })
        }
    }
}

type WorkerBody<'a> = dyn Fn(&WorkerId) + Sync + 'a;

/// Run every stage over `store`, appending finished lines to `sink`.
///
/// Launches `readers + uppers + replacers + writers` threads at once, plus a stall
/// watchdog when enabled, and returns once all have exited. Lines whose append kept
/// failing are reported in the summary rather than as an error; call
/// [`PipelineSummary::into_result`] to treat them as one.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a thread cannot be started, or a
/// worker panicked.
pub fn run_pipeline(
    config: &PipelineConfig,
    store: &LineStore,
    sink: &dyn LineSink,
) -> Result<PipelineSummary> {
    let tracker = CompletionTracker::new(store.len() as u64);
    run_pipeline_with_tracker(config, store, sink, &tracker)
}

/// [`run_pipeline`] with a caller-owned [`CompletionTracker`], so other threads can watch
/// the written and failed counts while the run is in flight.
///
/// # Errors
///
/// As [`run_pipeline`], and also if `tracker` was not created for `store.len()` lines or
/// has already counted a finished line.
pub fn run_pipeline_with_tracker(
    config: &PipelineConfig,
    store: &LineStore,
    sink: &dyn LineSink,
    tracker: &CompletionTracker,
) -> Result<PipelineSummary> {
    config.validate()?;

    let total = store.len() as u64;
    let seen = tracker.counts();
    if seen.total != total || seen.finished() != 0 {
        return Err(LineStageError::InvalidParameter {
            parameter: "tracker".to_string(),
            reason: format!(
                "expected a fresh tracker for {total} lines, got {} of {} finished",
                seen.finished(),
                seen.total
            ),
        });
    }
    let counts = config.counts;
    info!(
        "Starting pipeline over {} lines with {} reader(s), {} upper-caser(s), {} replacer(s), {} writer(s)",
        total, counts.readers, counts.uppers, counts.replacers, counts.writers
    );

    if config.record_transitions {
        store.enable_transition_log();
    }

    let progress = ProgressTracker::new("Wrote").with_interval(config.progress_interval);
    let stats = config.collect_stats.then(|| PipelineStats::new(&counts));
    let ctx = WorkerContext::new(store, tracker, &progress, stats.as_ref());
    let writer = WriterStage::new(sink, config.retry);
    let watchdog = StallWatchdog::from_secs(config.stall_timeout_secs);
    let watchdog_stop = StopSignal::new();

    let read = |w: &WorkerId| run_sweep_worker(&ctx, &ReaderStage, w, config.max_delay, config.seed);
    let upper = |w: &WorkerId| run_sweep_worker(&ctx, &UpperStage, w, config.max_delay, config.seed);
    let replace =
        |w: &WorkerId| run_sweep_worker(&ctx, &ReplaceStage, w, config.max_delay, config.seed);
    let write = |w: &WorkerId| run_writer_worker(&ctx, &writer, w, config.writer_backoff);
    let pools: [(StageRole, &WorkerBody<'_>); 4] = [
        (StageRole::Reader, &read),
        (StageRole::Upper, &upper),
        (StageRole::Replacer, &replace),
        (StageRole::Writer, &write),
    ];

    let start = Instant::now();
    let mut errors = thread::scope(|scope| {
        let monitor = if watchdog.is_enabled() {
            thread::Builder::new()
                .name("watchdog".to_string())
                .spawn_scoped(scope, || watchdog.run(store, tracker, &watchdog_stop))
                .map_err(|e| warn!("Stall watchdog not started: {e}"))
                .ok()
        } else {
            None
        };

        let mut errors = Vec::new();
        let mut handles = Vec::with_capacity(counts.total());
        let mut seq = 0u64;
        for &(role, body) in &pools {
            let count = counts.for_role(role);
            match spawn_pool(scope, &ctx, role, count, seq, body) {
                Ok(pool) => handles.extend(pool),
                Err(e) => {
                    ctx.abort();
                    errors.push(e);
                    break;
                }
            }
            seq += count as u64;
        }

        errors.extend(join_workers(handles));
        watchdog_stop.stop();
        if let Some(monitor) = monitor {
            match monitor.join() {
                Ok(0) | Err(_) => {}
                Ok(n) => warn!("Stall watchdog fired {n} time(s) during the run"),
            }
        }
        errors
    });
    let elapsed = start.elapsed();

    errors.splice(0..0, ctx.take_panics());
    if !errors.is_empty() {
        for e in errors.iter().skip(1) {
            error!("Additional worker error: {e}");
        }
        return Err(errors.remove(0));
    }

    progress.log_final();
    let counts = tracker.counts();
    let failed_indices: Vec<usize> = (0..store.len())
        .filter(|&i| store.with_lock(i, |item| item.state() == LineState::Failed) == Some(true))
        .collect();
    debug_assert_eq!(failed_indices.len() as u64, counts.failed);

    if let Some(stats) = &stats {
        stats.log_summary();
    }
    if config.record_transitions {
        log_transitions(store);
    }

    Ok(PipelineSummary {
        total,
        written: counts.written,
        failed: counts.failed,
        failed_indices,
        elapsed,
        stats,
    })
}

/// Log each line's recorded states at debug level.
fn log_transitions(store: &LineStore) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    for line in store.snapshot() {
        if let Some(history) = &line.history {
            let states: Vec<&str> = history.iter().map(|state| state.as_str()).collect();
            debug!("Line {} transitions: {}", line.index + 1, states.join(" -> "));
        }
    }
}
