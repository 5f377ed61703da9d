//! Worker pools and the per-worker loops.
//!
//! Every worker runs one of two loops over the shared [`LineStore`]:
//!
//! - [`run_sweep_worker`] for readers, upper-casers and replacers: sweep every index, pause
//!   for a random delay after each one, and sweep again only while some line was still
//!   waiting on the readers.
//! - [`run_writer_worker`] for writers: sweep until the [`CompletionTracker`] reports every
//!   line finished, sleeping on the tracker's ready signal after a sweep that finished
//!   nothing.
//!
//! Threads are spawned by [`spawn_pool`], which wraps each worker in `catch_unwind`. A panic
//! is recorded on the [`WorkerContext`] and raises the abort flag so every other worker
//! leaves its loop.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::Mutex;
use rand::RngExt;
use rand::rngs::StdRng;

use crate::completion::CompletionTracker;
use crate::errors::{LineStageError, Result};
use crate::line_store::LineStore;
use crate::progress::ProgressTracker;
use crate::rng::{create_rng, derive_seed};

use super::stage::{Stage, StageOutcome, StageRole};
use super::stats::PipelineStats;

/// Shortest pause before a sweep worker re-sweeps.
pub const MIN_BACKOFF_US: u64 = 10;
/// Longest pause before a sweep worker re-sweeps.
pub const MAX_BACKOFF_US: u64 = 1000;

/// Identity of one worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerId {
    pub role: StageRole,
    /// 1-based position within the role's pool.
    pub number: usize,
    /// Position across all pools, used to derive the worker's random stream.
    pub seq: u64,
    /// Thread name, `"{role}-{number}"`.
    pub name: String,
}

impl WorkerId {
    #[must_use]
    pub fn new(role: StageRole, number: usize, seq: u64) -> Self {
        Self { role, number, seq, name: format!("{role}-{number}") }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Lines the stage changed.
    pub changed: usize,
    /// Lines an upstream stage had not reached yet.
    pub waiting: usize,
    /// Lines moved to `Written` or `Failed`.
    pub finished: usize,
}

/// State shared by every worker of a run.
pub struct WorkerContext<'a> {
    pub store: &'a LineStore,
    pub tracker: &'a CompletionTracker,
    pub progress: &'a ProgressTracker,
    pub stats: Option<&'a PipelineStats>,
    abort: AtomicBool,
    panics: Mutex<Vec<LineStageError>>,
}

impl<'a> WorkerContext<'a> {
    #[must_use]
    pub fn new(
        store: &'a LineStore,
        tracker: &'a CompletionTracker,
        progress: &'a ProgressTracker,
        stats: Option<&'a PipelineStats>,
    ) -> Self {
        Self {
            store,
            tracker,
            progress,
            stats,
            abort: AtomicBool::new(false),
            panics: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Ask every worker to stop and wake any writer waiting for work.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
        self.tracker.notify_ready();
    }

    /// Record a worker panic and abort the run.
    pub fn handle_worker_panic(&self, worker: &WorkerId, panic_info: Box<dyn Any + Send>) {
        let message = extract_panic_message(panic_info);
        error!("Worker thread {} panicked: {message}", worker.name);
        self.panics
            .lock()
            .push(LineStageError::WorkerPanicked { worker: worker.name.clone(), message });
        self.abort();
    }

    /// Take every recorded panic, oldest first.
    pub fn take_panics(&self) -> Vec<LineStageError> {
        std::mem::take(&mut *self.panics.lock())
    }

    /// Apply `stage` to line `index` under its lock and update shared accounting.
    ///
    /// Tracker updates happen while the line lock is still held, so the tracker never
    /// counts a line whose state says otherwise.
    pub fn process(&self, stage: &dyn Stage, worker: &WorkerId, index: usize) -> StageOutcome {
        let outcome = self
            .store
            .with_lock(index, |item| {
                let outcome = stage.apply(&worker.name, index, item);
                match outcome {
                    StageOutcome::Written => self.tracker.record_written(),
                    StageOutcome::Failed => self.tracker.record_failed(),
                    StageOutcome::Ready => self.tracker.notify_ready(),
                    _ => {}
                }
                outcome
            })
            .unwrap_or(StageOutcome::Skipped);

        if outcome == StageOutcome::Written {
            self.progress.log_if_needed(1);
        }
        if let Some(stats) = self.stats {
            stats.record_outcome(worker.role, worker.number, outcome);
        }
        outcome
    }

    /// One pass over every index. Stops early if the run is aborted.
    pub fn sweep(&self, stage: &dyn Stage, worker: &WorkerId, jitter: &mut Jitter) -> SweepReport {
        let mut report = SweepReport::default();
        for index in 0..self.store.len() {
            if self.is_aborted() {
                break;
            }
            let outcome = self.process(stage, worker, index);
            if outcome.changed() {
                report.changed += 1;
            }
            if outcome == StageOutcome::Waiting {
                report.waiting += 1;
            }
            if outcome.is_terminal() {
                report.finished += 1;
            }
            jitter.pause();
        }
        if let Some(stats) = self.stats {
            stats.record_sweep(worker.role);
        }
        report
    }
}

/// Random pause taken after each index of a sweep.
pub struct Jitter {
    rng: StdRng,
    max_us: u64,
}

impl Jitter {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(max_delay: Duration, seed: Option<u64>) -> Self {
        Self { rng: create_rng(seed), max_us: max_delay.as_micros() as u64 }
    }

    /// A jitter that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Some(0))
    }

    pub fn pause(&mut self) {
        if self.max_us > 0 {
            let us = self.rng.random_range(0..self.max_us);
            if us > 0 {
                thread::sleep(Duration::from_micros(us));
            }
        }
    }
}

/// Run a reader, upper-caser or replacer until a sweep meets no line still waiting on
/// the readers.
pub fn run_sweep_worker(
    ctx: &WorkerContext<'_>,
    stage: &dyn Stage,
    worker: &WorkerId,
    max_delay: Duration,
    seed: Option<u64>,
) {
    let mut jitter = Jitter::new(max_delay, derive_seed(seed, worker.seq));
    let mut backoff_us = MIN_BACKOFF_US;
    let mut sweeps = 0u64;
    loop {
        let report = ctx.sweep(stage, worker, &mut jitter);
        sweeps += 1;
        if report.waiting == 0 || ctx.is_aborted() {
            break;
        }
        thread::sleep(Duration::from_micros(backoff_us));
        backoff_us = (backoff_us * 2).min(MAX_BACKOFF_US);
    }
    debug!("{} finished after {sweeps} sweep(s)", worker.name);
}

/// Run a writer until every line is written or failed.
pub fn run_writer_worker(
    ctx: &WorkerContext<'_>,
    stage: &dyn Stage,
    worker: &WorkerId,
    backoff: Duration,
) {
    let mut jitter = Jitter::disabled();
    loop {
        // Read before sweeping so a line readied mid-sweep is not missed.
        let epoch = ctx.tracker.ready_epoch();
        let report = ctx.sweep(stage, worker, &mut jitter);
        if ctx.tracker.is_complete() || ctx.is_aborted() {
            break;
        }
        if report.finished == 0 {
            let start = Instant::now();
            ctx.tracker.wait_for_ready(epoch, backoff);
            if let Some(stats) = ctx.stats {
                stats.record_idle(worker.role, start.elapsed());
            }
        }
    }
    debug!("{} finished", worker.name);
}

/// Spawn `count` named threads for `role`, each running `body`.
///
/// `first_seq` is the position of the first worker across all pools. A panic inside `body`
/// is caught and handed to [`WorkerContext::handle_worker_panic`].
///
/// # Errors
///
/// Returns [`LineStageError::ThreadSpawn`] if a thread cannot be started. Threads already
/// started keep running and are joined when `scope` ends.
pub fn spawn_pool<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    ctx: &'env WorkerContext<'env>,
    role: StageRole,
    count: usize,
    first_seq: u64,
    body: &'env F,
) -> Result<Vec<ScopedJoinHandle<'scope, ()>>>
where
    F: Fn(&WorkerId) + Sync + ?Sized,
{
    let mut handles = Vec::with_capacity(count);
    for number in 1..=count {
        let worker = WorkerId::new(role, number, first_seq + number as u64 - 1);
        let name = worker.name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn_scoped(scope, move || {
                let result = catch_unwind(AssertUnwindSafe(|| body(&worker)));
                if let Err(panic_info) = result {
                    ctx.handle_worker_panic(&worker, panic_info);
                }
            })
            .map_err(|source| LineStageError::ThreadSpawn { worker: name, source })?;
        handles.push(handle);
    }
    Ok(handles)
}

/// Join worker threads. Panics are already caught inside each worker, so a join error is
/// reported as a panic of an unknown worker.
pub fn join_workers(handles: Vec<ScopedJoinHandle<'_, ()>>) -> Vec<LineStageError> {
    let mut errors = Vec::new();
    for handle in handles {
        let name = handle.thread().name().unwrap_or("worker").to_string();
        if let Err(panic_info) = handle.join() {
            errors.push(LineStageError::WorkerPanicked {
                worker: name,
                message: extract_panic_message(panic_info),
            });
        }
    }
    errors
}

/// Extract a human-readable message from a panic payload.
#[must_use]
pub fn extract_panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
