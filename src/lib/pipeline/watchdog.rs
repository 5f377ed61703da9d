//! Stall detection for a running pipeline.
//!
//! The watchdog samples the number of finished lines at a fixed interval. If that number
//! has not moved for `timeout`, it logs a diagnostic snapshot of how many lines sit in
//! each state. It only observes; it never changes the run. Between samples it waits on a
//! [`StopSignal`], so the runner can end it as soon as the workers have joined.

use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::completion::CompletionTracker;
use crate::line_store::{LineState, LineStore};
use crate::logging::format_count;

const ALL_STATES: [LineState; 5] = [
    LineState::Unread,
    LineState::Read,
    LineState::TransformsDone,
    LineState::Written,
    LineState::Failed,
];

/// One-shot signal that ends a [`StallWatchdog::run`] early.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.signal.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Wait up to `timeout` for [`stop`](Self::stop). Returns true once stopped.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.signal.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

/// Configuration for stall detection.
#[derive(Debug, Clone, Copy)]
pub struct StallWatchdog {
    /// Time without progress before a warning (zero = disabled).
    timeout: Duration,
    sample_interval: Duration,
}

impl StallWatchdog {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, sample_interval: Duration::from_millis(100) }
    }

    #[must_use]
    pub fn from_secs(timeout_secs: u64) -> Self {
        Self::new(Duration::from_secs(timeout_secs))
    }

    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Sample until `stop` is raised or the run completes. Returns the number of stall
    /// warnings logged.
    pub fn run(&self, store: &LineStore, tracker: &CompletionTracker, stop: &StopSignal) -> u32 {
        if !self.is_enabled() {
            return 0;
        }
        let mut warnings = 0;
        let mut last_finished = tracker.counts().finished();
        let mut last_progress = Instant::now();
        loop {
            if stop.wait(self.sample_interval) {
                break;
            }
            let counts = tracker.counts();
            if counts.is_complete() {
                break;
            }
            if counts.finished() != last_finished {
                last_finished = counts.finished();
                last_progress = Instant::now();
                continue;
            }
            if last_progress.elapsed() >= self.timeout {
                log_stall(self.timeout, store, counts.written, counts.failed, counts.total);
                warnings += 1;
                last_progress = Instant::now();
            }
        }
        warnings
    }
}

fn log_stall(timeout: Duration, store: &LineStore, written: u64, failed: u64, total: u64) {
    warn!("STALL DETECTED: no line finished for {}s", timeout.as_secs_f64());
    warn!(
        "  Finished: {} written + {} failed of {}",
        format_count(written),
        format_count(failed),
        format_count(total)
    );
    for state in ALL_STATES {
        warn!("  {:<16} {}", state.as_str(), format_count(store.count_in_state(state) as u64));
    }
}
