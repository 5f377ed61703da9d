//! Shared completion accounting for the writer stage.
//!
//! The [`CompletionTracker`] owns the written / failed counters behind a guard that is
//! independent of every line lock. It also carries the "ready" signal that transform
//! workers raise whenever a line reaches `TransformsDone`, so idle writers can sleep on a
//! condition variable instead of spinning.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counter values observed together under the tracker guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionCounts {
    pub written: u64,
    pub failed: u64,
    pub total: u64,
}

impl CompletionCounts {
    /// Lines that reached a terminal state.
    #[must_use]
    pub fn finished(&self) -> u64 {
        self.written + self.failed
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished() >= self.total
    }
}

#[derive(Debug)]
struct TrackerState {
    written: u64,
    failed: u64,
    /// Bumped every time a line becomes writable.
    ready_epoch: u64,
}

/// Counts lines that reached `Written` or `Failed` and gates writer termination.
#[derive(Debug)]
pub struct CompletionTracker {
    total: u64,
    state: Mutex<TrackerState>,
    signal: Condvar,
}

impl CompletionTracker {
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            state: Mutex::new(TrackerState { written: 0, failed: 0, ready_epoch: 0 }),
            signal: Condvar::new(),
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Record one line written. Wakes all waiting writers once the run is complete.
    pub fn record_written(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.written + state.failed < self.total, "more lines finished than exist");
        state.written += 1;
        self.notify_if_complete(&state);
    }

    /// Record one line permanently failed.
    pub fn record_failed(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.written + state.failed < self.total, "more lines finished than exist");
        state.failed += 1;
        self.notify_if_complete(&state);
    }

    fn notify_if_complete(&self, state: &TrackerState) {
        if state.written + state.failed >= self.total {
            self.signal.notify_all();
        }
    }

    /// True once every line is `Written` or `Failed`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state.written + state.failed >= self.total
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.state.lock().written
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.state.lock().failed
    }

    /// Consistent view of both counters.
    #[must_use]
    pub fn counts(&self) -> CompletionCounts {
        let state = self.state.lock();
        CompletionCounts { written: state.written, failed: state.failed, total: self.total }
    }

    /// Current ready epoch; pass it to [`wait_for_ready`](Self::wait_for_ready).
    #[must_use]
    pub fn ready_epoch(&self) -> u64 {
        self.state.lock().ready_epoch
    }

    /// Announce that at least one line became writable.
    pub fn notify_ready(&self) {
        let mut state = self.state.lock();
        state.ready_epoch = state.ready_epoch.wrapping_add(1);
        self.signal.notify_all();
    }

    /// Block until the ready epoch moves past `seen_epoch`, the run completes, or
    /// `timeout` elapses. Returns true if woken by a signal rather than the timeout.
    pub fn wait_for_ready(&self, seen_epoch: u64, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.ready_epoch != seen_epoch || state.written + state.failed >= self.total {
            return true;
        }
        !self.signal.wait_for(&mut state, timeout).timed_out()
    }
}
