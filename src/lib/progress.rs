//! Progress tracking utilities
//!
//! A thread-safe counter shared by all writer workers that logs a message each time the
//! number of written lines crosses an interval boundary.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// # Example
/// ```
/// use linestage_lib::progress::ProgressTracker;
/// use std::sync::Arc;
///
/// let tracker = Arc::new(ProgressTracker::new("Wrote lines").with_interval(100));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let tracker = Arc::clone(&tracker);
///         std::thread::spawn(move || {
///             for _ in 0..50 {
///                 tracker.log_if_needed(1);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// tracker.log_final();
/// assert_eq!(tracker.count(), 200);
/// ```
pub struct ProgressTracker {
    /// Progress is logged when the count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker with a default interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Set the logging interval. An interval of zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add to the count and log once for every interval boundary crossed.
    ///
    /// Returns `true` if the resulting count sits exactly on an interval boundary.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count.is_multiple_of(self.interval);
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            info!("{} {}", self.message, i * self.interval);
        }

        new_count.is_multiple_of(self.interval)
    }

    /// Log the final count unless the last boundary message already reported it.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                info!("{} {} (complete)", self.message, count);
            }
        }
    }

    /// Get the current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
