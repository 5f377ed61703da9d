//! Logging utilities for formatted output.
//!
//! This module provides consistent, user-friendly logging helpers for counts,
//! durations, rates and the end-of-run pipeline summary.

use std::time::{Duration, Instant};

use crate::pipeline::PipelineSummary;

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use linestage_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a percentage with specified decimal places.
///
/// # Arguments
///
/// * `value` - The fraction (0.0-1.0) to format as percentage
/// * `decimals` - Number of decimal places to include
///
/// # Examples
///
/// ```
/// use linestage_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form.
///
/// Sub-second durations are reported in milliseconds since most runs of the
/// pipeline on small inputs finish well under a second.
///
/// # Examples
///
/// ```
/// use linestage_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a rate (lines per second).
///
/// # Examples
///
/// ```
/// use linestage_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 lines/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 lines/min");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} lines/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} lines/s", format_count(rate as u64))
    } else {
        let per_min = count as f64 / (secs / 60.0);
        format!("{per_min:.1} lines/min")
    }
}

/// Logs a formatted summary of a finished pipeline run.
#[allow(clippy::cast_precision_loss)]
pub fn log_run_summary(summary: &PipelineSummary) {
    log::info!("Pipeline Summary:");
    log::info!("  Input lines: {}", format_count(summary.total));
    log::info!("  Written lines: {}", format_count(summary.written));
    if summary.total > 0 {
        let rate = summary.written as f64 / summary.total as f64;
        log::info!("  Written fraction: {}", format_percent(rate, 2));
    }
    if summary.failed > 0 {
        log::warn!("  Failed lines: {}", format_count(summary.failed));
        let shown: Vec<String> =
            summary.failed_indices.iter().take(10).map(|i| (i + 1).to_string()).collect();
        log::warn!("  First failed line numbers: {}", shown.join(", "));
    }
    log::info!("  Elapsed: {}", format_duration(summary.elapsed));
}

/// Operation timing and summary helper.
///
/// # Examples
///
/// ```no_run
/// use linestage_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Transforming lines");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
