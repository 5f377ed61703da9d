//! Per-stage pipeline statistics.
//!
//! All counters are atomics so workers can record without taking any lock. Collection is
//! opt-in through [`PipelineConfig::collect_stats`](super::PipelineConfig).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::info;

use crate::logging::{format_count, format_duration};

use super::config::StageCounts;
use super::stage::{StageOutcome, StageRole};

/// Counters for one stage.
#[derive(Debug)]
pub struct RoleStats {
    /// Lines changed, per worker.
    per_worker_applied: Box<[AtomicU64]>,
    skipped: AtomicU64,
    sweeps: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    /// Times an idle writer waited for a ready signal.
    idle_waits: AtomicU64,
    idle_nanos: AtomicU64,
}

impl RoleStats {
    fn new(workers: usize) -> Self {
        Self {
            per_worker_applied: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            skipped: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            idle_waits: AtomicU64::new(0),
            idle_nanos: AtomicU64::new(0),
        }
    }

    /// Total lines changed by every worker of this stage.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.per_worker_applied.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Lines changed by each worker, indexed by worker number minus one.
    #[must_use]
    pub fn applied_per_worker(&self) -> Vec<u64> {
        self.per_worker_applied.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn idle_waits(&self) -> u64 {
        self.idle_waits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn idle_time(&self) -> Duration {
        Duration::from_nanos(self.idle_nanos.load(Ordering::Relaxed))
    }
}

/// Statistics for a whole run.
#[derive(Debug)]
pub struct PipelineStats {
    roles: [RoleStats; 4],
}

impl PipelineStats {
    #[must_use]
    pub fn new(counts: &StageCounts) -> Self {
        Self { roles: StageRole::ALL.map(|role| RoleStats::new(counts.for_role(role))) }
    }

    #[must_use]
    pub fn role(&self, role: StageRole) -> &RoleStats {
        &self.roles[role.index()]
    }

    /// Record the outcome of one stage application by worker `worker` (1-based).
    pub fn record_outcome(&self, role: StageRole, worker: usize, outcome: StageOutcome) {
        let stats = self.role(role);
        match outcome {
            StageOutcome::Skipped | StageOutcome::Waiting => {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            StageOutcome::Retry => {
                stats.retries.fetch_add(1, Ordering::Relaxed);
            }
            StageOutcome::Failed => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
            }
            StageOutcome::Applied | StageOutcome::Ready | StageOutcome::Written => {
                if let Some(counter) = stats.per_worker_applied.get(worker.saturating_sub(1)) {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn record_sweep(&self, role: StageRole) {
        self.role(role).sweeps.fetch_add(1, Ordering::Relaxed);
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn record_idle(&self, role: StageRole, waited: Duration) {
        let stats = self.role(role);
        stats.idle_waits.fetch_add(1, Ordering::Relaxed);
        stats.idle_nanos.fetch_add(waited.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Log a per-stage breakdown.
    pub fn log_summary(&self) {
        info!("Pipeline Statistics:");
        for role in StageRole::ALL {
            let stats = self.role(role);
            info!(
                "  {:<8} applied={} skipped={} sweeps={}",
                role.as_str(),
                format_count(stats.applied()),
                format_count(stats.skipped()),
                format_count(stats.sweeps()),
            );
            let per_worker: Vec<String> =
                stats.applied_per_worker().iter().map(|n| format_count(*n)).collect();
            info!("           per worker: [{}]", per_worker.join(", "));
            if role == StageRole::Writer {
                info!(
                    "           retries={} failures={} idle waits={} idle time={}",
                    format_count(stats.retries()),
                    format_count(stats.failures()),
                    format_count(stats.idle_waits()),
                    format_duration(stats.idle_time()),
                );
            }
        }
    }
}
