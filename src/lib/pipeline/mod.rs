//! Four-stage concurrent line pipeline.
//!
//! Pools of reader, upper-caser, replacer and writer threads sweep a shared
//! [`LineStore`](crate::line_store::LineStore). Each line carries its own lock and moves
//! through `Unread → Read → TransformsDone → Written` (or `Failed` once its writes are
//! exhausted). Upper-casing and replacement may run in either order; a line is writable only
//! once both have been applied.
//!
//! ```
//! use linestage_lib::line_store::LineStore;
//! use linestage_lib::pipeline::{PipelineConfig, StageCounts, run_pipeline};
//! use linestage_lib::sink::CollectingSink;
//!
//! let store = LineStore::new(["ab cd", "EF"]);
//! let sink = CollectingSink::new();
//! let config = PipelineConfig::new(StageCounts::new(2, 1, 1, 2));
//! let summary = run_pipeline(&config, &store, &sink).unwrap();
//! assert!(summary.is_success());
//!
//! let lines: Vec<String> = sink.into_ordered().into_iter().map(|(_, line)| line).collect();
//! assert_eq!(lines, vec!["AB_CD", "EF"]);
//! ```

pub mod config;
pub mod pool;
pub mod runner;
pub mod stage;
pub mod stats;
pub mod watchdog;

pub use config::{PipelineConfig, StageCounts, WriteRetryPolicy};
pub use runner::{PipelineSummary, run_pipeline, run_pipeline_with_tracker};
pub use stage::{ReaderStage, ReplaceStage, Stage, StageOutcome, StageRole, UpperStage, WriterStage};
pub use stats::PipelineStats;
pub use watchdog::{StallWatchdog, StopSignal};
