#![deny(unsafe_code)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # linestage - concurrent staged line transformation
//!
//! Loads a text file into a fixed-size arena of lines and runs four pools of worker
//! threads over it: readers mark lines as read, upper-casers and replacers transform them
//! in either order, and writers append finished lines to an output sink. Each line has its
//! own lock; there is no global lock over the arena.
//!
//! ## Modules
//!
//! ### Core
//!
//! - **[`line_store`]** - The line arena, per-line state machine and snapshots
//! - **[`completion`]** - Written / failed accounting and the writer wake-up signal
//! - **[`pipeline`]** - Stages, worker pools, the runner, statistics and stall detection
//! - **[`sink`]** - Output destinations for the writer stage
//!
//! ### Utilities
//!
//! - **[`source`]** - Loading input files into a [`line_store::LineStore`]
//! - **[`simulate`]** - Random input generation
//! - **[`validation`]** - Parameter and path checks
//! - **[`progress`]** / **[`logging`]** - Progress and summary logging
//! - **[`rng`]** - Seeded random number generators
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use linestage_lib::pipeline::{PipelineConfig, StageCounts, run_pipeline};
//! use linestage_lib::sink::AppendFileSink;
//! use linestage_lib::source::load_store;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = load_store(Path::new("input.txt"), false)?;
//! let sink = AppendFileSink::new("output.txt");
//! let config = PipelineConfig::new(StageCounts::new(4, 3, 3, 2));
//! let summary = run_pipeline(&config, &store, &sink)?.into_result()?;
//! println!("wrote {} lines", summary.written);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod errors;
pub mod line_store;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod rng;
pub mod simulate;
pub mod sink;
pub mod source;
pub mod validation;
