//! Custom error types for linestage operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for linestage operations
pub type Result<T> = std::result::Result<T, LineStageError>;

/// Error type for linestage operations
#[derive(Error, Debug)]
pub enum LineStageError {
    /// A stage was configured with a non-positive worker count
    #[error("Invalid thread count for {stage} stage: {value} (must be a positive integer)")]
    InvalidThreadCount {
        /// The stage name (e.g., "reader", "writer")
        stage: String,
        /// The rejected value as supplied by the caller
        value: i64,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// The input source could not be opened or read
    #[error("Unable to read input '{}': {source}", path.display())]
    SourceUnavailable {
        /// Path to the input
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The output destination could not be created, written or renamed
    #[error("Unable to write output '{}': {source}", path.display())]
    DestinationWrite {
        /// Path to the destination
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked while running its stage
    #[error("Worker thread {worker} panicked: {message}")]
    WorkerPanicked {
        /// Thread name of the worker (e.g., "writer-2")
        worker: String,
        /// Panic payload rendered as text
        message: String,
    },

    /// The operating system refused to start a worker thread
    #[error("Unable to start worker thread {worker}: {source}")]
    ThreadSpawn {
        /// Thread name of the worker that could not be started
        worker: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The pipeline terminated without writing every line
    #[error("Pipeline finished with {failed} of {total} lines unwritten ({written} written)")]
    IncompleteOutput {
        /// Lines that reached the written state
        written: u64,
        /// Lines that exhausted their write attempts
        failed: u64,
        /// Total lines in the run
        total: u64,
    },
}
