//! Integration tests for linestage.
//!
//! These tests drive the library pipeline and the command-line binary end to end.

mod helpers;
mod test_error_paths;
mod test_pipeline_concurrency;
mod test_simulate_command;
mod test_transform_command;
