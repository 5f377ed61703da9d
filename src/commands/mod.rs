//! CLI command implementations for linestage.
//!
//! - [`transform`] - Run the four-stage pipeline over a text file
//! - [`simulate`] - Generate random text input

#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod simulate;
pub mod transform;
