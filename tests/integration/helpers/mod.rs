//! Helper utilities for integration tests.

pub mod assertions;
pub mod text_generator;

pub use assertions::*;
pub use text_generator::*;
