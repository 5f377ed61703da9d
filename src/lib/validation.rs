//! Input validation utilities
//!
//! Common checks for command-line parameters and file paths, reported through the
//! structured error types in [`crate::errors`].

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::errors::{LineStageError, Result};

/// Validate that an input file exists and is a regular file
///
/// # Errors
/// Returns [`LineStageError::SourceUnavailable`] if the path is missing or is a directory
///
/// # Example
/// ```
/// use linestage_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.txt");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path_ref = path.as_ref();
    let reason = if !path_ref.exists() {
        io::Error::new(io::ErrorKind::NotFound, "file does not exist")
    } else if path_ref.is_dir() {
        io::Error::new(io::ErrorKind::InvalidInput, "path is a directory")
    } else {
        return Ok(());
    };
    Err(LineStageError::SourceUnavailable { path: path_ref.to_path_buf(), source: reason })
}

/// Validate that the directory an output file will be written into exists
///
/// # Errors
/// Returns [`LineStageError::DestinationWrite`] if the parent directory does not exist
pub fn validate_output_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path_ref = path.as_ref();
    match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(LineStageError::DestinationWrite {
                path: path_ref.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory '{}' does not exist", parent.display()),
                ),
            })
        }
        _ => Ok(()),
    }
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use linestage_lib::validation::validate_positive;
///
/// validate_positive(10, "lines").unwrap();
///
/// let result = validate_positive(0, "lines");
/// assert!(result.is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(LineStageError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}
