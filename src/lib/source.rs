//! Loading the input text into a [`LineStore`].

use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::errors::{LineStageError, Result};
use crate::line_store::LineStore;

/// Read `path` and split it into lines, dropping `\n` / `\r\n` terminators.
///
/// Input must be UTF-8 text. Upper-casing only touches ASCII letters, so any other
/// characters pass through unchanged.
///
/// # Errors
///
/// Returns [`LineStageError::SourceUnavailable`] if the file cannot be read or is not
/// valid UTF-8.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| {
        let source = if source.kind() == io::ErrorKind::InvalidData {
            io::Error::new(io::ErrorKind::InvalidData, "input is not valid UTF-8 text")
        } else {
            source
        };
        LineStageError::SourceUnavailable { path: path.to_path_buf(), source }
    })?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    debug!("Read {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Build a [`LineStore`] from the contents of `path`.
///
/// # Errors
///
/// Returns [`LineStageError::SourceUnavailable`] if the file cannot be read.
pub fn load_store(path: &Path, record_transitions: bool) -> Result<LineStore> {
    Ok(LineStore::with_transition_log(read_lines(path)?, record_transitions))
}
