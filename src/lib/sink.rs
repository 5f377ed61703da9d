//! Output destinations for the writer stage.
//!
//! Writers hand each finished line to a [`LineSink`]. Implementations must tolerate
//! concurrent calls from every writer thread:
//!
//! - [`AppendFileSink`] opens, appends and closes the file for every line, relying on
//!   append-mode writes of a single line not interleaving.
//! - [`SharedWriterSink`] holds one writer behind its own mutex.
//! - [`CollectingSink`] keeps `(index, line)` pairs in memory so the caller can emit them
//!   in input order after the run.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Destination for lines leaving the pipeline.
pub trait LineSink: Send + Sync {
    /// Append `line` (without terminator) for input line `index`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller decides whether to retry.
    fn append(&self, index: usize, line: &str) -> io::Result<()>;
}

/// Appends each line to a file, reopening it per line.
#[derive(Debug, Clone)]
pub struct AppendFileSink {
    path: PathBuf,
}

impl AppendFileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for AppendFileSink {
    fn append(&self, _index: usize, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        // One write call per line keeps appends from different writers whole.
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())?;
        file.flush()
    }
}

/// Shares a single writer between all writer threads.
#[derive(Debug)]
pub struct SharedWriterSink<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> SharedWriterSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { inner: Mutex::new(writer) }
    }

    /// Flush and return the wrapped writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(self) -> io::Result<W> {
        let mut writer = self.inner.into_inner();
        writer.flush()?;
        Ok(writer)
    }
}

impl SharedWriterSink<File> {
    /// Create (truncating) `path` and share it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Send> LineSink for SharedWriterSink<W> {
    fn append(&self, _index: usize, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// Buffers lines in memory in completion order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(usize, String)>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Lines in the order writers appended them.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner().into_iter().map(|(_, line)| line).collect()
    }

    /// `(index, line)` pairs sorted by original input index.
    #[must_use]
    pub fn into_ordered(self) -> Vec<(usize, String)> {
        let mut lines = self.lines.into_inner();
        lines.sort_unstable_by_key(|(index, _)| *index);
        lines
    }
}

impl LineSink for CollectingSink {
    fn append(&self, index: usize, line: &str) -> io::Result<()> {
        self.lines.lock().push((index, line.to_string()));
        Ok(())
    }
}

/// Write `lines` to `writer`, one per line, newline-terminated.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn write_lines<W, I, S>(writer: &mut W, lines: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}
