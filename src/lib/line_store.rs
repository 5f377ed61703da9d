//! Indexed line storage with one lock per line.
//!
//! The [`LineStore`] is a fixed-size arena of [`LineItem`]s, each behind its own
//! [`parking_lot::Mutex`]. There is no lock covering the whole store: workers touching
//! different lines never contend with each other, and every read or mutation of a line
//! happens through [`LineStore::with_lock`].
//!
//! # State machine
//!
//! ```text
//! Unread ──► Read ──► TransformsDone ──► Written
//!                            │
//!                            └─────────► Failed   (write attempts exhausted)
//! ```
//!
//! States are ordered and an item never moves to an earlier state.

use std::fmt;

use parking_lot::Mutex;

/// Processing state of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineState {
    /// Loaded into the store but not yet claimed by a reader.
    Unread,
    /// Marked ready by a reader; transforms may run.
    Read,
    /// Both the uppercase and the replace transform have been applied.
    TransformsDone,
    /// Appended to the output destination.
    Written,
    /// Gave up after exhausting write attempts.
    Failed,
}

impl LineState {
    /// Returns true for states a line never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Failed)
    }

    /// Short lowercase name used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::TransformsDone => "transforms-done",
            Self::Written => "written",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line and its per-line processing flags.
///
/// Only reachable through the owning slot's lock, so the fields need no further
/// synchronization.
#[derive(Debug)]
pub struct LineItem {
    content: String,
    state: LineState,
    upper_applied: bool,
    replace_applied: bool,
    write_attempts: u32,
    history: Option<Vec<LineState>>,
}

impl LineItem {
    /// Create an unread line. When `record_transitions` is set, every state the line
    /// enters is appended to its history.
    #[must_use]
    pub fn new(content: impl Into<String>, record_transitions: bool) -> Self {
        Self {
            content: content.into(),
            state: LineState::Unread,
            upper_applied: false,
            replace_applied: false,
            write_attempts: 0,
            history: record_transitions.then(|| vec![LineState::Unread]),
        }
    }

    /// Current text of the line.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Mutable access to the text for in-place transforms.
    pub fn content_mut(&mut self) -> &mut String {
        &mut self.content
    }

    #[must_use]
    pub fn state(&self) -> LineState {
        self.state
    }

    #[must_use]
    pub fn upper_applied(&self) -> bool {
        self.upper_applied
    }

    #[must_use]
    pub fn replace_applied(&self) -> bool {
        self.replace_applied
    }

    #[must_use]
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts
    }

    /// States entered so far, oldest first, if transition recording is enabled.
    #[must_use]
    pub fn history(&self) -> Option<&[LineState]> {
        self.history.as_deref()
    }

    /// Start recording transitions from the current state. No-op if already recording.
    pub fn start_transition_log(&mut self) {
        if self.history.is_none() {
            self.history = Some(vec![self.state]);
        }
    }

    /// Move to `next`. Returns false and leaves the line untouched if `next` is not
    /// strictly later than the current state.
    pub fn advance(&mut self, next: LineState) -> bool {
        if next <= self.state {
            return false;
        }
        self.state = next;
        if let Some(history) = self.history.as_mut() {
            history.push(next);
        }
        true
    }

    /// Set the uppercase flag. Returns false if it was already set.
    pub fn mark_upper_applied(&mut self) -> bool {
        !std::mem::replace(&mut self.upper_applied, true)
    }

    /// Set the replace flag. Returns false if it was already set.
    pub fn mark_replace_applied(&mut self) -> bool {
        !std::mem::replace(&mut self.replace_applied, true)
    }

    /// Advance to `TransformsDone` if both transform flags are set.
    pub fn complete_transforms_if_ready(&mut self) -> bool {
        self.upper_applied && self.replace_applied && self.advance(LineState::TransformsDone)
    }

    /// Count one failed write attempt and return the new total.
    pub fn record_write_attempt(&mut self) -> u32 {
        self.write_attempts += 1;
        self.write_attempts
    }
}

/// Copy of a line taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    /// Zero-based index in input order
    pub index: usize,
    pub content: String,
    pub state: LineState,
    pub upper_applied: bool,
    pub replace_applied: bool,
    pub write_attempts: u32,
    pub history: Option<Vec<LineState>>,
}

/// Fixed-length arena of lines, one lock per slot.
#[derive(Debug)]
pub struct LineStore {
    items: Box<[Mutex<LineItem>]>,
}

impl LineStore {
    /// Create a store from already newline-stripped lines.
    #[must_use]
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_transition_log(lines, false)
    }

    /// Create a store, optionally recording every state transition of every line.
    #[must_use]
    pub fn with_transition_log<I, S>(lines: I, record_transitions: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Box<[Mutex<LineItem>]> = lines
            .into_iter()
            .map(|line| Mutex::new(LineItem::new(line, record_transitions)))
            .collect();
        Self { items }
    }

    /// Start recording transitions on every line that is not already recording.
    pub fn enable_transition_log(&self) {
        for slot in &*self.items {
            slot.lock().start_transition_log();
        }
    }

    /// Split `text` into lines, dropping `\n` / `\r\n` terminators.
    ///
    /// ```
    /// use linestage_lib::line_store::LineStore;
    ///
    /// let store = LineStore::from_text("ab cd\n\nEF\n");
    /// assert_eq!(store.len(), 3);
    /// assert_eq!(store.get(1).unwrap().content, "");
    /// ```
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Run `f` with exclusive access to line `index`.
    ///
    /// The lock is released when `f` returns or unwinds. Returns `None` if `index` is out
    /// of range.
    pub fn with_lock<R>(&self, index: usize, f: impl FnOnce(&mut LineItem) -> R) -> Option<R> {
        let slot = self.items.get(index)?;
        let mut guard = slot.lock();
        Some(f(&mut guard))
    }

    /// Snapshot line `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<LineSnapshot> {
        self.with_lock(index, |item| LineSnapshot {
            index,
            content: item.content.clone(),
            state: item.state,
            upper_applied: item.upper_applied,
            replace_applied: item.replace_applied,
            write_attempts: item.write_attempts,
            history: item.history.clone(),
        })
    }

    /// Snapshot every line, locking each in turn.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LineSnapshot> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Number of lines currently in `state`.
    #[must_use]
    pub fn count_in_state(&self, state: LineState) -> usize {
        (0..self.len()).filter(|&i| self.with_lock(i, |item| item.state == state) == Some(true)).count()
    }

    /// Consume the store, returning line contents in index order.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.items.into_vec().into_iter().map(|slot| slot.into_inner().content).collect()
    }
}
