//! The four processing stages.
//!
//! Every stage implements [`Stage`]: given exclusive access to one line it checks the
//! stage's guard predicate and, if it matches, applies the stage's mutation and state
//! transition. The pool code in [`super::pool`] is identical for all four roles; only the
//! `Stage` implementation differs.
//!
//! | Stage | Guard | Mutation |
//! |---|---|---|
//! | Reader | `Unread` | none; → `Read` |
//! | Upper | `Read && !upper` | uppercase; `upper = true` |
//! | Replacer | `(Read \|\| upper) && !replace` | `' '` → `'_'`; `replace = true` |
//! | Writer | `TransformsDone` | append to sink; → `Written` / `Failed` |
//!
//! Upper and Replacer each advance the line to `TransformsDone` when they find the other
//! flag already set, so either may run first. Both report [`StageOutcome::Waiting`] for a
//! line the readers have not reached yet.

use std::fmt;

use log::{debug, warn};

use crate::line_store::{LineItem, LineState};
use crate::sink::LineSink;

use super::config::WriteRetryPolicy;

/// Worker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageRole {
    Reader,
    Upper,
    Replacer,
    Writer,
}

impl StageRole {
    /// All roles in pipeline order.
    pub const ALL: [StageRole; 4] = [Self::Reader, Self::Upper, Self::Replacer, Self::Writer];

    /// Position in [`StageRole::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Reader => 0,
            Self::Upper => 1,
            Self::Replacer => 2,
            Self::Writer => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Upper => "upper",
            Self::Replacer => "replacer",
            Self::Writer => "writer",
        }
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage did to one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Guard did not match; the line is untouched.
    Skipped,
    /// An upstream stage has not reached the line yet; a later sweep must revisit it.
    Waiting,
    /// The stage changed the line.
    Applied,
    /// The stage changed the line and it is now `TransformsDone`.
    Ready,
    /// The line was appended and is now `Written`.
    Written,
    /// The append failed; the line stays writable for another attempt.
    Retry,
    /// The append failed for the last allowed time; the line is now `Failed`.
    Failed,
}

impl StageOutcome {
    /// True if the line moved to a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Written | Self::Failed)
    }

    /// True if the line was modified in any way.
    #[must_use]
    pub fn changed(self) -> bool {
        !matches!(self, Self::Skipped | Self::Waiting)
    }
}

/// A processing step applied to one locked line.
pub trait Stage: Send + Sync {
    fn role(&self) -> StageRole;

    /// Apply the stage to line `index`. Called with the line's lock held.
    fn apply(&self, worker: &str, index: usize, item: &mut LineItem) -> StageOutcome;
}

/// Marks unread lines as read.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReaderStage;

impl Stage for ReaderStage {
    fn role(&self) -> StageRole {
        StageRole::Reader
    }

    fn apply(&self, worker: &str, index: usize, item: &mut LineItem) -> StageOutcome {
        if item.state() != LineState::Unread {
            return StageOutcome::Skipped;
        }
        debug!("{worker} read line {} which is \"{}\"", index + 1, item.content());
        item.advance(LineState::Read);
        StageOutcome::Applied
    }
}

/// Uppercases read lines in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpperStage;

impl Stage for UpperStage {
    fn role(&self) -> StageRole {
        StageRole::Upper
    }

    fn apply(&self, worker: &str, index: usize, item: &mut LineItem) -> StageOutcome {
        if item.state() == LineState::Unread {
            return StageOutcome::Waiting;
        }
        if item.state() != LineState::Read || item.upper_applied() {
            return StageOutcome::Skipped;
        }
        let before = log::log_enabled!(log::Level::Debug).then(|| item.content().to_string());
        item.content_mut().make_ascii_uppercase();
        item.mark_upper_applied();
        if let Some(before) = before {
            debug!("{worker} converted line {} \"{before}\" to \"{}\"", index + 1, item.content());
        }
        if item.complete_transforms_if_ready() { StageOutcome::Ready } else { StageOutcome::Applied }
    }
}

/// Replaces spaces with underscores in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplaceStage;

impl ReplaceStage {
    const FROM: char = ' ';
    const TO: &'static str = "_";

    /// Overwrite every `FROM` with `TO`. Both are one byte, so the buffer is rewritten
    /// without growing or moving.
    fn replace_in_place(content: &mut String) {
        let mut from = 0;
        while let Some(offset) = content[from..].find(Self::FROM) {
            let at = from + offset;
            content.replace_range(at..at + Self::FROM.len_utf8(), Self::TO);
            from = at + Self::TO.len();
        }
    }
}

impl Stage for ReplaceStage {
    fn role(&self) -> StageRole {
        StageRole::Replacer
    }

    fn apply(&self, worker: &str, index: usize, item: &mut LineItem) -> StageOutcome {
        if item.state() == LineState::Unread {
            return StageOutcome::Waiting;
        }
        let eligible = item.state() == LineState::Read || item.upper_applied();
        if !eligible || item.replace_applied() {
            return StageOutcome::Skipped;
        }
        let before = log::log_enabled!(log::Level::Debug).then(|| item.content().to_string());
        Self::replace_in_place(item.content_mut());
        item.mark_replace_applied();
        if let Some(before) = before {
            debug!("{worker} converted line {} \"{before}\" to \"{}\"", index + 1, item.content());
        }
        if item.complete_transforms_if_ready() { StageOutcome::Ready } else { StageOutcome::Applied }
    }
}

/// Appends finished lines to the output sink.
pub struct WriterStage<'a> {
    sink: &'a dyn LineSink,
    retry: WriteRetryPolicy,
}

impl<'a> WriterStage<'a> {
    #[must_use]
    pub fn new(sink: &'a dyn LineSink, retry: WriteRetryPolicy) -> Self {
        Self { sink, retry }
    }
}

impl Stage for WriterStage<'_> {
    fn role(&self) -> StageRole {
        StageRole::Writer
    }

    fn apply(&self, worker: &str, index: usize, item: &mut LineItem) -> StageOutcome {
        if item.state() != LineState::TransformsDone {
            return StageOutcome::Skipped;
        }
        match self.sink.append(index, item.content()) {
            Ok(()) => {
                debug!("{worker} wrote line {} back which is \"{}\"", index + 1, item.content());
                item.advance(LineState::Written);
                StageOutcome::Written
            }
            Err(e) => {
                let attempts = item.record_write_attempt();
                if self.retry.is_exhausted(attempts) {
                    warn!(
                        "{worker} failed to write line {} after {attempts} attempt(s), giving up: {e}",
                        index + 1
                    );
                    item.advance(LineState::Failed);
                    StageOutcome::Failed
                } else {
                    warn!("{worker} failed to write line {} (attempt {attempts}): {e}", index + 1);
                    StageOutcome::Retry
                }
            }
        }
    }
}
