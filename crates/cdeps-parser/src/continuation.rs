//! Continued-line accumulation
//!
//! Comments, string literals and directives can all run over several
//! physical lines. Each stage collects such runs with [`take_continued`] and
//! queues its output lines in an [`Outbox`], so a consumer still pulls one
//! line at a time while memory stays bounded by the longest open construct.

use cdeps_core::{Error, Result};
use std::collections::VecDeque;

/// Physical lines collected for one open construct
#[derive(Debug, Default)]
pub struct Continued {
    pub lines: Vec<String>,
    /// False when input ended while the construct was still open
    pub closed: bool,
}

/// Pull lines while `continues` reports that the construct is still open
/// after them. The closing line is included in the result.
pub fn take_continued<I, F>(lines: &mut I, mut continues: F) -> Result<Continued>
where
    I: Iterator<Item = Result<String>>,
    F: FnMut(&str) -> bool,
{
    let mut collected = Vec::new();
    for line in lines {
        let line = line?;
        let open = continues(&line);
        collected.push(line);
        if !open {
            return Ok(Continued {
                lines: collected,
                closed: true,
            });
        }
    }
    Ok(Continued {
        lines: collected,
        closed: false,
    })
}

/// Output queue of a pull-based stage.
///
/// Queued items are handed out before a pending error; after the error the
/// stage is halted.
pub(crate) struct Outbox<T> {
    queue: VecDeque<T>,
    error: Option<Error>,
    halted: bool,
}

impl<T> Outbox<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            error: None,
            halted: false,
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        self.queue.push_back(item);
    }

    pub(crate) fn fail(&mut self, error: Error) {
        self.error = Some(error);
        self.halted = true;
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    pub(crate) fn pop(&mut self) -> Option<Result<T>> {
        if let Some(item) = self.queue.pop_front() {
            return Some(Ok(item));
        }
        self.error.take().map(Err)
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted
    }
}
