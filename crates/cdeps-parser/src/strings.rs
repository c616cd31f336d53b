//! String literal scrubbing
//!
//! Replaces the contents of `"..."` literals with spaces, keeping the quote
//! characters. Character literals are left alone. Runs on comment-free input.

use crate::continuation::{take_continued, Outbox};
use crate::lines::{LineStream, LineTerminatorInfo};
use crate::text::{skip_char_literal, spaces};
use cdeps_core::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static USER_INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*#\s*include\s*""#).unwrap());

/// Offsets of the string-delimiting quotes in `text`, and whether a literal
/// is still open at the end.
///
/// `in_string` tells whether `text` starts inside a literal carried over from
/// the previous line.
fn quote_offsets(text: &str, in_string: bool) -> (Vec<usize>, bool) {
    let bytes = text.as_bytes();
    let mut quotes = Vec::new();
    let mut inside = in_string;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' if !inside => i = skip_char_literal(bytes, i),
            b'"' => {
                quotes.push(i);
                inside = !inside;
                i += 1;
            }
            _ => i += 1,
        }
    }
    (quotes, inside)
}

/// Blank every literal interior of `text` given its quote offsets
fn render(text: &str, quotes: &[usize], starts_inside: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut inside = starts_inside;
    let mut pos = 0;
    for &q in quotes {
        if inside {
            out.push_str(&spaces(&text[pos..q]));
        } else {
            out.push_str(&text[pos..q]);
        }
        out.push('"');
        pos = q + 1;
        inside = !inside;
    }
    if inside {
        out.push_str(&spaces(&text[pos..]));
    } else {
        out.push_str(&text[pos..]);
    }
    out
}

/// Scrub one line body, returning the result and whether a literal stays open
fn scrub_body(body: &str, in_string: bool) -> (String, bool) {
    let (quotes, open) = quote_offsets(body, in_string);
    (render(body, &quotes, in_string), open)
}

/// Lazy string literal scrubber over a comment-free line stream
pub struct StringScrubber<I: Iterator<Item = Result<String>>> {
    lines: LineStream<I>,
    out: Outbox<String>,
    keep_includes: bool,
}

impl<I: Iterator<Item = Result<String>>> StringScrubber<I> {
    pub fn new(lines: I, keep_includes: bool) -> Self {
        Self {
            lines: LineStream::new(lines),
            out: Outbox::new(),
            keep_includes,
        }
    }

    fn scrub(&mut self, line: String) -> Result<()> {
        if self.keep_includes && USER_INCLUDE.is_match(&line) {
            self.out.push(line);
            return Ok(());
        }

        let info = self.lines.info().unwrap_or_default();
        let (body, end) = info.split(&line);
        let (scrubbed, mut open) = scrub_body(body, false);
        self.out.push(format!("{}{}", scrubbed, end));

        while open {
            let run = take_continued(&mut self.lines, |l| {
                quote_offsets(info.split(l).0, true).0.is_empty()
            })?;
            open = self.push_run(&info, run.lines);
            if !run.closed {
                trace!("string literal runs to end of input");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Queue the lines of an open literal; the last one may close it and
    /// open another
    fn push_run(&mut self, info: &LineTerminatorInfo, lines: Vec<String>) -> bool {
        let mut open = true;
        for line in lines {
            let (body, end) = info.split(&line);
            let (scrubbed, still_open) = scrub_body(body, true);
            self.out.push(format!("{}{}", scrubbed, end));
            open = still_open;
        }
        open
    }
}

impl<I: Iterator<Item = Result<String>>> Iterator for StringScrubber<I> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.out.pop() {
                return Some(item);
            }
            if self.out.is_halted() {
                return None;
            }
            match self.lines.next() {
                None => self.out.halt(),
                Some(Err(e)) => self.out.fail(e),
                Some(Ok(line)) => {
                    if let Err(e) = self.scrub(line) {
                        self.out.fail(e);
                    }
                }
            }
        }
    }
}

/// Replace string literal contents in a line stream with spaces.
///
/// With `keep_includes`, `#include "..."` lines pass through untouched so
/// that user includes can still be extracted.
pub fn replace_strings<I>(lines: I, keep_includes: bool) -> StringScrubber<I::IntoIter>
where
    I: IntoIterator<Item = Result<String>>,
{
    StringScrubber::new(lines.into_iter(), keep_includes)
}
