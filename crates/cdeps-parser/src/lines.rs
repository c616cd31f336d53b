//! Line terminator model and validated line streams
//!
//! Every scrubbing stage works on physical lines that still carry their
//! terminator. The terminator convention is inferred from the first line and
//! enforced for the rest of the sequence.

use cdeps_core::{Error, Result};
use std::iter::Peekable;

/// End-of-line sequence of a physical line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Terminator {
    #[default]
    None,
    Lf,
    CrLf,
}

impl Terminator {
    /// The terminator a line actually ends with
    pub fn of(line: &str) -> Self {
        if line.ends_with("\r\n") {
            Terminator::CrLf
        } else if line.ends_with('\n') {
            Terminator::Lf
        } else {
            Terminator::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::None => "",
            Terminator::Lf => "\n",
            Terminator::CrLf => "\r\n",
        }
    }

    fn describe(&self) -> String {
        match self {
            Terminator::None => "no terminator".to_string(),
            other => format!("{:?}", other.as_str()),
        }
    }
}

/// The terminator convention of a line sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LineTerminatorInfo {
    terminator: Terminator,
}

impl LineTerminatorInfo {
    /// Infer the model from the first line; no line means no model
    pub fn from_first_line(line: Option<&str>) -> Option<Self> {
        line.map(Self::for_line)
    }

    /// The model implied by a single line
    pub fn for_line(line: &str) -> Self {
        Self::from_terminator(Terminator::of(line))
    }

    pub fn from_terminator(terminator: Terminator) -> Self {
        Self { terminator }
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// The terminator text
    pub fn end(&self) -> &'static str {
        self.terminator.as_str()
    }

    /// Negative offset where the terminator starts, if there is one
    pub fn trailing_offset(&self) -> Option<isize> {
        match self.end().len() {
            0 => None,
            n => Some(-(n as isize)),
        }
    }

    /// Backslash plus terminator, used when re-emitting continued lines
    pub fn continuation_suffix(&self) -> &'static str {
        match self.terminator {
            Terminator::None => "\\",
            Terminator::Lf => "\\\n",
            Terminator::CrLf => "\\\r\n",
        }
    }

    pub fn is_consistent(&self, line: &str) -> bool {
        Terminator::of(line) == self.terminator
    }

    /// Split a line into its text and its terminator.
    ///
    /// A line lacking the terminator (the final line of a file) is all text.
    pub fn split<'a>(&self, line: &'a str) -> (&'a str, &'a str) {
        let end = self.end();
        if !end.is_empty() && line.ends_with(end) {
            line.split_at(line.len() - end.len())
        } else {
            (line, "")
        }
    }
}

/// A validated stream of physical lines.
///
/// The model is read from the first line. Each later line must use the same
/// terminator, except that the final line may have none. The model of the
/// final line is available from [`LineStream::terminal_info`] once the
/// stream is exhausted.
pub struct LineStream<I: Iterator<Item = Result<String>>> {
    lines: Peekable<I>,
    info: Option<LineTerminatorInfo>,
    last: Option<LineTerminatorInfo>,
    lineno: usize,
    failed: bool,
}

impl<I: Iterator<Item = Result<String>>> LineStream<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines: lines.peekable(),
            info: None,
            last: None,
            lineno: 0,
            failed: false,
        }
    }

    /// The model, once the first line has been pulled
    pub fn info(&self) -> Option<LineTerminatorInfo> {
        self.info
    }

    /// The model, looking ahead at the first line if needed.
    /// `None` for empty input.
    pub fn peek_info(&mut self) -> Option<LineTerminatorInfo> {
        if self.info.is_none() && self.lineno == 0 {
            if let Some(Ok(first)) = self.lines.peek() {
                return LineTerminatorInfo::from_first_line(Some(first.as_str()));
            }
        }
        self.info
    }

    /// The model of the final line, after exhaustion
    pub fn terminal_info(&self) -> Option<LineTerminatorInfo> {
        self.last
    }

    /// Number of lines yielded so far
    pub fn lineno(&self) -> usize {
        self.lineno
    }
}

impl<I: Iterator<Item = Result<String>>> Iterator for LineStream<I> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => {
                self.failed = true;
                return Some(Err(e));
            }
        };
        self.lineno += 1;

        let info = *self
            .info
            .get_or_insert_with(|| LineTerminatorInfo::for_line(&line));
        let found = Terminator::of(&line);
        if found != info.terminator() {
            let unterminated_last = found == Terminator::None && self.lines.peek().is_none();
            if !unterminated_last {
                self.failed = true;
                return Some(Err(Error::InconsistentTerminator {
                    line: self.lineno,
                    expected: info.terminator().describe(),
                    found: found.describe(),
                }));
            }
        }
        self.last = Some(LineTerminatorInfo::from_terminator(found));
        Some(Ok(line))
    }
}

/// Split text into physical lines, keeping terminators
pub fn split_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_inclusive('\n').map(str::to_owned)
}

/// Lift plain lines into a fallible line stream
pub fn ok_lines<I>(lines: I) -> impl Iterator<Item = Result<String>>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().map(Ok)
}
