//! Directive parser
//!
//! Walks a (usually scrubbed) line stream, recognizes directive lines,
//! gathers their continuation lines and re-renders them according to a
//! [`DirectiveMode`]. Conditional branches are recognized, never evaluated.

use super::directive::{Directive, DirectiveKind};
use crate::continuation::take_continued;
use crate::lines::{LineStream, LineTerminatorInfo};
use crate::text::{ends_with_backslash, pad_to, spaces};
use cdeps_core::{Error, Location, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use tracing::trace;

static DIRECTIVE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#").unwrap());
static NULL_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*$").unwrap());
static HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*([A-Za-z_]\w*)(.*)$").unwrap());

/// How directive lines are rendered in the output stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirectiveMode {
    /// Lines pass through unchanged
    #[default]
    Identify,
    /// Selected kinds (all when `None`) are rewritten in canonical form,
    /// padded to their original length
    Normalize { kinds: Option<HashSet<DirectiveKind>> },
    /// Directive lines become spaces, except kinds in `keep`
    Blank { keep: HashSet<DirectiveKind> },
}

impl DirectiveMode {
    /// Normalize every directive kind
    pub fn normalize() -> Self {
        DirectiveMode::Normalize { kinds: None }
    }

    /// Blank every directive kind
    pub fn blank() -> Self {
        DirectiveMode::Blank {
            keep: HashSet::new(),
        }
    }

    fn render(&self, info: &LineTerminatorInfo, directive: &Directive) -> Vec<String> {
        let source = directive.source_lines();
        match self {
            DirectiveMode::Identify => source.to_vec(),
            DirectiveMode::Normalize { kinds } => {
                if kinds.as_ref().is_some_and(|k| !k.contains(&directive.kind())) {
                    return source.to_vec();
                }
                source
                    .iter()
                    .zip(directive.canonical_lines())
                    .map(|(line, canonical)| {
                        let (body, end) = info.split(line);
                        match pad_to(&canonical, body.chars().count()) {
                            Some(padded) => padded + end,
                            None => line.clone(),
                        }
                    })
                    .collect()
            }
            DirectiveMode::Blank { keep } => {
                if keep.contains(&directive.kind()) {
                    return source.to_vec();
                }
                source
                    .iter()
                    .map(|line| {
                        let (body, end) = info.split(line);
                        spaces(body) + end
                    })
                    .collect()
            }
        }
    }
}

/// One item of the parsed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A line that is not part of a directive
    Line(String),
    /// A directive and its lines as rendered by the mode
    Directive {
        directive: Directive,
        lines: Vec<String>,
    },
}

impl Parsed {
    pub fn directive(&self) -> Option<&Directive> {
        match self {
            Parsed::Directive { directive, .. } => Some(directive),
            Parsed::Line(_) => None,
        }
    }
}

/// Lazy directive parser over a line stream
pub struct DirectiveParser<I: Iterator<Item = Result<String>>> {
    lines: LineStream<I>,
    mode: DirectiveMode,
    filename: Option<String>,
    failed: bool,
}

impl<I: Iterator<Item = Result<String>>> DirectiveParser<I> {
    pub fn new(lines: I, mode: DirectiveMode) -> Self {
        Self {
            lines: LineStream::new(lines),
            mode,
            filename: None,
            failed: false,
        }
    }

    /// Name used in error and directive locations
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Flatten to the rendered lines
    pub fn lines(self) -> ParsedLines<I> {
        ParsedLines {
            parser: self,
            pending: VecDeque::new(),
        }
    }

    /// Only the directive records
    pub fn directives(self) -> impl Iterator<Item = Result<Directive>> {
        self.filter_map(|item| match item {
            Ok(Parsed::Directive { directive, .. }) => Some(Ok(directive)),
            Ok(Parsed::Line(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    fn location(&self, lineno: usize) -> Location {
        Location::at_line(self.filename.as_deref(), lineno as u32)
    }

    fn parse(&mut self, line: String) -> Result<Parsed> {
        let info = self.lines.info().unwrap_or_default();
        let lineno = self.lines.lineno();
        let (body, _) = info.split(&line);

        if !DIRECTIVE_LINE.is_match(body) || NULL_DIRECTIVE.is_match(body) {
            return Ok(Parsed::Line(line));
        }

        let location = self.location(lineno);
        let Some(caps) = HEAD.captures(body) else {
            let kind = body.trim_start().trim_start_matches('#').trim();
            return Err(Error::UnsupportedDirectiveKind {
                location,
                kind: kind.split_whitespace().next().unwrap_or(kind).to_string(),
            });
        };
        let kind: DirectiveKind = caps[1].parse().map_err(|_| Error::UnsupportedDirectiveKind {
            location: location.clone(),
            kind: caps[1].to_string(),
        })?;
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let mut source_lines = Vec::new();
        if kind.continues() && ends_with_backslash(body) {
            let run = take_continued(&mut self.lines, |l| ends_with_backslash(info.split(l).0))?;
            if !run.closed {
                trace!("{} directive continues to end of input", kind);
            }
            source_lines = run.lines;
        }
        source_lines.insert(0, line.clone());

        let continued: Vec<&str> = source_lines[1..]
            .iter()
            .map(|l| info.split(l).0)
            .collect();
        let directive = Directive::build(kind, rest, &continued, source_lines.clone(), &location)?;
        let lines = self.mode.render(&info, &directive);
        Ok(Parsed::Directive { directive, lines })
    }
}

impl<I: Iterator<Item = Result<String>>> Iterator for DirectiveParser<I> {
    type Item = Result<Parsed>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.lines.next()? {
            Ok(line) => self.parse(line),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Rendered lines of a [`DirectiveParser`]
pub struct ParsedLines<I: Iterator<Item = Result<String>>> {
    parser: DirectiveParser<I>,
    pending: VecDeque<String>,
}

impl<I: Iterator<Item = Result<String>>> Iterator for ParsedLines<I> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            match self.parser.next()? {
                Ok(Parsed::Line(line)) => return Some(Ok(line)),
                Ok(Parsed::Directive { lines, .. }) => self.pending.extend(lines),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Parse directives out of a line stream
pub fn parse_directives<I>(lines: I, mode: DirectiveMode) -> DirectiveParser<I::IntoIter>
where
    I: IntoIterator<Item = Result<String>>,
{
    DirectiveParser::new(lines.into_iter(), mode)
}
