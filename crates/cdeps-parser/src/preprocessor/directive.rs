//! Directive model
//!
//! A [`Directive`] is built once, after all of its continuation lines have
//! been collected, and never changes afterwards.

use crate::text::collapse_whitespace;
use cdeps_core::{Error, IncludeOrigin, Location, Result};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

static DEFINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+([A-Za-z_]\w*)(\([^)]*\))?(.*)$").unwrap());
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+([A-Za-z_]\w*)\s*$").unwrap());
static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:<\s*(\S+?)\s*>|"\s*(\S+?)\s*")\s*$"#).unwrap());

/// Preprocessor directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Define,
    Undef,
    Include,
    Ifdef,
    Ifndef,
    If,
    Elif,
    Else,
    Endif,
    Error,
    Warning,
    Pragma,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 12] = [
        DirectiveKind::Define,
        DirectiveKind::Undef,
        DirectiveKind::Include,
        DirectiveKind::Ifdef,
        DirectiveKind::Ifndef,
        DirectiveKind::If,
        DirectiveKind::Elif,
        DirectiveKind::Else,
        DirectiveKind::Endif,
        DirectiveKind::Error,
        DirectiveKind::Warning,
        DirectiveKind::Pragma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Define => "define",
            DirectiveKind::Undef => "undef",
            DirectiveKind::Include => "include",
            DirectiveKind::Ifdef => "ifdef",
            DirectiveKind::Ifndef => "ifndef",
            DirectiveKind::If => "if",
            DirectiveKind::Elif => "elif",
            DirectiveKind::Else => "else",
            DirectiveKind::Endif => "endif",
            DirectiveKind::Error => "error",
            DirectiveKind::Warning => "warning",
            DirectiveKind::Pragma => "pragma",
        }
    }

    /// Whether a trailing backslash pulls in the next line
    pub fn continues(&self) -> bool {
        matches!(
            self,
            DirectiveKind::Define | DirectiveKind::If | DirectiveKind::Elif
        )
    }

    /// Parse a comma separated kind list such as `"include,define"`
    pub fn parse_kinds(list: &str) -> Result<HashSet<DirectiveKind>> {
        list.split(',')
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for DirectiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnsupportedDirectiveKind {
                location: Location::default(),
                kind: s.to_string(),
            })
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an `#include`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IncludeTarget {
    pub origin: IncludeOrigin,
    pub name: String,
}

/// Kind-specific payload of a directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DirectiveValue {
    Empty,
    /// Macro body of a `#define`
    Body(String),
    Include(IncludeTarget),
    /// Expression of `#if`/`#elif`, or the identifier of `#ifdef`/`#ifndef`
    Condition(String),
    /// Text of `#error`/`#warning`/`#pragma`
    Message(String),
}

/// A parsed preprocessor directive
#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    kind: DirectiveKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Vec<String>>,
    value: DirectiveValue,
    source_lines: Vec<String>,
    lineno: usize,
    /// Trailing text of each physical line, backslash stripped and trimmed
    #[serde(skip)]
    pieces: Vec<String>,
    #[serde(skip)]
    text: OnceCell<String>,
}

impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.params == other.params
            && self.value == other.value
            && self.source_lines == other.source_lines
            && self.lineno == other.lineno
    }
}

impl Eq for Directive {}

/// Strip a continuation backslash and surrounding blanks from a line body
fn piece(body: &str) -> &str {
    let body = body.trim_end();
    body.strip_suffix('\\').unwrap_or(body).trim()
}

fn join_pieces(pieces: &[String]) -> String {
    pieces
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Directive {
    /// Build a directive from the text following its kind word on the first
    /// line (`rest`) and the bodies of any continuation lines.
    ///
    /// `source_lines` are the physical lines with their terminators.
    pub fn build(
        kind: DirectiveKind,
        rest: &str,
        continued: &[&str],
        source_lines: Vec<String>,
        location: &Location,
    ) -> Result<Self> {
        let first_line = source_lines.first().map_or("", String::as_str);
        let unsupported = || Error::unsupported(location.clone(), first_line);
        let mut name = None;
        let mut params = None;

        let first = match kind {
            DirectiveKind::Define => {
                let caps = DEFINE.captures(rest).ok_or_else(unsupported)?;
                name = Some(caps[1].to_string());
                params = caps.get(2).map(|m| {
                    let inner = &m.as_str()[1..m.as_str().len() - 1];
                    inner
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                });
                caps.get(3).map_or("", |m| m.as_str())
            }
            DirectiveKind::Undef | DirectiveKind::Ifdef | DirectiveKind::Ifndef => {
                let caps = NAME.captures(rest).ok_or_else(unsupported)?;
                name = Some(caps[1].to_string());
                ""
            }
            DirectiveKind::Else | DirectiveKind::Endif => {
                if !rest.trim().is_empty() {
                    return Err(unsupported());
                }
                ""
            }
            _ => rest,
        };

        let mut pieces = vec![piece(first).to_string()];
        pieces.extend(continued.iter().map(|body| piece(body).to_string()));

        let value = match kind {
            DirectiveKind::Define => DirectiveValue::Body(join_pieces(&pieces)),
            DirectiveKind::Include => {
                let caps = INCLUDE.captures(rest).ok_or_else(unsupported)?;
                let target = match (caps.get(1), caps.get(2)) {
                    (Some(system), _) => IncludeTarget {
                        origin: IncludeOrigin::System,
                        name: system.as_str().to_string(),
                    },
                    (None, Some(user)) => IncludeTarget {
                        origin: IncludeOrigin::User,
                        name: user.as_str().to_string(),
                    },
                    (None, None) => return Err(unsupported()),
                };
                pieces = vec![String::new()];
                DirectiveValue::Include(target)
            }
            DirectiveKind::Undef => DirectiveValue::Empty,
            DirectiveKind::Ifdef | DirectiveKind::Ifndef => {
                DirectiveValue::Condition(name.clone().unwrap_or_default())
            }
            DirectiveKind::If | DirectiveKind::Elif => {
                let condition = join_pieces(&pieces);
                if condition.is_empty() {
                    return Err(unsupported());
                }
                DirectiveValue::Condition(condition)
            }
            DirectiveKind::Else | DirectiveKind::Endif => DirectiveValue::Empty,
            DirectiveKind::Error | DirectiveKind::Warning => {
                DirectiveValue::Message(collapse_whitespace(rest))
            }
            DirectiveKind::Pragma => {
                let text = collapse_whitespace(rest);
                if text.is_empty() {
                    return Err(unsupported());
                }
                DirectiveValue::Message(text)
            }
        };

        Ok(Self {
            kind,
            name,
            params,
            value,
            lineno: location.line().unwrap_or(1) as usize,
            source_lines,
            pieces,
            text: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    /// Macro or identifier name, for kinds that carry one
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parameter list of a function-like macro
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    pub fn value(&self) -> &DirectiveValue {
        &self.value
    }

    /// Physical lines the directive was read from
    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    /// 1-based line number of the first physical line
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Macro body of a `#define`
    pub fn body(&self) -> Option<&str> {
        match &self.value {
            DirectiveValue::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn include_target(&self) -> Option<&IncludeTarget> {
        match &self.value {
            DirectiveValue::Include(target) => Some(target),
            _ => None,
        }
    }

    fn head(&self) -> String {
        let mut head = format!("#{}", self.kind);
        if let Some(target) = self.include_target() {
            match target.origin {
                IncludeOrigin::System => head.push_str(&format!(" <{}>", target.name)),
                IncludeOrigin::User => head.push_str(&format!(" \"{}\"", target.name)),
            }
        } else if let Some(name) = &self.name {
            head.push(' ');
            head.push_str(name);
            if let Some(params) = &self.params {
                head.push_str(&format!("({})", params.join(",")));
            }
        }
        head
    }

    /// Canonical rendering, one entry per physical line, without
    /// terminators. Every line but the last ends in ` \`.
    pub fn canonical_lines(&self) -> Vec<String> {
        let last = self.pieces.len().saturating_sub(1);
        self.pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| {
                let mut line = if i == 0 { self.head() } else { String::new() };
                let piece = match (&self.value, i) {
                    (DirectiveValue::Message(message), 0) => message.clone(),
                    _ => collapse_whitespace(piece),
                };
                if !piece.is_empty() {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(&piece);
                }
                if i < last {
                    line.push_str(" \\");
                }
                line
            })
            .collect()
    }

    /// Canonical text, lines joined with `\n`
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| self.canonical_lines().join("\n"))
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}
