//! Reference extraction
//!
//! Turns a scrubbed, directive-aware stream into [`Reference`] records:
//! includes, macro and constant definitions, typedef aliases and, when
//! enabled, top-level tags, functions and variables.

use crate::continuation::Outbox;
use crate::preprocessor::{Directive, DirectiveKind, Parsed};
use crate::text::skip_char_literal;
use cdeps_core::{
    DeclarationKind, DefineKind, Error, IncludeOrigin, Location, Reference, Result,
};
use once_cell::sync::Lazy;
use regex::Regex;

static INCLUDE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*#\s*include\s*(?:<\s*(\S+?)\s*>|"\s*(\S+?)\s*")\s*$"#).unwrap()
});
static INCLUDE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*include\b").unwrap());
static TYPEDEF_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btypedef\b").unwrap());

static TYPEDEF_INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*typedef\s+(?:const\s+)?(struct|enum|union)(?:\s+([A-Za-z_]\w*))?\s*\{").unwrap()
});
static TYPEDEF_COMPOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*typedef\s+(?:const\s+)?(struct|enum|union)\s+([A-Za-z_]\w*)(?:\s+|\s*\*+\s*)([A-Za-z_]\w*)\s*;\s*$",
    )
    .unwrap()
});
static TYPEDEF_FUNC_PTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*typedef\s+.+?\(\s*\*\s*([A-Za-z_]\w*)\s*\)\s*\(.*\)\s*;\s*$").unwrap()
});
static TYPEDEF_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*typedef\s+[\w\s\*]+?\b([A-Za-z_]\w*)\s*\(.*\)\s*;\s*$").unwrap()
});
static TYPEDEF_SIMPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*typedef\s+(?:[A-Za-z_]\w*[\s\*]+)+?\**\s*([A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)*;\s*$")
        .unwrap()
});
/// Alias following the closing brace of a typedef body
static CLOSING_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\**\s*([A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)*(?:,[^;]*)?;\s*$").unwrap()
});

static TAG_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:static|extern|const|volatile)\s+)*(struct|enum|union)\s+([A-Za-z_]\w*)\s*[{;]")
        .unwrap()
});
static FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w\s\*]*?[\s\*])([A-Za-z_]\w*)\s*\(").unwrap());
static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][\w\s\*]*?[\s\*])([A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)*[=;,]").unwrap()
});
static EXTERN_C: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*extern\s+"\s*C?\s*"\s*\{"#).unwrap());

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Byte offset of `word` in `line` where it is not part of a longer
/// identifier
fn word_offset(line: &str, word: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    line.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = line[..i].chars().next_back();
        let after = line[i + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Braces opened and closed by a line, ignoring character literals
fn brace_delta(code: &str) -> (usize, usize) {
    let bytes = code.as_bytes();
    let (mut opened, mut closed) = (0, 0);
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_char_literal(bytes, i),
            b'{' => {
                opened += 1;
                i += 1;
            }
            b'}' => {
                closed += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    (opened, closed)
}

/// Lazy reference extractor over a parsed stream
pub struct ReferenceExtractor<I: Iterator<Item = Result<Parsed>>> {
    items: I,
    filename: Option<String>,
    extract_symbols: bool,
    lineno: usize,
    depth: usize,
    /// Brace depth a multi-line `typedef struct {` returns to when it closes
    pending_alias: Option<usize>,
    out: Outbox<Reference>,
}

fn lift(line: Result<String>) -> Result<Parsed> {
    line.map(Parsed::Line)
}

impl<I: Iterator<Item = Result<Parsed>>> ReferenceExtractor<I> {
    pub fn new(items: I, extract_symbols: bool) -> Self {
        Self {
            items,
            filename: None,
            extract_symbols,
            lineno: 0,
            depth: 0,
            pending_alias: None,
            out: Outbox::new(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Location of `name` on `line`, carrying the scrubbed line as its text
    fn location(&self, lineno: usize, line: &str, name: &str) -> Result<Location> {
        let location = Location::at_line(self.filename.as_deref(), lineno as u32)
            .with_text(line.trim_end());
        match word_offset(line, name) {
            Some(offset) => location.with_column(line[..offset].chars().count() as u32 + 1),
            None => Ok(location),
        }
    }

    fn push(&mut self, reference: Reference, lineno: usize, line: &str) -> Result<()> {
        let location = self.location(lineno, line, reference.name())?;
        self.out.push(reference.with_location(location));
        Ok(())
    }

    fn include(&mut self, origin: IncludeOrigin, name: &str, lineno: usize, line: &str) -> Result<()> {
        if origin == IncludeOrigin::User && !name.ends_with(".h") {
            return Err(Error::unsupported(
                Location::at_line(self.filename.as_deref(), lineno as u32),
                line,
            ));
        }
        self.push(Reference::include(origin, name)?, lineno, line)
    }

    fn directive(&mut self, directive: &Directive) -> Result<()> {
        let lineno = directive.lineno();
        let first = directive.source_lines().first().cloned().unwrap_or_default();
        match directive.kind() {
            DirectiveKind::Define => {
                let Some(name) = directive.name() else {
                    return Ok(());
                };
                let kind = if directive.params().is_some() {
                    DefineKind::Macro
                } else {
                    DefineKind::Constant
                };
                self.push(Reference::define(kind, name)?, lineno, &first)
            }
            DirectiveKind::Include => match directive.include_target() {
                Some(target) => {
                    let (origin, name) = (target.origin, target.name.clone());
                    self.include(origin, &name, lineno, &first)
                }
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn line(&mut self, line: &str) -> Result<()> {
        let code = line.trim_end_matches(['\n', '\r']);
        let lineno = self.lineno;

        if let Some(caps) = INCLUDE_LINE.captures(code) {
            return match (caps.get(1), caps.get(2)) {
                (Some(system), _) => self.include(IncludeOrigin::System, system.as_str(), lineno, code),
                (None, Some(user)) => self.include(IncludeOrigin::User, user.as_str(), lineno, code),
                (None, None) => Ok(()),
            };
        }
        if INCLUDE_LIKE.is_match(code) {
            return Err(Error::unsupported(
                Location::at_line(self.filename.as_deref(), lineno as u32),
                code,
            ));
        }

        let depth_before = self.depth;
        let mut opens_typedef = false;
        if TYPEDEF_WORD.is_match(code) {
            opens_typedef = self.typedef(code)?;
        } else if self.extract_symbols && depth_before == 0 {
            self.symbol(code)?;
        }

        let (mut opened, closed) = brace_delta(code);
        if EXTERN_C.is_match(code) {
            opened -= 1;
        }
        self.depth = (self.depth + opened).saturating_sub(closed);

        if opens_typedef {
            self.pending_alias = Some(depth_before);
        } else if self.pending_alias == Some(self.depth) && closed > 0 {
            self.pending_alias = None;
            let tail = code.rfind('}').map_or("", |i| &code[i + 1..]);
            let Some(caps) = CLOSING_ALIAS.captures(tail) else {
                return Err(Error::unsupported(
                    Location::at_line(self.filename.as_deref(), lineno as u32),
                    code,
                ));
            };
            let alias = caps[1].to_string();
            self.push(
                Reference::declaration(DeclarationKind::Typedef, alias)?,
                lineno,
                code,
            )?;
        }
        Ok(())
    }

    /// Handle a line mentioning `typedef`; returns true when it opens a
    /// body that closes on a later line
    fn typedef(&mut self, code: &str) -> Result<bool> {
        let lineno = self.lineno;
        let location = Location::at_line(self.filename.as_deref(), lineno as u32);
        let unsupported = || Error::unsupported(location.clone(), code);

        if let Some(caps) = TYPEDEF_INLINE.captures(code) {
            if let (Some(kind), Some(tag)) = (
                DeclarationKind::from_tag_keyword(&caps[1]),
                caps.get(2).map(|m| m.as_str().to_string()),
            ) {
                self.push(Reference::declaration(kind, tag)?, lineno, code)?;
            }
            let after = &code[caps.get(0).map_or(0, |m| m.end())..];
            if !after.contains('}') {
                return Ok(true);
            }
            let tail = code.rfind('}').map_or("", |i| &code[i + 1..]);
            let caps = CLOSING_ALIAS.captures(tail).ok_or_else(unsupported)?;
            let alias = caps[1].to_string();
            self.push(Reference::declaration(DeclarationKind::Typedef, alias)?, lineno, code)?;
            return Ok(false);
        }

        if let Some(caps) = TYPEDEF_COMPOUND.captures(code) {
            if let Some(kind) = DeclarationKind::from_tag_keyword(&caps[1]) {
                self.push(Reference::declaration(kind, &caps[2])?, lineno, code)?;
            }
            let alias = caps[3].to_string();
            self.push(Reference::declaration(DeclarationKind::Typedef, alias)?, lineno, code)?;
            return Ok(false);
        }

        let alias = [&*TYPEDEF_FUNC_PTR, &*TYPEDEF_FUNC, &*TYPEDEF_SIMPLE]
            .into_iter()
            .find_map(|re| re.captures(code).map(|caps| caps[1].to_string()))
            .filter(|alias| !is_keyword(alias))
            .ok_or_else(unsupported)?;
        self.push(Reference::declaration(DeclarationKind::Typedef, alias)?, lineno, code)?;
        Ok(false)
    }

    /// Top-level tags, functions and variables starting at column 0
    fn symbol(&mut self, code: &str) -> Result<()> {
        let lineno = self.lineno;
        if let Some(caps) = TAG_DEFINITION.captures(code) {
            if let Some(kind) = DeclarationKind::from_tag_keyword(&caps[1]) {
                self.push(Reference::declaration(kind, &caps[2])?, lineno, code)?;
            }
            return Ok(());
        }

        let found = FUNCTION
            .captures(code)
            .map(|caps| (DeclarationKind::SymbolFunction, caps))
            .or_else(|| {
                VARIABLE
                    .captures(code)
                    .map(|caps| (DeclarationKind::SymbolVariable, caps))
            });
        let Some((kind, caps)) = found else {
            return Ok(());
        };
        let prefix = &caps[1];
        let name = &caps[2];
        let prefix_words: Vec<&str> = prefix
            .split(|c: char| c.is_whitespace() || c == '*')
            .filter(|w| !w.is_empty())
            .collect();
        let only_tag = prefix_words.len() == 1 && DeclarationKind::from_tag_keyword(prefix_words[0]).is_some();
        let statement = prefix_words
            .iter()
            .any(|w| matches!(*w, "return" | "goto" | "case" | "else" | "do" | "sizeof"));
        if is_keyword(name) || only_tag || statement {
            return Ok(());
        }
        self.push(Reference::declaration(kind, name)?, lineno, code)
    }

    fn process(&mut self, item: Parsed) -> Result<()> {
        match item {
            Parsed::Line(line) => {
                self.lineno += 1;
                self.line(&line)
            }
            Parsed::Directive { directive, .. } => {
                self.lineno = directive.lineno() + directive.source_lines().len() - 1;
                self.directive(&directive)
            }
        }
    }
}

impl<I: Iterator<Item = Result<Parsed>>> Iterator for ReferenceExtractor<I> {
    type Item = Result<Reference>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.out.pop() {
                return Some(item);
            }
            if self.out.is_halted() {
                return None;
            }
            match self.items.next() {
                None => self.out.halt(),
                Some(Err(e)) => self.out.fail(e),
                Some(Ok(item)) => {
                    if let Err(e) = self.process(item) {
                        self.out.fail(e);
                    }
                }
            }
        }
    }
}

impl<L> ReferenceExtractor<std::iter::Map<L, fn(Result<String>) -> Result<Parsed>>>
where
    L: Iterator<Item = Result<String>>,
{
    /// Extract from plain lines, without a directive parser in front
    pub fn from_lines<T>(lines: T, extract_symbols: bool) -> Self
    where
        T: IntoIterator<Item = Result<String>, IntoIter = L>,
    {
        let lift: fn(Result<String>) -> Result<Parsed> = lift;
        Self::new(lines.into_iter().map(lift), extract_symbols)
    }
}
