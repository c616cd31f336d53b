//! cdeps Parser
//!
//! Line-oriented scrubbing and dependency extraction for C sources.
//!
//! ## Modules
//!
//! - `lines` - Line terminator model and validated line streams
//! - `comments` - Comment scrubbing
//! - `strings` - String literal scrubbing
//! - `preprocessor` - Directive model and parser
//! - `references` - Reference extraction from scrubbed source
//! - `includes` - Recursive extraction across user includes
//! - `headers` - Include resolution on the filesystem
//! - `parallel` - Parallel directory scanning using rayon
//!
//! Every stage is a lazy iterator over `Result` items and keeps the line
//! count, the character length and the terminator of every line.

pub mod comments;
pub mod continuation;
pub mod headers;
pub mod includes;
pub mod lines;
pub mod parallel;
pub mod preprocessor;
pub mod references;
pub mod strings;
pub mod text;

pub use comments::{replace_comments, CommentScrubber};
pub use headers::{FsIncludeLoader, HeaderResolver};
pub use includes::{iter_compiler_refs, CompilerRefs, IncludeLoader, LoadedInclude, NoIncludes};
pub use lines::{split_lines, LineStream, LineTerminatorInfo, Terminator};
pub use preprocessor::{Directive, DirectiveKind, DirectiveMode, DirectiveParser, Parsed};
pub use references::ReferenceExtractor;
pub use strings::{replace_strings, StringScrubber};

use cdeps_core::config::{Config, ScanConfig};
use cdeps_core::{Reference, Result};
use lines::ok_lines;
use preprocessor::parse_directives;

/// Comment and string scrubbing, in that order
pub type Scrubbed<I> = StringScrubber<CommentScrubber<I>>;

/// The full single-file extraction pipeline
pub type References<I> = ReferenceExtractor<DirectiveParser<Scrubbed<I>>>;

/// Scrub comments, then string literal contents
pub fn scrub_lines<I>(lines: I, keep_includes: bool) -> Scrubbed<I::IntoIter>
where
    I: IntoIterator<Item = Result<String>>,
{
    replace_strings(replace_comments(lines), keep_includes)
}

/// Scrub a whole source text
pub fn scrub_source(source: &str, keep_includes: bool) -> Result<String> {
    scrub_lines(ok_lines(split_lines(source)), keep_includes).collect()
}

/// Extract the references of a single file, without following includes
pub fn extract_references<I>(lines: I, filename: &str, config: &ScanConfig) -> References<I::IntoIter>
where
    I: IntoIterator<Item = Result<String>>,
{
    let parsed = parse_directives(scrub_lines(lines, config.keep_includes), DirectiveMode::Identify)
        .with_filename(filename);
    ReferenceExtractor::new(parsed, config.extract_symbols).with_filename(filename)
}

/// Directives and references of one source text
#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub directives: Vec<Directive>,
    pub references: Vec<Reference>,
}

/// Scan a source text for directives and references
pub fn scan_source(source: &str, filename: &str, config: &Config) -> Result<ScanResult> {
    let scrubbed = scrub_lines(ok_lines(split_lines(source)), config.scan.keep_includes);
    let directives = parse_directives(scrubbed, DirectiveMode::Identify)
        .with_filename(filename)
        .directives()
        .collect::<Result<Vec<_>>>()?;
    let references = extract_references(ok_lines(split_lines(source)), filename, &config.scan)
        .collect::<Result<Vec<_>>>()?;
    Ok(ScanResult {
        directives,
        references,
    })
}

#[cfg(test)]
mod tests;
