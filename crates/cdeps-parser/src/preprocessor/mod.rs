//! Preprocessor directive recognition
//!
//! Directives are modeled syntactically. Macros are not expanded and
//! conditional branches are not evaluated.

pub mod directive;
pub mod parser;

pub use directive::{Directive, DirectiveKind, DirectiveValue, IncludeTarget};
pub use parser::{parse_directives, DirectiveMode, DirectiveParser, Parsed, ParsedLines};
