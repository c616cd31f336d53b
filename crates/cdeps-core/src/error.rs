//! Error types for cdeps

use crate::location::Location;
use thiserror::Error;

/// cdeps error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inconsistent line terminator at line {line}: expected {expected}, found {found}")]
    InconsistentTerminator {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("{location}: unsupported construct: {text}")]
    UnsupportedConstruct { location: Location, text: String },

    #[error("{location}: unsupported directive kind `{kind}`")]
    UnsupportedDirectiveKind { location: Location, kind: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an `UnsupportedConstruct` error for a raw source line
    pub fn unsupported(location: Location, text: &str) -> Self {
        Error::UnsupportedConstruct {
            location,
            text: text.trim_end().to_string(),
        }
    }
}

/// Result type alias for cdeps
pub type Result<T> = std::result::Result<T, Error>;
