//! Source code location types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where a directive or reference was found.
///
/// Line and column are 1-based. A column is only meaningful together with a
/// line, so constructors refuse a column without one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Location {
    /// Create a location, validating the line/column combination
    pub fn new(file: Option<String>, line: Option<u32>, column: Option<u32>) -> Result<Self> {
        if line == Some(0) {
            return Err(Error::InvalidLocation("line numbers start at 1".into()));
        }
        match (line, column) {
            (_, Some(0)) => Err(Error::InvalidLocation("columns start at 1".into())),
            (None, Some(column)) => Err(Error::InvalidLocation(format!(
                "column {} given without a line",
                column
            ))),
            _ => Ok(Self {
                file,
                line,
                column,
                text: None,
            }),
        }
    }

    /// A location naming only a file
    pub fn in_file(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// A location at a (1-based) line of an optional file
    pub fn at_line(file: Option<&str>, line: u32) -> Self {
        Self {
            file: file.map(str::to_string),
            line: Some(line.max(1)),
            ..Self::default()
        }
    }

    /// Attach a (1-based) column; fails when no line is set
    pub fn with_column(self, column: u32) -> Result<Self> {
        Self::new(self.file, self.line, Some(column)).map(|loc| Self {
            text: self.text,
            ..loc
        })
    }

    /// Attach the raw source snippet
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file.as_deref().unwrap_or("<input>"))?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_requires_line() {
        assert!(Location::new(Some("a.c".into()), None, Some(3)).is_err());
        assert!(Location::in_file("a.c").with_column(3).is_err());

        let loc = Location::at_line(Some("a.c"), 7).with_column(3).unwrap();
        assert_eq!(loc.line(), Some(7));
        assert_eq!(loc.column(), Some(3));
    }

    #[test]
    fn test_zero_positions_rejected() {
        assert!(Location::new(None, Some(0), None).is_err());
        assert!(Location::new(None, Some(1), Some(0)).is_err());
    }

    #[test]
    fn test_display() {
        let loc = Location::at_line(Some("src/x.h"), 12).with_column(5).unwrap();
        assert_eq!(loc.to_string(), "src/x.h:12:5");
        assert_eq!(Location::at_line(None, 3).to_string(), "<input>:3");
        assert_eq!(Location::in_file("y.c").to_string(), "y.c");
    }

    #[test]
    fn test_snippet_is_independent() {
        let loc = Location::in_file("z.c").with_text("#include <z.h>");
        assert_eq!(loc.text(), Some("#include <z.h>"));
        assert_eq!(loc.line(), None);
    }
}
