//! Core type definitions

use crate::error::{Error, Result};
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where an `#include` target is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeOrigin {
    /// `#include <name>`
    System,
    /// `#include "name"`
    User,
}

impl IncludeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncludeOrigin::System => "system",
            IncludeOrigin::User => "user",
        }
    }
}

impl FromStr for IncludeOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system" => Ok(IncludeOrigin::System),
            "user" => Ok(IncludeOrigin::User),
            _ => Err(Error::InvalidReference(format!("unsupported include kind {:?}", s))),
        }
    }
}

/// Kind of a `#define`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefineKind {
    /// Function-like macro
    Macro,
    /// Object-like macro
    Constant,
}

impl DefineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefineKind::Macro => "macro",
            DefineKind::Constant => "constant",
        }
    }
}

impl FromStr for DefineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "macro" => Ok(DefineKind::Macro),
            "constant" => Ok(DefineKind::Constant),
            _ => Err(Error::InvalidReference(format!("unsupported define kind {:?}", s))),
        }
    }
}

/// Kind of a declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarationKind {
    Typedef,
    Struct,
    Enum,
    Union,
    SymbolFunction,
    SymbolVariable,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Typedef => "typedef",
            DeclarationKind::Struct => "struct",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Union => "union",
            DeclarationKind::SymbolFunction => "symbol-function",
            DeclarationKind::SymbolVariable => "symbol-variable",
        }
    }

    /// The tag kind named by a `struct`/`enum`/`union` keyword
    pub fn from_tag_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "struct" => Some(DeclarationKind::Struct),
            "enum" => Some(DeclarationKind::Enum),
            "union" => Some(DeclarationKind::Union),
            _ => None,
        }
    }
}

impl FromStr for DeclarationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "typedef" => Ok(DeclarationKind::Typedef),
            "struct" => Ok(DeclarationKind::Struct),
            "enum" => Ok(DeclarationKind::Enum),
            "union" => Ok(DeclarationKind::Union),
            "symbol-function" | "symbol_function" => Ok(DeclarationKind::SymbolFunction),
            "symbol-variable" | "symbol_variable" => Ok(DeclarationKind::SymbolVariable),
            _ => Err(Error::InvalidReference(format!(
                "unsupported declaration kind {:?}",
                s
            ))),
        }
    }
}

/// Top-level classification of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopKind {
    Include,
    Define,
    Declaration,
}

/// A name found while scanning scrubbed source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reference {
    Include {
        origin: IncludeOrigin,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Define {
        kind: DefineKind,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Declaration {
        kind: DeclarationKind,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
}

fn checked_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        Err(Error::InvalidReference("reference names must not be empty".into()))
    } else {
        Ok(name)
    }
}

impl Reference {
    pub fn include(origin: IncludeOrigin, name: impl Into<String>) -> Result<Self> {
        Ok(Reference::Include {
            origin,
            name: checked_name(name.into())?,
            location: None,
        })
    }

    pub fn define(kind: DefineKind, name: impl Into<String>) -> Result<Self> {
        Ok(Reference::Define {
            kind,
            name: checked_name(name.into())?,
            location: None,
        })
    }

    pub fn declaration(kind: DeclarationKind, name: impl Into<String>) -> Result<Self> {
        Ok(Reference::Declaration {
            kind,
            name: checked_name(name.into())?,
            location: None,
        })
    }

    /// Build a reference from a kind name such as `"struct"`, `"macro"` or
    /// `"include-user"`. Unknown kinds are rejected.
    pub fn new(kind: &str, name: impl Into<String>) -> Result<Self> {
        if let Some(origin) = kind.strip_prefix("include-") {
            return Self::include(origin.parse()?, name);
        }
        if let Ok(define) = kind.parse::<DefineKind>() {
            return Self::define(define, name);
        }
        Self::declaration(kind.parse()?, name)
    }

    pub fn with_location(mut self, loc: Location) -> Self {
        match &mut self {
            Reference::Include { location, .. }
            | Reference::Define { location, .. }
            | Reference::Declaration { location, .. } => *location = Some(loc),
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Reference::Include { name, .. }
            | Reference::Define { name, .. }
            | Reference::Declaration { name, .. } => name,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Reference::Include { location, .. }
            | Reference::Define { location, .. }
            | Reference::Declaration { location, .. } => location.as_ref(),
        }
    }

    pub fn top_kind(&self) -> TopKind {
        match self {
            Reference::Include { .. } => TopKind::Include,
            Reference::Define { .. } => TopKind::Define,
            Reference::Declaration { .. } => TopKind::Declaration,
        }
    }

    pub fn is_include(&self) -> bool {
        self.top_kind() == TopKind::Include
    }

    /// The fine-grained kind name, e.g. `include-user` or `struct`
    pub fn kind_name(&self) -> &'static str {
        match self {
            Reference::Include {
                origin: IncludeOrigin::System,
                ..
            } => "include-system",
            Reference::Include {
                origin: IncludeOrigin::User,
                ..
            } => "include-user",
            Reference::Define { kind, .. } => kind.as_str(),
            Reference::Declaration { kind, .. } => kind.as_str(),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind_name(), self.name())
    }
}

/// What pulled a dependency in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parent {
    /// Found directly in the scanned file
    Location(Location),
    /// Found in a file pulled in by this include
    Reference(Box<Reference>),
}

/// A reference placed in the include graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub reference: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    /// Where the reference resolves to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_at: Option<Location>,
}

impl Dependency {
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            parent: None,
            defined_at: None,
        }
    }

    pub fn with_parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_defined_at(mut self, location: Location) -> Self {
        self.defined_at = Some(location);
        self
    }

    pub fn is_include(&self) -> bool {
        self.reference.is_include()
    }

    /// The include that pulled this dependency in, if any
    pub fn parent_reference(&self) -> Option<&Reference> {
        match &self.parent {
            Some(Parent::Reference(reference)) => Some(reference),
            _ => None,
        }
    }
}
