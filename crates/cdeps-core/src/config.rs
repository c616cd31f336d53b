//! Configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// cdeps configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scrubbing and extraction options
    pub scan: ScanConfig,

    /// Include resolution
    pub includes: IncludeConfig,

    /// Directory walking
    pub walk: WalkConfig,
}

impl Config {
    /// Parse a YAML configuration document
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Scrubbing and extraction options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Leave `#include "..."` lines untouched when blanking string literals
    pub keep_includes: bool,

    /// Report top-level tags, functions and variables
    pub extract_symbols: bool,

    /// Recurse into user includes
    pub follow_includes: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            keep_includes: true,
            extract_symbols: true,
            follow_includes: false,
        }
    }
}

/// Include resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    /// Directories searched for user includes, in order
    pub include_dirs: Vec<PathBuf>,
}

/// Directory walking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// File extensions to scan
    pub extensions: Vec<String>,

    /// Glob patterns excluded from scanning
    pub exclude: Vec<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["c".into(), "h".into()],
            exclude: vec!["**/.git/**".into(), "**/build/**".into()],
        }
    }
}
