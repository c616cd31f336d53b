//! Header File Resolver
//!
//! Resolves user include names against the including file's directory and a
//! list of include directories, and loads them for recursive extraction.

use crate::includes::{IncludeLoader, LoadedInclude};
use crate::lines::split_lines;
use cdeps_core::config::IncludeConfig;
use cdeps_core::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header file resolver for C projects
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    /// Project root directory
    root: PathBuf,
    /// Include search paths
    include_paths: Vec<PathBuf>,
}

impl HeaderResolver {
    /// Create a new header resolver
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            include_paths: Vec::new(),
        }
    }

    /// Create a resolver using the configured include directories.
    /// Relative directories are taken relative to `root`.
    pub fn from_config(root: PathBuf, config: &IncludeConfig) -> Self {
        let mut resolver = Self::new(root);
        for dir in &config.include_dirs {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                resolver.root.join(dir)
            };
            resolver.add_include_path(dir);
        }
        resolver
    }

    /// Add an include path
    pub fn add_include_path(&mut self, path: PathBuf) {
        if !self.include_paths.contains(&path) {
            self.include_paths.push(path);
        }
    }

    /// Get all include paths
    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    /// Get include paths that actually exist
    pub fn existing_include_paths(&self) -> Vec<PathBuf> {
        self.include_paths
            .iter()
            .filter(|p| p.is_dir())
            .cloned()
            .collect()
    }

    /// Resolve a header file path
    ///
    /// Quoted includes are looked up next to the including file first, then
    /// in the include paths, then relative to the project root.
    pub fn resolve(&self, header: &str, from_file: Option<&Path>) -> Option<PathBuf> {
        if let Some(parent) = from_file.and_then(Path::parent) {
            let relative_path = parent.join(header);
            if relative_path.is_file() {
                debug!("Resolved {} relative to {:?}", header, parent);
                return Some(relative_path);
            }
        }

        for include_path in &self.include_paths {
            let full_path = include_path.join(header);
            if full_path.is_file() {
                debug!("Resolved {} in {:?}", header, include_path);
                return Some(full_path);
            }
        }

        let root_relative = self.root.join(header);
        if root_relative.is_file() {
            debug!("Resolved {} relative to root", header);
            return Some(root_relative);
        }

        debug!("Failed to resolve header: {}", header);
        None
    }
}

/// Loads user includes from disk for [`crate::iter_compiler_refs`]
#[derive(Debug, Clone)]
pub struct FsIncludeLoader {
    resolver: HeaderResolver,
    /// The root file whose includes are being followed
    from_file: Option<PathBuf>,
}

impl FsIncludeLoader {
    pub fn new(resolver: HeaderResolver) -> Self {
        Self {
            resolver,
            from_file: None,
        }
    }

    /// Look up the root file's quoted includes next to `path` first.
    /// Includes inside loaded headers are looked up next to those headers.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.from_file = Some(path.into());
        self
    }
}

impl IncludeLoader for FsIncludeLoader {
    fn load_include(&mut self, name: &str, from: Option<&str>) -> Result<Option<LoadedInclude>> {
        let from = from.map(Path::new).or(self.from_file.as_deref());
        let Some(path) = self.resolver.resolve(name, from) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<String> = split_lines(&content).collect();
        Ok(Some(LoadedInclude::new(lines, path.to_string_lossy())))
    }
}
