//! Recursive reference extraction across user includes
//!
//! [`iter_compiler_refs`] sweeps a file and, depth-first, every user header
//! it includes that a caller-supplied [`IncludeLoader`] can provide. Each
//! header is loaded at most once per traversal.

use crate::extract_references;
use crate::lines::ok_lines;
use cdeps_core::config::ScanConfig;
use cdeps_core::{Dependency, IncludeOrigin, Location, Parent, Reference, Result};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Lines of an include, as handed out by a loader
pub struct LoadedInclude {
    pub lines: Box<dyn Iterator<Item = String>>,
    /// Resolved name of the loaded file
    pub filename: String,
}

impl LoadedInclude {
    pub fn new<I>(lines: I, filename: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'static,
    {
        Self {
            lines: Box::new(lines.into_iter()),
            filename: filename.into(),
        }
    }
}

impl std::fmt::Debug for LoadedInclude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedInclude")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Source of user include contents.
///
/// `from` is the resolved filename of the included file that holds the
/// `#include`, or `None` when it sits in the root file. `Ok(None)` means the
/// include is not available and is skipped.
pub trait IncludeLoader {
    fn load_include(&mut self, name: &str, from: Option<&str>) -> Result<Option<LoadedInclude>>;
}

impl<F> IncludeLoader for F
where
    F: FnMut(&str, Option<&str>) -> Result<Option<LoadedInclude>>,
{
    fn load_include(&mut self, name: &str, from: Option<&str>) -> Result<Option<LoadedInclude>> {
        self(name, from)
    }
}

/// Loader that never provides anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeLoader for NoIncludes {
    fn load_include(&mut self, _name: &str, _from: Option<&str>) -> Result<Option<LoadedInclude>> {
        Ok(None)
    }
}

struct Frame<'a> {
    references: Box<dyn Iterator<Item = Result<Reference>> + 'a>,
    parent: Parent,
    /// Resolved file being swept; `None` for the root
    file: Option<String>,
}

/// Depth-first dependency stream, see [`iter_compiler_refs`]
pub struct CompilerRefs<'a, L: IncludeLoader> {
    stack: Vec<Frame<'a>>,
    loader: L,
    visited: HashSet<String>,
    /// Resolved files already swept
    files: HashSet<String>,
    config: ScanConfig,
    failed: bool,
}

impl<'a, L: IncludeLoader> CompilerRefs<'a, L> {
    /// Include names already followed, plus the root filename
    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Load an unvisited user include and push its sweep.
    /// Returns the resolved file when something was loaded.
    fn follow(&mut self, reference: &Reference) -> Result<Option<Location>> {
        let Reference::Include { origin, name, .. } = reference else {
            return Ok(None);
        };
        if *origin == IncludeOrigin::System {
            trace!("Not following system include {}", name);
            return Ok(None);
        }
        if !self.visited.insert(name.clone()) {
            trace!("Already visited {}", name);
            return Ok(None);
        }
        let from = self.stack.last().and_then(|frame| frame.file.clone());
        let Some(loaded) = self.loader.load_include(name, from.as_deref())? else {
            debug!("Include {} not available", name);
            return Ok(None);
        };
        if !self.files.insert(loaded.filename.clone()) {
            trace!("Already swept {}", loaded.filename);
            return Ok(None);
        }
        debug!("Following {} into {}", name, loaded.filename);

        let references = extract_references(ok_lines(loaded.lines), &loaded.filename, &self.config);
        self.stack.push(Frame {
            references: Box::new(references),
            parent: Parent::Reference(Box::new(reference.clone())),
            file: Some(loaded.filename.clone()),
        });
        Ok(Some(Location::in_file(loaded.filename)))
    }
}

impl<'a, L: IncludeLoader> Iterator for CompilerRefs<'a, L> {
    type Item = Result<Dependency>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let frame = self.stack.last_mut()?;
            let reference = match frame.references.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                Some(Ok(reference)) => reference,
            };
            let dependency = Dependency::new(reference.clone()).with_parent(frame.parent.clone());
            return match self.follow(&reference) {
                Ok(Some(resolved)) => Some(Ok(dependency.with_defined_at(resolved))),
                Ok(None) => Some(Ok(dependency)),
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            };
        }
    }
}

/// Extract dependencies from `lines` and, recursively, from every user
/// include `loader` provides.
///
/// An include is yielded before the contents of the file it pulls in.
/// System includes are never followed. `filename` seeds the visited set, so
/// a header including itself (directly or through others) is swept once.
pub fn iter_compiler_refs<'a, I, L>(
    lines: I,
    filename: &str,
    loader: L,
    config: &ScanConfig,
) -> CompilerRefs<'a, L>
where
    I: IntoIterator<Item = Result<String>>,
    I::IntoIter: 'a,
    L: IncludeLoader,
{
    let root = Frame {
        references: Box::new(extract_references(lines, filename, config)),
        parent: Parent::Location(Location::in_file(filename)),
        file: None,
    };
    CompilerRefs {
        stack: vec![root],
        loader,
        visited: HashSet::from([filename.to_string()]),
        files: HashSet::from([filename.to_string()]),
        config: config.clone(),
        failed: false,
    }
}
