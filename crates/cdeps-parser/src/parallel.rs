//! Parallel file scanning using rayon
//!
//! Runs the extraction pipeline over many files at once. Each file gets its
//! own include traversal and visited set.

use crate::headers::{FsIncludeLoader, HeaderResolver};
use crate::includes::{iter_compiler_refs, NoIncludes};
use crate::lines::{ok_lines, split_lines};
use cdeps_core::config::Config;
use cdeps_core::{Dependency, Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress event for tracking scan progress
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Scanning phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Walking,
    Extracting,
    Complete,
}

/// Dependencies found in one file
pub type FileResult = (PathBuf, Result<Vec<Dependency>>);

/// Parallel scanner over a configured file set
pub struct ParallelScanner {
    config: Config,
    exclude: GlobSet,
    progress_callback: Option<Arc<ProgressCallback>>,
}

impl ParallelScanner {
    /// Create a scanner; fails on an invalid exclude pattern
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.walk.exclude {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid exclude pattern {:?}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            config,
            exclude,
            progress_callback: None,
        })
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Scan multiple files in parallel
    pub fn scan_files(&self, root: &Path, paths: &[PathBuf]) -> Vec<FileResult> {
        let total = paths.len();
        let processed = AtomicUsize::new(0);

        self.emit_progress(ProgressPhase::Extracting, 0, total, "Starting parallel scan...");

        let results: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let result = self.scan_file(root, path);
                if let Err(e) = &result {
                    warn!("{}: {}", path.display(), e);
                }

                let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if current % 10 == 0 || current == total {
                    self.emit_progress(
                        ProgressPhase::Extracting,
                        current,
                        total,
                        format!("Scanned {}/{} files", current, total),
                    );
                }

                (path.clone(), result)
            })
            .collect();

        self.emit_progress(ProgressPhase::Complete, total, total, "Scanning complete");
        results
    }

    /// Files under `dir` with a configured extension, minus excluded ones
    pub fn collect_files(&self, dir: &Path) -> Vec<PathBuf> {
        let extensions = &self.config.walk.extensions;
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| extensions.iter().any(|wanted| wanted == ext))
                    .unwrap_or(false)
            })
            .filter(|e| {
                let relative = e.path().strip_prefix(dir).unwrap_or(e.path());
                !self.exclude.is_match(relative)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    /// Scan a directory recursively
    pub fn scan_directory(&self, dir: &Path) -> Vec<FileResult> {
        self.emit_progress(ProgressPhase::Walking, 0, 0, "Walking directory...");

        let paths = self.collect_files(dir);

        info!("Found {} files to scan", paths.len());
        self.emit_progress(
            ProgressPhase::Walking,
            paths.len(),
            paths.len(),
            format!("Found {} files", paths.len()),
        );

        self.scan_files(dir, &paths)
    }

    /// Scan a single file, following user includes when configured
    pub fn scan_file(&self, root: &Path, path: &Path) -> Result<Vec<Dependency>> {
        let content = std::fs::read_to_string(path)?;
        let filename = path.to_string_lossy();
        let lines = ok_lines(split_lines(&content));

        debug!("Scanning {:?}", path);
        if self.config.scan.follow_includes {
            let resolver = HeaderResolver::from_config(root.to_path_buf(), &self.config.includes);
            let loader = FsIncludeLoader::new(resolver).from_file(path);
            iter_compiler_refs(lines, &filename, loader, &self.config.scan).collect()
        } else {
            iter_compiler_refs(lines, &filename, NoIncludes, &self.config.scan).collect()
        }
    }

    fn emit_progress<S: Into<String>>(&self, phase: ProgressPhase, current: usize, total: usize, message: S) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressEvent {
                phase,
                current,
                total,
                message: message.into(),
            });
        }
    }
}

/// Totals over a set of scanned files
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub failed: usize,
    /// Reference count per kind name
    pub kinds: BTreeMap<String, usize>,
}

/// Summarize scan results
pub fn summarize(results: &[FileResult]) -> ScanSummary {
    let mut summary = ScanSummary {
        files: results.len(),
        ..ScanSummary::default()
    };

    for (_, result) in results {
        match result {
            Ok(dependencies) => {
                for dependency in dependencies {
                    *summary
                        .kinds
                        .entry(dependency.reference.kind_name().to_string())
                        .or_default() += 1;
                }
            }
            Err(_) => summary.failed += 1,
        }
    }

    info!(
        "Scanned {} files ({} failed), {} references",
        summary.files,
        summary.failed,
        summary.kinds.values().sum::<usize>()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn test_parallel_scan() {
        let dir = TempDir::new().unwrap();

        for i in 0..5 {
            let path = dir.path().join(format!("test{}.c", i));
            std::fs::write(&path, format!("#include <stdio.h>\nvoid func{}(void);\n", i)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "int ignored;\n").unwrap();

        let scanner = ParallelScanner::new(Config::default()).unwrap();
        let results = scanner.scan_directory(dir.path());

        assert_eq!(results.len(), 5);
        for (_, result) in &results {
            assert_eq!(result.as_ref().unwrap().len(), 2);
        }

        let summary = summarize(&results);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.kinds.get("include-system"), Some(&5));
        assert_eq!(summary.kinds.get("symbol-function"), Some(&5));
    }

    #[test]
    fn test_excluded_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/gen.c"), "int gen;\n").unwrap();
        std::fs::write(dir.path().join("main.c"), "int main_var;\n").unwrap();

        let scanner = ParallelScanner::new(Config::default()).unwrap();
        let files = scanner.collect_files(dir.path());
        assert_eq!(files, vec![dir.path().join("main.c")]);
    }

    #[test]
    fn test_follow_includes_from_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.c"), "#include \"defs.h\"\n").unwrap();
        std::fs::write(dir.path().join("defs.h"), "#define LIMIT 4\n").unwrap();

        let mut config = Config::default();
        config.scan.follow_includes = true;
        let scanner = ParallelScanner::new(config).unwrap();
        let deps = scanner
            .scan_file(dir.path(), &dir.path().join("main.c"))
            .unwrap();

        let names: Vec<_> = deps.iter().map(|d| d.reference.to_string()).collect();
        assert_eq!(names, vec!["include-user defs.h", "constant LIMIT"]);
    }

    #[test]
    fn test_failures_are_counted_and_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.c"), "#import <x.h>\n").unwrap();
        std::fs::write(dir.path().join("good.c"), "int ok;\n").unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let scanner = ParallelScanner::new(Config::default())
            .unwrap()
            .with_progress(move |event| sink.lock().unwrap().push(event.phase));
        let results = scanner.scan_directory(dir.path());

        assert_eq!(summarize(&results).failed, 1);
        let phases = events.lock().unwrap();
        assert_eq!(phases.first(), Some(&ProgressPhase::Walking));
        assert_eq!(phases.last(), Some(&ProgressPhase::Complete));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let mut config = Config::default();
        config.walk.exclude = vec!["[".into()];
        assert!(matches!(ParallelScanner::new(config), Err(Error::Config(_))));
    }
}
