//! Integration tests for include graph traversal on a real file tree
//!
//! Builds a small project on disk and follows its user includes through the
//! filesystem loader.

use cdeps_core::config::{Config, IncludeConfig, ScanConfig};
use cdeps_core::{Dependency, Parent, TopKind};
use cdeps_parser::lines::{ok_lines, split_lines};
use cdeps_parser::parallel::{summarize, ParallelScanner};
use cdeps_parser::{iter_compiler_refs, FsIncludeLoader, HeaderResolver};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const MAIN_C: &str = r#"#include <stdlib.h>
#include "list.h"
#include "util/log.h"

static struct list *registry;

int main(void)
{
    log_msg("start");
    return 0;
}
"#;

const LIST_H: &str = r#"#ifndef LIST_H
#define LIST_H

#include "util/log.h"

typedef struct list {
    struct list *next;
    void *item;
} list_t;

struct list *list_push(struct list *head, void *item);

#endif /* LIST_H */
"#;

const LOG_H: &str = r#"#ifndef LOG_H
#define LOG_H
#include "list.h"
#define log_msg(m) puts(m)
#endif
"#;

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("include/util")).unwrap();
    fs::write(root.join("src/main.c"), MAIN_C).unwrap();
    fs::write(root.join("include/list.h"), LIST_H).unwrap();
    fs::write(root.join("include/util/log.h"), LOG_H).unwrap();
    temp
}

fn follow(root: &std::path::Path) -> Vec<Dependency> {
    let main = root.join("src/main.c");
    let source = fs::read_to_string(&main).unwrap();
    let resolver = HeaderResolver::from_config(
        root.to_path_buf(),
        &IncludeConfig {
            include_dirs: vec![PathBuf::from("include")],
        },
    );
    let loader = FsIncludeLoader::new(resolver).from_file(&main);
    iter_compiler_refs(
        ok_lines(split_lines(&source)),
        "src/main.c",
        loader,
        &ScanConfig::default(),
    )
    .collect::<cdeps_core::Result<_>>()
    .unwrap()
}

#[test]
fn test_follows_includes_depth_first() {
    let temp = project();
    let deps = follow(temp.path());

    let names: Vec<_> = deps.iter().map(|d| d.reference.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "include-system stdlib.h",
            "include-user list.h",
            "constant LIST_H",
            "include-user util/log.h",
            "constant LOG_H",
            "include-user list.h",
            "macro log_msg",
            "struct list",
            "typedef list_t",
            "symbol-function list_push",
            "include-user util/log.h",
            "symbol-variable registry",
            "symbol-function main",
        ]
    );
}

#[test]
fn test_each_header_is_loaded_once() {
    let temp = project();
    let deps = follow(temp.path());

    let loaded: Vec<_> = deps
        .iter()
        .filter_map(|d| d.defined_at.as_ref().and_then(|l| l.file()))
        .collect();
    assert_eq!(loaded.len(), 2);
    assert!(loaded[0].ends_with("list.h"));
    assert!(loaded[1].ends_with("log.h"));
}

#[test]
fn test_parents_describe_the_graph() {
    let temp = project();
    let deps = follow(temp.path());

    for dep in deps.iter().filter(|d| d.reference.top_kind() == TopKind::Declaration) {
        let file = dep.reference.location().and_then(|l| l.file()).unwrap();
        match &dep.parent {
            Some(Parent::Location(root)) => {
                assert_eq!(root.file(), Some("src/main.c"));
                assert_eq!(file, "src/main.c");
            }
            Some(Parent::Reference(include)) => assert!(file.ends_with(include.name())),
            None => panic!("dependency without parent: {:?}", dep),
        }
    }
}

#[test]
fn test_directory_scan_with_follow() {
    let temp = project();
    fs::write(temp.path().join("config.yaml"), "scan:\n  follow_includes: true\nincludes:\n  include_dirs: [include]\n").unwrap();
    let config = Config::load(&temp.path().join("config.yaml")).unwrap();

    let scanner = ParallelScanner::new(config).unwrap();
    let results = scanner.scan_directory(temp.path());
    assert_eq!(results.len(), 3);

    let summary = summarize(&results);
    assert_eq!(summary.failed, 0);
    assert!(summary.kinds["include-user"] >= 4);
}

#[test]
fn test_nested_include_relative_to_its_header() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src/sub")).unwrap();
    fs::write(root.join("src/main.c"), "#include \"sub/a.h\"\n").unwrap();
    fs::write(root.join("src/sub/a.h"), "#include \"b.h\"\n").unwrap();
    fs::write(root.join("src/sub/b.h"), "#define FROM_B 1\n").unwrap();

    let mut config = Config::default();
    config.scan.follow_includes = true;
    let scanner = ParallelScanner::new(config).unwrap();
    let deps = scanner.scan_file(root, &root.join("src/main.c")).unwrap();

    let names: Vec<_> = deps.iter().map(|d| d.reference.to_string()).collect();
    assert_eq!(
        names,
        vec!["include-user sub/a.h", "include-user b.h", "constant FROM_B"]
    );
    let b = deps[1].defined_at.as_ref().and_then(|l| l.file()).unwrap();
    assert!(b.ends_with("b.h"));
    assert!(b.contains("sub"));
}
