//! End-to-end tests for the cdeps pipeline
//!
//! These run whole C snippets through scrubbing, directive parsing and
//! reference extraction.

use super::*;
use crate::lines::ok_lines;
use crate::preprocessor::{parse_directives, DirectiveValue};
use cdeps_core::{Error, IncludeOrigin, TopKind};
use pretty_assertions::assert_eq;

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

fn scrubbed(lines: &[&str]) -> Vec<String> {
    scrub_lines(ok_lines(owned(lines)), true)
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

/// Every output line has the length and terminator of its input line
fn assert_same_geometry(input: &[&str], output: &[String]) {
    assert_eq!(input.len(), output.len());
    for (i, o) in input.iter().zip(output) {
        assert_eq!(i.chars().count(), o.chars().count(), "{:?} -> {:?}", i, o);
        assert_eq!(
            Terminator::of(i),
            Terminator::of(o),
            "terminator changed: {:?} -> {:?}",
            i,
            o
        );
    }
}

const DRIVER: &[&str] = &[
    "/* driver.c - sample */\n",
    "#include <linux/module.h>\n",
    "#include \"driver.h\"  // local\n",
    "\n",
    "#define DRV_NAME \"drv\"\n",
    "#define MAX(a, b) \\\n",
    "    ((a) > (b) ? (a) : (b))\n",
    "\n",
    "typedef struct drv_state {\n",
    "    int open; /* { not a brace */\n",
    "    char *name;\n",
    "} drv_state_t;\n",
    "\n",
    "static const char *banner = \"hello { world\";\n",
    "static int drv_probe(struct device *dev)\n",
    "{\n",
    "    const char *msg = \"multi \\\n",
    "line }\";\n",
    "    return MAX(1, 2);\n",
    "}\n",
];

#[test]
fn test_single_line_comment_scenario() {
    let output = scrubbed(&["int x = 1; // set x\n"]);
    assert_eq!(output, vec!["int x = 1;         \n"]);
}

#[test]
fn test_block_comment_scenario() {
    let input = ["/* start\n", "middle\n", "end */ int y;\n"];
    let output = scrubbed(&input);
    assert_eq!(output[0].trim(), "");
    assert_eq!(output[1].trim(), "");
    assert_eq!(output[2], "       int y;\n");
    assert_same_geometry(&input, &output);
}

#[test]
fn test_continued_define_scenario() {
    let directives: Vec<_> = parse_directives(
        scrub_lines(ok_lines(owned(&["#define FOO(a, b) \\\n", "    (a) + (b)\n"])), true),
        DirectiveMode::Identify,
    )
    .directives()
    .collect::<Result<_>>()
    .unwrap();

    assert_eq!(directives.len(), 1);
    let foo = &directives[0];
    assert_eq!(foo.kind(), DirectiveKind::Define);
    assert_eq!(foo.name(), Some("FOO"));
    assert_eq!(foo.params(), Some(&["a".to_string(), "b".to_string()][..]));
    assert_eq!(foo.value(), &DirectiveValue::Body("(a) + (b)".into()));
    assert_eq!(foo.source_lines().len(), 2);
}

#[test]
fn test_include_scenario() {
    let refs: Vec<_> = extract_references(
        ok_lines(owned(&["#include <stdio.h>\n", "#include \"local.h\"\n"])),
        "main.c",
        &ScanConfig::default(),
    )
    .collect::<Result<_>>()
    .unwrap();

    assert_eq!(refs.len(), 2);
    assert!(matches!(
        &refs[0],
        Reference::Include { origin: IncludeOrigin::System, name, .. } if name == "stdio.h"
    ));
    assert!(matches!(
        &refs[1],
        Reference::Include { origin: IncludeOrigin::User, name, .. } if name == "local.h"
    ));
}

#[test]
fn test_split_string_scenario() {
    let input = ["char *s = \"abc\\\n", "def\";\n"];
    let output = scrubbed(&input);
    assert_eq!(output, vec!["char *s = \"    \n", "   \";\n"]);
    assert_same_geometry(&input, &output);
}

#[test]
fn test_comments_after_a_continued_string_are_scrubbed() {
    let input = ["char *s = \"abc\\\n", "def\"; // typedef oops\n", "int y;\n"];
    let output = scrubbed(&input);
    assert_eq!(output[1], format!("   \"; {}\n", " ".repeat(15)));
    assert_same_geometry(&input, &output);

    let result = scan_source(&input.concat(), "s.c", &Config::default()).unwrap();
    assert!(result
        .references
        .iter()
        .all(|r| r.kind_name() != "typedef"));

    let input = ["s = \"x\\\n", "y\"; /* a\n", "typedef junk */ int z;\n"];
    let output = scrubbed(&input);
    assert_eq!(output[1], " \";     \n");
    assert_eq!(output[2], format!("{}int z;\n", " ".repeat(16)));
    assert!(scan_source(&input.concat(), "t.c", &Config::default()).is_ok());
}

#[test]
fn test_every_stage_keeps_geometry() {
    let comments: Vec<_> = replace_comments(ok_lines(owned(DRIVER)))
        .collect::<Result<_>>()
        .unwrap();
    assert_same_geometry(DRIVER, &comments);

    let strings: Vec<_> = replace_strings(ok_lines(owned(DRIVER)), false)
        .collect::<Result<_>>()
        .unwrap();
    assert_same_geometry(DRIVER, &strings);

    for mode in [DirectiveMode::Identify, DirectiveMode::normalize(), DirectiveMode::blank()] {
        let lines: Vec<_> = parse_directives(scrub_lines(ok_lines(owned(DRIVER)), true), mode)
            .lines()
            .collect::<Result<_>>()
            .unwrap();
        assert_same_geometry(DRIVER, &lines);
    }
}

#[test]
fn test_geometry_with_crlf_and_unterminated_last_line() {
    let input = [
        "int a; /* x\r\n",
        "y */ char *s = \"q\";\r\n",
        "#  define  Z  1\r\n",
        "// tail",
    ];
    let lines: Vec<_> = parse_directives(scrub_lines(ok_lines(owned(&input)), true), DirectiveMode::normalize())
        .lines()
        .collect::<Result<_>>()
        .unwrap();
    assert_same_geometry(&input, &lines);
    assert_eq!(lines[2], "#define Z 1    \r\n");
    assert_eq!(lines[3], "       ");
}

#[test]
fn test_scrubbers_are_idempotent() {
    let once = scrubbed(DRIVER);
    let refs: Vec<&str> = once.iter().map(String::as_str).collect();
    assert_eq!(scrubbed(&refs), once);
}

#[test]
fn test_scan_driver_source() {
    let source = DRIVER.concat();
    let result = scan_source(&source, "driver.c", &Config::default()).unwrap();

    let kinds: Vec<_> = result.directives.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            DirectiveKind::Include,
            DirectiveKind::Include,
            DirectiveKind::Define,
            DirectiveKind::Define,
        ]
    );

    let names: Vec<_> = result.references.iter().map(|r| r.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "include-system linux/module.h",
            "include-user driver.h",
            "constant DRV_NAME",
            "macro MAX",
            "struct drv_state",
            "typedef drv_state_t",
            "symbol-variable banner",
            "symbol-function drv_probe",
        ]
    );

    let probe = &result.references[7];
    assert_eq!(probe.top_kind(), TopKind::Declaration);
    let location = probe.location().unwrap();
    assert_eq!(location.file(), Some("driver.c"));
    assert_eq!(location.line(), Some(15));
    assert_eq!(location.column(), Some(12));
}

#[test]
fn test_errors_carry_locations() {
    let err = scan_source("int a;\n#include FOO\n", "x.c", &Config::default()).unwrap_err();
    match err {
        Error::UnsupportedConstruct { location, text } => {
            assert_eq!(location.to_string(), "x.c:2");
            assert_eq!(text, "#include FOO");
        }
        other => panic!("unexpected {:?}", other),
    }

    let err = scan_source("a\nb\r\n", "y.c", &Config::default()).unwrap_err();
    assert!(matches!(err, Error::InconsistentTerminator { line: 2, .. }));
}

#[test]
fn test_scrub_source() {
    let text = scrub_source("x = \"s\"; // c\n#include \"a.h\"\n", true).unwrap();
    assert_eq!(text, "x = \" \";     \n#include \"a.h\"\n");
}
