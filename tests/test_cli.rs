// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Tests for the reorder-fields binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const POINT_H: &str = "struct Point {\n  int x;\n  int y;\n};\n";
const POINT_C: &str = "#include \"point.h\"\nstruct Point p = {1, 2};\n";

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("point.h"), POINT_H).unwrap();
    fs::write(dir.path().join("point.c"), POINT_C).unwrap();
    fs::write(dir.path().join("README.md"), "not a source\n").unwrap();
    dir
}

fn run(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_reorder-fields"))
        .args(args)
        .arg(dir)
        .output()
        .expect("Failed to run reorder-fields")
}

#[test]
fn test_prints_rewritten_files() {
    let dir = setup();
    let output = run(&["--record-name", "Point", "--fields-order", "y,x"], dir.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "#include \"point.h\"\nstruct Point p = {2, 1};\nstruct Point {\n  int y;\n  int x;\n};\n"
    );
    assert_eq!(fs::read_to_string(dir.path().join("point.h")).unwrap(), POINT_H);
}

#[test]
fn test_in_place() {
    let dir = setup();
    let output = run(&["--record-name", "Point", "--fields-order", "y, x", "-i"], dir.path());
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join("point.h")).unwrap(),
        "struct Point {\n  int y;\n  int x;\n};\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("point.c")).unwrap(),
        "#include \"point.h\"\nstruct Point p = {2, 1};\n"
    );
    // No staging files left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[test]
fn test_json_plan() {
    let dir = setup();
    let output = run(&["--record-name", "Point", "--fields-order", "y,x", "--json"], dir.path());
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files = json["files"].as_object().unwrap();
    assert_eq!(files.len(), 2);
    let header = files
        .iter()
        .find(|(path, _)| path.ends_with("point.h"))
        .map(|(_, r)| r.as_array().unwrap())
        .unwrap();
    assert_eq!(header.len(), 2);
    assert_eq!(header[0]["text"], "int y;");
    assert_eq!(header[1]["text"], "int x;");
}

#[test]
fn test_dependency_warning_on_stderr() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("s.cpp"),
        "class S {\n  S() : a(1), b(a) {}\n  int a;\n  int b;\n};\n",
    )
    .unwrap();
    let output = run(&["--record-name", "S", "--fields-order", "b,a", "-i"], dir.path());
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("s.cpp:2:15: warning: reordering field a after b makes a uninitialized"));
}

#[test]
fn test_errors_exit_nonzero() {
    let dir = setup();
    let output = run(&["--record-name", "Point", "--fields-order", "y"], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Number of provided fields (1) doesn't match definition (2)"));

    let output = run(&["--record-name", "Missing", "--fields-order", "a"], dir.path());
    assert!(!output.status.success());

    let empty = TempDir::new().unwrap();
    let output = run(&["--record-name", "Point", "--fields-order", "y,x"], empty.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No C/C++ sources found"));
}

#[test]
fn test_ineligible_record_left_unchanged() {
    let dir = TempDir::new().unwrap();
    let text = "struct S {\n  int a;\n#if WIDE\n  int b;\n#endif\n};\n";
    fs::write(dir.path().join("s.h"), text).unwrap();
    let output = run(&["--record-name", "S", "--fields-order", "b,a", "-i"], dir.path());
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("s.h")).unwrap(), text);
}
