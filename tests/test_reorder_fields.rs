// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! End-to-end tests for planning field reorders over multi-file corpora.

use reorder_fields::{
    reorder_fields, ReorderError, ReorderOutcome, ReplacementPlan, SourceCorpus, SourceModel, UnsafeSyntax,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn corpus(files: &[(&str, &str)]) -> SourceCorpus {
    SourceCorpus::from_sources(
        files
            .iter()
            .map(|(p, t)| (PathBuf::from(p), t.to_string()))
            .collect(),
    )
    .unwrap()
}

/// Apply `plan` to every file, keyed by path.
fn apply(corpus: &SourceCorpus, plan: &ReplacementPlan) -> BTreeMap<String, String> {
    corpus
        .files()
        .iter()
        .map(|f| (f.path().display().to_string(), plan.apply_to(f.path(), f.text())))
        .collect()
}

fn rewrite(files: &[(&str, &str)], record: &str, order: &[&str]) -> BTreeMap<String, String> {
    let c = corpus(files);
    let outcome = reorder_fields(&c, record, order).unwrap();
    apply(&c, outcome.plan().expect("record should be eligible"))
}

const SHAPE_H: &str = "struct Shape {
  // x position
  int x;
  char *name; /* owned */
  double scale;
};
";

const SHAPE_C: &str = "#include \"shape.h\"
struct Shape origin = {0, \"origin\", 1.0};
";

#[test]
fn test_definition_and_initializers_across_files() {
    let out = rewrite(&[("shape.h", SHAPE_H), ("shape.c", SHAPE_C)], "Shape", &["scale", "x", "name"]);
    assert_eq!(
        out["shape.h"],
        "struct Shape {
  double scale;
  // x position
  int x;
  char *name; /* owned */
};
"
    );
    assert_eq!(
        out["shape.c"],
        "#include \"shape.h\"
struct Shape origin = {1.0, 0, \"origin\"};
"
    );
}

#[test]
fn test_reorder_back_restores_original() {
    let there = rewrite(&[("shape.h", SHAPE_H), ("shape.c", SHAPE_C)], "Shape", &["scale", "x", "name"]);
    let back = rewrite(
        &[("shape.h", there["shape.h"].as_str()), ("shape.c", there["shape.c"].as_str())],
        "Shape",
        &["x", "name", "scale"],
    );
    assert_eq!(back["shape.h"], SHAPE_H);
    assert_eq!(back["shape.c"], SHAPE_C);
}

/// Every ordering of `items`.
fn permutations<'a>(items: &[&'a str]) -> Vec<Vec<&'a str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            all.push(tail);
        }
    }
    all
}

#[test]
fn test_every_permutation_reparses_in_order() {
    let header = "struct Quad {
  int a; // first
  long b;
  /* third */ char c;
  double d;
};
";
    let source = "struct Quad q = {1, 2, 3, 4};
";
    let values = BTreeMap::from([("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);
    let orders = permutations(&["a", "b", "c", "d"]);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let out = rewrite(&[("quad.h", header), ("quad.c", source)], "Quad", &order);
        let again = corpus(&[("quad.h", out["quad.h"].as_str())]);
        let record = again.find_record("Quad").unwrap();
        let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, order);

        let expected: Vec<&str> = order.iter().map(|name| values[name]).collect();
        assert_eq!(out["quad.c"], format!("struct Quad q = {{{}}};\n", expected.join(", ")));
    }
}

#[test]
fn test_constructor_reorder_back_restores_original() {
    let header = "class Foo {
public:
  Foo(int v) : a(v), b(a), c(0) {}
private:
  int a;
  int b;
  int c;
};
";
    let source = "#include \"foo.h\"\nFoo::Foo() : a(1), b(2), c(3) {}\n";
    let there = rewrite(&[("foo.h", header), ("foo.cpp", source)], "Foo", &["c", "b", "a"]);
    assert_ne!(there["foo.h"], header);
    let back = rewrite(
        &[("foo.h", there["foo.h"].as_str()), ("foo.cpp", there["foo.cpp"].as_str())],
        "Foo",
        &["a", "b", "c"],
    );
    assert_eq!(back["foo.h"], header);
    assert_eq!(back["foo.cpp"], source);
}

#[test]
fn test_declarators_after_definition() {
    let text = "struct P { int x; int y; } p = {1, 2}, q[2] = {{3, 4}, {5, 6}};\n";
    let out = rewrite(&[("p.c", text)], "P", &["y", "x"]);
    assert_eq!(out["p.c"], "struct P { int y; int x; } p = {2, 1}, q[2] = {{4, 3}, {6, 5}};\n");
}

#[test]
fn test_base_clause_is_not_an_initializer() {
    let text = "struct P { int x; int y; };\nstruct Q : P { void f() {} };\nP p = {1, 2};\n";
    let out = rewrite(&[("p.cpp", text)], "P", &["y", "x"]);
    assert_eq!(
        out["p.cpp"],
        "struct P { int y; int x; };\nstruct Q : P { void f() {} };\nP p = {2, 1};\n"
    );
}

#[test]
fn test_base_subobject_list_reordered() {
    let text = "struct P { int x; int y; };\nstruct Q : P { int z; };\nQ q = {{1, 2}, 3};\n";
    let out = rewrite(&[("q.cpp", text)], "P", &["y", "x"]);
    assert_eq!(
        out["q.cpp"],
        "struct P { int y; int x; };\nstruct Q : P { int z; };\nQ q = {{2, 1}, 3};\n"
    );
}

#[test]
fn test_current_order_plans_nothing() {
    let c = corpus(&[("shape.h", SHAPE_H), ("shape.c", SHAPE_C)]);
    let outcome = reorder_fields(&c, "Shape", &["x", "name", "scale"]).unwrap();
    assert!(outcome.plan().unwrap().is_empty());
}

#[test]
fn test_constructors_in_header_and_source() {
    let header = "class Foo {
public:
  Foo();
  Foo(int v) : a(v), b(a) {}
private:
  int a;
  int b;
  int c;
};
";
    let source = "#include \"foo.h\"\nFoo::Foo() : a(1), b(2), c(3) {}\n";
    let c = corpus(&[("foo.h", header), ("foo.cpp", source)]);
    let outcome = reorder_fields(&c, "Foo", &["c", "b", "a"]).unwrap();
    let out = apply(&c, outcome.plan().unwrap());

    assert!(out["foo.h"].contains("  Foo(int v) : b(a), a(v) {}"));
    assert!(out["foo.h"].contains("  int c;\n  int b;\n  int a;\n"));
    assert_eq!(out["foo.cpp"], "#include \"foo.h\"\nFoo::Foo() : c(3), b(2), a(1) {}\n");

    let warnings = outcome.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path, PathBuf::from("foo.h"));
    assert_eq!((warnings[0].line, warnings[0].column), (4, 22));
    assert_eq!(
        warnings[0].to_string(),
        "reordering field a after b makes a uninitialized when used in init expression"
    );
}

#[test]
fn test_qualified_names() {
    let text = "namespace geo {\nstruct Pt { int x; int y; };\n}\nstruct Pt { int u; int v; };\n";
    let out = rewrite(&[("pt.cpp", text)], "::geo::Pt", &["y", "x"]);
    assert_eq!(
        out["pt.cpp"],
        "namespace geo {\nstruct Pt { int y; int x; };\n}\nstruct Pt { int u; int v; };\n"
    );

    let c = corpus(&[("pt.cpp", text)]);
    assert!(matches!(
        reorder_fields(&c, "Pt", &["y", "x"]),
        Err(ReorderError::AmbiguousDefinition { count: 2, .. })
    ));
}

#[test]
fn test_single_field_macros_move_whole() {
    let text = "#define FIELD(n) int n;\nstruct S { FIELD(a) int mid; FIELD(b) };\n";
    let out = rewrite(&[("s.cpp", text)], "S", &["b", "mid", "a"]);
    assert_eq!(out["s.cpp"], "#define FIELD(n) int n;\nstruct S { FIELD(b) int mid; FIELD(a) };\n");
}

#[test]
fn test_macros_defined_in_another_file() {
    let defs = "#define PAIR int p; int q;\n";
    let text = "struct S { PAIR int z; };\n";
    let c = corpus(&[("defs.h", defs), ("s.cpp", text)]);
    let outcome = reorder_fields(&c, "S", &["z", "q", "p"]).unwrap();
    assert!(matches!(
        outcome,
        ReorderOutcome::Ineligible(UnsafeSyntax::SharedMacroExpansion { .. })
    ));
}

#[test]
fn test_conditional_fields_left_alone() {
    let text = "struct S {\n  int a;\n#ifdef WIDE\n  long b;\n#else\n  int b;\n#endif\n  int c;\n};\n";
    let c = corpus(&[("s.h", text)]);
    let outcome = reorder_fields(&c, "S", &["c", "b", "a"]).unwrap();
    assert!(outcome.plan().is_none());
    assert!(outcome.warnings().is_empty());
}

#[test]
fn test_hash_in_text_does_not_block() {
    let text = "struct S {\n  int a; // #if 0\n  const char *tag = \"#endif\";\n};\n";
    let out = rewrite(&[("s.cpp", text)], "S", &["tag", "a"]);
    assert_eq!(
        out["s.cpp"],
        "struct S {\n  const char *tag = \"#endif\";\n  int a; // #if 0\n};\n"
    );
}

#[test]
fn test_partial_initializer_anywhere_aborts() {
    let c = corpus(&[
        ("p.h", "struct P { int x; int y; int z; };\n"),
        ("a.c", "struct P a = {1, 2, 3};\n"),
        ("b.c", "struct P b = {1, 2};\n"),
    ]);
    match reorder_fields(&c, "P", &["z", "y", "x"]) {
        Err(ReorderError::PartialAggregateInitUnsupported { path, line, column, found, expected }) => {
            assert_eq!(path, PathBuf::from("b.c"));
            assert_eq!((line, column), (1, 14));
            assert_eq!((found, expected), (2, 3));
        }
        other => panic!("expected a partial initializer error, got {other:?}"),
    }
}

#[test]
fn test_mixed_access_rejected() {
    let text = "class S {\npublic:\n  int a;\nprotected:\n  int b;\n};\n";
    let c = corpus(&[("s.cpp", text)]);
    assert!(matches!(
        reorder_fields(&c, "S", &["b", "a"]),
        Err(ReorderError::AccessLevelViolation { .. })
    ));
}

#[test]
fn test_order_errors() {
    let c = corpus(&[("s.c", "struct S { int a; int b; };\n")]);
    assert!(matches!(
        reorder_fields(&c, "S", &["a"]),
        Err(ReorderError::OrderCountMismatch { provided: 1, expected: 2 })
    ));
    assert!(matches!(
        reorder_fields(&c, "S", &["a", "c"]),
        Err(ReorderError::UnknownFieldName(name)) if name == "c"
    ));
    assert!(matches!(
        reorder_fields(&c, "Missing", &["a", "b"]),
        Err(ReorderError::DefinitionNotFound(_))
    ));
}
