// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Positional brace initializers follow the new field order.

use crate::error::ReorderError;
use crate::model::AggregateInitModel;
use crate::plan::ReplacementPlan;
use crate::reorder::order::Permutation;
use crate::source::SourceText;

pub fn rewrite<S: SourceText + ?Sized>(
    init: &AggregateInitModel,
    perm: &Permutation,
    src: &S,
) -> Result<ReplacementPlan, ReorderError> {
    let mut plan = ReplacementPlan::new();
    if !init.is_explicit || init.inits.is_empty() {
        return Ok(plan);
    }
    if init.inits.len() != perm.len() {
        let (line, column) = src.line_col(init.range.file, init.range.start);
        return Err(ReorderError::PartialAggregateInitUnsupported {
            path: src.path(init.range.file).to_path_buf(),
            line,
            column,
            found: init.inits.len(),
            expected: perm.len(),
        });
    }
    for (slot, range) in init.inits.iter().enumerate() {
        let source = perm.source_of(slot);
        if source != slot {
            plan.swap_in(src, *range, init.inits[source])?;
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reorder::order::resolve;
    use crate::source::{SourceCorpus, SourceModel};
    use std::path::{Path, PathBuf};

    fn setup(text: &str) -> (SourceCorpus, Vec<AggregateInitModel>, Permutation) {
        let corpus = SourceCorpus::from_sources(vec![(PathBuf::from("t.c"), text.to_string())]).unwrap();
        let record = corpus.find_record("S").unwrap();
        let perm = resolve(&record, &["c", "b", "a"]).unwrap();
        let inits = corpus.aggregate_inits(&record);
        (corpus, inits, perm)
    }

    #[test]
    fn test_full_initializer_reordered() {
        let text = "struct S { int a; int b; int c; };\nstruct S s = {1, f(2, 3), 4};";
        let (corpus, inits, perm) = setup(text);
        assert_eq!(inits.len(), 1);
        let plan = rewrite(&inits[0], &perm, &corpus).unwrap();
        assert!(plan
            .apply_to(Path::new("t.c"), text)
            .ends_with("struct S s = {4, f(2, 3), 1};"));
    }

    #[test]
    fn test_partial_initializer_rejected() {
        let text = "struct S { int a; int b; int c; };\nstruct S s = {1, 2};";
        let (corpus, inits, perm) = setup(text);
        match rewrite(&inits[0], &perm, &corpus) {
            Err(ReorderError::PartialAggregateInitUnsupported {
                line,
                column,
                found,
                expected,
                ..
            }) => {
                assert_eq!((line, column), (2, 14));
                assert_eq!((found, expected), (2, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_implicit_lists_need_nothing() {
        let text = "struct S { int a; int b; int c; };\nstruct S s = {};\nstruct S arr[1] = {1, 2, 3};";
        let (corpus, inits, perm) = setup(text);
        assert_eq!(inits.len(), 2);
        for init in &inits {
            assert!(rewrite(init, &perm, &corpus).unwrap().is_empty());
        }
    }
}
