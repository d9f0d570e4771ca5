// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Reorder pipeline
//!
//! Runs the stages for one record and either returns one complete plan or
//! nothing:
//!
//! 1. find the definition
//! 2. gate on [`safety`]
//! 3. resolve the permutation ([`order`])
//! 4. rewrite the declarations ([`definition`])
//! 5. rewrite each constructor's initializers ([`constructor`])
//! 6. rewrite brace initializers for aggregates ([`aggregate`])
//!
//! A constructor that cannot be rewritten is skipped with a log message.
//! Any other failure drops everything planned so far.

pub mod aggregate;
pub mod constructor;
pub mod definition;
pub mod order;
pub mod safety;

use log::{debug, warn};
use std::fmt;

use crate::error::{InitializationOrderWarning, ReorderError, UnsafeSyntax};
use crate::plan::ReplacementPlan;
use crate::source::SourceModel;

pub use order::Permutation;

/// Pipeline position, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderStage {
    Start,
    DefinitionFound,
    SafetyChecked,
    OrderResolved,
    DefinitionRewritten,
    ConstructorsProcessed,
    AggregatesProcessed,
    Done,
    Aborted,
}

impl fmt::Display for ReorderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub enum ReorderOutcome {
    /// Complete plan, possibly empty, plus advisory warnings.
    Planned {
        plan: ReplacementPlan,
        warnings: Vec<InitializationOrderWarning>,
    },
    /// The record's syntax cannot be rewritten safely; nothing to do.
    Ineligible(UnsafeSyntax),
}

impl ReorderOutcome {
    pub fn plan(&self) -> Option<&ReplacementPlan> {
        match self {
            ReorderOutcome::Planned { plan, .. } => Some(plan),
            ReorderOutcome::Ineligible(_) => None,
        }
    }

    pub fn warnings(&self) -> &[InitializationOrderWarning] {
        match self {
            ReorderOutcome::Planned { warnings, .. } => warnings,
            ReorderOutcome::Ineligible(_) => &[],
        }
    }
}

struct Pipeline {
    record: String,
    stage: ReorderStage,
}

impl Pipeline {
    fn advance(&mut self, next: ReorderStage) {
        debug!("{}: {} -> {}", self.record, self.stage, next);
        self.stage = next;
    }

    fn abort(&mut self, err: ReorderError) -> ReorderError {
        debug!("{}: {err}", self.record);
        self.advance(ReorderStage::Aborted);
        err
    }
}

/// Plan reordering the fields of `record_name` into `desired` order.
pub fn reorder_fields<M, S>(model: &M, record_name: &str, desired: &[S]) -> Result<ReorderOutcome, ReorderError>
where
    M: SourceModel + ?Sized,
    S: AsRef<str>,
{
    let mut pipeline = Pipeline {
        record: record_name.to_string(),
        stage: ReorderStage::Start,
    };

    let record = model.find_record(record_name).map_err(|e| pipeline.abort(e))?;
    pipeline.advance(ReorderStage::DefinitionFound);

    if let Err(reason) = safety::check_record(&record, model) {
        debug!("{record_name} is not safe to rewrite: {reason}");
        pipeline.advance(ReorderStage::Aborted);
        return Ok(ReorderOutcome::Ineligible(reason));
    }
    pipeline.advance(ReorderStage::SafetyChecked);

    let perm = order::resolve(&record, desired).map_err(|e| pipeline.abort(e))?;
    pipeline.advance(ReorderStage::OrderResolved);

    let mut plan = definition::rewrite(&record, &perm, model).map_err(|e| pipeline.abort(e))?;
    pipeline.advance(ReorderStage::DefinitionRewritten);

    let mut warnings = Vec::new();
    if record.has_constructors() {
        for ctor in model.constructors(&record) {
            let rewritten = constructor::rewrite(&record, &ctor, &perm, model)
                .and_then(|r| {
                    let mut merged = plan.clone();
                    merged.merge(r.plan)?;
                    Ok((merged, r.warnings))
                });
            match rewritten {
                Ok((merged, ctor_warnings)) => {
                    plan = merged;
                    warnings.extend(ctor_warnings);
                }
                Err(e) => {
                    let (line, column) = model.line_col(ctor.file, ctor.name_offset);
                    warn!(
                        "{}:{}:{}: constructor left unchanged: {}",
                        model.path(ctor.file).display(),
                        line,
                        column,
                        e
                    );
                }
            }
        }
    }
    pipeline.advance(ReorderStage::ConstructorsProcessed);

    if record.is_aggregate() {
        for init in model.aggregate_inits(&record) {
            let rewritten = aggregate::rewrite(&init, &perm, model).map_err(|e| pipeline.abort(e))?;
            plan.merge(rewritten).map_err(|e| pipeline.abort(e))?;
        }
    }
    pipeline.advance(ReorderStage::AggregatesProcessed);

    debug!("{record_name}: {} replacements, {} warnings", plan.len(), warnings.len());
    pipeline.advance(ReorderStage::Done);
    Ok(ReorderOutcome::Planned { plan, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceCorpus;
    use std::path::{Path, PathBuf};

    fn corpus(text: &str) -> SourceCorpus {
        SourceCorpus::from_sources(vec![(PathBuf::from("t.cpp"), text.to_string())]).unwrap()
    }

    #[test]
    fn test_full_pipeline() {
        let text = "struct S { int a; int b; };\nS s = {1, 2};";
        let c = corpus(text);
        let outcome = reorder_fields(&c, "S", &["b", "a"]).unwrap();
        let plan = outcome.plan().unwrap();
        assert_eq!(
            plan.apply_to(Path::new("t.cpp"), text),
            "struct S { int b; int a; };\nS s = {2, 1};"
        );
        assert!(outcome.warnings().is_empty());
    }

    #[test]
    fn test_ineligible_is_not_an_error() {
        let c = corpus("struct S { int a, b; int c; };");
        let outcome = reorder_fields(&c, "S", &["c", "b", "a"]).unwrap();
        assert!(matches!(outcome, ReorderOutcome::Ineligible(UnsafeSyntax::MultiFieldStatement { .. })));
        assert!(outcome.plan().is_none());
    }

    #[test]
    fn test_partial_aggregate_discards_everything() {
        let c = corpus("struct S { int a; int b; };\nS x = {1, 2};\nS y = {1};");
        let err = reorder_fields(&c, "S", &["b", "a"]).unwrap_err();
        assert!(matches!(err, ReorderError::PartialAggregateInitUnsupported { .. }));
    }

    #[test]
    fn test_lookup_errors() {
        let c = corpus("struct S { int a; };");
        assert!(matches!(
            reorder_fields(&c, "T", &["a"]),
            Err(ReorderError::DefinitionNotFound(_))
        ));
        assert!(matches!(
            reorder_fields(&c, "S", &["a", "b"]),
            Err(ReorderError::OrderCountMismatch { .. })
        ));
    }

    #[test]
    fn test_non_aggregate_skips_brace_lists() {
        let text = "class S {\npublic:\n  S(int x, int y) : a(x), b(y) {}\n  int a;\n  int b;\n};\nS s{1, 2};";
        let c = corpus(text);
        let outcome = reorder_fields(&c, "S", &["b", "a"]).unwrap();
        let out = outcome.plan().unwrap().apply_to(Path::new("t.cpp"), text);
        assert!(out.contains("b(y), a(x)"));
        assert!(out.ends_with("S s{1, 2};"));
    }
}
