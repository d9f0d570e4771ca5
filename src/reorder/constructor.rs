// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Member initializer lists follow the new field order
//!
//! Only written member initializers move. Base and delegating initializers
//! keep their positions, and each moved clause is swapped individually.
//! Reading a field that the new order initializes later is reported as a
//! warning; the rewrite still happens.

use log::debug;

use crate::error::{InitializationOrderWarning, ReorderError};
use crate::model::{ConstructorModel, InitTarget, InitializerModel, RecordModel};
use crate::plan::ReplacementPlan;
use crate::reorder::order::Permutation;
use crate::source::SourceText;

/// Plan and warnings for one constructor definition.
#[derive(Debug, Default)]
pub struct ConstructorRewrite {
    pub plan: ReplacementPlan,
    pub warnings: Vec<InitializationOrderWarning>,
}

pub fn rewrite<S: SourceText + ?Sized>(
    record: &RecordModel,
    ctor: &ConstructorModel,
    perm: &Permutation,
    src: &S,
) -> Result<ConstructorRewrite, ReorderError> {
    let mut out = ConstructorRewrite::default();
    if ctor.is_implicit || ctor.initializer_count() <= 1 {
        return Ok(out);
    }

    let new_positions = perm.new_positions();
    let written: Vec<(usize, &InitializerModel)> = ctor
        .initializers
        .iter()
        .filter_map(|init| match init.target {
            InitTarget::Field(field) => Some((field, init)),
            InitTarget::Base(_) => None,
        })
        .collect();

    for &(field, init) in &written {
        for &used in &init.uses {
            if new_positions[used] > new_positions[field] {
                let (line, column) = src.line_col(init.range.file, init.range.start);
                let warning = InitializationOrderWarning {
                    path: src.path(init.range.file).to_path_buf(),
                    line,
                    column,
                    field: record.fields[field].name.clone(),
                    used: record.fields[used].name.clone(),
                };
                debug!("{}:{}:{}: {}", warning.path.display(), line, column, warning);
                out.warnings.push(warning);
            }
        }
    }

    let mut sorted = written.clone();
    sorted.sort_by_key(|&(field, _)| new_positions[field]);
    for (old, new) in written.iter().zip(&sorted) {
        if old.0 != new.0 {
            out.plan.swap_in(src, old.1.range, new.1.range)?;
        }
    }
    Ok(out)
}
