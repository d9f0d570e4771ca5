// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Replacements for the field declarations themselves.

use crate::error::ReorderError;
use crate::model::RecordModel;
use crate::plan::ReplacementPlan;
use crate::reorder::order::Permutation;
use crate::source::SourceText;

pub fn rewrite<S: SourceText + ?Sized>(
    record: &RecordModel,
    perm: &Permutation,
    src: &S,
) -> Result<ReplacementPlan, ReorderError> {
    let fields = &record.fields;

    for (slot, field) in fields.iter().enumerate() {
        let incoming = &fields[perm.source_of(slot)];
        if field.access != incoming.access {
            return Err(ReorderError::AccessLevelViolation {
                field: incoming.name.clone(),
                field_access: incoming.access,
                slot_access: field.access,
            });
        }
    }

    let mut plan = ReplacementPlan::new();
    for (slot, field) in fields.iter().enumerate() {
        let source = perm.source_of(slot);
        if source == slot {
            continue;
        }
        plan.swap_in(src, field.full_range, fields[source].full_range)?;
    }
    Ok(plan)
}
