// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Desired field names to an index permutation.

use crate::error::ReorderError;
use crate::model::RecordModel;

/// `slot i` of the new layout holds the field at old index `self[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Old index of the field that lands in `slot`.
    pub fn source_of(&self, slot: usize) -> usize {
        self.0[slot]
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &old)| i == old)
    }

    /// `new_positions()[old] == slot`.
    pub fn new_positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.0.len()];
        for (slot, &old) in self.0.iter().enumerate() {
            positions[old] = slot;
        }
        positions
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

pub fn resolve<S: AsRef<str>>(record: &RecordModel, desired: &[S]) -> Result<Permutation, ReorderError> {
    if desired.len() != record.field_count() {
        return Err(ReorderError::OrderCountMismatch {
            provided: desired.len(),
            expected: record.field_count(),
        });
    }
    let name_to_index = record.name_to_index();
    let mut taken = vec![false; desired.len()];
    let mut order = Vec::with_capacity(desired.len());
    for name in desired {
        let name = name.as_ref();
        let index = *name_to_index
            .get(name)
            .ok_or_else(|| ReorderError::UnknownFieldName(name.to_string()))?;
        if std::mem::replace(&mut taken[index], true) {
            return Err(ReorderError::DuplicateFieldName(name.to_string()));
        }
        order.push(index);
    }
    Ok(Permutation(order))
}
