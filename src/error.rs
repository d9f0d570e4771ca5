// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Error, ineligibility and warning types produced while planning a reorder.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::Access;

/// Fatal failures. Any of these discards the whole replacement plan.
#[derive(Error, Debug)]
pub enum ReorderError {
    #[error("Definition of {0} not found")]
    DefinitionNotFound(String),

    #[error("The name {name} is ambiguous, {count} definitions found")]
    AmbiguousDefinition { name: String, count: usize },

    #[error("Number of provided fields ({provided}) doesn't match definition ({expected})")]
    OrderCountMismatch { provided: usize, expected: usize },

    #[error("Field {0} not found in definition")]
    UnknownFieldName(String),

    #[error("Field {0} is listed more than once")]
    DuplicateFieldName(String),

    #[error(
        "Field {field} is {field_access} but its new slot is {slot_access}; \
         reordering fields with different accesses is not supported"
    )]
    AccessLevelViolation {
        field: String,
        field_access: Access,
        slot_access: Access,
    },

    #[error(
        "{path}:{line}:{column}: only full initialization is supported \
         ({found} of {expected} initializers present)"
    )]
    PartialAggregateInitUnsupported {
        path: PathBuf,
        line: usize,
        column: usize,
        found: usize,
        expected: usize,
    },

    #[error("{path}: replacement at offset {offset} overlaps an existing replacement")]
    OverlappingReplacement { path: PathBuf, offset: usize },

    #[error("{path}:{line}: {message}")]
    Lex {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a record's layout cannot be rewritten mechanically.
///
/// Not an error to the caller: an ineligible record simply yields no plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafeSyntax {
    #[error("fields {first} and {second} are declared in one statement")]
    MultiFieldStatement { first: String, second: String },

    #[error("fields {first} and {second} come from one macro expansion")]
    SharedMacroExpansion { first: String, second: String },

    #[error("preprocessor directive #{0} appears between the fields")]
    PreprocessorDirective(String),
}

/// A member initializer that reads a field which, after the reorder, is
/// initialized later than the field being initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitializationOrderWarning {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    /// Field whose initializer performs the read
    pub field: String,
    /// Field that is read before it is initialized
    pub used: String,
}

impl fmt::Display for InitializationOrderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reordering field {} after {} makes {} uninitialized when used in init expression",
            self.used, self.field, self.used
        )
    }
}
