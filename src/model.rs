// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Structural model of one record and of the sites that depend on its field
//! order. Values here are captured once from source and never mutated.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::source::file::{FileId, SourceRange};

/// Access level of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        };
        f.write_str(s)
    }
}

/// A source location that tells macro expansions apart.
///
/// `offset` is where the token is spelled; `expansion` is the start of the
/// macro invocation it was expanded from, if any. Two tokens spelled in the
/// same macro body but produced by different invocations compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loc {
    pub offset: usize,
    pub expansion: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModel {
    pub name: String,
    /// 0-based declaration index
    pub index: usize,
    pub access: Access,
    /// Start of the declaration's type specifier
    pub type_begin: Loc,
    /// Declaration text without comments or the terminating `;`
    pub range: SourceRange,
    /// Declaration plus leading/trailing comments through the terminating `;`
    pub full_range: SourceRange,
    /// Invocation span when the field's name comes from a macro expansion
    pub macro_expansion: Option<SourceRange>,
}

#[derive(Debug, Clone)]
pub struct RecordModel {
    /// Qualified name, `::`-separated
    pub name: String,
    pub file: FileId,
    pub fields: Vec<FieldModel>,
    pub(crate) has_constructors: bool,
    pub(crate) is_aggregate: bool,
    /// Position of the definition in the provider's index
    pub(crate) key: usize,
}

impl RecordModel {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Any user-declared constructor exists.
    pub fn has_constructors(&self) -> bool {
        self.has_constructors
    }

    /// Brace initialization of this record is positional over its fields.
    pub fn is_aggregate(&self) -> bool {
        self.is_aggregate
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Name to declaration index. Names are unique within a record.
    pub fn name_to_index(&self) -> HashMap<&str, usize> {
        self.fields.iter().map(|f| (f.name.as_str(), f.index)).collect()
    }
}

/// What a constructor initializer clause initializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitTarget {
    /// Written member initializer of the field at this index
    Field(usize),
    /// Base-class or delegating initializer
    Base(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerModel {
    pub target: InitTarget,
    /// The whole `member(expr)` clause
    pub range: SourceRange,
    /// Fields of this record read through `this` in the initializer expression
    pub uses: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ConstructorModel {
    pub file: FileId,
    /// Location of the constructor's name, for diagnostics
    pub name_offset: usize,
    pub is_implicit: bool,
    /// Written initializers in source order
    pub initializers: Vec<InitializerModel>,
}

impl ConstructorModel {
    pub fn initializer_count(&self) -> usize {
        self.initializers.len()
    }
}

/// One brace-enclosed initializer list typed as the record.
#[derive(Debug, Clone)]
pub struct AggregateInitModel {
    /// Written in source, as opposed to a list implied by brace elision
    pub is_explicit: bool,
    /// The list including its braces
    pub range: SourceRange,
    /// Initializer expressions, positionally aligned with the fields
    pub inits: Vec<SourceRange>,
}
