// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! reorder-fields - reorder the fields of a C/C++ record
//!
//! Given a record name and a new field order, plans the text edits that move
//! the field declarations, constructor member initializers, and aggregate
//! brace initializers into that order. Records whose layout cannot be
//! rewritten safely are left alone.

pub mod args;
pub mod error;
pub mod model;
pub mod plan;
pub mod reorder;
pub mod source;

pub use args::{find_source_files, ReorderConfig};
pub use error::{InitializationOrderWarning, ReorderError, UnsafeSyntax};
pub use plan::{Replacement, ReplacementPlan};
pub use reorder::{reorder_fields, Permutation, ReorderOutcome};
pub use source::{SourceCorpus, SourceModel, SourceText, TokenScanner};
