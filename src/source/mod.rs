// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Source layer: loaded files, raw tokens, and the structural model the
//! reorder engine consumes.
//!
//! The engine only sees the three traits below. [`SourceCorpus`] implements
//! all of them on top of the hand-written lexer and parser.

pub mod corpus;
pub mod file;
pub mod lexer;
pub(crate) mod parser;

use std::path::Path;

use crate::error::ReorderError;
use crate::model::{AggregateInitModel, ConstructorModel, RecordModel};

pub use corpus::SourceCorpus;
pub use file::{FileId, SourceFile, SourceRange};
pub use lexer::{Token, TokenKind};

/// Read access to source text.
pub trait SourceText {
    fn path(&self, file: FileId) -> &Path;

    fn text(&self, range: SourceRange) -> &str;

    /// 1-based line and column.
    fn line_col(&self, file: FileId, offset: usize) -> (usize, usize);
}

/// Raw token access, comments and directives included.
pub trait TokenScanner {
    /// Raw tokens that start inside `range`.
    fn raw_tokens(&self, range: SourceRange) -> &[Token];
}

/// Structural queries over a corpus.
pub trait SourceModel: SourceText + TokenScanner {
    /// The unique definition of `name`.
    fn find_record(&self, name: &str) -> Result<RecordModel, ReorderError>;

    /// Constructor definitions of the record, anywhere in the corpus.
    fn constructors(&self, record: &RecordModel) -> Vec<ConstructorModel>;

    /// Brace initializer lists typed as the record, anywhere in the corpus.
    fn aggregate_inits(&self, record: &RecordModel) -> Vec<AggregateInitModel>;
}
