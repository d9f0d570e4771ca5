// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Eligibility gate: can this record's text be permuted mechanically?

use crate::error::UnsafeSyntax;
use crate::model::RecordModel;
use crate::source::lexer::{is_directive_keyword, TokenKind};
use crate::source::{SourceRange, SourceText, TokenScanner};

/// First reason the record cannot be rewritten, if any.
pub fn check_record<S>(record: &RecordModel, src: &S) -> Result<(), UnsafeSyntax>
where
    S: SourceText + TokenScanner + ?Sized,
{
    let (Some(first), Some(last)) = (record.fields.first(), record.fields.last()) else {
        return Ok(());
    };

    // `int a, b;`
    for pair in record.fields.windows(2) {
        if pair[0].type_begin == pair[1].type_begin {
            return Err(UnsafeSyntax::MultiFieldStatement {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }

    let mut last_macro: Option<(usize, &str)> = None;
    for field in &record.fields {
        let Some(expansion) = field.macro_expansion else {
            continue;
        };
        if let Some((start, name)) = last_macro {
            if start == expansion.start {
                return Err(UnsafeSyntax::SharedMacroExpansion {
                    first: name.to_string(),
                    second: field.name.clone(),
                });
            }
        }
        last_macro = Some((expansion.start, &field.name));
    }

    let span = SourceRange::new(record.file, first.range.start, last.range.end.max(first.range.start));
    let mut tokens = src.raw_tokens(span).iter().filter(|t| !t.is_comment()).peekable();
    while let Some(tok) = tokens.next() {
        if tok.kind != TokenKind::Hash {
            continue;
        }
        if let Some(next) = tokens.peek() {
            let word = src.text(SourceRange::new(record.file, next.start, next.end));
            if next.kind == TokenKind::Ident && is_directive_keyword(word) {
                return Err(UnsafeSyntax::PreprocessorDirective(word.to_string()));
            }
        }
    }

    Ok(())
}
