// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Raw C/C++ token scanner
//!
//! Produces every token of a file, comments and `#` included, with byte
//! offsets. Nothing is expanded and no directive is interpreted; the parser
//! builds its own filtered view on top of this stream.

use crate::error::ReorderError;
use crate::source::file::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    LineComment,
    BlockComment,
    /// A lone `#` (`##` is a [`TokenKind::Punct`])
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Only whitespace precedes the token on its line
    pub line_start: bool,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

/// Identifiers that name a preprocessor directive when they follow `#`.
const DIRECTIVE_KEYWORDS: &[&str] = &[
    "if", "ifdef", "ifndef", "elif", "elifdef", "elifndef", "else", "endif",
    "define", "undef", "include", "include_next", "import", "line", "error",
    "warning", "pragma", "ident", "sccs", "assert", "unassert", "embed",
];

pub fn is_directive_keyword(word: &str) -> bool {
    DIRECTIVE_KEYWORDS.contains(&word)
}

/// Encoding and raw-string prefixes that may glue onto a literal.
const LITERAL_PREFIXES: &[&str] = &["L", "u", "U", "u8", "R", "LR", "uR", "UR", "u8R"];

const MULTI_PUNCT: &[&str] = &["...", "->*", "::", "->", "##", ".*"];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Lex a whole file.
pub fn lex(file: &SourceFile) -> Result<Vec<Token>, ReorderError> {
    let src = file.text();
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line_start = true;

    let lex_error = |offset: usize, message: &str| ReorderError::Lex {
        path: file.path().to_path_buf(),
        line: file.line(offset),
        message: message.to_string(),
    };

    while pos < bytes.len() {
        let c = bytes[pos];

        if c == b'\n' {
            line_start = true;
            pos += 1;
            continue;
        }

        // Line splice outside of a token
        if c == b'\\' {
            if bytes.get(pos + 1) == Some(&b'\n') {
                pos += 2;
                continue;
            }
            if bytes.get(pos + 1) == Some(&b'\r') && bytes.get(pos + 2) == Some(&b'\n') {
                pos += 3;
                continue;
            }
        }

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let next = bytes.get(pos + 1).copied();

        let kind = if c == b'/' && next == Some(b'/') {
            pos += 2;
            while pos < bytes.len() {
                if bytes[pos] == b'\n' && !escaped_newline(bytes, pos) {
                    break;
                }
                pos += 1;
            }
            TokenKind::LineComment
        } else if c == b'/' && next == Some(b'*') {
            match src[pos + 2..].find("*/") {
                Some(rel) => pos = pos + 2 + rel + 2,
                None => return Err(lex_error(start, "unterminated block comment")),
            }
            TokenKind::BlockComment
        } else if is_ident_start(c) {
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            let word = &src[start..pos];
            match bytes.get(pos) {
                Some(b'"') if LITERAL_PREFIXES.contains(&word) => {
                    if word.ends_with('R') {
                        pos = lex_raw_string(src, pos)
                            .ok_or_else(|| lex_error(start, "unterminated raw string literal"))?;
                    } else {
                        pos = lex_quoted(bytes, pos, b'"');
                    }
                    TokenKind::Str
                }
                Some(b'\'') if LITERAL_PREFIXES.contains(&word) && !word.ends_with('R') => {
                    pos = lex_quoted(bytes, pos, b'\'');
                    TokenKind::Char
                }
                _ => TokenKind::Ident,
            }
        } else if c.is_ascii_digit() || (c == b'.' && next.is_some_and(|n| n.is_ascii_digit())) {
            pos += 1;
            while pos < bytes.len() {
                let b = bytes[pos];
                let prev = bytes[pos - 1];
                if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                    pos += 1;
                } else if b == b'\'' && bytes.get(pos + 1).is_some_and(|n| n.is_ascii_alphanumeric()) {
                    pos += 1;
                } else if (b == b'+' || b == b'-') && matches!(prev, b'e' | b'E' | b'p' | b'P') {
                    pos += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if c == b'"' {
            pos = lex_quoted(bytes, pos, b'"');
            TokenKind::Str
        } else if c == b'\'' {
            pos = lex_quoted(bytes, pos, b'\'');
            TokenKind::Char
        } else if c == b'#' && next != Some(b'#') {
            pos += 1;
            TokenKind::Hash
        } else {
            let rest = &src[pos..];
            let len = MULTI_PUNCT
                .iter()
                .find(|p| rest.starts_with(*p))
                .map(|p| p.len())
                .unwrap_or_else(|| rest.chars().next().map_or(1, char::len_utf8));
            pos += len;
            TokenKind::Punct
        };

        tokens.push(Token { kind, start, end: pos, line_start });
        line_start = false;
    }

    Ok(tokens)
}

/// Lex a quoted literal starting at the opening quote. An unterminated
/// literal ends at the end of its line, the way a raw lexer recovers.
fn lex_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => return pos,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Lex `"delim( ... )delim"` starting at the opening quote.
fn lex_raw_string(src: &str, open: usize) -> Option<usize> {
    let paren = open + 1 + src[open + 1..].find('(')?;
    let delim = &src[open + 1..paren];
    let closing = format!("){delim}\"");
    let rel = src[paren + 1..].find(&closing)?;
    Some(paren + 1 + rel + closing.len())
}

/// True when the newline at `pos` is preceded by a line-splicing backslash.
fn escaped_newline(bytes: &[u8], pos: usize) -> bool {
    let mut i = pos;
    if i > 0 && bytes[i - 1] == b'\r' {
        i -= 1;
    }
    i > 0 && bytes[i - 1] == b'\\'
}

/// True when `src[from..to]` contains a newline that ends a logical line.
pub fn newline_between(src: &str, from: usize, to: usize) -> bool {
    let bytes = src.as_bytes();
    (from..to).any(|i| bytes[i] == b'\n' && !escaped_newline(bytes, i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::file::FileId;
    use std::path::PathBuf;

    fn lex_str(text: &str) -> (SourceFile, Vec<Token>) {
        let file = SourceFile::new(FileId(0), PathBuf::from("t.cpp"), text.to_string());
        let tokens = lex(&file).unwrap();
        (file, tokens)
    }

    fn texts(text: &str) -> Vec<String> {
        let (file, tokens) = lex_str(text);
        tokens.iter().map(|t| t.text(file.text()).to_string()).collect()
    }

    #[test]
    fn test_lex_declaration() {
        assert_eq!(texts("int a = b->c;"), vec!["int", "a", "=", "b", "->", "c", ";"]);
        assert_eq!(texts("ns::Foo x{1.5e+3};"), vec!["ns", "::", "Foo", "x", "{", "1.5e+3", "}", ";"]);
    }

    #[test]
    fn test_lex_comments_are_tokens() {
        let (_, tokens) = lex_str("int a; // trailing\n/* lead */ int b;");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::LineComment));
        assert!(kinds.contains(&TokenKind::BlockComment));
    }

    #[test]
    fn test_lex_hash_only_at_directive() {
        let (file, tokens) = lex_str("  #define X 1\nint a; // #if\nconst char* s = \"#endif\";");
        let hashes: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Hash).collect();
        assert_eq!(hashes.len(), 1);
        assert!(hashes[0].line_start);
        assert_eq!(hashes[0].text(file.text()), "#");
    }

    #[test]
    fn test_lex_literals() {
        assert_eq!(
            texts(r#"u8"x" L'c' R"d(a ")" b)d" '\''"#),
            vec![r#"u8"x""#, "L'c'", r#"R"d(a ")" b)d""#, r"'\''"]
        );
    }

    #[test]
    fn test_lex_token_paste_is_not_hash() {
        let (_, tokens) = lex_str("a ## b");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Hash));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let file = SourceFile::new(FileId(0), PathBuf::from("t.c"), "int a; /* oops".to_string());
        assert!(matches!(lex(&file), Err(ReorderError::Lex { line: 1, .. })));
    }

    #[test]
    fn test_newline_between_honors_splices() {
        let src = "#define A \\\n  1\nint x;";
        let first_newline = src.find('\n').unwrap();
        assert!(!newline_between(src, 0, first_newline + 1));
        assert!(newline_between(src, 0, src.len()));
    }

    #[test]
    fn test_directive_keywords() {
        assert!(is_directive_keyword("ifdef"));
        assert!(is_directive_keyword("pragma"));
        assert!(!is_directive_keyword("x"));
    }
}
