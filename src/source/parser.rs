// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Recursive-descent front end for the parts of C/C++ that field order touches
//!
//! The parser does not try to understand whole programs. It finds record
//! definitions (with their fields, bases, and constructors), out-of-line
//! constructor definitions, and type aliases. Everything else is skipped by
//! bracket matching.

use std::collections::HashMap;

use crate::model::{Access, Loc};
use crate::source::file::{FileId, SourceFile};
use crate::source::lexer::{newline_between, Token, TokenKind};

/// A token of the filtered stream: no comments, no directive lines.
#[derive(Debug, Clone)]
pub(crate) struct Tok {
    pub kind: TokenKind,
    pub text: String,
    /// Effective range in the file being parsed (the invocation for expanded tokens)
    pub start: usize,
    pub end: usize,
    /// Where the token is spelled; may be inside a macro body
    pub spelling: usize,
    /// Invocation span this token was expanded from
    pub expansion: Option<(usize, usize)>,
}

impl Tok {
    fn from_raw(src: &str, t: &Token) -> Self {
        Tok {
            kind: t.kind,
            text: t.text(src).to_string(),
            start: t.start,
            end: t.end,
            spelling: t.start,
            expansion: None,
        }
    }

    pub fn is(&self, s: &str) -> bool {
        matches!(self.kind, TokenKind::Punct | TokenKind::Ident | TokenKind::Hash) && self.text == s
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn loc(&self) -> Loc {
        Loc {
            offset: self.spelling,
            expansion: self.expansion.map(|e| e.0),
        }
    }
}

/// A `#define` seen anywhere in the corpus.
#[derive(Debug, Clone)]
pub(crate) struct MacroDef {
    pub params: Option<Vec<String>>,
    pub variadic: bool,
    pub body: Vec<Tok>,
    /// Body uses `#` or `##`, which plain substitution cannot reproduce
    pub pastes: bool,
}

pub(crate) type MacroTable = HashMap<String, MacroDef>;

/// Drop comments and directive lines from the raw stream, collecting `#define`s.
pub(crate) fn cook(file: &SourceFile, raw: &[Token]) -> (Vec<Tok>, Vec<(String, MacroDef)>) {
    let src = file.text();
    let mut out = Vec::new();
    let mut macros = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let t = &raw[i];
        if t.kind == TokenKind::Hash && t.line_start {
            let mut j = i + 1;
            while j < raw.len() && !newline_between(src, raw[j - 1].end, raw[j].start) {
                j += 1;
            }
            let line: Vec<Tok> = raw[i + 1..j]
                .iter()
                .filter(|t| !t.is_comment())
                .map(|t| Tok::from_raw(src, t))
                .collect();
            if let Some(def) = parse_define(&line) {
                macros.push(def);
            }
            i = j;
            continue;
        }
        if !t.is_comment() {
            out.push(Tok::from_raw(src, t));
        }
        i += 1;
    }
    (out, macros)
}

fn parse_define(line: &[Tok]) -> Option<(String, MacroDef)> {
    if line.len() < 2 || !line[0].is("define") || !line[1].is_ident() {
        return None;
    }
    let name = line[1].text.clone();
    let function_like = line.get(2).is_some_and(|t| t.is("(") && t.start == line[1].end);
    let (params, variadic, body_start) = if function_like {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut k = 3;
        while k < line.len() && !line[k].is(")") {
            if line[k].is("...") {
                variadic = true;
            } else if line[k].is_ident() {
                params.push(line[k].text.clone());
            }
            k += 1;
        }
        (Some(params), variadic, k + 1)
    } else {
        (None, false, 2)
    };
    let body: Vec<Tok> = line.get(body_start..).unwrap_or_default().to_vec();
    let pastes = body.iter().any(|t| t.kind == TokenKind::Hash || t.is("##"));
    Some((name, MacroDef { params, variadic, body, pastes }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Struct,
    Class,
    Union,
}

impl RecordKind {
    fn default_access(self) -> Access {
        match self {
            RecordKind::Class => Access::Private,
            RecordKind::Struct | RecordKind::Union => Access::Public,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BaseSpec {
    pub name: String,
    pub access: Access,
    pub is_virtual: bool,
}

/// Textual type of a field, enough to follow nested brace initializers.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldType {
    pub name: Option<String>,
    /// Pointer, reference or function-pointer declarator
    pub indirect: bool,
    pub array_dims: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldDecl {
    pub name: String,
    pub access: Access,
    pub type_begin: Loc,
    pub macro_expansion: Option<(usize, usize)>,
    pub start: usize,
    pub end: usize,
    /// Terminating `;`
    pub terminator: Option<(usize, usize)>,
    pub ty: FieldType,
}

#[derive(Debug, Clone)]
pub(crate) struct InitItem {
    /// Last segment of the initialized name
    pub name: String,
    /// Unqualified, untemplated name: may denote a member
    pub simple: bool,
    pub start: usize,
    pub end: usize,
    /// Identifiers read through `this`, implicitly or explicitly
    pub refs: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CtorDef {
    pub file: FileId,
    /// Qualified class name the constructor belongs to
    pub qualifier: Vec<String>,
    pub name_offset: usize,
    pub inits: Vec<InitItem>,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordDecl {
    pub file: FileId,
    pub kind: RecordKind,
    pub name: String,
    pub qualified: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub bases: Vec<BaseSpec>,
    pub has_virtual: bool,
    pub declares_ctor: bool,
    pub ctor_defs: Vec<CtorDef>,
    pub c_source: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TypeAlias {
    pub alias: String,
    pub target: String,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedUnit {
    pub records: Vec<RecordDecl>,
    pub ctor_defs: Vec<CtorDef>,
    pub aliases: Vec<TypeAlias>,
}

/// Words that never name a declarator.
const SPECIFIER_KEYWORDS: &[&str] = &[
    "const", "volatile", "mutable", "constexpr", "inline", "struct", "class", "union",
    "enum", "typename", "unsigned", "signed", "register", "thread_local", "extern",
    "explicit", "consteval", "constinit", "restrict", "__restrict", "_Thread_local",
];

/// Words followed by a parenthesized operand that is not a parameter list.
const PAREN_OPERATORS: &[&str] = &[
    "decltype", "alignas", "_Alignas", "__attribute__", "__attribute", "__declspec",
    "typeof", "__typeof__", "__typeof", "_Atomic", "sizeof", "noexcept", "alignof",
];

/// Index of the bracket closing the one at `open`, or the last index if unbalanced.
pub(crate) fn matching(toks: &[Tok], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, t) in toks.iter().enumerate().skip(open) {
        if t.kind != TokenKind::Punct {
            continue;
        }
        match t.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    toks.len().saturating_sub(1)
}

/// Split `toks[open+1..close]` at top-level commas into index ranges.
pub(crate) fn split_top_level(toks: &[Tok], open: usize, close: usize) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut start = open + 1;
    let mut i = open + 1;
    while i < close {
        let t = &toks[i];
        if t.is("(") || t.is("[") || t.is("{") {
            i = matching(toks, i) + 1;
            continue;
        }
        if t.is(",") {
            parts.push((start, i));
            start = i + 1;
        }
        i += 1;
    }
    if start < close {
        parts.push((start, close));
    }
    parts
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_uppercase())
        && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Declaration state for one declarator inside a member statement.
#[derive(Debug, Default)]
struct Declarator {
    /// Candidate name tokens; the last one is the declarator name
    idents: Vec<usize>,
    saw_indirection: bool,
    indirect: bool,
    in_group: bool,
    array_dims: usize,
    in_initializer: bool,
}

/// Namespaces and records nested deeper than this are skipped as plain blocks.
const MAX_NESTING: usize = 256;

pub(crate) struct Parser<'a> {
    file: FileId,
    c_source: bool,
    toks: Vec<Tok>,
    pos: usize,
    /// Namespaces and records currently open
    nesting: usize,
    macros: &'a MacroTable,
    unit: ParsedUnit,
}

/// Parse one file's filtered token stream.
pub(crate) fn parse_unit(file: FileId, c_source: bool, toks: Vec<Tok>, macros: &MacroTable) -> ParsedUnit {
    let mut parser = Parser {
        file,
        c_source,
        toks,
        pos: 0,
        nesting: 0,
        macros,
        unit: ParsedUnit::default(),
    };
    while parser.pos < parser.toks.len() {
        parser.parse_block(&[]);
    }
    parser.unit
}

impl<'a> Parser<'a> {
    fn tok(&self, i: usize) -> Option<&Tok> {
        self.toks.get(i)
    }

    fn at(&self, s: &str) -> bool {
        self.tok(self.pos).is_some_and(|t| t.is(s))
    }

    fn skip_group(&mut self) {
        self.pos = matching(&self.toks, self.pos) + 1;
    }

    /// Skip a template argument list starting at `<`.
    fn skip_angles(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.tok(self.pos) {
            if t.is("(") || t.is("[") {
                self.skip_group();
                continue;
            }
            if t.is(";") || t.is("{") || t.is("}") {
                return;
            }
            if t.is("<") {
                depth += 1;
            } else if t.is(">") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.pos += 1;
                    return;
                }
            }
            self.pos += 1;
        }
    }

    /// Skip one statement or member, stopping before an enclosing `}`.
    fn skip_statement(&mut self) {
        let mut seen_paren = false;
        while let Some(t) = self.tok(self.pos) {
            if t.is(";") {
                self.pos += 1;
                return;
            }
            if t.is("}") {
                return;
            }
            if t.is("(") || t.is("[") {
                seen_paren |= t.is("(");
                self.skip_group();
                continue;
            }
            if t.is("{") {
                self.skip_group();
                if self.at(";") {
                    self.pos += 1;
                    return;
                }
                if seen_paren {
                    return;
                }
                continue;
            }
            self.pos += 1;
        }
    }

    /// Scan declarations until the `}` closing the current block.
    fn parse_block(&mut self, prefix: &[String]) {
        // Plain blocks share the prefix, so they are tracked by depth alone
        let mut depth = 0usize;
        while let Some(t) = self.tok(self.pos) {
            if t.is("}") {
                self.pos += 1;
                if depth == 0 {
                    return;
                }
                depth -= 1;
                continue;
            }
            if t.is("{") {
                self.pos += 1;
                depth += 1;
                continue;
            }
            if !t.is_ident() {
                self.pos += 1;
                continue;
            }
            match t.text.as_str() {
                "namespace" => self.parse_namespace(prefix),
                "struct" | "class" | "union" => match self.try_record(prefix) {
                    Some(rec) => self.unit.records.push(rec),
                    None => self.pos += 1,
                },
                "typedef" => self.parse_typedef(prefix),
                "using" => self.parse_using(),
                _ if self.at_out_of_line_ctor() => self.parse_out_of_line_ctor(prefix),
                _ => self.pos += 1,
            }
        }
    }

    fn parse_namespace(&mut self, prefix: &[String]) {
        let mut i = self.pos + 1;
        let mut segments = Vec::new();
        while let Some(t) = self.tok(i) {
            if t.is("inline") || t.is("::") {
                i += 1;
            } else if t.is_ident() {
                segments.push(t.text.clone());
                i += 1;
            } else {
                break;
            }
        }
        if self.tok(i).is_some_and(|t| t.is("{")) {
            if self.nesting >= MAX_NESTING {
                // Left to the caller as a plain block
                self.pos = i;
                return;
            }
            self.pos = i + 1;
            let mut inner = prefix.to_vec();
            inner.extend(segments);
            self.nesting += 1;
            self.parse_block(&inner);
            self.nesting -= 1;
        } else {
            self.pos = i;
            self.skip_statement();
        }
    }

    /// Parse `struct|class|union [attrs] Name [final] [: bases] { ... }` at the
    /// current keyword. Returns `None`, leaving the position untouched, when the
    /// keyword does not start a definition.
    fn try_record(&mut self, prefix: &[String]) -> Option<RecordDecl> {
        let kw = self.pos;
        if kw > 0 && self.toks[kw - 1].is("enum") {
            return None;
        }
        let kind = match self.toks[kw].text.as_str() {
            "struct" => RecordKind::Struct,
            "class" => RecordKind::Class,
            _ => RecordKind::Union,
        };

        let mut i = kw + 1;
        let mut name: Option<String> = None;
        let mut after_colons = false;
        let mut bases = Vec::new();
        loop {
            let t = self.tok(i)?;
            if t.is("[") && self.tok(i + 1).is_some_and(|n| n.is("[")) {
                i = matching(&self.toks, i) + 1;
            } else if t.is_ident()
                && PAREN_OPERATORS.contains(&t.text.as_str())
                && self.tok(i + 1).is_some_and(|n| n.is("("))
            {
                i = matching(&self.toks, i + 1) + 1;
            } else if t.is_ident() {
                if t.is("final") && name.is_some() {
                    i += 1;
                    continue;
                }
                if let Some(prev) = &name {
                    if !after_colons && !self.macros.contains_key(prev) {
                        return None;
                    }
                }
                name = Some(t.text.clone());
                after_colons = false;
                i += 1;
            } else if t.is("::") {
                after_colons = true;
                i += 1;
            } else if t.is("<") {
                let saved = self.pos;
                self.pos = i;
                self.skip_angles();
                i = self.pos;
                self.pos = saved;
            } else if t.is(":") {
                let (parsed, open) = self.parse_bases(i + 1, kind)?;
                bases = parsed;
                i = open;
                break;
            } else if t.is("{") {
                break;
            } else {
                return None;
            }
        }

        if self.nesting >= MAX_NESTING {
            return None;
        }
        let name = name.unwrap_or_default();
        let mut qualified = prefix.to_vec();
        if !name.is_empty() {
            qualified.push(name.clone());
        }
        let mut rec = RecordDecl {
            file: self.file,
            kind,
            name,
            qualified,
            fields: Vec::new(),
            bases,
            has_virtual: false,
            declares_ctor: false,
            ctor_defs: Vec::new(),
            c_source: self.c_source,
        };
        self.pos = i + 1;
        self.nesting += 1;
        self.parse_members(&mut rec);
        self.nesting -= 1;
        Some(rec)
    }

    /// Parse a base clause from `start` up to the body's `{`.
    fn parse_bases(&self, start: usize, kind: RecordKind) -> Option<(Vec<BaseSpec>, usize)> {
        let mut bases = Vec::new();
        let mut current = BaseSpec {
            name: String::new(),
            access: kind.default_access(),
            is_virtual: false,
        };
        let mut angle = 0usize;
        let mut i = start;
        loop {
            let t = self.tok(i)?;
            if t.is(";") || t.is("}") {
                return None;
            }
            if angle == 0 && t.is("{") {
                break;
            }
            match t.text.as_str() {
                "<" => angle += 1,
                ">" => angle = angle.saturating_sub(1),
                "(" | "[" => {
                    i = matching(&self.toks, i) + 1;
                    continue;
                }
                "," if angle == 0 => {
                    bases.push(std::mem::replace(
                        &mut current,
                        BaseSpec {
                            name: String::new(),
                            access: kind.default_access(),
                            is_virtual: false,
                        },
                    ));
                }
                "public" => current.access = Access::Public,
                "protected" => current.access = Access::Protected,
                "private" => current.access = Access::Private,
                "virtual" => current.is_virtual = true,
                _ if t.is_ident() && angle == 0 => current.name = t.text.clone(),
                _ => {}
            }
            i += 1;
        }
        if !current.name.is_empty() {
            bases.push(current);
        }
        Some((bases, i))
    }

    /// Parse members up to and including the record's closing `}`.
    fn parse_members(&mut self, rec: &mut RecordDecl) {
        let mut access = rec.kind.default_access();
        while let Some(t) = self.tok(self.pos) {
            if t.is("}") {
                self.pos += 1;
                return;
            }
            if t.is(";") {
                self.pos += 1;
                continue;
            }
            if t.is_ident() && self.tok(self.pos + 1).is_some_and(|n| n.is(":")) {
                let region = match t.text.as_str() {
                    "public" => Some(Access::Public),
                    "protected" => Some(Access::Protected),
                    "private" => Some(Access::Private),
                    _ => None,
                };
                if let Some(region) = region {
                    access = region;
                    self.pos += 2;
                    continue;
                }
            }
            if self.try_expand() {
                continue;
            }
            self.parse_member(rec, access);
        }
    }

    /// Expand a macro invocation that starts a member statement.
    fn try_expand(&mut self) -> bool {
        let macros = self.macros;
        let t = &self.toks[self.pos];
        if !t.is_ident() || t.expansion.is_some() {
            return false;
        }
        let Some(def) = macros.get(&t.text) else {
            return false;
        };
        if def.pastes {
            return false;
        }

        let (args, last) = match &def.params {
            None => (Vec::new(), self.pos),
            Some(_) => {
                if !self.tok(self.pos + 1).is_some_and(|n| n.is("(")) {
                    return false;
                }
                let open = self.pos + 1;
                let close = matching(&self.toks, open);
                let ranges = split_top_level(&self.toks, open, close);
                let mut args: Vec<Vec<Tok>> = ranges.iter().map(|&(a, b)| self.toks[a..b].to_vec()).collect();
                if def.variadic {
                    let fixed = def.params.as_ref().map_or(0, Vec::len);
                    let va = ranges
                        .get(fixed)
                        .map(|&(a, _)| self.toks[a..close].to_vec())
                        .unwrap_or_default();
                    args.truncate(fixed);
                    args.push(va);
                }
                (args, close)
            }
        };

        let span = (self.toks[self.pos].start, self.toks[last].end);
        let mut expanded = Vec::new();
        for bt in &def.body {
            let param_index = if bt.is_ident() {
                match &def.params {
                    Some(params) if def.variadic && bt.text == "__VA_ARGS__" => Some(params.len()),
                    Some(params) => params.iter().position(|p| *p == bt.text),
                    None => None,
                }
            } else {
                None
            };
            match param_index {
                Some(i) => expanded.extend(args.get(i).cloned().unwrap_or_default()),
                None => expanded.push(bt.clone()),
            }
        }
        for tok in &mut expanded {
            tok.start = span.0;
            tok.end = span.1;
            tok.expansion = Some(span);
        }
        self.toks.splice(self.pos..=last, expanded);
        true
    }

    fn parse_member(&mut self, rec: &mut RecordDecl, access: Access) {
        let stmt = self.pos;
        let t = &self.toks[stmt];
        if t.is("~") {
            self.skip_statement();
            return;
        }
        if t.is_ident() {
            match t.text.as_str() {
                "using" | "typedef" | "friend" | "static_assert" | "template" => {
                    self.skip_statement();
                    return;
                }
                "struct" | "class" | "union" => {
                    if let Some(nested) = self.try_record(&rec.qualified) {
                        let nested_name = nested.name.clone();
                        self.unit.records.push(nested);
                        let anonymous = nested_name.is_empty();
                        self.parse_declarators(rec, access, stmt, Some(nested_name), anonymous);
                        return;
                    }
                }
                "enum" => {
                    self.pos += 1;
                    if self.at("class") || self.at("struct") {
                        self.pos += 1;
                    }
                    let mut enum_name = None;
                    if self.tok(self.pos).is_some_and(|t| t.is_ident()) {
                        enum_name = Some(self.toks[self.pos].text.clone());
                        self.pos += 1;
                    }
                    if self.at(":") {
                        while let Some(t) = self.tok(self.pos) {
                            if t.is("{") || t.is(";") || t.is("}") {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                    if self.at("{") {
                        self.skip_group();
                    }
                    if self.at(";") {
                        self.pos += 1;
                        return;
                    }
                    self.parse_declarators(rec, access, stmt, enum_name, false);
                    return;
                }
                _ => {}
            }
        }
        self.parse_declarators(rec, access, stmt, None, false);
    }

    /// True for an identifier followed by `(` that decorates a declarator,
    /// e.g. `int a GUARDED_BY(mu);`.
    fn is_attribute_macro(&self, decl: &Declarator) -> bool {
        let Some(&last) = decl.idents.last() else {
            return false;
        };
        let word = &self.toks[last].text;
        (is_all_caps(word) && decl.idents.len() >= 3)
            || (self.macros.contains_key(word) && decl.idents.len() >= 2)
    }

    /// `(*name)`, `(&name)` or `(Class::*name)` inside a declarator.
    fn is_declarator_group(&self, open: usize) -> bool {
        let mut i = open + 1;
        while let Some(t) = self.tok(i) {
            if t.is("*") || t.is("&") || t.is("^") {
                return true;
            }
            if t.is_ident() && self.tok(i + 1).is_some_and(|n| n.is("::")) {
                i += 2;
                continue;
            }
            return false;
        }
        false
    }

    /// Parse the rest of a member statement starting at the current position.
    /// `known_type` names the nested record or enum defined at the start of the
    /// statement, if any.
    fn parse_declarators(
        &mut self,
        rec: &mut RecordDecl,
        access: Access,
        stmt: usize,
        known_type: Option<String>,
        anonymous_record: bool,
    ) {
        let mut is_static = false;
        let mut finished: Vec<(Declarator, usize)> = Vec::new();
        let mut decl = Declarator::default();
        let mut terminator = None;

        while let Some(t) = self.tok(self.pos) {
            let t = t.clone();
            if decl.in_initializer {
                if t.is("(") || t.is("[") || t.is("{") {
                    self.skip_group();
                } else if t.is(",") {
                    finished.push((std::mem::take(&mut decl), self.pos));
                    self.pos += 1;
                } else if t.is(";") {
                    terminator = Some(self.pos);
                    self.pos += 1;
                    break;
                } else if t.is("}") {
                    break;
                } else {
                    self.pos += 1;
                }
                continue;
            }

            if t.is_ident() {
                let followed_by_paren = self.tok(self.pos + 1).is_some_and(|n| n.is("("));
                match t.text.as_str() {
                    "static" => is_static = true,
                    "virtual" => rec.has_virtual = true,
                    "operator" => {
                        self.parse_function(rec, stmt, None);
                        return;
                    }
                    w if PAREN_OPERATORS.contains(&w) && followed_by_paren => {
                        self.pos += 1;
                        self.skip_group();
                        continue;
                    }
                    w if SPECIFIER_KEYWORDS.contains(&w) => {}
                    _ => {
                        decl.idents.push(self.pos);
                        decl.indirect = decl.saw_indirection;
                    }
                }
                self.pos += 1;
                continue;
            }

            match t.text.as_str() {
                "(" => {
                    let close = matching(&self.toks, self.pos);
                    if decl.in_group {
                        // Parameter list of a function-pointer declarator
                    } else if self.is_declarator_group(self.pos) {
                        if let Some(inner) = (self.pos + 1..close).rev().find(|&k| self.toks[k].is_ident()) {
                            decl.idents.push(inner);
                        }
                        decl.indirect = true;
                        decl.in_group = true;
                    } else if self.is_attribute_macro(&decl) {
                        decl.idents.pop();
                    } else {
                        let name = decl.idents.last().copied();
                        self.parse_function(rec, stmt, name);
                        return;
                    }
                    self.pos = close + 1;
                }
                "[" => {
                    let attribute = self.tok(self.pos + 1).is_some_and(|n| n.is("["));
                    if !attribute && !decl.idents.is_empty() {
                        decl.array_dims += 1;
                    }
                    self.skip_group();
                }
                "<" if self.pos > stmt && self.toks[self.pos - 1].is_ident() => {
                    self.skip_angles();
                }
                "*" | "&" | "&&" | "^" => {
                    decl.saw_indirection = true;
                    self.pos += 1;
                }
                "=" | ":" => {
                    decl.in_initializer = true;
                    self.pos += 1;
                }
                "{" => decl.in_initializer = true,
                "," => {
                    finished.push((std::mem::take(&mut decl), self.pos));
                    self.pos += 1;
                }
                ";" => {
                    terminator = Some(self.pos);
                    self.pos += 1;
                    break;
                }
                "}" => break,
                _ => {
                    self.pos += 1;
                }
            }
        }
        let end_index = terminator.unwrap_or(self.pos);
        if !decl.idents.is_empty() || (anonymous_record && finished.is_empty()) {
            finished.push((decl, end_index));
        }

        if is_static || self.pos == stmt {
            return;
        }

        let terminator_span = terminator.map(|semi| {
            let t = &self.toks[semi];
            match self.tok(semi + 1) {
                Some(next) if t.expansion.is_some() && next.is(";") && next.expansion.is_none() => {
                    (t.start, next.end)
                }
                _ => (t.start, t.end),
            }
        });

        let stmt_tok = &self.toks[stmt];
        let mut base_type = known_type.clone();
        for (i, (d, end_idx)) in finished.iter().enumerate() {
            let last_tok = end_idx.saturating_sub(1).max(stmt);
            let name_tok = d.idents.last().map(|&k| &self.toks[k]);
            if i == 0 && base_type.is_none() && d.idents.len() >= 2 {
                base_type = Some(self.toks[d.idents[d.idents.len() - 2]].text.clone());
            }
            let (name, macro_expansion) = match name_tok {
                Some(n) => (n.text.clone(), n.expansion),
                None if anonymous_record => (String::new(), stmt_tok.expansion),
                None => continue,
            };
            rec.fields.push(FieldDecl {
                name,
                access,
                type_begin: stmt_tok.loc(),
                macro_expansion,
                start: stmt_tok.start,
                end: self.toks[last_tok].end,
                terminator: terminator_span,
                ty: FieldType {
                    name: base_type.clone(),
                    indirect: d.indirect,
                    array_dims: d.array_dims,
                },
            });
        }
    }

    /// Skip a member function declaration or definition whose parameter list
    /// starts at the current `(`, recording constructors.
    fn parse_function(&mut self, rec: &mut RecordDecl, stmt: usize, name_idx: Option<usize>) {
        let is_ctor = match name_idx {
            Some(n) => {
                !rec.name.is_empty()
                    && self.toks[n].text == rec.name
                    && (stmt..n).all(|k| {
                        matches!(
                            self.toks[k].text.as_str(),
                            "explicit" | "constexpr" | "inline" | "consteval"
                        )
                    })
            }
            None => false,
        };
        if !self.at("(") {
            // `operator` and friends: find the parameter list first
            while let Some(t) = self.tok(self.pos) {
                if t.is("(") || t.is(";") || t.is("}") {
                    break;
                }
                self.pos += 1;
            }
            if !self.at("(") {
                self.skip_statement();
                return;
            }
            // `operator()` has an empty group before its parameters
            if self.tok(self.pos + 1).is_some_and(|n| n.is(")"))
                && self.tok(self.pos + 2).is_some_and(|n| n.is("("))
            {
                self.pos += 2;
            }
        }
        let (inits, has_body) = self.parse_function_tail(is_ctor);
        if is_ctor {
            rec.declares_ctor = true;
            if has_body {
                let name_offset = name_idx.map_or(0, |n| self.toks[n].start);
                rec.ctor_defs.push(CtorDef {
                    file: self.file,
                    qualifier: rec.qualified.clone(),
                    name_offset,
                    inits,
                });
            }
        }
    }

    /// From a parameter list's `(` through the end of the declaration.
    /// Returns the constructor initializers and whether a body was present.
    fn parse_function_tail(&mut self, is_ctor: bool) -> (Vec<InitItem>, bool) {
        let params = self.param_names(self.pos);
        self.skip_group();
        let mut inits = Vec::new();
        while let Some(t) = self.tok(self.pos) {
            if t.is(";") {
                self.pos += 1;
                return (inits, false);
            }
            if t.is("=") {
                self.skip_statement();
                return (inits, false);
            }
            if t.is("}") {
                return (inits, false);
            }
            if t.is("{") {
                self.skip_group();
                if self.at(";") {
                    self.pos += 1;
                }
                return (inits, true);
            }
            if t.is(":") && is_ctor {
                inits = self.parse_ctor_inits(&params);
                continue;
            }
            if t.is("(") || t.is("[") {
                self.skip_group();
                continue;
            }
            self.pos += 1;
        }
        (inits, false)
    }

    /// Parameter names declared in the list opening at `open`.
    fn param_names(&self, open: usize) -> Vec<String> {
        let close = matching(&self.toks, open);
        let mut names = Vec::new();
        for (a, b) in split_top_level(&self.toks, open, close) {
            let mut idents = Vec::new();
            for t in &self.toks[a..b] {
                if t.is("=") || t.is("[") {
                    break;
                }
                if t.is_ident() && !SPECIFIER_KEYWORDS.contains(&t.text.as_str()) {
                    idents.push(t.text.clone());
                }
            }
            if idents.len() >= 2 {
                if let Some(name) = idents.pop() {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Parse `: a(x), Base{y}, ...` up to the constructor body.
    fn parse_ctor_inits(&mut self, params: &[String]) -> Vec<InitItem> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut expanded = false;
        loop {
            let item_start = self.pos;
            let mut segments = Vec::new();
            let mut templated = false;
            while let Some(t) = self.tok(self.pos) {
                if t.is("::") || t.is("template") {
                    self.pos += 1;
                } else if t.is("<") {
                    templated = true;
                    self.skip_angles();
                } else if t.is_ident() {
                    segments.push(t.text.clone());
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let Some(name) = segments.last().cloned() else {
                break;
            };
            if !(self.at("(") || self.at("{")) {
                break;
            }
            let open = self.pos;
            let close = matching(&self.toks, open);
            let refs = self.collect_refs(open + 1, close, params);
            self.pos = close + 1;
            if self.at("...") {
                self.pos += 1;
            }
            expanded |= self.toks[item_start..self.pos].iter().any(|t| t.expansion.is_some());
            items.push(InitItem {
                name,
                simple: segments.len() == 1 && !templated,
                start: self.toks[item_start].start,
                end: self.toks[self.pos - 1].end,
                refs,
            });
            if self.at(",") {
                self.pos += 1;
                continue;
            }
            break;
        }
        // Clauses produced by a macro have no separable source ranges
        if expanded {
            items.clear();
        }
        items
    }

    /// Identifiers in `toks[from..to]` that read a member through `this`.
    fn collect_refs(&self, from: usize, to: usize, params: &[String]) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for k in from..to {
            let t = &self.toks[k];
            if !t.is_ident() || t.is("this") {
                continue;
            }
            let prev = &self.toks[k - 1];
            let through_this = prev.is("->") && k >= 2 && self.toks[k - 2].is("this");
            if !through_this {
                if prev.is(".") || prev.is("->") || prev.is("::") {
                    continue;
                }
                if self.tok(k + 1).is_some_and(|n| n.is("::")) {
                    continue;
                }
                if params.contains(&t.text) {
                    continue;
                }
            }
            if !refs.contains(&t.text) {
                refs.push(t.text.clone());
            }
        }
        refs
    }

    /// `Name :: Name (` at the current position.
    fn at_out_of_line_ctor(&self) -> bool {
        let (Some(a), Some(colons), Some(b), Some(paren)) = (
            self.tok(self.pos),
            self.tok(self.pos + 1),
            self.tok(self.pos + 2),
            self.tok(self.pos + 3),
        ) else {
            return false;
        };
        a.is_ident() && colons.is("::") && b.is_ident() && a.text == b.text && paren.is("(")
    }

    fn parse_out_of_line_ctor(&mut self, prefix: &[String]) {
        let mut qualifier: Vec<String> = Vec::new();
        let mut back = self.pos;
        while back >= 2 && self.toks[back - 1].is("::") && self.toks[back - 2].is_ident() {
            qualifier.insert(0, self.toks[back - 2].text.clone());
            back -= 2;
        }
        let mut full = prefix.to_vec();
        full.extend(qualifier);
        full.push(self.toks[self.pos].text.clone());

        let name_offset = self.toks[self.pos + 2].start;
        self.pos += 3;
        let (inits, has_body) = self.parse_function_tail(true);
        if has_body {
            self.unit.ctor_defs.push(CtorDef {
                file: self.file,
                qualifier: full,
                name_offset,
                inits,
            });
        }
    }

    fn parse_typedef(&mut self, prefix: &[String]) {
        self.pos += 1;
        if self.at("struct") || self.at("class") || self.at("union") {
            if let Some(mut rec) = self.try_record(prefix) {
                let aliases = self.alias_declarators(self.pos, None);
                if rec.name.is_empty() {
                    if let Some(first) = aliases.first() {
                        rec.name = first.clone();
                        rec.qualified.push(first.clone());
                    }
                }
                for alias in aliases.iter().filter(|a| **a != rec.name) {
                    self.unit.aliases.push(TypeAlias {
                        alias: alias.clone(),
                        target: rec.name.clone(),
                    });
                }
                self.unit.records.push(rec);
                self.skip_statement();
                return;
            }
        }
        // typedef <type> Alias[, Alias...];
        let start = self.pos;
        let mut end = start;
        while let Some(t) = self.tok(end) {
            if t.is(";") || t.is("{") || t.is("}") {
                break;
            }
            end += 1;
        }
        let first_comma = (start..end).find(|&k| self.toks[k].is(",")).unwrap_or(end);
        let type_idents: Vec<usize> = (start..first_comma)
            .filter(|&k| self.toks[k].is_ident() && !SPECIFIER_KEYWORDS.contains(&self.toks[k].text.as_str()))
            .collect();
        if type_idents.len() >= 2 {
            let target = self.toks[type_idents[type_idents.len() - 2]].text.clone();
            for alias in self.alias_declarators(type_idents[type_idents.len() - 1], Some(end)) {
                if alias != target {
                    self.unit.aliases.push(TypeAlias { alias, target: target.clone() });
                }
            }
        }
        self.skip_statement();
    }

    /// Alias names in a typedef's declarator list starting at `from`. Pointer,
    /// array and function declarators do not alias the record itself.
    fn alias_declarators(&self, from: usize, end: Option<usize>) -> Vec<String> {
        let end = end.unwrap_or_else(|| {
            (from..self.toks.len())
                .find(|&k| self.toks[k].is(";") || self.toks[k].is("}"))
                .unwrap_or(self.toks.len())
        });
        let mut aliases = Vec::new();
        let mut direct = true;
        let mut name = None;
        for k in from..end {
            let t = &self.toks[k];
            if t.is(",") {
                if let (true, Some(n)) = (direct, name.take()) {
                    aliases.push(n);
                }
                direct = true;
            } else if t.is("*") || t.is("&") || t.is("[") || t.is("(") {
                direct = false;
            } else if t.is_ident() && !SPECIFIER_KEYWORDS.contains(&t.text.as_str()) {
                name = Some(t.text.clone());
            }
        }
        if let (true, Some(n)) = (direct, name) {
            aliases.push(n);
        }
        aliases
    }

    /// `using Alias = Type;`
    fn parse_using(&mut self) {
        let is_alias = self.tok(self.pos + 1).is_some_and(|t| t.is_ident())
            && self.tok(self.pos + 2).is_some_and(|t| t.is("="));
        if is_alias {
            let alias = self.toks[self.pos + 1].text.clone();
            let mut k = self.pos + 3;
            let mut target = None;
            let mut direct = true;
            while let Some(t) = self.tok(k) {
                if t.is(";") || t.is("}") {
                    break;
                }
                if t.is("*") || t.is("&") || t.is("(") || t.is("[") || t.is("<") {
                    direct = false;
                } else if t.is_ident() && !SPECIFIER_KEYWORDS.contains(&t.text.as_str()) {
                    target = Some(t.text.clone());
                }
                k += 1;
            }
            if let (true, Some(target)) = (direct, target) {
                self.unit.aliases.push(TypeAlias { alias, target });
            }
        }
        self.pos += 1;
        self.skip_statement();
    }
}
