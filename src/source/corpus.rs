// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! In-memory corpus of C/C++ files
//!
//! Loads every file once, lexes and parses it, and answers the structural
//! queries of [`SourceModel`]: record lookup, constructor definitions, and
//! brace initializer lists typed as a record.

use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReorderError;
use crate::model::{
    Access, AggregateInitModel, ConstructorModel, FieldModel, InitTarget, InitializerModel, RecordModel,
};
use crate::source::file::{FileId, SourceFile, SourceRange};
use crate::source::lexer::{lex, Token};
use crate::source::parser::{cook, matching, parse_unit, split_top_level, CtorDef, MacroTable, RecordDecl, Tok};
use crate::source::{SourceModel, SourceText, TokenScanner};

/// Upper bound on typedef chains followed when resolving a type name.
const MAX_ALIAS_DEPTH: usize = 16;

pub struct SourceCorpus {
    files: Vec<SourceFile>,
    raw: Vec<Vec<Token>>,
    /// Filtered, unexpanded token streams
    cooked: Vec<Vec<Tok>>,
    records: Vec<RecordDecl>,
    out_of_line_ctors: Vec<CtorDef>,
    aliases: HashMap<String, String>,
}

impl SourceCorpus {
    /// Build a corpus from in-memory sources. `FileId`s follow input order.
    pub fn from_sources(sources: Vec<(PathBuf, String)>) -> Result<Self, ReorderError> {
        let mut files = Vec::new();
        let mut raw = Vec::new();
        let mut cooked = Vec::new();
        let mut macros = MacroTable::new();

        for (i, (path, text)) in sources.into_iter().enumerate() {
            let file = SourceFile::new(FileId(i), path, text);
            let tokens = lex(&file)?;
            let (toks, defs) = cook(&file, &tokens);
            macros.extend(defs);
            files.push(file);
            raw.push(tokens);
            cooked.push(toks);
        }

        let mut records = Vec::new();
        let mut out_of_line_ctors = Vec::new();
        let mut aliases = HashMap::new();
        for (file, toks) in files.iter().zip(&cooked) {
            let unit = parse_unit(file.id(), file.is_c_source(), toks.clone(), &macros);
            trace!(
                "{}: {} records, {} out-of-line constructors",
                file.path().display(),
                unit.records.len(),
                unit.ctor_defs.len()
            );
            records.extend(unit.records);
            out_of_line_ctors.extend(unit.ctor_defs);
            for alias in unit.aliases {
                aliases.insert(alias.alias, alias.target);
            }
        }

        debug!(
            "Loaded {} files with {} record definitions and {} macros",
            files.len(),
            records.len(),
            macros.len()
        );
        Ok(SourceCorpus {
            files,
            raw,
            cooked,
            records,
            out_of_line_ctors,
            aliases,
        })
    }

    /// Read and build a corpus from files on disk.
    pub fn load(paths: &[PathBuf]) -> Result<Self, ReorderError> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            sources.push((path.clone(), fs::read_to_string(path)?));
        }
        Self::from_sources(sources)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    /// Follow typedef and `using` aliases to the underlying type name.
    fn resolve_alias<'s>(&'s self, name: &'s str) -> &'s str {
        let mut current = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            match self.aliases.get(current) {
                Some(target) if target != current => current = target,
                _ => break,
            }
        }
        current
    }

    fn has_constructors(&self, decl: &RecordDecl) -> bool {
        decl.declares_ctor || self.out_of_line_ctors.iter().any(|c| ctor_belongs(c, decl))
    }

    fn is_aggregate(&self, decl: &RecordDecl) -> bool {
        if decl.c_source {
            return true;
        }
        !self.has_constructors(decl)
            && !decl.has_virtual
            && decl.fields.iter().all(|f| f.access == Access::Public)
            && decl.bases.iter().all(|b| !b.is_virtual && b.access == Access::Public)
    }

    fn record_model(&self, key: usize) -> RecordModel {
        let decl = &self.records[key];
        let file = self.file(decl.file);
        let raw = &self.raw[decl.file.0];

        let mut fields = Vec::with_capacity(decl.fields.len());
        let mut floor = 0;
        for (index, f) in decl.fields.iter().enumerate() {
            let decl_end = f.terminator.map_or(f.end, |(_, end)| end.max(f.end));
            let start = leading_comment_start(file, raw, f.start, floor);
            let end = trailing_comment_end(file, raw, decl_end);
            floor = end;
            fields.push(FieldModel {
                name: f.name.clone(),
                index,
                access: f.access,
                type_begin: f.type_begin,
                range: SourceRange::new(decl.file, f.start, f.end),
                full_range: SourceRange::new(decl.file, start, end),
                macro_expansion: f.macro_expansion.map(|(s, e)| SourceRange::new(decl.file, s, e)),
            });
        }

        RecordModel {
            name: decl.qualified.join("::"),
            file: decl.file,
            fields,
            has_constructors: self.has_constructors(decl),
            is_aggregate: self.is_aggregate(decl),
            key,
        }
    }

    fn constructor_model(&self, record: &RecordModel, def: &CtorDef) -> ConstructorModel {
        let initializers = def
            .inits
            .iter()
            .map(|item| {
                let field = if item.simple { record.field_index(&item.name) } else { None };
                let target = match field {
                    Some(i) if !item.name.is_empty() => InitTarget::Field(i),
                    _ => InitTarget::Base(item.name.clone()),
                };
                let uses = item.refs.iter().filter_map(|r| record.field_index(r)).collect();
                InitializerModel {
                    target,
                    range: SourceRange::new(def.file, item.start, item.end),
                    uses,
                }
            })
            .collect();
        ConstructorModel {
            file: def.file,
            name_offset: def.name_offset,
            is_implicit: false,
            initializers,
        }
    }
}

/// `name` is the unqualified name, a `::`-qualified suffix, or a fully
/// qualified `::`-anchored name of `qualified`.
fn matches_name(qualified: &[String], name: &str) -> bool {
    let (anchored, rest) = match name.strip_prefix("::") {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let segments: Vec<&str> = rest.split("::").collect();
    if segments.len() > qualified.len() || (anchored && segments.len() != qualified.len()) {
        return false;
    }
    qualified[qualified.len() - segments.len()..]
        .iter()
        .zip(&segments)
        .all(|(a, b)| a == b)
}

fn ctor_belongs(def: &CtorDef, decl: &RecordDecl) -> bool {
    !decl.name.is_empty() && !def.qualifier.is_empty() && decl.qualified.ends_with(&def.qualifier)
}

/// Walk back through comments on the line of `start` or at its column,
/// never below `floor`.
fn leading_comment_start(file: &SourceFile, raw: &[Token], start: usize, floor: usize) -> usize {
    let (line, column) = file.line_col(start);
    let mut idx = raw.partition_point(|t| t.start < start);
    let mut begin = start;
    while idx > 0 {
        let tok = &raw[idx - 1];
        if !tok.is_comment() || tok.start < floor {
            break;
        }
        let (l, c) = file.line_col(tok.start);
        if l != line && c != column {
            break;
        }
        begin = tok.start;
        idx -= 1;
    }
    begin
}

/// Walk forward through comments starting right of the declaration's last
/// character.
fn trailing_comment_end(file: &SourceFile, raw: &[Token], end: usize) -> usize {
    let column = file.column(end.saturating_sub(1));
    let mut idx = raw.partition_point(|t| t.start < end);
    let mut stop = end;
    while let Some(tok) = raw.get(idx) {
        if !tok.is_comment() || file.column(tok.start) <= column {
            break;
        }
        stop = tok.end;
        idx += 1;
    }
    stop
}

fn braced(toks: &[Tok], start: usize, end: usize) -> bool {
    toks[start].is("{") && matching(toks, start) + 1 == end
}

fn has_top_level_semicolon(toks: &[Tok], open: usize, close: usize) -> bool {
    let mut i = open + 1;
    while i < close {
        let t = &toks[i];
        if t.is("(") || t.is("[") || t.is("{") {
            i = matching(toks, i) + 1;
            continue;
        }
        if t.is(";") {
            return true;
        }
        i += 1;
    }
    false
}

/// `struct|class|union [Name] [: bases] {` in a token stream.
struct RecordHead {
    /// Index of the record's own name
    name: Option<usize>,
    /// Index of the `:` opening the base clause
    colon: Option<usize>,
    /// Index of the body's `{`
    open: usize,
}

fn record_heads(toks: &[Tok]) -> Vec<RecordHead> {
    let mut heads = Vec::new();
    for (kw, t) in toks.iter().enumerate() {
        if !(t.is("struct") || t.is("class") || t.is("union")) {
            continue;
        }
        if kw > 0 && toks[kw - 1].is("enum") {
            continue;
        }
        let mut i = kw + 1;
        let mut name = None;
        let mut colon = None;
        let mut angle = 0usize;
        while let Some(t) = toks.get(i) {
            if t.is("{") || t.is(";") || t.is("}") || t.is("=") || t.is(")") {
                break;
            }
            if colon.is_some() {
                if t.is("(") || t.is("[") {
                    i = matching(toks, i) + 1;
                } else {
                    i += 1;
                }
                continue;
            }
            if t.is("(") {
                // Only attribute operands may appear before the body
                let attribute = i > 0 && RECORD_ATTRIBUTES.iter().any(|a| toks[i - 1].is(a));
                if !attribute {
                    break;
                }
                i = matching(toks, i) + 1;
                continue;
            }
            if t.is("[") {
                if !toks.get(i + 1).is_some_and(|n| n.is("[")) {
                    break;
                }
                i = matching(toks, i) + 1;
                continue;
            }
            if t.is(":") {
                colon = Some(i);
            } else if t.is("<") {
                angle += 1;
            } else if t.is(">") {
                angle = angle.saturating_sub(1);
            } else if t.is_ident() {
                let attribute = RECORD_ATTRIBUTES.iter().any(|a| t.is(a));
                if angle == 0 && !attribute && !t.is("final") {
                    name = Some(i);
                }
            } else if !(t.is("::") || t.is(",")) {
                break;
            }
            i += 1;
        }
        if toks.get(i).is_some_and(|t| t.is("{")) {
            heads.push(RecordHead { name, colon, open: i });
        }
    }
    heads
}

/// Attribute spellings allowed between `struct` and the record's name.
const RECORD_ATTRIBUTES: &[&str] = &["__attribute__", "__attribute", "__declspec", "alignas", "_Alignas"];

/// Tokens before a type name that rule out a declaration or expression of it.
const NOT_A_USE: &[&str] = &[
    ".", "->", "namespace", "enum", "public", "private", "protected", "virtual", "~", "friend",
];

const DECLARATOR_SPECIFIERS: &[&str] = &["const", "volatile", "constexpr", "static", "restrict", "__restrict"];

/// Finds brace lists typed as one record across the corpus.
struct AggregateScan<'c> {
    corpus: &'c SourceCorpus,
    target: &'c str,
    /// Aggregate records by unqualified name, for following nested lists
    containers: HashMap<&'c str, &'c RecordDecl>,
    /// Type names whose lists may contain a target list
    interesting: HashSet<&'c str>,
    seen: HashSet<(FileId, usize)>,
    found: Vec<AggregateInitModel>,
}

impl<'c> AggregateScan<'c> {
    fn new(corpus: &'c SourceCorpus, key: usize) -> Self {
        let target_decl = &corpus.records[key];
        let target = target_decl.name.as_str();

        let mut containers: HashMap<&'c str, &'c RecordDecl> = HashMap::new();
        containers.insert(target, target_decl);
        for decl in &corpus.records {
            if !decl.name.is_empty() && corpus.is_aggregate(decl) {
                containers.entry(decl.name.as_str()).or_insert(decl);
            }
        }

        let mut interesting: HashSet<&'c str> = HashSet::from([target]);
        loop {
            let mut grew = false;
            for (&name, decl) in &containers {
                if interesting.contains(name) {
                    continue;
                }
                let holds_interesting = decl
                    .bases
                    .iter()
                    .any(|b| interesting.contains(corpus.resolve_alias(&b.name)))
                    || decl.fields.iter().any(|f| {
                        !f.ty.indirect
                            && f.ty
                                .name
                                .as_deref()
                                .is_some_and(|n| interesting.contains(corpus.resolve_alias(n)))
                    });
                if holds_interesting {
                    interesting.insert(name);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        AggregateScan {
            corpus,
            target,
            containers,
            interesting,
            seen: HashSet::new(),
            found: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<AggregateInitModel> {
        let corpus = self.corpus;
        for (file, toks) in corpus.files.iter().zip(&corpus.cooked) {
            self.scan_file(file.id(), toks);
        }
        debug!("Found {} initializer lists for {}", self.found.len(), self.target);
        self.found
    }

    fn scan_file(&mut self, file: FileId, toks: &'c [Tok]) {
        let corpus = self.corpus;
        let mut in_base_clause = vec![false; toks.len()];
        for head in record_heads(toks) {
            if let Some(colon) = head.colon {
                in_base_clause[colon..head.open].fill(true);
            }
            // `struct P { .. } p = {..};`
            let Some(name) = head.name else {
                continue;
            };
            let ty = corpus.resolve_alias(&toks[name].text);
            let close = matching(toks, head.open);
            if self.interesting.contains(ty) && toks[close].is("}") {
                self.scan_declarators(file, toks, close + 1, ty);
            }
        }

        for (k, t) in toks.iter().enumerate() {
            if !t.is_ident() || in_base_clause[k] {
                continue;
            }
            let ty = corpus.resolve_alias(&t.text);
            if !self.interesting.contains(ty) {
                continue;
            }
            let prev = k.checked_sub(1).map(|p| &toks[p]);
            let next = toks.get(k + 1);
            if prev.is_some_and(|p| NOT_A_USE.iter().any(|s| p.is(s))) {
                continue;
            }
            if next.is_some_and(|n| n.is("::") || n.is("<")) {
                continue;
            }
            let elaborated = prev.is_some_and(|p| p.is("struct") || p.is("class") || p.is("union"));
            if elaborated && next.is_some_and(|n| n.is("{") || n.is(":") || n.is("final")) {
                continue;
            }

            let head = if elaborated { k - 1 } else { k };
            let compound_literal = head > 0
                && toks[head - 1].is("(")
                && next.is_some_and(|n| n.is(")"))
                && toks.get(k + 2).is_some_and(|n| n.is("{"));
            if compound_literal {
                self.visit_list(file, toks, k + 2, ty, 0);
            } else if next.is_some_and(|n| n.is("{")) {
                self.visit_list(file, toks, k + 1, ty, 0);
            } else {
                self.scan_declarators(file, toks, k + 1, ty);
            }
        }
    }

    /// Declarators after a type name: `x = {..}`, `x{..}`, `a[N] = {..}`, `, y = {..}`.
    fn scan_declarators(&mut self, file: FileId, toks: &'c [Tok], mut i: usize, ty: &'c str) {
        loop {
            let mut indirect = false;
            while let Some(t) = toks.get(i) {
                if t.is("*") || t.is("&") {
                    indirect = true;
                } else if !DECLARATOR_SPECIFIERS.iter().any(|s| t.is(s)) {
                    break;
                }
                i += 1;
            }
            if !toks.get(i).is_some_and(|t| t.is_ident()) {
                return;
            }
            i += 1;

            let mut dims = 0;
            while toks.get(i).is_some_and(|t| t.is("[")) {
                dims += 1;
                i = matching(toks, i) + 1;
            }

            let at = |j: usize, s: &str| toks.get(j).is_some_and(|t| t.is(s));
            let open = if at(i, "=") && at(i + 1, "{") {
                Some(i + 1)
            } else if at(i, "{") {
                Some(i)
            } else {
                None
            };
            if let Some(open) = open {
                if !indirect {
                    self.visit_list(file, toks, open, ty, dims);
                }
                i = matching(toks, open) + 1;
            } else if at(i, "=") {
                i += 1;
                while let Some(t) = toks.get(i) {
                    if t.is(",") || t.is(";") || t.is(")") || t.is("}") {
                        break;
                    }
                    if t.is("(") || t.is("[") || t.is("{") {
                        i = matching(toks, i) + 1;
                    } else {
                        i += 1;
                    }
                }
            }
            if !at(i, ",") {
                return;
            }
            i += 1;
        }
    }

    /// Visit the list opening at `open`, typed as `ty` with `dims` array
    /// dimensions still to peel.
    fn visit_list(&mut self, file: FileId, toks: &'c [Tok], open: usize, ty: &'c str, dims: usize) {
        let close = matching(toks, open);
        if close <= open || !toks[close].is("}") || has_top_level_semicolon(toks, open, close) {
            return;
        }
        let parts = split_top_level(toks, open, close);
        if parts.iter().any(|&(a, b)| a >= b) {
            return;
        }
        if parts.iter().any(|&(a, _)| toks[a].is(".") || toks[a].is("[")) {
            trace!("Skipping designated initializer at offset {}", toks[open].start);
            return;
        }

        if dims > 0 {
            if parts.iter().all(|&(a, b)| braced(toks, a, b)) {
                for &(a, _) in &parts {
                    self.visit_list(file, toks, a, ty, dims - 1);
                }
            } else if ty == self.target && !parts.is_empty() {
                // Brace-elided elements: the lists exist only implicitly
                self.emit(file, toks, open, close, false, Vec::new());
            }
            return;
        }

        if ty == self.target {
            let inits = parts
                .iter()
                .map(|&(a, b)| SourceRange::new(file, toks[a].start, toks[b - 1].end))
                .collect();
            self.emit(file, toks, open, close, true, inits);
        }

        let corpus = self.corpus;
        let Some(&container) = self.containers.get(ty) else {
            return;
        };
        // Base sub-objects come first, then the fields
        let members = container
            .bases
            .iter()
            .map(|b| Some((b.name.as_str(), 0)))
            .chain(container.fields.iter().map(|f| match f.ty.name.as_deref() {
                Some(name) if !f.ty.indirect => Some((name, f.ty.array_dims)),
                _ => None,
            }));
        for (member, &(a, b)) in members.zip(&parts) {
            let Some((name, dims)) = member else {
                continue;
            };
            let member_ty = corpus.resolve_alias(name);
            if braced(toks, a, b) && self.interesting.contains(member_ty) {
                self.visit_list(file, toks, a, member_ty, dims);
            }
        }
    }

    fn emit(
        &mut self,
        file: FileId,
        toks: &[Tok],
        open: usize,
        close: usize,
        is_explicit: bool,
        inits: Vec<SourceRange>,
    ) {
        if !self.seen.insert((file, toks[open].start)) {
            return;
        }
        self.found.push(AggregateInitModel {
            is_explicit,
            range: SourceRange::new(file, toks[open].start, toks[close].end),
            inits,
        });
    }
}

impl SourceText for SourceCorpus {
    fn path(&self, file: FileId) -> &Path {
        self.file(file).path()
    }

    fn text(&self, range: SourceRange) -> &str {
        self.file(range.file).slice(range.start, range.end)
    }

    fn line_col(&self, file: FileId, offset: usize) -> (usize, usize) {
        self.file(file).line_col(offset)
    }
}

impl TokenScanner for SourceCorpus {
    fn raw_tokens(&self, range: SourceRange) -> &[Token] {
        let raw = &self.raw[range.file.0];
        let lo = raw.partition_point(|t| t.start < range.start);
        let hi = raw.partition_point(|t| t.start < range.end);
        &raw[lo..hi.max(lo)]
    }
}

impl SourceModel for SourceCorpus {
    fn find_record(&self, name: &str) -> Result<RecordModel, ReorderError> {
        let keys: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.name.is_empty() && matches_name(&r.qualified, name))
            .map(|(i, _)| i)
            .collect();
        match keys.as_slice() {
            [] => Err(ReorderError::DefinitionNotFound(name.to_string())),
            [key] => Ok(self.record_model(*key)),
            _ => Err(ReorderError::AmbiguousDefinition {
                name: name.to_string(),
                count: keys.len(),
            }),
        }
    }

    fn constructors(&self, record: &RecordModel) -> Vec<ConstructorModel> {
        let decl = &self.records[record.key];
        decl.ctor_defs
            .iter()
            .chain(self.out_of_line_ctors.iter().filter(|c| ctor_belongs(c, decl)))
            .map(|def| self.constructor_model(record, def))
            .collect()
    }

    fn aggregate_inits(&self, record: &RecordModel) -> Vec<AggregateInitModel> {
        AggregateScan::new(self, record.key).run()
    }
}
