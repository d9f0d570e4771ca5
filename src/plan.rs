// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Text replacements grouped per file
//!
//! Every rewriter returns its own plan; the orchestrator merges them. A plan
//! never holds two replacements that touch the same bytes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::ReorderError;
use crate::source::{SourceRange, SourceText};

/// Replace `length` bytes at `offset` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub offset: usize,
    pub length: usize,
    pub text: String,
}

impl Replacement {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    fn overlaps(&self, other: &Replacement) -> bool {
        if self.length == 0 || other.length == 0 {
            return self.offset == other.offset;
        }
        self.offset < other.end() && other.offset < self.end()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplacementPlan {
    files: BTreeMap<PathBuf, Vec<Replacement>>,
}

impl ReplacementPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one replacement. An exact duplicate is ignored; one that overlaps
    /// an existing replacement is rejected.
    pub fn add(&mut self, path: &Path, replacement: Replacement) -> Result<(), ReorderError> {
        let list = self.files.entry(path.to_path_buf()).or_default();
        if list.contains(&replacement) {
            return Ok(());
        }
        if list.iter().any(|r| r.overlaps(&replacement)) {
            return Err(ReorderError::OverlappingReplacement {
                path: path.to_path_buf(),
                offset: replacement.offset,
            });
        }
        let at = list.partition_point(|r| r.offset < replacement.offset);
        list.insert(at, replacement);
        Ok(())
    }

    /// Put the text of `new` where `old` is.
    pub fn swap_in<S: SourceText + ?Sized>(
        &mut self,
        src: &S,
        old: SourceRange,
        new: SourceRange,
    ) -> Result<(), ReorderError> {
        let replacement = Replacement {
            offset: old.start,
            length: old.len(),
            text: src.text(new).to_string(),
        };
        self.add(src.path(old.file), replacement)
    }

    /// Fold `other` into this plan under the same rules as [`Self::add`].
    pub fn merge(&mut self, other: ReplacementPlan) -> Result<(), ReorderError> {
        for (path, list) in other.files {
            for replacement in list {
                self.add(&path, replacement)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    /// Total number of replacements across all files.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Files with at least one replacement.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(path, _)| path.as_path())
    }

    pub fn replacements(&self, path: &Path) -> &[Replacement] {
        self.files.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rewrite `text`, the current contents of `path`.
    pub fn apply_to(&self, path: &Path, text: &str) -> String {
        let mut out = text.to_string();
        for r in self.replacements(path).iter().rev() {
            out.replace_range(r.offset..r.end(), &r.text);
        }
        out
    }

    /// Rewrite every changed file among `files` (path, current text) on disk.
    ///
    /// All rewritten files are staged next to their originals first; none is
    /// replaced unless every one of them staged. Returns the rewritten paths.
    pub fn write_all<'a, I>(&self, files: I) -> Result<Vec<PathBuf>, ReorderError>
    where
        I: IntoIterator<Item = (&'a Path, &'a str)>,
    {
        let mut staged = Vec::new();
        for (path, text) in files {
            if self.replacements(path).is_empty() {
                continue;
            }
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut tmp = NamedTempFile::new_in(dir)?;
            if let Ok(meta) = fs::metadata(path) {
                tmp.as_file().set_permissions(meta.permissions())?;
            }
            tmp.write_all(self.apply_to(path, text).as_bytes())?;
            tmp.flush()?;
            staged.push((path.to_path_buf(), tmp));
        }
        let mut written = Vec::with_capacity(staged.len());
        for (path, tmp) in staged {
            tmp.persist(&path).map_err(|e| ReorderError::Io(e.error))?;
            written.push(path);
        }
        Ok(written)
    }
}
