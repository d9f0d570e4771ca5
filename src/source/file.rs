// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Loaded source files and byte ranges into them.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Index of a file inside a [`crate::SourceCorpus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub usize);

/// Half-open byte range `[start, end)` in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(file: FileId, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        SourceRange { file, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two ranges share at least one byte.
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        self.file == other.file && self.start < other.end && other.start < self.end
    }
}

/// A source file held in memory with a line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: FileId,
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(id: FileId, path: PathBuf, text: String) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceFile { id, path, text, line_starts }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[start..end]
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line_idx + 1, offset - self.line_starts[line_idx] + 1)
    }

    pub fn line(&self, offset: usize) -> usize {
        self.line_col(offset).0
    }

    pub fn column(&self, offset: usize) -> usize {
        self.line_col(offset).1
    }

    /// Plain C translation unit (no constructors, every record is an aggregate).
    pub fn is_c_source(&self) -> bool {
        self.path.extension().is_some_and(|e| e == "c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let f = SourceFile::new(FileId(0), PathBuf::from("a.h"), "ab\ncd\n\nx".to_string());
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_col(1), (1, 2));
        assert_eq!(f.line_col(3), (2, 1));
        assert_eq!(f.line_col(6), (3, 1));
        assert_eq!(f.line_col(7), (4, 1));
    }

    #[test]
    fn test_overlaps() {
        let a = SourceRange::new(FileId(0), 0, 4);
        let b = SourceRange::new(FileId(0), 4, 6);
        let c = SourceRange::new(FileId(0), 3, 5);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(!a.overlaps(&SourceRange::new(FileId(1), 0, 4)));
    }

    #[test]
    fn test_c_source_detection() {
        let c = SourceFile::new(FileId(0), PathBuf::from("x.c"), String::new());
        let h = SourceFile::new(FileId(1), PathBuf::from("x.h"), String::new());
        assert!(c.is_c_source());
        assert!(!h.is_c_source());
    }
}
