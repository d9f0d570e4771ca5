// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! Source discovery and run configuration
//!
//! Files named on the command line are always taken. Directories are walked
//! for C and C++ sources, skipping build output, VCS metadata and hidden
//! directories.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Extensions picked up when walking a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"];

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name == "target" || name.starts_with('.'))
}

/// Expand files and directories into a sorted, de-duplicated list of sources.
pub fn find_source_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .into_iter()
                    .filter_entry(|e| !is_skipped_dir(e))
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
                    .map(|e| e.path().to_path_buf()),
            );
        }
    }
    files.sort();
    files.dedup();
    files
}

/// Split `a, b,c` into field names.
pub fn parse_fields_order(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// What to reorder, where, and how to report it.
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    pub record_name: String,
    pub fields_order: Vec<String>,
    pub paths: Vec<PathBuf>,
    /// Write rewritten files back instead of printing them
    pub in_place: bool,
    /// Print the plan as JSON instead of rewritten text
    pub json: bool,
}

impl ReorderConfig {
    pub fn new(record_name: &str, fields_order: &str, paths: Vec<PathBuf>) -> Self {
        ReorderConfig {
            record_name: record_name.to_string(),
            fields_order: parse_fields_order(fields_order),
            paths,
            in_place: false,
            json: false,
        }
    }

    pub fn source_files(&self) -> Vec<PathBuf> {
        find_source_files(&self.paths)
    }
}
