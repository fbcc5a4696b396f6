//! Second-pass resolution for diff-style hunks.
//!
//! The unified-diff format carries no line numbers, so its lexer only
//! records each hunk's line sequence. Once the stream ends, this pass
//! anchors every hunk by locating its context+removed run in the file's
//! current content and rewrites the provisional position into a real
//! `Interval`.
//!
//! Matching is best-effort nearest-match, not guaranteed-correct: with
//! duplicated code blocks the run can match the wrong occurrence. The
//! policy is (1) exact match, preferring the first candidate at or after
//! the previous hunk's resolved end, else the closest one before it;
//! (2) the same search with all whitespace stripped; (3) a per-file
//! resolution error. This limitation is accepted rather than papered
//! over.

use crate::edit::Edit;
use crate::error::ParseIssue;
use crate::lexers::LexSink;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stitch_common::Interval;

/// Read access to the current content of files the hunks target.
/// Implemented by the apply-side workspace; tests supply an in-memory
/// version.
pub trait SourceReader {
    /// The file's current lines, or `None` if it does not exist.
    fn read_lines(&self, path: &Path) -> Option<Vec<String>>;
}

/// A reader over nothing; every path reads as missing. Useful for
/// dry-parsing formats that carry explicit line numbers.
pub struct EmptyReader;

impl SourceReader for EmptyReader {
    fn read_lines(&self, _path: &Path) -> Option<Vec<String>> {
        None
    }
}

/// One line of a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Removed(String),
    Added(String),
}

/// A hunk as lexed: a line sequence with no position yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHunk {
    pub lines: Vec<DiffLine>,
}

impl RawHunk {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The contiguous run this hunk must match in the original file:
    /// context and removed lines, in order.
    pub fn before_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                DiffLine::Context(text) | DiffLine::Removed(text) => Some(text.clone()),
                DiffLine::Added(_) => None,
            })
            .collect()
    }

    /// The run that replaces it: context and added lines, in order.
    pub fn after_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                DiffLine::Context(text) | DiffLine::Added(text) => Some(text.clone()),
                DiffLine::Removed(_) => None,
            })
            .collect()
    }
}

/// All hunks lexed for one file, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHunks {
    pub path: PathBuf,
    pub hunks: Vec<RawHunk>,
}

/// Resolve every pending hunk in the sink against current file content,
/// converting each into a `Replacement` edit (with an `EditClosed` event
/// now that the interval is known). Failures are reported per file;
/// other files proceed.
pub fn resolve_hunks(sink: &mut LexSink, reader: &dyn SourceReader) {
    // Files created earlier in this same turn resolve against their
    // seeded content, not the (nonexistent) on-disk file.
    let mut created: HashMap<PathBuf, Vec<String>> = HashMap::new();
    for edit in &sink.edits {
        if let Edit::Creation { path, content } = edit {
            let lines = content
                .as_deref()
                .map(|c| {
                    c.lines().map(str::to_string).collect()
                })
                .unwrap_or_default();
            created.insert(path.clone(), lines);
        }
    }

    for file in std::mem::take(&mut sink.hunk_files) {
        let base = match created.get(&file.path) {
            Some(lines) => lines.clone(),
            None => match reader.read_lines(&file.path) {
                Some(lines) => lines,
                None => {
                    sink.report(ParseIssue::MissingFile { path: file.path });
                    continue;
                }
            },
        };
        resolve_file(&file.path, &file.hunks, &base, sink);
    }
}

fn resolve_file(path: &Path, hunks: &[RawHunk], base: &[String], sink: &mut LexSink) {
    // Hunks arrive top-to-bottom; each search starts where the previous
    // hunk ended, which is what disambiguates repeated patterns.
    let mut search_from = 0usize;
    for hunk in hunks {
        let before = hunk.before_lines();
        let after = hunk.after_lines();

        let matched = if before.is_empty() {
            // No anchor at all: only meaningful against an empty file.
            if base.is_empty() {
                Some(0)
            } else {
                None
            }
        } else {
            find_run(base, &before, search_from, str_eq)
                .or_else(|| find_run(base, &before, search_from, ws_insensitive_eq))
        };

        let Some(start) = matched else {
            sink.report(ParseIssue::UnresolvedHunk {
                path: path.to_path_buf(),
            });
            continue;
        };

        let interval = match Interval::new(start + 1, start + 1 + before.len()) {
            Some(iv) => iv,
            None => {
                sink.report(ParseIssue::UnresolvedHunk {
                    path: path.to_path_buf(),
                });
                continue;
            }
        };
        search_from = start + before.len();

        sink.finish_edit(Edit::Replacement {
            path: path.to_path_buf(),
            interval,
            lines: after,
        });
    }
}

/// All start positions where `needle` matches a contiguous run of
/// `hay`, then pick the one nearest `from`: the first at-or-after it,
/// or failing that the last before it.
fn find_run(
    hay: &[String],
    needle: &[String],
    from: usize,
    eq: fn(&str, &str) -> bool,
) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    let mut candidates = Vec::new();
    for start in 0..=(hay.len() - needle.len()) {
        if needle
            .iter()
            .zip(&hay[start..start + needle.len()])
            .all(|(n, h)| eq(n, h))
        {
            candidates.push(start);
        }
    }
    candidates
        .iter()
        .copied()
        .find(|&start| start >= from)
        .or_else(|| candidates.iter().copied().filter(|&start| start < from).last())
}

fn str_eq(a: &str, b: &str) -> bool {
    a == b
}

fn ws_insensitive_eq(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    strip(a) == strip(b)
}
