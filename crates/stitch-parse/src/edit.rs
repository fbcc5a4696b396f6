//! The position-independent description of a single file mutation.
//!
//! Edits are pure value data: a lexer creates them, the application
//! engine consumes them exactly once, and nothing mutates them in
//! between (diff-style hunks get their interval rewritten once during
//! second-pass resolution, before they become `Edit`s at all).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stitch_common::Interval;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edit {
    /// Replace the lines of `interval` with `lines`. Empty `lines` is a
    /// pure deletion; an empty interval is a pure insertion before
    /// `interval.start()`.
    Replacement {
        path: PathBuf,
        interval: Interval,
        lines: Vec<String>,
    },
    /// Create a new file, optionally seeded with content.
    Creation {
        path: PathBuf,
        content: Option<String>,
    },
    /// Remove a file.
    Deletion { path: PathBuf },
    /// Move a file to a new path.
    Rename { path: PathBuf, new_path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Replacement,
    Creation,
    Deletion,
    Rename,
}

impl Edit {
    /// The path the edit is addressed to (the original path, for renames).
    pub fn path(&self) -> &Path {
        match self {
            Edit::Replacement { path, .. }
            | Edit::Creation { path, .. }
            | Edit::Deletion { path }
            | Edit::Rename { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EditKind {
        match self {
            Edit::Replacement { .. } => EditKind::Replacement,
            Edit::Creation { .. } => EditKind::Creation,
            Edit::Deletion { .. } => EditKind::Deletion,
            Edit::Rename { .. } => EditKind::Rename,
        }
    }
}

/// Find a pair of overlapping `Replacement` intervals addressed to the
/// same file, if any. Intervals are measured against the pre-edit file,
/// so a sorted adjacent-pair scan is sufficient. Insertions at the same
/// point or at a range boundary do not overlap; an insertion strictly
/// inside a replaced range does.
pub fn overlapping_pair(edits: &[Edit]) -> Option<(PathBuf, Interval, Interval)> {
    let mut by_file: HashMap<&Path, Vec<Interval>> = HashMap::new();
    for edit in edits {
        if let Edit::Replacement { path, interval, .. } = edit {
            by_file.entry(path.as_path()).or_default().push(*interval);
        }
    }
    for (path, mut intervals) in by_file {
        intervals.sort_by_key(|iv| (iv.start(), iv.end()));
        for pair in intervals.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Some((path.to_path_buf(), pair[0], pair[1]));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    fn replacement(path: &str, interval: Interval) -> Edit {
        Edit::Replacement {
            path: PathBuf::from(path),
            interval,
            lines: vec!["x".to_string()],
        }
    }

    #[test]
    fn test_overlapping_pair_same_file() {
        let edits = vec![replacement("a.py", iv(3, 7)), replacement("a.py", iv(5, 6))];
        let (path, ..) = overlapping_pair(&edits).unwrap();
        assert_eq!(path, PathBuf::from("a.py"));
    }

    #[test]
    fn test_no_overlap_across_files() {
        let edits = vec![replacement("a.py", iv(3, 7)), replacement("b.py", iv(5, 6))];
        assert!(overlapping_pair(&edits).is_none());
    }

    #[test]
    fn test_adjacent_intervals_do_not_overlap() {
        let edits = vec![replacement("a.py", iv(1, 3)), replacement("a.py", iv(3, 5))];
        assert!(overlapping_pair(&edits).is_none());
    }

    #[test]
    fn test_insertions_at_same_point_allowed() {
        let edits = vec![
            replacement("a.py", iv(4, 4)),
            replacement("a.py", iv(4, 4)),
        ];
        assert!(overlapping_pair(&edits).is_none());
    }

    #[test]
    fn test_insertion_inside_replaced_range_rejected() {
        // The replacement consumes the insertion point; there is no
        // coherent ordering for the pair.
        let edits = vec![replacement("a.py", iv(2, 6)), replacement("a.py", iv(4, 4))];
        assert!(overlapping_pair(&edits).is_some());
    }
}
