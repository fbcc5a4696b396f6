//! The per-turn application engine.
//!
//! Takes a finalized edit list, groups it by file, and applies each
//! file's changes independently: one file failing never blocks the
//! others. Within a file, replacements are verified non-overlapping and
//! applied bottom-to-top so earlier edits' line numbers stay valid while
//! later ones shift the line count. Renames re-target any replacements
//! still addressed to the old name.

use crate::error::ApplyError;
use crate::history::{FileChange, TurnRecord};
use crate::workspace::Workspace;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stitch_common::{Interval, LineBuffer};
use stitch_parse::Edit;

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub files: Vec<FileOutcome>,
}

impl TurnReport {
    pub fn all_applied(&self) -> bool {
        self.files
            .iter()
            .all(|f| f.status == FileStatus::Applied)
    }

    pub fn applied_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Applied)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.len() - self.applied_count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Applied,
    Failed,
}

/// The result of applying one turn: per-file outcomes plus, when at
/// least one file changed, the record the history needs to reverse it.
#[derive(Debug)]
pub struct AppliedTurn {
    pub report: TurnReport,
    pub record: Option<TurnRecord>,
}

/// One file's collected work for the turn, keyed by the path the file
/// occupies on disk when the turn starts.
#[derive(Debug)]
struct FilePlan {
    origin: PathBuf,
    create: Option<Option<String>>,
    delete: bool,
    rename_to: Option<PathBuf>,
    replacements: Vec<PlannedReplacement>,
}

#[derive(Debug)]
struct PlannedReplacement {
    order: usize,
    interval: Interval,
    lines: Vec<String>,
}

impl FilePlan {
    fn new(origin: PathBuf) -> Self {
        Self {
            origin,
            create: None,
            delete: false,
            rename_to: None,
            replacements: Vec::new(),
        }
    }
}

/// Apply a turn's edits to the working tree.
pub fn apply_turn(workspace: &Workspace, edits: &[Edit]) -> AppliedTurn {
    let plans = build_plans(edits);

    let mut outcomes = Vec::with_capacity(plans.len());
    let mut changes = Vec::new();

    for plan in plans {
        let shown_path = plan.rename_to.clone().unwrap_or_else(|| plan.origin.clone());
        match apply_file(workspace, plan) {
            Ok(Some(change)) => {
                outcomes.push(FileOutcome {
                    path: shown_path,
                    status: FileStatus::Applied,
                    error: None,
                });
                changes.push(change);
            }
            Ok(None) => {
                // Created and deleted within the same turn; nothing to do
                // and nothing to reverse.
                outcomes.push(FileOutcome {
                    path: shown_path,
                    status: FileStatus::Applied,
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(path = %shown_path.display(), error = %e, "file failed to apply");
                outcomes.push(FileOutcome {
                    path: shown_path,
                    status: FileStatus::Failed,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let record = if changes.is_empty() {
        None
    } else {
        Some(TurnRecord { files: changes })
    };

    AppliedTurn {
        report: TurnReport { files: outcomes },
        record,
    }
}

/// Group edits into per-file plans, resolving each edit's address
/// through any renames seen earlier in the turn.
fn build_plans(edits: &[Edit]) -> Vec<FilePlan> {
    let mut plans: Vec<FilePlan> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    // Maps every name a file has been known by to its plan's origin key.
    let mut aliases: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut order = 0usize;

    let plan_for = |path: &Path,
                        plans: &mut Vec<FilePlan>,
                        index: &mut HashMap<PathBuf, usize>,
                        aliases: &mut HashMap<PathBuf, PathBuf>|
     -> usize {
        let origin = aliases
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_path_buf());
        if let Some(&ix) = index.get(&origin) {
            return ix;
        }
        aliases.insert(origin.clone(), origin.clone());
        index.insert(origin.clone(), plans.len());
        plans.push(FilePlan::new(origin));
        plans.len() - 1
    };

    for edit in edits {
        match edit {
            Edit::Creation { path, content } => {
                let ix = plan_for(path, &mut plans, &mut index, &mut aliases);
                plans[ix].create = Some(content.clone());
            }
            Edit::Replacement {
                path,
                interval,
                lines,
            } => {
                let ix = plan_for(path, &mut plans, &mut index, &mut aliases);
                plans[ix].replacements.push(PlannedReplacement {
                    order,
                    interval: *interval,
                    lines: lines.clone(),
                });
                order += 1;
            }
            Edit::Deletion { path } => {
                let ix = plan_for(path, &mut plans, &mut index, &mut aliases);
                plans[ix].delete = true;
            }
            Edit::Rename { path, new_path } => {
                let ix = plan_for(path, &mut plans, &mut index, &mut aliases);
                plans[ix].rename_to = Some(new_path.clone());
                aliases.insert(new_path.clone(), plans[ix].origin.clone());
            }
        }
    }

    plans
}

/// Apply one file's plan. Returns the change record, or `None` when the
/// plan cancels itself out (create + delete in one turn).
fn apply_file(workspace: &Workspace, plan: FilePlan) -> Result<Option<FileChange>, ApplyError> {
    check_overlaps(&plan)?;

    let creating = plan.create.is_some();

    if plan.delete {
        if creating {
            return Ok(None);
        }
        let pre_content = workspace.read(&plan.origin)?;
        workspace.delete(&plan.origin)?;
        return Ok(Some(FileChange {
            pre_path: plan.origin.clone(),
            post_path: plan.origin,
            pre_content: Some(pre_content),
            post_content: None,
        }));
    }

    let final_path = plan
        .rename_to
        .clone()
        .unwrap_or_else(|| plan.origin.clone());

    // Base content the replacements run against.
    let pre_content = if creating {
        if workspace.exists(&plan.origin) {
            return Err(ApplyError::AlreadyExists(plan.origin));
        }
        None
    } else {
        Some(workspace.read(&plan.origin)?)
    };

    let seed = match &plan.create {
        Some(content) => content.clone().unwrap_or_default(),
        None => pre_content.clone().unwrap_or_default(),
    };

    let post_content = splice_all(&plan, &seed)?;

    if creating {
        workspace.create(&final_path, &post_content)?;
    } else {
        if plan.rename_to.is_some() {
            workspace.rename(&plan.origin, &final_path)?;
        }
        if !plan.replacements.is_empty() {
            workspace.write(&final_path, &post_content)?;
        }
    }

    Ok(Some(FileChange {
        pre_path: plan.origin,
        post_path: final_path,
        pre_content,
        post_content: Some(post_content),
    }))
}

fn check_overlaps(plan: &FilePlan) -> Result<(), ApplyError> {
    let mut intervals: Vec<Interval> = plan.replacements.iter().map(|r| r.interval).collect();
    intervals.sort_by_key(|iv| (iv.start(), iv.end()));
    for pair in intervals.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(ApplyError::OverlappingEdits {
                path: plan.origin.clone(),
            });
        }
    }
    Ok(())
}

/// Apply the plan's replacements bottom-to-top. Descending start order
/// keeps earlier intervals valid as later splices shift the line count;
/// at equal starts, ranges go before insertion points (the inserted
/// lines end up above the replaced block), and insertion points apply in
/// reverse stream order so their content stays in stream order.
fn splice_all(plan: &FilePlan, base: &str) -> Result<String, ApplyError> {
    let mut buffer = LineBuffer::from_content(base);
    let mut ordered: Vec<&PlannedReplacement> = plan.replacements.iter().collect();
    ordered.sort_by(|a, b| {
        b.interval
            .start()
            .cmp(&a.interval.start())
            .then_with(|| a.interval.is_empty().cmp(&b.interval.is_empty()))
            .then_with(|| b.order.cmp(&a.order))
    });
    for replacement in ordered {
        buffer
            .splice(&replacement.interval, replacement.lines.clone())
            .map_err(|detail| ApplyError::BadRange {
                path: plan.origin.clone(),
                detail,
            })?;
    }
    Ok(buffer.to_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    fn replacement(path: &str, interval: Interval, lines: &[&str]) -> Edit {
        Edit::Replacement {
            path: PathBuf::from(path),
            interval,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_line_replace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.py"), "def f():\n    pass\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(&ws, &[replacement("f.py", iv(2, 3), &["    return 1"])]);
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("f.py")).unwrap(),
            "def f():\n    return 1\n"
        );
    }

    #[test]
    fn test_bottom_up_application_keeps_line_numbers_valid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.py"), "a\nb\nc\nd\ne\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        // The first edit grows the file; the second still addresses
        // original line numbers.
        let applied = apply_turn(
            &ws,
            &[
                replacement("f.py", iv(1, 2), &["a1", "a2", "a3"]),
                replacement("f.py", iv(4, 5), &["D"]),
            ],
        );
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("f.py")).unwrap(),
            "a1\na2\na3\nb\nc\nD\ne\n"
        );
    }

    #[test]
    fn test_insertion_and_deletion_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.py"), "one\ntwo\nthree\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                // Pure insertion: start == end, nothing deleted.
                replacement("f.py", iv(2, 2), &["one-and-a-half"]),
                // Pure deletion: empty content removes the interval.
                replacement("f.py", iv(3, 4), &[]),
            ],
        );
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("f.py")).unwrap(),
            "one\none-and-a-half\ntwo\n"
        );
    }

    #[test]
    fn test_creation_with_follow_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                Edit::Creation {
                    path: PathBuf::from("new.py"),
                    content: Some("line1\nline2\n".to_string()),
                },
                replacement("new.py", iv(2, 3), &["LINE2"]),
            ],
        );
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("new.py")).unwrap(),
            "line1\nLINE2\n"
        );
    }

    #[test]
    fn test_rename_re_targets_later_replacements() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                Edit::Rename {
                    path: PathBuf::from("a.py"),
                    new_path: PathBuf::from("b.py"),
                },
                // Still addressed to the old name.
                replacement("a.py", iv(1, 2), &["x = 2"]),
            ],
        );
        assert!(applied.report.all_applied());
        assert!(!dir.path().join("a.py").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("b.py")).unwrap(),
            "x = 2\n"
        );
    }

    #[test]
    fn test_replacements_addressed_to_new_name_also_land() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                Edit::Rename {
                    path: PathBuf::from("a.py"),
                    new_path: PathBuf::from("b.py"),
                },
                replacement("b.py", iv(1, 2), &["x = 3"]),
            ],
        );
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("b.py")).unwrap(),
            "x = 3\n"
        );
    }

    #[test]
    fn test_overlap_rejects_file_but_not_siblings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.py"), "1\n2\n3\n4\n5\n6\n").unwrap();
        fs::write(dir.path().join("good.py"), "a\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                replacement("bad.py", iv(4, 6), &["x"]),
                replacement("bad.py", iv(5, 7), &["y"]),
                replacement("good.py", iv(1, 2), &["A"]),
            ],
        );
        assert_eq!(applied.report.applied_count(), 1);
        assert_eq!(applied.report.failed_count(), 1);
        // The overlapping file is untouched.
        assert_eq!(
            fs::read_to_string(dir.path().join("bad.py")).unwrap(),
            "1\n2\n3\n4\n5\n6\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("good.py")).unwrap(), "A\n");
    }

    #[test]
    fn test_missing_target_is_a_per_file_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("present.py"), "p\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                replacement("vanished.py", iv(1, 2), &["x"]),
                replacement("present.py", iv(1, 2), &["P"]),
            ],
        );
        assert_eq!(applied.report.applied_count(), 1);
        let failed = applied
            .report
            .files
            .iter()
            .find(|f| f.status == FileStatus::Failed)
            .unwrap();
        assert_eq!(failed.path, PathBuf::from("vanished.py"));
        assert!(failed.error.as_deref().unwrap().contains("not found"));
    }

    #[test]
    fn test_create_then_delete_same_turn_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                Edit::Creation {
                    path: PathBuf::from("ghost.py"),
                    content: Some("x\n".to_string()),
                },
                Edit::Deletion {
                    path: PathBuf::from("ghost.py"),
                },
            ],
        );
        assert!(applied.report.all_applied());
        assert!(applied.record.is_none());
        assert!(!dir.path().join("ghost.py").exists());
    }

    #[test]
    fn test_determinism_same_edits_same_output() {
        let edits = vec![
            replacement("f.py", iv(1, 2), &["head"]),
            replacement("f.py", iv(3, 3), &["mid1", "mid2"]),
            replacement("f.py", iv(4, 5), &[]),
        ];
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("f.py"), "a\nb\nc\nd\ne\n").unwrap();
            let ws = Workspace::new(dir.path()).unwrap();
            let applied = apply_turn(&ws, &edits);
            assert!(applied.report.all_applied());
            outputs.push(fs::read_to_string(dir.path().join("f.py")).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_two_insertions_at_same_point_keep_stream_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f.py"), "top\nbottom\n").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let applied = apply_turn(
            &ws,
            &[
                replacement("f.py", iv(2, 2), &["first"]),
                replacement("f.py", iv(2, 2), &["second"]),
            ],
        );
        assert!(applied.report.all_applied());
        assert_eq!(
            fs::read_to_string(dir.path().join("f.py")).unwrap(),
            "top\nfirst\nsecond\nbottom\n"
        );
    }
}
