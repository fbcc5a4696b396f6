//! Per-session undo/redo over applied turns.
//!
//! Each history entry stores whole-file snapshots (content before and
//! after the turn, under the paths it occupied at each point). Undo and
//! redo materialize an edit list from those snapshots against the
//! file's *current* state and replay it through the application engine,
//! so a hand-edited file is still restored — with a surfaced warning,
//! never a silent refusal and never silent data loss.

use crate::apply::{apply_turn, TurnReport};
use crate::workspace::Workspace;
use std::path::PathBuf;
use stitch_common::{Interval, LineBuffer};
use stitch_parse::Edit;

/// The reversible record of one applied turn.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub files: Vec<FileChange>,
}

/// What one turn did to one file, as snapshots.
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Path before the turn.
    pub pre_path: PathBuf,
    /// Path after the turn (differs from `pre_path` on rename).
    pub post_path: PathBuf,
    /// Content before the turn; `None` means the file did not exist.
    pub pre_content: Option<String>,
    /// Content after the turn; `None` means the turn deleted it.
    pub post_content: Option<String>,
}

/// A history entry: the record plus the HEAD revision observed when the
/// turn applied, for out-of-band drift warnings.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: TurnRecord,
    pub head: Option<String>,
}

/// What an undo or redo did.
#[derive(Debug)]
pub struct UndoReport {
    pub report: TurnReport,
    /// Surfaced anomalies: content that no longer matched what the entry
    /// expected. The operation proceeded regardless.
    pub warnings: Vec<String>,
}

/// The per-session undo/redo stacks. Passed into the session explicitly
/// rather than living in a global, so the engine stays testable on its
/// own.
#[derive(Debug, Default)]
pub struct EditHistory {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Record a successfully applied turn. Any redoable future is gone.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        self.undo_stack.push(entry);
    }

    /// Reverse the most recent turn. Returns `None` on an empty stack.
    pub fn undo(&mut self, workspace: &Workspace) -> Option<UndoReport> {
        let entry = self.undo_stack.pop()?;
        let outcome = replay(workspace, &entry.record, Direction::Backward);
        self.redo_stack.push(entry);
        Some(outcome)
    }

    /// Re-apply the most recently undone turn.
    pub fn redo(&mut self, workspace: &Workspace) -> Option<UndoReport> {
        let entry = self.redo_stack.pop()?;
        let outcome = replay(workspace, &entry.record, Direction::Forward);
        self.undo_stack.push(entry);
        Some(outcome)
    }

    /// Undo every recorded turn, newest first.
    pub fn undo_all(&mut self, workspace: &Workspace) -> Vec<UndoReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.undo(workspace) {
            reports.push(report);
        }
        reports
    }

    /// The HEAD revision the next undo expects, if any.
    pub fn last_head(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|e| e.head.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

/// Build the restoration edit list for one direction and replay it
/// through the application engine.
fn replay(workspace: &Workspace, record: &TurnRecord, direction: Direction) -> UndoReport {
    let mut warnings = Vec::new();
    let mut edits = Vec::new();

    // Undo walks the record backwards so rename chains unwind in order.
    let files: Vec<&FileChange> = match direction {
        Direction::Backward => record.files.iter().rev().collect(),
        Direction::Forward => record.files.iter().collect(),
    };

    for change in files {
        // The state the entry expects to find on disk now, and the state
        // it will restore.
        let (expect_path, expect_content, target_path, target_content) = match direction {
            Direction::Backward => (
                &change.post_path,
                &change.post_content,
                &change.pre_path,
                &change.pre_content,
            ),
            Direction::Forward => (
                &change.pre_path,
                &change.pre_content,
                &change.post_path,
                &change.post_content,
            ),
        };

        let live = workspace.read(expect_path).ok();
        if live != *expect_content {
            let warning = format!(
                "{} no longer matches the recorded state; restoring anyway (local changes will be lost)",
                expect_path.display()
            );
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        match (&live, target_content) {
            (_, None) => {
                // Target state is "absent": delete whatever is there.
                if live.is_some() {
                    edits.push(Edit::Deletion {
                        path: expect_path.clone(),
                    });
                }
            }
            (None, Some(content)) => {
                // Expected a file but found none: recreate it outright.
                edits.push(Edit::Creation {
                    path: target_path.clone(),
                    content: Some(content.clone()),
                });
            }
            (Some(live_content), Some(content)) => {
                if expect_path != target_path {
                    edits.push(Edit::Rename {
                        path: expect_path.clone(),
                        new_path: target_path.clone(),
                    });
                }
                // Full-file restore, sized against the live content so it
                // applies no matter what the file looks like now.
                let live_lines = LineBuffer::from_content(live_content).line_count();
                if let Some(interval) = Interval::new(1, live_lines + 1) {
                    edits.push(Edit::Replacement {
                        path: expect_path.clone(),
                        interval,
                        lines: LineBuffer::from_content(content).lines().to_vec(),
                    });
                }
            }
        }
    }

    let applied = apply_turn(workspace, &edits);
    UndoReport {
        report: applied.report,
        warnings,
    }
}
