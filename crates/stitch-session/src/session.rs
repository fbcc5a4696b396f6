//! The sequential turn loop.
//!
//! One cooperative task pulls chunks from the transport and drives the
//! parser; display events flow over an mpsc channel to an independent
//! renderer task. Cancellation is a flag checked at the top of the
//! chunk loop — never preemption — so the application engine's writes
//! are always whole-file.

use crate::source::ChunkSource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stitch_apply::{apply_turn, EditHistory, HistoryEntry, TurnReport, UndoReport, Workspace};
use stitch_common::git;
use stitch_parse::event::{Color, SessionEvent};
use stitch_parse::{ParsedTurn, StreamParser, WireFormat};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("model stream failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Apply(#[from] stitch_apply::ApplyError),

    #[error("display channel closed")]
    DisplayGone,
}

/// A cooperative cancellation handle. Cloneable so a signal handler can
/// trip it while the turn loop polls it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The outcome of one full turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub report: Option<TurnReport>,
    pub edit_count: usize,
    pub interrupted: bool,
}

/// One conversational session over one workspace. Turns run strictly
/// sequentially; the history is owned here and handed to the engine by
/// reference.
pub struct Session {
    workspace: Workspace,
    history: EditHistory,
    format: WireFormat,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>, format: WireFormat) -> Result<Self, SessionError> {
        Ok(Self {
            workspace: Workspace::new(root)?,
            history: EditHistory::new(),
            format,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn set_format(&mut self, format: WireFormat) {
        self.format = format;
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Consume one model response from `source`, forwarding display
    /// events as they are recognized, then apply the finalized edits
    /// (unless `dry_run`). Interruption finalizes with whatever edits
    /// had fully closed.
    pub async fn run_turn(
        &mut self,
        source: &mut dyn ChunkSource,
        events: &UnboundedSender<SessionEvent>,
        cancel: &CancelFlag,
        dry_run: bool,
    ) -> Result<TurnOutcome, SessionError> {
        let turn = self.collect_turn(source, events, cancel).await?;

        for issue in &turn.issues {
            tracing::debug!(issue = %issue, "parse issue recorded for this turn");
        }

        if dry_run || turn.edits.is_empty() {
            return Ok(TurnOutcome {
                report: None,
                edit_count: turn.edits.len(),
                interrupted: turn.interrupted,
            });
        }

        self.warn_on_head_drift(events)?;

        let applied = apply_turn(&self.workspace, &turn.edits);
        for outcome in applied.report.files.iter() {
            if let Some(error) = &outcome.error {
                send(
                    events,
                    SessionEvent::Error {
                        message: format!("{}: {}", outcome.path.display(), error),
                        scope: stitch_parse::event::ErrorScope::File(outcome.path.clone()),
                    },
                )?;
            }
        }

        if let Some(record) = applied.record {
            self.history.push(HistoryEntry {
                record,
                head: git::head_revision(self.workspace.root()),
            });
        }

        Ok(TurnOutcome {
            report: Some(applied.report),
            edit_count: turn.edits.len(),
            interrupted: turn.interrupted,
        })
    }

    async fn collect_turn(
        &mut self,
        source: &mut dyn ChunkSource,
        events: &UnboundedSender<SessionEvent>,
        cancel: &CancelFlag,
    ) -> Result<ParsedTurn, SessionError> {
        let mut parser = StreamParser::new(self.format);

        loop {
            // The one cancellation point: between chunks, never inside a
            // filesystem operation.
            if cancel.is_cancelled() {
                parser.interrupt();
                break;
            }
            match source.next_chunk().await? {
                Some(chunk) => {
                    for event in parser.push_chunk(&chunk) {
                        send(events, event)?;
                    }
                }
                None => break,
            }
        }

        let (turn, final_events) = parser.finalize(&self.workspace);
        for event in final_events {
            send(events, event)?;
        }
        Ok(turn)
    }

    pub fn undo(&mut self) -> Option<UndoReport> {
        self.history.undo(&self.workspace)
    }

    pub fn redo(&mut self) -> Option<UndoReport> {
        self.history.redo(&self.workspace)
    }

    pub fn undo_all(&mut self) -> Vec<UndoReport> {
        self.history.undo_all(&self.workspace)
    }

    pub fn history_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Compare the recorded HEAD against the current one and surface a
    /// warning if git moved underneath the session since the last turn.
    fn warn_on_head_drift(
        &self,
        events: &UnboundedSender<SessionEvent>,
    ) -> Result<(), SessionError> {
        let recorded = match self.history.last_head() {
            Some(head) => head,
            None => return Ok(()),
        };
        let current = git::head_revision(self.workspace.root());
        if current.as_deref() != Some(recorded) {
            send(
                events,
                SessionEvent::Commentary {
                    text: "warning: git HEAD moved since the last applied turn; undo will restore recorded snapshots over the new state".to_string(),
                    color: Some(Color::Yellow),
                },
            )?;
        }
        Ok(())
    }
}

fn send(
    events: &UnboundedSender<SessionEvent>,
    event: SessionEvent,
) -> Result<(), SessionError> {
    events.send(event).map_err(|_| SessionError::DisplayGone)
}
