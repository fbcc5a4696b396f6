//! Typed display events emitted while a model response streams in.
//!
//! The parser produces these incrementally so the session can echo the
//! response character-for-character as it arrives; waiting for the turn
//! to finish before showing anything is not acceptable latency.

use crate::edit::EditKind;
use serde::Serialize;
use std::path::PathBuf;
use stitch_common::Interval;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// Free-form commentary from the model, displayed verbatim.
    Commentary {
        text: String,
        color: Option<Color>,
    },
    /// An edit-block header was recognized.
    EditOpened { path: PathBuf, kind: EditKind },
    /// Another body line arrived for the currently open edit.
    EditProgress { path: PathBuf, lines_so_far: usize },
    /// An edit block closed. Diff-style formats close with no interval;
    /// resolution fills it in at finalization.
    EditClosed {
        path: PathBuf,
        interval: Option<Interval>,
        lines: Vec<String>,
    },
    /// A localized parse problem. Never fatal to the turn.
    Error { message: String, scope: ErrorScope },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Cyan,
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// One edit was discarded; the rest of the stream is unaffected.
    Edit,
    /// Every edit for one file was dropped; other files still apply.
    File(PathBuf),
    /// The stream itself failed.
    Stream,
}
