use crate::event::ErrorScope;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A localized parse problem. These are values carried in the parse
/// result (and echoed into the commentary), never propagated errors:
/// one bad edit must not take down its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseIssue {
    #[error("malformed edit header: {detail}")]
    MalformedHeader { detail: String },

    #[error("invalid line numbers for {path}: {detail}")]
    InvalidRange { path: String, detail: String },

    #[error("edit block for {path} still open at end of stream; discarded")]
    UnterminatedBlock { path: String },

    #[error("hunk context not found in {path}")]
    UnresolvedHunk { path: PathBuf },

    #[error("cannot resolve hunks against missing file {path}")]
    MissingFile { path: PathBuf },

    #[error("overlapping edits for {path}; all edits to this file were dropped")]
    OverlappingEdits { path: PathBuf },
}

impl ParseIssue {
    /// How far the damage extends, for display purposes.
    pub fn scope(&self) -> ErrorScope {
        match self {
            ParseIssue::MalformedHeader { .. }
            | ParseIssue::InvalidRange { .. }
            | ParseIssue::UnterminatedBlock { .. } => ErrorScope::Edit,
            ParseIssue::UnresolvedHunk { path }
            | ParseIssue::MissingFile { path }
            | ParseIssue::OverlappingEdits { path } => ErrorScope::File(path.clone()),
        }
    }
}
