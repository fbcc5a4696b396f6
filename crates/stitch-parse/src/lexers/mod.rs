//! One self-contained lexer per supported wire format.
//!
//! Each lexer consumes raw stream chunks (chunk boundaries carry no
//! meaning; a marker may be split across calls) and pushes commentary,
//! edits, and problems into a [`LexSink`]. Lexers hold no parser state
//! beyond their own buffers; the parser owns exactly one of them per
//! turn.

pub mod block;
pub mod jsonstream;
pub mod linespec;
pub mod udiff;

use crate::edit::Edit;
use crate::error::ParseIssue;
use crate::event::{Color, SessionEvent};
use crate::resolve::FileHunks;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which textual format the model was asked to respond in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Block,
    LineReplacement,
    UnifiedDiff,
    JsonStream,
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(WireFormat::Block),
            "lines" | "line-replacement" | "replacements" => Ok(WireFormat::LineReplacement),
            "udiff" | "diff" | "unified-diff" => Ok(WireFormat::UnifiedDiff),
            "json" | "json-stream" => Ok(WireFormat::JsonStream),
            other => Err(format!("unknown wire format: {other}")),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireFormat::Block => "block",
            WireFormat::LineReplacement => "lines",
            WireFormat::UnifiedDiff => "udiff",
            WireFormat::JsonStream => "json",
        };
        f.write_str(name)
    }
}

/// The capability set every format lexer implements.
pub trait FormatLexer {
    /// Consume the next chunk of raw model output.
    fn consume_chunk(&mut self, chunk: &str, sink: &mut LexSink);

    /// The stream ended (normally or by interruption). Flush any buffered
    /// partial line; discard any still-open edit with an issue.
    fn finalize(&mut self, sink: &mut LexSink);
}

/// Everything a lexer produces, accumulated across the whole turn.
/// Events are drained by the parser after every chunk; the rest is
/// collected until finalization.
#[derive(Debug, Default)]
pub struct LexSink {
    pub events: Vec<SessionEvent>,
    pub edits: Vec<Edit>,
    pub hunk_files: Vec<FileHunks>,
    pub issues: Vec<ParseIssue>,
    pub commentary: String,
}

impl LexSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A verbatim commentary line.
    pub fn commentary_line(&mut self, line: &str) {
        self.commentary.push_str(line);
        self.commentary.push('\n');
        self.events.push(SessionEvent::Commentary {
            text: line.to_string(),
            color: None,
        });
    }

    /// Record a localized problem: an error event for the display, an
    /// annotation in the commentary, and an entry in the issue list.
    pub fn report(&mut self, issue: ParseIssue) {
        self.commentary.push_str(&format!("[parse error] {issue}\n"));
        self.events.push(SessionEvent::Error {
            message: issue.to_string(),
            scope: issue.scope(),
        });
        self.issues.push(issue);
    }

    pub fn opened(&mut self, path: &Path, kind: crate::edit::EditKind) {
        self.events.push(SessionEvent::EditOpened {
            path: path.to_path_buf(),
            kind,
        });
    }

    pub fn progress(&mut self, path: &Path, lines_so_far: usize) {
        self.events.push(SessionEvent::EditProgress {
            path: path.to_path_buf(),
            lines_so_far,
        });
    }

    /// Close out a fully-formed edit: emits the close event and appends
    /// the edit to the turn's list.
    pub fn finish_edit(&mut self, edit: Edit) {
        let (interval, lines) = match &edit {
            Edit::Replacement {
                interval, lines, ..
            } => (Some(*interval), lines.clone()),
            Edit::Creation { content, .. } => (
                None,
                content
                    .as_deref()
                    .map(|c| c.lines().map(str::to_string).collect())
                    .unwrap_or_default(),
            ),
            _ => (None, Vec::new()),
        };
        self.events.push(SessionEvent::EditClosed {
            path: edit.path().to_path_buf(),
            interval,
            lines,
        });
        self.edits.push(edit);
    }

    /// Commentary rendered in a fixed color (used by formats that carry
    /// styled comments, like the JSON stream's comment elements).
    pub fn styled_commentary(&mut self, text: &str, color: Color) {
        for line in text.lines() {
            self.commentary.push_str(line);
            self.commentary.push('\n');
            self.events.push(SessionEvent::Commentary {
                text: line.to_string(),
                color: Some(color),
            });
        }
    }
}

/// Splits an incoming chunk stream into complete lines, buffering the
/// trailing partial line across calls. Chunks never align with line
/// boundaries; this is where that is papered over.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: String,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the complete lines it unlocked, with
    /// line endings (including any `\r`) stripped.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(ix) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=ix).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// The final unterminated line, if the stream ended without a newline.
    pub fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            let mut line = std::mem::take(&mut self.buf);
            if line.ends_with('\r') {
                line.pop();
            }
            Some(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_splitter_across_chunk_boundaries() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push("hel").is_empty());
        assert_eq!(splitter.push("lo\nwor"), vec!["hello".to_string()]);
        assert_eq!(splitter.push("ld\n"), vec!["world".to_string()]);
        assert!(splitter.flush().is_none());
    }

    #[test]
    fn test_line_splitter_flushes_partial_tail() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push("a\nb"), vec!["a".to_string()]);
        assert_eq!(splitter.flush(), Some("b".to_string()));
    }

    #[test]
    fn test_line_splitter_strips_carriage_returns() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push("a\r\n"), vec!["a".to_string()]);
    }

    #[test]
    fn test_wire_format_from_str() {
        assert_eq!("block".parse::<WireFormat>().unwrap(), WireFormat::Block);
        assert_eq!(
            "UDIFF".parse::<WireFormat>().unwrap(),
            WireFormat::UnifiedDiff
        );
        assert!("xml".parse::<WireFormat>().is_err());
    }
}
