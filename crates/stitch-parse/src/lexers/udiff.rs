//! Unified-diff wire format.
//!
//! ```text
//! --- src/core.py
//! +++ src/core.py
//! @@ @@
//!  def main(name):
//! -    pass
//! +    return name
//! @@ end @@
//! ```
//!
//! `/dev/null` on the old side means creation, on the new side deletion;
//! differing paths mean a rename (whose hunks stay addressed to the old
//! path — the application engine re-targets them after the rename).
//! Hunks carry no line numbers: the lexer records their line sequences
//! only, and second-pass resolution anchors them against the file's
//! current content.

use super::{FormatLexer, LexSink, LineSplitter};
use crate::edit::{Edit, EditKind};
use crate::error::ParseIssue;
use crate::resolve::{DiffLine, FileHunks, RawHunk};
use std::path::PathBuf;

const HUNK_MARKER: &str = "@@ @@";
const FILE_END_MARKER: &str = "@@ end @@";
const DEV_NULL: &str = "/dev/null";

#[derive(Debug)]
enum State {
    Commentary,
    AwaitNewPath { old: String },
    InFile(ActiveFile),
}

#[derive(Debug)]
struct ActiveFile {
    /// Path hunks are addressed to (the old path, for renames).
    path: PathBuf,
    hunks: Vec<RawHunk>,
    current: Option<RawHunk>,
    /// Whole-file deletion: hunk content is the removed body, which the
    /// deletion already covers; skip it.
    deletion: bool,
    body_lines: usize,
}

#[derive(Debug)]
pub struct UdiffLexer {
    splitter: LineSplitter,
    state: State,
}

impl UdiffLexer {
    pub fn new() -> Self {
        Self {
            splitter: LineSplitter::new(),
            state: State::Commentary,
        }
    }

    fn consume_line(&mut self, line: &str, sink: &mut LexSink) {
        match std::mem::replace(&mut self.state, State::Commentary) {
            State::Commentary => {
                if let Some(old) = line.strip_prefix("--- ") {
                    self.state = State::AwaitNewPath {
                        old: old.trim().to_string(),
                    };
                } else {
                    sink.commentary_line(line);
                }
            }
            State::AwaitNewPath { old } => {
                if let Some(new) = line.strip_prefix("+++ ") {
                    self.open_file(&old, new.trim(), sink);
                } else {
                    sink.report(ParseIssue::MalformedHeader {
                        detail: format!("'--- {old}' not followed by a '+++' line"),
                    });
                    // Reprocess the line from scratch; it may itself start
                    // a new file section.
                    self.consume_line(line, sink);
                }
            }
            State::InFile(mut file) => {
                let trimmed = line.trim_end();
                if trimmed == FILE_END_MARKER {
                    self.close_file(file, true, sink);
                } else if trimmed == HUNK_MARKER || trimmed.starts_with("@@") {
                    if let Some(hunk) = file.current.take() {
                        if !hunk.is_empty() {
                            file.hunks.push(hunk);
                        }
                    }
                    file.current = Some(RawHunk::default());
                    self.state = State::InFile(file);
                } else if line.starts_with("--- ") {
                    // Next file section began without an explicit end marker.
                    self.close_file(file, true, sink);
                    self.consume_line(line, sink);
                } else {
                    if !file.deletion {
                        if let Some(hunk) = file.current.as_mut() {
                            hunk.lines.push(classify(line));
                            file.body_lines += 1;
                            sink.progress(&file.path, file.body_lines);
                        } else {
                            // Content before any @@ marker; tolerate it as
                            // an implicitly opened hunk.
                            let mut hunk = RawHunk::default();
                            hunk.lines.push(classify(line));
                            file.current = Some(hunk);
                            file.body_lines += 1;
                            sink.progress(&file.path, file.body_lines);
                        }
                    }
                    self.state = State::InFile(file);
                }
            }
        }
    }

    fn open_file(&mut self, old: &str, new: &str, sink: &mut LexSink) {
        if old == DEV_NULL && new == DEV_NULL {
            sink.report(ParseIssue::MalformedHeader {
                detail: "both sides of a diff header are /dev/null".to_string(),
            });
            return;
        }
        if new == DEV_NULL {
            // Whole-file deletion; the hunks that follow just restate the
            // removed content.
            let path = PathBuf::from(old);
            sink.opened(&path, EditKind::Deletion);
            sink.finish_edit(Edit::Deletion { path: path.clone() });
            self.state = State::InFile(ActiveFile {
                path,
                hunks: Vec::new(),
                current: None,
                deletion: true,
                body_lines: 0,
            });
            return;
        }

        let path = if old == DEV_NULL {
            let path = PathBuf::from(new);
            sink.opened(&path, EditKind::Creation);
            sink.finish_edit(Edit::Creation {
                path: path.clone(),
                content: None,
            });
            path
        } else {
            let path = PathBuf::from(old);
            if old != new {
                sink.opened(&path, EditKind::Rename);
                sink.finish_edit(Edit::Rename {
                    path: path.clone(),
                    new_path: PathBuf::from(new),
                });
            } else {
                sink.opened(&path, EditKind::Replacement);
            }
            path
        };

        self.state = State::InFile(ActiveFile {
            path,
            hunks: Vec::new(),
            current: None,
            deletion: false,
            body_lines: 0,
        });
    }

    /// Close a file section. A trailing unterminated hunk is kept only
    /// when the section itself ended cleanly (`terminated`): an
    /// interrupted stream discards the partially-open hunk.
    fn close_file(&mut self, mut file: ActiveFile, terminated: bool, sink: &mut LexSink) {
        if let Some(hunk) = file.current.take() {
            if terminated && !hunk.is_empty() {
                file.hunks.push(hunk);
            } else if !hunk.is_empty() {
                sink.report(ParseIssue::UnterminatedBlock {
                    path: file.path.display().to_string(),
                });
            }
        }
        if !file.hunks.is_empty() {
            sink.hunk_files.push(FileHunks {
                path: file.path,
                hunks: file.hunks,
            });
        }
    }
}

impl FormatLexer for UdiffLexer {
    fn consume_chunk(&mut self, chunk: &str, sink: &mut LexSink) {
        for line in self.splitter.push(chunk) {
            self.consume_line(&line, sink);
        }
    }

    fn finalize(&mut self, sink: &mut LexSink) {
        if let Some(line) = self.splitter.flush() {
            self.consume_line(&line, sink);
        }
        match std::mem::replace(&mut self.state, State::Commentary) {
            State::Commentary => {}
            State::AwaitNewPath { old } => {
                sink.report(ParseIssue::MalformedHeader {
                    detail: format!("stream ended after '--- {old}'"),
                });
            }
            State::InFile(file) => self.close_file(file, false, sink),
        }
    }
}

fn classify(line: &str) -> DiffLine {
    if let Some(text) = line.strip_prefix('+') {
        DiffLine::Added(text.to_string())
    } else if let Some(text) = line.strip_prefix('-') {
        DiffLine::Removed(text.to_string())
    } else if let Some(text) = line.strip_prefix(' ') {
        DiffLine::Context(text.to_string())
    } else {
        // Some models drop the leading space on context lines.
        DiffLine::Context(line.to_string())
    }
}
