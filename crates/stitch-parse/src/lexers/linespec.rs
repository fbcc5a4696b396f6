//! Line-replacement wire format.
//!
//! Headers are single lines `@ <file> <directive>`:
//!
//! ```text
//! @ src/core.py starting_line=2 ending_line=3
//!     return 1
//! @
//! @ src/new.py +
//! @ src/old.py -
//! @ src/a.py src/b.py
//! ```
//!
//! `starting_line` is inclusive, `ending_line` exclusive (unlike the
//! block format). `insert_line=<n>` inserts before line n. `+` creates,
//! `-` deletes, any other bare token renames. Content-bearing directives
//! take body lines up to a lone `@`; the file-level ones take effect
//! immediately.
//!
//! The lexer does not deduplicate repeated blocks: its job is to
//! represent exactly what the model said, duplicates included.

use super::{FormatLexer, LexSink, LineSplitter};
use crate::edit::{Edit, EditKind};
use crate::error::ParseIssue;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use stitch_common::Interval;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\s+(\S+)\s+(\S.*?)\s*$").unwrap());
static REPLACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^starting_line=(\d+)\s+ending_line=(\d+)$").unwrap());
static INSERT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^insert_line=(\d+)$").unwrap());

#[derive(Debug)]
enum State {
    Commentary,
    InBody {
        path: PathBuf,
        interval: Interval,
        lines: Vec<String>,
    },
}

#[derive(Debug)]
pub struct LinespecLexer {
    splitter: LineSplitter,
    state: State,
}

impl LinespecLexer {
    pub fn new() -> Self {
        Self {
            splitter: LineSplitter::new(),
            state: State::Commentary,
        }
    }

    fn consume_line(&mut self, line: &str, sink: &mut LexSink) {
        match std::mem::replace(&mut self.state, State::Commentary) {
            State::Commentary => {
                if let Some(caps) = HEADER.captures(line) {
                    self.open_header(&caps[1], &caps[2], sink);
                } else {
                    sink.commentary_line(line);
                }
            }
            State::InBody {
                path,
                interval,
                mut lines,
            } => {
                if line.trim_end() == "@" {
                    sink.finish_edit(Edit::Replacement {
                        path,
                        interval,
                        lines,
                    });
                } else {
                    lines.push(line.to_string());
                    sink.progress(&path, lines.len());
                    self.state = State::InBody {
                        path,
                        interval,
                        lines,
                    };
                }
            }
        }
    }

    fn open_header(&mut self, file: &str, directive: &str, sink: &mut LexSink) {
        let path = PathBuf::from(file);
        if directive == "+" {
            sink.opened(&path, EditKind::Creation);
            sink.finish_edit(Edit::Creation {
                path,
                content: None,
            });
        } else if directive == "-" {
            sink.opened(&path, EditKind::Deletion);
            sink.finish_edit(Edit::Deletion { path });
        } else if let Some(caps) = REPLACE.captures(directive) {
            match exclusive_interval(file, &caps[1], &caps[2]) {
                Ok(interval) => {
                    sink.opened(&path, EditKind::Replacement);
                    self.state = State::InBody {
                        path,
                        interval,
                        lines: Vec::new(),
                    };
                }
                Err(issue) => sink.report(issue),
            }
        } else if let Some(caps) = INSERT.captures(directive) {
            let line: usize = match caps[1].parse() {
                Ok(n) => n,
                Err(e) => {
                    sink.report(ParseIssue::InvalidRange {
                        path: file.to_string(),
                        detail: format!("insert_line: {e}"),
                    });
                    return;
                }
            };
            match Interval::insertion(line) {
                Some(interval) => {
                    sink.opened(&path, EditKind::Replacement);
                    self.state = State::InBody {
                        path,
                        interval,
                        lines: Vec::new(),
                    };
                }
                None => sink.report(ParseIssue::InvalidRange {
                    path: file.to_string(),
                    detail: format!("insert_line={line} out of range"),
                }),
            }
        } else if !directive.contains('=') && !directive.contains(char::is_whitespace) {
            sink.opened(&path, EditKind::Rename);
            sink.finish_edit(Edit::Rename {
                path,
                new_path: PathBuf::from(directive),
            });
        } else {
            sink.report(ParseIssue::MalformedHeader {
                detail: format!("unrecognized directive '{directive}' for {file}"),
            });
        }
    }
}

impl FormatLexer for LinespecLexer {
    fn consume_chunk(&mut self, chunk: &str, sink: &mut LexSink) {
        for line in self.splitter.push(chunk) {
            self.consume_line(&line, sink);
        }
    }

    fn finalize(&mut self, sink: &mut LexSink) {
        if let Some(line) = self.splitter.flush() {
            self.consume_line(&line, sink);
        }
        if let State::InBody { path, .. } = std::mem::replace(&mut self.state, State::Commentary) {
            sink.report(ParseIssue::UnterminatedBlock {
                path: path.display().to_string(),
            });
        }
    }
}

fn exclusive_interval(file: &str, start: &str, end: &str) -> Result<Interval, ParseIssue> {
    let bad = |detail: String| ParseIssue::InvalidRange {
        path: file.to_string(),
        detail,
    };
    let start: usize = start.parse().map_err(|e| bad(format!("starting_line: {e}")))?;
    let end: usize = end.parse().map_err(|e| bad(format!("ending_line: {e}")))?;
    // Already exclusive on the wire; no adjustment needed.
    Interval::new(start, end).ok_or_else(|| {
        bad(format!(
            "starting_line={start} ending_line={end} is not a valid range"
        ))
    })
}
