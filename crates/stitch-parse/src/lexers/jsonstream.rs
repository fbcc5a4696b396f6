//! JSON-object-stream wire format.
//!
//! The whole response is one JSON object whose `content` array holds
//! tagged elements:
//!
//! ```json
//! {"content": [
//!     {"type": "comment", "content": "Fixing the return value."},
//!     {"type": "edit", "file-path": "core.py",
//!      "starting-line": 1, "ending-line": 2, "content": "    return 1"},
//!     {"type": "rename", "file-path": "a.py", "new-file-path": "b.py"}
//! ]}
//! ```
//!
//! Line numbers are 0-indexed with an exclusive end, mapping directly
//! onto `Interval`. The response streams in with no chunk alignment, so
//! a full `serde_json` parse of the buffer would stay incomplete until
//! the very end; instead a small bracket/quote-depth tracker carves out
//! each array element as soon as it is structurally complete and only
//! then hands it to `serde_json`. That is what makes progressive display
//! possible for this format.

use super::{FormatLexer, LexSink};
use crate::edit::{Edit, EditKind};
use crate::error::ParseIssue;
use crate::event::Color;
use serde::Deserialize;
use std::path::PathBuf;
use stitch_common::Interval;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum JsonElement {
    #[serde(rename_all = "kebab-case")]
    Comment { content: String },
    #[serde(rename_all = "kebab-case")]
    Edit {
        file_path: String,
        starting_line: usize,
        ending_line: usize,
        content: String,
    },
    #[serde(rename_all = "kebab-case")]
    Creation { file_path: String },
    #[serde(rename_all = "kebab-case")]
    Deletion { file_path: String },
    #[serde(rename_all = "kebab-case")]
    Rename {
        file_path: String,
        new_file_path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Scanning for the opening `[` of the content array.
    Preamble,
    /// Between elements, waiting for the next one (or the closing `]`).
    BetweenElements,
    /// Accumulating one element's text.
    InElement,
    /// The array closed; everything after is ignored.
    Done,
}

#[derive(Debug)]
pub struct JsonStreamLexer {
    phase: Phase,
    element: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
    elements_seen: usize,
}

impl JsonStreamLexer {
    pub fn new() -> Self {
        Self {
            phase: Phase::Preamble,
            element: String::new(),
            depth: 0,
            in_string: false,
            escaped: false,
            elements_seen: 0,
        }
    }

    fn consume_char(&mut self, c: char, sink: &mut LexSink) {
        match self.phase {
            Phase::Preamble => {
                if self.track_string(c) {
                    return;
                }
                if c == '[' {
                    self.phase = Phase::BetweenElements;
                }
            }
            Phase::BetweenElements => {
                if c.is_whitespace() || c == ',' {
                    return;
                }
                if c == ']' {
                    self.phase = Phase::Done;
                    return;
                }
                self.element.clear();
                self.depth = 0;
                self.in_string = false;
                self.escaped = false;
                self.phase = Phase::InElement;
                self.element_char(c, sink);
            }
            Phase::InElement => self.element_char(c, sink),
            Phase::Done => {}
        }
    }

    fn element_char(&mut self, c: char, sink: &mut LexSink) {
        if self.in_string {
            self.element.push(c);
            self.track_string(c);
            return;
        }
        match c {
            '"' => {
                self.element.push(c);
                self.in_string = true;
            }
            '{' | '[' => {
                self.element.push(c);
                self.depth += 1;
            }
            '}' | ']' => {
                if self.depth == 0 {
                    // Closing bracket of the content array while inside a
                    // non-delimited (scalar) element.
                    self.complete_element(sink);
                    self.phase = Phase::Done;
                    return;
                }
                self.element.push(c);
                self.depth -= 1;
                if self.depth == 0 {
                    self.complete_element(sink);
                    self.phase = Phase::BetweenElements;
                }
            }
            ',' if self.depth == 0 => {
                self.complete_element(sink);
                self.phase = Phase::BetweenElements;
            }
            _ => self.element.push(c),
        }
    }

    /// Track string/escape state; returns true if the character was part
    /// of a string literal.
    fn track_string(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            true
        } else if c == '"' {
            self.in_string = true;
            true
        } else {
            false
        }
    }

    fn complete_element(&mut self, sink: &mut LexSink) {
        let text = std::mem::take(&mut self.element);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.elements_seen += 1;
        match serde_json::from_str::<JsonElement>(trimmed) {
            Ok(element) => emit_element(element, sink),
            Err(e) => sink.report(ParseIssue::MalformedHeader {
                detail: format!("bad content element: {e}"),
            }),
        }
    }
}

impl FormatLexer for JsonStreamLexer {
    fn consume_chunk(&mut self, chunk: &str, sink: &mut LexSink) {
        for c in chunk.chars() {
            self.consume_char(c, sink);
        }
    }

    fn finalize(&mut self, sink: &mut LexSink) {
        match self.phase {
            Phase::Done | Phase::BetweenElements => {}
            Phase::InElement => sink.report(ParseIssue::UnterminatedBlock {
                path: "<json element>".to_string(),
            }),
            Phase::Preamble => {
                if self.elements_seen == 0 {
                    sink.report(ParseIssue::MalformedHeader {
                        detail: "response contained no content array".to_string(),
                    });
                }
            }
        }
    }
}

fn emit_element(element: JsonElement, sink: &mut LexSink) {
    match element {
        JsonElement::Comment { content } => {
            sink.styled_commentary(&content, Color::Cyan);
        }
        JsonElement::Edit {
            file_path,
            starting_line,
            ending_line,
            content,
        } => {
            // 0-indexed exclusive-end on the wire; shift to 1-indexed.
            let Some(interval) = Interval::new(starting_line + 1, ending_line + 1) else {
                sink.report(ParseIssue::InvalidRange {
                    path: file_path,
                    detail: format!(
                        "starting-line {starting_line} / ending-line {ending_line} is not a valid range"
                    ),
                });
                return;
            };
            let path = PathBuf::from(&file_path);
            let lines = if content.is_empty() {
                Vec::new()
            } else {
                content.split('\n').map(str::to_string).collect()
            };
            sink.opened(&path, EditKind::Replacement);
            sink.finish_edit(Edit::Replacement {
                path,
                interval,
                lines,
            });
        }
        JsonElement::Creation { file_path } => {
            let path = PathBuf::from(file_path);
            sink.opened(&path, EditKind::Creation);
            sink.finish_edit(Edit::Creation {
                path,
                content: None,
            });
        }
        JsonElement::Deletion { file_path } => {
            let path = PathBuf::from(file_path);
            sink.opened(&path, EditKind::Deletion);
            sink.finish_edit(Edit::Deletion { path });
        }
        JsonElement::Rename {
            file_path,
            new_file_path,
        } => {
            let path = PathBuf::from(file_path);
            sink.opened(&path, EditKind::Rename);
            sink.finish_edit(Edit::Rename {
                path,
                new_path: PathBuf::from(new_file_path),
            });
        }
    }
}
