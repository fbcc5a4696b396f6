//! Block-marker wire format.
//!
//! Edits are JSON headers fenced by sentinel lines:
//!
//! ```text
//! I'll fix the return value.
//! @@start
//! {
//!     "file": "src/core.py",
//!     "action": "replace",
//!     "start-line": 2,
//!     "end-line": 2
//! }
//! @@code
//!     return 1
//! @@end
//! ```
//!
//! Line numbers are 1-indexed and inclusive on both ends; `insert` uses
//! an `insert-after-line`/`insert-before-line` pair of consecutive
//! integers. Anything outside a block is commentary.

use super::{FormatLexer, LexSink, LineSplitter};
use crate::edit::Edit;
use crate::error::ParseIssue;
use serde::Deserialize;
use std::path::PathBuf;
use stitch_common::Interval;

const BLOCK_START: &str = "@@start";
const BLOCK_CODE: &str = "@@code";
const BLOCK_END: &str = "@@end";

#[derive(Debug, Deserialize)]
struct BlockHeader {
    file: String,
    action: BlockAction,
    #[serde(rename = "start-line")]
    start_line: Option<usize>,
    #[serde(rename = "end-line")]
    end_line: Option<usize>,
    #[serde(rename = "insert-after-line")]
    insert_after_line: Option<usize>,
    #[serde(rename = "insert-before-line")]
    insert_before_line: Option<usize>,
    /// Rename target.
    name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum BlockAction {
    Replace,
    Insert,
    Delete,
    CreateFile,
    DeleteFile,
    RenameFile,
}

#[derive(Debug)]
enum State {
    Commentary,
    InHeader { json: String },
    InBody { header: BlockHeader, lines: Vec<String> },
    /// Header was rejected; swallow body lines until the end sentinel.
    SkippingBody,
}

#[derive(Debug)]
pub struct BlockLexer {
    splitter: LineSplitter,
    state: State,
}

impl BlockLexer {
    pub fn new() -> Self {
        Self {
            splitter: LineSplitter::new(),
            state: State::Commentary,
        }
    }

    fn consume_line(&mut self, line: &str, sink: &mut LexSink) {
        match std::mem::replace(&mut self.state, State::Commentary) {
            State::Commentary => {
                if line.trim() == BLOCK_START {
                    self.state = State::InHeader {
                        json: String::new(),
                    };
                } else {
                    sink.commentary_line(line);
                }
            }
            State::InHeader { mut json } => {
                let trimmed = line.trim();
                if trimmed == BLOCK_CODE || trimmed == BLOCK_END {
                    match parse_header(&json) {
                        Ok(header) => {
                            sink.opened(&PathBuf::from(&header.file), action_kind(header.action));
                            if trimmed == BLOCK_CODE {
                                self.state = State::InBody {
                                    header,
                                    lines: Vec::new(),
                                };
                            } else {
                                self.close_block(header, Vec::new(), sink);
                            }
                        }
                        Err(issue) => {
                            sink.report(issue);
                            if trimmed == BLOCK_CODE {
                                self.state = State::SkippingBody;
                            }
                        }
                    }
                } else {
                    json.push_str(line);
                    json.push('\n');
                    self.state = State::InHeader { json };
                }
            }
            State::InBody { header, mut lines } => {
                if line.trim() == BLOCK_END {
                    self.close_block(header, lines, sink);
                } else {
                    lines.push(line.to_string());
                    sink.progress(&PathBuf::from(&header.file), lines.len());
                    self.state = State::InBody { header, lines };
                }
            }
            State::SkippingBody => {
                if line.trim() != BLOCK_END {
                    self.state = State::SkippingBody;
                }
            }
        }
    }

    fn close_block(&mut self, header: BlockHeader, body: Vec<String>, sink: &mut LexSink) {
        match build_edit(header, body) {
            Ok(edit) => sink.finish_edit(edit),
            Err(issue) => sink.report(issue),
        }
    }
}

impl FormatLexer for BlockLexer {
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
            State::InHeader { .. } => sink.report(ParseIssue::UnterminatedBlock {
                path: "<unknown>".to_string(),
            }),
            State::InBody { header, .. } => sink.report(ParseIssue::UnterminatedBlock {
                path: header.file,
            }),
            State::SkippingBody => {}
        }
    }
}

fn parse_header(json: &str) -> Result<BlockHeader, ParseIssue> {
    serde_json::from_str(json).map_err(|e| ParseIssue::MalformedHeader {
        detail: e.to_string(),
    })
}

fn action_kind(action: BlockAction) -> crate::edit::EditKind {
    use crate::edit::EditKind;
    match action {
        BlockAction::Replace | BlockAction::Insert | BlockAction::Delete => EditKind::Replacement,
        BlockAction::CreateFile => EditKind::Creation,
        BlockAction::DeleteFile => EditKind::Deletion,
        BlockAction::RenameFile => EditKind::Rename,
    }
}

/// Convert a parsed header plus its body into an `Edit`, normalizing the
/// format's inclusive-inclusive line numbers to half-open intervals.
fn build_edit(header: BlockHeader, body: Vec<String>) -> Result<Edit, ParseIssue> {
    let path = PathBuf::from(&header.file);
    match header.action {
        BlockAction::Replace => {
            let interval = inclusive_interval(&header)?;
            Ok(Edit::Replacement {
                path,
                interval,
                lines: body,
            })
        }
        BlockAction::Insert => {
            let after = require(&header, header.insert_after_line, "insert-after-line")?;
            let before = require(&header, header.insert_before_line, "insert-before-line")?;
            if before != after + 1 {
                return Err(ParseIssue::InvalidRange {
                    path: header.file,
                    detail: format!(
                        "insert-after-line {after} and insert-before-line {before} must be consecutive"
                    ),
                });
            }
            let interval = Interval::insertion(before).ok_or_else(|| ParseIssue::InvalidRange {
                path: header.file.clone(),
                detail: format!("insert-before-line {before} out of range"),
            })?;
            Ok(Edit::Replacement {
                path,
                interval,
                lines: body,
            })
        }
        BlockAction::Delete => {
            let interval = inclusive_interval(&header)?;
            Ok(Edit::Replacement {
                path,
                interval,
                lines: Vec::new(),
            })
        }
        BlockAction::CreateFile => {
            let content = if body.is_empty() {
                None
            } else {
                Some(format!("{}\n", body.join("\n")))
            };
            Ok(Edit::Creation { path, content })
        }
        BlockAction::DeleteFile => Ok(Edit::Deletion { path }),
        BlockAction::RenameFile => {
            let name = header
                .name
                .as_deref()
                .ok_or_else(|| ParseIssue::MalformedHeader {
                    detail: format!("rename-file for {} is missing 'name'", header.file),
                })?;
            Ok(Edit::Rename {
                path,
                new_path: PathBuf::from(name),
            })
        }
    }
}

fn inclusive_interval(header: &BlockHeader) -> Result<Interval, ParseIssue> {
    let start = require(header, header.start_line, "start-line")?;
    let end = require(header, header.end_line, "end-line")?;
    // Inclusive-inclusive on the wire; half-open internally.
    Interval::new(start, end + 1).ok_or_else(|| ParseIssue::InvalidRange {
        path: header.file.clone(),
        detail: format!("start-line {start} / end-line {end} is not a valid range"),
    })
}

fn require(header: &BlockHeader, field: Option<usize>, name: &str) -> Result<usize, ParseIssue> {
    field.ok_or_else(|| ParseIssue::MalformedHeader {
        detail: format!("{} for {} is missing '{}'", action_name(header.action), header.file, name),
    })
}

fn action_name(action: BlockAction) -> &'static str {
    match action {
        BlockAction::Replace => "replace",
        BlockAction::Insert => "insert",
        BlockAction::Delete => "delete",
        BlockAction::CreateFile => "create-file",
        BlockAction::DeleteFile => "delete-file",
        BlockAction::RenameFile => "rename-file",
    }
}
