//! The streaming parser driving one model turn.
//!
//! One `StreamParser` exists per turn. It owns the active format lexer,
//! feeds it raw chunks as they arrive, and hands back display events
//! after every chunk so the session can echo output while the model is
//! still generating. Finalization runs second-pass hunk resolution and
//! the per-file overlap check, producing the turn's ordered edit list.
//!
//! Interruption is cooperative: the session sets the flag and the parser
//! simply stops accepting chunks; finalization then works with whatever
//! edits had fully closed by that point.

use crate::edit::{overlapping_pair, Edit};
use crate::error::ParseIssue;
use crate::event::SessionEvent;
use crate::lexers::block::BlockLexer;
use crate::lexers::jsonstream::JsonStreamLexer;
use crate::lexers::linespec::LinespecLexer;
use crate::lexers::udiff::UdiffLexer;
use crate::lexers::{FormatLexer, LexSink, WireFormat};
use crate::resolve::{resolve_hunks, SourceReader};

/// Everything the turn produced, ready for application.
#[derive(Debug)]
pub struct ParsedTurn {
    pub edits: Vec<Edit>,
    pub commentary: String,
    pub issues: Vec<ParseIssue>,
    pub interrupted: bool,
}

pub struct StreamParser {
    lexer: Box<dyn FormatLexer>,
    sink: LexSink,
    interrupted: bool,
}

impl StreamParser {
    pub fn new(format: WireFormat) -> Self {
        let lexer: Box<dyn FormatLexer> = match format {
            WireFormat::Block => Box::new(BlockLexer::new()),
            WireFormat::LineReplacement => Box::new(LinespecLexer::new()),
            WireFormat::UnifiedDiff => Box::new(UdiffLexer::new()),
            WireFormat::JsonStream => Box::new(JsonStreamLexer::new()),
        };
        Self {
            lexer,
            sink: LexSink::new(),
            interrupted: false,
        }
    }

    /// Feed the next chunk of model output and drain the display events
    /// it unlocked. Chunks arriving after interruption are dropped.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<SessionEvent> {
        if self.interrupted {
            return Vec::new();
        }
        self.lexer.consume_chunk(chunk, &mut self.sink);
        std::mem::take(&mut self.sink.events)
    }

    /// Request cooperative cancellation. Already-closed edits survive;
    /// whatever block is mid-stream gets discarded at finalization.
    pub fn interrupt(&mut self) {
        if !self.interrupted {
            tracing::debug!("parser interrupted; finalizing with completed edits only");
            self.interrupted = true;
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// End the turn: flush the lexer, resolve pending diff hunks against
    /// current file content, enforce the per-file non-overlap invariant,
    /// and return the finalized turn plus the remaining display events.
    pub fn finalize(mut self, reader: &dyn SourceReader) -> (ParsedTurn, Vec<SessionEvent>) {
        self.lexer.finalize(&mut self.sink);
        resolve_hunks(&mut self.sink, reader);

        // Overlapping replacements make per-file ordering unsafe; drop
        // every edit for an offending file, leaving other files intact.
        while let Some((path, ..)) = overlapping_pair(&self.sink.edits) {
            let dropped_before = self.sink.edits.len();
            self.sink.edits.retain(|edit| edit.path() != path);
            tracing::warn!(
                path = %path.display(),
                dropped = dropped_before - self.sink.edits.len(),
                "dropping edits for file with overlapping intervals"
            );
            self.sink.report(ParseIssue::OverlappingEdits { path });
        }

        let events = std::mem::take(&mut self.sink.events);
        let turn = ParsedTurn {
            edits: self.sink.edits,
            commentary: self.sink.commentary,
            issues: self.sink.issues,
            interrupted: self.interrupted,
        };
        (turn, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditKind;
    use crate::resolve::EmptyReader;
    use std::path::{Path, PathBuf};

    /// Feed input in tiny chunks to exercise buffering.
    fn parse_chunked(format: WireFormat, input: &str, chunk_size: usize) -> ParsedTurn {
        let mut parser = StreamParser::new(format);
        let bytes = input.as_bytes();
        for chunk in bytes.chunks(chunk_size) {
            parser.push_chunk(std::str::from_utf8(chunk).unwrap());
        }
        let (turn, _) = parser.finalize(&EmptyReader);
        turn
    }

    #[test]
    fn test_chunk_size_never_changes_the_result() {
        let input = concat!(
            "Commentary first.\n",
            "@@start\n",
            "{\"file\": \"a.py\", \"action\": \"replace\", \"start-line\": 1, \"end-line\": 2}\n",
            "@@code\n",
            "new line\n",
            "@@end\n",
        );
        let whole = parse_chunked(WireFormat::Block, input, input.len());
        for chunk_size in [1, 2, 3, 7, 64] {
            let chunked = parse_chunked(WireFormat::Block, input, chunk_size);
            assert_eq!(chunked.edits, whole.edits, "chunk size {chunk_size}");
            assert_eq!(chunked.commentary, whole.commentary);
        }
    }

    #[test]
    fn test_events_stream_before_finalization() {
        let mut parser = StreamParser::new(WireFormat::LineReplacement);
        let events = parser.push_chunk("thinking about it...\n@ a.py insert_line=1\n");
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Commentary { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::EditOpened { .. })));
    }

    #[test]
    fn test_interrupted_stream_keeps_closed_edits() {
        let mut parser = StreamParser::new(WireFormat::LineReplacement);
        parser.push_chunk("@ a.py insert_line=1\nx\n@\n");
        parser.push_chunk("@ b.py insert_line=1\ny\n@\n");
        parser.push_chunk("@ c.py insert_line=1\nhalf-open");
        parser.interrupt();
        // Chunks after interruption are ignored.
        let ignored = parser.push_chunk("more\n@\n@ d.py +\n");
        assert!(ignored.is_empty());

        let (turn, _) = parser.finalize(&EmptyReader);
        assert!(turn.interrupted);
        assert_eq!(turn.edits.len(), 2);
        assert_eq!(turn.edits[0].path(), Path::new("a.py"));
        assert_eq!(turn.edits[1].path(), Path::new("b.py"));
    }

    #[test]
    fn test_overlap_rejects_whole_file_but_not_others() {
        let input = concat!(
            "@ a.py starting_line=1 ending_line=5\nfirst\n@\n",
            "@ a.py starting_line=3 ending_line=8\nsecond\n@\n",
            "@ b.py starting_line=1 ending_line=2\nfine\n@\n",
        );
        let turn = parse_chunked(WireFormat::LineReplacement, input, 16);
        assert_eq!(turn.edits.len(), 1);
        assert_eq!(turn.edits[0].path(), Path::new("b.py"));
        assert!(turn
            .issues
            .iter()
            .any(|i| matches!(i, ParseIssue::OverlappingEdits { path } if path == &PathBuf::from("a.py"))));
    }

    #[test]
    fn test_json_format_end_to_end() {
        let input = concat!(
            "{\"content\": [",
            "{\"type\": \"comment\", \"content\": \"hi\"},",
            "{\"type\": \"creation\", \"file-path\": \"new.py\"}",
            "]}",
        );
        let turn = parse_chunked(WireFormat::JsonStream, input, 4);
        assert_eq!(turn.edits.len(), 1);
        assert_eq!(turn.edits[0].kind(), EditKind::Creation);
        assert_eq!(turn.commentary, "hi\n");
    }
}
