//! Lossless line-level view of file content.
//!
//! File content round-trips byte-for-byte through `LineBuffer`: the
//! presence or absence of a trailing newline is tracked separately from
//! the logical lines, so applying zero edits returns the original bytes.

use crate::interval::Interval;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl LineBuffer {
    pub fn from_content(content: &str) -> Self {
        if content.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: false,
            };
        }
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let trailing_newline = content.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        let trailing_newline = !lines.is_empty();
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn to_content(&self) -> String {
        let mut content = self.lines.join("\n");
        if self.trailing_newline {
            content.push('\n');
        }
        content
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Replace the lines covered by `interval` with `replacement`. An empty
    /// interval inserts before `interval.start()` without removing anything.
    ///
    /// The interval must fit the buffer: `end` may be at most
    /// `line_count() + 1` (insertion after the last line).
    pub fn splice(&mut self, interval: &Interval, replacement: Vec<String>) -> Result<(), String> {
        let start = interval.start() - 1;
        let end = interval.end() - 1;
        if start > self.lines.len() || end > self.lines.len() {
            return Err(format!(
                "line range [{}, {}) exceeds file length {}",
                interval.start(),
                interval.end(),
                self.lines.len()
            ));
        }
        let was_empty = self.lines.is_empty();
        self.lines.splice(start..end, replacement);
        // An empty file that gains lines gets a final newline; a file that
        // already lacked one keeps lacking one.
        if was_empty && !self.lines.is_empty() {
            self.trailing_newline = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        for content in ["", "\n", "a", "a\n", "a\nb", "a\nb\n", "a\n\nb\n"] {
            let buffer = LineBuffer::from_content(content);
            assert_eq!(buffer.to_content(), content, "round trip of {content:?}");
        }
    }

    #[test]
    fn test_line_counts() {
        assert_eq!(LineBuffer::from_content("").line_count(), 0);
        assert_eq!(LineBuffer::from_content("\n").line_count(), 1);
        assert_eq!(LineBuffer::from_content("a\nb\n").line_count(), 2);
        assert_eq!(LineBuffer::from_content("a\nb").line_count(), 2);
    }

    #[test]
    fn test_splice_replaces_range() {
        let mut buffer = LineBuffer::from_content("def f():\n    pass\n");
        buffer
            .splice(&iv(2, 3), vec!["    return 1".to_string()])
            .unwrap();
        assert_eq!(buffer.to_content(), "def f():\n    return 1\n");
    }

    #[test]
    fn test_splice_empty_interval_inserts() {
        let mut buffer = LineBuffer::from_content("a\nc\n");
        buffer
            .splice(&Interval::insertion(2).unwrap(), vec!["b".to_string()])
            .unwrap();
        assert_eq!(buffer.to_content(), "a\nb\nc\n");
    }

    #[test]
    fn test_splice_empty_replacement_deletes() {
        let mut buffer = LineBuffer::from_content("a\nb\nc\n");
        buffer.splice(&iv(2, 3), Vec::new()).unwrap();
        assert_eq!(buffer.to_content(), "a\nc\n");
    }

    #[test]
    fn test_splice_append_after_last_line() {
        let mut buffer = LineBuffer::from_content("a\n");
        buffer
            .splice(&Interval::insertion(2).unwrap(), vec!["b".to_string()])
            .unwrap();
        assert_eq!(buffer.to_content(), "a\nb\n");
    }

    #[test]
    fn test_splice_out_of_bounds_rejected() {
        let mut buffer = LineBuffer::from_content("a\n");
        let err = buffer.splice(&iv(3, 4), vec!["x".to_string()]).unwrap_err();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn test_splice_into_empty_file() {
        let mut buffer = LineBuffer::from_content("");
        buffer
            .splice(&Interval::insertion(1).unwrap(), vec!["only".to_string()])
            .unwrap();
        assert_eq!(buffer.to_content(), "only\n");
    }
}
