//! 1-indexed, half-open line ranges.
//!
//! Every edit in the system describes the lines it touches as an
//! `Interval`: `start` is the first affected line (inclusive), `end` is
//! one past the last (exclusive). An interval with `start == end` touches
//! no lines and marks a pure insertion point before `start`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    start: usize,
    end: usize,
}

impl Interval {
    /// Create an interval over lines `[start, end)`. Returns `None` when
    /// the pair is not a valid range (`start` must be at least 1 and no
    /// greater than `end`).
    pub fn new(start: usize, end: usize) -> Option<Self> {
        if start >= 1 && start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Insertion point before line `line` (an empty interval).
    pub fn insertion(line: usize) -> Option<Self> {
        Self::new(line, line)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of lines covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `line` falls inside the interval.
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line < self.end
    }

    /// True when the two intervals share at least one line. An empty
    /// interval overlaps a range only when it sits strictly inside it:
    /// an insertion point at a range's boundary is untouched by the
    /// range, but one in its interior is consumed by it.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the intervals touch end-to-start with no gap.
    pub fn is_adjacent(&self, other: &Interval) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// Union of two overlapping or adjacent intervals. `None` when the
    /// inputs are disjoint with a gap between them.
    pub fn merge(&self, other: &Interval) -> Option<Interval> {
        if self.overlaps(other) || self.is_adjacent(other) {
            Some(Interval {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            })
        } else {
            None
        }
    }

    /// Collapse a set of intervals into the minimal covering set, sorted
    /// by start line.
    pub fn merge_all(mut intervals: Vec<Interval>) -> Vec<Interval> {
        intervals.sort_by_key(|iv| (iv.start, iv.end));
        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for iv in intervals {
            match merged.last_mut() {
                Some(last) => {
                    if let Some(joined) = last.merge(&iv) {
                        *last = joined;
                    } else {
                        merged.push(iv);
                    }
                }
                None => merged.push(iv),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_ranges() {
        assert!(Interval::new(0, 3).is_none());
        assert!(Interval::new(5, 4).is_none());
        assert!(Interval::new(1, 1).is_some());
    }

    #[test]
    fn test_contains_is_half_open() {
        let interval = iv(2, 5);
        assert!(!interval.contains(1));
        assert!(interval.contains(2));
        assert!(interval.contains(4));
        assert!(!interval.contains(5));
    }

    #[test]
    fn test_empty_interval_boundary_vs_interior() {
        let range = iv(2, 6);
        // Boundary insertion points do not overlap the range.
        assert!(!Interval::insertion(2).unwrap().overlaps(&range));
        assert!(!Interval::insertion(6).unwrap().overlaps(&range));
        // An insertion point strictly inside the range does.
        assert!(Interval::insertion(4).unwrap().overlaps(&range));
        assert!(range.overlaps(&Interval::insertion(4).unwrap()));
        // Two empty intervals at the same point never overlap.
        let point = Interval::insertion(4).unwrap();
        assert!(!point.overlaps(&point));
    }

    #[test]
    fn test_overlap_and_adjacency() {
        assert!(iv(1, 4).overlaps(&iv(3, 6)));
        assert!(!iv(1, 3).overlaps(&iv(3, 6)));
        assert!(iv(1, 3).is_adjacent(&iv(3, 6)));
        assert!(!iv(1, 3).is_adjacent(&iv(4, 6)));
    }

    #[test]
    fn test_merge_defined_iff_overlapping_or_adjacent() {
        assert_eq!(iv(1, 4).merge(&iv(3, 6)), Some(iv(1, 6)));
        assert_eq!(iv(1, 3).merge(&iv(3, 6)), Some(iv(1, 6)));
        assert_eq!(iv(1, 3).merge(&iv(5, 6)), None);
    }

    #[test]
    fn test_merge_span_equals_union() {
        let merged = iv(2, 5).merge(&iv(4, 9)).unwrap();
        assert_eq!(merged.start(), 2);
        assert_eq!(merged.end(), 9);
        assert_eq!(merged.len(), 7);
    }

    #[test]
    fn test_merge_all_produces_minimal_cover() {
        let merged = Interval::merge_all(vec![iv(8, 10), iv(1, 3), iv(2, 5), iv(5, 7)]);
        assert_eq!(merged, vec![iv(1, 7), iv(8, 10)]);
    }

    #[test]
    fn test_merge_all_keeps_disjoint_insertions() {
        let merged = Interval::merge_all(vec![
            Interval::insertion(4).unwrap(),
            iv(1, 2),
            Interval::insertion(9).unwrap(),
        ]);
        assert_eq!(merged.len(), 3);
    }
}
