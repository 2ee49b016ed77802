//! Batch segmentation
//!
//! Splits a flattened sequence into runs. A run begins at the first entry or
//! at any `Union` entry and extends up to the next `Union`. Only each entry's
//! own operation is inspected.

use std::ops::Range;

use crate::chain::FlattenedEntry;

/// A half-open index range `[start, end)` of one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of entries in the run (never zero)
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false; runs are never empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Whether the run takes the single-solid fast path
    #[inline]
    pub fn is_single(&self) -> bool {
        self.len() == 1
    }

    /// Index range for slicing
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Iterator over the runs of a sequence
pub struct Runs<'a> {
    entries: &'a [FlattenedEntry],
    pos: usize,
}

impl Iterator for Runs<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        if self.pos >= self.entries.len() {
            return None;
        }
        let start = self.pos;
        let end = self.entries[start + 1..]
            .iter()
            .position(|e| e.operation.starts_run())
            .map_or(self.entries.len(), |offset| start + 1 + offset);
        self.pos = end;
        Some(Run::new(start, end))
    }
}

/// Iterate the runs of a sequence without allocating
pub fn runs(entries: &[FlattenedEntry]) -> Runs<'_> {
    Runs { entries, pos: 0 }
}

/// Collect the runs of a sequence
pub fn segment(entries: &[FlattenedEntry]) -> Vec<Run> {
    runs(entries).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::CsgOp;
    use crate::shapes;
    use csgview_math::{mat4, Vec3};
    use std::sync::Arc;

    fn chain(ops: &[CsgOp]) -> Vec<FlattenedEntry> {
        let mesh = Arc::new(shapes::cube(Vec3::ONE));
        ops.iter()
            .map(|op| FlattenedEntry::new(Arc::clone(&mesh), mat4::IDENTITY, *op))
            .collect()
    }

    #[test]
    fn test_empty_has_no_runs() {
        assert!(segment(&[]).is_empty());
    }

    #[test]
    fn test_first_entry_opens_run_regardless_of_op() {
        use CsgOp::*;
        let entries = chain(&[Intersection, Union, Difference]);
        assert_eq!(segment(&entries), vec![Run::new(0, 1), Run::new(1, 3)]);
    }

    #[test]
    fn test_no_union_is_single_run() {
        use CsgOp::*;
        let entries = chain(&[Difference, Intersection, Difference, Difference]);
        assert_eq!(segment(&entries), vec![Run::new(0, 4)]);
    }

    #[test]
    fn test_all_unions_are_single_runs() {
        let entries = chain(&[CsgOp::Union; 3]);
        let runs = segment(&entries);
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(Run::is_single));
    }

    #[test]
    fn test_runs_cover_sequence_exactly() {
        use CsgOp::*;
        let entries = chain(&[Union, Difference, Union, Union, Intersection, Difference, Union]);
        let runs = segment(&entries);
        let mut next = 0;
        for run in &runs {
            assert_eq!(run.start, next);
            assert!(!run.is_empty());
            assert!(run.start == 0 || entries[run.start].operation == Union);
            for i in run.start + 1..run.end {
                assert_ne!(entries[i].operation, Union);
            }
            next = run.end;
        }
        assert_eq!(next, entries.len());
    }

    #[test]
    fn test_iterator_matches_collect() {
        use CsgOp::*;
        let entries = chain(&[Union, Intersection, Union]);
        let a: Vec<Run> = runs(&entries).collect();
        assert_eq!(a, segment(&entries));
        assert_eq!(a[0].range(), 0..2);
    }
}
