/// Sorted table of line-end offsets, built incrementally while scanning.
///
/// One entry per logical line terminator; CR+LF contributes a single entry
/// (at the LF). Lookup is a binary search, giving 1-based line numbers.
#[derive(Debug, Default, Clone)]
pub struct LineEnds {
    ends: Vec<usize>,
}

impl LineEnds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ends.clear();
    }

    /// Record a line terminator at `offset`. Offsets must arrive in
    /// non-decreasing order; repeated offsets are collapsed.
    pub fn push(&mut self, offset: usize) {
        debug_assert!(self.ends.last().is_none_or(|&last| last <= offset));
        if self.ends.last() == Some(&offset) {
            return;
        }
        self.ends.push(offset);
    }

    /// 1-based line number of `offset`.
    pub fn line_number(&self, offset: usize) -> usize {
        self.ends.partition_point(|&end| end < offset) + 1
    }

    /// 1-based column of `offset` within its line.
    pub fn column(&self, offset: usize) -> usize {
        let line = self.line_number(offset);
        let line_start = if line == 1 {
            0
        } else {
            self.ends[line - 2] + 1
        };
        offset - line_start + 1
    }

    pub fn count(&self) -> usize {
        self.ends.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.ends.truncate(len);
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_one_based() {
        let mut ends = LineEnds::new();
        // "ab\ncd\nef"
        ends.push(2);
        ends.push(5);
        assert_eq!(ends.line_number(0), 1);
        assert_eq!(ends.line_number(2), 1);
        assert_eq!(ends.line_number(3), 2);
        assert_eq!(ends.line_number(6), 3);
        assert_eq!(ends.column(3), 1);
        assert_eq!(ends.column(4), 2);
    }
}
