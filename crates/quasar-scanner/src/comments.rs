use quasar_core::{Span, TaskPriority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

/// Parallel `(start, stop)` tables for every comment seen by the scanner.
///
/// The raw tables keep the scanner's compact sign encoding so the javadoc
/// layer can retrieve comments without a second scan:
///
/// - starts: `+(start + 1)` for doc comments, `-(start + 1)` otherwise
/// - stops: `-(last content char + 1)` for line comments,
///   `+(one past the closing delimiter + 1)` for closed block/doc comments,
///   `0` for a block comment still open at end of input
///
/// The `+ 1` bias keeps offset zero representable in both directions. Typed
/// accessors decode the encoding; nothing outside this module reads the raw
/// tables.
#[derive(Debug, Default, Clone)]
pub struct CommentTable {
    starts: Vec<isize>,
    stops: Vec<isize>,
}

impl CommentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.starts.clear();
        self.stops.clear();
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.starts.truncate(len);
        self.stops.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub(crate) fn push_line(&mut self, start: usize, last_content: usize) {
        self.starts.push(-(start as isize + 1));
        self.stops.push(-(last_content as isize + 1));
    }

    pub(crate) fn push_block(&mut self, start: usize, doc: bool, stop: Option<usize>) {
        let biased = start as isize + 1;
        self.starts.push(if doc { biased } else { -biased });
        self.stops.push(match stop {
            Some(after_close) => after_close as isize + 1,
            None => 0,
        });
    }

    pub fn kind(&self, index: usize) -> CommentKind {
        if self.stops[index] < 0 {
            CommentKind::Line
        } else if self.starts[index] > 0 {
            CommentKind::Doc
        } else {
            CommentKind::Block
        }
    }

    pub fn start(&self, index: usize) -> usize {
        (self.starts[index].unsigned_abs()) - 1
    }

    /// One past the comment's last character; for an unterminated block
    /// comment this is `None`.
    pub fn stop(&self, index: usize) -> Option<usize> {
        match self.stops[index] {
            0 => None,
            stop if stop < 0 => Some(stop.unsigned_abs()), // biased: last content + 1
            stop => Some(stop as usize - 1),
        }
    }

    pub fn span(&self, index: usize) -> Option<Span> {
        self.stop(index).map(|stop| Span::new(self.start(index), stop))
    }
}

/// A task tag occurrence inside a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTag {
    pub tag: Span,
    pub message: Span,
    pub priority: TaskPriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_encoding_roundtrip() {
        let mut table = CommentTable::new();
        table.push_line(0, 8);
        table.push_block(10, true, Some(30));
        table.push_block(40, false, None);

        assert_eq!(table.kind(0), CommentKind::Line);
        assert_eq!(table.start(0), 0);
        assert_eq!(table.stop(0), Some(9));

        assert_eq!(table.kind(1), CommentKind::Doc);
        assert_eq!(table.span(1), Some(Span::new(10, 30)));

        assert_eq!(table.kind(2), CommentKind::Block);
        assert_eq!(table.stop(2), None);
    }

    #[test]
    fn zero_offset_line_comment_is_representable() {
        let mut table = CommentTable::new();
        table.push_line(0, 1);
        assert_eq!(table.start(0), 0);
        assert_eq!(table.kind(0), CommentKind::Line);
    }
}
