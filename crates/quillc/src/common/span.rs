//! Source spans and line/character conversion

use std::fmt;

/// A byte range in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A zero-based line and character position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LineCol {
    pub line: u32,
    pub character: u32,
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Editors count from one
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// Start and end positions of a span in line:character form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub start: LineCol,
    pub end: LineCol,
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Maps byte offsets to line/character positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts, len: source.len() }
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        LineCol {
            line: line as u32,
            character: (offset - self.line_starts[line]) as u32,
        }
    }

    pub fn range(&self, span: Span) -> SourceRange {
        SourceRange {
            start: self.line_col(span.start),
            end: self.line_col(span.end),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let index = LineIndex::new("func main() {\n}\n");
        assert_eq!(index.line_col(0), LineCol { line: 0, character: 0 });
        assert_eq!(index.line_col(5), LineCol { line: 0, character: 5 });
    }

    #[test]
    fn test_line_col_after_newline() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_col(3), LineCol { line: 1, character: 0 });
        assert_eq!(index.line_col(7), LineCol { line: 2, character: 1 });
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_range_display() {
        let index = LineIndex::new("let x\nlet y");
        let range = index.range(Span::new(6, 11));
        assert_eq!(range.to_string(), "2:1-2:6");
    }

    #[test]
    fn test_span_to() {
        let merged = Span::new(4, 6).to(Span::new(1, 3));
        assert_eq!(merged, Span::new(1, 6));
        assert_eq!(merged.len(), 5);
    }
}
