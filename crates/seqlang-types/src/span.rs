use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the source text.
///
/// `line` is 1-based, `position_in_line` is a 0-based character offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TokenPosition {
    pub line: u32,
    pub position_in_line: u32,
}

impl TokenPosition {
    pub fn new(line: u32, position_in_line: u32) -> Self {
        Self {
            line,
            position_in_line,
        }
    }
}

impl fmt::Display for TokenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.position_in_line)
    }
}

/// Source location of a token or tree node.
///
/// `start` is the position of the first token, `stop` the position where
/// the last token begins. `offset..end` is the byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: TokenPosition,
    pub stop: TokenPosition,
    pub offset: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: TokenPosition, stop: TokenPosition, offset: usize, end: usize) -> Self {
        Self {
            start,
            stop,
            offset,
            end,
        }
    }

    /// Span of a single token starting at `start` and covering `offset..end`.
    pub fn token(start: TokenPosition, offset: usize, end: usize) -> Self {
        Self::new(start, start, offset, end)
    }

    /// Zero-width span at a single position.
    pub fn point(start: TokenPosition, offset: usize) -> Self {
        Self::new(start, start, offset, offset)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
            offset: self.offset.min(other.offset),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// Holds the source text for snippet extraction.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub source: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// The verbatim source text covered by `span`.
    ///
    /// Returns an empty string if the span is out of range.
    pub fn slice(&self, span: Span) -> &str {
        self.source.get(span.offset..span.end).unwrap_or("")
    }

    /// Extract a source line by 1-based line number.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
