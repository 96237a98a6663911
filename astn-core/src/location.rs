//! Source locations and ranges.
//!
//! Every token and event carries a [`Range`] so consumers can map it back to
//! the exact source text. Positions are byte offsets into the whole stream,
//! which keeps them stable no matter how the input was split into chunks.

use std::fmt;

/// Default number of columns a tab advances.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// An immutable snapshot of a point in the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Byte offset from the start of the stream.
    pub position: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, with tabs expanded.
    pub column: usize,
}

impl Location {
    /// Location of the first character of a stream.
    pub const START: Location = Location {
        position: 0,
        line: 1,
        column: 1,
    };
}

impl Default for Location {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open range between two locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

impl Range {
    #[inline]
    pub fn new(start: Location, end: Location) -> Self {
        debug_assert!(start.position <= end.position);
        Self { start, end }
    }

    /// Zero-width range, used for synthesized tokens.
    #[inline]
    pub fn empty(at: Location) -> Self {
        Self { start: at, end: at }
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.position - self.start.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.position == self.end.position
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Slice the original document text with this range.
    ///
    /// Returns `None` when the range does not fall on character boundaries of
    /// `text` (e.g. `text` is not the document the range was produced from).
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.start.position..self.end.position)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Tracks the current location while characters are consumed.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    location: Location,
    tab_size: usize,
}

impl LocationTracker {
    pub fn new(tab_size: usize) -> Self {
        Self {
            location: Location::START,
            tab_size,
        }
    }

    /// Current location (the location of the next character).
    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub fn tab_size(&self) -> usize {
        self.tab_size
    }

    /// Advance past one character.
    ///
    /// CR only moves the position; whether it ends a line is decided by the
    /// pre-tokenizer, which pairs it with a neighbouring LF.
    #[inline]
    pub fn increase(&mut self, c: char) {
        self.location.position += c.len_utf8();
        match c {
            '\n' => {
                self.location.line += 1;
                self.location.column = 1;
            }
            '\t' => self.location.column += self.tab_size,
            '\r' => {}
            _ => self.location.column += 1,
        }
    }

    /// Advance past every character of `run`.
    pub fn increase_str(&mut self, run: &str) {
        for c in run.chars() {
            self.increase(c);
        }
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TAB_SIZE)
    }
}
