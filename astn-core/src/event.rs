//! Tree events - the structural output of the tree parser.
//!
//! This is a SAX-style event model: events are emitted as soon as the parser
//! sees the syntax. Containers are represented by open/close pairs, and every
//! Open has exactly one Close even on truncated input (the parser synthesizes
//! missing closes at end of stream).
//!
//! ## Event Sequences
//!
//! Object `{"a": 1}` emits:
//! ```text
//! OpenObject('{')
//! String("a")
//! Colon
//! Overhead(Whitespace)
//! String("1")
//! CloseObject('}')
//! ```
//!
//! Tagged union `| "circle" 5` emits:
//! ```text
//! TaggedUnion
//! Overhead(Whitespace)
//! String("circle")      // option
//! Overhead(Whitespace)
//! String("5")           // payload
//! ```

use std::ops::ControlFlow;

use crate::location::{Location, Range};
use crate::token::{OverheadToken, StringToken};

/// Structural events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// `[` or `<`
    OpenArray { bracket: char, range: Range },
    /// `]` or `>`
    CloseArray { bracket: char, range: Range },
    /// `{` or `(`
    OpenObject { bracket: char, range: Range },
    /// `}` or `)`
    CloseObject { bracket: char, range: Range },
    Colon { range: Range },
    Comma { range: Range },
    /// `|`: the next string is the option, the value after it the payload.
    TaggedUnion { range: Range },
    /// `!`: the next value is the document's schema.
    SchemaMarker { range: Range },
    /// `#` after the schema: the body uses shorthand form.
    CompactMarker { range: Range },
    Overhead(OverheadToken),
    String(StringToken),
}

impl TreeEvent {
    pub fn range(&self) -> Range {
        match self {
            Self::OpenArray { range, .. }
            | Self::CloseArray { range, .. }
            | Self::OpenObject { range, .. }
            | Self::CloseObject { range, .. }
            | Self::Colon { range }
            | Self::Comma { range }
            | Self::TaggedUnion { range }
            | Self::SchemaMarker { range }
            | Self::CompactMarker { range } => *range,
            Self::Overhead(overhead) => overhead.range(),
            Self::String(string) => string.range,
        }
    }

    /// Check if this is a comment, newline or whitespace.
    pub fn is_overhead(&self) -> bool {
        matches!(self, Self::Overhead(_))
    }

    /// Check if this event opens a container.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::OpenArray { .. } | Self::OpenObject { .. })
    }

    /// Check if this event closes a container.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::CloseArray { .. } | Self::CloseObject { .. })
    }
}

/// Receiver of tree events.
///
/// Returning `ControlFlow::Break(())` from [`on_event`](Self::on_event) aborts
/// the pipeline: no further events are delivered and the stream ends with
/// `on_end(aborted = true, ..)`.
pub trait TreeEventSink {
    fn on_event(&mut self, event: TreeEvent) -> ControlFlow<()>;

    /// The stream is over. Called exactly once.
    fn on_end(&mut self, aborted: bool, at: Location);
}

/// Collects every event.
impl TreeEventSink for Vec<TreeEvent> {
    fn on_event(&mut self, event: TreeEvent) -> ControlFlow<()> {
        self.push(event);
        ControlFlow::Continue(())
    }

    fn on_end(&mut self, _aborted: bool, _at: Location) {}
}

impl<S: TreeEventSink + ?Sized> TreeEventSink for &mut S {
    fn on_event(&mut self, event: TreeEvent) -> ControlFlow<()> {
        (**self).on_event(event)
    }

    fn on_end(&mut self, aborted: bool, at: Location) {
        (**self).on_end(aborted, at)
    }
}
