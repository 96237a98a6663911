//! Callback-tree interfaces driven by the [`StackedParser`].
//!
//! Where a [`TreeEventSink`] sees one flat stream, these handlers see the
//! document's shape: every value position hands out a [`ValueHandler`], which
//! turns into an object, array, tagged union or string handler depending on
//! what the document contains there.
//!
//! ```text
//! DocumentHandler
//!   ├─ schema() ─► RequiredValueHandler ─ exists() ─► ValueHandler
//!   └─ body()   ─► RequiredValueHandler ─ exists() ─► ValueHandler
//!
//! ValueHandler
//!   ├─ object()       ─► ObjectHandler
//!   │                      └─ property() ─► RequiredValueHandler
//!   ├─ array()        ─► ArrayHandler
//!   │                      └─ element() ─► ValueHandler
//!   ├─ tagged_union() ─► TaggedUnionHandler
//!   │                      └─ option() ─► RequiredValueHandler
//!   └─ string()
//! ```
//!
//! Finishing methods take `self: Box<Self>`, so a slot can only be resolved
//! once: a [`RequiredValueHandler`] gets either `exists` or `missing`, never
//! both.
//!
//! [`StackedParser`]: crate::stacked::StackedParser
//! [`TreeEventSink`]: crate::event::TreeEventSink

use crate::location::Range;
use crate::token::{CommentToken, StringForm};

pub type BoxedValueHandler<'h> = Box<dyn ValueHandler<'h> + 'h>;
pub type BoxedRequiredValueHandler<'h> = Box<dyn RequiredValueHandler<'h> + 'h>;
pub type BoxedObjectHandler<'h> = Box<dyn ObjectHandler<'h> + 'h>;
pub type BoxedArrayHandler<'h> = Box<dyn ArrayHandler<'h> + 'h>;
pub type BoxedTaggedUnionHandler<'h> = Box<dyn TaggedUnionHandler<'h> + 'h>;

// ============================================================================
// Event data
// ============================================================================

/// Comments attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Comments written before the event, oldest first.
    pub comments: Vec<CommentToken>,
    /// A line comment on the same line, after the event.
    pub line_comment: Option<CommentToken>,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.line_comment.is_none()
    }
}

/// An opening bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenData {
    pub bracket: char,
    pub range: Range,
    pub annotation: Annotation,
}

/// A closing bracket. Synthesized closes have an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseData {
    pub bracket: char,
    pub range: Range,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringData {
    pub value: String,
    pub form: StringForm,
    pub terminated: bool,
    pub range: Range,
    pub annotation: Annotation,
}

/// A `|`, `!` or `#` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerData {
    pub range: Range,
    pub annotation: Annotation,
}

// ============================================================================
// Handler traits
// ============================================================================

/// A position where some value appears.
pub trait ValueHandler<'h> {
    fn object(self: Box<Self>, open: OpenData) -> BoxedObjectHandler<'h>;
    fn array(self: Box<Self>, open: OpenData) -> BoxedArrayHandler<'h>;
    fn tagged_union(self: Box<Self>, marker: MarkerData) -> BoxedTaggedUnionHandler<'h>;
    fn string(self: Box<Self>, string: StringData);
}

/// A slot that should hold a value: a property, a union payload, the schema
/// or the body.
pub trait RequiredValueHandler<'h> {
    fn exists(self: Box<Self>) -> BoxedValueHandler<'h>;
    fn missing(self: Box<Self>);
}

pub trait ObjectHandler<'h> {
    fn property(&mut self, key: StringData) -> BoxedRequiredValueHandler<'h>;
    fn end(self: Box<Self>, close: CloseData);
}

pub trait ArrayHandler<'h> {
    fn element(&mut self) -> BoxedValueHandler<'h>;
    fn end(self: Box<Self>, close: CloseData);
}

pub trait TaggedUnionHandler<'h> {
    fn option(&mut self, option: StringData) -> BoxedRequiredValueHandler<'h>;
    /// The union's option was never given.
    fn missing_option(&mut self);
    fn end(self: Box<Self>);
}

/// Top level of a document: optional `! schema [#]` header, then the body.
pub trait DocumentHandler<'h> {
    /// Called at `!`.
    fn schema(&mut self, _marker: MarkerData) -> BoxedRequiredValueHandler<'h> {
        Box::new(Ignore)
    }

    /// Called at `#`.
    fn compact(&mut self, _marker: MarkerData) {}

    fn body(&mut self) -> BoxedRequiredValueHandler<'h>;

    /// Called once, last. `trailing` holds comments after the final value.
    fn end(&mut self, trailing: Annotation, aborted: bool);
}

// ============================================================================
// Ignore
// ============================================================================

/// Accepts anything and discards it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ignore;

impl<'h> ValueHandler<'h> for Ignore {
    fn object(self: Box<Self>, _open: OpenData) -> BoxedObjectHandler<'h> {
        self
    }

    fn array(self: Box<Self>, _open: OpenData) -> BoxedArrayHandler<'h> {
        self
    }

    fn tagged_union(self: Box<Self>, _marker: MarkerData) -> BoxedTaggedUnionHandler<'h> {
        self
    }

    fn string(self: Box<Self>, _string: StringData) {}
}

impl<'h> RequiredValueHandler<'h> for Ignore {
    fn exists(self: Box<Self>) -> BoxedValueHandler<'h> {
        self
    }

    fn missing(self: Box<Self>) {}
}

impl<'h> ObjectHandler<'h> for Ignore {
    fn property(&mut self, _key: StringData) -> BoxedRequiredValueHandler<'h> {
        Box::new(Ignore)
    }

    fn end(self: Box<Self>, _close: CloseData) {}
}

impl<'h> ArrayHandler<'h> for Ignore {
    fn element(&mut self) -> BoxedValueHandler<'h> {
        Box::new(Ignore)
    }

    fn end(self: Box<Self>, _close: CloseData) {}
}

impl<'h> TaggedUnionHandler<'h> for Ignore {
    fn option(&mut self, _option: StringData) -> BoxedRequiredValueHandler<'h> {
        Box::new(Ignore)
    }

    fn missing_option(&mut self) {}

    fn end(self: Box<Self>) {}
}

impl<'h> DocumentHandler<'h> for Ignore {
    fn body(&mut self) -> BoxedRequiredValueHandler<'h> {
        Box::new(Ignore)
    }

    fn end(&mut self, _trailing: Annotation, _aborted: bool) {}
}
