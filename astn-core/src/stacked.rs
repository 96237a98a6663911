//! Flat events to nested handlers.
//!
//! [`StackedParser`] is a [`TreeEventSink`] that drives a [`DocumentHandler`]
//! tree. Like the tree parser it keeps an explicit frame stack, one frame per
//! open container, each holding the handler that container was given.
//!
//! ## Comment attachment
//!
//! Every semantic event is held back for one step so a same-line line comment
//! can still be attached to it:
//!
//! ```text
//! "a": 1, // trailing        -> `1` gets line_comment "trailing"
//! // leading                 -> held, attached to the next event
//! "b": 2
//! ```
//!
//! The cached event is flushed by the next semantic event, a newline, a block
//! comment, or end of input. Colons, commas and whitespace pass straight
//! through.

use std::ops::ControlFlow;

use crate::event::{TreeEvent, TreeEventSink};
use crate::handler::{
    Annotation, BoxedArrayHandler, BoxedObjectHandler, BoxedRequiredValueHandler,
    BoxedTaggedUnionHandler, BoxedValueHandler, CloseData, DocumentHandler, Ignore, MarkerData,
    OpenData, StringData,
};
use crate::location::{Location, Range};
use crate::token::{CommentKind, CommentToken, OverheadToken};
use crate::tree_parser::closing_bracket;

/// Where a tagged union is in `| option value`.
enum UnionSlot<'h> {
    ExpectingOption,
    ExpectingValue(BoxedRequiredValueHandler<'h>),
    /// The payload is an open container higher up the stack.
    ValueInProgress,
}

enum Frame<'h> {
    Object {
        open: char,
        handler: BoxedObjectHandler<'h>,
        /// Slot of the last key, until its value arrives.
        pending: Option<BoxedRequiredValueHandler<'h>>,
    },
    Array {
        open: char,
        handler: BoxedArrayHandler<'h>,
    },
    TaggedUnion {
        handler: BoxedTaggedUnionHandler<'h>,
        slot: UnionSlot<'h>,
    },
}

enum Root<'h> {
    Start,
    ExpectingSchema(BoxedRequiredValueHandler<'h>),
    SchemaInProgress,
    AfterSchema,
    BodyInProgress,
    Done,
}

pub struct StackedParser<'h, D: DocumentHandler<'h>> {
    document: D,
    root: Root<'h>,
    stack: Vec<Frame<'h>>,
    /// Event held back for a possible trailing comment, with its leading
    /// comments.
    cached: Option<(TreeEvent, Vec<CommentToken>)>,
    /// Comments waiting for the next event.
    leading: Vec<CommentToken>,
}

impl<'h, D: DocumentHandler<'h>> StackedParser<'h, D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            root: Root::Start,
            stack: Vec::with_capacity(16),
            cached: None,
            leading: Vec::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn into_inner(self) -> D {
        self.document
    }

    fn flush(&mut self, line_comment: Option<CommentToken>) {
        if let Some((event, comments)) = self.cached.take() {
            self.dispatch(event, Annotation { comments, line_comment });
        }
    }

    fn dispatch(&mut self, event: TreeEvent, annotation: Annotation) {
        match event {
            TreeEvent::String(token) => {
                let string = StringData {
                    value: token.value,
                    form: token.form,
                    terminated: token.terminated,
                    range: token.range,
                    annotation,
                };
                self.on_string(string);
            }
            TreeEvent::OpenArray { bracket, range } => {
                let handler = self.value_slot().array(OpenData {
                    bracket,
                    range,
                    annotation,
                });
                self.stack.push(Frame::Array { open: bracket, handler });
            }
            TreeEvent::OpenObject { bracket, range } => {
                let handler = self.value_slot().object(OpenData {
                    bracket,
                    range,
                    annotation,
                });
                self.stack.push(Frame::Object {
                    open: bracket,
                    handler,
                    pending: None,
                });
            }
            TreeEvent::TaggedUnion { range } => {
                let handler = self.value_slot().tagged_union(MarkerData { range, annotation });
                self.stack.push(Frame::TaggedUnion {
                    handler,
                    slot: UnionSlot::ExpectingOption,
                });
            }
            TreeEvent::CloseArray { bracket, range }
            | TreeEvent::CloseObject { bracket, range } => {
                self.on_close(CloseData {
                    bracket,
                    range,
                    annotation,
                });
            }
            TreeEvent::SchemaMarker { range } => match self.root {
                Root::Start if self.stack.is_empty() => {
                    let slot = self.document.schema(MarkerData { range, annotation });
                    self.root = Root::ExpectingSchema(slot);
                }
                _ => tracing::warn!(%range, "schema marker outside the document header ignored"),
            },
            TreeEvent::CompactMarker { range } => {
                if self.stack.is_empty() && matches!(self.root, Root::AfterSchema) {
                    self.document.compact(MarkerData { range, annotation });
                } else {
                    tracing::warn!(%range, "compact marker outside the document header ignored");
                }
            }
            TreeEvent::Colon { .. } | TreeEvent::Comma { .. } | TreeEvent::Overhead(_) => {
                unreachable!("{:?} is never cached", event)
            }
        }
    }

    fn on_string(&mut self, string: StringData) {
        match self.stack.last_mut() {
            Some(Frame::Object { handler, pending, .. }) if pending.is_none() => {
                *pending = Some(handler.property(string));
            }
            Some(Frame::TaggedUnion {
                handler,
                slot: slot @ UnionSlot::ExpectingOption,
            }) => {
                *slot = UnionSlot::ExpectingValue(handler.option(string));
            }
            _ => {
                self.value_slot().string(string);
                self.value_completed();
            }
        }
    }

    /// Handler for a value starting at the current position.
    fn value_slot(&mut self) -> BoxedValueHandler<'h> {
        match self.stack.last_mut() {
            Some(Frame::Array { handler, .. }) => handler.element(),
            Some(Frame::Object { pending, .. }) => match pending.take() {
                Some(slot) => slot.exists(),
                None => {
                    tracing::warn!("value in property key position ignored");
                    Box::new(Ignore)
                }
            },
            Some(Frame::TaggedUnion { handler, slot }) => {
                match std::mem::replace(slot, UnionSlot::ValueInProgress) {
                    UnionSlot::ExpectingValue(slot) => slot.exists(),
                    UnionSlot::ExpectingOption => {
                        handler.missing_option();
                        Box::new(Ignore)
                    }
                    UnionSlot::ValueInProgress => {
                        unreachable!("tagged union received a second value")
                    }
                }
            }
            None => match std::mem::replace(&mut self.root, Root::Done) {
                Root::ExpectingSchema(slot) => {
                    self.root = Root::SchemaInProgress;
                    slot.exists()
                }
                Root::Start | Root::AfterSchema => {
                    self.root = Root::BodyInProgress;
                    self.document.body().exists()
                }
                Root::SchemaInProgress | Root::BodyInProgress | Root::Done => {
                    tracing::warn!("value after end of document ignored");
                    Box::new(Ignore)
                }
            },
        }
    }

    /// A value finished: end every tagged union it completes.
    fn value_completed(&mut self) {
        while let Some(Frame::TaggedUnion {
            slot: UnionSlot::ValueInProgress,
            ..
        }) = self.stack.last()
        {
            if let Some(Frame::TaggedUnion { handler, .. }) = self.stack.pop() {
                handler.end();
            }
        }
        if self.stack.is_empty() {
            self.root = match std::mem::replace(&mut self.root, Root::Done) {
                Root::SchemaInProgress => Root::AfterSchema,
                Root::BodyInProgress => Root::Done,
                other => other,
            };
        }
    }

    fn on_close(&mut self, close: CloseData) {
        while let Some(Frame::TaggedUnion { .. }) = self.stack.last() {
            if let Some(frame) = self.stack.pop() {
                end_frame(frame, Range::empty(close.range.start));
            }
        }
        match self.stack.pop() {
            Some(Frame::Object { handler, pending, .. }) => {
                if let Some(slot) = pending {
                    slot.missing();
                }
                handler.end(close);
            }
            Some(Frame::Array { handler, .. }) => handler.end(close),
            Some(Frame::TaggedUnion { .. }) => unreachable!("tagged unions were unwound"),
            None => {
                tracing::warn!(range = %close.range, "close without open container ignored");
                return;
            }
        }
        self.value_completed();
    }
}

/// Finish a frame cut short by end of input or an enclosing close.
fn end_frame(frame: Frame<'_>, range: Range) {
    match frame {
        Frame::Object { open, handler, pending } => {
            if let Some(slot) = pending {
                slot.missing();
            }
            handler.end(CloseData {
                bracket: closing_bracket(open),
                range,
                annotation: Annotation::default(),
            });
        }
        Frame::Array { open, handler } => handler.end(CloseData {
            bracket: closing_bracket(open),
            range,
            annotation: Annotation::default(),
        }),
        Frame::TaggedUnion { mut handler, slot } => {
            match slot {
                UnionSlot::ExpectingOption => handler.missing_option(),
                UnionSlot::ExpectingValue(slot) => slot.missing(),
                UnionSlot::ValueInProgress => {}
            }
            handler.end();
        }
    }
}

impl<'h, D: DocumentHandler<'h>> TreeEventSink for StackedParser<'h, D> {
    fn on_event(&mut self, event: TreeEvent) -> ControlFlow<()> {
        match event {
            TreeEvent::Overhead(OverheadToken::Whitespace { .. })
            | TreeEvent::Colon { .. }
            | TreeEvent::Comma { .. } => {}
            TreeEvent::Overhead(OverheadToken::NewLine { .. }) => self.flush(None),
            TreeEvent::Overhead(OverheadToken::Comment(comment)) => match comment.kind {
                CommentKind::Line if self.cached.is_some() => self.flush(Some(comment)),
                CommentKind::Line => self.leading.push(comment),
                CommentKind::Block => {
                    self.flush(None);
                    self.leading.push(comment);
                }
            },
            event => {
                self.flush(None);
                self.cached = Some((event, std::mem::take(&mut self.leading)));
            }
        }
        ControlFlow::Continue(())
    }

    fn on_end(&mut self, aborted: bool, at: Location) {
        self.flush(None);
        tracing::trace!(depth = self.stack.len(), aborted, "unwinding handlers");
        let range = Range::empty(at);
        while let Some(frame) = self.stack.pop() {
            end_frame(frame, range);
        }
        match std::mem::replace(&mut self.root, Root::Done) {
            Root::ExpectingSchema(slot) => {
                slot.missing();
                self.document.body().missing();
            }
            Root::Start | Root::SchemaInProgress | Root::AfterSchema => {
                self.document.body().missing()
            }
            Root::BodyInProgress | Root::Done => {}
        }
        let trailing = Annotation {
            comments: std::mem::take(&mut self.leading),
            line_comment: None,
        };
        self.document.end(trailing, aborted);
    }
}
