//! Structural state machine.
//!
//! The tree parser consumes semantic tokens and emits [`TreeEvent`]s. Nesting
//! is tracked on an explicit stack of [`StackContext`] frames rather than the
//! call stack, so parsing can stop between any two tokens (for instance when a
//! chunk runs out) and pick up again later.
//!
//! Errors never stop the parser. Each one is reported and followed by the
//! most neutral interpretation of the offending token.

use std::ops::ControlFlow;

use phf::phf_map;

use crate::error::{ContextKind, Diagnostic, StructureError, StyleWarning};
use crate::event::{TreeEvent, TreeEventSink};
use crate::location::{Location, Range};
use crate::token::{StringToken, Token};

/// Closing bracket matching each opening bracket.
static CLOSE_FOR: phf::Map<char, char> = phf_map! {
    '[' => ']',
    '<' => '>',
    '{' => '}',
    '(' => ')',
};

/// Counterpart of an opening bracket.
pub(crate) fn closing_bracket(open: char) -> char {
    CLOSE_FOR.get(&open).copied().unwrap_or(open)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    ExpectingKey,
    /// A key was read. `colon` records whether the optional colon was seen.
    ExpectingValue { colon: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionState {
    ExpectingOption,
    /// The option was read; the payload is next (or currently open).
    ExpectingValue,
}

/// One frame per open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackContext {
    Array { open: char },
    Object { open: char, state: ObjectState },
    TaggedUnion { state: UnionState },
}

impl StackContext {
    pub fn kind(&self) -> ContextKind {
        match self {
            Self::Array { .. } => ContextKind::Array,
            Self::Object { .. } => ContextKind::Object,
            Self::TaggedUnion { .. } => ContextKind::TaggedUnion,
        }
    }
}

/// Progress through `[! schema [#]] body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    Start,
    ExpectingSchema,
    SchemaInProgress,
    AfterSchema,
    AfterCompact,
    BodyInProgress,
    Done,
}

#[derive(Debug, Clone)]
pub struct TreeParser {
    stack: Vec<StackContext>,
    document: DocumentState,
}

impl TreeParser {
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            document: DocumentState::Start,
        }
    }

    /// Open frames, outermost first.
    pub fn stack(&self) -> &[StackContext] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn on_token<S, D>(
        &mut self,
        token: Token,
        sink: &mut S,
        on_diagnostic: &mut D,
    ) -> ControlFlow<()>
    where
        S: TreeEventSink + ?Sized,
        D: FnMut(Diagnostic),
    {
        match token {
            Token::Overhead(overhead) => sink.on_event(TreeEvent::Overhead(overhead)),
            Token::String(string) => self.on_string(string, sink, on_diagnostic),
            Token::Punctuation { char, range } => {
                self.on_punctuation(char, range, sink, on_diagnostic)
            }
        }
    }

    fn on_string<S, D>(
        &mut self,
        string: StringToken,
        sink: &mut S,
        on_diagnostic: &mut D,
    ) -> ControlFlow<()>
    where
        S: TreeEventSink + ?Sized,
        D: FnMut(Diagnostic),
    {
        match self.stack.last_mut() {
            Some(StackContext::Array { .. }) => sink.on_event(TreeEvent::String(string)),
            Some(StackContext::Object { state, .. }) => {
                *state = match *state {
                    ObjectState::ExpectingKey => ObjectState::ExpectingValue { colon: false },
                    ObjectState::ExpectingValue { .. } => ObjectState::ExpectingKey,
                };
                sink.on_event(TreeEvent::String(string))
            }
            Some(StackContext::TaggedUnion { state }) => match *state {
                UnionState::ExpectingOption => {
                    *state = UnionState::ExpectingValue;
                    sink.on_event(TreeEvent::String(string))
                }
                UnionState::ExpectingValue => {
                    sink.on_event(TreeEvent::String(string))?;
                    self.value_completed();
                    ControlFlow::Continue(())
                }
            },
            None => {
                self.root_value_start(string.range, on_diagnostic);
                sink.on_event(TreeEvent::String(string))?;
                self.value_completed();
                ControlFlow::Continue(())
            }
        }
    }

    fn on_punctuation<S, D>(
        &mut self,
        c: char,
        range: Range,
        sink: &mut S,
        on_diagnostic: &mut D,
    ) -> ControlFlow<()>
    where
        S: TreeEventSink + ?Sized,
        D: FnMut(Diagnostic),
    {
        match c {
            '[' | '<' => {
                self.before_complex_value(range, on_diagnostic);
                self.stack.push(StackContext::Array { open: c });
                sink.on_event(TreeEvent::OpenArray { bracket: c, range })
            }
            '{' | '(' => {
                self.before_complex_value(range, on_diagnostic);
                self.stack.push(StackContext::Object {
                    open: c,
                    state: ObjectState::ExpectingKey,
                });
                sink.on_event(TreeEvent::OpenObject { bracket: c, range })
            }
            ']' | '>' => self.close(ContextKind::Array, c, range, sink, on_diagnostic),
            '}' | ')' => self.close(ContextKind::Object, c, range, sink, on_diagnostic),
            ':' => {
                match self.stack.last_mut() {
                    Some(StackContext::Object {
                        state: ObjectState::ExpectingValue { colon },
                        ..
                    }) if !*colon => *colon = true,
                    _ => on_diagnostic(Diagnostic::error(StructureError::UnexpectedColon, range)),
                }
                sink.on_event(TreeEvent::Colon { range })
            }
            ',' => sink.on_event(TreeEvent::Comma { range }),
            '|' => {
                self.before_complex_value(range, on_diagnostic);
                self.stack.push(StackContext::TaggedUnion {
                    state: UnionState::ExpectingOption,
                });
                sink.on_event(TreeEvent::TaggedUnion { range })
            }
            '!' if self.stack.is_empty() && self.document == DocumentState::Start => {
                self.document = DocumentState::ExpectingSchema;
                sink.on_event(TreeEvent::SchemaMarker { range })
            }
            '#' if self.stack.is_empty() && self.document == DocumentState::AfterSchema => {
                self.document = DocumentState::AfterCompact;
                sink.on_event(TreeEvent::CompactMarker { range })
            }
            '!' | '#' => {
                on_diagnostic(Diagnostic::error(StructureError::UnexpectedHeaderMarker(c), range));
                ControlFlow::Continue(())
            }
            other => {
                on_diagnostic(Diagnostic::error(StructureError::UnknownPunctuation(other), range));
                ControlFlow::Continue(())
            }
        }
    }

    /// Bookkeeping shared by every value that opens a frame.
    fn before_complex_value<D: FnMut(Diagnostic)>(&mut self, range: Range, on_diagnostic: &mut D) {
        match self.stack.last_mut() {
            Some(StackContext::Array { .. }) => {}
            Some(StackContext::Object { state, .. }) => match *state {
                ObjectState::ExpectingKey => {
                    on_diagnostic(Diagnostic::error(StructureError::MissingPropertyKey, range));
                }
                ObjectState::ExpectingValue { .. } => *state = ObjectState::ExpectingKey,
            },
            Some(StackContext::TaggedUnion { state }) => {
                if *state == UnionState::ExpectingOption {
                    on_diagnostic(Diagnostic::error(StructureError::MissingOption, range));
                    *state = UnionState::ExpectingValue;
                }
            }
            None => self.root_value_start(range, on_diagnostic),
        }
    }

    fn root_value_start<D: FnMut(Diagnostic)>(&mut self, range: Range, on_diagnostic: &mut D) {
        self.document = match self.document {
            DocumentState::ExpectingSchema => DocumentState::SchemaInProgress,
            DocumentState::Start | DocumentState::AfterSchema | DocumentState::AfterCompact => {
                DocumentState::BodyInProgress
            }
            DocumentState::Done => {
                on_diagnostic(Diagnostic::error(StructureError::UnexpectedDataAfterEnd, range));
                DocumentState::Done
            }
            in_progress => unreachable!("root value started while {:?}", in_progress),
        };
    }

    /// A value finished: pop every tagged union it completes.
    fn value_completed(&mut self) {
        while let Some(StackContext::TaggedUnion {
            state: UnionState::ExpectingValue,
        }) = self.stack.last()
        {
            self.stack.pop();
        }
        if self.stack.is_empty() {
            self.document = match self.document {
                DocumentState::SchemaInProgress => DocumentState::AfterSchema,
                DocumentState::BodyInProgress => DocumentState::Done,
                other => other,
            };
        }
    }

    fn close<S, D>(
        &mut self,
        kind: ContextKind,
        c: char,
        range: Range,
        sink: &mut S,
        on_diagnostic: &mut D,
    ) -> ControlFlow<()>
    where
        S: TreeEventSink + ?Sized,
        D: FnMut(Diagnostic),
    {
        // Tagged unions on top are cut short by the close; the frame below
        // them must be the container being closed.
        let target = self
            .stack
            .iter()
            .rposition(|frame| !matches!(frame, StackContext::TaggedUnion { .. }));
        let Some(target) = target.filter(|&i| self.stack[i].kind() == kind) else {
            tracing::debug!(%range, bracket = %c, "dropping unmatched closing bracket");
            on_diagnostic(Diagnostic::error(StructureError::UnmatchedClose(c), range));
            return ControlFlow::Continue(());
        };
        if let Some(StackContext::TaggedUnion { state }) = self.stack.last() {
            let error = match state {
                UnionState::ExpectingOption => StructureError::MissingOption,
                UnionState::ExpectingValue => StructureError::MissingTaggedUnionValue,
            };
            tracing::debug!(%range, %error, "closing bracket ends an incomplete tagged union");
            on_diagnostic(Diagnostic::error(error, range));
            self.stack.truncate(target + 1);
        }

        match self.stack.pop() {
            Some(StackContext::Array { open }) => {
                self.check_bracket_style(open, c, range, on_diagnostic);
                sink.on_event(TreeEvent::CloseArray { bracket: c, range })?;
            }
            Some(StackContext::Object { open, state }) => {
                if let ObjectState::ExpectingValue { .. } = state {
                    on_diagnostic(Diagnostic::error(StructureError::MissingPropertyValue, range));
                }
                self.check_bracket_style(open, c, range, on_diagnostic);
                sink.on_event(TreeEvent::CloseObject { bracket: c, range })?;
            }
            other => unreachable!("close target was {:?}", other),
        }
        self.value_completed();
        ControlFlow::Continue(())
    }

    fn check_bracket_style<D: FnMut(Diagnostic)>(
        &self,
        open: char,
        close: char,
        range: Range,
        on_diagnostic: &mut D,
    ) {
        if closing_bracket(open) != close {
            let warning = StyleWarning::MismatchedBracket { open, close };
            on_diagnostic(Diagnostic::warning(warning, range));
        }
    }

    /// End of input or abort: unwind every open frame.
    ///
    /// On a normal end each open frame is reported and containers get a
    /// synthesized close event, so consumers always see a balanced stream.
    /// After an abort no further events are emitted. Either way the sink's
    /// `on_end` is called last.
    pub fn force_end<S, D>(
        &mut self,
        aborted: bool,
        at: Location,
        sink: &mut S,
        on_diagnostic: &mut D,
    ) where
        S: TreeEventSink + ?Sized,
        D: FnMut(Diagnostic),
    {
        tracing::trace!(depth = self.stack.len(), aborted, "forced end of tree");
        let mut aborted = aborted;
        let range = Range::empty(at);
        while let Some(frame) = self.stack.pop() {
            if aborted {
                continue;
            }
            on_diagnostic(Diagnostic::error(
                StructureError::UnexpectedEndOfDocument(frame.kind()),
                range,
            ));
            let event = match frame {
                StackContext::Array { open } => TreeEvent::CloseArray {
                    bracket: closing_bracket(open),
                    range,
                },
                StackContext::Object { open, .. } => TreeEvent::CloseObject {
                    bracket: closing_bracket(open),
                    range,
                },
                StackContext::TaggedUnion { .. } => continue,
            };
            if sink.on_event(event).is_break() {
                aborted = true;
            }
        }
        if !aborted {
            match self.document {
                DocumentState::Start
                | DocumentState::SchemaInProgress
                | DocumentState::AfterSchema
                | DocumentState::AfterCompact => {
                    on_diagnostic(Diagnostic::error(StructureError::MissingBody, range));
                }
                DocumentState::ExpectingSchema => {
                    on_diagnostic(Diagnostic::error(StructureError::MissingSchema, range));
                    on_diagnostic(Diagnostic::error(StructureError::MissingBody, range));
                }
                DocumentState::BodyInProgress | DocumentState::Done => {}
            }
        }
        sink.on_end(aborted, at);
    }
}

impl Default for TreeParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamingParser;

    fn parse(input: &str) -> (Vec<TreeEvent>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let events = StreamingParser::parse_str(input, Vec::new(), |d| diagnostics.push(d));
        (events, diagnostics)
    }

    fn structure(events: &[TreeEvent]) -> Vec<String> {
        events
            .iter()
            .filter(|e| !e.is_overhead())
            .map(|e| match e {
                TreeEvent::String(s) => format!("String({})", s.value),
                TreeEvent::OpenArray { bracket, .. } => format!("OpenArray({})", bracket),
                TreeEvent::CloseArray { bracket, .. } => format!("CloseArray({})", bracket),
                TreeEvent::OpenObject { bracket, .. } => format!("OpenObject({})", bracket),
                TreeEvent::CloseObject { bracket, .. } => format!("CloseObject({})", bracket),
                TreeEvent::Colon { .. } => "Colon".to_string(),
                TreeEvent::Comma { .. } => "Comma".to_string(),
                TreeEvent::TaggedUnion { .. } => "TaggedUnion".to_string(),
                TreeEvent::SchemaMarker { .. } => "SchemaMarker".to_string(),
                TreeEvent::CompactMarker { .. } => "CompactMarker".to_string(),
                TreeEvent::Overhead(_) => unreachable!(),
            })
            .collect()
    }

    fn errors(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.kind.to_string()).collect()
    }

    #[test]
    fn test_stack_tracks_nesting() {
        let mut parser = TreeParser::new();
        let mut sink = Vec::new();
        let mut on_diagnostic = |_: Diagnostic| {};
        let at = Range::empty(Location::START);
        for char in ['{', '|'] {
            let token = Token::Punctuation { char, range: at };
            let _ = parser.on_token(token, &mut sink, &mut on_diagnostic);
        }
        assert_eq!(
            parser.stack(),
            &[
                StackContext::Object {
                    open: '{',
                    state: ObjectState::ExpectingKey,
                },
                StackContext::TaggedUnion {
                    state: UnionState::ExpectingOption,
                },
            ]
        );
    }

    #[test]
    fn test_colon_is_optional() {
        let (events, diagnostics) = parse("( a 1 b 2 )");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            structure(&events),
            vec![
                "OpenObject(()",
                "String(a)",
                "String(1)",
                "String(b)",
                "String(2)",
                "CloseObject())"
            ]
        );
    }

    #[test]
    fn test_double_colon() {
        let (_, diagnostics) = parse("{a::1}");
        assert_eq!(errors(&diagnostics), vec!["unexpected colon"]);
    }

    #[test]
    fn test_missing_property_value() {
        let (events, diagnostics) = parse("{\"a\":}");
        assert_eq!(errors(&diagnostics), vec!["missing property value"]);
        assert_eq!(structure(&events).last().map(String::as_str), Some("CloseObject(})"));
    }

    #[test]
    fn test_container_in_key_position() {
        let (_, diagnostics) = parse("{[1] a: 2}");
        assert_eq!(errors(&diagnostics), vec!["missing property key"]);
    }

    #[test]
    fn test_unmatched_close_is_dropped() {
        let (events, diagnostics) = parse("[1]]");
        assert_eq!(errors(&diagnostics), vec!["unmatched ']'"]);
        assert_eq!(structure(&events), vec!["OpenArray([)", "String(1)", "CloseArray(])"]);
    }

    #[test]
    fn test_close_ends_incomplete_union() {
        let (events, diagnostics) = parse("[ | ]");
        assert_eq!(errors(&diagnostics), vec!["missing tagged union option"]);
        assert_eq!(structure(&events), vec!["OpenArray([)", "TaggedUnion", "CloseArray(])"]);

        let (_, diagnostics) = parse("[ | 'a' ]");
        assert_eq!(errors(&diagnostics), vec!["missing tagged union value"]);
    }

    #[test]
    fn test_nested_union_completion() {
        let (events, diagnostics) = parse("| 'a' | 'b' [1]");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            structure(&events),
            vec![
                "TaggedUnion",
                "String(a)",
                "TaggedUnion",
                "String(b)",
                "OpenArray([)",
                "String(1)",
                "CloseArray(])",
            ]
        );
    }

    #[test]
    fn test_header() {
        let (events, diagnostics) = parse("! 'schema.astn' # { }");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            structure(&events),
            vec![
                "SchemaMarker",
                "String(schema.astn)",
                "CompactMarker",
                "OpenObject({)",
                "CloseObject(})",
            ]
        );
    }

    #[test]
    fn test_misplaced_header_markers() {
        let (_, diagnostics) = parse("[ ! ] #");
        assert_eq!(
            errors(&diagnostics),
            vec![
                "unexpected '!', a header is only allowed at the start of the document",
                "unexpected '#', a header is only allowed at the start of the document",
            ]
        );
    }

    #[test]
    fn test_missing_schema_and_body() {
        let (_, diagnostics) = parse("!");
        assert_eq!(errors(&diagnostics), vec!["missing schema", "missing document body"]);
        let (_, diagnostics) = parse("");
        assert_eq!(errors(&diagnostics), vec!["missing document body"]);
    }

    #[test]
    fn test_data_after_body() {
        let (_, diagnostics) = parse("1 2");
        assert_eq!(errors(&diagnostics), vec!["unexpected data after end of document"]);
    }

    #[test]
    fn test_forced_end_unwinds_every_frame() {
        let (events, diagnostics) = parse("{ a: [ | 'x' (");
        assert_eq!(
            errors(&diagnostics),
            vec![
                "unexpected end of document, still in object",
                "unexpected end of document, still in tagged union",
                "unexpected end of document, still in array",
                "unexpected end of document, still in object",
            ]
        );
        let structure = structure(&events);
        assert_eq!(
            &structure[structure.len() - 3..],
            &["CloseObject())", "CloseArray(])", "CloseObject(})"]
        );
    }
}
