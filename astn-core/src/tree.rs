//! Document tree built on the handler interface.
//!
//! [`Document`] stores every value in an index-based arena so nodes can point
//! at their parent without reference cycles. It is built by a
//! [`DocumentBuilder`], an ordinary [`DocumentHandler`], so the tree is
//! produced incrementally as chunks are fed.
//!
//! # Example
//!
//! ```
//! use astn_core::tree::Document;
//! use astn_core::ParserOptions;
//!
//! let text = "{ name: 'circle', radius: 2 }";
//! let (doc, diagnostics) = Document::parse(text, ParserOptions::default());
//! assert!(diagnostics.is_empty());
//!
//! let body = doc.body().unwrap();
//! assert_eq!(body.get("name").and_then(|n| n.as_str()), Some("circle"));
//! assert_eq!(body.get("radius").and_then(|n| n.scalar()).and_then(|s| s.as_integer()), Some(2));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Diagnostic, DocumentError};
use crate::handler::{
    Annotation, ArrayHandler, BoxedArrayHandler, BoxedObjectHandler, BoxedRequiredValueHandler,
    BoxedTaggedUnionHandler, BoxedValueHandler, CloseData, DocumentHandler, MarkerData,
    ObjectHandler, OpenData, RequiredValueHandler, StringData, TaggedUnionHandler, ValueHandler,
};
use crate::location::Range;
use crate::options::{DuplicateAction, DuplicateKeyPolicy, ParserOptions};
use crate::stacked::StackedParser;
use crate::streaming::StreamingParser;
use crate::token::{CommentToken, StringForm};
use crate::value::Scalar;

// ============================================================================
// Core Types
// ============================================================================

/// Index into the document's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    String {
        value: String,
        form: StringForm,
        terminated: bool,
    },
    Array(Vec<NodeId>),
    /// Properties in document order.
    Object(Vec<(String, NodeId)>),
    TaggedUnion {
        option: Option<String>,
        payload: Option<NodeId>,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
    range: Range,
    annotation: Annotation,
    /// Comments before the closing bracket.
    closing: Annotation,
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    schema: Option<NodeId>,
    body: Option<NodeId>,
    compact: bool,
    trailing: Vec<CommentToken>,
}

impl Document {
    /// Parse a complete text. Parse and document diagnostics are returned
    /// together, ordered by position.
    pub fn parse(text: &str, options: ParserOptions) -> (Document, Vec<Diagnostic>) {
        Self::parse_chunks([text], options)
    }

    pub fn parse_chunks<'s, I>(chunks: I, options: ParserOptions) -> (Document, Vec<Diagnostic>)
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut diagnostics = Vec::new();
        let stacked = StackedParser::new(DocumentBuilder::new(options.duplicate_keys));
        let stacked =
            StreamingParser::parse_chunks(chunks, stacked, options, |d| diagnostics.push(d));
        let (document, document_diagnostics) = stacked.into_inner().finish();
        diagnostics.extend(document_diagnostics);
        diagnostics.sort_by_key(|d| d.range.start.position);
        (document, diagnostics)
    }

    /// The value after `!`, if the document has a header.
    pub fn schema(&self) -> Option<Node<'_>> {
        self.schema.map(|id| Node { doc: self, id })
    }

    pub fn body(&self) -> Option<Node<'_>> {
        self.body.map(|id| Node { doc: self, id })
    }

    /// Whether the header ended with `#`.
    pub fn is_compact(&self) -> bool {
        self.compact
    }

    /// Comments after the last value.
    pub fn trailing_comments(&self) -> &[CommentToken] {
        &self.trailing
    }

    pub fn get(&self, id: NodeId) -> Option<Node<'_>> {
        if id.index() < self.nodes.len() {
            Some(Node { doc: self, id })
        } else {
            None
        }
    }

    fn node_data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

// ============================================================================
// Node (navigation handle)
// ============================================================================

/// A handle for navigating the document tree.
#[derive(Clone, Copy)]
pub struct Node<'doc> {
    doc: &'doc Document,
    id: NodeId,
}

impl<'doc> Node<'doc> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'doc NodeKind {
        &self.doc.node_data(self.id).kind
    }

    /// Source range, brackets included.
    pub fn range(&self) -> Range {
        self.doc.node_data(self.id).range
    }

    /// Comments attached to the value's first token.
    pub fn annotation(&self) -> &'doc Annotation {
        &self.doc.node_data(self.id).annotation
    }

    /// Comments attached to a container's closing bracket.
    pub fn closing_annotation(&self) -> &'doc Annotation {
        &self.doc.node_data(self.id).closing
    }

    pub fn parent(&self) -> Option<Node<'doc>> {
        self.doc.node_data(self.id).parent.map(|id| Node { doc: self.doc, id })
    }

    fn node(&self, id: NodeId) -> Node<'doc> {
        Node { doc: self.doc, id }
    }

    /// String value, whatever its form.
    pub fn as_str(&self) -> Option<&'doc str> {
        match self.kind() {
            NodeKind::String { value, .. } => Some(value),
            _ => None,
        }
    }

    /// String value classified as a scalar.
    pub fn scalar(&self) -> Option<Scalar<'doc>> {
        match self.kind() {
            NodeKind::String { value, form, .. } => Some(Scalar::classify(value, *form)),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind(), NodeKind::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind(), NodeKind::Object(_))
    }

    pub fn is_tagged_union(&self) -> bool {
        matches!(self.kind(), NodeKind::TaggedUnion { .. })
    }

    /// Number of elements or properties; zero for other nodes.
    pub fn len(&self) -> usize {
        match self.kind() {
            NodeKind::Array(elements) => elements.len(),
            NodeKind::Object(properties) => properties.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array element by position.
    pub fn index(&self, index: usize) -> Option<Node<'doc>> {
        match self.kind() {
            NodeKind::Array(elements) => elements.get(index).map(|&id| self.node(id)),
            _ => None,
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = Node<'doc>> + 'doc {
        let doc = self.doc;
        let elements: &'doc [NodeId] = match self.kind() {
            NodeKind::Array(elements) => elements,
            _ => &[],
        };
        elements.iter().map(move |&id| Node { doc, id })
    }

    /// Property value by key.
    pub fn get(&self, key: &str) -> Option<Node<'doc>> {
        match self.kind() {
            NodeKind::Object(properties) => properties
                .iter()
                .find(|(k, _)| k == key)
                .map(|&(_, id)| self.node(id)),
            _ => None,
        }
    }

    pub fn properties(&self) -> impl Iterator<Item = (&'doc str, Node<'doc>)> + 'doc {
        let doc = self.doc;
        let properties: &'doc [(String, NodeId)] = match self.kind() {
            NodeKind::Object(properties) => properties,
            _ => &[],
        };
        properties.iter().map(move |(key, id)| (key.as_str(), Node { doc, id: *id }))
    }

    /// Option name of a tagged union.
    pub fn option(&self) -> Option<&'doc str> {
        match self.kind() {
            NodeKind::TaggedUnion { option, .. } => option.as_deref(),
            _ => None,
        }
    }

    /// Payload of a tagged union.
    pub fn payload(&self) -> Option<Node<'doc>> {
        match self.kind() {
            NodeKind::TaggedUnion { payload, .. } => payload.map(|id| self.node(id)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

// ============================================================================
// DocumentBuilder (handler tree)
// ============================================================================

/// Where a finished value goes.
#[derive(Debug)]
enum Slot {
    Schema,
    Body,
    Element(NodeId),
    Property { object: NodeId, key: String, range: Range },
    Payload(NodeId),
}

#[derive(Debug, Default)]
struct Arena {
    document: Document,
    policy: DuplicateKeyPolicy,
    diagnostics: Vec<Diagnostic>,
}

impl Arena {
    fn push(&mut self, kind: NodeKind, range: Range, annotation: Annotation) -> NodeId {
        let id = NodeId::new(self.document.nodes.len());
        self.document.nodes.push(NodeData {
            parent: None,
            kind,
            range,
            annotation,
            closing: Annotation::default(),
        });
        id
    }

    fn attach(&mut self, slot: Slot, id: NodeId) {
        let nodes = &mut self.document.nodes;
        let parent = match slot {
            Slot::Schema => {
                self.document.schema = Some(id);
                None
            }
            Slot::Body => {
                self.document.body = Some(id);
                None
            }
            Slot::Element(array) => {
                if let NodeKind::Array(elements) = &mut nodes[array.index()].kind {
                    elements.push(id);
                }
                Some(array)
            }
            Slot::Property { object, key, range } => {
                let NodeKind::Object(properties) = &mut nodes[object.index()].kind else {
                    unreachable!("property slot on a non-object node");
                };
                match properties.iter().position(|(k, _)| *k == key) {
                    None => {
                        properties.push((key, id));
                        Some(object)
                    }
                    Some(existing) => {
                        tracing::debug!(
                            %range,
                            key = %key,
                            action = ?self.policy.action,
                            "duplicate key"
                        );
                        let attached = match self.policy.action {
                            DuplicateAction::Ignore => None,
                            DuplicateAction::Overwrite => {
                                properties[existing].1 = id;
                                Some(object)
                            }
                        };
                        if let Some(severity) = self.policy.severity.severity() {
                            self.diagnostics.push(Diagnostic {
                                severity,
                                kind: DocumentError::DuplicateKey(key).into(),
                                range,
                            });
                        }
                        attached
                    }
                }
            }
            Slot::Payload(union) => {
                if let NodeKind::TaggedUnion { payload, .. } = &mut nodes[union.index()].kind {
                    *payload = Some(id);
                }
                Some(union)
            }
        };
        if let Some(parent) = parent {
            self.document.nodes[id.index()].parent = Some(parent);
        }
    }

    fn close(&mut self, id: NodeId, close: CloseData) {
        let node = &mut self.document.nodes[id.index()];
        node.range = node.range.cover(close.range);
        node.closing = close.annotation;
    }
}

/// [`DocumentHandler`] that builds a [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    arena: Rc<RefCell<Arena>>,
}

impl DocumentBuilder {
    pub fn new(policy: DuplicateKeyPolicy) -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena {
                policy,
                ..Arena::default()
            })),
        }
    }

    /// The built document and the duplicate-key diagnostics.
    pub fn finish(self) -> (Document, Vec<Diagnostic>) {
        let arena = std::mem::take(&mut *self.arena.borrow_mut());
        (arena.document, arena.diagnostics)
    }

    fn slot(&self, slot: Slot) -> Box<ValueBuilder> {
        Box::new(ValueBuilder {
            arena: Rc::clone(&self.arena),
            slot,
        })
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(DuplicateKeyPolicy::default())
    }
}

impl DocumentHandler<'static> for DocumentBuilder {
    fn schema(&mut self, _marker: MarkerData) -> BoxedRequiredValueHandler<'static> {
        self.slot(Slot::Schema)
    }

    fn compact(&mut self, _marker: MarkerData) {
        self.arena.borrow_mut().document.compact = true;
    }

    fn body(&mut self) -> BoxedRequiredValueHandler<'static> {
        self.slot(Slot::Body)
    }

    fn end(&mut self, trailing: Annotation, _aborted: bool) {
        self.arena.borrow_mut().document.trailing = trailing.comments;
    }
}

/// A value position and the slot its value fills.
struct ValueBuilder {
    arena: Rc<RefCell<Arena>>,
    slot: Slot,
}

impl ValueBuilder {
    fn insert(self, kind: NodeKind, range: Range, annotation: Annotation) -> NodeBuilder {
        let id = {
            let mut arena = self.arena.borrow_mut();
            let id = arena.push(kind, range, annotation);
            arena.attach(self.slot, id);
            id
        };
        NodeBuilder { arena: self.arena, id }
    }
}

impl RequiredValueHandler<'static> for ValueBuilder {
    fn exists(self: Box<Self>) -> BoxedValueHandler<'static> {
        self
    }

    fn missing(self: Box<Self>) {}
}

impl ValueHandler<'static> for ValueBuilder {
    fn object(self: Box<Self>, open: OpenData) -> BoxedObjectHandler<'static> {
        Box::new(self.insert(NodeKind::Object(Vec::new()), open.range, open.annotation))
    }

    fn array(self: Box<Self>, open: OpenData) -> BoxedArrayHandler<'static> {
        Box::new(self.insert(NodeKind::Array(Vec::new()), open.range, open.annotation))
    }

    fn tagged_union(self: Box<Self>, marker: MarkerData) -> BoxedTaggedUnionHandler<'static> {
        let kind = NodeKind::TaggedUnion {
            option: None,
            payload: None,
        };
        Box::new(self.insert(kind, marker.range, marker.annotation))
    }

    fn string(self: Box<Self>, string: StringData) {
        let kind = NodeKind::String {
            value: string.value,
            form: string.form,
            terminated: string.terminated,
        };
        self.insert(kind, string.range, string.annotation);
    }
}

/// Handler for a container already in the arena.
struct NodeBuilder {
    arena: Rc<RefCell<Arena>>,
    id: NodeId,
}

impl NodeBuilder {
    fn slot(&self, slot: Slot) -> Box<ValueBuilder> {
        Box::new(ValueBuilder {
            arena: Rc::clone(&self.arena),
            slot,
        })
    }
}

impl ObjectHandler<'static> for NodeBuilder {
    fn property(&mut self, key: StringData) -> BoxedRequiredValueHandler<'static> {
        self.slot(Slot::Property {
            object: self.id,
            key: key.value,
            range: key.range,
        })
    }

    fn end(self: Box<Self>, close: CloseData) {
        self.arena.borrow_mut().close(self.id, close);
    }
}

impl ArrayHandler<'static> for NodeBuilder {
    fn element(&mut self) -> BoxedValueHandler<'static> {
        self.slot(Slot::Element(self.id))
    }

    fn end(self: Box<Self>, close: CloseData) {
        self.arena.borrow_mut().close(self.id, close);
    }
}

impl TaggedUnionHandler<'static> for NodeBuilder {
    fn option(&mut self, option: StringData) -> BoxedRequiredValueHandler<'static> {
        let mut arena = self.arena.borrow_mut();
        let node = &mut arena.document.nodes[self.id.index()];
        node.range = node.range.cover(option.range);
        if let NodeKind::TaggedUnion { option: name, .. } = &mut node.kind {
            *name = Some(option.value);
        }
        drop(arena);
        self.slot(Slot::Payload(self.id))
    }

    fn missing_option(&mut self) {}

    fn end(self: Box<Self>) {
        let mut arena = self.arena.borrow_mut();
        let nodes = &mut arena.document.nodes;
        let payload = match &nodes[self.id.index()].kind {
            NodeKind::TaggedUnion { payload, .. } => *payload,
            _ => None,
        };
        if let Some(payload) = payload {
            let end = nodes[payload.index()].range;
            let node = &mut nodes[self.id.index()];
            node.range = node.range.cover(end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::options::DuplicateSeverity;

    fn parse(text: &str) -> (Document, Vec<Diagnostic>) {
        Document::parse(text, ParserOptions::default())
    }

    #[test]
    fn test_navigation() {
        let (doc, diagnostics) = parse("{ \"a\": [1, 'two', { b: null }], c: | circle 5 }");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let body = doc.body().unwrap();
        assert!(body.is_object());
        assert_eq!(body.len(), 2);

        let a = body.get("a").unwrap();
        assert!(a.is_array());
        assert_eq!(a.index(0).and_then(|n| n.scalar()), Some(Scalar::Integer(1)));
        assert_eq!(a.index(1).and_then(|n| n.as_str()), Some("two"));
        let b = a.index(2).and_then(|n| n.get("b"));
        assert_eq!(b.and_then(|n| n.scalar()), Some(Scalar::Null));
        assert_eq!(a.index(2).and_then(|n| n.parent()).map(|n| n.id()), Some(a.id()));

        let c = body.get("c").unwrap();
        assert!(c.is_tagged_union());
        assert_eq!(c.option(), Some("circle"));
        assert_eq!(c.payload().and_then(|n| n.as_str()), Some("5"));

        let keys: Vec<&str> = body.properties().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_ranges() {
        let text = "[ 1, | x (y 2) ]";
        let (doc, _) = parse(text);
        let body = doc.body().unwrap();
        assert_eq!(body.range().slice(text), Some(text));
        let union = body.index(1).unwrap();
        assert_eq!(union.range().slice(text), Some("| x (y 2)"));
    }

    #[test]
    fn test_header() {
        let (doc, diagnostics) = parse("! 'shapes.astn' # <1 2>");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(doc.schema().and_then(|n| n.as_str()), Some("shapes.astn"));
        assert!(doc.is_compact());
        assert_eq!(doc.body().map(|n| n.len()), Some(2));
    }

    #[test]
    fn test_duplicate_key_default_keeps_first() {
        let (doc, diagnostics) = parse("{ a: 1, a: 2 }");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].kind.to_string(), "duplicate key \"a\"");
        let body = doc.body().unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body.get("a").and_then(|n| n.as_str()), Some("1"));
    }

    #[test]
    fn test_duplicate_key_overwrite_warning() {
        let policy =
            DuplicateKeyPolicy::new(DuplicateSeverity::Warning, DuplicateAction::Overwrite);
        let options = ParserOptions::default().with_duplicate_keys(policy);
        let (doc, diagnostics) = Document::parse("{ a: 1, a: 2 }", options);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(doc.body().and_then(|b| b.get("a")).and_then(|n| n.as_str()), Some("2"));
    }

    #[test]
    fn test_duplicate_key_silent() {
        let policy = DuplicateKeyPolicy::new(DuplicateSeverity::Silent, DuplicateAction::Ignore);
        let options = ParserOptions::default().with_duplicate_keys(policy);
        let (_, diagnostics) = Document::parse("{ a: 1, a: 2 }", options);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_comments_are_kept() {
        let (doc, _) = parse("// intro\n[\n  1 // one\n  // before close\n]\n// outro");
        let body = doc.body().unwrap();
        assert_eq!(body.annotation().comments[0].text, " intro");
        let one = body.index(0).unwrap();
        assert_eq!(one.annotation().line_comment.as_ref().map(|c| c.text.as_str()), Some(" one"));
        assert_eq!(body.closing_annotation().comments[0].text, " before close");
        assert_eq!(doc.trailing_comments()[0].text, " outro");
    }

    #[test]
    fn test_truncated_document_still_builds() {
        let (doc, diagnostics) = parse("{ a: [1, 2");
        assert_eq!(diagnostics.len(), 2);
        let a = doc.body().and_then(|b| b.get("a")).unwrap();
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_missing_values_are_absent() {
        let (doc, diagnostics) = parse("{ a: 1, b }");
        assert_eq!(diagnostics.len(), 1);
        let body = doc.body().unwrap();
        assert!(body.get("b").is_none());
        assert_eq!(body.len(), 1);

        let (doc, _) = parse("");
        assert!(doc.body().is_none());
    }

    #[test]
    fn test_chunked_parse_matches_whole() {
        let text = "{ list: [1, 2, 3], nested: (x: | y 'z') }";
        let (whole, _) = parse(text);
        let chunks: Vec<&str> = text
            .as_bytes()
            .chunks(3)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        let (split, _) = Document::parse_chunks(chunks, ParserOptions::default());
        let whole_keys: Vec<&str> = whole.body().unwrap().properties().map(|(k, _)| k).collect();
        let split_keys: Vec<&str> = split.body().unwrap().properties().map(|(k, _)| k).collect();
        assert_eq!(whole_keys, split_keys);
        let x = split
            .body()
            .and_then(|b| b.get("nested"))
            .and_then(|n| n.get("x"))
            .and_then(|n| n.payload());
        assert_eq!(x.and_then(|n| n.as_str()), Some("z"));
    }
}
