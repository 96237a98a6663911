//! Chunk-fed drivers for the pipeline.
//!
//! ```text
//! feed(chunk) ─► PreTokenizer ─► Tokenizer ─► TreeParser ─► TreeEventSink
//!                └────────── Lexer ─────────┘
//! ```
//!
//! Input arrives in chunks of any size. When a chunk runs out in the middle
//! of a token, every stage keeps its state and the next [`feed`] carries on;
//! the document is never buffered as a whole.
//!
//! Aborting: a sink returning `ControlFlow::Break` stops the parse. `feed`
//! then returns `Break` without reading further input, and [`finish`] ends
//! the stream with `on_end(aborted = true, ..)`.
//!
//! [`feed`]: StreamingParser::feed
//! [`finish`]: StreamingParser::finish

use std::ops::ControlFlow;

use crate::chunk::Chunk;
use crate::error::{Diagnostic, PreTokenError};
use crate::event::TreeEventSink;
use crate::location::{Location, Range};
use crate::options::ParserOptions;
use crate::pretokenizer::PreTokenizer;
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use crate::tree_parser::TreeParser;

// ============================================================================
// Lexer
// ============================================================================

/// Pre-tokenizer and tokenizer combined: chunks in, semantic tokens out.
#[derive(Debug, Clone)]
pub struct Lexer {
    pretokenizer: PreTokenizer,
    tokenizer: Tokenizer,
}

impl Lexer {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            pretokenizer: PreTokenizer::new(options.tab_size),
            tokenizer: Tokenizer::new(),
        }
    }

    /// Location of the next character to be read.
    #[inline]
    pub fn location(&self) -> Location {
        self.pretokenizer.location()
    }

    /// Next complete token from `chunk`, or `None` once the chunk is used up.
    pub fn next_token<D>(&mut self, chunk: &mut Chunk<'_>, on_diagnostic: &mut D) -> Option<Token>
    where
        D: FnMut(Diagnostic),
    {
        let mut on_error =
            |error: PreTokenError, range: Range| on_diagnostic(Diagnostic::lexical(error, range));
        while let Some(pretoken) = self.pretokenizer.create_next_token(chunk, &mut on_error) {
            if let Some(token) = self.tokenizer.on_pretoken(pretoken) {
                return Some(token);
            }
        }
        None
    }

    /// After the last chunk: the tokens still open, closed. Call until `None`.
    pub fn next_dangling_token<D>(&mut self, on_diagnostic: &mut D) -> Option<Token>
    where
        D: FnMut(Diagnostic),
    {
        let mut on_error =
            |error: PreTokenError, range: Range| on_diagnostic(Diagnostic::lexical(error, range));
        while let Some(pretoken) = self.pretokenizer.handle_dangling_token(&mut on_error) {
            if let Some(token) = self.tokenizer.on_pretoken(pretoken) {
                return Some(token);
            }
        }
        None
    }

    /// Tokenize a whole input given as a sequence of chunks.
    pub fn tokenize<'s, I, D>(chunks: I, options: ParserOptions, mut on_diagnostic: D) -> Vec<Token>
    where
        I: IntoIterator<Item = &'s str>,
        D: FnMut(Diagnostic),
    {
        let mut lexer = Self::new(options);
        let mut tokens = Vec::new();
        for text in chunks {
            let mut chunk = Chunk::new(text);
            while let Some(token) = lexer.next_token(&mut chunk, &mut on_diagnostic) {
                tokens.push(token);
            }
        }
        while let Some(token) = lexer.next_dangling_token(&mut on_diagnostic) {
            tokens.push(token);
        }
        tokens
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

// ============================================================================
// StreamingParser
// ============================================================================

/// The full pipeline, delivering [`TreeEvent`](crate::event::TreeEvent)s to a
/// sink.
///
/// ```
/// use astn_core::{StreamingParser, ParserOptions, TreeEvent};
///
/// let mut diagnostics = Vec::new();
/// let mut parser = StreamingParser::new(Vec::new(), ParserOptions::default());
/// let _ = parser.feed("{\"a\": [1, ", &mut |d| diagnostics.push(d));
/// let _ = parser.feed("2]}", &mut |d| diagnostics.push(d));
/// let events: Vec<TreeEvent> = parser.finish(&mut |d| diagnostics.push(d));
///
/// assert!(diagnostics.is_empty());
/// assert!(matches!(events.last(), Some(TreeEvent::CloseObject { bracket: '}', .. })));
/// ```
#[derive(Debug)]
pub struct StreamingParser<S: TreeEventSink> {
    lexer: Lexer,
    tree: TreeParser,
    sink: S,
    aborted: bool,
}

impl<S: TreeEventSink> StreamingParser<S> {
    pub fn new(sink: S, options: ParserOptions) -> Self {
        Self {
            lexer: Lexer::new(options),
            tree: TreeParser::new(),
            sink,
            aborted: false,
        }
    }

    /// Parse a complete document in one call.
    pub fn parse_str<D>(text: &str, sink: S, on_diagnostic: D) -> S
    where
        D: FnMut(Diagnostic),
    {
        Self::parse_chunks([text], sink, ParserOptions::default(), on_diagnostic)
    }

    /// Parse a complete document delivered as a sequence of chunks.
    pub fn parse_chunks<'s, I, D>(
        chunks: I,
        sink: S,
        options: ParserOptions,
        mut on_diagnostic: D,
    ) -> S
    where
        I: IntoIterator<Item = &'s str>,
        D: FnMut(Diagnostic),
    {
        let mut parser = Self::new(sink, options);
        for text in chunks {
            if parser.feed(text, &mut on_diagnostic).is_break() {
                break;
            }
        }
        parser.finish(&mut on_diagnostic)
    }

    /// Process one chunk.
    pub fn feed<D>(&mut self, text: &str, on_diagnostic: &mut D) -> ControlFlow<()>
    where
        D: FnMut(Diagnostic),
    {
        if self.aborted {
            return ControlFlow::Break(());
        }
        tracing::trace!(len = text.len(), at = %self.lexer.location(), "feeding chunk");
        let mut chunk = Chunk::new(text);
        while let Some(token) = self.lexer.next_token(&mut chunk, on_diagnostic) {
            if self.tree.on_token(token, &mut self.sink, on_diagnostic).is_break() {
                tracing::debug!(at = %self.lexer.location(), "sink aborted the parse");
                self.aborted = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// End of input: close dangling tokens, unwind the tree and return the
    /// sink.
    pub fn finish<D>(mut self, on_diagnostic: &mut D) -> S
    where
        D: FnMut(Diagnostic),
    {
        if !self.aborted {
            while let Some(token) = self.lexer.next_dangling_token(on_diagnostic) {
                if self.tree.on_token(token, &mut self.sink, on_diagnostic).is_break() {
                    self.aborted = true;
                    break;
                }
            }
        }
        let at = self.lexer.location();
        self.tree.force_end(self.aborted, at, &mut self.sink, on_diagnostic);
        self.sink
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.lexer.location()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
