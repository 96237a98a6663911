//! Assembles pre-tokens into semantic tokens.
//!
//! Every Begin, Snippet..., End sequence from the [`PreTokenizer`] becomes one
//! [`Token`] with its full value and outer range. Snippets may come from many
//! chunks; their text is appended as it arrives.
//!
//! The tokenizer also tracks indentation: the whitespace between a line start
//! and the first non-whitespace token on that line. When that token is a
//! comment, the indentation is attached to it so a block comment's margin can
//! be stripped later.
//!
//! [`PreTokenizer`]: crate::pretokenizer::PreTokenizer

use crate::location::Range;
use crate::token::{
    CommentKind, CommentToken, OverheadToken, PreToken, StringForm, StringToken, Token,
};

/// A token whose Begin has been seen but not its End.
#[derive(Debug, Clone)]
enum Partial {
    Comment { kind: CommentKind, start: Range, text: String },
    Whitespace { start: Range, text: String },
    String { form: StringForm, start: Range, text: String },
}

/// Where the current line is with respect to indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Indentation {
    /// Only whitespace seen since the line started; holds that whitespace.
    LineStart(String),
    /// Something else is already on this line.
    Inline,
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current: Option<Partial>,
    indentation: Indentation,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current: None,
            indentation: Indentation::LineStart(String::new()),
        }
    }

    /// Feed one pre-token; returns a token when one is complete.
    ///
    /// # Panics
    ///
    /// On an End without matching Begin, a Snippet outside any token, or a
    /// Begin inside another token. These can only come from a defective
    /// pre-tokenizer.
    pub fn on_pretoken(&mut self, pretoken: PreToken<'_>) -> Option<Token> {
        match pretoken {
            PreToken::Snippet { text, range } => {
                match &mut self.current {
                    Some(
                        Partial::Comment { text: buf, .. }
                        | Partial::Whitespace { text: buf, .. }
                        | Partial::String { text: buf, .. },
                    ) => buf.push_str(&text),
                    None => panic!("snippet outside of any token at {}", range),
                }
                None
            }
            PreToken::LineCommentBegin { range } => {
                self.begin(Partial::Comment {
                    kind: CommentKind::Line,
                    start: range,
                    text: String::new(),
                });
                None
            }
            PreToken::BlockCommentBegin { range } => {
                self.begin(Partial::Comment {
                    kind: CommentKind::Block,
                    start: range,
                    text: String::new(),
                });
                None
            }
            PreToken::WhitespaceBegin { range } => {
                self.begin(Partial::Whitespace { start: range, text: String::new() });
                None
            }
            PreToken::QuotedStringBegin { quote, range } => {
                let form = StringForm::from_quote(quote)
                    .unwrap_or_else(|| panic!("unknown quote character {:?} at {}", quote, range));
                self.begin(Partial::String { form, start: range, text: String::new() });
                None
            }
            PreToken::NonWrappedStringBegin { range } => {
                self.begin(Partial::String {
                    form: StringForm::NonWrapped,
                    start: range,
                    text: String::new(),
                });
                None
            }
            PreToken::LineCommentEnd { range } | PreToken::BlockCommentEnd { range } => {
                let Some(Partial::Comment { kind, start, text }) = self.current.take() else {
                    panic!("comment end without begin at {}", range);
                };
                let indentation = std::mem::replace(&mut self.indentation, Indentation::Inline);
                let indentation = match indentation {
                    Indentation::LineStart(ws) => Some(ws),
                    Indentation::Inline => None,
                };
                Some(Token::Overhead(OverheadToken::Comment(CommentToken {
                    kind,
                    text,
                    range: start.cover(range),
                    indentation,
                })))
            }
            PreToken::WhitespaceEnd { range } => {
                let Some(Partial::Whitespace { start, text }) = self.current.take() else {
                    panic!("whitespace end without begin at {}", range);
                };
                if let Indentation::LineStart(ws) = &mut self.indentation {
                    ws.push_str(&text);
                }
                Some(Token::Overhead(OverheadToken::Whitespace {
                    value: text,
                    range: start.cover(range),
                }))
            }
            PreToken::QuotedStringEnd { quote, range } => {
                let Some(Partial::String { form, start, text }) = self.current.take() else {
                    panic!("string end without begin at {}", range);
                };
                self.indentation = Indentation::Inline;
                Some(Token::String(StringToken {
                    value: text,
                    form,
                    terminated: quote.is_some(),
                    range: start.cover(range),
                }))
            }
            PreToken::NonWrappedStringEnd { range } => {
                let Some(Partial::String {
                    form: StringForm::NonWrapped,
                    start,
                    text,
                }) = self.current.take()
                else {
                    panic!("bare token end without begin at {}", range);
                };
                self.indentation = Indentation::Inline;
                Some(Token::String(StringToken {
                    value: text,
                    form: StringForm::NonWrapped,
                    terminated: true,
                    range: start.cover(range),
                }))
            }
            PreToken::NewLine { range } => {
                self.assert_idle(range);
                self.indentation = Indentation::LineStart(String::new());
                Some(Token::Overhead(OverheadToken::NewLine { range }))
            }
            PreToken::Punctuation { char, range } => {
                self.assert_idle(range);
                self.indentation = Indentation::Inline;
                Some(Token::Punctuation { char, range })
            }
        }
    }

    fn begin(&mut self, partial: Partial) {
        if let Some(open) = &self.current {
            panic!("token begins inside open token {:?}", open);
        }
        self.current = Some(partial);
    }

    fn assert_idle(&self, range: Range) {
        if let Some(open) = &self.current {
            panic!("standalone token at {} inside open token {:?}", range, open);
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
