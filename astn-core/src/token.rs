//! Token types produced by the two lexer stages.
//!
//! [`PreToken`] is what the character-level state machine emits: delimiters,
//! punctuation and [`Snippet`](PreToken::Snippet)s of content. Snippets borrow
//! from the chunk they were found in, so nothing is copied until the
//! tokenizer assembles them into a semantic [`Token`].

use std::borrow::Cow;

use crate::location::Range;

/// How a string value was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringForm {
    /// `"value"`
    Quoted,
    /// `'value'`
    Apostrophed,
    /// `` `value` ``, may span lines.
    Multiline,
    /// Bare token: numbers, `true`, `null`, identifiers.
    NonWrapped,
}

impl StringForm {
    /// The form a quote character opens.
    pub fn from_quote(quote: char) -> Option<Self> {
        match quote {
            '"' => Some(Self::Quoted),
            '\'' => Some(Self::Apostrophed),
            '`' => Some(Self::Multiline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// text`
    Line,
    /// `/* text */`
    Block,
}

/// Low-level token. The lifetime is that of the chunk being processed.
#[derive(Debug, Clone, PartialEq)]
pub enum PreToken<'a> {
    BlockCommentBegin { range: Range },
    BlockCommentEnd { range: Range },
    LineCommentBegin { range: Range },
    LineCommentEnd { range: Range },
    NewLine { range: Range },
    WhitespaceBegin { range: Range },
    WhitespaceEnd { range: Range },
    QuotedStringBegin { quote: char, range: Range },
    /// `quote` is `None` when the string was unterminated.
    QuotedStringEnd { quote: Option<char>, range: Range },
    NonWrappedStringBegin { range: Range },
    NonWrappedStringEnd { range: Range },
    Punctuation { char: char, range: Range },
    /// Content between a Begin and its End. Plain runs borrow from the chunk;
    /// decoded escape sequences are owned.
    Snippet { text: Cow<'a, str>, range: Range },
}

impl PreToken<'_> {
    pub fn range(&self) -> Range {
        match self {
            Self::BlockCommentBegin { range }
            | Self::BlockCommentEnd { range }
            | Self::LineCommentBegin { range }
            | Self::LineCommentEnd { range }
            | Self::NewLine { range }
            | Self::WhitespaceBegin { range }
            | Self::WhitespaceEnd { range }
            | Self::QuotedStringBegin { range, .. }
            | Self::QuotedStringEnd { range, .. }
            | Self::NonWrappedStringBegin { range }
            | Self::NonWrappedStringEnd { range }
            | Self::Punctuation { range, .. }
            | Self::Snippet { range, .. } => *range,
        }
    }

    /// Detach from the chunk buffer.
    pub fn into_owned(self) -> PreToken<'static> {
        match self {
            Self::Snippet { text, range } => PreToken::Snippet {
                text: Cow::Owned(text.into_owned()),
                range,
            },
            Self::BlockCommentBegin { range } => PreToken::BlockCommentBegin { range },
            Self::BlockCommentEnd { range } => PreToken::BlockCommentEnd { range },
            Self::LineCommentBegin { range } => PreToken::LineCommentBegin { range },
            Self::LineCommentEnd { range } => PreToken::LineCommentEnd { range },
            Self::NewLine { range } => PreToken::NewLine { range },
            Self::WhitespaceBegin { range } => PreToken::WhitespaceBegin { range },
            Self::WhitespaceEnd { range } => PreToken::WhitespaceEnd { range },
            Self::QuotedStringBegin { quote, range } => {
                PreToken::QuotedStringBegin { quote, range }
            }
            Self::QuotedStringEnd { quote, range } => PreToken::QuotedStringEnd { quote, range },
            Self::NonWrappedStringBegin { range } => PreToken::NonWrappedStringBegin { range },
            Self::NonWrappedStringEnd { range } => PreToken::NonWrappedStringEnd { range },
            Self::Punctuation { char, range } => PreToken::Punctuation { char, range },
        }
    }
}

/// A complete comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentToken {
    pub kind: CommentKind,
    /// Text between the delimiters.
    pub text: String,
    /// Outer range, delimiters included.
    pub range: Range,
    /// Whitespace between the start of the line and the comment, when the
    /// comment is the first thing on its line.
    pub indentation: Option<String>,
}

impl CommentToken {
    /// Block comment text with the comment's own indentation removed from
    /// every continuation line.
    pub fn unindented_text(&self) -> Cow<'_, str> {
        let Some(indentation) = self.indentation.as_deref().filter(|i| !i.is_empty()) else {
            return Cow::Borrowed(&self.text);
        };
        if !self.text.contains('\n') {
            return Cow::Borrowed(&self.text);
        }
        let mut out = String::with_capacity(self.text.len());
        for (i, line) in self.text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
                out.push_str(line.strip_prefix(indentation).unwrap_or(line));
            } else {
                out.push_str(line);
            }
        }
        Cow::Owned(out)
    }
}

/// Tokens that do not affect structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverheadToken {
    Comment(CommentToken),
    NewLine { range: Range },
    Whitespace { value: String, range: Range },
}

impl OverheadToken {
    pub fn range(&self) -> Range {
        match self {
            Self::Comment(comment) => comment.range,
            Self::NewLine { range } | Self::Whitespace { range, .. } => *range,
        }
    }
}

/// A complete string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToken {
    /// Decoded value (escapes resolved, quotes removed).
    pub value: String,
    pub form: StringForm,
    /// False when input ended before the closing quote.
    pub terminated: bool,
    /// Outer range, quotes included.
    pub range: Range,
}

/// Semantic token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Overhead(OverheadToken),
    Punctuation { char: char, range: Range },
    String(StringToken),
}

impl Token {
    pub fn range(&self) -> Range {
        match self {
            Self::Overhead(overhead) => overhead.range(),
            Self::Punctuation { range, .. } => *range,
            Self::String(string) => string.range,
        }
    }
}
