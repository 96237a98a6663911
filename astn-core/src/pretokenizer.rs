//! Character-level state machine.
//!
//! The pre-tokenizer turns characters into [`PreToken`]s: delimiters that open
//! and close comments, strings and whitespace runs, punctuation, newlines and
//! snippets of content. It never buffers the document. When a chunk runs out
//! in the middle of a token, [`PreTokenizer::create_next_token`] returns
//! `None` and keeps its state until the next chunk arrives.
//!
//! # States
//!
//! ```text
//! Idle ──'/'──▶ pending solidus ──'/'──▶ LineComment ──CR/LF──▶ Idle
//!                               └─'*'──▶ BlockComment ──"*/"──▶ Idle
//! Idle ──quote──▶ QuotedString ──quote──▶ Idle
//! Idle ──' '/\t─▶ Whitespace ──other──▶ Idle
//! Idle ──other──▶ NonWrapped ──terminator──▶ Idle
//! ```

use std::borrow::Cow;

use memchr::{memchr, memchr2, memchr3};
use phf::phf_set;

use crate::chunk::Chunk;
use crate::error::PreTokenError;
use crate::location::{Location, LocationTracker, Range};
use crate::token::PreToken;

/// Characters that are tokens on their own.
static PUNCTUATION: phf::Set<char> = phf_set! {
    '{', '}', '(', ')', '[', ']', '<', '>', ':', ',', '|', '!', '#',
};

#[inline]
pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

#[inline]
fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

/// Characters that end a bare token.
#[inline]
fn ends_non_wrapped(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '/') || is_quote(c) || is_punctuation(c)
}

/// A character in `Idle` whose meaning depends on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    CarriageReturn,
    LineFeed,
    Solidus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    kind: PendingKind,
    /// Range of the consumed character.
    range: Range,
}

/// Escape sequence progress inside a quoted string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    /// After `\`.
    Backslash(Location),
    /// Inside `\uXXXX`.
    Unicode {
        start: Location,
        value: u32,
        digits: u8,
        high: Option<(u32, Range)>,
    },
    /// A high surrogate was decoded; a `\u` low surrogate should follow.
    AfterHigh { high: u32, range: Range },
    /// As `AfterHigh`, with the `\` of the next escape consumed.
    AfterHighBackslash {
        high: u32,
        range: Range,
        backslash: Location,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle { pending: Option<Pending> },
    LineComment,
    /// `asterisk` holds the range of a `*` that may start the closing `*/`.
    BlockComment { asterisk: Option<Range> },
    QuotedString { quote: char, escape: Escape },
    NonWrapped,
    Whitespace,
}

/// The character-level tokenizer.
#[derive(Debug, Clone)]
pub struct PreTokenizer {
    state: State,
    tracker: LocationTracker,
    /// Second token of a step that produced two.
    queued: Option<PreToken<'static>>,
}

impl PreTokenizer {
    pub fn new(tab_size: usize) -> Self {
        Self {
            state: State::Idle { pending: None },
            tracker: LocationTracker::new(tab_size),
            queued: None,
        }
    }

    /// Location of the next character to be consumed.
    #[inline]
    pub fn location(&self) -> Location {
        self.tracker.location()
    }

    /// Produce the next token from `chunk`.
    ///
    /// Returns `None` once the chunk is exhausted; any token in progress stays
    /// open and continues with the next chunk.
    pub fn create_next_token<'a, E>(
        &mut self,
        chunk: &mut Chunk<'a>,
        on_error: &mut E,
    ) -> Option<PreToken<'a>>
    where
        E: FnMut(PreTokenError, Range),
    {
        if let Some(token) = self.queued.take() {
            return Some(token);
        }
        loop {
            match self.state {
                State::Idle { pending: Some(pending) } => {
                    let c = chunk.lookahead()?;
                    self.state = State::Idle { pending: None };
                    match pending.kind {
                        PendingKind::CarriageReturn | PendingKind::LineFeed => {
                            let partner = if pending.kind == PendingKind::CarriageReturn {
                                '\n'
                            } else {
                                '\r'
                            };
                            if c == partner {
                                self.consume(chunk);
                            }
                            return Some(PreToken::NewLine {
                                range: Range::new(pending.range.start, self.location()),
                            });
                        }
                        PendingKind::Solidus => match c {
                            '/' => {
                                self.consume(chunk);
                                self.state = State::LineComment;
                                return Some(PreToken::LineCommentBegin {
                                    range: Range::new(pending.range.start, self.location()),
                                });
                            }
                            '*' => {
                                self.consume(chunk);
                                self.state = State::BlockComment { asterisk: None };
                                return Some(PreToken::BlockCommentBegin {
                                    range: Range::new(pending.range.start, self.location()),
                                });
                            }
                            _ => on_error(PreTokenError::DanglingSolidus, pending.range),
                        },
                    }
                }
                State::Idle { pending: None } => {
                    let c = chunk.lookahead()?;
                    let start = self.location();
                    match c {
                        '\r' | '\n' | '/' => {
                            self.consume(chunk);
                            let kind = match c {
                                '\r' => PendingKind::CarriageReturn,
                                '\n' => PendingKind::LineFeed,
                                _ => PendingKind::Solidus,
                            };
                            self.state = State::Idle {
                                pending: Some(Pending {
                                    kind,
                                    range: Range::new(start, self.location()),
                                }),
                            };
                        }
                        ' ' | '\t' => {
                            self.state = State::Whitespace;
                            return Some(PreToken::WhitespaceBegin { range: Range::empty(start) });
                        }
                        c if is_quote(c) => {
                            self.consume(chunk);
                            self.state = State::QuotedString { quote: c, escape: Escape::None };
                            return Some(PreToken::QuotedStringBegin {
                                quote: c,
                                range: Range::new(start, self.location()),
                            });
                        }
                        c if is_punctuation(c) => {
                            self.consume(chunk);
                            return Some(PreToken::Punctuation {
                                char: c,
                                range: Range::new(start, self.location()),
                            });
                        }
                        _ => {
                            self.state = State::NonWrapped;
                            return Some(PreToken::NonWrappedStringBegin {
                                range: Range::empty(start),
                            });
                        }
                    }
                }
                State::LineComment => {
                    let rest = chunk.remaining();
                    if rest.is_empty() {
                        return None;
                    }
                    let end = memchr2(b'\r', b'\n', rest.as_bytes()).unwrap_or(rest.len());
                    if end > 0 {
                        return Some(self.take_snippet(chunk, end));
                    }
                    self.state = State::Idle { pending: None };
                    return Some(PreToken::LineCommentEnd { range: Range::empty(self.location()) });
                }
                State::BlockComment { asterisk: Some(asterisk) } => {
                    let c = chunk.lookahead()?;
                    if c == '/' {
                        self.consume(chunk);
                        self.state = State::Idle { pending: None };
                        return Some(PreToken::BlockCommentEnd {
                            range: Range::new(asterisk.start, self.location()),
                        });
                    }
                    self.state = State::BlockComment { asterisk: None };
                    return Some(PreToken::Snippet {
                        text: Cow::Borrowed("*"),
                        range: asterisk,
                    });
                }
                State::BlockComment { asterisk: None } => {
                    let rest = chunk.remaining();
                    if rest.is_empty() {
                        return None;
                    }
                    let end = memchr(b'*', rest.as_bytes()).unwrap_or(rest.len());
                    if end > 0 {
                        return Some(self.take_snippet(chunk, end));
                    }
                    let start = self.location();
                    self.consume(chunk);
                    self.state = State::BlockComment {
                        asterisk: Some(Range::new(start, self.location())),
                    };
                }
                State::QuotedString { quote, escape } => {
                    if let Some(token) = self.quoted_string(chunk, quote, escape, on_error)? {
                        return Some(token);
                    }
                }
                State::NonWrapped => {
                    let rest = chunk.remaining();
                    if rest.is_empty() {
                        return None;
                    }
                    let end = rest.find(ends_non_wrapped).unwrap_or(rest.len());
                    if end > 0 {
                        return Some(self.take_snippet(chunk, end));
                    }
                    self.state = State::Idle { pending: None };
                    return Some(PreToken::NonWrappedStringEnd {
                        range: Range::empty(self.location()),
                    });
                }
                State::Whitespace => {
                    let rest = chunk.remaining();
                    if rest.is_empty() {
                        return None;
                    }
                    let end = rest.find(|c| c != ' ' && c != '\t').unwrap_or(rest.len());
                    if end > 0 {
                        return Some(self.take_snippet(chunk, end));
                    }
                    self.state = State::Idle { pending: None };
                    return Some(PreToken::WhitespaceEnd { range: Range::empty(self.location()) });
                }
            }
        }
    }

    /// One step inside a quoted string.
    ///
    /// Outer `None`: chunk exhausted. `Some(None)`: state changed without a
    /// token, keep going.
    fn quoted_string<'a, E>(
        &mut self,
        chunk: &mut Chunk<'a>,
        quote: char,
        escape: Escape,
        on_error: &mut E,
    ) -> Option<Option<PreToken<'a>>>
    where
        E: FnMut(PreTokenError, Range),
    {
        match escape {
            Escape::None => {
                let rest = chunk.remaining();
                if rest.is_empty() {
                    return None;
                }
                let bytes = rest.as_bytes();
                let end = if quote == '`' {
                    memchr2(quote as u8, b'\\', bytes)
                } else {
                    let stop = memchr3(quote as u8, b'\\', b'\n', bytes);
                    match (stop, memchr(b'\r', bytes)) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    }
                }
                .unwrap_or(rest.len());
                if end > 0 {
                    return Some(Some(self.take_snippet(chunk, end)));
                }
                let start = self.location();
                match self.consume(chunk)? {
                    '\\' => {
                        self.set_escape(quote, Escape::Backslash(start));
                        Some(None)
                    }
                    '\r' | '\n' => {
                        let range = Range::new(start, self.location());
                        on_error(PreTokenError::NewlineInString, range);
                        let text = &rest[..1];
                        Some(Some(PreToken::Snippet { text: Cow::Borrowed(text), range }))
                    }
                    _ => {
                        self.state = State::Idle { pending: None };
                        Some(Some(PreToken::QuotedStringEnd {
                            quote: Some(quote),
                            range: Range::new(start, self.location()),
                        }))
                    }
                }
            }
            Escape::Backslash(start) => {
                let c = self.consume(chunk)?;
                let range = Range::new(start, self.location());
                self.set_escape(quote, Escape::None);
                let decoded = match c {
                    '"' | '\\' | '/' => c,
                    '\'' => {
                        on_error(PreTokenError::NonStrictEscape(c), range);
                        c
                    }
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'u' => {
                        self.set_escape(
                            quote,
                            Escape::Unicode { start, value: 0, digits: 0, high: None },
                        );
                        return Some(None);
                    }
                    other => {
                        tracing::debug!(
                            %range,
                            escape = %other,
                            "unknown escape, substituting nothing"
                        );
                        on_error(PreTokenError::UnknownEscape(other), range);
                        return Some(None);
                    }
                };
                Some(Some(owned_snippet(decoded, range)))
            }
            Escape::Unicode { start, value, digits, high } => {
                let c = chunk.lookahead()?;
                let Some(digit) = c.to_digit(16) else {
                    let range = Range::new(start, self.location());
                    on_error(PreTokenError::ExpectedHexDigit(c), range);
                    self.set_escape(quote, Escape::None);
                    return Some(high.map(|(_, range)| self.unpaired(range, on_error)));
                };
                self.consume(chunk);
                let value = value * 16 + digit;
                if digits < 3 {
                    self.set_escape(
                        quote,
                        Escape::Unicode { start, value, digits: digits + 1, high },
                    );
                    return Some(None);
                }
                self.set_escape(quote, Escape::None);
                let range = Range::new(start, self.location());
                match high {
                    Some((high, high_range)) if (0xDC00..=0xDFFF).contains(&value) => {
                        let scalar = 0x10000 + ((high - 0xD800) << 10) + (value - 0xDC00);
                        let decoded = char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER);
                        Some(Some(owned_snippet(decoded, high_range.cover(range))))
                    }
                    Some((_, high_range)) => {
                        let replacement = self.unpaired(high_range, on_error);
                        if let Some(second) = self.decode_code_unit(quote, value, range, on_error) {
                            self.queued = Some(second);
                        }
                        Some(Some(replacement))
                    }
                    None => Some(self.decode_code_unit(quote, value, range, on_error)),
                }
            }
            Escape::AfterHigh { high, range } => {
                let c = chunk.lookahead()?;
                if c == '\\' {
                    let backslash = self.location();
                    self.consume(chunk);
                    self.set_escape(quote, Escape::AfterHighBackslash { high, range, backslash });
                    return Some(None);
                }
                self.set_escape(quote, Escape::None);
                Some(Some(self.unpaired(range, on_error)))
            }
            Escape::AfterHighBackslash { high, range, backslash } => {
                let c = chunk.lookahead()?;
                if c == 'u' {
                    self.consume(chunk);
                    self.set_escape(
                        quote,
                        Escape::Unicode {
                            start: backslash,
                            value: 0,
                            digits: 0,
                            high: Some((high, range)),
                        },
                    );
                    return Some(None);
                }
                // The backslash starts an ordinary escape.
                self.set_escape(quote, Escape::Backslash(backslash));
                Some(Some(self.unpaired(range, on_error)))
            }
        }
    }

    /// Turn a complete `\uXXXX` code unit into a snippet, or remember it as
    /// the first half of a surrogate pair.
    fn decode_code_unit<E>(
        &mut self,
        quote: char,
        value: u32,
        range: Range,
        on_error: &mut E,
    ) -> Option<PreToken<'static>>
    where
        E: FnMut(PreTokenError, Range),
    {
        match value {
            0xD800..=0xDBFF => {
                self.set_escape(quote, Escape::AfterHigh { high: value, range });
                None
            }
            0xDC00..=0xDFFF => Some(self.unpaired(range, on_error)),
            _ => {
                let decoded = char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER);
                Some(owned_snippet(decoded, range))
            }
        }
    }

    fn unpaired<E>(&mut self, range: Range, on_error: &mut E) -> PreToken<'static>
    where
        E: FnMut(PreTokenError, Range),
    {
        on_error(PreTokenError::UnpairedSurrogate, range);
        owned_snippet(char::REPLACEMENT_CHARACTER, range)
    }

    fn set_escape(&mut self, quote: char, escape: Escape) {
        self.state = State::QuotedString { quote, escape };
    }

    /// Close whatever token is still open at the end of the stream.
    ///
    /// Call repeatedly until it returns `None`. Unterminated block comments
    /// and strings are reported but still get a synthesized End token, so
    /// downstream always sees balanced Begin/End pairs.
    pub fn handle_dangling_token<E>(&mut self, on_error: &mut E) -> Option<PreToken<'static>>
    where
        E: FnMut(PreTokenError, Range),
    {
        if let Some(token) = self.queued.take() {
            return Some(token);
        }
        let at = self.location();
        let idle = State::Idle { pending: None };
        match self.state {
            State::Idle { pending: None } => None,
            State::Idle { pending: Some(pending) } => {
                self.state = idle;
                match pending.kind {
                    PendingKind::CarriageReturn | PendingKind::LineFeed => Some(PreToken::NewLine {
                        range: Range::new(pending.range.start, at),
                    }),
                    PendingKind::Solidus => {
                        on_error(PreTokenError::DanglingSolidus, pending.range);
                        None
                    }
                }
            }
            State::LineComment => {
                self.state = idle;
                Some(PreToken::LineCommentEnd { range: Range::empty(at) })
            }
            State::BlockComment { asterisk: Some(asterisk) } => {
                self.state = State::BlockComment { asterisk: None };
                Some(PreToken::Snippet {
                    text: Cow::Borrowed("*"),
                    range: asterisk,
                })
            }
            State::BlockComment { asterisk: None } => {
                on_error(PreTokenError::UnterminatedBlockComment, Range::empty(at));
                self.state = idle;
                Some(PreToken::BlockCommentEnd { range: Range::empty(at) })
            }
            State::QuotedString { quote, escape } => match escape {
                Escape::None => {
                    on_error(PreTokenError::UnterminatedString, Range::empty(at));
                    self.state = idle;
                    Some(PreToken::QuotedStringEnd {
                        quote: None,
                        range: Range::empty(at),
                    })
                }
                Escape::Backslash(start) | Escape::Unicode { start, high: None, .. } => {
                    on_error(PreTokenError::IncompleteEscape, Range::new(start, at));
                    self.set_escape(quote, Escape::None);
                    self.handle_dangling_token(on_error)
                }
                Escape::Unicode { start, high: Some((_, range)), .. } => {
                    on_error(PreTokenError::IncompleteEscape, Range::new(start, at));
                    self.set_escape(quote, Escape::None);
                    Some(self.unpaired(range, on_error))
                }
                Escape::AfterHigh { range, .. } => {
                    self.set_escape(quote, Escape::None);
                    Some(self.unpaired(range, on_error))
                }
                Escape::AfterHighBackslash { range, backslash, .. } => {
                    self.set_escape(quote, Escape::Backslash(backslash));
                    Some(self.unpaired(range, on_error))
                }
            },
            State::NonWrapped => {
                self.state = idle;
                Some(PreToken::NonWrappedStringEnd { range: Range::empty(at) })
            }
            State::Whitespace => {
                self.state = idle;
                Some(PreToken::WhitespaceEnd { range: Range::empty(at) })
            }
        }
    }

    #[inline]
    fn consume(&mut self, chunk: &mut Chunk<'_>) -> Option<char> {
        let c = chunk.next_char()?;
        self.tracker.increase(c);
        Some(c)
    }

    /// Consume `len` bytes as a borrowed snippet.
    fn take_snippet<'a>(&mut self, chunk: &mut Chunk<'a>, len: usize) -> PreToken<'a> {
        let start = self.location();
        let run = chunk.take(len);
        self.tracker.increase_str(run);
        PreToken::Snippet {
            text: Cow::Borrowed(run),
            range: Range::new(start, self.location()),
        }
    }
}

impl Default for PreTokenizer {
    fn default() -> Self {
        Self::new(crate::location::DEFAULT_TAB_SIZE)
    }
}

fn owned_snippet(c: char, range: Range) -> PreToken<'static> {
    PreToken::Snippet {
        text: Cow::Owned(c.to_string()),
        range,
    }
}
