//! Diagnostics reported while parsing.
//!
//! Nothing in the pipeline fails on a document problem. Each stage reports a
//! [`Diagnostic`] to a caller-supplied callback, substitutes the most neutral
//! interpretation and carries on, so one pass collects every problem.
//!
//! Internal consistency violations (an End token without a Begin, popping an
//! empty stack) are bugs in an upstream stage and panic instead.

use std::fmt;

use thiserror::Error;

use crate::location::Range;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Recoverable style deviation.
    Warning,
    /// Semantic violation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Lexical problems found by the pre-tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreTokenError {
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("dangling solidus")]
    DanglingSolidus,
    #[error("unknown escape character '{0}'")]
    UnknownEscape(char),
    #[error("expected hexadecimal digit, found '{0}'")]
    ExpectedHexDigit(char),
    #[error("incomplete escape sequence")]
    IncompleteEscape,
    #[error("unpaired surrogate in unicode escape")]
    UnpairedSurrogate,
    #[error("unescaped newline in string")]
    NewlineInString,
    #[error("non-strict escape '\\{0}'")]
    NonStrictEscape(char),
}

impl PreTokenError {
    /// Escapes JSON does not allow are decoded anyway and only warned about.
    pub fn severity(&self) -> Severity {
        match self {
            Self::NonStrictEscape(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// The kind of frame still open when the document ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Array,
    Object,
    TaggedUnion,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Array => "array",
            Self::Object => "object",
            Self::TaggedUnion => "tagged union",
        })
    }
}

/// Structural problems found by the tree parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("unexpected end of document, still in {0}")]
    UnexpectedEndOfDocument(ContextKind),
    #[error("unknown punctuation '{0}'")]
    UnknownPunctuation(char),
    #[error("unmatched '{0}'")]
    UnmatchedClose(char),
    #[error("missing property value")]
    MissingPropertyValue,
    #[error("missing property key")]
    MissingPropertyKey,
    #[error("missing tagged union option")]
    MissingOption,
    #[error("missing tagged union value")]
    MissingTaggedUnionValue,
    #[error("unexpected colon")]
    UnexpectedColon,
    #[error("unexpected '{0}', a header is only allowed at the start of the document")]
    UnexpectedHeaderMarker(char),
    #[error("missing schema")]
    MissingSchema,
    #[error("missing document body")]
    MissingBody,
    #[error("unexpected data after end of document")]
    UnexpectedDataAfterEnd,
}

/// Style deviations found by the tree parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StyleWarning {
    #[error("'{open}' closed with '{close}'")]
    MismatchedBracket { open: char, close: char },
}

/// Problems found while building a [`Document`](crate::tree::Document).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("duplicate key \"{0}\"")]
    DuplicateKey(String),
}

/// Any diagnostic code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error(transparent)]
    Lexical(#[from] PreTokenError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Style(#[from] StyleWarning),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A located diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{severity} at {range}: {kind}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub range: Range,
}

impl Diagnostic {
    pub fn error(kind: impl Into<DiagnosticKind>, range: Range) -> Self {
        Self {
            severity: Severity::Error,
            kind: kind.into(),
            range,
        }
    }

    pub fn warning(kind: impl Into<DiagnosticKind>, range: Range) -> Self {
        Self {
            severity: Severity::Warning,
            kind: kind.into(),
            range,
        }
    }

    /// A pre-tokenizer diagnostic at the severity its code carries.
    pub fn lexical(error: PreTokenError, range: Range) -> Self {
        Self {
            severity: error.severity(),
            kind: error.into(),
            range,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    #[test]
    fn test_messages() {
        assert_eq!(
            StructureError::UnexpectedEndOfDocument(ContextKind::Object).to_string(),
            "unexpected end of document, still in object"
        );
        assert_eq!(
            PreTokenError::UnterminatedBlockComment.to_string(),
            "unterminated block comment"
        );
        assert_eq!(
            StyleWarning::MismatchedBracket { open: '[', close: '>' }.to_string(),
            "'[' closed with '>'"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic =
            Diagnostic::error(PreTokenError::DanglingSolidus, Range::empty(Location::START));
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.to_string(), "error at 1:1-1:1: dangling solidus");
    }

    #[test]
    fn test_lexical_severity() {
        let range = Range::empty(Location::START);
        let warning = Diagnostic::lexical(PreTokenError::NonStrictEscape('\''), range);
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.to_string(), "warning at 1:1-1:1: non-strict escape '\\''");
        assert!(Diagnostic::lexical(PreTokenError::UnterminatedString, range).is_error());
    }
}
