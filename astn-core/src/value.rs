//! Scalar classification of string values.
//!
//! The parser reports every scalar as a string with its [`StringForm`]. Only
//! nonwrapped tokens can be anything other than text, and their type follows
//! from syntax alone: `null`, `true`/`false`, or a JSON number. Wrapped
//! strings are always text, so `"42"` stays a string.

use crate::token::StringForm;

/// A classified scalar. Text borrows from the string it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    /// A number without fraction or exponent that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    Text(&'a str),
}

impl<'a> Scalar<'a> {
    pub fn classify(value: &'a str, form: StringForm) -> Self {
        if form != StringForm::NonWrapped {
            return Scalar::Text(value);
        }
        match value {
            "null" => Scalar::Null,
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Self::try_parse_number(value).unwrap_or(Scalar::Text(value)),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Any number as a float.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
    fn try_parse_number(value: &str) -> Option<Scalar<'a>> {
        let bytes = value.as_bytes();
        let mut i = 0;
        if bytes.first() == Some(&b'-') {
            i += 1;
        }

        match bytes.get(i) {
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => i += count_digits(&bytes[i..]),
            _ => return None,
        }
        let integral = i;

        if bytes.get(i) == Some(&b'.') {
            let digits = count_digits(&bytes[i + 1..]);
            if digits == 0 {
                return None;
            }
            i += 1 + digits;
        }

        if let Some(b'e' | b'E') = bytes.get(i) {
            i += 1;
            if let Some(b'+' | b'-') = bytes.get(i) {
                i += 1;
            }
            let digits = count_digits(&bytes[i..]);
            if digits == 0 {
                return None;
            }
            i += digits;
        }

        if i != bytes.len() {
            return None;
        }
        if integral == bytes.len() {
            if let Ok(integer) = value.parse::<i64>() {
                return Some(Scalar::Integer(integer));
            }
        }
        value.parse::<f64>().ok().map(Scalar::Float)
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
