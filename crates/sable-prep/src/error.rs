//! Preprocessor errors.
//!
//! Every error is fatal for the whole file and points at a 1-based line of
//! the original source.

use std::fmt;

use sable_common::{LineIndex, Span};

/// What went wrong while rewriting a construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepErrorKind {
    UnterminatedString,
    /// No closing brace for a `match`, `enum`, or arm block.
    UnterminatedBlock { construct: &'static str },
    MissingArrow,
    /// An expression arm runs into the next arm.
    MissingComma,
    MissingScrutinee,
    EmptyMatch,
    EmptyArmBody,
    TupleArityExceeded { arity: usize, max: usize },
    TupleArityMismatch { expected: usize, found: usize },
    InvalidPattern(String),
    DuplicateBinding(String),
    OrPatternBindingMismatch,
    InvalidEnum(String),
    DuplicateVariant(String),
    GenericEnumUnsupported(String),
    /// Text after the closing brace of a construct, on the same line.
    TrailingText(String),
    UnsupportedMatchPosition,
    MarkerEncoding(String),
}

impl fmt::Display for PrepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            PrepErrorKind::UnterminatedBlock { construct } => {
                write!(f, "unterminated `{construct}` block")
            }
            PrepErrorKind::MissingArrow => write!(f, "expected `=>` after match arm pattern"),
            PrepErrorKind::MissingComma => write!(f, "expected `,` between match arms"),
            PrepErrorKind::MissingScrutinee => write!(f, "`match` needs a value to match on"),
            PrepErrorKind::EmptyMatch => write!(f, "`match` has no arms"),
            PrepErrorKind::EmptyArmBody => write!(f, "match arm has no body"),
            PrepErrorKind::TupleArityExceeded { arity, max } => write!(
                f,
                "tuple scrutinee has {arity} elements, at most {max} are supported"
            ),
            PrepErrorKind::TupleArityMismatch { expected, found } => write!(
                f,
                "pattern has {found} elements but the scrutinee has {expected}"
            ),
            PrepErrorKind::InvalidPattern(msg) => write!(f, "invalid pattern: {msg}"),
            PrepErrorKind::DuplicateBinding(name) => {
                write!(f, "`{name}` is bound more than once in the same pattern")
            }
            PrepErrorKind::OrPatternBindingMismatch => {
                write!(f, "alternatives of an or-pattern must bind the same names")
            }
            PrepErrorKind::InvalidEnum(msg) => write!(f, "invalid enum: {msg}"),
            PrepErrorKind::DuplicateVariant(name) => {
                write!(f, "variant `{name}` is declared more than once")
            }
            PrepErrorKind::GenericEnumUnsupported(name) => write!(
                f,
                "enum `{name}` declares type parameters, which are not supported"
            ),
            PrepErrorKind::TrailingText(text) => {
                write!(f, "unexpected `{text}` after closing brace")
            }
            PrepErrorKind::UnsupportedMatchPosition => write!(
                f,
                "`match` must be a statement, follow `return`, or be the value of an assignment"
            ),
            PrepErrorKind::MarkerEncoding(msg) => write!(f, "cannot encode marker: {msg}"),
        }
    }
}

/// A preprocessing failure anchored to the original source.
///
/// Only built by locating a [`PrepFault`] against the unit's line index, so
/// `line` is always a real 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessError {
    pub kind: PrepErrorKind,
    /// 1-based line in the original source.
    pub line: u32,
    pub span: Span,
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for PreprocessError {}

/// A failure inside the rewriting passes, before it has a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrepFault {
    pub kind: PrepErrorKind,
    pub span: Span,
}

impl PrepFault {
    pub(crate) fn at(kind: PrepErrorKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start as u32, end as u32),
        }
    }

    pub(crate) fn locate(self, index: &LineIndex) -> PreprocessError {
        PreprocessError {
            line: index.line_of(self.span.start),
            kind: self.kind,
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_line() {
        let index = LineIndex::new("a\nb\nc");
        let err = PrepFault::at(PrepErrorKind::MissingArrow, 4, 5).locate(&index);
        assert_eq!(err.line, 3);
        assert_eq!(err.to_string(), "line 3: expected `=>` after match arm pattern");
    }
}
