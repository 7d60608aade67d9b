//! Host parser errors.

use std::fmt;

use sable_common::Span;

/// Why the skeleton failed to parse.
///
/// Parsing stops at the first error. Spans are byte offsets into the text
/// handed to the parser, which for Sable input is the preprocessor output,
/// not the original source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// Second location worth pointing at, e.g. where an unclosed block opened.
    pub related: Option<(String, Span)>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            related: None,
        }
    }

    pub fn with_related(
        message: impl Into<String>,
        span: Span,
        note: impl Into<String>,
        note_span: Span,
    ) -> Self {
        Self {
            related: Some((note.into(), note_span)),
            ..Self::new(message, span)
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclosed_switch_points_at_its_opening() {
        let err = ParseError::with_related(
            "expected `}` after the last case clause",
            Span::new(80, 80),
            "switch opened here",
            Span::new(12, 18),
        );
        assert_eq!(err.to_string(), "expected `}` after the last case clause");
        assert_eq!(err.related, Some(("switch opened here".to_string(), Span::new(12, 18))));
    }
}
