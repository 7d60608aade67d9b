//! Fatal lowering errors and non-fatal diagnostics.
//!
//! A [`LowerError`] aborts the transform of the whole unit: the marker
//! protocol was violated, or a construct cannot be lowered at all.
//! A [`Diagnostic`] is collected and reported alongside the output; only
//! error-severity diagnostics make the unit fail.

use std::fmt;

use sable_common::{MarkerId, MarkerKind, Origin, Span};

// ── Fatal errors ───────────────────────────────────────────────────────

/// How a marker broke the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Two markers share an id.
    Duplicate,
    /// A marker the construct requires is absent.
    Missing,
    /// A marker was never consumed by any pass.
    Unconsumed,
    /// A marker is attached to the wrong kind of node or out of place.
    Dangling,
    /// A marker's payload contradicts the skeleton around it.
    Malformed,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Violation::Duplicate => "duplicate",
            Violation::Missing => "missing",
            Violation::Unconsumed => "unconsumed",
            Violation::Dangling => "dangling",
            Violation::Malformed => "malformed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LowerError {
    /// Marker protocol violation.
    Marker {
        violation: Violation,
        id: Option<MarkerId>,
        kind: Option<MarkerKind>,
        detail: String,
        origin: Option<Origin>,
    },
    /// `enum Name[T] { ... }`: type parameters on enums are not lowered.
    GenericEnum { name: String, origin: Origin },
    /// A pattern does not fit the union it is matched against.
    InvalidPattern { message: String, origin: Origin },
    /// No union could be determined for a match scrutinee.
    UnresolvedUnion { message: String, origin: Origin },
    /// A generated helper template failed to parse.
    Template { name: String, message: String },
}

impl LowerError {
    pub(crate) fn marker(
        violation: Violation,
        id: Option<MarkerId>,
        kind: Option<MarkerKind>,
        detail: impl Into<String>,
        origin: Option<Origin>,
    ) -> Self {
        LowerError::Marker {
            violation,
            id,
            kind,
            detail: detail.into(),
            origin,
        }
    }

    /// Original-source position, when one is known.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            LowerError::Marker { origin, .. } => *origin,
            LowerError::GenericEnum { origin, .. }
            | LowerError::InvalidPattern { origin, .. }
            | LowerError::UnresolvedUnion { origin, .. } => Some(*origin),
            LowerError::Template { .. } => None,
        }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::Marker {
                violation,
                id,
                kind,
                detail,
                ..
            } => {
                write!(f, "{violation} marker")?;
                if let Some(kind) = kind {
                    write!(f, " `{kind}`")?;
                }
                if let Some(id) = id {
                    write!(f, " {id}")?;
                }
                write!(f, ": {detail}")
            }
            LowerError::GenericEnum { name, .. } => {
                write!(f, "enum `{name}` declares type parameters, which are not supported")
            }
            LowerError::InvalidPattern { message, .. } => write!(f, "invalid pattern: {message}"),
            LowerError::UnresolvedUnion { message, .. } => write!(f, "{message}"),
            LowerError::Template { name, message } => {
                write!(f, "internal error: helper template `{name}` does not parse: {message}")
            }
        }
    }
}

impl std::error::Error for LowerError {}

// ── Diagnostics ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable diagnostic codes, rendered as `S0001` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// A constructor or match value has no type the passes can determine.
    NeedsAnnotation,
    /// Some values are not covered by any arm.
    ExhaustivenessGap,
    /// An arm can never be selected.
    RedundantArm,
    /// A variant constructor is called with the wrong number of payloads.
    PayloadArity,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::NeedsAnnotation => "S0001",
            DiagnosticCode::ExhaustivenessGap => "S0002",
            DiagnosticCode::RedundantArm => "S0003",
            DiagnosticCode::PayloadArity => "S0004",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub origin: Option<Origin>,
    /// Skeleton position, for diagnostics raised on code the preprocessor
    /// copied through without a marker.
    pub span: Option<Span>,
    /// Secondary lines, such as missing patterns.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, origin: Option<Origin>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            origin,
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, origin: Option<Origin>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            origin,
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        if !span.is_detached() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(origin) = self.origin {
            write!(f, " (line {})", origin.line)?;
        }
        Ok(())
    }
}
