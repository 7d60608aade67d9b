//! Typed markers connecting the preprocessor to the tree transform.
//!
//! The preprocessor cannot build syntax trees, so it leaves one marker per
//! logical unit (enum declaration, match target, scrutinee slot, dispatch,
//! arm) in the skeleton text as a line comment:
//!
//! ```text
//! // sable:marker {"id":3,"origin":{"line":7,"span":{"start":88,"end":120}},"payload":{"kind":"arm",...}}
//! ```
//!
//! The parser decodes these comments back into [`Marker`] values and attaches
//! them to the following declaration, statement, or case clause. Every marker
//! must be consumed exactly once by the transform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;
use crate::span::Span;

/// Comment prefix identifying a marker line.
pub const MARKER_PREFIX: &str = "// sable:marker ";

/// Type written on `var x T` targets whose type the match lowering must
/// determine from the arm values.
pub const INFER_PLACEHOLDER: &str = "__sable_infer";

/// Unique, monotonically increasing marker id within one translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of the construct in the original (pre-preprocessing) source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// 1-based line in the original source.
    pub line: u32,
    /// Byte range in the original source.
    pub span: Span,
}

impl Origin {
    pub fn new(line: u32, span: Span) -> Self {
        Self { line, span }
    }
}

/// Shape of a variant's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Unit,
    Tuple,
    Struct,
}

/// Variant as declared in an `enum`. Field types live in the skeleton struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSig {
    pub name: String,
    pub kind: VariantKind,
    /// Field names; `_0`, `_1`, ... for tuple variants.
    pub fields: Vec<String>,
}

/// Where the value of a `match` goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum MatchTarget {
    /// `match x { ... }` used as a statement.
    Statement,
    /// `return match x { ... }`
    Return,
    /// `x := match`, `x = match`, `var x T = match`, `let x = match`.
    Assign {
        name: String,
        /// A fresh variable is declared before the dispatch.
        declare: bool,
        /// The declaration carries a user-written type.
        annotated: bool,
    },
}

/// Marker body, one variant per marker kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerPayload {
    EnumDecl {
        name: String,
        type_params: Vec<String>,
        variants: Vec<VariantSig>,
    },
    /// Placed on the `var x T` declaration of an assignment-form match.
    Target { match_id: u32, name: String },
    /// Placed on the hoisted `__scrutN := expr` binding of one slot.
    Scrutinee { match_id: u32, slot: u32, text: String },
    /// Placed on the skeleton `switch`.
    Dispatch {
        match_id: u32,
        arity: u32,
        arms: u32,
        target: MatchTarget,
        has_wildcard: bool,
    },
    /// Placed on each `case N:` clause of the skeleton switch.
    Arm {
        match_id: u32,
        index: u32,
        pattern: Pattern,
        guard: Option<String>,
        bindings: Vec<String>,
        block: bool,
    },
}

/// Closed discriminant over marker payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    EnumDecl,
    Target,
    Scrutinee,
    Dispatch,
    Arm,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerKind::EnumDecl => "enum_decl",
            MarkerKind::Target => "target",
            MarkerKind::Scrutinee => "scrutinee",
            MarkerKind::Dispatch => "dispatch",
            MarkerKind::Arm => "arm",
        };
        f.write_str(name)
    }
}

impl MarkerPayload {
    pub fn kind(&self) -> MarkerKind {
        match self {
            MarkerPayload::EnumDecl { .. } => MarkerKind::EnumDecl,
            MarkerPayload::Target { .. } => MarkerKind::Target,
            MarkerPayload::Scrutinee { .. } => MarkerKind::Scrutinee,
            MarkerPayload::Dispatch { .. } => MarkerKind::Dispatch,
            MarkerPayload::Arm { .. } => MarkerKind::Arm,
        }
    }

    /// The match this marker belongs to, if any.
    pub fn match_id(&self) -> Option<u32> {
        match self {
            MarkerPayload::EnumDecl { .. } => None,
            MarkerPayload::Target { match_id, .. }
            | MarkerPayload::Scrutinee { match_id, .. }
            | MarkerPayload::Dispatch { match_id, .. }
            | MarkerPayload::Arm { match_id, .. } => Some(*match_id),
        }
    }
}

/// A single-use token embedded in skeleton text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub origin: Origin,
    pub payload: MarkerPayload,
}

/// Failure to encode or decode a marker comment.
#[derive(Debug)]
pub struct MarkerError {
    pub message: String,
}

impl fmt::Display for MarkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed marker: {}", self.message)
    }
}

impl std::error::Error for MarkerError {}

impl From<serde_json::Error> for MarkerError {
    fn from(err: serde_json::Error) -> Self {
        MarkerError {
            message: err.to_string(),
        }
    }
}

impl Marker {
    pub fn new(id: MarkerId, origin: Origin, payload: MarkerPayload) -> Self {
        Self { id, origin, payload }
    }

    pub fn kind(&self) -> MarkerKind {
        self.payload.kind()
    }

    /// Render the marker as a single comment line (no trailing newline).
    pub fn encode(&self) -> Result<String, MarkerError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{MARKER_PREFIX}{json}"))
    }

    /// Decode a comment's text. Returns `Ok(None)` for ordinary comments.
    pub fn decode(comment: &str) -> Result<Option<Marker>, MarkerError> {
        let Some(json) = comment.trim().strip_prefix(MARKER_PREFIX) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(json)?))
    }

    /// Whether a comment text looks like a marker, without decoding it.
    pub fn is_marker_comment(comment: &str) -> bool {
        comment.trim_start().starts_with(MARKER_PREFIX)
    }
}

/// Position record emitted by the preprocessor for each marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformMetadata {
    pub id: MarkerId,
    pub kind: MarkerKind,
    /// 1-based line of the construct in the original source.
    pub original_line: u32,
    pub original_span: Span,
    /// 1-based line of the marker comment in the skeleton text.
    pub generated_line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::VariantFields;

    fn arm_marker() -> Marker {
        Marker::new(
            MarkerId(4),
            Origin::new(12, Span::new(100, 140)),
            MarkerPayload::Arm {
                match_id: 1,
                index: 0,
                pattern: Pattern::Variant {
                    qualifier: None,
                    name: "Some".into(),
                    fields: VariantFields::Positional(vec![Pattern::Binding("x".into())]),
                },
                guard: Some("x > \"a, b\"".into()),
                bindings: vec!["x".into()],
                block: false,
            },
        )
    }

    #[test]
    fn encode_is_single_line_comment() {
        let line = arm_marker().encode().unwrap();
        assert!(line.starts_with(MARKER_PREFIX));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn decode_round_trips() {
        let marker = arm_marker();
        let decoded = Marker::decode(&marker.encode().unwrap()).unwrap();
        assert_eq!(decoded, Some(marker));
    }

    #[test]
    fn ordinary_comment_is_not_a_marker() {
        assert_eq!(Marker::decode("// just a note").unwrap(), None);
        assert!(!Marker::is_marker_comment("// sable is nice"));
    }

    #[test]
    fn malformed_marker_is_an_error() {
        let err = Marker::decode("// sable:marker {not json").unwrap_err();
        assert!(err.to_string().starts_with("malformed marker"));
    }

    #[test]
    fn payload_kind_and_match_id() {
        let marker = arm_marker();
        assert_eq!(marker.kind(), MarkerKind::Arm);
        assert_eq!(marker.payload.match_id(), Some(1));
        let enum_payload = MarkerPayload::EnumDecl {
            name: "Shape".into(),
            type_params: vec![],
            variants: vec![],
        };
        assert_eq!(enum_payload.match_id(), None);
    }
}
