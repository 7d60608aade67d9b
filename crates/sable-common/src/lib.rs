//! Shared types for the Sable compiler.
//!
//! Everything in this crate is used by at least two pipeline phases: byte
//! spans and line lookup, the typed marker protocol that connects the
//! text-level preprocessor to the tree-level transform, the serializable
//! pattern syntax carried inside markers, and the per-unit name generator.

pub mod marker;
pub mod names;
pub mod pattern;
pub mod span;

pub use marker::{
    Marker, MarkerId, MarkerKind, MarkerPayload, MatchTarget, Origin, TransformMetadata, VariantKind, VariantSig,
};
pub use names::NameGen;
pub use pattern::{LitKind, Literal, Pattern, VariantFields};
pub use span::{LineIndex, Span};
