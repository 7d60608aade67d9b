//! Surface pattern syntax shared by the preprocessor and the match transform.
//!
//! The preprocessor parses arm patterns from text and ships them inside
//! `Arm` markers; the transform resolves them against the known unions.
//! Patterns therefore round-trip through JSON and stay purely syntactic:
//! variant names are not yet tied to any union here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a literal pattern value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LitKind {
    Int,
    Float,
    String,
    Rune,
    Bool,
}

/// A literal as written in source, quotes and sign included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LitKind,
    pub text: String,
}

impl Literal {
    pub fn new(kind: LitKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Sub-patterns of a variant pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantFields {
    /// `Point`
    Unit,
    /// `Circle(r)`
    Positional(Vec<Pattern>),
    /// `Rect { w, h: height }`. Fields not listed match anything.
    Named(Vec<(String, Pattern)>),
}

/// A match arm pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// A lowercase identifier that binds the matched value.
    Binding(String),
    Literal(Literal),
    /// `Circle(r)`, `Shape.Point`, `Rect { w, h }`.
    Variant {
        qualifier: Option<String>,
        name: String,
        fields: VariantFields,
    },
    /// `(p, q)`, only valid against a tuple scrutinee.
    Tuple(Vec<Pattern>),
    /// `p | q`
    Or(Vec<Pattern>),
}

impl Pattern {
    /// Names bound by this pattern, in source order.
    ///
    /// For or-patterns only the first alternative is consulted; the
    /// preprocessor guarantees every alternative binds the same set.
    pub fn bindings(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Wildcard | Pattern::Literal(_) => {}
            Pattern::Binding(name) => out.push(name.clone()),
            Pattern::Variant { fields, .. } => match fields {
                VariantFields::Unit => {}
                VariantFields::Positional(pats) => {
                    for p in pats {
                        p.collect_bindings(out);
                    }
                }
                VariantFields::Named(pats) => {
                    for (_, p) in pats {
                        p.collect_bindings(out);
                    }
                }
            },
            Pattern::Tuple(elems) => {
                for p in elems {
                    p.collect_bindings(out);
                }
            }
            Pattern::Or(alts) => {
                if let Some(first) = alts.first() {
                    first.collect_bindings(out);
                }
            }
        }
    }

    /// Whether the pattern matches every value without inspecting it.
    pub fn is_irrefutable(&self) -> bool {
        match self {
            Pattern::Wildcard | Pattern::Binding(_) => true,
            Pattern::Tuple(elems) => elems.iter().all(Pattern::is_irrefutable),
            Pattern::Or(alts) => alts.iter().any(Pattern::is_irrefutable),
            Pattern::Literal(_) | Pattern::Variant { .. } => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Binding(name) => write!(f, "{name}"),
            Pattern::Literal(lit) => write!(f, "{}", lit.text),
            Pattern::Variant {
                qualifier,
                name,
                fields,
            } => {
                if let Some(q) = qualifier {
                    write!(f, "{q}.")?;
                }
                write!(f, "{name}")?;
                match fields {
                    VariantFields::Unit => Ok(()),
                    VariantFields::Positional(pats) => {
                        write!(f, "(")?;
                        write_joined(f, pats.iter(), ", ")?;
                        write!(f, ")")
                    }
                    VariantFields::Named(pats) => {
                        write!(f, " {{ ")?;
                        for (i, (field, p)) in pats.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            match p {
                                Pattern::Binding(b) if b == field => write!(f, "{field}")?,
                                _ => write!(f, "{field}: {p}")?,
                            }
                        }
                        write!(f, " }}")
                    }
                }
            }
            Pattern::Tuple(elems) => {
                write!(f, "(")?;
                write_joined(f, elems.iter(), ", ")?;
                write!(f, ")")
            }
            Pattern::Or(alts) => write_joined(f, alts.iter(), " | "),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Pattern>,
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
