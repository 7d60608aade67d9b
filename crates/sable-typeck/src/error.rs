//! Addressability errors.

use std::fmt;

use sable_common::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum AddrError {
    /// The operand is not addressable and its type is unknown, so no
    /// temporary can be declared for it.
    UnknownType { expr: String, span: Span },
}

impl AddrError {
    pub fn span(&self) -> Span {
        match self {
            AddrError::UnknownType { span, .. } => *span,
        }
    }
}

impl fmt::Display for AddrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrError::UnknownType { expr, .. } => {
                write!(f, "cannot take the address of `{expr}`: its type is unknown (needs annotation)")
            }
        }
    }
}

impl std::error::Error for AddrError {}
