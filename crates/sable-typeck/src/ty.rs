//! Type helpers over the host type syntax.
//!
//! Sable does not have its own type representation: inferred types are host
//! [`TypeExpr`] values, so they can be printed straight back into generated
//! code. This module holds the few operations the passes need on them,
//! most importantly the deterministic names of container instantiations.

use sable_common::LitKind;
use sable_syntax::ast::{ChanDir, ExprKind, TypeExpr};
use sable_syntax::print_expr;

/// Predeclared type names of the host language.
pub const PREDECLARED_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8", "int16",
    "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr", "any",
];

pub fn is_predeclared_type(name: &str) -> bool {
    PREDECLARED_TYPES.contains(&name)
}

/// Default type of an untyped literal.
pub fn literal_type(kind: LitKind) -> TypeExpr {
    TypeExpr::named(match kind {
        LitKind::Int => "int",
        LitKind::Float => "float64",
        LitKind::String => "string",
        LitKind::Rune => "rune",
        LitKind::Bool => "bool",
    })
}

pub fn bool_type() -> TypeExpr {
    TypeExpr::named("bool")
}

/// Identifier-safe spelling of a type, used to name instantiations.
///
/// `*User` is `ptr_User`, `[]int` is `slice_int`, `[4]byte` is `arr4_byte`,
/// `map[string]int` is `map_string_int`, `pkg.T` is `pkg_T`,
/// `func(int) error` is `func_int_to_error`.
pub fn sanitize_type_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named { pkg, name, args } => {
            let base = match pkg {
                Some(pkg) => format!("{pkg}_{name}"),
                None => name.clone(),
            };
            if args.is_empty() {
                base
            } else {
                mangle(&base, args)
            }
        }
        TypeExpr::Pointer(inner) => format!("ptr_{}", sanitize_type_name(inner)),
        TypeExpr::Slice(elem) => format!("slice_{}", sanitize_type_name(elem)),
        TypeExpr::Array { len, elem } => {
            let len = match len.as_deref().map(|e| &e.kind) {
                Some(ExprKind::Lit(lit)) => lit.text.clone(),
                Some(_) => len.as_deref().map(print_expr).map(|t| identifier_safe(&t)).unwrap_or_default(),
                None => String::new(),
            };
            format!("arr{len}_{}", sanitize_type_name(elem))
        }
        TypeExpr::Map { key, value } => {
            format!("map_{}_{}", sanitize_type_name(key), sanitize_type_name(value))
        }
        TypeExpr::Chan { dir, elem } => {
            let prefix = match dir {
                ChanDir::Both => "chan",
                ChanDir::Send => "chansend",
                ChanDir::Recv => "chanrecv",
            };
            format!("{prefix}_{}", sanitize_type_name(elem))
        }
        TypeExpr::Func(sig) => {
            let mut out = String::from("func");
            for param in &sig.params {
                out.push('_');
                out.push_str(&sanitize_type_name(&param.ty));
            }
            if !sig.results.is_empty() {
                out.push_str("_to");
                for result in &sig.results {
                    out.push('_');
                    out.push_str(&sanitize_type_name(&result.ty));
                }
            }
            out
        }
        TypeExpr::Struct(_) => "struct".to_string(),
        TypeExpr::Interface(_) => "interface".to_string(),
    }
}

/// `base` followed by the sanitized `args`: `Result_int_error`.
pub fn mangle(base: &str, args: &[TypeExpr]) -> String {
    let mut out = base.to_string();
    for arg in args {
        out.push('_');
        out.push_str(&sanitize_type_name(arg));
    }
    out
}

fn identifier_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Name of a named type after stripping one pointer level.
pub fn base_type_name(ty: &TypeExpr) -> Option<&str> {
    match ty {
        TypeExpr::Pointer(inner) => inner.as_simple_name(),
        other => other.as_simple_name(),
    }
}
