//! Addressability analysis.
//!
//! Tagged unions store payloads behind pointers, so every constructor
//! argument needs an address. Addressable operands get `&expr`; anything
//! else is evaluated into a fresh temporary inside an immediately invoked
//! function literal:
//!
//! ```text
//! func() *int { __tmp0 := 42; return &__tmp0 }()
//! ```

use sable_common::NameGen;
use sable_syntax::ast::{
    Block, Expr, ExprKind, FuncType, GenDecl, Param, Stmt, StmtKind, TypeExpr, UnaryOp, ValueSpec,
};
use sable_syntax::print_expr;

use crate::error::AddrError;
use crate::infer::TypeInference;
use crate::ty::literal_type;

const PREDECLARED_CONSTANTS: &[&str] = &["true", "false", "nil", "iota"];

/// Whether `&expr` is valid host code.
pub fn is_addressable(expr: &Expr, infer: &mut TypeInference) -> bool {
    match &expr.kind {
        ExprKind::Ident(name) => {
            if name == "_" || infer.is_const(name) || infer.is_func(name) {
                return false;
            }
            infer.lookup(name).is_some() || !PREDECLARED_CONSTANTS.contains(&name.as_str()) && !infer.is_type_name(name)
        }
        ExprKind::Selector { expr: base, .. } => {
            if let Some(qualifier) = base.as_ident() {
                if infer.is_union(qualifier) {
                    return false;
                }
            }
            match &base.unparen().kind {
                // Field of a call result or literal value: only through a pointer.
                ExprKind::Call { .. } | ExprKind::Lit(_) => {
                    matches!(infer.infer(base).ty(), Some(TypeExpr::Pointer(_)))
                }
                _ => true,
            }
        }
        ExprKind::Index { expr: base, .. } => match infer.infer(base).into_type().map(|t| infer.underlying(&t)) {
            Some(TypeExpr::Map { .. }) => false,
            Some(ty) if ty.as_simple_name() == Some("string") => false,
            Some(TypeExpr::Slice(_)) | Some(TypeExpr::Pointer(_)) => true,
            Some(TypeExpr::Array { .. }) => is_addressable(base, infer),
            Some(_) => false,
            // Unknown base: a map index is the only common non-addressable
            // case, and it cannot be ruled out.
            None => false,
        },
        ExprKind::Unary {
            op: UnaryOp::Deref, ..
        } => true,
        ExprKind::Composite { ty: Some(_), .. } => true,
        ExprKind::Paren(inner) => is_addressable(inner, infer),
        _ => false,
    }
}

/// Build `func() *T { __tmpN := expr; return &__tmpN }()`.
///
/// The short form is used only when `expr` already has type `ty` on its own
/// (a literal whose default type is `ty`, or a non-constant expression);
/// otherwise the temporary is declared with `var __tmpN T = expr` so untyped
/// constants convert.
pub fn wrap_for_address(expr: Expr, ty: &TypeExpr, names: &mut NameGen) -> Expr {
    let tmp = names.fresh("tmp");
    let short = match &expr.unparen().kind {
        ExprKind::Lit(lit) => literal_type(lit.kind) == *ty,
        ExprKind::Ident(name) => !PREDECLARED_CONSTANTS.contains(&name.as_str()),
        ExprKind::Binary { .. } | ExprKind::Unary { .. } => false,
        _ => true,
    };
    let bind = if short {
        Stmt::new(StmtKind::ShortVar {
            names: vec![tmp.clone()],
            values: vec![expr],
        })
    } else {
        Stmt::new(StmtKind::Decl(GenDecl::Var {
            specs: vec![ValueSpec {
                names: vec![tmp.clone()],
                ty: Some(ty.clone()),
                values: vec![expr],
            }],
            grouped: false,
        }))
    };
    let ret = Stmt::new(StmtKind::Return(vec![Expr::new(ExprKind::Unary {
        op: UnaryOp::Addr,
        expr: Box::new(Expr::ident(tmp)),
    })]));
    let lit = Expr::new(ExprKind::FuncLit {
        sig: FuncType {
            params: Vec::new(),
            results: vec![Param::unnamed(TypeExpr::pointer(ty.clone()))],
        },
        body: Block::new(vec![bind, ret]),
    });
    Expr::new(ExprKind::Call {
        func: Box::new(lit),
        args: Vec::new(),
        ellipsis: false,
    })
}

/// Address of `expr`: `&expr` when addressable, otherwise a temporary.
///
/// `ty` is the payload type the address must have; when absent it is
/// inferred from `expr`.
pub fn address_of(
    expr: Expr,
    ty: Option<&TypeExpr>,
    infer: &mut TypeInference,
    names: &mut NameGen,
) -> Result<Expr, AddrError> {
    if is_addressable(&expr, infer) {
        let span = expr.span;
        let inner = match expr.kind {
            ExprKind::Paren(inner) => *inner,
            _ => expr,
        };
        return Ok(Expr {
            kind: ExprKind::Unary {
                op: UnaryOp::Addr,
                expr: Box::new(inner),
            },
            span,
        });
    }
    let ty = match ty {
        Some(ty) => ty.clone(),
        None => infer.infer(&expr).into_type().ok_or_else(|| AddrError::UnknownType {
            expr: print_expr(&expr),
            span: expr.span,
        })?,
    };
    tracing::trace!(ty = %sable_syntax::print_type(&ty), "address through temporary");
    Ok(wrap_for_address(expr, &ty, names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::{parse, parse_expr, parse_type};

    fn service() -> TypeInference {
        let mut infer = TypeInference::new(TypeExpr::named("error"));
        infer.reset_for(
            &parse(
                "package p\n\nconst Max = 3\n\nvar grid [4]int\n\nfunc load() *Config {\n\treturn nil\n}\n\nfunc value() Config {\n\treturn Config{}\n}\n",
            )
            .unwrap(),
        );
        infer.bind("user", Some(parse_type("*User").unwrap()));
        infer.bind("ages", Some(parse_type("map[string]int").unwrap()));
        infer.bind("items", Some(parse_type("[]string").unwrap()));
        infer.bind("name", Some(TypeExpr::named("string")));
        infer
    }

    fn addressable(infer: &mut TypeInference, source: &str) -> bool {
        infer.clear_cache();
        is_addressable(&parse_expr(source).unwrap(), infer)
    }

    #[test]
    fn classifies_operands() {
        let mut infer = service();
        for yes in ["user", "user.Name", "items[0]", "grid[1]", "*user", "Config{}", "(name)"] {
            assert!(addressable(&mut infer, yes), "{yes} should be addressable");
        }
        for no in [
            "42",
            "\"s\"",
            "Max",
            "true",
            "nil",
            "load",
            "ages[\"a\"]",
            "name[0]",
            "value().Port",
            "a + b",
            "func() {}",
            "len(items)",
        ] {
            assert!(!addressable(&mut infer, no), "{no} should not be addressable");
        }
        assert!(addressable(&mut infer, "load().Port"));
    }

    #[test]
    fn literal_goes_through_temporary() {
        let mut infer = service();
        let mut names = NameGen::new();
        let expr = address_of(parse_expr("42").unwrap(), None, &mut infer, &mut names).unwrap();
        assert_eq!(print_expr(&expr), "func() *int { __tmp0 := 42; return &__tmp0 }()");
    }

    #[test]
    fn untyped_constant_is_converted_by_declaration() {
        let mut infer = service();
        let mut names = NameGen::new();
        let float = TypeExpr::named("float64");
        let expr = address_of(parse_expr("2").unwrap(), Some(&float), &mut infer, &mut names).unwrap();
        assert_eq!(
            print_expr(&expr),
            "func() *float64 { var __tmp0 float64 = 2; return &__tmp0 }()"
        );
    }

    #[test]
    fn addressable_operand_is_referenced_directly() {
        let mut infer = service();
        let mut names = NameGen::new();
        let expr = address_of(parse_expr("user.Name").unwrap(), None, &mut infer, &mut names).unwrap();
        assert_eq!(print_expr(&expr), "&user.Name");
        assert_eq!(names.peek("tmp"), 0);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let mut infer = service();
        let mut names = NameGen::new();
        let err = address_of(parse_expr("mystery()").unwrap(), None, &mut infer, &mut names).unwrap_err();
        assert!(matches!(err, AddrError::UnknownType { .. }));
        assert!(err.to_string().contains("needs annotation"));
    }
}
