//! Constructors for synthesized syntax nodes.

use sable_common::{LitKind, Literal};
use sable_syntax::ast::{
    BinaryOp, Block, CaseClause, Element, Expr, ExprKind, GenDecl, IfStmt, Stmt, StmtKind,
    SwitchStmt, TypeExpr, UnaryOp, ValueSpec,
};

pub fn ident(name: impl Into<String>) -> Expr {
    Expr::ident(name)
}

pub fn int(value: usize) -> Expr {
    Expr::new(ExprKind::Lit(Literal::new(LitKind::Int, value.to_string())))
}

pub fn string(text: &str) -> Expr {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    Expr::new(ExprKind::Lit(Literal::new(LitKind::String, format!("\"{escaped}\""))))
}

pub fn lit(literal: &Literal) -> Expr {
    Expr::new(ExprKind::Lit(literal.clone()))
}

pub fn selector(base: Expr, name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Selector {
        expr: Box::new(base),
        name: name.into(),
    })
}

pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        func: Box::new(func),
        args,
        ellipsis: false,
    })
}

pub fn unary(op: UnaryOp, expr: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        expr: Box::new(expr),
    })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

/// `Ty{key: value, ...}`
pub fn composite(ty: TypeExpr, fields: Vec<(String, Expr)>) -> Expr {
    Expr::new(ExprKind::Composite {
        ty: Some(Box::new(ty)),
        elems: fields
            .into_iter()
            .map(|(key, value)| Element {
                key: Some(Expr::ident(key)),
                value,
            })
            .collect(),
    })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(expr))
}

pub fn ret(values: Vec<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return(values))
}

pub fn short_var(name: impl Into<String>, value: Expr) -> Stmt {
    Stmt::new(StmtKind::ShortVar {
        names: vec![name.into()],
        values: vec![value],
    })
}

pub fn assign(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::new(StmtKind::Assign {
        lhs: vec![lhs],
        op: "=".into(),
        rhs: vec![rhs],
    })
}

pub fn var_decl(name: impl Into<String>, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Decl(GenDecl::Var {
        specs: vec![ValueSpec {
            names: vec![name.into()],
            ty,
            values: value.into_iter().collect(),
        }],
        grouped: false,
    }))
}

/// `if cond { then } else { els }`, chaining `else if` when `els` is a
/// lone `if`.
pub fn if_else(cond: Expr, then: Vec<Stmt>, els: Option<Vec<Stmt>>) -> Stmt {
    let els = els.map(|mut stmts| {
        if stmts.len() == 1 && matches!(stmts[0].kind, StmtKind::If(_)) {
            Box::new(stmts.remove(0))
        } else {
            Box::new(Stmt::new(StmtKind::Block(Block::new(stmts))))
        }
    });
    Stmt::new(StmtKind::If(IfStmt {
        init: None,
        cond,
        then: Block::new(then),
        els,
    }))
}

pub fn switch(tag: Expr, clauses: Vec<CaseClause>) -> Stmt {
    Stmt::new(StmtKind::Switch(SwitchStmt {
        init: None,
        tag: Some(tag),
        binding: None,
        clauses,
    }))
}

/// `panic("message")`
pub fn panic(message: &str) -> Stmt {
    expr_stmt(call(ident("panic"), vec![string(message)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::{print_expr, print_stmt};

    #[test]
    fn else_if_chains_flatten() {
        let inner = if_else(ident("b"), vec![panic("b")], None);
        let outer = if_else(ident("a"), vec![ret(vec![int(1)])], Some(vec![inner]));
        assert_eq!(
            print_stmt(&outer),
            "if a {\n\treturn 1\n} else if b {\n\tpanic(\"b\")\n}"
        );
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(print_expr(&string("say \"hi\"")), "\"say \\\"hi\\\"\"");
    }
}
