//! Read-only traversal of the syntax tree.
//!
//! Mirrors [`crate::visit::VisitMut`] child for child, so a read-only pass
//! and a rewriting pass over the same tree see nodes in the same order.

use crate::ast::{
    Block, CaseClause, Decl, DeclKind, Expr, ExprKind, FieldDecl, ForKind, FuncType, GenDecl,
    InterfaceElem, SourceFile, Stmt, StmtKind, TypeExpr,
};

pub trait Visit<'ast> {
    fn visit_file(&mut self, file: &'ast SourceFile) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        walk_decl(self, decl);
    }

    fn visit_gen_decl(&mut self, decl: &'ast GenDecl) {
        walk_gen_decl(self, decl);
    }

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_clause(&mut self, clause: &'ast CaseClause) {
        walk_clause(self, clause);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_type(&mut self, ty: &'ast TypeExpr) {
        walk_type(self, ty);
    }

    fn visit_signature(&mut self, sig: &'ast FuncType) {
        walk_signature(self, sig);
    }
}

pub fn walk_file<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, file: &'ast SourceFile) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, decl: &'ast Decl) {
    match &decl.kind {
        DeclKind::Func(func) => {
            if let Some(recv) = &func.recv {
                v.visit_type(&recv.ty);
            }
            v.visit_signature(&func.sig);
            if let Some(body) = &func.body {
                v.visit_block(body);
            }
        }
        DeclKind::Gen(gen) => v.visit_gen_decl(gen),
        DeclKind::Comment(_) => {}
    }
}

pub fn walk_gen_decl<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, decl: &'ast GenDecl) {
    match decl {
        GenDecl::Var { specs, .. } | GenDecl::Const { specs, .. } => {
            for spec in specs {
                if let Some(ty) = &spec.ty {
                    v.visit_type(ty);
                }
                for value in &spec.values {
                    v.visit_expr(value);
                }
            }
        }
        GenDecl::Type { specs, .. } => {
            for spec in specs {
                v.visit_type(&spec.ty);
            }
        }
    }
}

pub fn walk_block<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, block: &'ast Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, stmt: &'ast Stmt) {
    match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => v.visit_expr(expr),
        StmtKind::Decl(decl) => v.visit_gen_decl(decl),
        StmtKind::ShortVar { values, .. } => {
            for value in values {
                v.visit_expr(value);
            }
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs.iter()) {
                v.visit_expr(expr);
            }
        }
        StmtKind::IncDec { expr, .. } => v.visit_expr(expr),
        StmtKind::Send { chan, value } => {
            v.visit_expr(chan);
            v.visit_expr(value);
        }
        StmtKind::Return(values) => {
            for value in values {
                v.visit_expr(value);
            }
        }
        StmtKind::If(if_stmt) => {
            if let Some(init) = &if_stmt.init {
                v.visit_stmt(init);
            }
            v.visit_expr(&if_stmt.cond);
            v.visit_block(&if_stmt.then);
            if let Some(els) = &if_stmt.els {
                v.visit_stmt(els);
            }
        }
        StmtKind::For(for_stmt) => {
            match &for_stmt.kind {
                ForKind::Infinite => {}
                ForKind::Cond(cond) => v.visit_expr(cond),
                ForKind::Clause { init, cond, post } => {
                    if let Some(init) = init {
                        v.visit_stmt(init);
                    }
                    if let Some(cond) = cond {
                        v.visit_expr(cond);
                    }
                    if let Some(post) = post {
                        v.visit_stmt(post);
                    }
                }
                ForKind::Range {
                    key, value, expr, ..
                } => {
                    for var in [key, value].into_iter().flatten() {
                        v.visit_expr(var);
                    }
                    v.visit_expr(expr);
                }
            }
            v.visit_block(&for_stmt.body);
        }
        StmtKind::Switch(switch) => {
            if let Some(init) = &switch.init {
                v.visit_stmt(init);
            }
            if let Some(tag) = &switch.tag {
                v.visit_expr(tag);
            }
            for clause in &switch.clauses {
                v.visit_clause(clause);
            }
        }
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::Labeled { stmt, .. } => v.visit_stmt(stmt),
        StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Goto(_)
        | StmtKind::Fallthrough
        | StmtKind::Comment(_) => {}
    }
}

pub fn walk_clause<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, clause: &'ast CaseClause) {
    for expr in &clause.exprs {
        v.visit_expr(expr);
    }
    for stmt in &clause.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_expr<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::Lit(_) => {}
        ExprKind::Composite { ty, elems } => {
            if let Some(ty) = ty {
                v.visit_type(ty);
            }
            for elem in elems {
                if let Some(key) = &elem.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&elem.value);
            }
        }
        ExprKind::FuncLit { sig, body } => {
            v.visit_signature(sig);
            v.visit_block(body);
        }
        ExprKind::Unary { expr, .. } | ExprKind::Paren(expr) => v.visit_expr(expr),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Selector { expr, .. } => v.visit_expr(expr),
        ExprKind::Index { expr, indices } => {
            v.visit_expr(expr);
            for index in indices {
                v.visit_expr(index);
            }
        }
        ExprKind::Slice {
            expr,
            low,
            high,
            max,
        } => {
            v.visit_expr(expr);
            for bound in [low, high, max].into_iter().flatten() {
                v.visit_expr(bound);
            }
        }
        ExprKind::TypeAssert { expr, ty } => {
            v.visit_expr(expr);
            if let Some(ty) = ty {
                v.visit_type(ty);
            }
        }
        ExprKind::Type(ty) => v.visit_type(ty),
    }
}

pub fn walk_type<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, ty: &'ast TypeExpr) {
    match ty {
        TypeExpr::Named { args, .. } => {
            for arg in args {
                v.visit_type(arg);
            }
        }
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => v.visit_type(inner),
        TypeExpr::Array { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_type(elem);
        }
        TypeExpr::Map { key, value } => {
            v.visit_type(key);
            v.visit_type(value);
        }
        TypeExpr::Chan { elem, .. } => v.visit_type(elem),
        TypeExpr::Func(sig) => v.visit_signature(sig),
        TypeExpr::Struct(fields) => {
            for FieldDecl { ty, .. } in fields {
                v.visit_type(ty);
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { sig, .. } => v.visit_signature(sig),
                    InterfaceElem::Embedded(ty) => v.visit_type(ty),
                }
            }
        }
    }
}

pub fn walk_signature<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, sig: &'ast FuncType) {
    for param in sig.params.iter().chain(sig.results.iter()) {
        v.visit_type(&param.ty);
    }
}

/// Every identifier referenced under a statement list, function literals
/// included.
pub fn idents_in(stmts: &[Stmt]) -> rustc_hash::FxHashSet<&str> {
    struct Idents<'a> {
        out: rustc_hash::FxHashSet<&'a str>,
    }

    impl<'a> Visit<'a> for Idents<'a> {
        fn visit_expr(&mut self, expr: &'a Expr) {
            if let ExprKind::Ident(name) = &expr.kind {
                self.out.insert(name);
            }
            walk_expr(self, expr);
        }
    }

    let mut v = Idents {
        out: rustc_hash::FxHashSet::default(),
    };
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
    v.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[derive(Default)]
    struct Counter {
        blocks: usize,
        clauses: usize,
    }

    impl<'ast> Visit<'ast> for Counter {
        fn visit_block(&mut self, block: &'ast Block) {
            self.blocks += 1;
            walk_block(self, block);
        }

        fn visit_clause(&mut self, clause: &'ast CaseClause) {
            self.clauses += 1;
            walk_clause(self, clause);
        }
    }

    #[test]
    fn reaches_function_literal_bodies() {
        let file = parse(
            "package p\n\nfunc f(x int) {\n\tswitch x {\n\tcase 1:\n\t\tgo func() {\n\t\t\tif x > 0 {\n\t\t\t}\n\t\t}()\n\tdefault:\n\t}\n}\n",
        )
        .unwrap();
        let mut counter = Counter::default();
        counter.visit_file(&file);
        assert_eq!(counter.blocks, 3);
        assert_eq!(counter.clauses, 2);
    }

    #[test]
    fn collects_identifiers() {
        let file = parse("package p\n\nfunc f() {\n\ty := g(a, b.c)\n\t_ = y\n}\n").unwrap();
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected a function");
        };
        let idents = idents_in(&func.body.as_ref().unwrap().stmts);
        for name in ["g", "a", "b", "y", "_"] {
            assert!(idents.contains(name), "missing {name}");
        }
        assert!(!idents.contains("c"));
    }
}
