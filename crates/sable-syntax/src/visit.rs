//! Mutable traversal of the syntax tree.
//!
//! Default implementations call the matching `walk_*` function, which
//! recurses into children. Implementors override the `visit_*` methods for
//! the nodes they rewrite and call `walk_*` to keep descending.
//!
//! ```text
//! struct RenameType { from: String, to: String }
//!
//! impl VisitMut for RenameType {
//!     fn visit_type(&mut self, ty: &mut TypeExpr) {
//!         if ty.as_simple_name() == Some(self.from.as_str()) {
//!             *ty = TypeExpr::named(self.to.clone());
//!         }
//!         walk_type(self, ty);
//!     }
//! }
//! ```

use crate::ast::{
    Block, CaseClause, Decl, DeclKind, Expr, ExprKind, FieldDecl, ForKind, FuncType, GenDecl,
    InterfaceElem, SourceFile, Stmt, StmtKind, TypeExpr,
};

pub trait VisitMut {
    fn visit_file(&mut self, file: &mut SourceFile) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &mut Decl) {
        walk_decl(self, decl);
    }

    fn visit_gen_decl(&mut self, decl: &mut GenDecl) {
        walk_gen_decl(self, decl);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_clause(&mut self, clause: &mut CaseClause) {
        walk_clause(self, clause);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }

    fn visit_type(&mut self, ty: &mut TypeExpr) {
        walk_type(self, ty);
    }

    fn visit_signature(&mut self, sig: &mut FuncType) {
        walk_signature(self, sig);
    }
}

pub fn walk_file<V: VisitMut + ?Sized>(v: &mut V, file: &mut SourceFile) {
    for decl in &mut file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: VisitMut + ?Sized>(v: &mut V, decl: &mut Decl) {
    match &mut decl.kind {
        DeclKind::Func(func) => {
            if let Some(recv) = &mut func.recv {
                v.visit_type(&mut recv.ty);
            }
            v.visit_signature(&mut func.sig);
            if let Some(body) = &mut func.body {
                v.visit_block(body);
            }
        }
        DeclKind::Gen(gen) => v.visit_gen_decl(gen),
        DeclKind::Comment(_) => {}
    }
}

pub fn walk_gen_decl<V: VisitMut + ?Sized>(v: &mut V, decl: &mut GenDecl) {
    match decl {
        GenDecl::Var { specs, .. } | GenDecl::Const { specs, .. } => {
            for spec in specs {
                if let Some(ty) = &mut spec.ty {
                    v.visit_type(ty);
                }
                for value in &mut spec.values {
                    v.visit_expr(value);
                }
            }
        }
        GenDecl::Type { specs, .. } => {
            for spec in specs {
                v.visit_type(&mut spec.ty);
            }
        }
    }
}

pub fn walk_block<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => v.visit_expr(expr),
        StmtKind::Decl(decl) => v.visit_gen_decl(decl),
        StmtKind::ShortVar { values, .. } => {
            for value in values {
                v.visit_expr(value);
            }
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
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
            if let Some(init) = &mut if_stmt.init {
                v.visit_stmt(init);
            }
            v.visit_expr(&mut if_stmt.cond);
            v.visit_block(&mut if_stmt.then);
            if let Some(els) = &mut if_stmt.els {
                v.visit_stmt(els);
            }
        }
        StmtKind::For(for_stmt) => {
            match &mut for_stmt.kind {
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
            v.visit_block(&mut for_stmt.body);
        }
        StmtKind::Switch(switch) => {
            if let Some(init) = &mut switch.init {
                v.visit_stmt(init);
            }
            if let Some(tag) = &mut switch.tag {
                v.visit_expr(tag);
            }
            for clause in &mut switch.clauses {
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

pub fn walk_clause<V: VisitMut + ?Sized>(v: &mut V, clause: &mut CaseClause) {
    for expr in &mut clause.exprs {
        v.visit_expr(expr);
    }
    for stmt in &mut clause.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_expr<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Ident(_) | ExprKind::Lit(_) => {}
        ExprKind::Composite { ty, elems } => {
            if let Some(ty) = ty {
                v.visit_type(ty);
            }
            for elem in elems {
                if let Some(key) = &mut elem.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&mut elem.value);
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

pub fn walk_type<V: VisitMut + ?Sized>(v: &mut V, ty: &mut TypeExpr) {
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

pub fn walk_signature<V: VisitMut + ?Sized>(v: &mut V, sig: &mut FuncType) {
    for param in sig.params.iter_mut().chain(sig.results.iter_mut()) {
        v.visit_type(&mut param.ty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    struct RenameType {
        from: &'static str,
        to: &'static str,
        seen: usize,
    }

    impl VisitMut for RenameType {
        fn visit_type(&mut self, ty: &mut TypeExpr) {
            if ty.as_simple_name() == Some(self.from) {
                *ty = TypeExpr::named(self.to);
                self.seen += 1;
            }
            walk_type(self, ty);
        }
    }

    #[test]
    fn rewrites_types_in_every_position() {
        let mut file = parse(
            "package p\n\nvar a Old\n\nfunc f(x Old) []Old {\n\tvar y map[string]Old\n\treturn func(z *Old) []Old { return nil }(nil)\n}\n",
        )
        .unwrap();
        let mut v = RenameType {
            from: "Old",
            to: "New",
            seen: 0,
        };
        v.visit_file(&mut file);
        assert_eq!(v.seen, 6);
    }
}
