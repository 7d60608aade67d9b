//! Syntax tree walker that produces format IR.
//!
//! Output follows the host's canonical layout: tab indentation, `case`
//! labels at the level of their `switch`, a blank line between top-level
//! declarations, and argument or element lists that break one per line
//! with a trailing comma. Function literals whose body is simple stay on
//! one line with `;` separators.

use sable_common::{Marker, Origin};

use crate::ast::{
    Block, CaseClause, ChanDir, Decl, DeclKind, Element, Expr, ExprKind, FieldDecl, ForKind,
    ForStmt, FuncDecl, FuncType, GenDecl, IfStmt, Import, InterfaceElem, Param, SourceFile,
    Stmt, StmtKind, SwitchStmt, TypeExpr, TypeSpec, UnaryOp, ValueSpec,
};

use super::ir::*;

/// Lowers tree nodes to IR and collects anchors for nodes with an origin.
#[derive(Default)]
pub(crate) struct Walker {
    anchors: Vec<Origin>,
}

impl Walker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Origins by anchor id.
    pub(crate) fn into_anchors(self) -> Vec<Origin> {
        self.anchors
    }

    fn anchor(&mut self, origin: Option<Origin>) -> FormatIR {
        match origin {
            Some(origin) => {
                self.anchors.push(origin);
                FormatIR::Anchor(self.anchors.len() - 1)
            }
            None => FormatIR::Empty,
        }
    }

    fn markers(&self, markers: &[Marker]) -> FormatIR {
        concat(
            markers
                .iter()
                .map(|m| {
                    let line = m
                        .encode()
                        .unwrap_or_else(|err| format!("// unencodable marker {}: {err}", m.id));
                    concat(vec![text(line), hardline()])
                })
                .collect(),
        )
    }

    // ── File and declarations ──────────────────────────────────────────

    pub(crate) fn file(&mut self, file: &SourceFile) -> FormatIR {
        let mut parts = vec![text(format!("package {}", file.package))];
        match file.imports.as_slice() {
            [] => {}
            [single] => {
                parts.push(hardline());
                parts.push(hardline());
                parts.push(text(format!("import {}", import_spec(single))));
            }
            many => {
                parts.push(hardline());
                parts.push(hardline());
                parts.push(text("import ("));
                parts.push(indent(concat(
                    many.iter()
                        .flat_map(|i| [hardline(), text(import_spec(i))])
                        .collect(),
                )));
                parts.push(hardline());
                parts.push(text(")"));
            }
        }
        let mut prev_comment = false;
        for decl in &file.decls {
            parts.push(hardline());
            if !prev_comment {
                parts.push(hardline());
            }
            prev_comment = matches!(decl.kind, DeclKind::Comment(_));
            parts.push(self.decl(decl));
        }
        concat(parts)
    }

    pub(crate) fn decl(&mut self, decl: &Decl) -> FormatIR {
        let markers = self.markers(&decl.markers);
        let anchor = self.anchor(decl.origin);
        let body = match &decl.kind {
            DeclKind::Func(func) => self.func_decl(func),
            DeclKind::Gen(gen) => self.gen_decl(gen),
            DeclKind::Comment(comment) => text(comment),
        };
        concat(vec![markers, anchor, body])
    }

    fn func_decl(&mut self, func: &FuncDecl) -> FormatIR {
        let mut parts = vec![text("func ")];
        if let Some(recv) = &func.recv {
            parts.push(text("("));
            parts.push(self.param(recv));
            parts.push(text(") "));
        }
        parts.push(text(&func.name));
        parts.push(self.signature(&func.sig));
        if let Some(body) = &func.body {
            parts.push(text(" "));
            parts.push(self.block(body));
        }
        concat(parts)
    }

    pub(crate) fn gen_decl(&mut self, decl: &GenDecl) -> FormatIR {
        let (keyword, grouped, specs): (&str, bool, Vec<FormatIR>) = match decl {
            GenDecl::Var { specs, grouped } => (
                "var",
                *grouped,
                specs.iter().map(|s| self.value_spec(s)).collect(),
            ),
            GenDecl::Const { specs, grouped } => (
                "const",
                *grouped,
                specs.iter().map(|s| self.value_spec(s)).collect(),
            ),
            GenDecl::Type { specs, grouped } => (
                "type",
                *grouped,
                specs.iter().map(|s| self.type_spec(s)).collect(),
            ),
        };
        if !grouped && specs.len() == 1 {
            return concat(vec![text(format!("{keyword} ")), concat(specs)]);
        }
        if specs.is_empty() {
            return text(format!("{keyword} ()"));
        }
        concat(vec![
            text(format!("{keyword} (")),
            indent(concat(specs.into_iter().flat_map(|s| [hardline(), s]).collect())),
            hardline(),
            text(")"),
        ])
    }

    fn value_spec(&mut self, spec: &ValueSpec) -> FormatIR {
        let mut parts = vec![text(spec.names.join(", "))];
        if let Some(ty) = &spec.ty {
            parts.push(text(" "));
            parts.push(self.type_expr(ty));
        }
        if !spec.values.is_empty() {
            parts.push(text(" = "));
            parts.push(self.expr_list(&spec.values));
        }
        concat(parts)
    }

    fn type_spec(&mut self, spec: &TypeSpec) -> FormatIR {
        let sep = if spec.alias { " = " } else { " " };
        concat(vec![
            text(format!("{}{sep}", spec.name)),
            self.type_expr(&spec.ty),
        ])
    }

    // ── Types ──────────────────────────────────────────────────────────

    pub(crate) fn type_expr(&mut self, ty: &TypeExpr) -> FormatIR {
        match ty {
            TypeExpr::Named { pkg, name, args } => {
                let mut parts = Vec::new();
                if let Some(pkg) = pkg {
                    parts.push(text(format!("{pkg}.")));
                }
                parts.push(text(name));
                if !args.is_empty() {
                    let args: Vec<FormatIR> = args.iter().map(|a| self.type_expr(a)).collect();
                    parts.push(text("["));
                    parts.push(join(args, text(", ")));
                    parts.push(text("]"));
                }
                concat(parts)
            }
            TypeExpr::Pointer(inner) => concat(vec![text("*"), self.type_expr(inner)]),
            TypeExpr::Slice(elem) => concat(vec![text("[]"), self.type_expr(elem)]),
            TypeExpr::Array { len, elem } => {
                let len = match len {
                    Some(len) => self.expr(len),
                    None => text("..."),
                };
                concat(vec![text("["), len, text("]"), self.type_expr(elem)])
            }
            TypeExpr::Map { key, value } => concat(vec![
                text("map["),
                self.type_expr(key),
                text("]"),
                self.type_expr(value),
            ]),
            TypeExpr::Chan { dir, elem } => {
                let prefix = match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                };
                concat(vec![text(prefix), self.type_expr(elem)])
            }
            TypeExpr::Func(sig) => concat(vec![text("func"), self.signature(sig)]),
            TypeExpr::Struct(fields) if fields.is_empty() => text("struct{}"),
            TypeExpr::Struct(fields) => {
                let fields: Vec<FormatIR> = fields.iter().map(|f| self.field(f)).collect();
                braced_lines("struct {", fields)
            }
            TypeExpr::Interface(elems) if elems.is_empty() => text("interface{}"),
            TypeExpr::Interface(elems) => {
                let elems: Vec<FormatIR> = elems
                    .iter()
                    .map(|e| match e {
                        InterfaceElem::Method { name, sig } => {
                            concat(vec![text(name), self.signature(sig)])
                        }
                        InterfaceElem::Embedded(ty) => self.type_expr(ty),
                    })
                    .collect();
                braced_lines("interface {", elems)
            }
        }
    }

    fn field(&mut self, field: &FieldDecl) -> FormatIR {
        let mut parts = Vec::new();
        if !field.names.is_empty() {
            parts.push(text(format!("{} ", field.names.join(", "))));
        }
        parts.push(self.type_expr(&field.ty));
        if let Some(tag) = &field.tag {
            parts.push(text(format!(" {tag}")));
        }
        concat(parts)
    }

    fn signature(&mut self, sig: &FuncType) -> FormatIR {
        let params: Vec<FormatIR> = sig.params.iter().map(|p| self.param(p)).collect();
        let mut parts = vec![delimited("(", params, ")")];
        match sig.results.as_slice() {
            [] => {}
            [single] if single.name.is_none() && !single.variadic => {
                parts.push(text(" "));
                parts.push(self.type_expr(&single.ty));
            }
            results => {
                let results: Vec<FormatIR> = results.iter().map(|p| self.param(p)).collect();
                parts.push(text(" "));
                parts.push(delimited("(", results, ")"));
            }
        }
        concat(parts)
    }

    fn param(&mut self, param: &Param) -> FormatIR {
        let mut parts = Vec::new();
        if let Some(name) = &param.name {
            parts.push(text(format!("{name} ")));
        }
        if param.variadic {
            parts.push(text("..."));
        }
        parts.push(self.type_expr(&param.ty));
        concat(parts)
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub(crate) fn block(&mut self, block: &Block) -> FormatIR {
        if block.stmts.is_empty() {
            return text("{}");
        }
        let stmts: Vec<FormatIR> = block.stmts.iter().map(|s| self.stmt(s)).collect();
        braced_lines("{", stmts)
    }

    /// Function literal body: on one line when it fits and holds no comments.
    fn func_lit_body(&mut self, block: &Block) -> FormatIR {
        let has_comments = block
            .stmts
            .iter()
            .any(|s| !s.markers.is_empty() || matches!(s.kind, StmtKind::Comment(_)));
        if block.stmts.is_empty() || has_comments {
            return self.block(block);
        }
        let stmts: Vec<FormatIR> = block.stmts.iter().map(|s| self.stmt(s)).collect();
        group(concat(vec![
            text("{"),
            indent(concat(vec![
                if_break(text(" "), hardline()),
                join(stmts, if_break(text("; "), hardline())),
            ])),
            if_break(text(" "), hardline()),
            text("}"),
        ]))
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt) -> FormatIR {
        let markers = self.markers(&stmt.markers);
        let anchor = self.anchor(stmt.origin);
        let body = self.stmt_kind(&stmt.kind);
        concat(vec![markers, anchor, body])
    }

    fn stmt_kind(&mut self, kind: &StmtKind) -> FormatIR {
        match kind {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Decl(decl) => self.gen_decl(decl),
            StmtKind::ShortVar { names, values } => concat(vec![
                text(format!("{} := ", names.join(", "))),
                self.expr_list(values),
            ]),
            StmtKind::Assign { lhs, op, rhs } => concat(vec![
                self.expr_list(lhs),
                text(format!(" {op} ")),
                self.expr_list(rhs),
            ]),
            StmtKind::IncDec { expr, inc } => {
                concat(vec![self.expr(expr), text(if *inc { "++" } else { "--" })])
            }
            StmtKind::Send { chan, value } => {
                concat(vec![self.expr(chan), text(" <- "), self.expr(value)])
            }
            StmtKind::Return(values) if values.is_empty() => text("return"),
            StmtKind::Return(values) => concat(vec![text("return "), self.expr_list(values)]),
            StmtKind::If(if_stmt) => self.if_stmt(if_stmt),
            StmtKind::For(for_stmt) => self.for_stmt(for_stmt),
            StmtKind::Switch(switch) => self.switch_stmt(switch),
            StmtKind::Block(block) => self.block(block),
            StmtKind::Break(label) => text(with_label("break", label)),
            StmtKind::Continue(label) => text(with_label("continue", label)),
            StmtKind::Goto(label) => text(format!("goto {label}")),
            StmtKind::Fallthrough => text("fallthrough"),
            StmtKind::Labeled { label, stmt } => {
                concat(vec![text(format!("{label}:")), hardline(), self.stmt(stmt)])
            }
            StmtKind::Go(expr) => concat(vec![text("go "), self.expr(expr)]),
            StmtKind::Defer(expr) => concat(vec![text("defer "), self.expr(expr)]),
            StmtKind::Comment(comment) => text(comment),
        }
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) -> FormatIR {
        let mut parts = vec![text("if ")];
        if let Some(init) = &if_stmt.init {
            parts.push(self.stmt_kind(&init.kind));
            parts.push(text("; "));
        }
        parts.push(self.expr(&if_stmt.cond));
        parts.push(text(" "));
        parts.push(self.block(&if_stmt.then));
        if let Some(els) = &if_stmt.els {
            parts.push(text(" else "));
            parts.push(match &els.kind {
                StmtKind::If(nested) => self.if_stmt(nested),
                StmtKind::Block(block) => self.block(block),
                other => self.stmt_kind(other),
            });
        }
        concat(parts)
    }

    fn for_stmt(&mut self, for_stmt: &ForStmt) -> FormatIR {
        let mut parts = vec![text("for ")];
        match &for_stmt.kind {
            ForKind::Infinite => {}
            ForKind::Cond(cond) => {
                parts.push(self.expr(cond));
                parts.push(text(" "));
            }
            ForKind::Clause { init, cond, post } => {
                if let Some(init) = init {
                    parts.push(self.stmt_kind(&init.kind));
                }
                parts.push(text("; "));
                if let Some(cond) = cond {
                    parts.push(self.expr(cond));
                }
                parts.push(text("; "));
                if let Some(post) = post {
                    parts.push(self.stmt_kind(&post.kind));
                    parts.push(text(" "));
                }
            }
            ForKind::Range {
                key,
                value,
                define,
                expr,
            } => {
                let vars: Vec<FormatIR> = [key, value]
                    .into_iter()
                    .flatten()
                    .map(|v| self.expr(v))
                    .collect();
                if !vars.is_empty() {
                    parts.push(join(vars, text(", ")));
                    parts.push(text(if *define { " := " } else { " = " }));
                }
                parts.push(text("range "));
                parts.push(self.expr(expr));
                parts.push(text(" "));
            }
        }
        parts.push(self.block(&for_stmt.body));
        concat(parts)
    }

    fn switch_stmt(&mut self, switch: &SwitchStmt) -> FormatIR {
        let mut parts = vec![text("switch ")];
        if let Some(init) = &switch.init {
            parts.push(self.stmt_kind(&init.kind));
            parts.push(text("; "));
        }
        if let Some(binding) = &switch.binding {
            parts.push(text(format!("{binding} := ")));
        }
        if let Some(tag) = &switch.tag {
            parts.push(self.expr(tag));
            parts.push(text(" "));
        }
        parts.push(text("{"));
        for clause in &switch.clauses {
            parts.push(hardline());
            parts.push(self.clause(clause));
        }
        parts.push(hardline());
        parts.push(text("}"));
        concat(parts)
    }

    fn clause(&mut self, clause: &CaseClause) -> FormatIR {
        let head = if clause.is_default {
            text("default:")
        } else {
            concat(vec![text("case "), self.expr_list(&clause.exprs), text(":")])
        };
        let body: Vec<FormatIR> = clause
            .body
            .iter()
            .flat_map(|s| [hardline(), self.stmt(s)])
            .collect();
        concat(vec![self.markers(&clause.markers), head, indent(concat(body))])
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr_list(&mut self, exprs: &[Expr]) -> FormatIR {
        let parts: Vec<FormatIR> = exprs.iter().map(|e| self.expr(e)).collect();
        join(parts, text(", "))
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> FormatIR {
        match &expr.kind {
            ExprKind::Ident(name) => text(name),
            ExprKind::Lit(lit) => text(&lit.text),
            ExprKind::Composite { ty, elems } => {
                let ty = match ty {
                    Some(ty) => self.type_expr(ty),
                    None => FormatIR::Empty,
                };
                let elems: Vec<FormatIR> = elems.iter().map(|e| self.element(e)).collect();
                concat(vec![ty, delimited("{", elems, "}")])
            }
            ExprKind::FuncLit { sig, body } => concat(vec![
                text("func"),
                self.signature(sig),
                text(" "),
                self.func_lit_body(body),
            ]),
            ExprKind::Unary { op, expr: operand } => {
                let needs_parens = match &operand.kind {
                    ExprKind::Binary { .. } => true,
                    ExprKind::Unary { op: inner, .. } => {
                        matches!((op, inner), (UnaryOp::Neg, UnaryOp::Neg) | (UnaryOp::Plus, UnaryOp::Plus))
                    }
                    ExprKind::Lit(lit) => {
                        matches!(op, UnaryOp::Neg | UnaryOp::Plus)
                            && lit.text.starts_with(['-', '+'])
                    }
                    _ => false,
                };
                concat(vec![text(op.as_str()), self.maybe_paren(operand, needs_parens)])
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let lhs_parens =
                    matches!(&lhs.kind, ExprKind::Binary { op: l, .. } if l.precedence() < prec);
                let rhs_parens =
                    matches!(&rhs.kind, ExprKind::Binary { op: r, .. } if r.precedence() <= prec);
                concat(vec![
                    self.maybe_paren(lhs, lhs_parens),
                    text(format!(" {} ", op.as_str())),
                    self.maybe_paren(rhs, rhs_parens),
                ])
            }
            ExprKind::Call {
                func,
                args,
                ellipsis,
            } => {
                let mut args: Vec<FormatIR> = args.iter().map(|a| self.expr(a)).collect();
                if *ellipsis {
                    if let Some(last) = args.pop() {
                        args.push(concat(vec![last, text("...")]));
                    }
                }
                concat(vec![self.postfix_base(func), delimited("(", args, ")")])
            }
            ExprKind::Selector { expr: base, name } => {
                concat(vec![self.postfix_base(base), text(format!(".{name}"))])
            }
            ExprKind::Index { expr: base, indices } => concat(vec![
                self.postfix_base(base),
                text("["),
                self.expr_list(indices),
                text("]"),
            ]),
            ExprKind::Slice {
                expr: base,
                low,
                high,
                max,
            } => {
                let mut parts = vec![self.postfix_base(base), text("[")];
                if let Some(low) = low {
                    parts.push(self.expr(low));
                }
                parts.push(text(":"));
                if let Some(high) = high {
                    parts.push(self.expr(high));
                }
                if let Some(max) = max {
                    parts.push(text(":"));
                    parts.push(self.expr(max));
                }
                parts.push(text("]"));
                concat(parts)
            }
            ExprKind::TypeAssert { expr: base, ty } => {
                let ty = match ty {
                    Some(ty) => self.type_expr(ty),
                    None => text("type"),
                };
                concat(vec![self.postfix_base(base), text(".("), ty, text(")")])
            }
            ExprKind::Paren(inner) => concat(vec![text("("), self.expr(inner), text(")")]),
            ExprKind::Type(ty) => self.type_expr(ty),
        }
    }

    fn element(&mut self, elem: &Element) -> FormatIR {
        match &elem.key {
            Some(key) => concat(vec![self.expr(key), text(": "), self.expr(&elem.value)]),
            None => self.expr(&elem.value),
        }
    }

    fn maybe_paren(&mut self, expr: &Expr, parens: bool) -> FormatIR {
        if parens {
            concat(vec![text("("), self.expr(expr), text(")")])
        } else {
            self.expr(expr)
        }
    }

    /// Operand of a selector, call, index, or assertion.
    fn postfix_base(&mut self, expr: &Expr) -> FormatIR {
        let parens = match &expr.kind {
            ExprKind::Unary { .. } | ExprKind::Binary { .. } => true,
            ExprKind::Type(ty) => matches!(**ty, TypeExpr::Pointer(_) | TypeExpr::Func(_)),
            _ => false,
        };
        self.maybe_paren(expr, parens)
    }
}

fn braced_lines(open: &str, lines: Vec<FormatIR>) -> FormatIR {
    concat(vec![
        text(open),
        indent(concat(lines.into_iter().flat_map(|l| [hardline(), l]).collect())),
        hardline(),
        text("}"),
    ])
}

fn import_spec(import: &Import) -> String {
    match &import.alias {
        Some(alias) => format!("{alias} \"{}\"", import.path),
        None => format!("\"{}\"", import.path),
    }
}

fn with_label(keyword: &str, label: &Option<String>) -> String {
    match label {
        Some(label) => format!("{keyword} {label}"),
        None => keyword.to_string(),
    }
}
