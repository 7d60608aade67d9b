//! Pattern-match transform.
//!
//! Discovery indexes every skeleton left by the preprocessor (see
//! [`index::ParentIndex`]). The transform walks the tree with type
//! inference in scope and, at each dispatch `switch`:
//!
//! 1. consumes the site's markers and checks the skeleton against the index,
//! 2. lowers matches nested in the arm bodies first, with the arm bindings
//!    typed from the scrutinee columns,
//! 3. resolves the arms against the scrutinee unions, reports redundant arms
//!    and exhaustiveness gaps, and compiles a decision tree,
//! 4. replaces the dispatch with the generated code. The hoisted
//!    `__scrutN := expr` bindings stay in front of it; a binding nothing
//!    reads becomes `_ = expr`, so the scrutinee is still evaluated once.
//!
//! An assignment-form match without a type annotation declares its variable
//! as `var x __sable_infer`; the placeholder is replaced by the type of the
//! first arm value inference can type.

pub mod index;
pub mod lower;

pub use index::{ListId, ParentIndex, SiteEntry, StmtPos};
pub use lower::Arm;

use sable_common::marker::INFER_PLACEHOLDER;
use sable_common::{Marker, MarkerPayload, MatchTarget};
use sable_syntax::ast::{
    CaseClause, Decl, DeclKind, Expr, ExprKind, ForKind, FuncType, GenDecl, SourceFile, Stmt, StmtKind, TypeExpr,
};
use sable_syntax::visit::{walk_expr, walk_gen_decl, walk_stmt, VisitMut};

use crate::error::{Diagnostic, DiagnosticCode, LowerError, Violation};
use crate::pattern::compile::compile_match;
use crate::pattern::usefulness::check_coverage;
use crate::pattern::{binding_types, resolve_arm, MatchRow};
use crate::plugin::{LowerContext, Plugin};
use lower::Emitter;

#[derive(Debug, Default)]
pub struct MatchPlugin {
    index: Option<ParentIndex>,
}

impl MatchPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for MatchPlugin {
    fn name(&self) -> &'static str {
        "match"
    }

    fn discover(&mut self, file: &SourceFile, _cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        let index = ParentIndex::build(file)?;
        tracing::debug!(sites = index.len(), lists = index.list_count(), "match sites discovered");
        self.index = Some(index);
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn transform(&mut self, file: &mut SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        let index = match self.index.take() {
            Some(index) => index,
            None => ParentIndex::build(file)?,
        };
        if index.is_empty() {
            return Ok(());
        }
        let mut lowering = Lowering {
            cx,
            index: &index,
            lists: 0,
            targets: Vec::new(),
            error: None,
            lowered: 0,
        };
        lowering.visit_file(file);
        if let Some(err) = lowering.error {
            return Err(err);
        }
        tracing::debug!(lowered = lowering.lowered, "matches lowered");
        Ok(())
    }
}

/// An assignment target still typed with the placeholder.
struct PendingTarget {
    name: String,
    ty: Option<TypeExpr>,
}

struct Lowering<'a, 'cx> {
    cx: &'a mut LowerContext<'cx>,
    index: &'a ParentIndex,
    /// Next list id; advances exactly as discovery did.
    lists: u32,
    targets: Vec<PendingTarget>,
    error: Option<LowerError>,
    lowered: usize,
}

impl Lowering<'_, '_> {
    fn next_list(&mut self) -> ListId {
        let id = ListId(self.lists);
        self.lists += 1;
        id
    }

    fn list(&mut self, list: ListId, stmts: &mut Vec<Stmt>) {
        for i in 0..stmts.len() {
            if self.error.is_some() {
                return;
            }
            self.observe_target_value(&stmts[i]);
            match dispatch_id(&stmts[i]) {
                Some(match_id) => {
                    if let Err(err) = self.site(list, stmts, i, match_id) {
                        self.error.get_or_insert(err);
                        return;
                    }
                }
                None => self.visit_stmt(&mut stmts[i]),
            }
            self.cx.infer.observe_stmt(&stmts[i]);
        }
    }

    /// Record the type of a value assigned to a pending target.
    fn observe_target_value(&mut self, stmt: &Stmt) {
        let StmtKind::Assign { lhs, op, rhs } = &stmt.kind else {
            return;
        };
        if op != "=" || lhs.len() != 1 || rhs.len() != 1 {
            return;
        }
        let Some(name) = lhs[0].as_ident() else {
            return;
        };
        let Some(pos) = self.targets.iter().rposition(|t| t.name == name) else {
            return;
        };
        if self.targets[pos].ty.is_some() {
            return;
        }
        let ty = self.cx.infer.infer(&rhs[0]).into_type().filter(|ty| !is_placeholder(ty));
        if let Some(ty) = ty {
            tracing::trace!(variable = name, ty = %sable_syntax::print_type(&ty), "match target typed");
            self.targets[pos].ty = Some(ty);
        }
    }

    /// Lower the match whose dispatch is `stmts[at]`.
    fn site(&mut self, list: ListId, stmts: &mut [Stmt], at: usize, match_id: u32) -> Result<(), LowerError> {
        let entry = self
            .index
            .site(match_id)
            .cloned()
            .ok_or_else(|| LowerError::marker(Violation::Dangling, None, None, format!("match {match_id} was not discovered"), None))?;
        if entry.dispatch != Some(StmtPos { list, index: at }) {
            return Err(LowerError::marker(
                Violation::Malformed,
                None,
                None,
                format!("match {match_id} moved after discovery"),
                Some(entry.origin),
            ));
        }
        let arity = entry.arity;
        let first = at - arity;

        let dispatch_marker = take_marker(&mut stmts[at], match_id)?;
        self.cx.ledger.consume(&dispatch_marker)?;
        let mut scrutinees = Vec::with_capacity(arity);
        for stmt in &mut stmts[first..at] {
            let marker = take_marker(stmt, match_id)?;
            self.cx.ledger.consume(&marker)?;
            match &stmt.kind {
                StmtKind::ShortVar { names, values } if names.len() == 1 && values.len() == 1 => {
                    scrutinees.push(names[0].clone());
                }
                _ => return Err(malformed(&marker, "scrutinee is not a single `:=` binding")),
            }
        }
        let mut placeholder = None;
        if let Some(decl) = entry.target_decl {
            let marker = take_marker(&mut stmts[decl.index], match_id)?;
            self.cx.ledger.consume(&marker)?;
            if let Some(name) = placeholder_var(&stmts[decl.index]) {
                placeholder = Some(decl.index);
                self.targets.push(PendingTarget { name, ty: None });
            }
        }
        let columns: Vec<Option<TypeExpr>> = scrutinees.iter().map(|n| self.cx.infer.lookup(n).cloned()).collect();

        let StmtKind::Switch(switch) = &mut stmts[at].kind else {
            return Err(malformed(&dispatch_marker, "dispatch is not a `switch`"));
        };
        let clauses = std::mem::take(&mut switch.clauses);
        let mut arms = Vec::with_capacity(clauses.len());
        self.cx.infer.push_scope();
        for clause in clauses {
            arms.push(self.arm_clause(clause, match_id, &columns, &entry.target)?);
        }
        self.cx.infer.pop_scope();
        if self.error.is_some() {
            return Ok(());
        }
        arms.sort_by_key(|arm| arm.index);

        if let Some(decl_index) = placeholder {
            let resolved = self.targets.pop().and_then(|t| t.ty);
            self.resolve_target(&mut stmts[decl_index], resolved, &entry);
        }

        let rows = self.rows(&arms, &columns)?;
        let coverage = check_coverage(&rows, arity, self.cx.catalog);
        for index in &coverage.redundant {
            let arm = &arms[*index];
            self.cx.diagnose(Diagnostic::warning(
                DiagnosticCode::RedundantArm,
                format!("unreachable match arm `{}`", arm.pattern),
                Some(arm.origin),
            ));
        }
        if !coverage.is_exhaustive() {
            let mut diagnostic = Diagnostic::warning(
                DiagnosticCode::ExhaustivenessGap,
                "non-exhaustive match: a runtime fallback was inserted",
                Some(entry.origin),
            );
            for witness in &coverage.missing {
                diagnostic = diagnostic.with_note(format!("missing `{witness}`"));
            }
            self.cx.diagnose(diagnostic);
        }

        let tree = compile_match(&rows, arity, self.cx.catalog).map_err(|message| LowerError::InvalidPattern {
            message,
            origin: entry.origin,
        })?;
        let mut emitter = Emitter::new(&scrutinees, &arms, self.cx.catalog, entry.origin.line);
        let mut lowered = emitter.root(&tree);
        lowered.origin = Some(dispatch_marker.origin);
        lowered.span = stmts[at].span;
        stmts[at] = lowered;

        for (slot, stmt) in stmts[first..at].iter_mut().enumerate() {
            if emitter.uses_slot(slot) {
                continue;
            }
            if let StmtKind::ShortVar { values, .. } = &mut stmt.kind {
                let value = values.remove(0);
                stmt.kind = StmtKind::Assign {
                    lhs: vec![Expr::ident("_")],
                    op: "=".into(),
                    rhs: vec![value],
                };
            }
        }
        self.lowered += 1;
        tracing::debug!(match_id, arms = arms.len(), fallbacks = emitter.fallbacks(), "match lowered");
        Ok(())
    }

    /// Walk one arm clause in the arm's scope, then recover the arm.
    fn arm_clause(
        &mut self,
        mut clause: CaseClause,
        match_id: u32,
        columns: &[Option<TypeExpr>],
        target: &MatchTarget,
    ) -> Result<Arm, LowerError> {
        let position = clause
            .markers
            .iter()
            .position(|m| matches!(&m.payload, MarkerPayload::Arm { match_id: id, .. } if *id == match_id));
        let Some(position) = position else {
            return Err(LowerError::marker(
                Violation::Missing,
                None,
                None,
                format!("a clause of match {match_id} has no arm marker"),
                None,
            ));
        };
        let marker = clause.markers.remove(position);
        self.cx.ledger.consume(&marker)?;

        for expr in &mut clause.exprs {
            self.visit_expr(expr);
        }
        let id = self.next_list();
        self.cx.infer.push_scope();
        if let MarkerPayload::Arm { pattern, .. } = &marker.payload {
            for (name, ty) in binding_types(pattern, columns, self.cx.catalog) {
                self.cx.infer.bind(&name, ty);
            }
        }
        self.list(id, &mut clause.body);
        self.cx.infer.pop_scope();
        Arm::from_clause(clause, &marker, target)
    }

    fn rows(&self, arms: &[Arm], columns: &[Option<TypeExpr>]) -> Result<Vec<MatchRow>, LowerError> {
        let untyped = columns.iter().all(Option::is_none);
        let mut rows = Vec::new();
        for arm in arms {
            let resolved = resolve_arm(&arm.pattern, columns, self.cx.catalog).map_err(|message| {
                if untyped {
                    LowerError::UnresolvedUnion {
                        message,
                        origin: arm.origin,
                    }
                } else {
                    LowerError::InvalidPattern {
                        message,
                        origin: arm.origin,
                    }
                }
            })?;
            rows.extend(resolved.into_iter().map(|pats| MatchRow {
                pats,
                arm_index: arm.index,
                guarded: arm.guard.is_some(),
            }));
        }
        Ok(rows)
    }

    /// Replace the placeholder type of `var x __sable_infer`.
    fn resolve_target(&mut self, decl: &mut Stmt, resolved: Option<TypeExpr>, entry: &SiteEntry) {
        let StmtKind::Decl(GenDecl::Var { specs, .. }) = &mut decl.kind else {
            return;
        };
        let name = specs[0].names[0].clone();
        match resolved {
            Some(ty) => {
                self.cx.infer.bind(&name, Some(ty.clone()));
                specs[0].ty = Some(ty);
            }
            None => self.cx.diagnose(
                Diagnostic::error(
                    DiagnosticCode::NeedsAnnotation,
                    format!("cannot infer the type of `{name}` from the match arms; add a type annotation"),
                    Some(entry.origin),
                )
                .with_span(decl.span),
            ),
        }
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.cx.infer.push_scope();
        f(self);
        self.cx.infer.pop_scope();
    }
}

impl VisitMut for Lowering<'_, '_> {
    fn visit_decl(&mut self, decl: &mut Decl) {
        match &mut decl.kind {
            DeclKind::Func(func) => {
                let Some(body) = &mut func.body else {
                    return;
                };
                self.cx.infer.enter_function(func.recv.as_ref(), &func.sig);
                self.visit_block(body);
                self.cx.infer.exit_function();
            }
            DeclKind::Gen(gen) => walk_gen_decl(self, gen),
            DeclKind::Comment(_) => {}
        }
    }

    fn visit_block(&mut self, block: &mut sable_syntax::ast::Block) {
        let id = self.next_list();
        self.scoped(|this| this.list(id, &mut block.stmts));
    }

    fn visit_clause(&mut self, clause: &mut CaseClause) {
        for expr in &mut clause.exprs {
            self.visit_expr(expr);
        }
        let id = self.next_list();
        self.scoped(|this| this.list(id, &mut clause.body));
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::If(if_stmt) => self.scoped(|this| {
                if let Some(init) = &mut if_stmt.init {
                    this.visit_stmt(init);
                    this.cx.infer.observe_stmt(init);
                }
                this.visit_expr(&mut if_stmt.cond);
                this.visit_block(&mut if_stmt.then);
                if let Some(els) = &mut if_stmt.els {
                    this.visit_stmt(els);
                }
            }),
            StmtKind::For(for_stmt) => self.scoped(|this| {
                match &mut for_stmt.kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(cond) => this.visit_expr(cond),
                    ForKind::Clause { init, cond, post } => {
                        if let Some(init) = init {
                            this.visit_stmt(init);
                            this.cx.infer.observe_stmt(init);
                        }
                        if let Some(cond) = cond {
                            this.visit_expr(cond);
                        }
                        if let Some(post) = post {
                            this.visit_stmt(post);
                        }
                    }
                    ForKind::Range { expr, .. } => this.visit_expr(expr),
                }
                this.cx.infer.observe_range(&for_stmt.kind);
                this.visit_block(&mut for_stmt.body);
            }),
            StmtKind::Switch(switch) => self.scoped(|this| {
                if let Some(init) = &mut switch.init {
                    this.visit_stmt(init);
                    this.cx.infer.observe_stmt(init);
                }
                if let Some(tag) = &mut switch.tag {
                    this.visit_expr(tag);
                }
                for clause in &mut switch.clauses {
                    this.visit_clause(clause);
                }
            }),
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::FuncLit { sig, body } = &mut expr.kind {
            self.cx.infer.enter_function(None, sig);
            self.visit_block(body);
            self.cx.infer.exit_function();
            return;
        }
        walk_expr(self, expr);
    }

    fn visit_type(&mut self, _ty: &mut TypeExpr) {}

    fn visit_signature(&mut self, _sig: &mut FuncType) {}
}

fn dispatch_id(stmt: &Stmt) -> Option<u32> {
    stmt.markers.iter().find_map(|m| match &m.payload {
        MarkerPayload::Dispatch { match_id, .. } => Some(*match_id),
        _ => None,
    })
}

/// Remove and return the marker of `match_id` attached to `stmt`.
fn take_marker(stmt: &mut Stmt, match_id: u32) -> Result<Marker, LowerError> {
    match stmt.markers.iter().position(|m| m.payload.match_id() == Some(match_id)) {
        Some(position) => Ok(stmt.markers.remove(position)),
        None => Err(LowerError::marker(
            Violation::Missing,
            None,
            None,
            format!("statement of match {match_id} lost its marker"),
            stmt.origin,
        )),
    }
}

fn malformed(marker: &Marker, detail: &str) -> LowerError {
    LowerError::marker(
        Violation::Malformed,
        Some(marker.id),
        Some(marker.kind()),
        detail,
        Some(marker.origin),
    )
}

fn is_placeholder(ty: &TypeExpr) -> bool {
    ty.as_simple_name() == Some(INFER_PLACEHOLDER)
}

/// Name of `var x __sable_infer`.
fn placeholder_var(stmt: &Stmt) -> Option<String> {
    match &stmt.kind {
        StmtKind::Decl(GenDecl::Var { specs, .. }) if specs.len() == 1 && specs[0].names.len() == 1 => {
            specs[0].ty.as_ref().filter(|ty| is_placeholder(ty))?;
            Some(specs[0].names[0].clone())
        }
        _ => None,
    }
}
