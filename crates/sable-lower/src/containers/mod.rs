//! Container plugin: `Result[T, E]` and `Option[T]`.
//!
//! The transform runs in two steps. First every container type in the file
//! (and in declarations already queued by the enum plugin) is renamed to its
//! instantiation, `Result[int, error]` becoming `Result_int_error`, and each
//! instantiation is declared through the registry. Then constructor calls
//! are rewritten to struct literals:
//!
//! ```text
//! return Ok(42)
//! // becomes
//! return Result_int_error{tag: ResultTagOk, ok0: func() *int { __tmp0 := 42; return &__tmp0 }()}
//! ```
//!
//! The instantiation of a constructor comes from the expected type at its
//! position when there is one (declared variable, assignment target,
//! function result, parameter, field or element type), and from the type of
//! the payload otherwise. `Err(e)` and `None` have no payload to go by, so
//! without an expected type they are reported as needing an annotation.

mod helpers;

pub use crate::shape::Instantiation;
pub use helpers::helper_decls;

use sable_common::marker::INFER_PLACEHOLDER;
use sable_common::{MarkerPayload, MatchTarget};
use sable_syntax::ast::{
    Block, CaseClause, DeclKind, Expr, ExprKind, ForKind, FuncType, GenDecl, Param, SourceFile, Stmt, StmtKind,
    TypeExpr,
};
use sable_syntax::visit::{walk_type, VisitMut};
use sable_syntax::walk::{self, Visit};
use sable_typeck::address_of;

use crate::error::{Diagnostic, DiagnosticCode, LowerError};
use crate::pattern::binding_types;
use crate::plugin::{declare_shape, LowerContext, LowerOptions, Plugin};
use crate::registry::DeclKey;
use crate::shape::{payload_field, UnionCatalog, OPTION, RESULT};
use crate::{synth, tagged};

#[derive(Debug, Default)]
pub struct ContainerPlugin {
    sites: usize,
}

impl ContainerPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for ContainerPlugin {
    fn name(&self) -> &'static str {
        "container"
    }

    fn discover(&mut self, file: &SourceFile, _cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        let mut sites = Sites::default();
        sites.visit_file(file);
        self.sites = sites.count;
        tracing::debug!(sites = self.sites, "container sites discovered");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(sites = self.sites))]
    fn transform(&mut self, file: &mut SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        let mut types = FamilyTypes::default();
        types.visit_file(file);
        for decl in cx.registry.pending_mut() {
            types.visit_decl(decl);
        }
        for shape in cx.catalog.enums_mut() {
            for variant in &mut shape.variants {
                for field in &mut variant.fields {
                    types.visit_type(&mut field.ty);
                }
            }
        }
        for (family, args) in &types.needed {
            ensure_instance(cx, family, args)?;
        }
        tracing::debug!(types = types.needed.len(), "container types renamed");

        cx.refresh(file);
        let mut ctors = Constructors {
            cx,
            error: None,
            rewritten: 0,
        };
        ctors.file(file);
        if let Some(err) = ctors.error {
            return Err(err);
        }
        tracing::debug!(rewritten = ctors.rewritten, "constructors rewritten");
        Ok(())
    }
}

/// Helper signatures to declare to inference, when helpers are emitted.
pub(crate) fn helper_signatures(catalog: &UnionCatalog, options: &LowerOptions) -> Vec<(String, String, FuncType)> {
    if !options.emit_helpers {
        return Vec::new();
    }
    helpers::helper_signatures(catalog)
}

/// Type parameter count of a container family.
fn family_arity(name: &str) -> Option<usize> {
    match name {
        RESULT => Some(2),
        OPTION => Some(1),
        _ => None,
    }
}

/// Instantiate `family[args]` and queue its declarations. Returns the
/// instantiation name, or `None` for a wrong argument count.
pub(crate) fn ensure_instance(
    cx: &mut LowerContext<'_>,
    family: &str,
    args: &[TypeExpr],
) -> Result<Option<String>, LowerError> {
    let Some((shape, fresh)) = cx.catalog.instantiate(family, args) else {
        return Ok(None);
    };
    let shape = shape.clone();
    if fresh {
        declare_shape(cx.infer, &shape);
        if cx.options.emit_helpers {
            if let Some(instance) = cx.catalog.instance(&shape.name) {
                for decl in helper_decls(instance, cx.catalog)? {
                    if let DeclKind::Func(func) = decl.kind {
                        cx.infer.declare_method(&shape.name, &func.name, func.sig);
                    }
                }
            }
        }
        tracing::debug!(instance = %shape.name, "container instantiated");
    }

    let key = DeclKey::Tag(family.to_string());
    if !cx.registry.contains(&key) {
        if let Some(family_shape) = cx.catalog.get(family) {
            let decls = tagged::tag_decls(family_shape);
            cx.registry.request::<LowerError>(key, || Ok(decls))?;
        }
    }
    cx.registry
        .request::<LowerError>(DeclKey::Union(shape.name.clone()), || Ok(vec![tagged::struct_decl(&shape)]))?;
    if cx.options.emit_helpers {
        let catalog = &*cx.catalog;
        if let Some(instance) = catalog.instance(&shape.name) {
            cx.registry
                .request(DeclKey::Helpers(shape.name.clone()), || helper_decls(instance, catalog))?;
        }
    }
    Ok(Some(shape.name))
}

fn is_placeholder(ty: &TypeExpr) -> bool {
    ty.as_simple_name() == Some(INFER_PLACEHOLDER)
}

// ── Discovery ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Sites {
    count: usize,
}

impl<'ast> Visit<'ast> for Sites {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::Call { func, .. } if matches!(func.as_ident(), Some("Ok" | "Err" | "Some")) => self.count += 1,
            ExprKind::Ident(name) if name == "None" => self.count += 1,
            _ => {}
        }
        walk::walk_expr(self, expr);
    }

    fn visit_type(&mut self, ty: &'ast TypeExpr) {
        if let TypeExpr::Named { pkg: None, name, args } = ty {
            if !args.is_empty() && UnionCatalog::is_family(name) {
                self.count += 1;
            }
        }
        walk::walk_type(self, ty);
    }
}

// ── Type renaming ──────────────────────────────────────────────────────

/// Renames container types bottom-up and records the instantiations, inner
/// ones first.
#[derive(Default)]
struct FamilyTypes {
    needed: Vec<(String, Vec<TypeExpr>)>,
}

impl VisitMut for FamilyTypes {
    fn visit_type(&mut self, ty: &mut TypeExpr) {
        walk_type(self, ty);
        let TypeExpr::Named { pkg: None, name, args } = ty else {
            return;
        };
        if family_arity(name) != Some(args.len()) {
            return;
        }
        let instance = sable_typeck::mangle(name, args);
        let entry = (name.clone(), args.clone());
        if !self.needed.contains(&entry) {
            self.needed.push(entry);
        }
        *ty = TypeExpr::named(instance);
    }
}

// ── Constructor rewriting ──────────────────────────────────────────────

struct Constructors<'a, 'cx> {
    cx: &'a mut LowerContext<'cx>,
    error: Option<LowerError>,
    rewritten: usize,
}

impl Constructors<'_, '_> {
    fn file(&mut self, file: &mut SourceFile) {
        for decl in &mut file.decls {
            match &mut decl.kind {
                DeclKind::Func(func) => {
                    let Some(body) = &mut func.body else {
                        continue;
                    };
                    self.cx.infer.enter_function(func.recv.as_ref(), &func.sig);
                    self.block(body);
                    self.cx.infer.exit_function();
                }
                DeclKind::Gen(gen) => self.gen_decl(gen),
                DeclKind::Comment(_) => {}
            }
        }
    }

    fn gen_decl(&mut self, gen: &mut GenDecl) {
        match gen {
            GenDecl::Var { specs, .. } | GenDecl::Const { specs, .. } => {
                for spec in specs {
                    let expected = spec.ty.as_ref().filter(|ty| !is_placeholder(ty));
                    for value in &mut spec.values {
                        self.expr(value, expected);
                    }
                }
            }
            GenDecl::Type { .. } => {}
        }
    }

    fn block(&mut self, block: &mut Block) {
        self.cx.infer.push_scope();
        self.stmts(&mut block.stmts);
        self.cx.infer.pop_scope();
    }

    fn stmts(&mut self, stmts: &mut [Stmt]) {
        for i in 0..stmts.len() {
            let (before, rest) = stmts.split_at_mut(i);
            let stmt = &mut rest[0];
            match dispatch_of(stmt) {
                Some((arity, target)) => {
                    let columns = self.scrutinee_columns(before, stmt, arity);
                    self.dispatch(stmt, &columns, &target);
                }
                None => self.stmt(stmt),
            }
            self.cx.infer.observe_stmt(&stmts[i]);
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => self.expr(expr, None),
            StmtKind::IncDec { expr, .. } => self.expr(expr, None),
            StmtKind::Decl(gen) => self.gen_decl(gen),
            StmtKind::ShortVar { values, .. } => {
                for value in values {
                    self.expr(value, None);
                }
            }
            StmtKind::Assign { lhs, op, rhs } => {
                let pairwise = op == "=" && lhs.len() == rhs.len();
                for (i, value) in rhs.iter_mut().enumerate() {
                    let expected = if pairwise { self.target_type(&lhs[i]) } else { None };
                    self.expr(value, expected.as_ref());
                }
                for target in lhs {
                    self.expr(target, None);
                }
            }
            StmtKind::Send { chan, value } => {
                let elem = match self.cx.infer.infer(chan).into_type().map(|t| self.cx.infer.underlying(&t)) {
                    Some(TypeExpr::Chan { elem, .. }) => Some(*elem),
                    _ => None,
                };
                self.expr(chan, None);
                self.expr(value, elem.as_ref());
            }
            StmtKind::Return(values) => {
                let results = self
                    .cx
                    .infer
                    .current_results()
                    .filter(|r| r.len() == values.len())
                    .map(<[TypeExpr]>::to_vec)
                    .unwrap_or_default();
                for (i, value) in values.iter_mut().enumerate() {
                    self.expr(value, results.get(i));
                }
            }
            StmtKind::If(if_stmt) => {
                self.cx.infer.push_scope();
                if let Some(init) = &mut if_stmt.init {
                    self.stmt(init);
                    self.cx.infer.observe_stmt(init);
                }
                self.expr(&mut if_stmt.cond, None);
                self.block(&mut if_stmt.then);
                if let Some(els) = &mut if_stmt.els {
                    self.stmt(els);
                }
                self.cx.infer.pop_scope();
            }
            StmtKind::For(for_stmt) => {
                self.cx.infer.push_scope();
                match &mut for_stmt.kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(cond) => self.expr(cond, None),
                    ForKind::Clause { init, cond, post } => {
                        if let Some(init) = init {
                            self.stmt(init);
                            self.cx.infer.observe_stmt(init);
                        }
                        if let Some(cond) = cond {
                            self.expr(cond, None);
                        }
                        if let Some(post) = post {
                            self.stmt(post);
                        }
                    }
                    ForKind::Range { expr, .. } => self.expr(expr, None),
                }
                self.cx.infer.observe_range(&for_stmt.kind);
                self.block(&mut for_stmt.body);
                self.cx.infer.pop_scope();
            }
            StmtKind::Switch(switch) => {
                self.cx.infer.push_scope();
                if let Some(init) = &mut switch.init {
                    self.stmt(init);
                    self.cx.infer.observe_stmt(init);
                }
                if let Some(tag) = &mut switch.tag {
                    self.expr(tag, None);
                }
                for clause in &mut switch.clauses {
                    self.clause(clause, None);
                }
                self.cx.infer.pop_scope();
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt),
            StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Goto(_)
            | StmtKind::Fallthrough
            | StmtKind::Comment(_) => {}
        }
    }

    /// A skeleton `switch` left by the preprocessor. Arm bindings are typed
    /// from the scrutinee columns so payload values inside arm bodies can be
    /// inferred.
    fn dispatch(&mut self, stmt: &mut Stmt, columns: &[Option<TypeExpr>], target: &MatchTarget) {
        let StmtKind::Switch(switch) = &mut stmt.kind else {
            return self.stmt(stmt);
        };
        self.cx.infer.push_scope();
        if let Some(tag) = &mut switch.tag {
            self.expr(tag, None);
        }
        if let MatchTarget::Assign { name, .. } = target {
            let known = self.cx.infer.lookup(name).is_some_and(|ty| !is_placeholder(ty));
            if !known {
                self.infer_target(name, &switch.clauses);
            }
        }
        for clause in &mut switch.clauses {
            self.clause(clause, Some(columns));
        }
        self.cx.infer.pop_scope();
    }

    fn clause(&mut self, clause: &mut CaseClause, columns: Option<&[Option<TypeExpr>]>) {
        self.cx.infer.push_scope();
        if let Some(columns) = columns {
            for marker in &clause.markers {
                if let MarkerPayload::Arm { pattern, .. } = &marker.payload {
                    for (name, ty) in binding_types(pattern, columns, self.cx.catalog) {
                        self.cx.infer.bind(&name, ty);
                    }
                }
            }
        }
        for expr in &mut clause.exprs {
            self.expr(expr, None);
        }
        self.stmts(&mut clause.body);
        self.cx.infer.pop_scope();
    }

    /// Types of the hoisted scrutinee bindings in front of a dispatch.
    fn scrutinee_columns(&mut self, before: &[Stmt], dispatch: &Stmt, arity: usize) -> Vec<Option<TypeExpr>> {
        if let StmtKind::Switch(switch) = &dispatch.kind {
            if let Some(name) = switch.tag.as_ref().and_then(Expr::as_ident) {
                return vec![self.cx.infer.lookup(name).cloned()];
            }
        }
        let start = before.len().saturating_sub(arity);
        before[start..]
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::ShortVar { names, .. } => names.first().and_then(|n| self.cx.infer.lookup(n).cloned()),
                _ => None,
            })
            .collect()
    }

    /// Give an unannotated match target the container type of one of the
    /// values assigned to it, so the other arms have an expected type.
    fn infer_target(&mut self, name: &str, clauses: &[CaseClause]) {
        let mut values = Vec::new();
        for clause in clauses {
            assigned_values(name, &clause.body, &mut values);
        }
        for value in values {
            let Some(TypeExpr::Named { pkg: None, name: family, args }) = self.cx.infer.infer(value).into_type()
            else {
                continue;
            };
            if family_arity(&family) != Some(args.len()) {
                continue;
            }
            match ensure_instance(self.cx, &family, &args) {
                Ok(Some(instance)) => {
                    tracing::trace!(variable = name, %instance, "match target typed from an arm");
                    self.cx.infer.bind(name, Some(TypeExpr::named(instance)));
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    self.error.get_or_insert(err);
                    return;
                }
            }
        }
    }

    fn target_type(&mut self, target: &Expr) -> Option<TypeExpr> {
        let ty = match target.as_ident() {
            Some(name) => self.cx.infer.lookup(name).cloned(),
            None => self.cx.infer.infer(target).into_type(),
        };
        ty.filter(|t| !is_placeholder(t))
    }

    fn expr(&mut self, expr: &mut Expr, expected: Option<&TypeExpr>) {
        if self.constructor(expr, expected) {
            return;
        }
        match &mut expr.kind {
            ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Type(_) => {}
            ExprKind::Call { func, args, ellipsis } => {
                let params = self.cx.infer.callee_params(func);
                let append_elem = match func.as_ident() {
                    Some("append") if !self.cx.infer.is_bound("append") && !args.is_empty() => {
                        match self.cx.infer.infer(&args[0]).into_type().map(|t| self.cx.infer.underlying(&t)) {
                            Some(TypeExpr::Slice(elem)) => Some(*elem),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                self.expr(func, None);
                for (i, arg) in args.iter_mut().enumerate() {
                    let expected = match &append_elem {
                        Some(elem) if i > 0 && !*ellipsis => Some(elem.clone()),
                        _ => params.as_deref().and_then(|p| param_type(p, i, *ellipsis)),
                    };
                    self.expr(arg, expected.as_ref());
                }
            }
            ExprKind::Composite { ty, elems } => {
                let declared = ty.as_deref().or(expected).cloned();
                let shape = declared.as_ref().map(|t| self.cx.infer.underlying(t));
                for elem in elems {
                    let expected = match &shape {
                        Some(TypeExpr::Struct(_)) => {
                            let field = elem.key.as_ref().and_then(Expr::as_ident);
                            field.and_then(|f| shape.as_ref().and_then(|s| self.cx.infer.field_type(s, f)))
                        }
                        Some(TypeExpr::Slice(elem_ty)) | Some(TypeExpr::Array { elem: elem_ty, .. }) => {
                            Some((**elem_ty).clone())
                        }
                        Some(TypeExpr::Map { value, .. }) => Some((**value).clone()),
                        _ => None,
                    };
                    if !matches!(shape, Some(TypeExpr::Struct(_))) {
                        if let Some(key) = &mut elem.key {
                            self.expr(key, None);
                        }
                    }
                    self.expr(&mut elem.value, expected.as_ref());
                }
            }
            ExprKind::FuncLit { sig, body } => {
                self.cx.infer.enter_function(None, sig);
                self.block(body);
                self.cx.infer.exit_function();
            }
            ExprKind::Paren(inner) => self.expr(inner, expected),
            ExprKind::Unary { expr: inner, .. } | ExprKind::Selector { expr: inner, .. } => self.expr(inner, None),
            ExprKind::TypeAssert { expr: inner, .. } => self.expr(inner, None),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, None);
                self.expr(rhs, None);
            }
            ExprKind::Index { expr: base, indices } => {
                self.expr(base, None);
                for index in indices {
                    self.expr(index, None);
                }
            }
            ExprKind::Slice {
                expr: base,
                low,
                high,
                max,
            } => {
                self.expr(base, None);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(bound, None);
                }
            }
        }
    }

    /// Rewrite `Ok(v)`, `Err(e)`, `Some(v)` or `None`. Returns false when
    /// `expr` is not a constructor use.
    fn constructor(&mut self, expr: &mut Expr, expected: Option<&TypeExpr>) -> bool {
        let variant = match &expr.kind {
            ExprKind::Call {
                func,
                args,
                ellipsis: false,
            } if args.len() == 1 => match func.as_ident() {
                Some(name @ ("Ok" | "Err" | "Some")) => name.to_string(),
                _ => return false,
            },
            ExprKind::Ident(name) if name == "None" => name.clone(),
            _ => return false,
        };
        if self.cx.infer.is_bound(&variant) || self.cx.infer.is_func(&variant) {
            return false;
        }
        let family = if variant == "Ok" || variant == "Err" { RESULT } else { OPTION };

        let mut instance = expected
            .and_then(|ty| self.cx.catalog.instance_for_type(ty))
            .filter(|inst| inst.family == family)
            .map(|inst| inst.name.clone());
        let mut payload_done = false;
        if instance.is_none() {
            let elem = match &mut expr.kind {
                ExprKind::Call { args, .. } if variant == "Ok" || variant == "Some" => {
                    self.expr(&mut args[0], None);
                    payload_done = true;
                    self.cx.infer.infer(&args[0]).into_type()
                }
                _ => None,
            };
            let Some(elem) = elem else {
                self.needs_annotation(expr, &variant);
                return true;
            };
            let args = if family == RESULT {
                vec![elem, self.cx.options.default_error_type.clone()]
            } else {
                vec![elem]
            };
            instance = match ensure_instance(self.cx, family, &args) {
                Ok(found) => found,
                Err(err) => {
                    self.error.get_or_insert(err);
                    return true;
                }
            };
        }
        let Some(shape) = instance.and_then(|name| self.cx.catalog.get(&name).cloned()) else {
            return true;
        };

        let mut fields = vec![("tag".to_string(), synth::ident(shape.tag_const(&variant)))];
        if let ExprKind::Call { args, .. } = &mut expr.kind {
            let payload_ty = shape.payload_types(&variant).into_iter().next().flatten();
            let mut value = args.remove(0);
            if !payload_done {
                self.expr(&mut value, payload_ty.as_ref());
            }
            let span = value.span;
            match address_of(value, payload_ty.as_ref(), self.cx.infer, self.cx.names) {
                Ok(address) => fields.push((payload_field(&variant, 0), address)),
                Err(err) => {
                    self.cx.diagnose(
                        Diagnostic::error(DiagnosticCode::NeedsAnnotation, err.to_string(), None).with_span(span),
                    );
                    return true;
                }
            }
        }
        *expr = synth::composite(shape.as_type(), fields);
        self.rewritten += 1;
        true
    }

    fn needs_annotation(&mut self, expr: &Expr, variant: &str) {
        let diagnostic = Diagnostic::error(
            DiagnosticCode::NeedsAnnotation,
            format!("cannot infer the container type of `{variant}` here; add a type annotation"),
            None,
        )
        .with_span(expr.span);
        self.cx.diagnose(diagnostic);
    }
}

/// The Dispatch marker of a skeleton switch: slot count and target.
fn dispatch_of(stmt: &Stmt) -> Option<(usize, MatchTarget)> {
    stmt.markers.iter().find_map(|marker| match &marker.payload {
        MarkerPayload::Dispatch { arity, target, .. } => Some((*arity as usize, target.clone())),
        _ => None,
    })
}

/// Parameter type for argument `index`. A variadic parameter types every
/// trailing argument, or the whole slice when spread with `...`.
fn param_type(params: &[Param], index: usize, ellipsis: bool) -> Option<TypeExpr> {
    let last = params.len().checked_sub(1)?;
    let param = params.get(index.min(last))?;
    if index > last && !param.variadic {
        return None;
    }
    if param.variadic && ellipsis {
        return Some(TypeExpr::Slice(Box::new(param.ty.clone())));
    }
    Some(param.ty.clone())
}

/// Values assigned to `name` anywhere in `stmts`, nested blocks included.
fn assigned_values<'s>(name: &str, stmts: &'s [Stmt], out: &mut Vec<&'s Expr>) {
    struct Assigned<'n, 's> {
        name: &'n str,
        out: &'n mut Vec<&'s Expr>,
    }

    impl<'s> Visit<'s> for Assigned<'_, 's> {
        fn visit_stmt(&mut self, stmt: &'s Stmt) {
            if let StmtKind::Assign { lhs, op, rhs } = &stmt.kind {
                if op == "=" && lhs.len() == 1 && rhs.len() == 1 && lhs[0].as_ident() == Some(self.name) {
                    self.out.push(&rhs[0]);
                }
            }
            walk::walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, _expr: &'s Expr) {}
    }

    let mut visitor = Assigned { name, out };
    for stmt in stmts {
        visitor.visit_stmt(stmt);
    }
}
