//! Type inference service for the lowering passes.
//!
//! The passes need the type of an expression in three places: to name a
//! container instantiation (`Ok(n)` becomes `Result_int_error{..}`), to
//! declare a temporary when taking the address of a non-addressable value,
//! and to resolve the type of an unannotated `match` assignment. Answers come
//! from, in order:
//!
//! 1. an optional ground-truth [`TypeOracle`] (yields [`InferredType::Checked`]),
//! 2. the scope environment built from declarations the passes have walked,
//! 3. structural rules over the expression itself.
//!
//! Anything else is [`InferredType::Unknown`]. The service never guesses.

use rustc_hash::FxHashMap;

use sable_common::Span;
use sable_syntax::ast::{
    BinaryOp, DeclKind, Expr, ExprKind, ForKind, FuncType, GenDecl, Param, SourceFile, Stmt, StmtKind,
    TypeExpr, UnaryOp, ValueSpec,
};
use sable_syntax::expr_to_type;

use crate::builtins::{builtin_result, Library};
use crate::env::{Binding, TypeEnv};
use crate::ty::{bool_type, is_predeclared_type, literal_type};

/// Ground-truth type information from an external checker.
pub trait TypeOracle {
    fn type_of(&self, expr: &Expr) -> Option<TypeExpr>;
}

/// Outcome of a type query.
#[derive(Debug, Clone, PartialEq)]
pub enum InferredType {
    /// Reported by the oracle.
    Checked(TypeExpr),
    /// Derived from scopes and structural rules.
    Structural(TypeExpr),
    Unknown,
}

impl InferredType {
    pub fn ty(&self) -> Option<&TypeExpr> {
        match self {
            InferredType::Checked(ty) | InferredType::Structural(ty) => Some(ty),
            InferredType::Unknown => None,
        }
    }

    pub fn into_type(self) -> Option<TypeExpr> {
        match self {
            InferredType::Checked(ty) | InferredType::Structural(ty) => Some(ty),
            InferredType::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, InferredType::Unknown)
    }
}

// ── Service ────────────────────────────────────────────────────────────

/// Per-unit inference state. Not shared across units.
pub struct TypeInference {
    oracle: Option<Box<dyn TypeOracle>>,
    library: Library,
    default_error: TypeExpr,
    /// Package-level functions.
    funcs: FxHashMap<String, FuncType>,
    /// Methods keyed by receiver base type name, then method name.
    methods: FxHashMap<String, FxHashMap<String, FuncType>>,
    /// Declared types by name.
    types: FxHashMap<String, TypeExpr>,
    /// Tagged unions and their variant names in tag order.
    unions: FxHashMap<String, Vec<String>>,
    env: TypeEnv,
    /// Result types of the enclosing functions, innermost last.
    results: Vec<Vec<TypeExpr>>,
    cache: FxHashMap<Span, InferredType>,
}

impl TypeInference {
    /// A service whose `Ok(..)` error type defaults to `default_error`.
    pub fn new(default_error: TypeExpr) -> Self {
        Self {
            oracle: None,
            library: Library::standard(),
            default_error,
            funcs: FxHashMap::default(),
            methods: FxHashMap::default(),
            types: FxHashMap::default(),
            unions: FxHashMap::default(),
            env: TypeEnv::new(),
            results: Vec::new(),
            cache: FxHashMap::default(),
        }
    }

    pub fn with_oracle(mut self, oracle: Box<dyn TypeOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn set_oracle(&mut self, oracle: Option<Box<dyn TypeOracle>>) {
        self.oracle = oracle;
    }

    pub fn default_error(&self) -> &TypeExpr {
        &self.default_error
    }

    /// Forget everything and collect package-level declarations of `file`.
    #[tracing::instrument(level = "debug", skip_all, fields(decls = file.decls.len()))]
    pub fn reset_for(&mut self, file: &SourceFile) {
        self.funcs.clear();
        self.methods.clear();
        self.types.clear();
        self.unions.clear();
        self.env.clear();
        self.results.clear();
        self.cache.clear();

        for decl in &file.decls {
            match &decl.kind {
                DeclKind::Func(func) => match &func.recv {
                    Some(recv) => {
                        if let Some(base) = receiver_base(&recv.ty) {
                            self.declare_method(base, &func.name, func.sig.clone());
                        }
                    }
                    None => self.declare_func(&func.name, func.sig.clone()),
                },
                DeclKind::Gen(GenDecl::Type { specs, .. }) => {
                    for spec in specs {
                        self.types.insert(spec.name.clone(), spec.ty.clone());
                    }
                }
                _ => {}
            }
        }
        for decl in &file.decls {
            if let DeclKind::Gen(gen) = &decl.kind {
                self.observe_gen_decl(gen);
            }
        }
        tracing::debug!(
            funcs = self.funcs.len(),
            types = self.types.len(),
            globals = self.env.depth(),
            "package scope collected"
        );
    }

    pub fn declare_func(&mut self, name: &str, sig: FuncType) {
        self.funcs.insert(name.to_string(), sig);
    }

    pub fn declare_method(&mut self, recv_type: &str, name: &str, sig: FuncType) {
        self.methods
            .entry(recv_type.to_string())
            .or_default()
            .insert(name.to_string(), sig);
    }

    pub fn declare_type(&mut self, name: &str, ty: TypeExpr) {
        self.types.insert(name.to_string(), ty);
    }

    /// Register a tagged union so `Name.Variant(..)` and `Name.Variant`
    /// infer to `Name`.
    pub fn declare_union(&mut self, name: &str, variants: Vec<String>) {
        self.unions.insert(name.to_string(), variants);
    }

    /// Drop cached answers. Called after a pass rewrites the tree.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn is_union(&self, name: &str) -> bool {
        self.unions.contains_key(name) && self.env.lookup(name).is_none()
    }

    /// Unions declaring a variant called `variant`.
    pub fn unions_with_variant(&self, variant: &str) -> Vec<&str> {
        let mut found: Vec<&str> = self
            .unions
            .iter()
            .filter(|(_, variants)| variants.iter().any(|v| v == variant))
            .map(|(name, _)| name.as_str())
            .collect();
        found.sort_unstable();
        found
    }

    // ── Scopes ─────────────────────────────────────────────────────────

    pub fn push_scope(&mut self) {
        self.env.push_scope();
    }

    pub fn pop_scope(&mut self) {
        self.env.pop_scope();
    }

    pub fn bind(&mut self, name: &str, ty: Option<TypeExpr>) {
        self.env.insert(name.to_string(), Binding::var(ty));
    }

    /// Enter a function body: binds receiver, parameters and named results.
    pub fn enter_function(&mut self, recv: Option<&Param>, sig: &FuncType) {
        self.env.push_scope();
        for param in recv.into_iter().chain(&sig.params).chain(&sig.results) {
            if let Some(name) = &param.name {
                let ty = if param.variadic {
                    TypeExpr::Slice(Box::new(param.ty.clone()))
                } else {
                    param.ty.clone()
                };
                self.env.insert(name.clone(), Binding::var(Some(ty)));
            }
        }
        self.results
            .push(sig.results.iter().map(|r| r.ty.clone()).collect());
    }

    pub fn exit_function(&mut self) {
        self.results.pop();
        self.env.pop_scope();
    }

    /// Result types of the innermost enclosing function.
    pub fn current_results(&self) -> Option<&[TypeExpr]> {
        self.results.last().map(Vec::as_slice)
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.env.lookup(name).and_then(|b| b.ty.as_ref())
    }

    /// Whether a local or package variable named `name` is in scope,
    /// typed or not.
    pub fn is_bound(&self, name: &str) -> bool {
        self.env.lookup(name).is_some()
    }

    pub fn is_const(&self, name: &str) -> bool {
        self.env.lookup(name).is_some_and(|b| b.is_const)
    }

    /// A package-level function not shadowed by a local.
    pub fn is_func(&self, name: &str) -> bool {
        self.env.lookup(name).is_none() && self.funcs.contains_key(name)
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        self.env.lookup(name).is_none() && (is_predeclared_type(name) || self.types.contains_key(name))
    }

    /// Parameters of a called function or method, when known.
    pub fn callee_params(&mut self, func: &Expr) -> Option<Vec<Param>> {
        self.callee_sig(func).map(|sig| sig.params)
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// Record the bindings a statement introduces into the current scope.
    pub fn observe_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(gen) => self.observe_gen_decl(gen),
            StmtKind::ShortVar { names, values } => self.observe_values(names, None, values, false),
            StmtKind::Labeled { stmt, .. } => self.observe_stmt(stmt),
            _ => {}
        }
    }

    fn observe_gen_decl(&mut self, gen: &GenDecl) {
        match gen {
            GenDecl::Var { specs, .. } => {
                for ValueSpec { names, ty, values } in specs {
                    self.observe_values(names, ty.as_ref(), values, false);
                }
            }
            GenDecl::Const { specs, .. } => {
                for ValueSpec { names, ty, values } in specs {
                    self.observe_values(names, ty.as_ref(), values, true);
                }
            }
            GenDecl::Type { specs, .. } => {
                for spec in specs {
                    self.types.insert(spec.name.clone(), spec.ty.clone());
                }
            }
        }
    }

    fn observe_values(&mut self, names: &[String], ty: Option<&TypeExpr>, values: &[Expr], is_const: bool) {
        let make = |ty: Option<TypeExpr>| {
            if is_const {
                Binding::constant(ty)
            } else {
                Binding::var(ty)
            }
        };
        if let Some(ty) = ty {
            for name in names {
                self.env.insert(name.clone(), make(Some(ty.clone())));
            }
            return;
        }
        if values.len() == names.len() {
            for (name, value) in names.iter().zip(values) {
                let ty = self.infer(value).into_type();
                self.env.insert(name.clone(), make(ty));
            }
            return;
        }
        let types = match values {
            [value] => self.multi_value(value),
            _ => Vec::new(),
        };
        for (i, name) in names.iter().enumerate() {
            self.env.insert(name.clone(), make(types.get(i).cloned()));
        }
    }

    /// Types of an expression used in a multi-value assignment.
    fn multi_value(&mut self, value: &Expr) -> Vec<TypeExpr> {
        match &value.unparen().kind {
            ExprKind::Call { func, args, .. } => self.call_results(func, args).unwrap_or_default(),
            ExprKind::Index { expr, .. } => match self.infer(expr).into_type().map(|t| self.underlying(&t)) {
                Some(TypeExpr::Map { value, .. }) => vec![*value, bool_type()],
                _ => Vec::new(),
            },
            ExprKind::TypeAssert { ty: Some(ty), .. } => vec![(**ty).clone(), bool_type()],
            ExprKind::Unary {
                op: UnaryOp::Recv,
                expr,
            } => match self.infer(expr).into_type().map(|t| self.underlying(&t)) {
                Some(TypeExpr::Chan { elem, .. }) => vec![*elem, bool_type()],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Bind the iteration variables of a `for ... range` header.
    pub fn observe_range(&mut self, kind: &ForKind) {
        let ForKind::Range {
            key,
            value,
            define: true,
            expr,
        } = kind
        else {
            return;
        };
        let ranged = self.infer(expr).into_type().map(|t| self.underlying(&t));
        let int = TypeExpr::named("int");
        let (key_ty, value_ty) = match ranged {
            Some(TypeExpr::Slice(elem)) | Some(TypeExpr::Array { elem, .. }) => (Some(int), Some(*elem)),
            Some(TypeExpr::Map { key, value }) => (Some(*key), Some(*value)),
            Some(TypeExpr::Chan { elem, .. }) => (Some(*elem), None),
            Some(ty) if ty.as_simple_name() == Some("string") => (Some(int), Some(TypeExpr::named("rune"))),
            Some(ty) if ty.as_simple_name() == Some("int") => (Some(int), None),
            _ => (None, None),
        };
        if let Some(name) = key.as_ref().and_then(Expr::as_ident) {
            self.bind(name, key_ty);
        }
        if let Some(name) = value.as_ref().and_then(Expr::as_ident) {
            self.bind(name, value_ty);
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Type of `expr`.
    pub fn infer(&mut self, expr: &Expr) -> InferredType {
        let cacheable = !expr.span.is_detached();
        if cacheable {
            if let Some(hit) = self.cache.get(&expr.span) {
                return hit.clone();
            }
        }
        let result = match self.oracle.as_ref().and_then(|o| o.type_of(expr)) {
            Some(ty) => InferredType::Checked(ty),
            None => match self.structural(expr) {
                Some(ty) => InferredType::Structural(ty),
                None => InferredType::Unknown,
            },
        };
        if cacheable && result.is_known() {
            self.cache.insert(expr.span, result.clone());
        }
        result
    }

    fn structural(&mut self, expr: &Expr) -> Option<TypeExpr> {
        match &expr.kind {
            ExprKind::Ident(name) => match name.as_str() {
                "true" | "false" if self.env.lookup(name).is_none() => Some(bool_type()),
                _ => match self.env.lookup(name) {
                    Some(binding) => binding.ty.clone(),
                    None => self.funcs.get(name).cloned().map(TypeExpr::Func),
                },
            },
            ExprKind::Lit(lit) => Some(literal_type(lit.kind)),
            ExprKind::Composite { ty, .. } => ty.as_deref().cloned(),
            ExprKind::FuncLit { sig, .. } => Some(TypeExpr::Func(sig.clone())),
            ExprKind::Unary { op, expr: inner } => {
                if *op == UnaryOp::Not {
                    return Some(bool_type());
                }
                let inner = self.infer(inner).into_type()?;
                match op {
                    UnaryOp::Addr => Some(TypeExpr::pointer(inner)),
                    UnaryOp::Deref => match self.underlying(&inner) {
                        TypeExpr::Pointer(target) => Some(*target),
                        _ => None,
                    },
                    UnaryOp::Recv => match self.underlying(&inner) {
                        TypeExpr::Chan { elem, .. } => Some(*elem),
                        _ => None,
                    },
                    _ => Some(inner),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(bool_type());
                }
                let left = self.infer(lhs).into_type();
                if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                    return left;
                }
                let right = self.infer(rhs).into_type();
                // An untyped constant operand takes the type of the other side.
                let left_untyped = is_untyped_constant(lhs);
                let right_untyped = is_untyped_constant(rhs);
                match (left, right) {
                    (Some(l), Some(r)) => {
                        if left_untyped && !right_untyped {
                            Some(r)
                        } else if !left_untyped && right_untyped {
                            Some(l)
                        } else if left_untyped && right_untyped {
                            Some(wider_constant(l, r))
                        } else {
                            Some(l)
                        }
                    }
                    (Some(t), None) | (None, Some(t)) => Some(t),
                    (None, None) => None,
                }
            }
            ExprKind::Call { func, args, .. } => self.call_results(func, args)?.into_iter().next(),
            ExprKind::Selector { expr: base, name } => {
                if let Some(union) = base.as_ident() {
                    if self.is_union(union) {
                        return Some(TypeExpr::named(union));
                    }
                }
                let base_ty = self.infer(base).into_type()?;
                self.field_type(&base_ty, name)
            }
            ExprKind::Index { expr: base, .. } => {
                let base_ty = self.infer(base).into_type()?;
                match self.underlying(&base_ty) {
                    TypeExpr::Slice(elem) | TypeExpr::Array { elem, .. } => Some(*elem),
                    TypeExpr::Map { value, .. } => Some(*value),
                    TypeExpr::Pointer(inner) => match self.underlying(&inner) {
                        TypeExpr::Array { elem, .. } => Some(*elem),
                        _ => None,
                    },
                    ty if ty.as_simple_name() == Some("string") => Some(TypeExpr::named("byte")),
                    _ => None,
                }
            }
            ExprKind::Slice { expr: base, .. } => {
                let base_ty = self.infer(base).into_type()?;
                match self.underlying(&base_ty) {
                    TypeExpr::Slice(_) => Some(base_ty),
                    TypeExpr::Array { elem, .. } => Some(TypeExpr::Slice(elem)),
                    TypeExpr::Pointer(inner) => match self.underlying(&inner) {
                        TypeExpr::Array { elem, .. } => Some(TypeExpr::Slice(elem)),
                        _ => None,
                    },
                    ty if ty.as_simple_name() == Some("string") => Some(base_ty),
                    _ => None,
                }
            }
            ExprKind::TypeAssert { ty, .. } => ty.as_deref().cloned(),
            ExprKind::Paren(inner) => self.infer(inner).into_type(),
            ExprKind::Type(_) => None,
        }
    }

    /// Result types of a call.
    fn call_results(&mut self, func: &Expr, args: &[Expr]) -> Option<Vec<TypeExpr>> {
        if let ExprKind::Ident(name) = &func.unparen().kind {
            if self.env.lookup(name).is_none() {
                if let Some(results) = self.builtin_call(name, args) {
                    return Some(results);
                }
                if self.is_type_name(name) {
                    return Some(vec![TypeExpr::named(name.clone())]);
                }
            }
        }
        if let ExprKind::Selector { expr: base, name } = &func.unparen().kind {
            if let Some(qualifier) = base.as_ident() {
                if self.is_union(qualifier) {
                    return Some(vec![TypeExpr::named(qualifier)]);
                }
                if self.env.lookup(qualifier).is_none() && !self.funcs.contains_key(qualifier) {
                    return self.library.results(qualifier, name).map(<[TypeExpr]>::to_vec);
                }
            }
            let recv = self.infer(base).into_type()?;
            if let Some(results) = container_method(&recv, name) {
                return Some(results);
            }
        }
        match &func.unparen().kind {
            ExprKind::Type(ty) => return Some(vec![(**ty).clone()]),
            ExprKind::FuncLit { sig, .. } => return Some(sig.results.iter().map(|r| r.ty.clone()).collect()),
            _ => {}
        }
        self.callee_sig(func)
            .map(|sig| sig.results.into_iter().map(|r| r.ty).collect())
    }

    /// Signature of a called function, method, or function-typed value.
    fn callee_sig(&mut self, func: &Expr) -> Option<FuncType> {
        match &func.unparen().kind {
            ExprKind::Ident(name) => match self.env.lookup(name) {
                Some(binding) => match binding.ty.as_ref().map(|t| self.underlying(t)) {
                    Some(TypeExpr::Func(sig)) => Some(sig),
                    _ => None,
                },
                None => self.funcs.get(name).cloned(),
            },
            ExprKind::Selector { expr: base, name } => {
                let recv = self.infer(base).into_type()?;
                let base_name = receiver_base(&recv)?;
                if let Some(sig) = self.methods.get(base_name).and_then(|m| m.get(name)) {
                    return Some(sig.clone());
                }
                match self.field_type(&recv, name).map(|t| self.underlying(&t)) {
                    Some(TypeExpr::Func(sig)) => Some(sig),
                    _ => None,
                }
            }
            _ => match self.infer(func).into_type().map(|t| self.underlying(&t)) {
                Some(TypeExpr::Func(sig)) => Some(sig),
                _ => None,
            },
        }
    }

    fn builtin_call(&mut self, name: &str, args: &[Expr]) -> Option<Vec<TypeExpr>> {
        let one = |ty: TypeExpr| Some(vec![ty]);
        match name {
            "Ok" | "Some" => {
                let [value] = args else { return None };
                let elem = self.infer(value).into_type()?;
                if name == "Ok" {
                    one(TypeExpr::Named {
                        pkg: None,
                        name: "Result".into(),
                        args: vec![elem, self.default_error.clone()],
                    })
                } else {
                    one(TypeExpr::Named {
                        pkg: None,
                        name: "Option".into(),
                        args: vec![elem],
                    })
                }
            }
            "new" => one(TypeExpr::pointer(expr_to_type(args.first()?)?)),
            "make" => one(expr_to_type(args.first()?)?),
            "append" => one(self.infer(args.first()?).into_type()?),
            "min" | "max" => one(self.infer(args.first()?).into_type()?),
            _ => builtin_result(name).map(|ty| vec![ty]),
        }
    }

    /// Type of `base.name` where `name` is a struct field.
    pub fn field_type(&self, base: &TypeExpr, name: &str) -> Option<TypeExpr> {
        let base = match self.underlying(base) {
            TypeExpr::Pointer(inner) => self.underlying(&inner),
            other => other,
        };
        let TypeExpr::Struct(fields) = base else {
            return None;
        };
        fields
            .iter()
            .find(|f| f.names.iter().any(|n| n == name))
            .map(|f| f.ty.clone())
    }

    /// Follow declared type names to their definition.
    pub fn underlying(&self, ty: &TypeExpr) -> TypeExpr {
        let mut current = ty.clone();
        for _ in 0..16 {
            let Some(next) = current.as_simple_name().and_then(|n| self.types.get(n)) else {
                break;
            };
            current = next.clone();
        }
        current
    }
}

/// Helper-method results on not-yet-lowered container types.
fn container_method(recv: &TypeExpr, method: &str) -> Option<Vec<TypeExpr>> {
    let TypeExpr::Named { pkg: None, name, args } = recv else {
        return None;
    };
    match (name.as_str(), args.as_slice(), method) {
        ("Result", [_, _], "IsOk" | "IsErr") | ("Option", [_], "IsSome" | "IsNone") => Some(vec![bool_type()]),
        ("Result", [ok, _], "Unwrap" | "UnwrapOr") | ("Option", [ok], "Unwrap" | "UnwrapOr" | "UnwrapOrElse") => {
            Some(vec![ok.clone()])
        }
        ("Result", [_, err], "UnwrapErr") => Some(vec![err.clone()]),
        ("Result", [_, _], "MapErr" | "OrElse") | ("Option", [_], "Filter" | "OrElse") => Some(vec![recv.clone()]),
        _ => None,
    }
}

/// Base type name of a method receiver: `T` for both `T` and `*T`.
fn receiver_base(ty: &TypeExpr) -> Option<&str> {
    crate::ty::base_type_name(ty)
}

fn is_untyped_constant(expr: &Expr) -> bool {
    match &expr.unparen().kind {
        ExprKind::Lit(_) => true,
        ExprKind::Unary { expr, .. } => is_untyped_constant(expr),
        ExprKind::Binary { lhs, rhs, .. } => is_untyped_constant(lhs) && is_untyped_constant(rhs),
        _ => false,
    }
}

/// Combined default type of two untyped constants: float wins over rune
/// wins over int.
fn wider_constant(l: TypeExpr, r: TypeExpr) -> TypeExpr {
    let rank = |t: &TypeExpr| match t.as_simple_name() {
        Some("float64") => 2,
        Some("rune") => 1,
        _ => 0,
    };
    if rank(&r) > rank(&l) {
        r
    } else {
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::{parse, parse_expr, parse_type, print_type};

    const FILE: &str = "\
package p

type User struct {
\tName string
\tAge  int
}

type Names []string

var limit = 10

const greeting = \"hi\"

func lookup(id int) (*User, error) {
\treturn nil, nil
}

func (u *User) Label() string {
\treturn u.Name
}
";

    fn service() -> TypeInference {
        let mut infer = TypeInference::new(TypeExpr::named("error"));
        infer.reset_for(&parse(FILE).unwrap());
        infer
    }

    /// Every fragment is parsed at offset 0, so spans collide across calls.
    fn type_of(infer: &mut TypeInference, source: &str) -> Option<String> {
        infer.clear_cache();
        infer.infer(&parse_expr(source).unwrap()).ty().map(print_type)
    }

    #[test]
    fn literals_take_their_default_types() {
        let mut infer = service();
        assert_eq!(type_of(&mut infer, "42").as_deref(), Some("int"));
        assert_eq!(type_of(&mut infer, "2.5").as_deref(), Some("float64"));
        assert_eq!(type_of(&mut infer, "`raw`").as_deref(), Some("string"));
        assert_eq!(type_of(&mut infer, "'x'").as_deref(), Some("rune"));
        assert_eq!(type_of(&mut infer, "true").as_deref(), Some("bool"));
    }

    #[test]
    fn package_scope_is_visible() {
        let mut infer = service();
        assert_eq!(type_of(&mut infer, "limit").as_deref(), Some("int"));
        assert!(infer.is_const("greeting"));
        assert!(infer.is_func("lookup"));
        assert_eq!(type_of(&mut infer, "lookup(1)").as_deref(), Some("*User"));
    }

    #[test]
    fn fields_methods_and_indexing() {
        let mut infer = service();
        infer.enter_function(None, &FuncType {
            params: vec![
                Param::named("u", parse_type("*User").unwrap()),
                Param::named("names", TypeExpr::named("Names")),
                Param::named("ages", parse_type("map[string]int").unwrap()),
            ],
            results: vec![],
        });
        assert_eq!(type_of(&mut infer, "u.Age").as_deref(), Some("int"));
        assert_eq!(type_of(&mut infer, "u.Label()").as_deref(), Some("string"));
        assert_eq!(type_of(&mut infer, "names[0]").as_deref(), Some("string"));
        assert_eq!(type_of(&mut infer, "ages[\"bob\"]").as_deref(), Some("int"));
        assert_eq!(type_of(&mut infer, "&u.Name").as_deref(), Some("*string"));
        assert_eq!(type_of(&mut infer, "*u").as_deref(), Some("User"));
        infer.exit_function();
        assert_eq!(type_of(&mut infer, "u"), None);
    }

    #[test]
    fn arithmetic_prefers_the_typed_operand() {
        let mut infer = service();
        infer.bind("x", Some(TypeExpr::named("float32")));
        assert_eq!(type_of(&mut infer, "2 * x").as_deref(), Some("float32"));
        assert_eq!(type_of(&mut infer, "1 + 2.0").as_deref(), Some("float64"));
        assert_eq!(type_of(&mut infer, "x > 1").as_deref(), Some("bool"));
    }

    #[test]
    fn library_and_builtin_calls() {
        let mut infer = service();
        assert_eq!(type_of(&mut infer, "errors.New(\"boom\")").as_deref(), Some("error"));
        assert_eq!(type_of(&mut infer, "fmt.Sprintf(\"%d\", 1)").as_deref(), Some("string"));
        assert_eq!(type_of(&mut infer, "len(\"abc\")").as_deref(), Some("int"));
        assert_eq!(type_of(&mut infer, "float64(limit)").as_deref(), Some("float64"));
        assert_eq!(type_of(&mut infer, "make([]int, 3)").as_deref(), Some("[]int"));
        assert_eq!(type_of(&mut infer, "new(User)").as_deref(), Some("*User"));
        assert_eq!(type_of(&mut infer, "mystery.Call()"), None);
    }

    #[test]
    fn containers_and_unions() {
        let mut infer = service();
        infer.declare_union("Shape", vec!["Circle".into(), "Point".into()]);
        assert_eq!(type_of(&mut infer, "Ok(42)").as_deref(), Some("Result[int, error]"));
        assert_eq!(type_of(&mut infer, "Some(\"x\")").as_deref(), Some("Option[string]"));
        assert_eq!(type_of(&mut infer, "Err(e)"), None);
        assert_eq!(type_of(&mut infer, "Shape.Circle(1.0)").as_deref(), Some("Shape"));
        assert_eq!(type_of(&mut infer, "Shape.Point").as_deref(), Some("Shape"));
        assert_eq!(infer.unions_with_variant("Point"), vec!["Shape"]);
    }

    #[test]
    fn short_var_declarations_bind_results() {
        let mut infer = service();
        let file = parse(
            "package p\n\nfunc f() {\n\tn, err := strconv.Atoi(\"1\")\n\tv, ok := m[\"k\"]\n\ts := []string{}\n}\n",
        )
        .unwrap();
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func");
        };
        infer.enter_function(None, &func.sig);
        infer.bind("m", Some(parse_type("map[string]bool").unwrap()));
        for stmt in &func.body.as_ref().unwrap().stmts {
            infer.observe_stmt(stmt);
        }
        assert_eq!(infer.lookup("n"), Some(&TypeExpr::named("int")));
        assert_eq!(infer.lookup("err"), Some(&TypeExpr::named("error")));
        assert_eq!(infer.lookup("v"), Some(&TypeExpr::named("bool")));
        assert_eq!(infer.lookup("ok"), Some(&TypeExpr::named("bool")));
        assert_eq!(infer.lookup("s").map(print_type).as_deref(), Some("[]string"));
    }

    struct FixedOracle;

    impl TypeOracle for FixedOracle {
        fn type_of(&self, expr: &Expr) -> Option<TypeExpr> {
            (expr.as_ident() == Some("magic")).then(|| TypeExpr::named("Widget"))
        }
    }

    #[test]
    fn oracle_answers_are_checked() {
        let mut infer = service().with_oracle(Box::new(FixedOracle));
        let magic = parse_expr("magic").unwrap();
        assert_eq!(infer.infer(&magic), InferredType::Checked(TypeExpr::named("Widget")));
        let lit = parse_expr("1").unwrap();
        assert_eq!(infer.infer(&lit), InferredType::Structural(TypeExpr::named("int")));
        assert_eq!(infer.infer(&parse_expr("nil").unwrap()), InferredType::Unknown);
    }

    #[test]
    fn known_answers_are_cached_by_span() {
        let mut infer = service();
        infer.bind("x", Some(TypeExpr::named("int")));
        let expr = parse_expr("x").unwrap();
        assert!(infer.infer(&expr).is_known());
        infer.bind("x", Some(TypeExpr::named("string")));
        assert_eq!(infer.infer(&expr), InferredType::Structural(TypeExpr::named("int")));
        infer.clear_cache();
        assert_eq!(infer.infer(&expr), InferredType::Structural(TypeExpr::named("string")));
    }
}
