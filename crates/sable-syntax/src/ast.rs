//! Owned syntax tree for the host language subset.
//!
//! The tree is designed to be rewritten in place by the lowering passes:
//! every node is plain owned data, statements and declarations carry the
//! markers that preceded them in the skeleton text, and synthesized nodes
//! use [`Span::DETACHED`] together with an optional [`Origin`] that points
//! back into the original source.

use sable_common::{Literal, Marker, Origin, Span};

// ── File ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// `.`, `_`, or a rename.
    pub alias: Option<String>,
    /// Path without quotes.
    pub path: String,
}

// ── Declarations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub markers: Vec<Marker>,
    pub span: Span,
    /// Original-source position for synthesized declarations.
    pub origin: Option<Origin>,
}

impl Decl {
    pub fn new(kind: DeclKind) -> Self {
        Self {
            kind,
            markers: Vec::new(),
            span: Span::DETACHED,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: Option<Origin>) -> Self {
        self.origin = origin;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Func(FuncDecl),
    Gen(GenDecl),
    /// Own-line comment, text includes the slashes.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub recv: Option<Param>,
    pub name: String,
    pub sig: FuncType,
    /// `None` for body-less declarations.
    pub body: Option<Block>,
}

/// `var`, `const` and `type` declarations, single or parenthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum GenDecl {
    Var { specs: Vec<ValueSpec>, grouped: bool },
    Const { specs: Vec<ValueSpec>, grouped: bool },
    Type { specs: Vec<TypeSpec>, grouped: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
    /// `type A = B`
    pub alias: bool,
    pub ty: TypeExpr,
}

// ── Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `int`, `pkg.Name`, `Result[int, error]`.
    Named {
        pkg: Option<String>,
        name: String,
        args: Vec<TypeExpr>,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    /// `[N]T`; a `None` length is `[...]T`.
    Array { len: Option<Box<Expr>>, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func(FuncType),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
}

impl TypeExpr {
    /// A plain, unqualified named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            pkg: None,
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn pointer(inner: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(inner))
    }

    /// The name of an unqualified, non-generic named type.
    pub fn as_simple_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named { pkg: None, name, args } if args.is_empty() => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub variadic: bool,
}

impl Param {
    pub fn named(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            variadic: false,
        }
    }

    pub fn unnamed(ty: TypeExpr) -> Self {
        Self {
            name: None,
            ty,
            variadic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Empty for embedded fields.
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Struct tag including quotes.
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method { name: String, sig: FuncType },
    Embedded(TypeExpr),
}

// ── Statements ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::DETACHED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub markers: Vec<Marker>,
    pub span: Span,
    pub origin: Option<Origin>,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            markers: Vec::new(),
            span: Span::DETACHED,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: Option<Origin>) -> Self {
        self.origin = origin;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Decl(GenDecl),
    /// `a, b := x, y`
    ShortVar { names: Vec<String>, values: Vec<Expr> },
    /// `a = b`, `a += b`; the operator text is kept verbatim.
    Assign { lhs: Vec<Expr>, op: String, rhs: Vec<Expr> },
    IncDec { expr: Expr, inc: bool },
    Send { chan: Expr, value: Expr },
    Return(Vec<Expr>),
    If(IfStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    Block(Block),
    Break(Option<String>),
    Continue(Option<String>),
    Goto(String),
    Fallthrough,
    Labeled { label: String, stmt: Box<Stmt> },
    Go(Expr),
    Defer(Expr),
    /// Own-line comment, text includes the slashes.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Expr,
    pub then: Block,
    /// Either another `If` statement or a `Block` statement.
    pub els: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub kind: ForKind,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForKind {
    Infinite,
    Cond(Expr),
    Clause {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub init: Option<Box<Stmt>>,
    pub tag: Option<Expr>,
    /// `v` in `switch v := x.(type)`.
    pub binding: Option<String>,
    pub clauses: Vec<CaseClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    /// Empty for `default:`.
    pub exprs: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
    pub markers: Vec<Marker>,
    pub span: Span,
}

impl CaseClause {
    pub fn case(exprs: Vec<Expr>, body: Vec<Stmt>) -> Self {
        Self {
            exprs,
            is_default: false,
            body,
            markers: Vec::new(),
            span: Span::DETACHED,
        }
    }

    pub fn default(body: Vec<Stmt>) -> Self {
        Self {
            exprs: Vec::new(),
            is_default: true,
            body,
            markers: Vec::new(),
            span: Span::DETACHED,
        }
    }
}

// ── Expressions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::DETACHED,
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Ident(name.into()))
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    Lit(Literal),
    Composite {
        /// `None` for elided element types inside an outer literal.
        ty: Option<Box<TypeExpr>>,
        elems: Vec<Element>,
    },
    FuncLit { sig: FuncType, body: Block },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { func: Box<Expr>, args: Vec<Expr>, ellipsis: bool },
    Selector { expr: Box<Expr>, name: String },
    /// `a[i]`, and `F[T, U]` in expression position.
    Index { expr: Box<Expr>, indices: Vec<Expr> },
    Slice {
        expr: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    /// `x.(T)`; `None` is `x.(type)`.
    TypeAssert { expr: Box<Expr>, ty: Option<Box<TypeExpr>> },
    Paren(Box<Expr>),
    /// A type in expression position: `[]int`, `map[K]V`, `struct{}`.
    Type(Box<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Deref,
    Addr,
    Recv,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    AndNot,
    Add,
    Sub,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::AndNot => "&^",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding power, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::AndNot => 5,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::BitOr | BinaryOp::BitXor => 4,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::And => 2,
            BinaryOp::Or => 1,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}
