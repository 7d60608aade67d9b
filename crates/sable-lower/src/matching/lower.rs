//! Arms and code generation for one match site.
//!
//! A decision tree becomes host control flow:
//!
//! - `Switch` is a `switch` on the tag field; when every variant is covered
//!   the last case becomes `default`, so a return-position match is a
//!   terminating statement without a fallback.
//! - `Test` is `if value == lit { ... } else { ... }`; bool literals test the
//!   value directly.
//! - `Guard` binds, then `if guard { body } else { <rest> }`.
//! - `Fail` is the runtime fallback `panic("sable: non-exhaustive match ...")`.
//!
//! Payload values are read through the pointer fields of the union:
//! `r := *__scrut0.circle0`. Nested payloads chain the pointers, which the
//! host dereferences implicitly for field access (`__scrut0.ok0.tag`).

use rustc_hash::FxHashSet;

use sable_common::{Marker, MarkerPayload, MatchTarget, Origin, Pattern};
use sable_syntax::ast::{Block, CaseClause, Expr, ExprKind, GenDecl, Stmt, StmtKind, UnaryOp};
use sable_syntax::walk::idents_in;

use crate::error::{LowerError, Violation};
use crate::pattern::{AccessPath, Bindings, DecisionTree};
use crate::shape::{payload_field, UnionCatalog};
use crate::synth;

/// One `pattern [if guard] => body` arm, recovered from its case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub index: usize,
    pub pattern: Pattern,
    /// Names the pattern binds, in source order.
    pub bindings: Vec<String>,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub origin: Origin,
}

impl Arm {
    /// Recover an arm from the skeleton clause `case N:` and its marker.
    ///
    /// A guarded clause holds exactly `if guard { body }`. The body is
    /// finished for `target`: the trailing value of a block arm is returned
    /// or assigned, and a bare non-call expression becomes `_ = expr`.
    pub fn from_clause(clause: CaseClause, marker: &Marker, target: &MatchTarget) -> Result<Arm, LowerError> {
        let MarkerPayload::Arm {
            index,
            pattern,
            guard,
            bindings,
            block,
            ..
        } = &marker.payload
        else {
            return Err(malformed(marker, "not an arm marker"));
        };
        let mut body = clause.body;
        let mut guard_expr = None;
        if guard.is_some() {
            let [Stmt {
                kind: StmtKind::If(if_stmt),
                ..
            }] = body.as_mut_slice()
            else {
                return Err(malformed(marker, "guarded arm is not a single `if`"));
            };
            if if_stmt.init.is_some() || if_stmt.els.is_some() {
                return Err(malformed(marker, "guard `if` has an init or an else"));
            }
            let cond = std::mem::replace(&mut if_stmt.cond, synth::ident("true"));
            let stmts = std::mem::take(&mut if_stmt.then.stmts);
            guard_expr = Some(cond);
            body = stmts;
        }
        finish_body(&mut body, target, *block);
        Ok(Arm {
            index: *index as usize,
            pattern: pattern.clone(),
            bindings: bindings.clone(),
            guard: guard_expr,
            body,
            origin: marker.origin,
        })
    }

    /// Every identifier the guard or body mentions.
    fn used_names(&self) -> FxHashSet<String> {
        let mut names: FxHashSet<String> = idents_in(&self.body).into_iter().map(str::to_string).collect();
        if let Some(guard) = &self.guard {
            let probe = [synth::expr_stmt(guard.clone())];
            names.extend(idents_in(&probe).into_iter().map(str::to_string));
        }
        names
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

fn is_panic(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Call { func, .. } if func.as_ident() == Some("panic"))
}

/// Expressions the host accepts as statements.
fn is_statement_expr(expr: &Expr) -> bool {
    match &expr.unparen().kind {
        ExprKind::Call { .. } => true,
        ExprKind::Unary { op, .. } => *op == UnaryOp::Recv,
        _ => false,
    }
}

/// Route the arm's value to the match target.
pub(crate) fn finish_body(body: &mut [Stmt], target: &MatchTarget, block: bool) {
    let Some(last) = body.last_mut() else {
        return;
    };
    let kind = std::mem::replace(&mut last.kind, StmtKind::Fallthrough);
    last.kind = match (kind, target) {
        (StmtKind::Expr(expr), _) if is_panic(&expr) => StmtKind::Expr(expr),
        (StmtKind::Expr(expr), MatchTarget::Return) if block => StmtKind::Return(vec![expr]),
        (StmtKind::Expr(expr), MatchTarget::Assign { name, .. }) if block => StmtKind::Assign {
            lhs: vec![synth::ident(name.clone())],
            op: "=".into(),
            rhs: vec![expr],
        },
        (StmtKind::Expr(expr), _) if !is_statement_expr(&expr) => StmtKind::Assign {
            lhs: vec![synth::ident("_")],
            op: "=".into(),
            rhs: vec![expr],
        },
        (StmtKind::Return(mut values), MatchTarget::Return) if !block && values.len() == 1 && is_panic(&values[0]) => {
            StmtKind::Expr(values.remove(0))
        }
        (StmtKind::Assign { mut rhs, .. }, MatchTarget::Assign { .. }) if !block && rhs.len() == 1 && is_panic(&rhs[0]) => {
            StmtKind::Expr(rhs.remove(0))
        }
        (kind, _) => kind,
    };
}

// ── Code generation ────────────────────────────────────────────────────

/// Turns the decision tree of one site into statements.
pub(crate) struct Emitter<'a> {
    scrutinees: &'a [String],
    arms: &'a [Arm],
    used: Vec<FxHashSet<String>>,
    catalog: &'a UnionCatalog,
    line: u32,
    used_slots: FxHashSet<usize>,
    fallbacks: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(scrutinees: &'a [String], arms: &'a [Arm], catalog: &'a UnionCatalog, line: u32) -> Self {
        Self {
            scrutinees,
            arms,
            used: arms.iter().map(Arm::used_names).collect(),
            catalog,
            line,
            used_slots: FxHashSet::default(),
            fallbacks: 0,
        }
    }

    /// The single statement replacing the dispatch.
    pub(crate) fn root(&mut self, tree: &DecisionTree) -> Stmt {
        let mut stmts = self.emit(tree);
        if stmts.len() == 1 && !declares(&stmts[0]) {
            return stmts.remove(0);
        }
        Stmt::new(StmtKind::Block(Block::new(stmts)))
    }

    /// Whether scrutinee slot `slot` is read by the generated code.
    pub(crate) fn uses_slot(&self, slot: usize) -> bool {
        self.used_slots.contains(&slot)
    }

    pub(crate) fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    fn emit(&mut self, tree: &DecisionTree) -> Vec<Stmt> {
        match tree {
            DecisionTree::Leaf { arm_index, bindings } => {
                let mut stmts = self.bind(*arm_index, bindings);
                stmts.extend(self.arm(*arm_index).body.iter().cloned());
                stmts
            }
            DecisionTree::Guard {
                arm_index,
                bindings,
                failure,
            } => {
                let mut stmts = self.bind(*arm_index, bindings);
                let arm = self.arm(*arm_index);
                let guard = arm.guard.clone().unwrap_or_else(|| synth::ident("true"));
                let body = arm.body.clone();
                let rest = self.emit(failure);
                stmts.push(synth::if_else(guard, body, Some(rest)));
                stmts
            }
            DecisionTree::Switch {
                path,
                union,
                cases,
                default,
            } => {
                let tag = synth::selector(self.pointer(path), "tag");
                let shape = self.catalog.get(union);
                let mut groups: Vec<(Vec<Expr>, &DecisionTree)> = Vec::new();
                for (variant, subtree) in cases {
                    let tag_const = match shape {
                        Some(shape) => shape.tag_const(variant),
                        None => format!("{union}Tag{variant}"),
                    };
                    match groups.iter_mut().find(|(_, tree)| *tree == subtree) {
                        Some((consts, _)) => consts.push(synth::ident(tag_const)),
                        None => groups.push((vec![synth::ident(tag_const)], subtree)),
                    }
                }
                let mut clauses: Vec<CaseClause> = groups
                    .into_iter()
                    .map(|(consts, subtree)| CaseClause::case(consts, self.emit(subtree)))
                    .collect();
                match default {
                    Some(default) => clauses.push(CaseClause::default(self.emit(default))),
                    None => {
                        if let Some(last) = clauses.last_mut() {
                            last.exprs.clear();
                            last.is_default = true;
                        }
                    }
                }
                vec![synth::switch(tag, clauses)]
            }
            DecisionTree::Test {
                path,
                value,
                success,
                failure,
            } => {
                let subject = self.value(path);
                let cond = match value.text.as_str() {
                    "true" => subject,
                    "false" => synth::unary(UnaryOp::Not, subject),
                    _ => synth::binary(sable_syntax::ast::BinaryOp::Eq, subject, synth::lit(value)),
                };
                let then = self.emit(success);
                let els = self.emit(failure);
                vec![synth::if_else(cond, then, Some(els))]
            }
            DecisionTree::Fail => {
                self.fallbacks += 1;
                vec![synth::panic(&format!("sable: non-exhaustive match at line {}", self.line))]
            }
        }
    }

    fn arm(&self, index: usize) -> &'a Arm {
        let arms: &'a [Arm] = self.arms;
        &arms[index]
    }

    /// `name := value` for each binding the arm actually reads.
    fn bind(&mut self, arm_index: usize, bindings: &Bindings) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        for (name, path) in bindings {
            if self.used[arm_index].contains(name) {
                let value = self.value(path);
                stmts.push(synth::short_var(name.clone(), value));
            }
        }
        stmts
    }

    /// The value at `path`.
    fn value(&mut self, path: &AccessPath) -> Expr {
        match path {
            AccessPath::Slot(_) => self.pointer(path),
            AccessPath::Field { .. } => synth::unary(UnaryOp::Deref, self.pointer(path)),
        }
    }

    /// The scrutinee slot itself, or the payload pointer at `path`.
    fn pointer(&mut self, path: &AccessPath) -> Expr {
        match path {
            AccessPath::Slot(slot) => {
                self.used_slots.insert(*slot);
                synth::ident(self.scrutinees[*slot].clone())
            }
            AccessPath::Field { parent, variant, slot } => {
                let base = self.pointer(parent);
                synth::selector(base, payload_field(variant, *slot))
            }
        }
    }
}

/// Statements that would leak a name into the enclosing list.
fn declares(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::ShortVar { .. } | StmtKind::Decl(GenDecl::Var { .. } | GenDecl::Const { .. } | GenDecl::Type { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::tests::shapes;
    use sable_common::{LitKind, Literal, MarkerId};
    use sable_syntax::print_stmt;

    fn arm(index: usize, body: &str) -> Arm {
        let file = sable_syntax::parse(&format!("package p\n\nfunc f() {{\n\t{body}\n}}\n")).unwrap();
        let sable_syntax::ast::DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected a function");
        };
        Arm {
            index,
            pattern: Pattern::Wildcard,
            bindings: Vec::new(),
            guard: None,
            body: func.body.clone().unwrap().stmts,
            origin: Origin::default(),
        }
    }

    fn stmt(source: &str) -> Stmt {
        arm(0, source).body.remove(0)
    }

    fn leaf(arm_index: usize, bindings: Bindings) -> DecisionTree {
        DecisionTree::Leaf { arm_index, bindings }
    }

    fn variant_switch(cases: Vec<(&str, DecisionTree)>, default: Option<DecisionTree>) -> DecisionTree {
        DecisionTree::Switch {
            path: AccessPath::Slot(0),
            union: "Shape".into(),
            cases: cases.into_iter().map(|(v, t)| (v.to_string(), t)).collect(),
            default: default.map(Box::new),
        }
    }

    #[test]
    fn complete_switch_ends_in_default() {
        let catalog = shapes();
        let arms = [arm(0, "return r * r"), arm(1, "return 0")];
        let scrutinees = ["__scrut0".to_string()];
        let tree = variant_switch(
            vec![
                ("Circle", leaf(0, vec![("r".into(), AccessPath::field(&AccessPath::Slot(0), "Circle", 0))])),
                ("Rect", leaf(1, Vec::new())),
                ("Point", leaf(1, Vec::new())),
            ],
            None,
        );
        let mut emitter = Emitter::new(&scrutinees, &arms, &catalog, 3);
        let out = print_stmt(&emitter.root(&tree));
        assert_eq!(
            out,
            "switch __scrut0.tag {\ncase ShapeTagCircle:\n\tr := *__scrut0.circle0\n\treturn r * r\ndefault:\n\treturn 0\n}"
        );
        assert_eq!(emitter.fallbacks(), 0);
        assert!(emitter.uses_slot(0));
    }

    #[test]
    fn unused_bindings_are_skipped() {
        let catalog = shapes();
        let arms = [arm(0, "return 1"), arm(1, "return 0")];
        let scrutinees = ["__scrut0".to_string()];
        let tree = variant_switch(
            vec![("Circle", leaf(0, vec![("r".into(), AccessPath::field(&AccessPath::Slot(0), "Circle", 0))]))],
            Some(DecisionTree::Fail),
        );
        let mut emitter = Emitter::new(&scrutinees, &arms, &catalog, 7);
        let out = print_stmt(&emitter.root(&tree));
        assert!(!out.contains("r :="));
        assert!(out.contains("panic(\"sable: non-exhaustive match at line 7\")"));
        assert_eq!(emitter.fallbacks(), 1);
    }

    #[test]
    fn literal_tests_chain_with_else_if() {
        let catalog = shapes();
        let arms = [arm(0, "return \"one\""), arm(1, "return \"many\"")];
        let scrutinees = ["__scrut0".to_string()];
        let tree = DecisionTree::Test {
            path: AccessPath::Slot(0),
            value: Literal::new(LitKind::Int, "1"),
            success: Box::new(leaf(0, Vec::new())),
            failure: Box::new(leaf(1, Vec::new())),
        };
        let mut emitter = Emitter::new(&scrutinees, &arms, &catalog, 1);
        let out = print_stmt(&emitter.root(&tree));
        assert_eq!(out, "if __scrut0 == 1 {\n\treturn \"one\"\n} else {\n\treturn \"many\"\n}");
    }

    #[test]
    fn a_lone_leaf_with_bindings_gets_a_block() {
        let catalog = shapes();
        let arms = [arm(0, "use(s)")];
        let scrutinees = ["__scrut0".to_string()];
        let tree = leaf(0, vec![("s".into(), AccessPath::Slot(0))]);
        let mut emitter = Emitter::new(&scrutinees, &arms, &catalog, 1);
        let root = emitter.root(&tree);
        assert!(matches!(root.kind, StmtKind::Block(_)));
        assert!(print_stmt(&root).contains("s := __scrut0"));
    }

    #[test]
    fn block_arms_return_their_trailing_value() {
        let mut body = vec![stmt("y := 2"), stmt("y * 3")];
        finish_body(&mut body, &MatchTarget::Return, true);
        assert_eq!(print_stmt(&body[1]), "return y * 3");

        let mut body = vec![stmt("y * 3")];
        let target = MatchTarget::Assign {
            name: "x".into(),
            declare: false,
            annotated: false,
        };
        finish_body(&mut body, &target, true);
        assert_eq!(print_stmt(&body[0]), "x = y * 3");
    }

    #[test]
    fn panics_stay_statements() {
        let mut body = vec![stmt("return panic(\"no\")")];
        finish_body(&mut body, &MatchTarget::Return, false);
        assert_eq!(print_stmt(&body[0]), "panic(\"no\")");

        let mut body = vec![stmt("panic(\"no\")")];
        finish_body(&mut body, &MatchTarget::Return, true);
        assert_eq!(print_stmt(&body[0]), "panic(\"no\")");
    }

    #[test]
    fn bare_values_are_discarded_in_statement_matches() {
        let mut body = vec![stmt("r * 2")];
        finish_body(&mut body, &MatchTarget::Statement, false);
        assert_eq!(print_stmt(&body[0]), "_ = r * 2");

        let mut body = vec![stmt("log(r)")];
        finish_body(&mut body, &MatchTarget::Statement, false);
        assert_eq!(print_stmt(&body[0]), "log(r)");
    }

    #[test]
    fn guarded_clauses_yield_their_condition() {
        let clause = CaseClause::case(vec![synth::int(0)], vec![stmt("if r > 1 {\n\t\treturn r\n\t}")]);
        let marker = Marker::new(
            MarkerId(4),
            Origin::default(),
            MarkerPayload::Arm {
                match_id: 0,
                index: 0,
                pattern: Pattern::Binding("r".into()),
                guard: Some("r > 1".into()),
                bindings: vec!["r".into()],
                block: false,
            },
        );
        let arm = Arm::from_clause(clause, &marker, &MatchTarget::Return).unwrap();
        assert_eq!(arm.guard.as_ref().map(sable_syntax::print_expr).as_deref(), Some("r > 1"));
        assert_eq!(arm.body.len(), 1);
        assert!(arm.used_names().contains("r"));
    }
}
