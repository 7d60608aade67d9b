//! Inference over whole function bodies, walked statement by statement the
//! way the lowering passes walk them.

use sable_common::NameGen;
use sable_syntax::ast::{DeclKind, FuncDecl, SourceFile, StmtKind, TypeExpr};
use sable_syntax::{parse, print_expr, print_type};
use sable_typeck::{address_of, InferredType, TypeInference};

const SOURCE: &str = "\
package main

import (
\t\"fmt\"
\t\"strconv\"
)

type Point struct {
\tX, Y float64
}

func origin() Point {
\treturn Point{}
}

func run(args []string, scale float64) {
\tp := origin()
\tvar total int
\tn, err := strconv.Atoi(args[0])
\tmsg := fmt.Sprintf(\"%d\", n)
\tratio := p.X * scale
\tfor i, arg := range args {
\t\tfmt.Println(i, arg)
\t}
\tfmt.Println(total, err, msg, ratio)
}
";

fn func<'a>(file: &'a SourceFile, name: &str) -> &'a FuncDecl {
    file.decls
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Func(f) if f.name == name => Some(f),
            _ => None,
        })
        .unwrap()
}

#[test]
fn bindings_accumulate_through_a_body() {
    let file = parse(SOURCE).unwrap();
    let mut infer = TypeInference::new(TypeExpr::named("error"));
    infer.reset_for(&file);
    let run = func(&file, "run");
    infer.enter_function(None, &run.sig);

    let mut range_vars = None;
    for stmt in &run.body.as_ref().unwrap().stmts {
        infer.observe_stmt(stmt);
        if let StmtKind::For(for_stmt) = &stmt.kind {
            infer.push_scope();
            infer.observe_range(&for_stmt.kind);
            range_vars = Some((infer.lookup("i").cloned(), infer.lookup("arg").cloned()));
            infer.pop_scope();
        }
    }

    let name = |infer: &TypeInference, var: &str| infer.lookup(var).map(print_type);
    assert_eq!(name(&infer, "p").as_deref(), Some("Point"));
    assert_eq!(name(&infer, "total").as_deref(), Some("int"));
    assert_eq!(name(&infer, "n").as_deref(), Some("int"));
    assert_eq!(name(&infer, "err").as_deref(), Some("error"));
    assert_eq!(name(&infer, "msg").as_deref(), Some("string"));
    assert_eq!(name(&infer, "ratio").as_deref(), Some("float64"));
    assert_eq!(
        range_vars,
        Some((Some(TypeExpr::named("int")), Some(TypeExpr::named("string"))))
    );
    assert_eq!(infer.lookup("i"), None);
    assert_eq!(infer.current_results(), Some(&[][..]));
    infer.exit_function();
    assert_eq!(infer.current_results(), None);
}

#[test]
fn payload_addresses_follow_operand_kind() {
    let file = parse(SOURCE).unwrap();
    let mut infer = TypeInference::new(TypeExpr::named("error"));
    infer.reset_for(&file);
    let run = func(&file, "run");
    infer.enter_function(None, &run.sig);
    let mut names = NameGen::new();

    let scale = sable_syntax::parse_expr("scale").unwrap();
    let addr = address_of(scale, None, &mut infer, &mut names).unwrap();
    assert_eq!(print_expr(&addr), "&scale");

    let call = sable_syntax::parse_expr("origin()").unwrap();
    assert!(matches!(infer.infer(&call), InferredType::Structural(_)));
    let addr = address_of(call, None, &mut infer, &mut names).unwrap();
    assert_eq!(print_expr(&addr), "func() *Point { __tmp0 := origin(); return &__tmp0 }()");

    let text = sable_syntax::parse_expr("\"label\"").unwrap();
    let addr = address_of(text, None, &mut infer, &mut names).unwrap();
    assert_eq!(print_expr(&addr), "func() *string { __tmp1 := \"label\"; return &__tmp1 }()");
}
