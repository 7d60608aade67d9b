use sable_common::{Marker, MarkerId, MarkerPayload, Origin, Span};
use sable_syntax::ast::{DeclKind, ExprKind, StmtKind, TypeExpr};
use sable_syntax::{parse, parse_expr, print_file, FormatConfig};

fn spaces() -> FormatConfig {
    FormatConfig {
        indent_with_tabs: false,
        indent_size: 4,
        max_width: 100,
    }
}

fn target_marker(id: u32) -> Marker {
    Marker::new(
        MarkerId(id),
        Origin::new(3, Span::new(20, 40)),
        MarkerPayload::Target {
            match_id: 0,
            name: "area".into(),
        },
    )
}

#[test]
fn markers_attach_to_following_statement() {
    let marker = target_marker(7);
    let source = format!(
        "package p\n\nfunc f() {{\n\t// plain\n\t{}\n\tvar area float64\n\t_ = area\n}}\n",
        marker.encode().unwrap()
    );
    let file = parse(&source).unwrap();
    let DeclKind::Func(func) = &file.decls[0].kind else {
        panic!("expected func");
    };
    let stmts = &func.body.as_ref().unwrap().stmts;
    assert!(matches!(stmts[0].kind, StmtKind::Comment(ref c) if c == "// plain"));
    assert!(matches!(stmts[1].kind, StmtKind::Decl(_)));
    assert_eq!(stmts[1].markers, vec![marker]);
    assert!(stmts[2].markers.is_empty());
}

#[test]
fn markers_on_case_clauses() {
    let arm = target_marker(2);
    let source = format!(
        "package p\n\nfunc f(x int) {{\n\tswitch x {{\n\t{}\n\tcase 0:\n\t\tg()\n\t}}\n}}\n",
        arm.encode().unwrap()
    );
    let file = parse(&source).unwrap();
    let DeclKind::Func(func) = &file.decls[0].kind else {
        panic!("expected func");
    };
    let StmtKind::Switch(switch) = &func.body.as_ref().unwrap().stmts[0].kind else {
        panic!("expected switch");
    };
    assert_eq!(switch.clauses[0].markers, vec![arm]);
}

#[test]
fn dangling_marker_is_an_error() {
    let source = format!(
        "package p\n\nfunc f() {{\n\t{}\n}}\n",
        target_marker(1).encode().unwrap()
    );
    let err = parse(&source).unwrap_err();
    assert!(err.message.contains("#1"), "{}", err.message);
}

#[test]
fn malformed_marker_is_an_error() {
    let err = parse("package p\n\n// sable:marker {not json\nfunc f() {}\n").unwrap_err();
    assert!(err.message.starts_with("malformed marker"), "{}", err.message);
}

#[test]
fn composite_literal_not_allowed_in_if_header() {
    let file = parse("package p\n\nfunc f(x T) {\n\tif x == y {\n\t\treturn\n\t}\n}\n").unwrap();
    let DeclKind::Func(func) = &file.decls[0].kind else {
        panic!("expected func");
    };
    let StmtKind::If(if_stmt) = &func.body.as_ref().unwrap().stmts[0].kind else {
        panic!("expected if");
    };
    assert!(matches!(if_stmt.cond.kind, ExprKind::Binary { .. }));
}

#[test]
fn generic_instantiation_in_composite_literal() {
    let expr = parse_expr("Pair[int, string]{a, b}").unwrap();
    let ExprKind::Composite { ty: Some(ty), elems } = expr.kind else {
        panic!("expected composite literal");
    };
    assert_eq!(elems.len(), 2);
    let TypeExpr::Named { name, args, .. } = *ty else {
        panic!("expected named type");
    };
    assert_eq!(name, "Pair");
    assert_eq!(args.len(), 2);
}

#[test]
fn error_reports_position_and_found_token() {
    let err = parse("package p\n\nfunc f() {\n\tx := a[1\n\t]\n}\n").unwrap_err();
    assert_eq!(err.message, "expected `]`, found newline");
}

#[test]
fn unterminated_block_points_at_opening_brace() {
    let source = "package p\n\nfunc f() {\n\tx := 1\n";
    let err = parse(source).unwrap_err();
    let (label, span) = err.related.unwrap();
    assert_eq!(label, "block started here");
    assert_eq!(&source[span.range()], "{");
}

#[test]
fn snapshot_tagged_union_shape() {
    let source = "package shapes\n\ntype ShapeTag uint8\n\nconst (\nShapeTagCircle ShapeTag = iota\nShapeTagPoint\n)\n\ntype Shape struct {\ntag ShapeTag\ncircle0 *float64\n}\n\nfunc ShapeCircle(arg0 float64) Shape {\nreturn Shape{tag: ShapeTagCircle, circle0: &arg0}\n}\n\nfunc (v Shape) IsCircle() bool {\nreturn v.tag == ShapeTagCircle\n}\n";
    let file = parse(source).unwrap();
    let out = print_file(&file, &spaces()).code;
    insta::assert_snapshot!(out, @r"
    package shapes

    type ShapeTag uint8

    const (
        ShapeTagCircle ShapeTag = iota
        ShapeTagPoint
    )

    type Shape struct {
        tag ShapeTag
        circle0 *float64
    }

    func ShapeCircle(arg0 float64) Shape {
        return Shape{tag: ShapeTagCircle, circle0: &arg0}
    }

    func (v Shape) IsCircle() bool {
        return v.tag == ShapeTagCircle
    }
    ");
}
