use sable_common::NameGen;
use sable_lower::{Diagnostic, DiagnosticCode, LowerError, Transformer, Violation};
use sable_prep::{PrepOptions, Preprocessor};
use sable_syntax::ast::{Decl, DeclKind, GenDecl, SourceFile};

struct Lowered {
    file: SourceFile,
    text: String,
    decls: Vec<Decl>,
    diagnostics: Vec<Diagnostic>,
}

fn lower(source: &str) -> Lowered {
    let mut names = NameGen::new();
    let prep = Preprocessor::new(PrepOptions::default())
        .process(source, &mut names)
        .unwrap();
    let mut file = sable_syntax::parse(&prep.text).unwrap();
    let mut transformer = Transformer::default();
    transformer.transform(&mut file, &mut names).unwrap();
    Lowered {
        text: sable_syntax::print(&file),
        file,
        decls: transformer.pending_declarations(),
        diagnostics: transformer.take_diagnostics(),
    }
}

fn type_names(decls: &[Decl]) -> Vec<String> {
    decls
        .iter()
        .filter_map(|d| match &d.kind {
            DeclKind::Gen(GenDecl::Type { specs, .. }) => Some(specs[0].name.clone()),
            _ => None,
        })
        .collect()
}

const SHAPES: &str = "package shapes

enum Shape {
    Circle(float64),
    Rect { w float64, h float64 },
    Point,
}

func unit() Shape {
    return Shape.Circle(1.0)
}

func area(s Shape) float64 {
    return match s {
        Circle(r) if r > 10.0 => 0.0,
        Circle(r) => 3.14 * r * r,
        Rect { w, h } => w * h,
        Point => 0.0,
    }
}
";

#[test]
fn optional_match_binds_the_payload() {
    let out = lower(
        "package p\n\nfunc get(opt Option[int]) int {\n\treturn match opt {\n\t\tSome(x) => x,\n\t\tNone => 0,\n\t}\n}\n",
    );
    assert!(out.text.contains("func get(opt Option_int) int {"));
    assert!(out.text.contains("case OptionTagSome:"));
    assert!(out.text.contains("x := *__scrut0.some0"));
    assert!(out.text.contains("return x"));
    assert!(out.text.contains("default:"));
    assert!(out.text.contains("return 0"));
    assert!(!out.text.contains("panic("));
    assert!(out.diagnostics.is_empty());
    assert_eq!(type_names(&out.decls), ["OptionTag", "Option_int"]);
}

#[test]
fn literal_payloads_go_through_a_temporary() {
    let out = lower("package p\n\nfunc answer() Result[int, error] {\n\treturn Ok(42)\n}\n");
    assert!(out.text.contains("__tmp0 := 42; return &__tmp0"));
    assert!(!out.text.contains("&42"));
}

#[test]
fn missing_variants_are_reported() {
    let out = lower(
        "package p\n\nenum Light {\n\tRed,\n\tAmber,\n\tGreen,\n}\n\nfunc go_(l Light) bool {\n\treturn match l {\n\t\tRed => false,\n\t\tGreen => true,\n\t}\n}\n",
    );
    let gaps: Vec<&Diagnostic> = out
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::ExhaustivenessGap)
        .collect();
    assert_eq!(gaps.len(), 1);
    assert!(gaps[0].notes.iter().any(|n| n.contains("Amber")));
    assert_eq!(gaps[0].origin.map(|o| o.line), Some(10));
    assert!(out.text.contains("panic(\"sable: non-exhaustive match at line 10\")"));
}

#[test]
fn tuple_matches_dispatch_depth_first() {
    let out = lower(
        "package p\n\nfunc sum(a, b Result[int, error]) int {\n\treturn match (a, b) {\n\t\t(Ok(x), Ok(y)) => x + y,\n\t\t_ => 0,\n\t}\n}\n",
    );
    let outer = out.text.find("switch __scrut0_0.tag {").unwrap();
    let inner = out.text.find("switch __scrut0_1.tag {").unwrap();
    assert!(outer < inner);
    assert!(out.text.contains("x := *__scrut0_0.ok0"));
    assert!(out.text.contains("y := *__scrut0_1.ok0"));
    assert!(!out.text.contains("panic("));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn commas_inside_string_bodies_survive() {
    let out = lower(
        "package p\n\nfunc label(o Option[int]) string {\n\treturn match o {\n\t\tSome(_) => \"a, b\",\n\t\tNone => \"c\",\n\t}\n}\n",
    );
    assert!(out.text.contains("return \"a, b\""));
    assert!(out.text.contains("return \"c\""));
}

#[test]
fn enums_lower_to_tagged_unions() {
    let out = lower(SHAPES);
    assert!(out.text.contains("return ShapeCircle(1.0)"));
    assert!(out.text.contains("if r > 10.0 {"));
    assert!(out.text.contains("h := *__scrut0.rect1"));
    assert_eq!(type_names(&out.decls), ["ShapeTag", "Shape"]);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn nested_matches_are_lowered_inside_arms() {
    let out = lower(
        "package p\n\nfunc add(a, b Option[int]) int {\n\treturn match a {\n\t\tSome(x) => match b {\n\t\t\tSome(y) => x + y,\n\t\t\tNone => x,\n\t\t},\n\t\tNone => 0,\n\t}\n}\n",
    );
    assert_eq!(out.text.matches("case OptionTagSome:").count(), 2);
    assert!(out.text.contains("return x + y"));
    assert!(!out.text.contains("sable:marker"));
}

#[test]
fn lowering_lowered_output_changes_nothing() {
    let first = lower(SHAPES);
    let mut file = sable_syntax::parse(&first.text).unwrap();
    let mut names = NameGen::new();
    let mut transformer = Transformer::default();
    transformer.transform(&mut file, &mut names).unwrap();
    assert_eq!(sable_syntax::print(&file), first.text);
    assert!(transformer.pending_declarations().is_empty());
}

#[test]
fn declarations_are_drained_once() {
    let mut names = NameGen::new();
    let prep = Preprocessor::new(PrepOptions::default())
        .process(SHAPES, &mut names)
        .unwrap();
    let mut file = sable_syntax::parse(&prep.text).unwrap();
    let mut transformer = Transformer::default();
    transformer.transform(&mut file, &mut names).unwrap();
    assert!(!transformer.pending_declarations().is_empty());
    assert!(transformer.pending_declarations().is_empty());
}

#[test]
fn stray_markers_are_fatal() {
    let mut names = NameGen::new();
    let prep = Preprocessor::new(PrepOptions::default())
        .process(SHAPES, &mut names)
        .unwrap();
    let mut file = sable_syntax::parse(&prep.text).unwrap();
    let area = file
        .decls
        .iter_mut()
        .find_map(|d| match &mut d.kind {
            DeclKind::Func(f) if f.name == "area" => f.body.as_mut(),
            _ => None,
        })
        .unwrap();
    // Drop the dispatch: its scrutinee binding is left without a match.
    let dispatch = area.stmts.len() - 1;
    area.stmts.remove(dispatch);
    let err = Transformer::default().transform(&mut file, &mut names).unwrap_err();
    assert!(matches!(
        err,
        LowerError::Marker {
            violation: Violation::Missing,
            ..
        }
    ));
}

#[test]
fn first_file_output_is_stable() {
    let a = lower(SHAPES);
    let b = lower(SHAPES);
    assert_eq!(a.text, b.text);
    assert_eq!(a.decls, b.decls);
    assert_eq!(a.file, b.file);
}
