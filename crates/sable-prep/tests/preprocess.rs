use sable_common::{Marker, MarkerKind, MarkerPayload, MatchTarget, NameGen};
use sable_prep::{PrepErrorKind, PrepOptions, Preprocessed, Preprocessor};

fn run(source: &str) -> Preprocessed {
    let mut names = NameGen::new();
    Preprocessor::new(PrepOptions::default())
        .process(source, &mut names)
        .unwrap()
}

fn fail(source: &str) -> (PrepErrorKind, u32) {
    let mut names = NameGen::new();
    let err = Preprocessor::new(PrepOptions::default())
        .process(source, &mut names)
        .unwrap_err();
    (err.kind, err.line)
}

/// Skeleton with markers shortened to their kind and id and tabs expanded.
fn render(pre: &Preprocessed) -> String {
    pre.text
        .lines()
        .map(|line| {
            let indent = &line[..line.len() - line.trim_start().len()];
            let body = match Marker::decode(line) {
                Ok(Some(marker)) => format!("{indent}// {} {}", marker.kind(), marker.id.0),
                _ => line.to_string(),
            };
            body.replace('\t', "    ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn markers(pre: &Preprocessed) -> Vec<Marker> {
    pre.text
        .lines()
        .filter_map(|line| Marker::decode(line).unwrap())
        .collect()
}

const SHAPES: &str = "package shapes

enum Shape {
    Circle(float64),
    Rect { w float64, h float64 },
    Point,
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
fn shapes_skeleton() {
    let pre = run(SHAPES);
    insta::assert_snapshot!(render(&pre), @r"
    package shapes

    // enum_decl 0
    type Shape struct { Circle struct { _0 float64 }; Rect struct { w float64; h float64 }; Point struct{} }

    func area(s Shape) float64 {
        // scrutinee 1
        __scrut0 := s
        // dispatch 2
        switch __scrut0 {
        // arm 3
        case 0:
            if r > 10.0 {
                return 0.0
            }
        // arm 4
        case 1:
            return 3.14 * r * r
        // arm 5
        case 2:
            return w * h
        // arm 6
        case 3:
            return 0.0
        }
    }
    ");
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn metadata_points_at_marker_lines_and_original_constructs() {
    let pre = run(SHAPES);
    let lines: Vec<&str> = pre.text.lines().collect();
    assert_eq!(pre.metadata.len(), 7);
    for meta in &pre.metadata {
        let line = lines[meta.generated_line as usize - 1];
        let marker = Marker::decode(line).unwrap().unwrap();
        assert_eq!(marker.id, meta.id);
        assert_eq!(marker.kind(), meta.kind);
    }
    let arms: Vec<u32> = pre
        .metadata
        .iter()
        .filter(|m| m.kind == MarkerKind::Arm)
        .map(|m| m.original_line)
        .collect();
    assert_eq!(arms, vec![11, 12, 13, 14]);
    assert_eq!(pre.metadata[0].original_line, 3);
    assert_eq!(pre.line_origins.len(), lines.len());
    // `func area` stays on its original line's origin.
    let func_line = lines.iter().position(|l| l.starts_with("func area")).unwrap();
    assert_eq!(pre.line_origins[func_line], 9);
}

#[test]
fn arm_markers_carry_patterns_and_guards() {
    let pre = run(SHAPES);
    let arms: Vec<MarkerPayload> = markers(&pre)
        .into_iter()
        .map(|m| m.payload)
        .filter(|p| matches!(p, MarkerPayload::Arm { .. }))
        .collect();
    let MarkerPayload::Arm { pattern, guard, bindings, .. } = &arms[0] else {
        unreachable!()
    };
    assert_eq!(pattern.to_string(), "Circle(r)");
    assert_eq!(guard.as_deref(), Some("r > 10.0"));
    assert_eq!(bindings, &vec!["r".to_string()]);
    let MarkerPayload::Arm { bindings, .. } = &arms[2] else {
        unreachable!()
    };
    assert_eq!(bindings, &vec!["w".to_string(), "h".to_string()]);
}

#[test]
fn output_is_a_fixed_point() {
    let once = run(SHAPES);
    let twice = run(&once.text);
    assert_eq!(twice.text, once.text);
    assert!(twice.metadata.is_empty());
}

#[test]
fn commas_inside_strings_stay_in_the_arm() {
    let pre = run(
        "package p\n\nfunc f(r Result[int, error]) string {\n\treturn match r {\n\t\tOk(n) => fmt.Sprintf(\"a, b: %d\", n),\n\t\tErr(e) => e.Error(),\n\t}\n}\n",
    );
    assert!(pre.text.contains("\treturn fmt.Sprintf(\"a, b: %d\", n)\n"));
    assert!(pre.text.contains("\treturn e.Error()\n"));
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn literal_bodies_are_kept_whole() {
    let pre = run("package p\n\nfunc f(o Option[int]) string {\n\treturn match o {\n\t\tSome(_) => \"a, b\",\n\t\tNone => `n, o`,\n\t}\n}\n\nfunc g(n int) string {\n\treturn match n {\n\t\t1 => \"one\",\n\t\t_ => \"\",\n\t}\n}\n");
    assert!(pre.text.contains("\treturn \"a, b\"\n"));
    assert!(pre.text.contains("\treturn `n, o`\n"));
    assert!(pre.text.contains("\treturn \"one\"\n"));
    assert!(pre.text.contains("\treturn \"\"\n"));
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn assignment_forms_declare_the_target() {
    let pre = run("package p\n\nfunc f(o Option[int]) {\n\tx := match o {\n\t\tSome(v) => v,\n\t\tNone => 0,\n\t}\n\tvar y string = match o {\n\t\t_ => \"\",\n\t}\n\tx = match o {\n\t\t_ => 1,\n\t}\n}\n");
    assert!(pre.text.contains("\tvar x __sable_infer\n"));
    assert!(pre.text.contains("\t\tx = v\n"));
    assert!(pre.text.contains("\tvar y string\n"));
    let targets: Vec<MatchTarget> = markers(&pre)
        .into_iter()
        .filter_map(|m| match m.payload {
            MarkerPayload::Dispatch { target, .. } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            MatchTarget::Assign {
                name: "x".into(),
                declare: true,
                annotated: false
            },
            MatchTarget::Assign {
                name: "y".into(),
                declare: true,
                annotated: true
            },
            MatchTarget::Assign {
                name: "x".into(),
                declare: false,
                annotated: false
            },
        ]
    );
    let target_markers = markers(&pre)
        .iter()
        .filter(|m| m.kind() == MarkerKind::Target)
        .count();
    assert_eq!(target_markers, 2);
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn tuple_scrutinee_gets_one_binding_per_slot() {
    let pre = run("package p\n\nfunc f(a, b Option[int]) int {\n\treturn match (a, g(b, 1)) {\n\t\t(Some(x), Some(y)) => x + y,\n\t\t_ => 0,\n\t}\n}\n");
    assert!(pre.text.contains("\t__scrut0_0 := a\n"));
    assert!(pre.text.contains("\t__scrut0_1 := g(b, 1)\n"));
    assert!(pre.text.contains("\tswitch {\n"));
    let slots = pre.metadata.iter().filter(|m| m.kind == MarkerKind::Scrutinee).count();
    assert_eq!(slots, 2);
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn tuple_arity_limit_is_configurable() {
    let mut names = NameGen::new();
    let err = Preprocessor::new(PrepOptions { max_tuple_arity: 2 })
        .process(
            "package p\n\nfunc f() {\n\tmatch (a, b, c) {\n\t\t_ => g(),\n\t}\n}\n",
            &mut names,
        )
        .unwrap_err();
    assert_eq!(err.kind, PrepErrorKind::TupleArityExceeded { arity: 3, max: 2 });
    assert_eq!(err.line, 4);
}

#[test]
fn nested_expression_match_inherits_return() {
    let pre = run("package p\n\nfunc f(a, b Option[int]) int {\n\treturn match a {\n\t\tSome(x) => match b {\n\t\t\tSome(y) => x + y,\n\t\t\tNone => x,\n\t\t},\n\t\tNone => 0,\n\t}\n}\n");
    assert!(pre.text.contains("return x + y\n"));
    assert!(pre.text.contains("__scrut1 := b\n"));
    let returns = markers(&pre)
        .into_iter()
        .filter(|m| {
            matches!(
                m.payload,
                MarkerPayload::Dispatch {
                    target: MatchTarget::Return,
                    ..
                }
            )
        })
        .count();
    assert_eq!(returns, 2);
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn trailing_match_in_block_inherits_assignment() {
    let pre = run("package p\n\nfunc f(a, b Option[int]) {\n\tv := match a {\n\t\tSome(x) => {\n\t\t\ty := x * 2\n\t\t\tmatch b {\n\t\t\t\tSome(z) => y + z,\n\t\t\t\tNone => y,\n\t\t\t}\n\t\t},\n\t\tNone => 0,\n\t}\n\t_ = v\n}\n");
    assert!(pre.text.contains("v = y + z\n"));
    assert!(pre.text.contains("v = y\n"));
    assert!(pre.text.contains("v = 0\n"));
    assert_eq!(pre.text.matches("var v __sable_infer").count(), 1);
    sable_syntax::parse(&pre.text).unwrap();
}

#[test]
fn keywords_in_strings_and_comments_are_ignored() {
    let source = "package p\n\n// match x {\nvar q = `\nmatch x {\nenum E {\n`\nvar s = \"match x { _ => 1 }\"\n";
    let pre = run(source);
    assert_eq!(pre.text, source);
    assert!(pre.metadata.is_empty());
}

#[test]
fn syntax_errors_name_the_line() {
    let cases = [
        (
            "package p\n\nfunc f(x int) int {\n\treturn match x {\n\t\t1 => 10\n\t\t2 => 20,\n\t}\n}\n",
            PrepErrorKind::MissingComma,
            5,
        ),
        (
            "package p\n\nfunc f(x int) int {\n\treturn match x {\n\t\t1 -> 10,\n\t}\n}\n",
            PrepErrorKind::MissingArrow,
            5,
        ),
        (
            "package p\n\nfunc f() {\n\tmatch x {\n\t\t_ => 1,\n",
            PrepErrorKind::UnterminatedBlock { construct: "match" },
            4,
        ),
        (
            "package p\n\nfunc f() {\n\tmatch x {\n\t}\n}\n",
            PrepErrorKind::EmptyMatch,
            4,
        ),
        (
            "package p\n\nfunc f() {\n\tg(match x { _ => 1 })\n}\n",
            PrepErrorKind::UnsupportedMatchPosition,
            4,
        ),
        (
            "package p\n\nfunc f() {\n\tx := match y {\n\t\t_ => 1,\n\t}.String()\n}\n",
            PrepErrorKind::TrailingText(".String()".into()),
            6,
        ),
        (
            "package p\n\nfunc f() {\n\ts := \"abc\n}\n",
            PrepErrorKind::UnterminatedString,
            4,
        ),
        (
            "package p\n\nenum Option[T] {\n\tSome(T),\n}\n",
            PrepErrorKind::GenericEnumUnsupported("Option".into()),
            3,
        ),
        (
            "package p\n\nenum E {\n\tA,\n\tB(int),\n\tA,\n}\n",
            PrepErrorKind::DuplicateVariant("A".into()),
            3,
        ),
        (
            "package p\n\nenum E {\n}\n",
            PrepErrorKind::InvalidEnum("enum `E` has no variants".into()),
            3,
        ),
        (
            "package p\n\nfunc f() {\n\tmatch o {\n\t\tSome(x) | None => 1,\n\t}\n}\n",
            PrepErrorKind::OrPatternBindingMismatch,
            5,
        ),
        (
            "package p\n\nfunc f(n int) string {\n\treturn match n {\n\t\t1 => \"one\",\n\t\t2 => ,\n\t}\n}\n",
            PrepErrorKind::EmptyArmBody,
            6,
        ),
        (
            "package p\n\nfunc f() {\n\tmatch (a, b) {\n\t\t(x, y, z) => 1,\n\t}\n}\n",
            PrepErrorKind::TupleArityMismatch { expected: 2, found: 3 },
            5,
        ),
    ];
    for (source, kind, line) in cases {
        assert_eq!(fail(source), (kind, line), "{source}");
    }
}

#[test]
fn names_continue_across_units_sharing_a_generator() {
    let mut names = NameGen::new();
    let mut prep = Preprocessor::new(PrepOptions::default());
    let source = "package p\n\nfunc f(x int) {\n\tmatch x {\n\t\t_ => g(),\n\t}\n}\n";
    prep.process(source, &mut names).unwrap();
    let second = prep.process(source, &mut names).unwrap();
    assert!(second.text.contains("__scrut1 := x"));
}
