//! Printer for the syntax tree.
//!
//! Printing works in two steps, after the layout engine this module is
//! built on:
//!
//! 1. Walk the tree to produce a `FormatIR` document
//! 2. Print the IR, respecting indentation and line width
//!
//! Declarations and statements that carry an [`Origin`] leave an anchor in
//! the IR, so printing also yields a map from generated lines back to the
//! original source.

pub mod ir;
pub mod printer;
mod walker;

use serde::Serialize;

use sable_common::Origin;

use crate::ast::{Expr, SourceFile, Stmt, TypeExpr};

pub use printer::FormatConfig;

/// A generated line that was synthesized for a construct in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mapping {
    /// 1-based line in the printed output.
    pub generated_line: u32,
    pub origin: Origin,
}

/// Printed source plus line mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct Printed {
    pub code: String,
    pub mappings: Vec<Mapping>,
}

/// Print a whole file.
pub fn print_file(file: &SourceFile, config: &FormatConfig) -> Printed {
    let mut walker = walker::Walker::new();
    let doc = walker.file(file);
    let out = printer::print_with_anchors(&doc, config);
    let origins = walker.into_anchors();
    let mappings = out
        .anchors
        .iter()
        .filter_map(|&(id, line)| {
            origins.get(id).map(|&origin| Mapping {
                generated_line: line,
                origin,
            })
        })
        .collect();
    Printed {
        code: out.text,
        mappings,
    }
}

fn print_fragment(doc: ir::FormatIR) -> String {
    let config = FormatConfig {
        max_width: usize::MAX / 2,
        ..FormatConfig::default()
    };
    let mut out = printer::print(&doc, &config);
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Print an expression on a single line where possible.
pub fn print_expr(expr: &Expr) -> String {
    print_fragment(walker::Walker::new().expr(expr))
}

pub fn print_type(ty: &TypeExpr) -> String {
    print_fragment(walker::Walker::new().type_expr(ty))
}

pub fn print_stmt(stmt: &Stmt) -> String {
    print_fragment(walker::Walker::new().stmt(stmt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, parse_expr, parse_type};

    fn roundtrip(source: &str) -> String {
        let file = parse(source).unwrap();
        print_file(&file, &FormatConfig::default()).code
    }

    fn assert_idempotent(source: &str) {
        let once = roundtrip(source);
        let twice = roundtrip(&once);
        assert_eq!(once, twice, "printing is not idempotent:\n{once}");
    }

    #[test]
    fn prints_canonical_function() {
        let out = roundtrip("package main\nimport \"fmt\"\nfunc main() {\nx := 1\nif x > 0 {\nfmt.Println(x)\n}\n}\n");
        assert_eq!(
            out,
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tx := 1\n\tif x > 0 {\n\t\tfmt.Println(x)\n\t}\n}\n"
        );
    }

    #[test]
    fn switch_cases_align_with_switch() {
        let out = roundtrip("package p\nfunc f(x int) int {\nswitch x {\ncase 1, 2:\nreturn 1\ndefault:\nreturn 0\n}\n}\n");
        assert_eq!(
            out,
            "package p\n\nfunc f(x int) int {\n\tswitch x {\n\tcase 1, 2:\n\t\treturn 1\n\tdefault:\n\t\treturn 0\n\t}\n}\n"
        );
    }

    #[test]
    fn simple_func_literal_stays_on_one_line() {
        let expr = parse_expr("func() *int { __tmp0 := 42; return &__tmp0 }()").unwrap();
        assert_eq!(print_expr(&expr), "func() *int { __tmp0 := 42; return &__tmp0 }()");
    }

    #[test]
    fn parenthesizes_by_precedence() {
        let expr = parse_expr("(a + b) * c").unwrap();
        assert_eq!(print_expr(&expr), "(a + b) * c");
        let expr = parse_expr("a - (b - c)").unwrap();
        assert_eq!(print_expr(&expr), "a - (b - c)");
        let expr = parse_expr("!(a && b)").unwrap();
        assert_eq!(print_expr(&expr), "!(a && b)");
    }

    #[test]
    fn prints_types() {
        for source in [
            "map[string][]*int",
            "func(int, string) (bool, error)",
            "<-chan int",
            "chan<- error",
            "Result[int, error]",
            "[4]byte",
            "struct{}",
        ] {
            let ty = parse_type(source).unwrap();
            assert_eq!(print_type(&ty), source);
        }
    }

    #[test]
    fn comments_and_grouped_declarations_survive() {
        assert_idempotent(
            "package p\n\n// Version is the release.\nconst (\n\tA = iota\n\tB\n)\n\ntype T struct {\n\tName string `json:\"name\"`\n\tp    *T\n}\n\nfunc (t *T) Get() (string, error) {\n\t// trailing work\n\treturn t.Name, nil // done\n}\n",
        );
    }

    #[test]
    fn idempotent_control_flow() {
        assert_idempotent(
            "package p\n\nfunc f(xs []int, m map[string]int) {\n\tfor i := 0; i < len(xs); i++ {\n\t\tcontinue\n\t}\n\tfor k, v := range m {\n\t\t_ = k\n\t\t_ = v\n\t}\n\tfor range xs {\n\t\tbreak\n\t}\n\tswitch v := any(xs).(type) {\n\tcase []int:\n\t\t_ = v\n\t}\n\tif err := g(); err != nil {\n\t\treturn\n\t} else if x := 2; x > 1 {\n\t\tdefer h()\n\t}\n}\n",
        );
    }

    #[test]
    fn long_calls_break_one_argument_per_line() {
        let config = FormatConfig {
            max_width: 30,
            ..FormatConfig::default()
        };
        let file = parse("package p\n\nfunc f() {\n\tcall(alpha, beta, gamma, delta)\n}\n").unwrap();
        assert_eq!(
            print_file(&file, &config).code,
            "package p\n\nfunc f() {\n\tcall(\n\t\talpha,\n\t\tbeta,\n\t\tgamma,\n\t\tdelta,\n\t)\n}\n"
        );
    }

    #[test]
    fn origins_become_line_mappings() {
        let mut file = parse("package p\n\nfunc f() {\n\ta()\n\tb()\n}\n").unwrap();
        let origin = Origin::new(9, sable_common::Span::new(40, 43));
        let decl = &mut file.decls[0];
        if let crate::ast::DeclKind::Func(func) = &mut decl.kind {
            let body = func.body.as_mut().unwrap();
            body.stmts[1].origin = Some(origin);
        }
        let printed = print_file(&file, &FormatConfig::default());
        assert_eq!(
            printed.mappings,
            vec![Mapping {
                generated_line: 5,
                origin
            }]
        );
    }
}
