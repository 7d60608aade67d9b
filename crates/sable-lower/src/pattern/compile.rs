//! Pattern matrix to decision tree compiler.
//!
//! Maranget's algorithm over the rows produced by pattern resolution:
//!
//! 1. Rows are the or-expanded arms, one column per scrutinee slot.
//! 2. If the first row is all wildcards it wins: a `Leaf`, or a `Guard`
//!    whose failure branch compiles the remaining rows.
//! 3. Otherwise pick the column with the most distinct head constructors.
//! 4. Variant heads become a `Switch` (one specialized matrix per variant,
//!    in tag order, plus a default matrix when the variants are not all
//!    present); literal heads become a chain of `Test`s.
//! 5. Recurse until every row is consumed; an empty matrix is `Fail`.
//!
//! Specialization pushes a variant's payload slots as new columns in front
//! of the remaining ones, addressed by [`AccessPath::Field`].

use sable_common::{LitKind, Literal};

use crate::pattern::{AccessPath, Bindings, Ctor, DecisionTree, MatchRow, Pat};
use crate::shape::UnionCatalog;

// ── Pattern Matrix ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct PatRow {
    patterns: Vec<Pat>,
    arm_index: usize,
    guarded: bool,
    /// Bindings collected from columns already removed.
    bindings: Bindings,
}

#[derive(Debug, Clone)]
struct PatMatrix {
    rows: Vec<PatRow>,
    /// Where each column's value lives.
    column_paths: Vec<AccessPath>,
}

/// A distinct head found in one column.
#[derive(Debug, Clone)]
enum HeadCtor {
    Literal(Literal),
    Constructor {
        union: String,
        variant: String,
        tag: usize,
        arity: usize,
    },
}

// ── Public API ─────────────────────────────────────────────────────────

/// Compile resolved rows over `arity` scrutinee slots.
///
/// Fails when one column mixes unions, or variants with literals.
pub fn compile_match(rows: &[MatchRow], arity: usize, catalog: &UnionCatalog) -> Result<DecisionTree, String> {
    let matrix = PatMatrix {
        rows: rows
            .iter()
            .map(|row| PatRow {
                patterns: row.pats.clone(),
                arm_index: row.arm_index,
                guarded: row.guarded,
                bindings: Vec::new(),
            })
            .collect(),
        column_paths: (0..arity).map(AccessPath::Slot).collect(),
    };
    compile_matrix(matrix, catalog)
}

// ── Core compilation ───────────────────────────────────────────────────

fn compile_matrix(matrix: PatMatrix, catalog: &UnionCatalog) -> Result<DecisionTree, String> {
    if matrix.rows.is_empty() {
        return Ok(DecisionTree::Fail);
    }

    if matrix.rows[0].patterns.iter().all(Pat::is_wild) {
        let mut row = matrix.rows[0].clone();
        collect_bindings_from_row(&mut row, &matrix.column_paths);
        let rest = PatMatrix {
            rows: matrix.rows[1..].to_vec(),
            column_paths: matrix.column_paths.clone(),
        };
        return make_leaf_or_guard(row, rest, catalog);
    }

    let col = select_column(&matrix);
    let heads = collect_head_constructors(&matrix, col)?;
    match heads.first() {
        Some(HeadCtor::Constructor { .. }) => compile_constructor_switch(&matrix, col, &heads, catalog),
        _ => compile_literal_tests(&matrix, col, &heads, catalog),
    }
}

/// A guarded row falls through to the rows below it, columns intact.
fn make_leaf_or_guard(row: PatRow, rest: PatMatrix, catalog: &UnionCatalog) -> Result<DecisionTree, String> {
    if !row.guarded {
        return Ok(DecisionTree::Leaf {
            arm_index: row.arm_index,
            bindings: row.bindings,
        });
    }
    Ok(DecisionTree::Guard {
        arm_index: row.arm_index,
        bindings: row.bindings,
        failure: Box::new(compile_matrix(rest, catalog)?),
    })
}

fn collect_bindings_from_row(row: &mut PatRow, column_paths: &[AccessPath]) {
    for (pat, path) in row.patterns.iter().zip(column_paths) {
        if let Pat::Wild(Some(name)) = pat {
            row.bindings.push((name.clone(), path.clone()));
        }
    }
}

// ── Column selection ───────────────────────────────────────────────────

/// The column with the most distinct heads; the leftmost wins ties.
fn select_column(matrix: &PatMatrix) -> usize {
    let mut best_col = 0;
    let mut best_score = 0;
    for col in 0..matrix.column_paths.len() {
        let mut seen: Vec<&Ctor> = Vec::new();
        for row in &matrix.rows {
            if let Pat::Ctor(ctor, _) = &row.patterns[col] {
                if !seen.contains(&ctor) {
                    seen.push(ctor);
                }
            }
        }
        if seen.len() > best_score {
            best_score = seen.len();
            best_col = col;
        }
    }
    best_col
}

/// Distinct heads of a column. Variants come back in tag order, literals
/// in order of first appearance.
fn collect_head_constructors(matrix: &PatMatrix, col: usize) -> Result<Vec<HeadCtor>, String> {
    let mut literals: Vec<Literal> = Vec::new();
    let mut variants: Vec<HeadCtor> = Vec::new();
    let mut union_seen: Option<&str> = None;

    for row in &matrix.rows {
        let Pat::Ctor(ctor, args) = &row.patterns[col] else {
            continue;
        };
        match ctor {
            Ctor::Lit(lit) => {
                if !literals.contains(lit) {
                    literals.push(lit.clone());
                }
            }
            Ctor::Variant { union, variant, tag } => {
                match union_seen {
                    Some(seen) if seen != union => {
                        return Err(format!("patterns of `{seen}` and `{union}` cannot match the same value"));
                    }
                    _ => union_seen = Some(union),
                }
                let known = variants
                    .iter()
                    .any(|h| matches!(h, HeadCtor::Constructor { variant: v, .. } if v == variant));
                if !known {
                    variants.push(HeadCtor::Constructor {
                        union: union.clone(),
                        variant: variant.clone(),
                        tag: *tag,
                        arity: args.len(),
                    });
                }
            }
        }
    }

    if !literals.is_empty() && !variants.is_empty() {
        return Err("literal and variant patterns cannot match the same value".to_string());
    }
    if variants.is_empty() {
        return Ok(literals.into_iter().map(HeadCtor::Literal).collect());
    }
    variants.sort_by_key(|h| match h {
        HeadCtor::Constructor { tag, .. } => *tag,
        HeadCtor::Literal(_) => usize::MAX,
    });
    Ok(variants)
}

// ── Constructor switch ─────────────────────────────────────────────────

fn compile_constructor_switch(
    matrix: &PatMatrix,
    col: usize,
    heads: &[HeadCtor],
    catalog: &UnionCatalog,
) -> Result<DecisionTree, String> {
    let path = matrix.column_paths[col].clone();
    let mut union_name = String::new();
    let mut cases = Vec::with_capacity(heads.len());

    for head in heads {
        if let HeadCtor::Constructor {
            union,
            variant,
            arity,
            ..
        } = head
        {
            union_name.clone_from(union);
            let specialized = specialize_for_constructor(matrix, col, variant, *arity);
            cases.push((variant.clone(), compile_matrix(specialized, catalog)?));
        }
    }

    let total = catalog.get(&union_name).map_or(usize::MAX, |shape| shape.variants.len());
    let default = if cases.len() >= total {
        None
    } else {
        Some(Box::new(compile_matrix(default_matrix(matrix, col), catalog)?))
    };

    Ok(DecisionTree::Switch {
        path,
        union: union_name,
        cases,
        default,
    })
}

/// Rows matching `variant` contribute their payload patterns; wildcard rows
/// contribute `arity` wildcards.
fn specialize_for_constructor(matrix: &PatMatrix, col: usize, target: &str, arity: usize) -> PatMatrix {
    let parent = &matrix.column_paths[col];
    let mut rows = Vec::new();

    for row in &matrix.rows {
        let mut bindings = row.bindings.clone();
        let mut patterns = match &row.patterns[col] {
            Pat::Ctor(Ctor::Variant { variant, .. }, args) if variant == target => args.clone(),
            Pat::Ctor(..) => continue,
            Pat::Wild(name) => {
                if let Some(name) = name {
                    bindings.push((name.clone(), parent.clone()));
                }
                vec![Pat::Wild(None); arity]
            }
        };
        patterns.extend(without(&row.patterns, col));
        rows.push(PatRow {
            patterns,
            arm_index: row.arm_index,
            guarded: row.guarded,
            bindings,
        });
    }

    let mut column_paths: Vec<AccessPath> = (0..arity).map(|slot| AccessPath::field(parent, target, slot)).collect();
    column_paths.extend(without(&matrix.column_paths, col));
    PatMatrix { rows, column_paths }
}

/// Rows with a wildcard in `col`, the column removed.
fn default_matrix(matrix: &PatMatrix, col: usize) -> PatMatrix {
    let path = &matrix.column_paths[col];
    let rows = matrix
        .rows
        .iter()
        .filter_map(|row| {
            let Pat::Wild(name) = &row.patterns[col] else {
                return None;
            };
            let mut bindings = row.bindings.clone();
            if let Some(name) = name {
                bindings.push((name.clone(), path.clone()));
            }
            Some(PatRow {
                patterns: without(&row.patterns, col),
                arm_index: row.arm_index,
                guarded: row.guarded,
                bindings,
            })
        })
        .collect();
    PatMatrix {
        rows,
        column_paths: without(&matrix.column_paths, col),
    }
}

// ── Literal tests ──────────────────────────────────────────────────────

/// A chain of equality tests, one per literal. The last failure branch is
/// the default matrix, except for a bool column testing both values.
fn compile_literal_tests(
    matrix: &PatMatrix,
    col: usize,
    heads: &[HeadCtor],
    catalog: &UnionCatalog,
) -> Result<DecisionTree, String> {
    let path = matrix.column_paths[col].clone();
    let mut literals: Vec<&Literal> = heads
        .iter()
        .filter_map(|h| match h {
            HeadCtor::Literal(lit) => Some(lit),
            HeadCtor::Constructor { .. } => None,
        })
        .collect();

    let both_bools = literals.len() == 2 && literals.iter().all(|lit| lit.kind == LitKind::Bool);
    let mut failure = match literals.pop() {
        Some(last) if both_bools => compile_matrix(specialize_for_literal(matrix, col, last), catalog)?,
        Some(last) => {
            let default = compile_matrix(default_matrix(matrix, col), catalog)?;
            DecisionTree::Test {
                path: path.clone(),
                value: last.clone(),
                success: Box::new(compile_matrix(specialize_for_literal(matrix, col, last), catalog)?),
                failure: Box::new(default),
            }
        }
        None => compile_matrix(default_matrix(matrix, col), catalog)?,
    };

    for lit in literals.into_iter().rev() {
        let success = compile_matrix(specialize_for_literal(matrix, col, lit), catalog)?;
        failure = DecisionTree::Test {
            path: path.clone(),
            value: lit.clone(),
            success: Box::new(success),
            failure: Box::new(failure),
        };
    }
    Ok(failure)
}

fn specialize_for_literal(matrix: &PatMatrix, col: usize, target: &Literal) -> PatMatrix {
    let path = &matrix.column_paths[col];
    let rows = matrix
        .rows
        .iter()
        .filter_map(|row| {
            let mut bindings = row.bindings.clone();
            match &row.patterns[col] {
                Pat::Ctor(Ctor::Lit(lit), _) if lit == target => {}
                Pat::Ctor(..) => return None,
                Pat::Wild(name) => {
                    if let Some(name) = name {
                        bindings.push((name.clone(), path.clone()));
                    }
                }
            }
            Some(PatRow {
                patterns: without(&row.patterns, col),
                arm_index: row.arm_index,
                guarded: row.guarded,
                bindings,
            })
        })
        .collect();
    PatMatrix {
        rows,
        column_paths: without(&matrix.column_paths, col),
    }
}

fn without<T: Clone>(items: &[T], col: usize) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != col)
        .map(|(_, item)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::resolve_arm;
    use crate::pattern::tests::shapes;
    use sable_common::{Pattern, VariantFields};
    use sable_syntax::ast::TypeExpr;

    fn variant(name: &str, fields: VariantFields) -> Pattern {
        Pattern::Variant {
            qualifier: None,
            name: name.into(),
            fields,
        }
    }

    fn circle(inner: Pattern) -> Pattern {
        variant("Circle", VariantFields::Positional(vec![inner]))
    }

    fn rows(arms: &[(Pattern, bool)], columns: &[Option<TypeExpr>], catalog: &UnionCatalog) -> Vec<MatchRow> {
        let mut out = Vec::new();
        for (arm_index, (pattern, guarded)) in arms.iter().enumerate() {
            for pats in resolve_arm(pattern, columns, catalog).unwrap() {
                out.push(MatchRow {
                    pats,
                    arm_index,
                    guarded: *guarded,
                });
            }
        }
        out
    }

    fn circle_path() -> AccessPath {
        AccessPath::field(&AccessPath::Slot(0), "Circle", 0)
    }

    #[test]
    fn complete_switch_has_no_default() {
        let catalog = shapes();
        let arms = [
            (circle(Pattern::Binding("r".into())), false),
            (variant("Rect", VariantFields::Unit), false),
            (variant("Point", VariantFields::Unit), false),
        ];
        let tree = compile_match(&rows(&arms, &[Some(TypeExpr::named("Shape"))], &catalog), 1, &catalog).unwrap();
        let DecisionTree::Switch { cases, default, union, .. } = &tree else {
            panic!("expected a switch, got {tree:?}");
        };
        assert_eq!(union, "Shape");
        assert!(default.is_none());
        assert_eq!(
            cases[0],
            (
                "Circle".to_string(),
                DecisionTree::Leaf {
                    arm_index: 0,
                    bindings: vec![("r".into(), circle_path())],
                }
            )
        );
        assert!(!tree.can_fail());
    }

    #[test]
    fn false_guard_continues_with_later_rows() {
        let catalog = shapes();
        let arms = [
            (circle(Pattern::Binding("r".into())), true),
            (circle(Pattern::Wildcard), false),
            (Pattern::Wildcard, false),
        ];
        let tree = compile_match(&rows(&arms, &[Some(TypeExpr::named("Shape"))], &catalog), 1, &catalog).unwrap();
        let DecisionTree::Switch { cases, default, .. } = tree else {
            panic!("expected a switch");
        };
        assert_eq!(
            cases[0].1,
            DecisionTree::Guard {
                arm_index: 0,
                bindings: vec![("r".into(), circle_path())],
                failure: Box::new(DecisionTree::Leaf {
                    arm_index: 1,
                    bindings: Vec::new(),
                }),
            }
        );
        assert_eq!(
            default.as_deref(),
            Some(&DecisionTree::Leaf {
                arm_index: 2,
                bindings: Vec::new(),
            })
        );
    }

    #[test]
    fn missing_variants_fall_to_fail() {
        let catalog = shapes();
        let arms = [(circle(Pattern::Wildcard), false)];
        let tree = compile_match(&rows(&arms, &[None], &catalog), 1, &catalog).unwrap();
        assert!(matches!(&tree, DecisionTree::Switch { default: Some(d), .. } if **d == DecisionTree::Fail));
        assert!(tree.can_fail());
    }

    #[test]
    fn literal_tests_chain_in_source_order() {
        let catalog = shapes();
        let one = Pattern::Literal(Literal::new(LitKind::Int, "1"));
        let two = Pattern::Literal(Literal::new(LitKind::Int, "2"));
        let arms = [(one, false), (two, false), (Pattern::Binding("n".into()), false)];
        let tree = compile_match(&rows(&arms, &[None], &catalog), 1, &catalog).unwrap();
        let DecisionTree::Test { value, failure, .. } = &tree else {
            panic!("expected a test");
        };
        assert_eq!(value.text, "1");
        let DecisionTree::Test { value, failure, .. } = failure.as_ref() else {
            panic!("expected a second test");
        };
        assert_eq!(value.text, "2");
        assert_eq!(
            failure.as_ref(),
            &DecisionTree::Leaf {
                arm_index: 2,
                bindings: vec![("n".into(), AccessPath::Slot(0))],
            }
        );
    }

    #[test]
    fn both_bools_need_no_default() {
        let catalog = shapes();
        let yes = Pattern::Literal(Literal::new(LitKind::Bool, "true"));
        let no = Pattern::Literal(Literal::new(LitKind::Bool, "false"));
        let tree = compile_match(&rows(&[(yes, false), (no, false)], &[None], &catalog), 1, &catalog).unwrap();
        assert!(!tree.can_fail());
    }

    #[test]
    fn tuple_columns_nest() {
        let catalog = shapes();
        let columns = vec![Some(TypeExpr::named("Shape")), Some(TypeExpr::named("Shape"))];
        let point = || variant("Point", VariantFields::Unit);
        let arms = [
            (Pattern::Tuple(vec![point(), point()]), false),
            (Pattern::Wildcard, false),
        ];
        let tree = compile_match(&rows(&arms, &columns, &catalog), 2, &catalog).unwrap();
        let DecisionTree::Switch { path, cases, .. } = &tree else {
            panic!("expected a switch");
        };
        assert_eq!(path, &AccessPath::Slot(0));
        assert!(matches!(&cases[0].1, DecisionTree::Switch { path: AccessPath::Slot(1), .. }));
    }

    #[test]
    fn mixed_unions_in_one_column_are_rejected() {
        let catalog = shapes();
        let arms = [
            (circle(Pattern::Wildcard), false),
            (variant("Some", VariantFields::Positional(vec![Pattern::Wildcard])), false),
        ];
        assert!(compile_match(&rows(&arms, &[None], &catalog), 1, &catalog).is_err());
    }
}
