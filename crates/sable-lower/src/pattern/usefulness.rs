//! Exhaustiveness and redundancy.
//!
//! Based on the usefulness predicate of "Warnings for pattern matching"
//! (Maranget, 2007): a row is useful against a matrix if some value matches
//! the row and no row of the matrix. An arm is redundant when none of its
//! or-alternatives is useful against the unguarded arms above it. The match
//! is exhaustive when a row of wildcards is not useful against all of its
//! unguarded arms; otherwise the values that slip through are reported as
//! witnesses.

use std::fmt::Write as _;

use sable_common::marker::VariantKind;
use sable_common::{LitKind, Literal};

use crate::pattern::{Ctor, MatchRow, Pat};
use crate::shape::UnionCatalog;

/// Witnesses beyond this many are summarized.
const MAX_WITNESSES: usize = 8;

/// Result of checking one match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    /// Arms that can never be selected, in order.
    pub redundant: Vec<usize>,
    /// Uncovered values, rendered as patterns.
    pub missing: Vec<String>,
}

impl Coverage {
    pub fn is_exhaustive(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn check_coverage(rows: &[MatchRow], arity: usize, catalog: &UnionCatalog) -> Coverage {
    let mut coverage = Coverage::default();
    let mut matrix: Vec<Vec<Pat>> = Vec::new();

    let mut arm_indices: Vec<usize> = rows.iter().map(|r| r.arm_index).collect();
    arm_indices.dedup();
    for arm in arm_indices {
        let alts: Vec<&MatchRow> = rows.iter().filter(|r| r.arm_index == arm).collect();
        if !alts.iter().any(|alt| is_useful(&matrix, &alt.pats, catalog)) {
            coverage.redundant.push(arm);
        }
        if alts.iter().all(|alt| !alt.guarded) {
            matrix.extend(alts.iter().map(|alt| alt.pats.clone()));
        }
    }

    let wildcards = vec![Pat::Wild(None); arity];
    let mut seen = Vec::new();
    for witness in collect_witnesses(&matrix, &wildcards, catalog) {
        let text = render_row(&witness, catalog);
        if !seen.contains(&text) {
            seen.push(text);
        }
    }
    if seen.len() > MAX_WITNESSES {
        let extra = seen.len() - MAX_WITNESSES;
        seen.truncate(MAX_WITNESSES);
        seen.push(format!("... and {extra} more"));
    }
    coverage.missing = seen;
    coverage
}

// ── Usefulness ─────────────────────────────────────────────────────────

fn is_useful(matrix: &[Vec<Pat>], row: &[Pat], catalog: &UnionCatalog) -> bool {
    if row.is_empty() {
        return matrix.is_empty();
    }
    match &row[0] {
        Pat::Ctor(ctor, args) => {
            let specialized = specialize(matrix, ctor, args.len());
            let mut next = args.clone();
            next.extend_from_slice(&row[1..]);
            is_useful(&specialized, &next, catalog)
        }
        Pat::Wild(_) => match all_constructors_if_complete(matrix, catalog) {
            Some(ctors) => ctors.iter().any(|(ctor, arity)| {
                let specialized = specialize(matrix, ctor, *arity);
                let mut next = vec![Pat::Wild(None); *arity];
                next.extend_from_slice(&row[1..]);
                is_useful(&specialized, &next, catalog)
            }),
            None => is_useful(&default_rows(matrix), &row[1..], catalog),
        },
    }
}

/// Values matched by `row` and by no row of `matrix`, one per missing
/// constructor combination.
fn collect_witnesses(matrix: &[Vec<Pat>], row: &[Pat], catalog: &UnionCatalog) -> Vec<Vec<Pat>> {
    if row.is_empty() {
        return if matrix.is_empty() { vec![Vec::new()] } else { Vec::new() };
    }
    match all_constructors_if_complete(matrix, catalog) {
        Some(ctors) => {
            let mut out = Vec::new();
            for (ctor, arity) in ctors {
                let specialized = specialize(matrix, &ctor, arity);
                let mut next = vec![Pat::Wild(None); arity];
                next.extend_from_slice(&row[1..]);
                for witness in collect_witnesses(&specialized, &next, catalog) {
                    out.push(reconstruct_witness(&ctor, arity, witness));
                }
            }
            out
        }
        None => {
            let rests = collect_witnesses(&default_rows(matrix), &row[1..], catalog);
            if rests.is_empty() {
                return rests;
            }
            let mut heads: Vec<Pat> = find_missing_constructors(matrix, catalog)
                .into_iter()
                .map(|(ctor, arity)| Pat::Ctor(ctor, vec![Pat::Wild(None); arity]))
                .collect();
            if heads.is_empty() {
                heads.push(Pat::Wild(None));
            }
            let mut out = Vec::with_capacity(heads.len() * rests.len());
            for head in &heads {
                for rest in &rests {
                    let mut witness = vec![head.clone()];
                    witness.extend(rest.iter().cloned());
                    out.push(witness);
                }
            }
            out
        }
    }
}

/// Fold the first `arity` columns of a specialized witness back under `ctor`.
fn reconstruct_witness(ctor: &Ctor, arity: usize, mut witness: Vec<Pat>) -> Vec<Pat> {
    let rest = witness.split_off(arity);
    let mut out = vec![Pat::Ctor(ctor.clone(), witness)];
    out.extend(rest);
    out
}

// ── Constructor sets ───────────────────────────────────────────────────

/// Head constructors of the first column, if they form a complete set:
/// every variant of the union, or both bools. Returned with their arities.
fn all_constructors_if_complete(matrix: &[Vec<Pat>], catalog: &UnionCatalog) -> Option<Vec<(Ctor, usize)>> {
    let heads = head_constructors(matrix);
    let first = heads.first()?;
    match first {
        Ctor::Variant { union, .. } => {
            let shape = catalog.get(union)?;
            let complete = shape
                .variants
                .iter()
                .all(|v| heads.iter().any(|h| matches!(h, Ctor::Variant { variant, .. } if *variant == v.name)));
            complete.then(|| {
                shape
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(tag, v)| {
                        (
                            Ctor::Variant {
                                union: union.clone(),
                                variant: v.name.clone(),
                                tag,
                            },
                            v.arity(),
                        )
                    })
                    .collect()
            })
        }
        Ctor::Lit(_) if first.is_bool() => {
            let both = ["true", "false"]
                .iter()
                .all(|b| heads.iter().any(|h| matches!(h, Ctor::Lit(lit) if lit.text == *b)));
            both.then(|| vec![(bool_ctor("true"), 0), (bool_ctor("false"), 0)])
        }
        Ctor::Lit(_) => None,
    }
}

/// Constructors of the first column's type that no row mentions, in tag
/// order. Empty for open types such as integers, where a witness is `_`.
fn find_missing_constructors(matrix: &[Vec<Pat>], catalog: &UnionCatalog) -> Vec<(Ctor, usize)> {
    let heads = head_constructors(matrix);
    match heads.first() {
        Some(Ctor::Variant { union, .. }) => {
            let Some(shape) = catalog.get(union) else {
                return Vec::new();
            };
            shape
                .variants
                .iter()
                .enumerate()
                .filter(|(_, v)| {
                    !heads
                        .iter()
                        .any(|h| matches!(h, Ctor::Variant { variant, .. } if *variant == v.name))
                })
                .map(|(tag, v)| {
                    (
                        Ctor::Variant {
                            union: union.clone(),
                            variant: v.name.clone(),
                            tag,
                        },
                        v.arity(),
                    )
                })
                .collect()
        }
        Some(head) if head.is_bool() => ["true", "false"]
            .iter()
            .filter(|b| !heads.iter().any(|h| matches!(h, Ctor::Lit(lit) if lit.text == **b)))
            .map(|b| (bool_ctor(b), 0))
            .collect(),
        _ => Vec::new(),
    }
}

fn head_constructors(matrix: &[Vec<Pat>]) -> Vec<Ctor> {
    let mut heads: Vec<Ctor> = Vec::new();
    for row in matrix {
        if let Some(Pat::Ctor(ctor, _)) = row.first() {
            if !heads.contains(ctor) {
                heads.push(ctor.clone());
            }
        }
    }
    heads
}

fn bool_ctor(text: &str) -> Ctor {
    Ctor::Lit(Literal::new(LitKind::Bool, text))
}

// ── Matrix operations ──────────────────────────────────────────────────

fn specialize(matrix: &[Vec<Pat>], ctor: &Ctor, arity: usize) -> Vec<Vec<Pat>> {
    matrix
        .iter()
        .filter_map(|row| {
            let (head, rest) = row.split_first()?;
            let mut out = match head {
                Pat::Ctor(c, args) if same_ctor(c, ctor) => args.clone(),
                Pat::Ctor(..) => return None,
                Pat::Wild(_) => vec![Pat::Wild(None); arity],
            };
            out.extend_from_slice(rest);
            Some(out)
        })
        .collect()
}

/// Rows whose first column is a wildcard, that column removed.
fn default_rows(matrix: &[Vec<Pat>]) -> Vec<Vec<Pat>> {
    matrix
        .iter()
        .filter_map(|row| match row.split_first() {
            Some((Pat::Wild(_), rest)) => Some(rest.to_vec()),
            _ => None,
        })
        .collect()
}

fn same_ctor(a: &Ctor, b: &Ctor) -> bool {
    match (a, b) {
        (Ctor::Variant { variant: x, .. }, Ctor::Variant { variant: y, .. }) => x == y,
        (Ctor::Lit(x), Ctor::Lit(y)) => x == y,
        _ => false,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

fn render_row(row: &[Pat], catalog: &UnionCatalog) -> String {
    if row.len() == 1 {
        return render(&row[0], catalog);
    }
    let parts: Vec<String> = row.iter().map(|p| render(p, catalog)).collect();
    format!("({})", parts.join(", "))
}

/// `Point`, `Circle(_)`, `Rect { w: _, h: _ }`, `false`, `_`.
fn render(pat: &Pat, catalog: &UnionCatalog) -> String {
    match pat {
        Pat::Wild(_) => "_".to_string(),
        Pat::Ctor(Ctor::Lit(lit), _) => lit.text.clone(),
        Pat::Ctor(Ctor::Variant { union, variant, .. }, args) => {
            let mut out = variant.clone();
            if args.is_empty() {
                return out;
            }
            let decl = catalog.get(union).and_then(|s| s.variant(variant));
            match decl {
                Some(decl) if decl.kind == VariantKind::Struct => {
                    out.push_str(" { ");
                    for (i, (field, arg)) in decl.fields.iter().zip(args).enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "{}: {}", field.name, render(arg, catalog));
                    }
                    out.push_str(" }");
                }
                _ => {
                    let parts: Vec<String> = args.iter().map(|a| render(a, catalog)).collect();
                    let _ = write!(out, "({})", parts.join(", "));
                }
            }
            out
        }
    }
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

    fn check(arms: &[(Pattern, bool)], columns: &[Option<TypeExpr>]) -> Coverage {
        let catalog = shapes();
        let mut rows = Vec::new();
        for (arm_index, (pattern, guarded)) in arms.iter().enumerate() {
            for pats in resolve_arm(pattern, columns, &catalog).unwrap() {
                rows.push(MatchRow {
                    pats,
                    arm_index,
                    guarded: *guarded,
                });
            }
        }
        check_coverage(&rows, columns.len(), &catalog)
    }

    fn shape() -> Vec<Option<TypeExpr>> {
        vec![Some(TypeExpr::named("Shape"))]
    }

    fn circle() -> Pattern {
        variant("Circle", VariantFields::Positional(vec![Pattern::Binding("r".into())]))
    }

    fn point() -> Pattern {
        variant("Point", VariantFields::Unit)
    }

    #[test]
    fn missing_variants_are_witnessed() {
        let coverage = check(&[(circle(), false)], &shape());
        assert_eq!(coverage.missing, vec!["Rect { w: _, h: _ }", "Point"]);
        assert!(coverage.redundant.is_empty());
    }

    #[test]
    fn guarded_arms_do_not_cover() {
        let arms = [
            (circle(), true),
            (variant("Rect", VariantFields::Unit), false),
            (point(), false),
        ];
        assert_eq!(check(&arms, &shape()).missing, vec!["Circle(_)"]);
    }

    #[test]
    fn arms_after_a_catch_all_are_redundant() {
        let arms = [(Pattern::Binding("s".into()), false), (point(), false)];
        let coverage = check(&arms, &shape());
        assert_eq!(coverage.redundant, vec![1]);
        assert!(coverage.is_exhaustive());
    }

    #[test]
    fn or_arm_is_useful_if_any_alternative_is() {
        let arms = [
            (point(), false),
            (Pattern::Or(vec![point(), circle()]), false),
            (Pattern::Wildcard, false),
        ];
        let coverage = check(&arms, &shape());
        assert!(coverage.redundant.is_empty());
        assert!(coverage.is_exhaustive());
    }

    #[test]
    fn open_literals_need_a_catch_all() {
        let one = Pattern::Literal(Literal::new(LitKind::Int, "1"));
        assert_eq!(check(&[(one, false)], &[None]).missing, vec!["_"]);
        let yes = Pattern::Literal(Literal::new(LitKind::Bool, "true"));
        assert_eq!(check(&[(yes, false)], &[None]).missing, vec!["false"]);
    }

    #[test]
    fn tuple_witnesses_name_each_slot() {
        let columns = vec![None, None];
        let yes = || Pattern::Literal(Literal::new(LitKind::Bool, "true"));
        let no = || Pattern::Literal(Literal::new(LitKind::Bool, "false"));
        let arms = [
            (Pattern::Tuple(vec![yes(), Pattern::Wildcard]), false),
            (Pattern::Tuple(vec![no(), yes()]), false),
        ];
        assert_eq!(check(&arms, &columns).missing, vec!["(false, false)"]);
    }
}
