//! Pattern resolution and decision trees.
//!
//! Arm patterns arrive as surface syntax ([`sable_common::Pattern`]) with
//! variant names not yet tied to a union. [`resolve_arm`] ties them to the
//! unions of the scrutinee columns and expands or-patterns, producing rows
//! of [`Pat`]. [`compile::compile_match`] turns the rows into a
//! [`DecisionTree`]; [`usefulness::check_coverage`] finds gaps and
//! unreachable arms.
//!
//! ## Decision tree nodes
//!
//! - `Leaf`: run an arm body after binding its variables
//! - `Guard`: bind, test the arm guard, continue with the remaining rows on failure
//! - `Switch`: switch on a union tag
//! - `Test`: compare against a literal
//! - `Fail`: no arm applies

pub mod compile;
pub mod usefulness;

use sable_common::{LitKind, Literal, Pattern, VariantFields};
use sable_syntax::ast::TypeExpr;

use crate::shape::{UnionCatalog, UnionShape};

// ── AccessPath ─────────────────────────────────────────────────────────

/// How to reach a sub-value of the scrutinee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessPath {
    /// Scrutinee slot N (always 0 for a single scrutinee).
    Slot(usize),
    /// Payload slot of a variant of the union at `parent`.
    Field {
        parent: Box<AccessPath>,
        variant: String,
        slot: usize,
    },
}

impl AccessPath {
    pub fn field(parent: &AccessPath, variant: &str, slot: usize) -> Self {
        AccessPath::Field {
            parent: Box::new(parent.clone()),
            variant: variant.to_string(),
            slot,
        }
    }
}

// ── Resolved patterns ──────────────────────────────────────────────────

/// A head constructor: one union variant or one literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ctor {
    Variant {
        union: String,
        variant: String,
        /// Tag value, i.e. declaration index.
        tag: usize,
    },
    Lit(Literal),
}

impl Ctor {
    pub fn is_bool(&self) -> bool {
        matches!(self, Ctor::Lit(lit) if lit.kind == LitKind::Bool)
    }
}

/// A pattern tied to concrete unions, or-patterns already expanded.
#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    /// Matches anything; binds the value when named.
    Wild(Option<String>),
    Ctor(Ctor, Vec<Pat>),
}

impl Pat {
    pub fn is_wild(&self) -> bool {
        matches!(self, Pat::Wild(_))
    }
}

/// One or-alternative of one arm: a pattern per scrutinee column.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub pats: Vec<Pat>,
    pub arm_index: usize,
    pub guarded: bool,
}

// ── DecisionTree ───────────────────────────────────────────────────────

/// Variable bindings of a leaf: name and where its value lives.
pub type Bindings = Vec<(String, AccessPath)>;

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTree {
    Leaf {
        arm_index: usize,
        bindings: Bindings,
    },
    Guard {
        arm_index: usize,
        bindings: Bindings,
        failure: Box<DecisionTree>,
    },
    /// Cases are in tag order. `default` is `None` when the cases cover
    /// every variant of `union`.
    Switch {
        path: AccessPath,
        union: String,
        cases: Vec<(String, DecisionTree)>,
        default: Option<Box<DecisionTree>>,
    },
    Test {
        path: AccessPath,
        value: Literal,
        success: Box<DecisionTree>,
        failure: Box<DecisionTree>,
    },
    Fail,
}

impl DecisionTree {
    /// Whether any path through the tree ends in `Fail`.
    pub fn can_fail(&self) -> bool {
        match self {
            DecisionTree::Leaf { .. } => false,
            DecisionTree::Guard { failure, .. } => failure.can_fail(),
            DecisionTree::Switch { cases, default, .. } => {
                cases.iter().any(|(_, tree)| tree.can_fail()) || default.as_deref().is_some_and(DecisionTree::can_fail)
            }
            DecisionTree::Test { success, failure, .. } => success.can_fail() || failure.can_fail(),
            DecisionTree::Fail => true,
        }
    }
}

// ── Resolution ─────────────────────────────────────────────────────────

/// Resolve one arm pattern against the scrutinee columns.
///
/// Returns one row per or-alternative; every row has one pattern per column.
pub fn resolve_arm(
    pattern: &Pattern,
    columns: &[Option<TypeExpr>],
    catalog: &UnionCatalog,
) -> Result<Vec<Vec<Pat>>, String> {
    if columns.len() == 1 {
        return Ok(resolve(pattern, columns[0].as_ref(), catalog)?
            .into_iter()
            .map(|pat| vec![pat])
            .collect());
    }
    match pattern {
        Pattern::Wildcard => Ok(vec![vec![Pat::Wild(None); columns.len()]]),
        Pattern::Tuple(elems) if elems.len() == columns.len() => {
            let mut options = Vec::with_capacity(elems.len());
            for (elem, column) in elems.iter().zip(columns) {
                options.push(resolve(elem, column.as_ref(), catalog)?);
            }
            Ok(product(options))
        }
        Pattern::Or(alts) => {
            let mut rows = Vec::new();
            for alt in alts {
                rows.extend(resolve_arm(alt, columns, catalog)?);
            }
            Ok(rows)
        }
        other => Err(format!(
            "pattern `{other}` does not destructure a tuple of {} values",
            columns.len()
        )),
    }
}

/// Resolve a pattern for one column. Returns its or-alternatives.
fn resolve(pattern: &Pattern, ty: Option<&TypeExpr>, catalog: &UnionCatalog) -> Result<Vec<Pat>, String> {
    match pattern {
        Pattern::Wildcard => Ok(vec![Pat::Wild(None)]),
        Pattern::Binding(name) => Ok(vec![Pat::Wild(Some(name.clone()))]),
        Pattern::Literal(lit) => {
            if let Some(shape) = ty.and_then(|t| catalog.shape_for_type(t)) {
                return Err(format!("literal `{}` cannot match a value of `{}`", lit.text, shape.name));
            }
            Ok(vec![Pat::Ctor(Ctor::Lit(lit.clone()), Vec::new())])
        }
        Pattern::Variant {
            qualifier,
            name,
            fields,
        } => {
            let shape = variant_shape(qualifier.as_deref(), name, ty, catalog)?;
            let Some(decl) = shape.variant(name) else {
                return Err(format!("`{}` has no variant `{name}`", shape.name));
            };
            let payload = shape.payload_types(name);
            let mut slots: Vec<Vec<Pat>> = vec![vec![Pat::Wild(None)]; decl.arity()];
            match fields {
                VariantFields::Unit => {}
                VariantFields::Positional(pats) => {
                    if pats.len() != decl.arity() {
                        return Err(format!(
                            "`{name}` has {} field(s), the pattern gives {}",
                            decl.arity(),
                            pats.len()
                        ));
                    }
                    for (slot, pat) in pats.iter().enumerate() {
                        slots[slot] = resolve(pat, payload[slot].as_ref(), catalog)?;
                    }
                }
                VariantFields::Named(pats) => {
                    for (field, pat) in pats {
                        let slot = decl
                            .slot_of(field)
                            .ok_or_else(|| format!("`{name}` has no field `{field}`"))?;
                        slots[slot] = resolve(pat, payload[slot].as_ref(), catalog)?;
                    }
                }
            }
            let ctor = Ctor::Variant {
                union: shape.name.clone(),
                variant: name.clone(),
                tag: shape.variant_index(name).unwrap_or_default(),
            };
            Ok(product(slots)
                .into_iter()
                .map(|args| Pat::Ctor(ctor.clone(), args))
                .collect())
        }
        Pattern::Tuple(_) => Err(format!("tuple pattern `{pattern}` is only allowed at the top of a tuple match")),
        Pattern::Or(alts) => {
            let mut out = Vec::new();
            for alt in alts {
                out.extend(resolve(alt, ty, catalog)?);
            }
            Ok(out)
        }
    }
}

/// The union a variant pattern refers to: the column's union when its type
/// is known, otherwise looked up by variant name.
fn variant_shape<'c>(
    qualifier: Option<&str>,
    variant: &str,
    ty: Option<&TypeExpr>,
    catalog: &'c UnionCatalog,
) -> Result<&'c UnionShape, String> {
    match ty.and_then(|t| catalog.shape_for_type(t)) {
        Some(shape) => {
            if let Some(q) = qualifier {
                if q != shape.name {
                    return Err(format!("pattern `{q}.{variant}` cannot match a value of `{}`", shape.name));
                }
            }
            Ok(shape)
        }
        None => catalog.resolve_variant(qualifier, variant),
    }
}

/// Cartesian product of per-slot alternatives.
fn product(options: Vec<Vec<Pat>>) -> Vec<Vec<Pat>> {
    let mut rows: Vec<Vec<Pat>> = vec![Vec::new()];
    for choices in options {
        let mut next = Vec::with_capacity(rows.len() * choices.len());
        for row in &rows {
            for choice in &choices {
                let mut extended = row.clone();
                extended.push(choice.clone());
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

/// Types of the names an arm pattern binds, in source order. Unknown types
/// are `None`; resolution errors are ignored here.
pub fn binding_types(
    pattern: &Pattern,
    columns: &[Option<TypeExpr>],
    catalog: &UnionCatalog,
) -> Vec<(String, Option<TypeExpr>)> {
    let mut out = Vec::new();
    match (pattern, columns) {
        (Pattern::Tuple(elems), columns) if columns.len() > 1 => {
            for (elem, column) in elems.iter().zip(columns) {
                collect_binding_types(elem, column.clone(), catalog, &mut out);
            }
        }
        (Pattern::Or(alts), columns) if columns.len() > 1 => {
            if let Some(first) = alts.first() {
                return binding_types(first, columns, catalog);
            }
        }
        (pattern, [column]) => collect_binding_types(pattern, column.clone(), catalog, &mut out),
        _ => {}
    }
    out
}

fn collect_binding_types(
    pattern: &Pattern,
    ty: Option<TypeExpr>,
    catalog: &UnionCatalog,
    out: &mut Vec<(String, Option<TypeExpr>)>,
) {
    match pattern {
        Pattern::Wildcard | Pattern::Literal(_) | Pattern::Tuple(_) => {}
        Pattern::Binding(name) => out.push((name.clone(), ty)),
        Pattern::Or(alts) => {
            if let Some(first) = alts.first() {
                collect_binding_types(first, ty, catalog, out);
            }
        }
        Pattern::Variant {
            qualifier,
            name,
            fields,
        } => {
            let Ok(shape) = variant_shape(qualifier.as_deref(), name, ty.as_ref(), catalog) else {
                for binding in pattern.bindings() {
                    out.push((binding, None));
                }
                return;
            };
            let payload = shape.payload_types(name);
            let decl = shape.variant(name);
            match fields {
                VariantFields::Unit => {}
                VariantFields::Positional(pats) => {
                    for (slot, pat) in pats.iter().enumerate() {
                        collect_binding_types(pat, payload.get(slot).cloned().flatten(), catalog, out);
                    }
                }
                VariantFields::Named(pats) => {
                    for (field, pat) in pats {
                        let slot_ty = decl
                            .and_then(|d| d.slot_of(field))
                            .and_then(|slot| payload.get(slot).cloned().flatten());
                        collect_binding_types(pat, slot_ty, catalog, out);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shape::{PayloadField, ShapeKind, VariantDecl, RESULT};
    use sable_common::VariantKind;

    pub(crate) fn shapes() -> UnionCatalog {
        let float = || TypeExpr::named("float64");
        let mut catalog = UnionCatalog::new();
        catalog.insert_enum(UnionShape {
            name: "Shape".into(),
            kind: ShapeKind::Enum,
            tag_type: "ShapeTag".into(),
            variants: vec![
                VariantDecl {
                    name: "Circle".into(),
                    kind: VariantKind::Tuple,
                    fields: vec![PayloadField {
                        name: "_0".into(),
                        ty: float(),
                    }],
                },
                VariantDecl {
                    name: "Rect".into(),
                    kind: VariantKind::Struct,
                    fields: vec![
                        PayloadField { name: "w".into(), ty: float() },
                        PayloadField { name: "h".into(), ty: float() },
                    ],
                },
                VariantDecl {
                    name: "Point".into(),
                    kind: VariantKind::Unit,
                    fields: Vec::new(),
                },
            ],
            type_params: Vec::new(),
            origin: None,
        });
        catalog
    }

    fn variant(name: &str, fields: VariantFields) -> Pattern {
        Pattern::Variant {
            qualifier: None,
            name: name.into(),
            fields,
        }
    }

    fn shape_column() -> Vec<Option<TypeExpr>> {
        vec![Some(TypeExpr::named("Shape"))]
    }

    #[test]
    fn named_fields_fill_their_slots() {
        let catalog = shapes();
        let pattern = variant(
            "Rect",
            VariantFields::Named(vec![("h".into(), Pattern::Binding("height".into()))]),
        );
        let rows = resolve_arm(&pattern, &shape_column(), &catalog).unwrap();
        let Pat::Ctor(Ctor::Variant { tag, .. }, args) = &rows[0][0] else {
            panic!("expected a constructor");
        };
        assert_eq!(*tag, 1);
        assert_eq!(args, &vec![Pat::Wild(None), Pat::Wild(Some("height".into()))]);
    }

    #[test]
    fn or_patterns_expand_to_rows() {
        let catalog = shapes();
        let pattern = Pattern::Or(vec![
            variant("Circle", VariantFields::Positional(vec![Pattern::Wildcard])),
            variant("Point", VariantFields::Unit),
        ]);
        assert_eq!(resolve_arm(&pattern, &shape_column(), &catalog).unwrap().len(), 2);
    }

    #[test]
    fn tuple_rows_take_one_pattern_per_slot() {
        let catalog = shapes();
        let columns = vec![Some(TypeExpr::named("Shape")), None];
        let pattern = Pattern::Tuple(vec![
            variant("Point", VariantFields::Unit),
            Pattern::Or(vec![
                Pattern::Literal(Literal::new(LitKind::Int, "1")),
                Pattern::Literal(Literal::new(LitKind::Int, "2")),
            ]),
        ]);
        let rows = resolve_arm(&pattern, &columns, &catalog).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn mismatches_are_reported() {
        let catalog = shapes();
        let arity = variant(
            "Circle",
            VariantFields::Positional(vec![Pattern::Wildcard, Pattern::Wildcard]),
        );
        assert_eq!(
            resolve_arm(&arity, &shape_column(), &catalog).unwrap_err(),
            "`Circle` has 1 field(s), the pattern gives 2"
        );
        let foreign = variant("Ok", VariantFields::Positional(vec![Pattern::Wildcard]));
        assert_eq!(
            resolve_arm(&foreign, &shape_column(), &catalog).unwrap_err(),
            "`Shape` has no variant `Ok`"
        );
        let literal = Pattern::Literal(Literal::new(LitKind::Int, "3"));
        assert!(resolve_arm(&literal, &shape_column(), &catalog).is_err());
    }

    #[test]
    fn unknown_columns_resolve_by_variant_name() {
        let catalog = shapes();
        let pattern = variant("Err", VariantFields::Positional(vec![Pattern::Binding("e".into())]));
        let rows = resolve_arm(&pattern, &[None], &catalog).unwrap();
        assert!(matches!(&rows[0][0], Pat::Ctor(Ctor::Variant { union, .. }, _) if union == RESULT));
    }

    #[test]
    fn bindings_carry_payload_types() {
        let mut catalog = shapes();
        catalog
            .instantiate(RESULT, &[TypeExpr::named("int"), TypeExpr::named("error")])
            .unwrap();
        let pattern = variant("Ok", VariantFields::Positional(vec![Pattern::Binding("n".into())]));
        let typed = binding_types(&pattern, &[Some(TypeExpr::named("Result_int_error"))], &catalog);
        assert_eq!(typed, vec![("n".to_string(), Some(TypeExpr::named("int")))]);
        let untyped = binding_types(&pattern, &[None], &catalog);
        assert_eq!(untyped, vec![("n".to_string(), None)]);
    }
}
