//! Enum plugin.
//!
//! Discovery reads each `enum_decl` marker together with the skeleton struct
//! the preprocessor left under it (`type Shape struct { Circle struct { _0
//! float64 }; ... }`), which carries the payload types. The transform drops
//! the skeleton, queues the tagged-union declarations, and rewrites variant
//! uses:
//!
//! - `Shape.Circle(2.0)` becomes `ShapeCircle(2.0)`
//! - `Shape.Point` becomes `ShapePoint()`
//! - `Shape.Circle` not in call position becomes the function value `ShapeCircle`

use sable_common::{Marker, MarkerPayload};
use sable_syntax::ast::{Decl, DeclKind, Expr, ExprKind, GenDecl, SourceFile, TypeExpr};
use sable_syntax::visit::{walk_expr, VisitMut};

use crate::error::{Diagnostic, DiagnosticCode, LowerError, Violation};
use crate::plugin::{LowerContext, Plugin};
use crate::registry::DeclKey;
use crate::shape::{PayloadField, ShapeKind, UnionCatalog, UnionShape, VariantDecl};
use crate::tagged;

#[derive(Debug, Default)]
pub struct EnumPlugin {
    found: Vec<UnionShape>,
}

impl EnumPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for EnumPlugin {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn discover(&mut self, file: &SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        self.found.clear();
        for decl in &file.decls {
            for marker in &decl.markers {
                if let MarkerPayload::EnumDecl { .. } = marker.payload {
                    let shape = shape_from_skeleton(marker, decl)?;
                    cx.catalog.insert_enum(shape.clone());
                    self.found.push(shape);
                }
            }
        }
        tracing::debug!(enums = self.found.len(), "enums discovered");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(enums = self.found.len()))]
    fn transform(&mut self, file: &mut SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError> {
        if self.found.is_empty() {
            return Ok(());
        }
        let mut kept = Vec::with_capacity(file.decls.len());
        for decl in file.decls.drain(..) {
            let enum_markers: Vec<&Marker> = decl
                .markers
                .iter()
                .filter(|m| matches!(m.payload, MarkerPayload::EnumDecl { .. }))
                .collect();
            if enum_markers.is_empty() {
                kept.push(decl);
                continue;
            }
            for marker in enum_markers {
                cx.ledger.consume(marker)?;
            }
        }
        file.decls = kept;

        for shape in &self.found {
            let infer = &mut *cx.infer;
            let names = &mut *cx.names;
            cx.registry
                .request::<LowerError>(DeclKey::Tag(shape.name.clone()), || Ok(tagged::tag_decls(shape)))?;
            cx.registry
                .request::<LowerError>(DeclKey::Union(shape.name.clone()), || Ok(vec![tagged::struct_decl(shape)]))?;
            cx.registry.request::<LowerError>(DeclKey::Constructors(shape.name.clone()), || {
                let mut decls = tagged::constructor_decls(shape, infer, names);
                decls.extend(tagged::predicate_decls(shape));
                Ok(decls)
            })?;
        }

        let mut rewriter = VariantUses {
            catalog: cx.catalog,
            diagnostics: Vec::new(),
            rewritten: 0,
        };
        rewriter.visit_file(file);
        tracing::debug!(rewritten = rewriter.rewritten, "variant uses rewritten");
        for diagnostic in rewriter.diagnostics {
            cx.diagnose(diagnostic);
        }
        Ok(())
    }
}

/// Build the shape for one `enum_decl` marker from the skeleton struct it
/// is attached to.
fn shape_from_skeleton(marker: &Marker, decl: &Decl) -> Result<UnionShape, LowerError> {
    let MarkerPayload::EnumDecl {
        name,
        type_params,
        variants,
    } = &marker.payload
    else {
        return Err(malformed(marker, "not an enum declaration marker"));
    };
    if !type_params.is_empty() {
        return Err(LowerError::GenericEnum {
            name: name.clone(),
            origin: marker.origin,
        });
    }
    let skeleton = match &decl.kind {
        DeclKind::Gen(GenDecl::Type { specs, .. }) => specs
            .iter()
            .find(|spec| spec.name == *name)
            .and_then(|spec| match &spec.ty {
                TypeExpr::Struct(fields) => Some(fields),
                _ => None,
            }),
        _ => None,
    };
    let Some(skeleton) = skeleton else {
        return Err(malformed(marker, format!("no skeleton struct `{name}` follows the marker")));
    };

    let mut decls = Vec::with_capacity(variants.len());
    for sig in variants {
        let holder = skeleton
            .iter()
            .find(|field| field.names.iter().any(|n| *n == sig.name))
            .ok_or_else(|| malformed(marker, format!("variant `{}` missing from the skeleton", sig.name)))?;
        let TypeExpr::Struct(payload) = &holder.ty else {
            return Err(malformed(marker, format!("variant `{}` is not a struct", sig.name)));
        };
        let mut fields = Vec::with_capacity(sig.fields.len());
        for field_name in &sig.fields {
            let ty = payload
                .iter()
                .find(|f| f.names.iter().any(|n| n == field_name))
                .map(|f| f.ty.clone())
                .ok_or_else(|| {
                    malformed(marker, format!("field `{field_name}` of `{}` has no type", sig.name))
                })?;
            fields.push(PayloadField {
                name: field_name.clone(),
                ty,
            });
        }
        decls.push(VariantDecl {
            name: sig.name.clone(),
            kind: sig.kind,
            fields,
        });
    }
    Ok(UnionShape {
        name: name.clone(),
        kind: ShapeKind::Enum,
        tag_type: format!("{name}Tag"),
        variants: decls,
        type_params: Vec::new(),
        origin: Some(marker.origin),
    })
}

fn malformed(marker: &Marker, detail: impl Into<String>) -> LowerError {
    LowerError::marker(
        Violation::Malformed,
        Some(marker.id),
        Some(marker.kind()),
        detail,
        Some(marker.origin),
    )
}

// ── Variant uses ───────────────────────────────────────────────────────

struct VariantUses<'c> {
    catalog: &'c UnionCatalog,
    diagnostics: Vec<Diagnostic>,
    rewritten: usize,
}

impl<'c> VariantUses<'c> {
    /// `Shape.Circle` → the enum shape and variant arity.
    fn variant_of(&self, expr: &Expr) -> Option<(&'c UnionShape, String, usize)> {
        let ExprKind::Selector { expr: base, name } = &expr.kind else {
            return None;
        };
        let shape = self
            .catalog
            .get(base.as_ident()?)
            .filter(|s| s.kind == ShapeKind::Enum)?;
        let arity = shape.variant(name)?.arity();
        Some((shape, name.clone(), arity))
    }
}

impl VisitMut for VariantUses<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Call { func, args, .. } => {
                if let Some((shape, variant, arity)) = self.variant_of(func) {
                    if args.len() != arity {
                        self.diagnostics.push(
                            Diagnostic::error(
                                DiagnosticCode::PayloadArity,
                                format!(
                                    "`{}.{variant}` takes {arity} payload value(s), found {}",
                                    shape.name,
                                    args.len()
                                ),
                                None,
                            )
                            .with_span(expr.span),
                        );
                    }
                    let span = func.span;
                    let ctor = shape.constructor_name(&variant);
                    **func = Expr {
                        kind: ExprKind::Ident(ctor),
                        span,
                    };
                    self.rewritten += 1;
                }
            }
            ExprKind::Selector { .. } => {
                if let Some((shape, variant, arity)) = self.variant_of(expr) {
                    let ctor = Expr {
                        kind: ExprKind::Ident(shape.constructor_name(&variant)),
                        span: expr.span,
                    };
                    *expr = if arity == 0 {
                        crate::synth::call(ctor, Vec::new())
                    } else {
                        ctor
                    };
                    self.rewritten += 1;
                    return;
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_syntax::print_expr;

    fn catalog() -> UnionCatalog {
        let mut catalog = UnionCatalog::new();
        let file = sable_syntax::parse(
            "package p\n\ntype Shape struct { Circle struct { _0 float64 }; Point struct{} }\n",
        )
        .unwrap();
        let marker = Marker::new(
            sable_common::MarkerId(0),
            sable_common::Origin::default(),
            MarkerPayload::EnumDecl {
                name: "Shape".into(),
                type_params: Vec::new(),
                variants: vec![
                    sable_common::marker::VariantSig {
                        name: "Circle".into(),
                        kind: sable_common::marker::VariantKind::Tuple,
                        fields: vec!["_0".into()],
                    },
                    sable_common::marker::VariantSig {
                        name: "Point".into(),
                        kind: sable_common::marker::VariantKind::Unit,
                        fields: Vec::new(),
                    },
                ],
            },
        );
        catalog.insert_enum(shape_from_skeleton(&marker, &file.decls[0]).unwrap());
        catalog
    }

    fn rewrite(source: &str) -> (String, Vec<Diagnostic>) {
        let catalog = catalog();
        let mut expr = sable_syntax::parse_expr(source).unwrap();
        let mut uses = VariantUses {
            catalog: &catalog,
            diagnostics: Vec::new(),
            rewritten: 0,
        };
        uses.visit_expr(&mut expr);
        (print_expr(&expr), uses.diagnostics)
    }

    #[test]
    fn skeleton_supplies_payload_types() {
        let catalog = catalog();
        let shape = catalog.get("Shape").unwrap();
        assert_eq!(shape.payload_types("Circle"), vec![Some(TypeExpr::named("float64"))]);
        assert_eq!(shape.tag_type, "ShapeTag");
    }

    #[test]
    fn qualified_variants_become_constructor_calls() {
        assert_eq!(rewrite("draw(Shape.Circle(2.0), Shape.Point)").0, "draw(ShapeCircle(2.0), ShapePoint())");
        assert_eq!(rewrite("apply(Shape.Circle)").0, "apply(ShapeCircle)");
        assert_eq!(rewrite("other.Circle(1)").0, "other.Circle(1)");
    }

    #[test]
    fn wrong_payload_count_is_reported() {
        let (printed, diags) = rewrite("Shape.Circle(1, 2)");
        assert_eq!(printed, "ShapeCircle(1, 2)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::PayloadArity);
        assert_eq!(diags[0].message, "`Shape.Circle` takes 1 payload value(s), found 2");
    }

    #[test]
    fn generic_enums_are_rejected() {
        let file = sable_syntax::parse("package p\n\ntype Box struct { Full struct { _0 T } }\n").unwrap();
        let marker = Marker::new(
            sable_common::MarkerId(0),
            sable_common::Origin::default(),
            MarkerPayload::EnumDecl {
                name: "Box".into(),
                type_params: vec!["T".into()],
                variants: Vec::new(),
            },
        );
        assert!(matches!(
            shape_from_skeleton(&marker, &file.decls[0]),
            Err(LowerError::GenericEnum { .. })
        ));
    }
}
