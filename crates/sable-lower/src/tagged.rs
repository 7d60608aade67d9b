//! Tagged-union generation.
//!
//! For a shape `Shape { Circle(float64), Rect { w, h float64 }, Point }`:
//!
//! ```text
//! type ShapeTag uint8
//!
//! const (
//!     ShapeTagCircle ShapeTag = 0
//!     ShapeTagRect ShapeTag = 1
//!     ShapeTagPoint ShapeTag = 2
//! )
//!
//! type Shape struct {
//!     tag ShapeTag
//!     circle0 *float64
//!     rect0 *float64
//!     rect1 *float64
//! }
//!
//! func ShapeCircle(arg0 float64) Shape {
//!     return Shape{tag: ShapeTagCircle, circle0: &arg0}
//! }
//!
//! func (v Shape) IsCircle() bool {
//!     return v.tag == ShapeTagCircle
//! }
//! ```
//!
//! Payloads are pointers so a variant costs one word per slot whatever its
//! type, and a unit variant stores nothing.

use sable_common::NameGen;
use sable_syntax::ast::{
    BinaryOp, Decl, DeclKind, FieldDecl, FuncDecl, FuncType, GenDecl, Param, TypeExpr, TypeSpec,
    ValueSpec,
};
use sable_typeck::{address_of, TypeInference};

use crate::shape::{payload_field, UnionShape};

pub use crate::shape::{UnionShape as EnumDecl, VariantDecl};
use crate::synth;

/// Receiver name of generated methods.
const RECEIVER: &str = "v";

/// `type XTag uint8` and one numbered constant per variant.
pub fn tag_decls(shape: &UnionShape) -> Vec<Decl> {
    let tag = Decl::new(DeclKind::Gen(GenDecl::Type {
        specs: vec![TypeSpec {
            name: shape.tag_type.clone(),
            alias: false,
            ty: TypeExpr::named(shape.tag_repr()),
        }],
        grouped: false,
    }));
    let consts = Decl::new(DeclKind::Gen(GenDecl::Const {
        specs: shape
            .variants
            .iter()
            .enumerate()
            .map(|(index, variant)| ValueSpec {
                names: vec![shape.tag_const(&variant.name)],
                ty: Some(TypeExpr::named(shape.tag_type.clone())),
                values: vec![synth::int(index)],
            })
            .collect(),
        grouped: true,
    }));
    vec![tag.with_origin(shape.origin), consts.with_origin(shape.origin)]
}

/// The union struct: a tag plus one pointer per payload slot.
pub fn struct_type(shape: &UnionShape) -> TypeExpr {
    let mut fields = vec![FieldDecl {
        names: vec!["tag".into()],
        ty: TypeExpr::named(shape.tag_type.clone()),
        tag: None,
    }];
    for variant in &shape.variants {
        for (slot, field) in variant.fields.iter().enumerate() {
            fields.push(FieldDecl {
                names: vec![payload_field(&variant.name, slot)],
                ty: TypeExpr::pointer(field.ty.clone()),
                tag: None,
            });
        }
    }
    TypeExpr::Struct(fields)
}

pub fn struct_decl(shape: &UnionShape) -> Decl {
    Decl::new(DeclKind::Gen(GenDecl::Type {
        specs: vec![TypeSpec {
            name: shape.name.clone(),
            alias: false,
            ty: struct_type(shape),
        }],
        grouped: false,
    }))
    .with_origin(shape.origin)
}

/// Signature of the constructor of `variant`: one `argN` per payload slot.
pub fn constructor_sig(shape: &UnionShape, variant: &str) -> Option<FuncType> {
    let decl = shape.variant(variant)?;
    Some(FuncType {
        params: decl
            .fields
            .iter()
            .enumerate()
            .map(|(slot, field)| Param::named(format!("arg{slot}"), field.ty.clone()))
            .collect(),
        results: vec![Param::unnamed(shape.as_type())],
    })
}

/// One constructor function per variant.
///
/// Payload addresses come from the addressability analyzer, which sees the
/// parameters as addressable locals.
pub fn constructor_decls(shape: &UnionShape, infer: &mut TypeInference, names: &mut NameGen) -> Vec<Decl> {
    let mut decls = Vec::with_capacity(shape.variants.len());
    for variant in &shape.variants {
        let Some(sig) = constructor_sig(shape, &variant.name) else {
            continue;
        };
        infer.enter_function(None, &sig);
        let mut elems = vec![("tag".to_string(), synth::ident(shape.tag_const(&variant.name)))];
        for (slot, field) in variant.fields.iter().enumerate() {
            let arg = synth::ident(format!("arg{slot}"));
            let payload = match address_of(arg.clone(), Some(&field.ty), infer, names) {
                Ok(expr) => expr,
                Err(_) => sable_typeck::wrap_for_address(arg, &field.ty, names),
            };
            elems.push((payload_field(&variant.name, slot), payload));
        }
        infer.exit_function();
        let body = vec![synth::ret(vec![synth::composite(shape.as_type(), elems)])];
        decls.push(
            Decl::new(DeclKind::Func(FuncDecl {
                recv: None,
                name: shape.constructor_name(&variant.name),
                sig,
                body: Some(sable_syntax::ast::Block::new(body)),
            }))
            .with_origin(shape.origin),
        );
    }
    decls
}

/// `IsV() bool` for every variant.
pub fn predicate_decls(shape: &UnionShape) -> Vec<Decl> {
    shape
        .variants
        .iter()
        .map(|variant| {
            let test = synth::binary(
                BinaryOp::Eq,
                synth::selector(synth::ident(RECEIVER), "tag"),
                synth::ident(shape.tag_const(&variant.name)),
            );
            Decl::new(DeclKind::Func(FuncDecl {
                recv: Some(Param::named(RECEIVER, shape.as_type())),
                name: predicate_name(&variant.name),
                sig: predicate_sig(),
                body: Some(sable_syntax::ast::Block::new(vec![synth::ret(vec![test])])),
            }))
            .with_origin(shape.origin)
        })
        .collect()
}

pub fn predicate_name(variant: &str) -> String {
    format!("Is{variant}")
}

pub fn predicate_sig() -> FuncType {
    FuncType {
        params: Vec::new(),
        results: vec![Param::unnamed(TypeExpr::named("bool"))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{PayloadField, ShapeKind, VariantDecl};
    use sable_common::marker::VariantKind;
    use sable_syntax::ast::SourceFile;
    use sable_syntax::FormatConfig;

    fn shape() -> UnionShape {
        let float = || TypeExpr::named("float64");
        UnionShape {
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
                        PayloadField {
                            name: "w".into(),
                            ty: float(),
                        },
                        PayloadField {
                            name: "h".into(),
                            ty: float(),
                        },
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
        }
    }

    fn render(decls: Vec<Decl>) -> String {
        let file = SourceFile {
            package: "shapes".into(),
            imports: Vec::new(),
            decls,
        };
        let spaces = FormatConfig {
            indent_with_tabs: false,
            ..FormatConfig::default()
        };
        sable_syntax::print_file(&file, &spaces).code
    }

    #[test]
    fn union_layout() {
        let shape = shape();
        let mut decls = tag_decls(&shape);
        decls.push(struct_decl(&shape));
        insta::assert_snapshot!(render(decls), @r"
        package shapes

        type ShapeTag uint8

        const (
            ShapeTagCircle ShapeTag = 0
            ShapeTagRect ShapeTag = 1
            ShapeTagPoint ShapeTag = 2
        )

        type Shape struct {
            tag ShapeTag
            circle0 *float64
            rect0 *float64
            rect1 *float64
        }
        ");
    }

    #[test]
    fn constructors_store_parameter_addresses() {
        let shape = shape();
        let mut infer = TypeInference::new(TypeExpr::named("error"));
        let mut names = NameGen::new();
        let decls = constructor_decls(&shape, &mut infer, &mut names);
        insta::assert_snapshot!(render(decls), @r"
        package shapes

        func ShapeCircle(arg0 float64) Shape {
            return Shape{tag: ShapeTagCircle, circle0: &arg0}
        }

        func ShapeRect(arg0 float64, arg1 float64) Shape {
            return Shape{tag: ShapeTagRect, rect0: &arg0, rect1: &arg1}
        }

        func ShapePoint() Shape {
            return Shape{tag: ShapeTagPoint}
        }
        ");
        assert_eq!(names.peek("tmp"), 0);
    }

    #[test]
    fn wide_unions_use_sixteen_bit_tags() {
        let mut wide = shape();
        wide.variants = (0..300)
            .map(|i| VariantDecl {
                name: format!("V{i}"),
                kind: VariantKind::Unit,
                fields: Vec::new(),
            })
            .collect();
        assert_eq!(wide.tag_repr(), "uint16");
        assert_eq!(shape().tag_repr(), "uint8");
    }

    #[test]
    fn predicates_compare_tags() {
        let decls = predicate_decls(&shape());
        let text = render(decls);
        assert!(text.contains("func (v Shape) IsRect() bool {\n    return v.tag == ShapeTagRect\n}"));
    }
}
