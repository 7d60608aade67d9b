//! Union shapes and the catalog of unions known to one unit.
//!
//! A [`UnionShape`] describes one tagged union: the struct that holds it,
//! its discriminant type, and each variant's payload fields. User enums,
//! the built-in container families (`Result`, `Option`) and their concrete
//! instantiations (`Result_int_error`) are all shapes; match lowering only
//! ever talks to shapes.

use rustc_hash::FxHashMap;

use sable_common::marker::VariantKind;
use sable_common::Origin;
use sable_syntax::ast::TypeExpr;
use sable_typeck::mangle;

/// One payload slot of a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadField {
    /// Declared field name; `_0`, `_1`, ... for tuple variants.
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
    pub name: String,
    pub kind: VariantKind,
    pub fields: Vec<PayloadField>,
}

impl VariantDecl {
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Slot of a named field.
    pub fn slot_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Declared with `enum`.
    Enum,
    /// A container family with type parameters; never emitted.
    Family,
    /// A concrete container instantiation.
    Instance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionShape {
    /// Name of the generated struct type.
    pub name: String,
    pub kind: ShapeKind,
    /// Discriminant type. Shared by all instantiations of a family.
    pub tag_type: String,
    pub variants: Vec<VariantDecl>,
    /// Type parameters of a family; empty otherwise.
    pub type_params: Vec<String>,
    pub origin: Option<Origin>,
}

impl UnionShape {
    pub fn variant(&self, name: &str) -> Option<&VariantDecl> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.name == name)
    }

    /// `ShapeTagCircle`, `ResultTagOk`.
    pub fn tag_const(&self, variant: &str) -> String {
        format!("{}{variant}", self.tag_type)
    }

    /// `ShapeCircle`: the generated constructor function of an enum variant.
    pub fn constructor_name(&self, variant: &str) -> String {
        format!("{}{variant}", self.name)
    }

    /// Smallest unsigned type holding every tag value.
    pub fn tag_repr(&self) -> &'static str {
        if self.variants.len() > 256 {
            "uint16"
        } else {
            "uint8"
        }
    }

    /// Payload types of `variant` by slot. A type still mentioning a
    /// family's type parameter is unknown.
    pub fn payload_types(&self, variant: &str) -> Vec<Option<TypeExpr>> {
        let Some(decl) = self.variant(variant) else {
            return Vec::new();
        };
        decl.fields
            .iter()
            .map(|f| match f.ty.as_simple_name() {
                Some(name) if self.type_params.iter().any(|p| p == name) => None,
                _ => Some(f.ty.clone()),
            })
            .collect()
    }

    /// The host type naming this union.
    pub fn as_type(&self) -> TypeExpr {
        TypeExpr::named(self.name.clone())
    }
}

/// Struct field holding a payload slot: `circle0`, `ok0`.
pub fn payload_field(variant: &str, slot: usize) -> String {
    format!("{}{slot}", variant.to_lowercase())
}

/// A concrete container type, e.g. `Result[int, error]` as `Result_int_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    pub family: String,
    pub args: Vec<TypeExpr>,
    pub name: String,
}

impl Instantiation {
    /// Type argument bound to a family parameter.
    pub fn arg(&self, index: usize) -> Option<&TypeExpr> {
        self.args.get(index)
    }
}

// ── Catalog ────────────────────────────────────────────────────────────

pub const RESULT: &str = "Result";
pub const OPTION: &str = "Option";

/// Every union of one unit, by struct name.
#[derive(Debug)]
pub struct UnionCatalog {
    shapes: FxHashMap<String, UnionShape>,
    /// Enum names in declaration order.
    enums: Vec<String>,
    instances: FxHashMap<String, Instantiation>,
}

impl Default for UnionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl UnionCatalog {
    /// A catalog holding only the container families.
    pub fn new() -> Self {
        let mut shapes = FxHashMap::default();
        for family in [result_family(), option_family()] {
            shapes.insert(family.name.clone(), family);
        }
        Self {
            shapes,
            enums: Vec::new(),
            instances: FxHashMap::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UnionShape> {
        self.shapes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn insert_enum(&mut self, shape: UnionShape) {
        if !self.shapes.contains_key(&shape.name) {
            self.enums.push(shape.name.clone());
        }
        self.shapes.insert(shape.name.clone(), shape);
    }

    /// Enum shapes in declaration order.
    pub fn enums(&self) -> impl Iterator<Item = &UnionShape> {
        self.enums.iter().filter_map(|name| self.shapes.get(name))
    }

    /// Enum shapes in no particular order, for rewriting payload types.
    pub fn enums_mut(&mut self) -> impl Iterator<Item = &mut UnionShape> {
        let enums = &self.enums;
        self.shapes
            .iter_mut()
            .filter(move |(name, _)| enums.contains(name))
            .map(|(_, shape)| shape)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instantiation> {
        self.instances.values()
    }

    pub fn instance(&self, name: &str) -> Option<&Instantiation> {
        self.instances.get(name)
    }

    pub fn is_family(name: &str) -> bool {
        name == RESULT || name == OPTION
    }

    /// Instantiate a family with concrete arguments.
    ///
    /// Returns the instance shape and whether it is new. `None` for an
    /// unknown family or the wrong number of arguments.
    pub fn instantiate(&mut self, family: &str, args: &[TypeExpr]) -> Option<(&UnionShape, bool)> {
        let template = self.shapes.get(family).filter(|s| s.kind == ShapeKind::Family)?;
        if template.type_params.len() != args.len() {
            return None;
        }
        let name = mangle(family, args);
        let fresh = !self.shapes.contains_key(&name);
        if fresh {
            let subst = |ty: &TypeExpr| match ty.as_simple_name() {
                Some(param) => match template.type_params.iter().position(|p| p == param) {
                    Some(i) => args[i].clone(),
                    None => ty.clone(),
                },
                None => ty.clone(),
            };
            let shape = UnionShape {
                name: name.clone(),
                kind: ShapeKind::Instance,
                tag_type: template.tag_type.clone(),
                variants: template
                    .variants
                    .iter()
                    .map(|v| VariantDecl {
                        name: v.name.clone(),
                        kind: v.kind,
                        fields: v
                            .fields
                            .iter()
                            .map(|f| PayloadField {
                                name: f.name.clone(),
                                ty: subst(&f.ty),
                            })
                            .collect(),
                    })
                    .collect(),
                type_params: Vec::new(),
                origin: None,
            };
            self.instances.insert(
                name.clone(),
                Instantiation {
                    family: family.to_string(),
                    args: args.to_vec(),
                    name: name.clone(),
                },
            );
            self.shapes.insert(name.clone(), shape);
        }
        self.shapes.get(&name).map(|shape| (shape, fresh))
    }

    /// The union a host type denotes, looking through one pointer.
    pub fn shape_for_type(&self, ty: &TypeExpr) -> Option<&UnionShape> {
        match ty {
            TypeExpr::Pointer(inner) => self.shape_for_type(inner),
            TypeExpr::Named {
                pkg: None,
                name,
                args,
            } if args.is_empty() => self.shapes.get(name).filter(|s| s.kind != ShapeKind::Family),
            TypeExpr::Named { pkg: None, name, args } if Self::is_family(name) => self
                .shapes
                .get(&mangle(name, args))
                .or_else(|| self.shapes.get(name)),
            _ => None,
        }
    }

    /// The instantiation a host type denotes, if it is a container type.
    pub fn instance_for_type(&self, ty: &TypeExpr) -> Option<&Instantiation> {
        match ty {
            TypeExpr::Named { pkg: None, name, args } if args.is_empty() => self.instances.get(name),
            TypeExpr::Named { pkg: None, name, args } if Self::is_family(name) => {
                self.instances.get(&mangle(name, args))
            }
            _ => None,
        }
    }

    /// Find the union declaring `variant` when the scrutinee type is
    /// unknown. Enums win over container families; an explicit qualifier
    /// must name an enum.
    pub fn resolve_variant(&self, qualifier: Option<&str>, variant: &str) -> Result<&UnionShape, String> {
        if let Some(qualifier) = qualifier {
            return match self.shapes.get(qualifier) {
                Some(shape) if shape.kind == ShapeKind::Enum => {
                    if shape.variant(variant).is_some() {
                        Ok(shape)
                    } else {
                        Err(format!("`{qualifier}` has no variant `{variant}`"))
                    }
                }
                _ => Err(format!("unknown enum `{qualifier}`")),
            };
        }
        let enums: Vec<&UnionShape> = self.enums().filter(|s| s.variant(variant).is_some()).collect();
        match enums.as_slice() {
            [one] => return Ok(one),
            [] => {}
            many => {
                let names: Vec<&str> = many.iter().map(|s| s.name.as_str()).collect();
                return Err(format!(
                    "variant `{variant}` is ambiguous between {}; qualify it",
                    names.join(" and ")
                ));
            }
        }
        [RESULT, OPTION]
            .iter()
            .filter_map(|f| self.shapes.get(*f))
            .find(|s| s.variant(variant).is_some())
            .ok_or_else(|| format!("unknown variant `{variant}`"))
    }
}

fn family(name: &str, params: &[&str], variants: &[(&str, Option<&str>)]) -> UnionShape {
    UnionShape {
        name: name.to_string(),
        kind: ShapeKind::Family,
        tag_type: format!("{name}Tag"),
        variants: variants
            .iter()
            .map(|(variant, payload)| VariantDecl {
                name: variant.to_string(),
                kind: if payload.is_some() {
                    VariantKind::Tuple
                } else {
                    VariantKind::Unit
                },
                fields: payload
                    .iter()
                    .map(|ty| PayloadField {
                        name: "_0".to_string(),
                        ty: TypeExpr::named(*ty),
                    })
                    .collect(),
            })
            .collect(),
        type_params: params.iter().map(|p| p.to_string()).collect(),
        origin: None,
    }
}

fn result_family() -> UnionShape {
    family(RESULT, &["T", "E"], &[("Ok", Some("T")), ("Err", Some("E"))])
}

fn option_family() -> UnionShape {
    family(OPTION, &["T"], &[("Some", Some("T")), ("None", None)])
}
