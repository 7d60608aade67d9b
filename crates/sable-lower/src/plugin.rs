//! The plugin seam of the transform.
//!
//! A plugin owns one construct family. The transformer runs each plugin's
//! discovery and then its transform over the whole file before moving on to
//! the next plugin, so later plugins see the rewrites of earlier ones.

use sable_common::NameGen;
use sable_syntax::ast::{SourceFile, TypeExpr};
use sable_typeck::TypeInference;

use crate::error::{Diagnostic, LowerError};
use crate::ledger::MarkerLedger;
use crate::registry::DeclarationRegistry;
use crate::shape::{ShapeKind, UnionCatalog};
use crate::tagged;

/// Settings shared by every plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct LowerOptions {
    /// Error type of `Ok(v)` when nothing else determines it. Default: `error`.
    pub default_error_type: TypeExpr,
    /// Emit `IsOk`, `Unwrap`, `Map`, ... for each container instantiation.
    /// Default: true.
    pub emit_helpers: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            default_error_type: TypeExpr::named("error"),
            emit_helpers: true,
        }
    }
}

/// Everything a plugin may read or update while lowering one unit.
pub struct LowerContext<'a> {
    pub options: &'a LowerOptions,
    pub names: &'a mut NameGen,
    pub infer: &'a mut TypeInference,
    pub registry: &'a mut DeclarationRegistry,
    pub catalog: &'a mut UnionCatalog,
    pub ledger: &'a mut MarkerLedger,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

impl LowerContext<'_> {
    /// Re-collect package scope after the tree changed, then re-declare
    /// everything generated so far (it lives in the registry, not the file).
    pub fn refresh(&mut self, file: &SourceFile) {
        self.infer.reset_for(file);
        let catalog = &*self.catalog;
        for shape in catalog.enums() {
            let variants = shape.variants.iter().map(|v| v.name.clone()).collect();
            self.infer.declare_union(&shape.name, variants);
            declare_shape(self.infer, shape);
        }
        for instance in catalog.instances() {
            if let Some(shape) = catalog.get(&instance.name) {
                declare_shape(self.infer, shape);
            }
        }
        for (recv, name, sig) in crate::containers::helper_signatures(catalog, self.options) {
            self.infer.declare_method(&recv, &name, sig);
        }
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(code = %diagnostic.code, message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }
}

/// Make a shape's struct, constructors and predicates visible to inference.
pub(crate) fn declare_shape(infer: &mut TypeInference, shape: &crate::shape::UnionShape) {
    infer.declare_type(&shape.name, tagged::struct_type(shape));
    if shape.kind == ShapeKind::Enum {
        for variant in &shape.variants {
            if let Some(sig) = tagged::constructor_sig(shape, &variant.name) {
                infer.declare_func(&shape.constructor_name(&variant.name), sig);
            }
            infer.declare_method(&shape.name, &tagged::predicate_name(&variant.name), tagged::predicate_sig());
        }
    }
}

pub trait Plugin {
    fn name(&self) -> &'static str;

    /// Find the constructs this plugin lowers. Must not modify the tree.
    fn discover(&mut self, file: &SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError>;

    /// Rewrite what discovery found.
    fn transform(&mut self, file: &mut SourceFile, cx: &mut LowerContext<'_>) -> Result<(), LowerError>;
}
