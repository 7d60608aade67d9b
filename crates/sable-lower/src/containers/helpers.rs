//! Helper methods of container instantiations.
//!
//! Helpers are written as host-language templates and parsed, so what is
//! emitted is exactly what is shown here. Placeholders:
//!
//! - `{Name}`: the instantiation, e.g. `Result_int_error`
//! - `{Tag}`: the family tag type, e.g. `ResultTag`
//! - `{T}` and `{E}`: the element types

use sable_syntax::ast::{Block, CaseClause, Decl, DeclKind, Expr, FuncType, Stmt, TypeExpr};
use sable_syntax::visit::{walk_block, walk_clause, walk_decl, walk_expr, walk_stmt, VisitMut};
use sable_syntax::print_type;

use crate::error::LowerError;
use crate::shape::{Instantiation, UnionCatalog, OPTION, RESULT};

const RESULT_HELPERS: &str = r#"
func (r {Name}) IsOk() bool {
	return r.tag == {Tag}Ok
}

func (r {Name}) IsErr() bool {
	return r.tag == {Tag}Err
}

func (r {Name}) Unwrap() {T} {
	if r.tag != {Tag}Ok {
		panic("sable: Unwrap called on an Err value")
	}
	return *r.ok0
}

func (r {Name}) UnwrapOr(fallback {T}) {T} {
	if r.tag == {Tag}Ok {
		return *r.ok0
	}
	return fallback
}

func (r {Name}) UnwrapErr() {E} {
	if r.tag != {Tag}Err {
		panic("sable: UnwrapErr called on an Ok value")
	}
	return *r.err0
}

func (r {Name}) Map(f func({T}) {T}) {Name} {
	if r.tag == {Tag}Ok {
		v := f(*r.ok0)
		return {Name}{tag: {Tag}Ok, ok0: &v}
	}
	return r
}

func (r {Name}) MapErr(f func({E}) {E}) {Name} {
	if r.tag == {Tag}Err {
		e := f(*r.err0)
		return {Name}{tag: {Tag}Err, err0: &e}
	}
	return r
}

func (r {Name}) AndThen(f func({T}) {Name}) {Name} {
	if r.tag == {Tag}Ok {
		return f(*r.ok0)
	}
	return r
}

func (r {Name}) OrElse(f func({E}) {Name}) {Name} {
	if r.tag == {Tag}Err {
		return f(*r.err0)
	}
	return r
}
"#;

const OPTION_HELPERS: &str = r#"
func (o {Name}) IsSome() bool {
	return o.tag == {Tag}Some
}

func (o {Name}) IsNone() bool {
	return o.tag == {Tag}None
}

func (o {Name}) Unwrap() {T} {
	if o.tag != {Tag}Some {
		panic("sable: Unwrap called on a None value")
	}
	return *o.some0
}

func (o {Name}) UnwrapOr(fallback {T}) {T} {
	if o.tag == {Tag}Some {
		return *o.some0
	}
	return fallback
}

func (o {Name}) UnwrapOrElse(f func() {T}) {T} {
	if o.tag == {Tag}Some {
		return *o.some0
	}
	return f()
}

func (o {Name}) Map(f func({T}) {T}) {Name} {
	if o.tag == {Tag}Some {
		v := f(*o.some0)
		return {Name}{tag: {Tag}Some, some0: &v}
	}
	return o
}

func (o {Name}) AndThen(f func({T}) {Name}) {Name} {
	if o.tag == {Tag}Some {
		return f(*o.some0)
	}
	return o
}

func (o {Name}) Filter(keep func({T}) bool) {Name} {
	if o.tag == {Tag}Some && keep(*o.some0) {
		return o
	}
	return {Name}{tag: {Tag}None}
}

func (o {Name}) OrElse(f func() {Name}) {Name} {
	if o.tag == {Tag}Some {
		return o
	}
	return f()
}
"#;

/// Helper method declarations for one instantiation.
pub fn helper_decls(instance: &Instantiation, catalog: &UnionCatalog) -> Result<Vec<Decl>, LowerError> {
    let template = match instance.family.as_str() {
        RESULT => RESULT_HELPERS,
        OPTION => OPTION_HELPERS,
        _ => return Ok(Vec::new()),
    };
    let tag = catalog
        .get(&instance.family)
        .map(|family| family.tag_type.clone())
        .unwrap_or_else(|| format!("{}Tag", instance.family));
    let text = template
        .replace("{Name}", &instance.name)
        .replace("{Tag}", &tag)
        .replace("{T}", &type_text(instance.arg(0)))
        .replace("{E}", &type_text(instance.arg(1)));

    let mut file = sable_syntax::parse(&format!("package sable\n{text}")).map_err(|err| LowerError::Template {
        name: instance.name.clone(),
        message: err.to_string(),
    })?;
    let mut detach = Detach;
    for decl in &mut file.decls {
        detach.visit_decl(decl);
    }
    tracing::trace!(instance = %instance.name, methods = file.decls.len(), "helpers generated");
    Ok(file.decls)
}

/// `(receiver type, method name, signature)` of every helper that would be
/// emitted for the instantiations in `catalog`.
pub fn helper_signatures(catalog: &UnionCatalog) -> Vec<(String, String, FuncType)> {
    let mut out = Vec::new();
    for instance in catalog.instances() {
        let Ok(decls) = helper_decls(instance, catalog) else {
            continue;
        };
        for decl in decls {
            if let DeclKind::Func(func) = decl.kind {
                out.push((instance.name.clone(), func.name, func.sig));
            }
        }
    }
    out
}

fn type_text(ty: Option<&TypeExpr>) -> String {
    ty.map(print_type).unwrap_or_else(|| "any".to_string())
}

/// Template positions mean nothing in the unit being lowered.
struct Detach;

impl VisitMut for Detach {
    fn visit_decl(&mut self, decl: &mut Decl) {
        decl.span = sable_common::Span::DETACHED;
        walk_decl(self, decl);
    }

    fn visit_block(&mut self, block: &mut Block) {
        block.span = sable_common::Span::DETACHED;
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        stmt.span = sable_common::Span::DETACHED;
        walk_stmt(self, stmt);
    }

    fn visit_clause(&mut self, clause: &mut CaseClause) {
        clause.span = sable_common::Span::DETACHED;
        walk_clause(self, clause);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        expr.span = sable_common::Span::DETACHED;
        walk_expr(self, expr);
    }
}
