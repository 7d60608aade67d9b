//! `enum` declarations.
//!
//! An enum becomes a single skeleton line, a struct type with one nested
//! struct per variant, so the host parser carries the payload field types
//! to the transform:
//!
//! ```text
//! type Shape struct { Circle struct { _0 float64 }; Rect struct { w float64; h float64 }; Point struct{} }
//! ```

use rustc_hash::FxHashSet;

use sable_common::marker::{VariantKind, VariantSig};
use sable_common::MarkerPayload;

use crate::arms::unterminated_string;
use crate::error::{PrepErrorKind, PrepFault};
use crate::scan::{blank_comments, is_ident_char, is_ident_start, matching_brace, split_top_level};
use crate::unit::Unit;

/// One parsed variant with its payload types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VariantSrc {
    pub name: String,
    pub kind: VariantKind,
    pub fields: Vec<(String, String)>,
}

impl<'a> Unit<'a> {
    /// Rewrite the enum starting at `start`; returns the offset after its
    /// closing brace.
    pub(crate) fn enum_decl(&mut self, start: usize, limit: usize, indent: &str) -> Result<usize, PrepFault> {
        let src = self.src;
        let after_kw = start + "enum".len();
        let name_start = after_kw + (src[after_kw..limit].len() - src[after_kw..limit].trim_start().len());
        let name_len = src[name_start..limit]
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(limit - name_start);
        let name = &src[name_start..name_start + name_len];
        let rest_start = name_start + name_len;
        let open = rest_start + (src[rest_start..limit].len() - src[rest_start..limit].trim_start().len());
        match src[open..limit].chars().next() {
            Some('[' | '<') => {
                return Err(PrepFault::at(
                    PrepErrorKind::GenericEnumUnsupported(name.to_string()),
                    start,
                    open + 1,
                ))
            }
            Some('{') => {}
            _ => {
                return Err(PrepFault::at(
                    PrepErrorKind::InvalidEnum(format!("expected `{{` after `enum {name}`")),
                    start,
                    open,
                ))
            }
        }
        let close = matching_brace(src, open, limit)
            .map_err(unterminated_string)?
            .ok_or_else(|| PrepFault::at(PrepErrorKind::UnterminatedBlock { construct: "enum" }, start, open + 1))?;

        let fail = |kind: PrepErrorKind| PrepFault::at(kind, start, close + 1);
        let variants = parse_variants(&src[open + 1..close]).map_err(fail)?;
        if variants.is_empty() {
            return Err(fail(PrepErrorKind::InvalidEnum(format!("enum `{name}` has no variants"))));
        }
        let mut seen = FxHashSet::default();
        for variant in &variants {
            if !seen.insert(variant.name.as_str()) {
                return Err(fail(PrepErrorKind::DuplicateVariant(variant.name.clone())));
            }
        }

        let origin = self.origin(start, close + 1);
        let marker = self.marker(
            origin,
            MarkerPayload::EnumDecl {
                name: name.to_string(),
                type_params: Vec::new(),
                variants: variants
                    .iter()
                    .map(|v| VariantSig {
                        name: v.name.clone(),
                        kind: v.kind,
                        fields: v.fields.iter().map(|(f, _)| f.clone()).collect(),
                    })
                    .collect(),
            },
        );
        self.out.push_marker(indent, &marker)?;
        self.out.push(format!("{indent}{}", skeleton_type(name, &variants)), origin.line);
        tracing::trace!(name, variants = variants.len(), "enum");
        Ok(close + 1)
    }
}

fn skeleton_type(name: &str, variants: &[VariantSrc]) -> String {
    let body: Vec<String> = variants
        .iter()
        .map(|v| {
            if v.fields.is_empty() {
                format!("{} struct{{}}", v.name)
            } else {
                let fields: Vec<String> = v.fields.iter().map(|(f, ty)| format!("{f} {ty}")).collect();
                format!("{} struct {{ {} }}", v.name, fields.join("; "))
            }
        })
        .collect();
    format!("type {name} struct {{ {} }}", body.join("; "))
}

/// Parse the text between an enum's braces.
pub(crate) fn parse_variants(body: &str) -> Result<Vec<VariantSrc>, PrepErrorKind> {
    let body = blank_comments(body);
    let entries = split_top_level(&body, &[',', '\n', ';']).map_err(|_| PrepErrorKind::UnterminatedString)?;
    let mut variants = Vec::new();
    for range in entries {
        let entry = body[range].trim();
        if entry.is_empty() {
            continue;
        }
        variants.push(parse_variant(entry)?);
    }
    Ok(variants)
}

fn parse_variant(entry: &str) -> Result<VariantSrc, PrepErrorKind> {
    let name_len = entry.find(|c: char| !is_ident_char(c)).unwrap_or(entry.len());
    let name = &entry[..name_len];
    if !name.starts_with(is_ident_start) {
        return Err(PrepErrorKind::InvalidEnum(format!("expected a variant name, found `{entry}`")));
    }
    if !name.starts_with(char::is_uppercase) {
        return Err(PrepErrorKind::InvalidEnum(format!(
            "variant `{name}` must start with an uppercase letter"
        )));
    }
    let rest = entry[name_len..].trim();
    let unexpected = || PrepErrorKind::InvalidEnum(format!("unexpected `{rest}` after variant `{name}`"));

    if rest.is_empty() {
        return Ok(VariantSrc {
            name: name.to_string(),
            kind: VariantKind::Unit,
            fields: Vec::new(),
        });
    }
    if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        let mut fields = Vec::new();
        for range in split_top_level(inner, &[',']).map_err(|_| PrepErrorKind::UnterminatedString)? {
            let ty = inner[range].trim();
            if ty.is_empty() {
                continue;
            }
            fields.push((format!("_{}", fields.len()), collapse(ty)));
        }
        return Ok(VariantSrc {
            name: name.to_string(),
            kind: VariantKind::Tuple,
            fields,
        });
    }
    if let Some(inner) = rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        let mut fields = Vec::new();
        for range in split_top_level(inner, &[',', ';', '\n']).map_err(|_| PrepErrorKind::UnterminatedString)? {
            let field = inner[range].trim();
            if field.is_empty() {
                continue;
            }
            let field_len = field.find(|c: char| !is_ident_char(c)).unwrap_or(field.len());
            let field_name = &field[..field_len];
            let ty = field[field_len..].trim_start();
            let ty = ty.strip_prefix(':').unwrap_or(ty).trim();
            if !field_name.starts_with(is_ident_start) || ty.is_empty() {
                return Err(PrepErrorKind::InvalidEnum(format!(
                    "expected `name type` in variant `{name}`, found `{field}`"
                )));
            }
            fields.push((field_name.to_string(), collapse(ty)));
        }
        return Ok(VariantSrc {
            name: name.to_string(),
            kind: VariantKind::Struct,
            fields,
        });
    }
    Err(unexpected())
}

/// Collapse runs of whitespace so multi-line types fit on the skeleton line.
fn collapse(ty: &str) -> String {
    ty.split_whitespace().collect::<Vec<_>>().join(" ")
}
