//! Type expressions and function signatures.

use crate::ast::{ChanDir, FieldDecl, FuncType, InterfaceElem, Param, TypeExpr};
use crate::token::TokenKind;

use super::{PResult, Parser};

/// Tokens that can begin a type.
pub(crate) const TYPE_START: &[TokenKind] = &[
    TokenKind::Ident,
    TokenKind::Star,
    TokenKind::LBracket,
    TokenKind::Map,
    TokenKind::Chan,
    TokenKind::Func,
    TokenKind::Struct,
    TokenKind::Interface,
    TokenKind::LParen,
    TokenKind::Arrow,
];

/// One entry of a parameter list before names and types are sorted out.
enum ParamEntry {
    /// A lone identifier: a name whose type follows later, or a type name.
    Bare(String),
    Named(String, TypeExpr, bool),
    Type(TypeExpr, bool),
}

impl Parser<'_> {
    pub(crate) fn type_expr(&mut self) -> PResult<TypeExpr> {
        match self.current() {
            TokenKind::Ident => self.named_type(),
            TokenKind::Star => {
                self.bump();
                Ok(TypeExpr::Pointer(Box::new(self.type_expr()?)))
            }
            TokenKind::LBracket => self.array_or_slice_type(),
            TokenKind::Map => {
                self.bump();
                self.expect(TokenKind::LBracket, "`[`")?;
                let key = self.nested(|p| p.type_expr())?;
                self.expect(TokenKind::RBracket, "`]`")?;
                let value = self.type_expr()?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            TokenKind::Chan => {
                self.bump();
                let dir = if self.eat(TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Ok(TypeExpr::Chan {
                    dir,
                    elem: Box::new(self.type_expr()?),
                })
            }
            TokenKind::Arrow => {
                self.bump();
                self.expect(TokenKind::Chan, "`chan`")?;
                Ok(TypeExpr::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.type_expr()?),
                })
            }
            TokenKind::Func => {
                self.bump();
                Ok(TypeExpr::Func(self.signature()?))
            }
            TokenKind::Struct => self.struct_type(),
            TokenKind::Interface => self.interface_type(),
            TokenKind::LParen => {
                self.bump();
                let ty = self.nested(|p| p.type_expr())?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(ty)
            }
            _ => Err(self.error_here("expected type")),
        }
    }

    /// `Name`, `pkg.Name`, `Name[T, U]`.
    fn named_type(&mut self) -> PResult<TypeExpr> {
        let first = self.expect_ident()?;
        let (pkg, name) = if self.at(TokenKind::Dot) {
            self.bump();
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        let mut args = Vec::new();
        if self.at(TokenKind::LBracket) {
            self.bump();
            args = self.nested(|p| {
                let mut args = vec![p.type_expr()?];
                while p.eat(TokenKind::Comma) {
                    if p.at(TokenKind::RBracket) {
                        break;
                    }
                    args.push(p.type_expr()?);
                }
                Ok(args)
            })?;
            self.expect(TokenKind::RBracket, "`]` after type arguments")?;
        }
        Ok(TypeExpr::Named { pkg, name, args })
    }

    fn array_or_slice_type(&mut self) -> PResult<TypeExpr> {
        self.expect(TokenKind::LBracket, "`[`")?;
        if self.eat(TokenKind::RBracket) {
            return Ok(TypeExpr::Slice(Box::new(self.type_expr()?)));
        }
        let len = if self.eat(TokenKind::Ellipsis) {
            None
        } else {
            Some(Box::new(self.nested(|p| p.expr())?))
        };
        self.expect(TokenKind::RBracket, "`]`")?;
        Ok(TypeExpr::Array {
            len,
            elem: Box::new(self.type_expr()?),
        })
    }

    fn struct_type(&mut self) -> PResult<TypeExpr> {
        self.expect(TokenKind::Struct, "`struct`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let fields = self.nested(|p| {
            let mut fields = Vec::new();
            while p.eat(TokenKind::Semicolon) {}
            while !p.at(TokenKind::RBrace) {
                fields.push(p.field_decl()?);
                p.expect_terminator()?;
                while p.eat(TokenKind::Semicolon) {}
            }
            Ok(fields)
        })?;
        self.expect(TokenKind::RBrace, "`}` to close struct")?;
        Ok(TypeExpr::Struct(fields))
    }

    fn field_decl(&mut self) -> PResult<FieldDecl> {
        let embedded = match self.current() {
            TokenKind::Star => true,
            TokenKind::Ident => matches!(
                self.nth(1),
                TokenKind::Semicolon
                    | TokenKind::RBrace
                    | TokenKind::Dot
                    | TokenKind::StringLiteral
                    | TokenKind::RawStringLiteral
            ),
            _ => return Err(self.error_here("expected field")),
        };
        let (names, ty) = if embedded {
            (Vec::new(), self.type_expr()?)
        } else {
            let mut names = vec![self.expect_ident()?];
            while self.eat(TokenKind::Comma) {
                names.push(self.expect_ident()?);
            }
            (names, self.type_expr()?)
        };
        let tag = if self.at_any(&[TokenKind::StringLiteral, TokenKind::RawStringLiteral]) {
            let tok = self.bump();
            Some(self.text(tok.span).to_string())
        } else {
            None
        };
        Ok(FieldDecl { names, ty, tag })
    }

    fn interface_type(&mut self) -> PResult<TypeExpr> {
        self.expect(TokenKind::Interface, "`interface`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let elems = self.nested(|p| {
            let mut elems = Vec::new();
            while p.eat(TokenKind::Semicolon) {}
            while !p.at(TokenKind::RBrace) {
                if p.at(TokenKind::Ident) && p.nth(1) == TokenKind::LParen {
                    let name = p.expect_ident()?;
                    let sig = p.signature()?;
                    elems.push(InterfaceElem::Method { name, sig });
                } else {
                    elems.push(InterfaceElem::Embedded(p.type_expr()?));
                }
                p.expect_terminator()?;
                while p.eat(TokenKind::Semicolon) {}
            }
            Ok(elems)
        })?;
        self.expect(TokenKind::RBrace, "`}` to close interface")?;
        Ok(TypeExpr::Interface(elems))
    }

    // ── Signatures ─────────────────────────────────────────────────────

    /// `(params) results`, positioned at the opening parenthesis.
    pub(crate) fn signature(&mut self) -> PResult<FuncType> {
        let params = self.param_list()?;
        let results = if self.at(TokenKind::LParen) {
            self.param_list()?
        } else if self.at_any(TYPE_START) {
            vec![Param::unnamed(self.type_expr()?)]
        } else {
            Vec::new()
        };
        Ok(FuncType { params, results })
    }

    pub(crate) fn param_list(&mut self) -> PResult<Vec<Param>> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        let entries = self.nested(|p| {
            let mut entries = Vec::new();
            while !p.at(TokenKind::RParen) {
                entries.push(p.param_entry()?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(entries)
        })?;
        if !self.at(TokenKind::RParen) {
            return Err(crate::error::ParseError::with_related(
                "expected `)` to close parameter list",
                self.current_span(),
                "list started here",
                open.span,
            ));
        }
        self.bump();
        Ok(resolve_params(entries))
    }

    fn param_entry(&mut self) -> PResult<ParamEntry> {
        if self.at(TokenKind::Ident) {
            match self.nth(1) {
                TokenKind::Comma | TokenKind::RParen => {
                    return Ok(ParamEntry::Bare(self.expect_ident()?));
                }
                TokenKind::Dot => {
                    let ty = self.type_expr()?;
                    return Ok(ParamEntry::Type(ty, false));
                }
                _ => {
                    let name = self.expect_ident()?;
                    let variadic = self.eat(TokenKind::Ellipsis);
                    let ty = self.type_expr()?;
                    return Ok(ParamEntry::Named(name, ty, variadic));
                }
            }
        }
        let variadic = self.eat(TokenKind::Ellipsis);
        Ok(ParamEntry::Type(self.type_expr()?, variadic))
    }
}

/// Sort out `a, b int` (names sharing a type) from `int, string` (types).
fn resolve_params(entries: Vec<ParamEntry>) -> Vec<Param> {
    let any_named = entries.iter().any(|e| matches!(e, ParamEntry::Named(..)));
    if !any_named {
        return entries
            .into_iter()
            .map(|e| match e {
                ParamEntry::Bare(name) => Param::unnamed(TypeExpr::named(name)),
                ParamEntry::Type(ty, variadic) | ParamEntry::Named(_, ty, variadic) => Param {
                    name: None,
                    ty,
                    variadic,
                },
            })
            .collect();
    }

    let mut params: Vec<Param> = Vec::with_capacity(entries.len());
    let mut pending_type: Option<TypeExpr> = None;
    for entry in entries.into_iter().rev() {
        match entry {
            ParamEntry::Named(name, ty, variadic) => {
                pending_type = Some(ty.clone());
                params.push(Param {
                    name: Some(name),
                    ty,
                    variadic,
                });
            }
            ParamEntry::Bare(name) => {
                let ty = pending_type.clone().unwrap_or_else(|| TypeExpr::named(name.clone()));
                params.push(Param::named(name, ty));
            }
            ParamEntry::Type(ty, variadic) => params.push(Param {
                name: None,
                ty,
                variadic,
            }),
        }
    }
    params.reverse();
    params
}
