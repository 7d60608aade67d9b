//! Top-level items: package clause, imports, and declarations.

use sable_common::{Marker, Span};

use crate::ast::{Decl, DeclKind, FuncDecl, GenDecl, Import, SourceFile, TypeSpec, ValueSpec};
use crate::error::ParseError;
use crate::token::TokenKind;

use super::{ListComment, PResult, Parser};

impl Parser<'_> {
    pub(crate) fn source_file(&mut self) -> PResult<SourceFile> {
        for comment in self.take_comments_and_semicolons()? {
            if let ListComment::Marker(marker) = comment {
                return Err(self.dangling_marker(&marker));
            }
        }
        self.expect(TokenKind::Package, "`package` clause")?;
        let package = self.expect_ident()?;
        self.expect_terminator()?;

        let mut imports = Vec::new();
        let mut decls = Vec::new();
        let mut pending: Vec<Marker> = Vec::new();
        loop {
            for comment in self.take_comments_and_semicolons()? {
                match comment {
                    ListComment::Marker(marker) => pending.push(marker),
                    ListComment::Plain(text) if !decls.is_empty() || imports.is_empty() => {
                        decls.push(Decl::new(DeclKind::Comment(text)));
                    }
                    ListComment::Plain(_) => {}
                }
            }
            let start = self.current_span().start;
            let kind = match self.current() {
                TokenKind::Eof => break,
                TokenKind::Import if decls.iter().all(|d| matches!(d.kind, DeclKind::Comment(_))) => {
                    if let Some(marker) = pending.first() {
                        return Err(ParseError::new(
                            format!("marker {} cannot attach to an import", marker.id),
                            self.current_span(),
                        ));
                    }
                    self.import_decl(&mut imports)?;
                    self.expect_terminator()?;
                    continue;
                }
                TokenKind::Func => DeclKind::Func(self.func_decl()?),
                TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                    DeclKind::Gen(self.gen_decl()?)
                }
                _ => return Err(self.error_here("expected declaration")),
            };
            decls.push(Decl {
                kind,
                markers: std::mem::take(&mut pending),
                span: Span::new(start, self.prev_end()),
                origin: None,
            });
            self.expect_terminator()?;
        }
        if let Some(marker) = pending.first() {
            return Err(self.dangling_marker(marker));
        }
        Ok(SourceFile {
            package,
            imports,
            decls,
        })
    }

    fn import_decl(&mut self, imports: &mut Vec<Import>) -> PResult<()> {
        self.expect(TokenKind::Import, "`import`")?;
        if self.eat(TokenKind::LParen) {
            while self.eat(TokenKind::Semicolon) {}
            while !self.at(TokenKind::RParen) {
                imports.push(self.import_spec()?);
                self.expect_terminator()?;
                while self.eat(TokenKind::Semicolon) {}
            }
            self.expect(TokenKind::RParen, "`)` to close import group")?;
        } else {
            imports.push(self.import_spec()?);
        }
        Ok(())
    }

    fn import_spec(&mut self) -> PResult<Import> {
        let alias = match self.current() {
            TokenKind::Ident => Some(self.expect_ident()?),
            TokenKind::Dot => {
                self.bump();
                Some(".".to_string())
            }
            _ => None,
        };
        if !self.at_any(&[TokenKind::StringLiteral, TokenKind::RawStringLiteral]) {
            return Err(self.error_here("expected import path"));
        }
        let tok = self.bump();
        let path = self
            .text(tok.span)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();
        Ok(Import { alias, path })
    }

    fn func_decl(&mut self) -> PResult<FuncDecl> {
        self.expect(TokenKind::Func, "`func`")?;
        let recv = if self.at(TokenKind::LParen) {
            let open = self.current_span();
            let mut params = self.param_list()?;
            if params.len() != 1 {
                return Err(ParseError::new("method has multiple receivers", open));
            }
            Some(params.remove(0))
        } else {
            None
        };
        let name = self.expect_ident()?;
        if self.at(TokenKind::LBracket) {
            return Err(self.error_here("type parameters are not supported"));
        }
        let sig = self.signature()?;
        let body = if self.at(TokenKind::LBrace) {
            Some(self.block()?)
        } else {
            None
        };
        Ok(FuncDecl {
            recv,
            name,
            sig,
            body,
        })
    }

    // ── var / const / type ─────────────────────────────────────────────

    pub(crate) fn gen_decl(&mut self) -> PResult<GenDecl> {
        let keyword = self.bump().kind;
        let grouped = self.eat(TokenKind::LParen);
        match keyword {
            TokenKind::Type => {
                let specs = self.spec_list(grouped, Self::type_spec)?;
                Ok(GenDecl::Type { specs, grouped })
            }
            TokenKind::Const => {
                let specs = self.spec_list(grouped, Self::value_spec)?;
                Ok(GenDecl::Const { specs, grouped })
            }
            _ => {
                let specs = self.spec_list(grouped, Self::value_spec)?;
                Ok(GenDecl::Var { specs, grouped })
            }
        }
    }

    fn spec_list<T>(
        &mut self,
        grouped: bool,
        mut spec: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        if !grouped {
            return Ok(vec![spec(self)?]);
        }
        let mut specs = Vec::new();
        while self.eat(TokenKind::Semicolon) {}
        while !self.at(TokenKind::RParen) {
            specs.push(spec(self)?);
            self.expect_terminator()?;
            while self.eat(TokenKind::Semicolon) {}
        }
        self.expect(TokenKind::RParen, "`)` to close declaration group")?;
        Ok(specs)
    }

    fn value_spec(&mut self) -> PResult<ValueSpec> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        let ty = if self.at_any(&[TokenKind::Eq, TokenKind::Semicolon, TokenKind::RParen]) {
            None
        } else {
            Some(self.type_expr()?)
        };
        let values = if self.eat(TokenKind::Eq) {
            self.expr_list()?
        } else {
            Vec::new()
        };
        Ok(ValueSpec { names, ty, values })
    }

    fn type_spec(&mut self) -> PResult<TypeSpec> {
        let name = self.expect_ident()?;
        let alias = self.eat(TokenKind::Eq);
        let ty = self.type_expr()?;
        Ok(TypeSpec { name, alias, ty })
    }
}
