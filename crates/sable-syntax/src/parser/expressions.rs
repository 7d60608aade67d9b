//! Expression parser.
//!
//! Binary operators use precedence climbing over Go's five levels; unary
//! operators and the postfix chain (selectors, calls, index and slice
//! expressions, type assertions, composite literals) are handled in
//! `unary_expr` and `postfix_expr`.

use sable_common::{LitKind, Literal, Span};

use crate::ast::{BinaryOp, Element, Expr, ExprKind, TypeExpr, UnaryOp};
use crate::error::ParseError;
use crate::token::TokenKind;

use super::{PResult, Parser};

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::AmpCaret => BinaryOp::AndNot,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::Ge,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

fn unary_op(kind: TokenKind) -> Option<UnaryOp> {
    Some(match kind {
        TokenKind::Minus => UnaryOp::Neg,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Caret => UnaryOp::BitNot,
        TokenKind::Star => UnaryOp::Deref,
        TokenKind::Amp => UnaryOp::Addr,
        TokenKind::Arrow => UnaryOp::Recv,
        _ => return None,
    })
}

impl Parser<'_> {
    pub(crate) fn expr(&mut self) -> PResult<Expr> {
        self.binary_expr(1)
    }

    pub(crate) fn expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.unary_expr()?;
        while let Some(op) = binary_op(self.current()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.binary_expr(prec + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        if let Some(op) = unary_op(self.current()) {
            // `<-chan T` in expression position is a type.
            if op == UnaryOp::Recv && self.nth(1) == TokenKind::Chan {
                let start = self.current_span().start;
                let ty = self.type_expr()?;
                return self.finish_type_operand(ty, start);
            }
            let start = self.bump().span.start;
            let operand = self.unary_expr()?;
            let span = Span::new(start, operand.span.end);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    expr: Box::new(operand),
                },
                span,
            });
        }
        let operand = self.operand()?;
        self.postfix_expr(operand)
    }

    fn operand(&mut self) -> PResult<Expr> {
        let span = self.current_span();
        let lit = |kind: LitKind, p: &mut Self| -> PResult<Expr> {
            let tok = p.bump();
            Ok(Expr {
                kind: ExprKind::Lit(Literal::new(kind, p.text(tok.span))),
                span: tok.span,
            })
        };
        match self.current() {
            TokenKind::Ident => {
                let tok = self.bump();
                Ok(Expr {
                    kind: ExprKind::Ident(self.text(tok.span).to_string()),
                    span: tok.span,
                })
            }
            TokenKind::IntLiteral => lit(LitKind::Int, self),
            TokenKind::FloatLiteral | TokenKind::ImagLiteral => lit(LitKind::Float, self),
            TokenKind::StringLiteral | TokenKind::RawStringLiteral => lit(LitKind::String, self),
            TokenKind::RuneLiteral => lit(LitKind::Rune, self),
            TokenKind::LParen => {
                self.bump();
                let inner = self.nested(|p| p.expr())?;
                let close = self.expect(TokenKind::RParen, "`)`")?;
                Ok(Expr {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: span.merge(close.span),
                })
            }
            TokenKind::Func => {
                self.bump();
                let sig = self.signature()?;
                if self.at(TokenKind::LBrace) {
                    let saved = self.expr_level;
                    self.expr_level = 0;
                    let body = self.block();
                    self.expr_level = saved;
                    let body = body?;
                    let end = body.span.end;
                    return Ok(Expr {
                        kind: ExprKind::FuncLit { sig, body },
                        span: Span::new(span.start, end),
                    });
                }
                self.finish_type_operand(TypeExpr::Func(sig), span.start)
            }
            TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface => {
                let ty = self.type_expr()?;
                self.finish_type_operand(ty, span.start)
            }
            TokenKind::Error => Err(self.error_here("invalid token")),
            _ => Err(self.error_here("expected expression")),
        }
    }

    /// A type literal in expression position, possibly opening a composite literal.
    fn finish_type_operand(&mut self, ty: TypeExpr, start: u32) -> PResult<Expr> {
        if self.at(TokenKind::LBrace) {
            return self.composite_lit(Some(ty), start);
        }
        Ok(Expr {
            kind: ExprKind::Type(Box::new(ty)),
            span: Span::new(start, self.prev_end()),
        })
    }

    fn postfix_expr(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            match self.current() {
                TokenKind::Dot => {
                    self.bump();
                    if self.eat(TokenKind::LParen) {
                        let ty = if self.eat(TokenKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.nested(|p| p.type_expr())?))
                        };
                        let close = self.expect(TokenKind::RParen, "`)` after type assertion")?;
                        let span = expr.span.merge(close.span);
                        expr = Expr {
                            kind: ExprKind::TypeAssert {
                                expr: Box::new(expr),
                                ty,
                            },
                            span,
                        };
                    } else {
                        let name_tok = self.expect(TokenKind::Ident, "field or method name")?;
                        let span = expr.span.merge(name_tok.span);
                        expr = Expr {
                            kind: ExprKind::Selector {
                                expr: Box::new(expr),
                                name: self.text(name_tok.span).to_string(),
                            },
                            span,
                        };
                    }
                }
                TokenKind::LParen => expr = self.call(expr)?,
                TokenKind::LBracket => expr = self.index_or_slice(expr)?,
                TokenKind::LBrace if self.composite_allowed() && looks_like_type(&expr) => {
                    let start = expr.span.start;
                    let ty = expr_to_type(&expr)
                        .ok_or_else(|| ParseError::new("expected type before `{`", expr.span))?;
                    expr = self.composite_lit(Some(ty), start)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call(&mut self, func: Expr) -> PResult<Expr> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        let (args, ellipsis) = self.nested(|p| {
            let mut args = Vec::new();
            let mut ellipsis = false;
            while !p.at(TokenKind::RParen) {
                args.push(p.expr()?);
                if p.eat(TokenKind::Ellipsis) {
                    ellipsis = true;
                }
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok((args, ellipsis))
        })?;
        if !self.at(TokenKind::RParen) {
            return Err(ParseError::with_related(
                "expected `)` to close argument list",
                self.current_span(),
                "call started here",
                open.span,
            ));
        }
        let close = self.bump();
        let span = func.span.merge(close.span);
        Ok(Expr {
            kind: ExprKind::Call {
                func: Box::new(func),
                args,
                ellipsis,
            },
            span,
        })
    }

    fn index_or_slice(&mut self, base: Expr) -> PResult<Expr> {
        self.expect(TokenKind::LBracket, "`[`")?;
        let kind = self.nested(|p| {
            let low = if p.at(TokenKind::Colon) {
                None
            } else {
                Some(Box::new(p.expr()?))
            };
            if p.eat(TokenKind::Colon) {
                let high = if p.at_any(&[TokenKind::Colon, TokenKind::RBracket]) {
                    None
                } else {
                    Some(Box::new(p.expr()?))
                };
                let max = if p.eat(TokenKind::Colon) {
                    Some(Box::new(p.expr()?))
                } else {
                    None
                };
                return Ok(SliceOrIndex::Slice(low, high, max));
            }
            let mut indices = Vec::new();
            if let Some(first) = low {
                indices.push(*first);
            }
            while p.eat(TokenKind::Comma) {
                if p.at(TokenKind::RBracket) {
                    break;
                }
                indices.push(p.expr()?);
            }
            Ok(SliceOrIndex::Index(indices))
        })?;
        let close = self.expect(TokenKind::RBracket, "`]`")?;
        let span = base.span.merge(close.span);
        let kind = match kind {
            SliceOrIndex::Index(indices) => ExprKind::Index {
                expr: Box::new(base),
                indices,
            },
            SliceOrIndex::Slice(low, high, max) => ExprKind::Slice {
                expr: Box::new(base),
                low,
                high,
                max,
            },
        };
        Ok(Expr { kind, span })
    }

    fn composite_lit(&mut self, ty: Option<TypeExpr>, start: u32) -> PResult<Expr> {
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        let elems = self.nested(|p| {
            let mut elems = Vec::new();
            while !p.at(TokenKind::RBrace) {
                let first = p.element_value()?;
                let elem = if p.eat(TokenKind::Colon) {
                    Element {
                        key: Some(first),
                        value: p.element_value()?,
                    }
                } else {
                    Element {
                        key: None,
                        value: first,
                    }
                };
                elems.push(elem);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(elems)
        })?;
        if !self.at(TokenKind::RBrace) {
            return Err(ParseError::with_related(
                "expected `}` to close composite literal",
                self.current_span(),
                "literal started here",
                open.span,
            ));
        }
        let close = self.bump();
        Ok(Expr {
            kind: ExprKind::Composite {
                ty: ty.map(Box::new),
                elems,
            },
            span: Span::new(start, close.span.end),
        })
    }

    /// Element value; a bare `{ ... }` is a literal with elided type.
    fn element_value(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::LBrace) {
            let start = self.current_span().start;
            return self.composite_lit(None, start);
        }
        self.expr()
    }
}

enum SliceOrIndex {
    Index(Vec<Expr>),
    Slice(Option<Box<Expr>>, Option<Box<Expr>>, Option<Box<Expr>>),
}

/// Whether an operand could name a type for a composite literal.
fn looks_like_type(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Selector { expr, .. } => matches!(expr.kind, ExprKind::Ident(_)),
        ExprKind::Index { expr, .. } => looks_like_type(expr),
        _ => false,
    }
}

/// Reinterpret an expression as a type: `T`, `pkg.T`, `T[A, B]`, `*T`, `[]T`.
pub fn expr_to_type(expr: &Expr) -> Option<TypeExpr> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(TypeExpr::named(name.clone())),
        ExprKind::Selector { expr: base, name } => match &base.kind {
            ExprKind::Ident(pkg) => Some(TypeExpr::Named {
                pkg: Some(pkg.clone()),
                name: name.clone(),
                args: Vec::new(),
            }),
            _ => None,
        },
        ExprKind::Index { expr: base, indices } => {
            let TypeExpr::Named { pkg, name, args } = expr_to_type(base)? else {
                return None;
            };
            if !args.is_empty() {
                return None;
            }
            let args = indices.iter().map(expr_to_type).collect::<Option<Vec<_>>>()?;
            Some(TypeExpr::Named { pkg, name, args })
        }
        ExprKind::Unary {
            op: UnaryOp::Deref,
            expr: inner,
        } => Some(TypeExpr::Pointer(Box::new(expr_to_type(inner)?))),
        ExprKind::Paren(inner) => expr_to_type(inner),
        ExprKind::Type(ty) => Some((**ty).clone()),
        _ => None,
    }
}
