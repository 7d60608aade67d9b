//! Statement parser: blocks, statement lists, and control flow.

use sable_common::{Marker, Span};

use crate::ast::{
    Block, CaseClause, Expr, ExprKind, ForKind, ForStmt, IfStmt, Stmt, StmtKind, SwitchStmt,
};
use crate::error::ParseError;
use crate::token::TokenKind;

use super::{ListComment, PResult, Parser};

fn comment_stmt(text: String) -> Stmt {
    Stmt::new(StmtKind::Comment(text))
}

impl Parser<'_> {
    /// `{ stmts }`
    pub(crate) fn block(&mut self) -> PResult<Block> {
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        let saved = self.expr_level;
        self.expr_level = 0;
        let stmts = self.stmt_list(false);
        self.expr_level = saved;
        let stmts = stmts?;
        if !self.at(TokenKind::RBrace) {
            return Err(ParseError::with_related(
                "expected `}` to close block",
                self.current_span(),
                "block started here",
                open.span,
            ));
        }
        let close = self.bump();
        Ok(Block {
            stmts,
            span: open.span.merge(close.span),
        })
    }

    /// Statements up to a closing brace (or, inside a case clause, up to the
    /// next `case`/`default`). Markers attach to the statement after them.
    fn stmt_list(&mut self, in_case: bool) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        let mut pending: Vec<Marker> = Vec::new();
        loop {
            if in_case
                && matches!(
                    self.kind_after_comments(),
                    TokenKind::Case | TokenKind::Default | TokenKind::RBrace
                )
            {
                break;
            }
            for comment in self.take_comments_and_semicolons()? {
                match comment {
                    ListComment::Marker(marker) => pending.push(marker),
                    ListComment::Plain(text) => stmts.push(comment_stmt(text)),
                }
            }
            if self.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
                break;
            }
            let mut stmt = self.stmt()?;
            stmt.markers = std::mem::take(&mut pending);
            stmts.push(stmt);
            self.expect_terminator()?;
        }
        if let Some(marker) = pending.first() {
            return Err(self.dangling_marker(marker));
        }
        Ok(stmts)
    }

    pub(crate) fn stmt(&mut self) -> PResult<Stmt> {
        let start = self.current_span().start;
        let kind = match self.current() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                StmtKind::Decl(self.gen_decl()?)
            }
            TokenKind::Return => {
                self.bump();
                if self.at_any(&[TokenKind::Semicolon, TokenKind::RBrace]) {
                    StmtKind::Return(Vec::new())
                } else {
                    StmtKind::Return(self.expr_list()?)
                }
            }
            TokenKind::If => StmtKind::If(self.if_stmt()?),
            TokenKind::For => StmtKind::For(self.for_stmt()?),
            TokenKind::Switch => StmtKind::Switch(self.switch_stmt()?),
            TokenKind::LBrace => StmtKind::Block(self.block()?),
            TokenKind::Break => {
                self.bump();
                StmtKind::Break(self.opt_label()?)
            }
            TokenKind::Continue => {
                self.bump();
                StmtKind::Continue(self.opt_label()?)
            }
            TokenKind::Goto => {
                self.bump();
                StmtKind::Goto(self.expect_ident()?)
            }
            TokenKind::Fallthrough => {
                self.bump();
                StmtKind::Fallthrough
            }
            TokenKind::Go => {
                self.bump();
                StmtKind::Go(self.expr()?)
            }
            TokenKind::Defer => {
                self.bump();
                StmtKind::Defer(self.expr()?)
            }
            _ => {
                let lhs = self.expr_list()?;
                if lhs.len() == 1 && self.at(TokenKind::Colon) {
                    if let Some(label) = lhs[0].as_ident() {
                        let label = label.to_string();
                        self.bump();
                        let stmt = self.stmt()?;
                        StmtKind::Labeled {
                            label,
                            stmt: Box::new(stmt),
                        }
                    } else {
                        return Err(self.error_here("expected statement end"));
                    }
                } else {
                    self.finish_simple_stmt(lhs)?
                }
            }
        };
        Ok(Stmt {
            kind,
            markers: Vec::new(),
            span: Span::new(start, self.prev_end()),
            origin: None,
        })
    }

    fn opt_label(&mut self) -> PResult<Option<String>> {
        if self.at(TokenKind::Ident) {
            return Ok(Some(self.expect_ident()?));
        }
        Ok(None)
    }

    // ── Simple statements ──────────────────────────────────────────────

    fn simple_stmt(&mut self) -> PResult<Stmt> {
        let start = self.current_span().start;
        let lhs = self.expr_list()?;
        let kind = self.finish_simple_stmt(lhs)?;
        Ok(Stmt {
            kind,
            markers: Vec::new(),
            span: Span::new(start, self.prev_end()),
            origin: None,
        })
    }

    /// Everything after the leading expression list of a simple statement.
    fn finish_simple_stmt(&mut self, mut lhs: Vec<Expr>) -> PResult<StmtKind> {
        match self.current() {
            TokenKind::ColonEq => {
                self.bump();
                let names = lhs
                    .iter()
                    .map(|e| {
                        e.as_ident().map(str::to_string).ok_or_else(|| {
                            ParseError::new("expected identifier on left side of `:=`", e.span)
                        })
                    })
                    .collect::<PResult<Vec<_>>>()?;
                let values = self.expr_list()?;
                Ok(StmtKind::ShortVar { names, values })
            }
            TokenKind::Eq | TokenKind::OpAssign => {
                let tok = self.bump();
                let op = self.text(tok.span).to_string();
                let rhs = self.expr_list()?;
                Ok(StmtKind::Assign { lhs, op, rhs })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let inc = self.bump().kind == TokenKind::PlusPlus;
                let expr = single(lhs, "increment")?;
                Ok(StmtKind::IncDec { expr, inc })
            }
            TokenKind::Arrow => {
                self.bump();
                let chan = single(lhs, "send")?;
                let value = self.expr()?;
                Ok(StmtKind::Send { chan, value })
            }
            _ => {
                if lhs.len() != 1 {
                    return Err(self.error_here("expected `:=` or `=`"));
                }
                Ok(StmtKind::Expr(lhs.remove(0)))
            }
        }
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn if_stmt(&mut self) -> PResult<IfStmt> {
        self.expect(TokenKind::If, "`if`")?;
        let (init, cond) = self.in_header(|p| {
            let first = p.simple_stmt()?;
            if p.eat(TokenKind::Semicolon) {
                let cond = p.expr()?;
                return Ok((Some(Box::new(first)), cond));
            }
            match first.kind {
                StmtKind::Expr(cond) => Ok((None, cond)),
                _ => Err(ParseError::new("expected condition after `if`", first.span)),
            }
        })?;
        let then = self.block()?;
        let els = if self.eat(TokenKind::Else) {
            let start = self.current_span().start;
            let kind = if self.at(TokenKind::If) {
                StmtKind::If(self.if_stmt()?)
            } else {
                StmtKind::Block(self.block()?)
            };
            Some(Box::new(Stmt {
                kind,
                markers: Vec::new(),
                span: Span::new(start, self.prev_end()),
                origin: None,
            }))
        } else {
            None
        };
        Ok(IfStmt {
            init,
            cond,
            then,
            els,
        })
    }

    fn for_stmt(&mut self) -> PResult<ForStmt> {
        self.expect(TokenKind::For, "`for`")?;
        let kind = self.in_header(|p| {
            if p.at(TokenKind::LBrace) {
                return Ok(ForKind::Infinite);
            }
            if p.eat(TokenKind::Range) {
                return Ok(ForKind::Range {
                    key: None,
                    value: None,
                    define: false,
                    expr: p.expr()?,
                });
            }

            let init = if p.at(TokenKind::Semicolon) {
                None
            } else {
                let start = p.current_span().start;
                let lhs = p.expr_list()?;
                if p.at_any(&[TokenKind::ColonEq, TokenKind::Eq]) && p.nth(1) == TokenKind::Range {
                    let define = p.bump().kind == TokenKind::ColonEq;
                    p.bump();
                    if lhs.len() > 2 {
                        return Err(ParseError::new("at most two range variables", lhs[2].span));
                    }
                    let mut vars = lhs.into_iter();
                    return Ok(ForKind::Range {
                        key: vars.next(),
                        value: vars.next(),
                        define,
                        expr: p.expr()?,
                    });
                }
                let kind = p.finish_simple_stmt(lhs)?;
                Some(Stmt {
                    kind,
                    markers: Vec::new(),
                    span: Span::new(start, p.prev_end()),
                    origin: None,
                })
            };

            if p.at(TokenKind::LBrace) {
                return match init {
                    Some(Stmt {
                        kind: StmtKind::Expr(cond),
                        ..
                    }) => Ok(ForKind::Cond(cond)),
                    Some(stmt) => Err(ParseError::new("expected loop condition", stmt.span)),
                    None => Ok(ForKind::Infinite),
                };
            }

            p.expect(TokenKind::Semicolon, "`;` in for clause")?;
            let cond = if p.at(TokenKind::Semicolon) {
                None
            } else {
                Some(p.expr()?)
            };
            p.expect(TokenKind::Semicolon, "`;` in for clause")?;
            let post = if p.at(TokenKind::LBrace) {
                None
            } else {
                Some(Box::new(p.simple_stmt()?))
            };
            Ok(ForKind::Clause {
                init: init.map(Box::new),
                cond,
                post,
            })
        })?;
        let body = self.block()?;
        Ok(ForStmt { kind, body })
    }

    fn switch_stmt(&mut self) -> PResult<SwitchStmt> {
        self.expect(TokenKind::Switch, "`switch`")?;
        let (init, tag, binding) = self.in_header(|p| {
            if p.at(TokenKind::LBrace) {
                return Ok((None, None, None));
            }
            let mut init = None;
            let mut first = if p.at(TokenKind::Semicolon) {
                None
            } else {
                Some(p.simple_stmt()?)
            };
            if p.eat(TokenKind::Semicolon) {
                init = first.take().map(Box::new);
                if !p.at(TokenKind::LBrace) {
                    first = Some(p.simple_stmt()?);
                }
            }
            let Some(first) = first else {
                return Ok((init, None, None));
            };
            match first.kind {
                StmtKind::Expr(tag) => Ok((init, Some(tag), None)),
                StmtKind::ShortVar {
                    mut names,
                    mut values,
                } if names.len() == 1 && values.len() == 1 && is_type_switch_guard(&values[0]) => {
                    Ok((init, values.pop(), names.pop()))
                }
                _ => Err(ParseError::new("expected switch expression", first.span)),
            }
        })?;

        let open = self.expect(TokenKind::LBrace, "`{`")?;
        let mut clauses: Vec<CaseClause> = Vec::new();
        let mut pending: Vec<Marker> = Vec::new();
        loop {
            for comment in self.take_comments_and_semicolons()? {
                match comment {
                    ListComment::Marker(marker) => pending.push(marker),
                    ListComment::Plain(text) => {
                        if let Some(last) = clauses.last_mut() {
                            last.body.push(comment_stmt(text));
                        }
                    }
                }
            }
            let start = self.current_span().start;
            let (exprs, is_default) = match self.current() {
                TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::Case => {
                    self.bump();
                    let exprs = self.expr_list()?;
                    (exprs, false)
                }
                TokenKind::Default => {
                    self.bump();
                    (Vec::new(), true)
                }
                _ => return Err(self.error_here("expected `case` or `default`")),
            };
            self.expect(TokenKind::Colon, "`:` after case")?;
            let body = self.stmt_list(true)?;
            clauses.push(CaseClause {
                exprs,
                is_default,
                body,
                markers: std::mem::take(&mut pending),
                span: Span::new(start, self.prev_end()),
            });
        }
        if let Some(marker) = pending.first() {
            return Err(self.dangling_marker(marker));
        }
        if !self.at(TokenKind::RBrace) {
            return Err(ParseError::with_related(
                "expected `}` to close switch",
                self.current_span(),
                "switch body started here",
                open.span,
            ));
        }
        self.bump();
        Ok(SwitchStmt {
            init,
            tag,
            binding,
            clauses,
        })
    }
}

fn single(mut exprs: Vec<Expr>, what: &str) -> PResult<Expr> {
    if exprs.len() != 1 {
        let span = exprs
            .iter()
            .map(|e| e.span)
            .reduce(Span::merge)
            .unwrap_or_default();
        return Err(ParseError::new(format!("{what} takes a single operand"), span));
    }
    Ok(exprs.remove(0))
}

fn is_type_switch_guard(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::TypeAssert { ty: None, .. })
}
