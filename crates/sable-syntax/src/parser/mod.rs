//! Recursive descent parser for the host language subset.
//!
//! The parser consumes the token vector produced by the lexer and builds the
//! owned tree in [`crate::ast`]. It stops at the first error.
//!
//! # Comments and markers
//!
//! Lookahead (`nth`, `current`, `bump`) skips comment tokens, so comments
//! inside expressions and type declarations are dropped. At statement-list
//! and declaration-list positions the parser instead inspects the comments:
//! own-line comments become `Comment` nodes, trailing comments are dropped,
//! and marker comments are decoded and attached to the next declaration,
//! statement, or case clause. A marker with nothing after it is an error.

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod statements;
pub(crate) mod types;

use sable_common::{Marker, Span};

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub(crate) type PResult<T> = Result<T, ParseError>;

/// A comment seen at a list position.
pub(crate) enum ListComment {
    Marker(Marker),
    Plain(String),
}

pub(crate) struct Parser<'src> {
    /// All tokens from the lexer (including Eof).
    tokens: Vec<Token>,
    /// Current position in the token stream.
    pos: usize,
    /// Source text, for extracting token text via spans.
    source: &'src str,
    /// Negative inside control clause headers, where `T {` opens a block
    /// rather than a composite literal. Raised inside delimiters.
    expr_level: i32,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            expr_level: 0,
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    fn skip_to_significant(&self, mut pos: usize) -> usize {
        while pos < self.tokens.len() && self.tokens[pos].kind == TokenKind::Comment {
            pos += 1;
        }
        pos
    }

    /// Kind of the Nth significant token ahead.
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        let mut pos = self.skip_to_significant(self.pos);
        for _ in 0..n {
            if pos >= self.tokens.len() {
                break;
            }
            pos = self.skip_to_significant(pos + 1);
        }
        self.tokens.get(pos).map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current())
    }

    /// Text of the current significant token.
    pub(crate) fn current_text(&self) -> &'src str {
        let span = self.current_span();
        &self.source[span.range()]
    }

    pub(crate) fn current_span(&self) -> Span {
        let pos = self.skip_to_significant(self.pos);
        match self.tokens.get(pos) {
            Some(tok) => tok.span,
            None => {
                let end = self.source.len() as u32;
                Span::new(end, end)
            }
        }
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn prev_end(&self) -> u32 {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Comment)
            .map_or(0, |t| t.span.end)
    }

    // ── Consumption ────────────────────────────────────────────────────

    /// Consume the current significant token and return it.
    pub(crate) fn bump(&mut self) -> Token {
        self.pos = self.skip_to_significant(self.pos);
        match self.tokens.get(self.pos) {
            Some(tok) => {
                let tok = tok.clone();
                if tok.kind != TokenKind::Eof {
                    self.pos += 1;
                }
                tok
            }
            None => {
                let end = self.source.len() as u32;
                Token::new(TokenKind::Eof, end, end)
            }
        }
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> PResult<String> {
        let tok = self.expect(TokenKind::Ident, "identifier")?;
        Ok(self.text(tok.span).to_string())
    }

    pub(crate) fn text(&self, span: Span) -> &'src str {
        &self.source[span.range()]
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        let message = message.into();
        let span = self.current_span();
        let found = match self.current() {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Semicolon if span.is_empty() => "newline".to_string(),
            TokenKind::Error => {
                let text = self.current_text();
                if text.starts_with('"') || text.starts_with('`') || text.starts_with('\'') {
                    return ParseError::new("unterminated literal", span);
                }
                format!("`{text}`")
            }
            _ => format!("`{}`", self.current_text()),
        };
        ParseError::new(format!("{message}, found {found}"), span)
    }

    /// Consume a statement terminator: `;`, or nothing before `)` or `}`.
    pub(crate) fn expect_terminator(&mut self) -> PResult<()> {
        if self.at_any(&[TokenKind::RParen, TokenKind::RBrace]) {
            return Ok(());
        }
        self.expect(TokenKind::Semicolon, "`;` or newline")?;
        Ok(())
    }

    // ── Comments at list positions ─────────────────────────────────────

    /// Whether the raw token at `pos` is a comment.
    fn at_raw_comment(&self) -> bool {
        self.tokens
            .get(self.pos)
            .is_some_and(|t| t.kind == TokenKind::Comment)
    }

    /// Consume the run of comments at the current raw position.
    ///
    /// Trailing comments are dropped. Decoding failures of marker comments
    /// are errors.
    pub(crate) fn take_comments(&mut self) -> PResult<Vec<ListComment>> {
        let mut out = Vec::new();
        while self.at_raw_comment() {
            let tok = self.tokens[self.pos].clone();
            self.pos += 1;
            if !tok.own_line {
                continue;
            }
            let text = self.text(tok.span);
            match Marker::decode(text) {
                Ok(Some(marker)) => out.push(ListComment::Marker(marker)),
                Ok(None) => out.push(ListComment::Plain(text.trim_end().to_string())),
                Err(err) => return Err(ParseError::new(err.to_string(), tok.span)),
            }
        }
        Ok(out)
    }

    /// Consume leading empty statements and the comments between them.
    pub(crate) fn take_comments_and_semicolons(&mut self) -> PResult<Vec<ListComment>> {
        let mut out = Vec::new();
        loop {
            out.extend(self.take_comments()?);
            if self.tokens.get(self.pos).is_some_and(|t| t.kind == TokenKind::Semicolon) {
                self.pos += 1;
                continue;
            }
            return Ok(out);
        }
    }

    /// Kind of the first non-comment, non-semicolon raw token from `pos`.
    pub(crate) fn kind_after_comments(&self) -> TokenKind {
        self.tokens[self.pos..]
            .iter()
            .find(|t| !matches!(t.kind, TokenKind::Comment | TokenKind::Semicolon))
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn dangling_marker(&self, marker: &Marker) -> ParseError {
        ParseError::new(
            format!("marker {} is not followed by anything it can attach to", marker.id),
            self.current_span(),
        )
    }

    // ── Expression level ───────────────────────────────────────────────

    /// Run `f` with composite literals of bare type names disabled.
    pub(crate) fn in_header<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.expr_level;
        self.expr_level = -1;
        let result = f(self);
        self.expr_level = saved;
        result
    }

    /// Run `f` inside delimiters, where composite literals are always allowed.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.expr_level;
        self.expr_level = saved.max(0) + 1;
        let result = f(self);
        self.expr_level = saved;
        result
    }

    pub(crate) fn composite_allowed(&self) -> bool {
        self.expr_level >= 0
    }
}
