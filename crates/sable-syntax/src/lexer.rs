//! Tokenizer for the host language subset.
//!
//! Implements the host's automatic semicolon insertion: a newline (or end
//! of input) after an identifier, literal, one of `break continue
//! fallthrough return`, `++ --`, or a closing delimiter becomes a
//! `Semicolon` token. Line comments are emitted as tokens so the parser can
//! keep own-line comments and decode markers; block comments are skipped.

use crate::cursor::Cursor;
use crate::token::{keyword_from_str, Token, TokenKind};

/// The host lexer. Converts source text into a stream of tokens.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Last non-comment token kind, for semicolon insertion.
    last: Option<TokenKind>,
    /// A token to emit before resuming normal lexing.
    pending: Option<Token>,
    /// Whether a non-whitespace token was seen on the current line.
    line_has_code: bool,
    emitted_eof: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            last: None,
            pending: None,
            line_has_code: false,
            emitted_eof: false,
        }
    }

    /// Tokenize the entire source. The result ends with a single `Eof`.
    pub fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).collect()
    }

    fn wants_semicolon(&self) -> bool {
        self.last.is_some_and(TokenKind::triggers_semicolon)
    }

    fn inserted_semicolon(&mut self, at: u32) -> Token {
        self.last = Some(TokenKind::Semicolon);
        Token::new(TokenKind::Semicolon, at, at)
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }

            self.cursor.eat_while(|c| c == ' ' || c == '\t' || c == '\r');
            let start = self.cursor.pos();

            let Some(c) = self.cursor.peek() else {
                if self.wants_semicolon() {
                    return Some(self.inserted_semicolon(start));
                }
                if self.emitted_eof {
                    return None;
                }
                self.emitted_eof = true;
                return Some(Token::new(TokenKind::Eof, start, start));
            };

            match c {
                '\n' => {
                    self.cursor.advance();
                    self.line_has_code = false;
                    if self.wants_semicolon() {
                        return Some(self.inserted_semicolon(start));
                    }
                }
                '/' if self.cursor.peek_next() == Some('/') => {
                    let own_line = !self.line_has_code;
                    self.cursor.eat_while(|c| c != '\n');
                    let mut comment = Token::new(TokenKind::Comment, start, self.cursor.pos());
                    comment.own_line = own_line;
                    if self.wants_semicolon() {
                        self.pending = Some(comment);
                        return Some(self.inserted_semicolon(start));
                    }
                    return Some(comment);
                }
                '/' if self.cursor.peek_next() == Some('*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    let mut saw_newline = false;
                    let mut closed = false;
                    while let Some(c) = self.cursor.advance() {
                        if c == '\n' {
                            saw_newline = true;
                        } else if c == '*' && self.cursor.eat('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.last = Some(TokenKind::Error);
                        return Some(Token::new(TokenKind::Error, start, self.cursor.pos()));
                    }
                    if saw_newline && self.wants_semicolon() {
                        return Some(self.inserted_semicolon(start));
                    }
                }
                _ => {
                    let tok = self.lex_token(start, c);
                    self.line_has_code = true;
                    self.last = Some(tok.kind);
                    return Some(tok);
                }
            }
        }
    }

    fn lex_token(&mut self, start: u32, c: char) -> Token {
        match c {
            // ── Delimiters and punctuation ─────────────────────────────────
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '~' => self.single(TokenKind::Tilde, start),

            // ── Operators ──────────────────────────────────────────────────
            '+' => self.lex_doubled_or_assign('+', TokenKind::PlusPlus, TokenKind::Plus, start),
            '-' => self.lex_doubled_or_assign('-', TokenKind::MinusMinus, TokenKind::Minus, start),
            '*' => self.lex_op_assign(TokenKind::Star, start),
            '/' => self.lex_op_assign(TokenKind::Slash, start),
            '%' => self.lex_op_assign(TokenKind::Percent, start),
            '^' => self.lex_op_assign(TokenKind::Caret, start),
            '&' => self.lex_amp(start),
            '|' => self.lex_doubled_or_assign('|', TokenKind::PipePipe, TokenKind::Pipe, start),
            '<' => self.lex_lt(start),
            '>' => self.lex_gt(start),
            '=' => {
                self.cursor.advance();
                let kind = if self.cursor.eat('=') { TokenKind::EqEq } else { TokenKind::Eq };
                Token::new(kind, start, self.cursor.pos())
            }
            '!' => {
                self.cursor.advance();
                let kind = if self.cursor.eat('=') { TokenKind::NotEq } else { TokenKind::Bang };
                Token::new(kind, start, self.cursor.pos())
            }
            ':' => {
                self.cursor.advance();
                let kind = if self.cursor.eat('=') { TokenKind::ColonEq } else { TokenKind::Colon };
                Token::new(kind, start, self.cursor.pos())
            }
            '.' => self.lex_dot(start),

            // ── Literals ───────────────────────────────────────────────────
            '0'..='9' => self.lex_number(start),
            '"' => self.lex_string(start),
            '`' => self.lex_raw_string(start),
            '\'' => self.lex_rune(start),

            c if is_ident_start(c) => self.lex_ident(start),

            _ => {
                self.cursor.advance();
                Token::new(TokenKind::Error, start, self.cursor.pos())
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn single(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    /// `op` or `op=`.
    fn lex_op_assign(&mut self, plain: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('=') { TokenKind::OpAssign } else { plain };
        Token::new(kind, start, self.cursor.pos())
    }

    /// `opop`, `op=`, or `op`.
    fn lex_doubled_or_assign(&mut self, op: char, doubled: TokenKind, plain: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat(op) {
            doubled
        } else if self.cursor.eat('=') {
            TokenKind::OpAssign
        } else {
            plain
        };
        Token::new(kind, start, self.cursor.pos())
    }

    /// `&`, `&&`, `&=`, `&^`, `&^=`
    fn lex_amp(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('&') {
            TokenKind::AmpAmp
        } else if self.cursor.eat('^') {
            if self.cursor.eat('=') {
                TokenKind::OpAssign
            } else {
                TokenKind::AmpCaret
            }
        } else if self.cursor.eat('=') {
            TokenKind::OpAssign
        } else {
            TokenKind::Amp
        };
        Token::new(kind, start, self.cursor.pos())
    }

    /// `<`, `<=`, `<<`, `<<=`, `<-`
    fn lex_lt(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('<') {
            if self.cursor.eat('=') {
                TokenKind::OpAssign
            } else {
                TokenKind::Shl
            }
        } else if self.cursor.eat('=') {
            TokenKind::LtEq
        } else if self.cursor.eat('-') {
            TokenKind::Arrow
        } else {
            TokenKind::Lt
        };
        Token::new(kind, start, self.cursor.pos())
    }

    /// `>`, `>=`, `>>`, `>>=`
    fn lex_gt(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('>') {
            if self.cursor.eat('=') {
                TokenKind::OpAssign
            } else {
                TokenKind::Shr
            }
        } else if self.cursor.eat('=') {
            TokenKind::GtEq
        } else {
            TokenKind::Gt
        };
        Token::new(kind, start, self.cursor.pos())
    }

    /// `.`, `...`, or a float such as `.5`.
    fn lex_dot(&mut self, start: u32) -> Token {
        if self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            return self.lex_number(start);
        }
        self.cursor.advance();
        if self.cursor.peek() == Some('.') && self.cursor.peek_next() == Some('.') {
            self.cursor.advance();
            self.cursor.advance();
            return Token::new(TokenKind::Ellipsis, start, self.cursor.pos());
        }
        Token::new(TokenKind::Dot, start, self.cursor.pos())
    }

    fn lex_number(&mut self, start: u32) -> Token {
        let mut kind = TokenKind::IntLiteral;
        if self.cursor.peek() == Some('0') && matches!(self.cursor.peek_next(), Some('x' | 'X' | 'b' | 'B' | 'o' | 'O')) {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            if self.cursor.peek() == Some('.') && self.cursor.peek_next() != Some('.') {
                self.cursor.advance();
                kind = TokenKind::FloatLiteral;
                self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.cursor.peek(), Some('e' | 'E')) {
                self.cursor.advance();
                if matches!(self.cursor.peek(), Some('+' | '-')) {
                    self.cursor.advance();
                }
                kind = TokenKind::FloatLiteral;
                self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
        }
        if self.cursor.eat('i') {
            kind = TokenKind::ImagLiteral;
        }
        Token::new(kind, start, self.cursor.pos())
    }

    fn lex_string(&mut self, start: u32) -> Token {
        self.cursor.advance();
        while let Some(c) = self.cursor.peek() {
            match c {
                '\n' => break,
                '\\' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                '"' => {
                    self.cursor.advance();
                    return Token::new(TokenKind::StringLiteral, start, self.cursor.pos());
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        Token::new(TokenKind::Error, start, self.cursor.pos())
    }

    fn lex_raw_string(&mut self, start: u32) -> Token {
        self.cursor.advance();
        while let Some(c) = self.cursor.advance() {
            if c == '`' {
                return Token::new(TokenKind::RawStringLiteral, start, self.cursor.pos());
            }
        }
        Token::new(TokenKind::Error, start, self.cursor.pos())
    }

    fn lex_rune(&mut self, start: u32) -> Token {
        self.cursor.advance();
        while let Some(c) = self.cursor.peek() {
            match c {
                '\n' => break,
                '\\' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                '\'' => {
                    self.cursor.advance();
                    return Token::new(TokenKind::RuneLiteral, start, self.cursor.pos());
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        Token::new(TokenKind::Error, start, self.cursor.pos())
    }

    fn lex_ident(&mut self, start: u32) -> Token {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice(start, self.cursor.pos());
        let kind = keyword_from_str(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, start, self.cursor.pos())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
