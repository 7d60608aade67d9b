use serde::Serialize;

use sable_common::Span;

/// A token produced by the host lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// For comments: nothing but whitespace precedes the comment on its line.
    pub own_line: bool,
}

impl Token {
    /// Create a new token from a kind and byte offsets.
    pub fn new(kind: TokenKind, start: u32, end: u32) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
            own_line: false,
        }
    }
}

/// Every kind of token in the host language subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // ── Keywords ───────────────────────────────────────────────────────
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Struct,
    Switch,
    Type,
    Var,

    // ── Operators ──────────────────────────────────────────────────────
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&^`
    AmpCaret,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `<-`
    Arrow,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `!`
    Bang,
    /// `=`
    Eq,
    /// `:=`
    ColonEq,
    /// `+=`, `-=`, `<<=`, ... (text distinguishes them)
    OpAssign,
    /// `...`
    Ellipsis,
    /// `~`
    Tilde,

    // ── Delimiters ─────────────────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // ── Punctuation ────────────────────────────────────────────────────
    Comma,
    Dot,
    Colon,
    /// Explicit `;` or one inserted at a line end.
    Semicolon,

    // ── Literals ───────────────────────────────────────────────────────
    IntLiteral,
    FloatLiteral,
    /// Imaginary literals such as `2i`.
    ImagLiteral,
    RuneLiteral,
    /// Interpreted string `"..."`.
    StringLiteral,
    /// Raw string `` `...` ``.
    RawStringLiteral,

    // ── Identifiers and comments ───────────────────────────────────────
    Ident,
    /// `// ...` comment, text includes the slashes.
    Comment,

    // ── Special ────────────────────────────────────────────────────────
    Eof,
    /// Invalid/unexpected input.
    Error,
}

impl TokenKind {
    /// Whether a newline after this token ends the statement.
    pub fn triggers_semicolon(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::ImagLiteral
                | TokenKind::RuneLiteral
                | TokenKind::StringLiteral
                | TokenKind::RawStringLiteral
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

/// Look up a keyword from its string representation.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "break" => Some(TokenKind::Break),
        "case" => Some(TokenKind::Case),
        "chan" => Some(TokenKind::Chan),
        "const" => Some(TokenKind::Const),
        "continue" => Some(TokenKind::Continue),
        "default" => Some(TokenKind::Default),
        "defer" => Some(TokenKind::Defer),
        "else" => Some(TokenKind::Else),
        "fallthrough" => Some(TokenKind::Fallthrough),
        "for" => Some(TokenKind::For),
        "func" => Some(TokenKind::Func),
        "go" => Some(TokenKind::Go),
        "goto" => Some(TokenKind::Goto),
        "if" => Some(TokenKind::If),
        "import" => Some(TokenKind::Import),
        "interface" => Some(TokenKind::Interface),
        "map" => Some(TokenKind::Map),
        "package" => Some(TokenKind::Package),
        "range" => Some(TokenKind::Range),
        "return" => Some(TokenKind::Return),
        "struct" => Some(TokenKind::Struct),
        "switch" => Some(TokenKind::Switch),
        "type" => Some(TokenKind::Type),
        "var" => Some(TokenKind::Var),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve() {
        assert_eq!(keyword_from_str("func"), Some(TokenKind::Func));
        assert_eq!(keyword_from_str("switch"), Some(TokenKind::Switch));
        assert_eq!(keyword_from_str("match"), None);
        assert_eq!(keyword_from_str("enum"), None);
    }

    #[test]
    fn semicolon_triggers() {
        assert!(TokenKind::RBrace.triggers_semicolon());
        assert!(TokenKind::Return.triggers_semicolon());
        assert!(!TokenKind::LBrace.triggers_semicolon());
        assert!(!TokenKind::Comma.triggers_semicolon());
    }
}
