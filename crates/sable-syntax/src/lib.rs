//! Host-language front end for Sable.
//!
//! Parses the host language subset into the owned tree in [`ast`] and prints
//! trees back to canonical source. The lowering passes consume and rewrite
//! this tree; marker comments left by the preprocessor are decoded during
//! parsing and attached to the nodes that follow them.

pub mod ast;
pub mod cursor;
pub mod error;
pub mod format;
pub mod lexer;
mod parser;
pub mod token;
pub mod visit;
pub mod walk;

pub use error::ParseError;
pub use format::{print_expr, print_file, print_stmt, print_type, FormatConfig, Mapping, Printed};
pub use parser::expressions::expr_to_type;

use ast::{Expr, SourceFile, TypeExpr};
use lexer::Lexer;
use parser::{PResult, Parser};
use token::TokenKind;

/// Parse a complete source file.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse(source: &str) -> Result<SourceFile, ParseError> {
    let tokens = Lexer::tokenize(source);
    let mut parser = Parser::new(tokens, source);
    parser.source_file()
}

/// Parse a standalone expression.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    parse_fragment(source, |p| p.expr())
}

/// Parse a standalone type.
pub fn parse_type(source: &str) -> Result<TypeExpr, ParseError> {
    parse_fragment(source, |p| p.type_expr())
}

fn parse_fragment<T>(source: &str, f: impl FnOnce(&mut Parser<'_>) -> PResult<T>) -> Result<T, ParseError> {
    let tokens = Lexer::tokenize(source);
    let mut parser = Parser::new(tokens, source);
    let value = f(&mut parser)?;
    while parser.eat(TokenKind::Semicolon) {}
    if !parser.at(TokenKind::Eof) {
        return Err(parser.error_here("unexpected trailing input"));
    }
    Ok(value)
}

/// Print a file with the default layout.
pub fn print(file: &SourceFile) -> String {
    print_file(file, &FormatConfig::default()).code
}
