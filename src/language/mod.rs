pub mod ast;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

use ast::Program;
use errors::SyntaxErrors;

/// Lexes and parses a walk script. Lexing errors are reported on their own;
/// the parser only runs over a clean token stream.
pub fn parse_source(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = lexer::lex(source).map_err(SyntaxErrors::from)?;
    parser::parse(&tokens)
}
