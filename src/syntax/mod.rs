// Front end: source text to per-file syntax tree
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::SourceFile;
pub use lexer::{LexError, tokenize};
pub use parser::{Parse, SyntaxError, parse};
pub use token::{Keyword, Token, TokenKind};

/// Tokenize and parse one file.
///
/// A lexical error is fatal for the file; syntax errors are collected in the
/// returned [`Parse`].
pub fn parse_source(text: &str) -> Result<Parse, LexError> {
    let tokens = tokenize(text)?;
    Ok(parse(&tokens))
}
