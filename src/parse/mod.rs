pub mod ast;
mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use lexer::TokenKind;
pub use parser::Parsed;

/// Parses `s`, recording every error instead of stopping at the first.
pub fn parse(s: &str) -> Parsed {
    parser::Parser::new(s).parse()
}
