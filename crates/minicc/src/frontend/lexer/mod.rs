//! Lexer module for tokenizing source text

mod token;
mod scanner;

pub use token::{Token, TokenKind};
pub use scanner::Lexer;
