//! Quill lexer module

mod scanner;
mod token;

pub use scanner::Lexer;
pub use token::{Token, TokenKind};
