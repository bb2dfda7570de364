// src/lexer/mod.rs
pub mod scanner;
pub mod tokens;

pub use scanner::{Lexer, tokenize};
pub use tokens::{N_KINDS, TokenKind};

use crate::diagnostics::SourceRange;

/// A lexed terminal. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub range: SourceRange,
}
