// src/lexer/scanner.rs
// Hand-written streaming scanner. Produces tokens on demand for the parser.

use super::{
    Token,
    tokens::{TokenKind, directive_kind, keyword_or_ident},
};
use crate::diagnostics::{FatalError, Position, SourceRange};

// Longest spellings first so greedy matching picks `<<=` over `<<` over `<`.
const OPERATORS_3: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::LeftAssign),
    (">>=", TokenKind::RightAssign),
];

const OPERATORS_2: &[(&str, TokenKind)] = &[
    ("<<", TokenKind::LeftOp),
    (">>", TokenKind::RightOp),
    ("++", TokenKind::IncOp),
    ("--", TokenKind::DecOp),
    ("<=", TokenKind::LeOp),
    (">=", TokenKind::GeOp),
    ("==", TokenKind::EqOp),
    ("!=", TokenKind::NeOp),
    ("&&", TokenKind::AndOp),
    ("||", TokenKind::OrOp),
    ("^^", TokenKind::XorOp),
    ("*=", TokenKind::MulAssign),
    ("/=", TokenKind::DivAssign),
    ("%=", TokenKind::ModAssign),
    ("+=", TokenKind::AddAssign),
    ("-=", TokenKind::SubAssign),
    ("&=", TokenKind::AndAssign),
    ("^=", TokenKind::XorAssign),
    ("|=", TokenKind::OrAssign),
];

fn single_char_kind(b: u8) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match b {
        b'(' => LeftParen,
        b')' => RightParen,
        b'[' => LeftBracket,
        b']' => RightBracket,
        b'{' => LeftBrace,
        b'}' => RightBrace,
        b'.' => Dot,
        b',' => Comma,
        b':' => Colon,
        b'=' => Equal,
        b';' => Semicolon,
        b'!' => Bang,
        b'-' => Dash,
        b'~' => Tilde,
        b'+' => Plus,
        b'*' => Star,
        b'/' => Slash,
        b'%' => Percent,
        b'<' => LeftAngle,
        b'>' => RightAngle,
        b'|' => VerticalBar,
        b'^' => Caret,
        b'&' => Ampersand,
        b'?' => Question,
        _ => return None,
    })
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            finished: false,
        }
    }

    #[inline]
    fn here(&self) -> Position {
        Position::new(self.pos, self.line, self.column)
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn lexical_error(&self, message: impl Into<String>, position: Position) -> FatalError {
        FatalError::Lexical {
            message: message.into(),
            position,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), FatalError> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0B | 0x0C), _) => {
                    self.bump();
                }
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek(0) {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.here();
                    self.bump_n(2);
                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.bump_n(2);
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(
                                    self.lexical_error("unterminated block comment", start)
                                );
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn make_token(&self, kind: TokenKind, start: Position) -> Token {
        Token {
            kind,
            lexeme: self.src[start.index..self.pos].to_string(),
            range: SourceRange::new(start, self.here()),
        }
    }

    fn scan_directive(&mut self, start: Position) -> Token {
        // '#'
        self.bump();
        while matches!(self.peek(0), Some(b' ' | b'\t')) {
            self.bump();
        }
        let name_start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.bump();
        }
        let kind = directive_kind(&self.src[name_start..self.pos]);

        // Rest of the line, honouring backslash continuations.
        loop {
            match (self.peek(0), self.peek(1), self.peek(2)) {
                (Some(b'\\'), Some(b'\n'), _) => self.bump_n(2),
                (Some(b'\\'), Some(b'\r'), Some(b'\n')) => self.bump_n(3),
                (Some(b'\n'), _, _) | (None, _, _) => break,
                _ => {
                    self.bump();
                }
            }
        }

        let mut text = &self.src[start.index..self.pos];
        if let Some(cut) = text.find("//") {
            text = &text[..cut];
        }
        let text = text.trim_end();
        Token {
            kind,
            lexeme: text.to_string(),
            range: SourceRange::new(start, self.here()),
        }
    }

    fn scan_number(&mut self, start: Position) -> Token {
        if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x' | b'X')) {
            self.bump_n(2);
            while self.peek(0).is_some_and(|b| b.is_ascii_hexdigit()) {
                self.bump();
            }
            if matches!(self.peek(0), Some(b'u' | b'U')) {
                self.bump();
                return self.make_token(TokenKind::UintConstant, start);
            }
            return self.make_token(TokenKind::IntConstant, start);
        }

        let mut is_float = false;
        while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        if self.peek(0) == Some(b'.') {
            is_float = true;
            self.bump();
            while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let exp_digits = match self.peek(1) {
                Some(b'+' | b'-') => self.peek(2).is_some_and(|b| b.is_ascii_digit()),
                Some(b) => b.is_ascii_digit(),
                None => false,
            };
            if exp_digits {
                is_float = true;
                self.bump();
                if matches!(self.peek(0), Some(b'+' | b'-')) {
                    self.bump();
                }
                while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        if is_float {
            if matches!(self.peek(0), Some(b'f' | b'F')) {
                self.bump();
            }
            return self.make_token(TokenKind::FloatConstant, start);
        }
        if matches!(self.peek(0), Some(b'u' | b'U')) {
            self.bump();
            return self.make_token(TokenKind::UintConstant, start);
        }
        self.make_token(TokenKind::IntConstant, start)
    }

    fn scan_string(&mut self, start: Position) -> Result<Token, FatalError> {
        // opening quote
        self.bump();
        loop {
            match self.peek(0) {
                Some(b'"') => {
                    self.bump();
                    return Ok(self.make_token(TokenKind::StringLiteral, start));
                }
                Some(b'\\') => {
                    self.bump();
                    if self.peek(0).is_none_or(|b| b == b'\n') {
                        return Err(self.lexical_error("unterminated string literal", start));
                    }
                    self.bump();
                }
                Some(b'\n') | None => {
                    return Err(self.lexical_error("unterminated string literal", start));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Returns the next significant token; `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, FatalError> {
        self.skip_trivia()?;
        let start = self.here();
        let Some(b) = self.peek(0) else {
            return Ok(self.make_token(TokenKind::Eof, start));
        };

        if b == b'#' && self.at_line_start {
            let tok = self.scan_directive(start);
            return Ok(tok);
        }
        self.at_line_start = false;

        if is_ident_start(b) {
            while self.peek(0).is_some_and(is_ident_continue) {
                self.bump();
            }
            let kind = keyword_or_ident(&self.src[start.index..self.pos]);
            return Ok(self.make_token(kind, start));
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
            return Ok(self.scan_number(start));
        }

        if b == b'"' {
            return self.scan_string(start);
        }

        let rest = &self.bytes[self.pos..];
        for table in [OPERATORS_3, OPERATORS_2] {
            for (text, kind) in table {
                if rest.starts_with(text.as_bytes()) {
                    self.bump_n(text.len());
                    return Ok(self.make_token(*kind, start));
                }
            }
        }
        if let Some(kind) = single_char_kind(b) {
            self.bump();
            return Ok(self.make_token(kind, start));
        }

        let ch = self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}');
        Err(self.lexical_error(format!("unexpected character {ch:?}"), start))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, FatalError>;

    /// Yields every token including the final `Eof`, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let res = self.next_token();
        match &res {
            Ok(tok) if tok.kind == TokenKind::Eof => self.finished = true,
            Err(_) => self.finished = true,
            _ => {}
        }
        Some(res)
    }
}

/// Eagerly lexes `src`. The returned vector always ends with an `Eof` token.
pub fn tokenize(src: &str) -> Result<Vec<Token>, FatalError> {
    Lexer::new(src).collect()
}
