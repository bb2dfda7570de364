//! Negative lexer tests: every case must fail with a positioned lexical error.

use shaderlabc::{FatalError, lexer::tokenize};

fn lex_error(src: &str) -> (String, usize, usize) {
    match tokenize(src) {
        Err(FatalError::Lexical { message, position }) => (message, position.line, position.column),
        other => panic!("expected a lexical error for {src:?}, got {other:?}"),
    }
}

#[test]
fn unterminated_string_eof() {
    let (msg, line, col) = lex_error("#define NAME \"x\nfloat s = \"hello");
    assert_eq!(msg, "unterminated string literal");
    assert_eq!((line, col), (2, 11));
}

#[test]
fn newline_in_string() {
    let (msg, _, _) = lex_error("s = \"hello\nworld\";");
    assert_eq!(msg, "unterminated string literal");
}

#[test]
fn unterminated_block_comment() {
    let (msg, line, col) = lex_error("float a = 1.0; /* comment");
    assert_eq!(msg, "unterminated block comment");
    assert_eq!((line, col), (1, 16));
}

#[test]
fn unexpected_character_reports_position() {
    let (msg, line, col) = lex_error("void f() {\n    a = 1 @ 2;\n}");
    assert!(msg.contains("'@'"), "{msg}");
    assert_eq!((line, col), (2, 11));
}

#[test]
fn valid_source_ends_with_eof() {
    let toks = tokenize("vec4 c = texture2D(t, uv); // trailing").unwrap();
    assert_eq!(toks.last().map(|t| t.kind), Some(shaderlabc::lexer::TokenKind::Eof));
}
