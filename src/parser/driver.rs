// src/parser/driver.rs
// Table-driven shift-reduce loop. Tokens are pulled lazily from the lexer and every
// reduction is handed to the semantic analyzer before the goto transition.

use super::tables::{Action, ParseTables, StateId};
use crate::{
    ast::Child,
    diagnostics::FatalError,
    lexer::{Lexer, Token, TokenKind},
    semantic::SemanticAnalyzer,
};

const MAX_EXPECTED_IN_MESSAGE: usize = 8;

pub struct ShaderParser<'t> {
    tables: &'t ParseTables,
}

impl<'t> ShaderParser<'t> {
    pub fn new(tables: &'t ParseTables) -> Self {
        Self { tables }
    }

    /// Parses and analyzes one pass body. Lexical and syntax errors abort; semantic
    /// problems are collected in the returned analyzer.
    pub fn parse(&self, source: &str) -> Result<SemanticAnalyzer, FatalError> {
        let mut lexer = Lexer::new(source);
        let mut analyzer = SemanticAnalyzer::new();
        // (state, child pushed when entering it)
        let mut stack: Vec<(StateId, Option<Child>)> = vec![(0, None)];
        let mut lookahead = lexer.next_token()?;
        let mut steps = 0usize;

        loop {
            let state = stack.last().map_or(0, |(s, _)| *s);
            steps += 1;
            match self.tables.action(state, lookahead.kind) {
                Action::Shift(next) => {
                    let next_tok = if lookahead.kind == TokenKind::Eof {
                        lookahead.clone()
                    } else {
                        lexer.next_token()?
                    };
                    let shifted = std::mem::replace(&mut lookahead, next_tok);
                    stack.push((next as StateId, Some(Child::Token(shifted))));
                }
                Action::Reduce(pid) => {
                    let prod = self.tables.grammar.production(pid as usize);
                    let len = prod.derivation.len();
                    let children: Vec<Child> = stack
                        .drain(stack.len() - len..)
                        .filter_map(|(_, c)| c)
                        .collect();
                    let id = analyzer.reduce(prod.id, prod.goal, children);
                    let top = stack.last().map_or(0, |(s, _)| *s);
                    let Some(next) = self.tables.goto(top, prod.goal) else {
                        return Err(self.syntax_error(top, &lookahead));
                    };
                    stack.push((next, Some(Child::Node(id))));
                }
                Action::Accept => {
                    let root = match stack.pop() {
                        Some((_, Some(Child::Node(id)))) => id,
                        _ => return Err(self.syntax_error(state, &lookahead)),
                    };
                    log::debug!(
                        "[parser] accepted after {steps} steps, {} nodes",
                        analyzer.ast.len()
                    );
                    analyzer.accept(root);
                    return Ok(analyzer);
                }
                Action::Error => return Err(self.syntax_error(state, &lookahead)),
            }
        }
    }

    fn syntax_error(&self, state: StateId, found: &Token) -> FatalError {
        let expected = self.tables.expected_terminals(state);
        let mut listed: Vec<&str> = expected
            .iter()
            .take(MAX_EXPECTED_IN_MESSAGE)
            .map(|k| k.text())
            .collect();
        if expected.len() > MAX_EXPECTED_IN_MESSAGE {
            listed.push("...");
        }
        let found_text = match found.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", found.lexeme),
        };
        FatalError::Syntax {
            message: format!("unexpected {found_text}, expected one of: {}", listed.join(", ")),
            range: found.range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{grammar::NonTerminal, shader_tables};

    fn parse(src: &str) -> Result<SemanticAnalyzer, FatalError> {
        ShaderParser::new(shader_tables()).parse(src)
    }

    #[test]
    fn accepts_minimal_program() {
        let a = parse("void frag() { }").unwrap();
        let root = a.ast.root().unwrap();
        assert_eq!(a.ast.kind(root), NonTerminal::Program);
        assert!(a.diagnostics.is_empty());
    }

    #[test]
    fn syntax_error_points_at_offending_token() {
        let err = parse("void f() { float a = ; }").unwrap_err();
        match err {
            FatalError::Syntax { message, range } => {
                assert!(message.starts_with("unexpected ';'"), "{message}");
                assert_eq!(range.start.line, 1);
                assert_eq!(range.start.column, 22);
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn truncated_input_reports_end_of_input() {
        let err = parse("void f() { ").unwrap_err();
        assert!(err.to_string().contains("unexpected end of input"), "{err}");
    }

    #[test]
    fn lexical_errors_abort_parsing() {
        let err = parse("void f() { float a = 1.0 @ 2.0; }").unwrap_err();
        assert!(matches!(err, FatalError::Lexical { .. }));
    }

    #[test]
    fn empty_source_is_a_syntax_error() {
        assert!(matches!(parse(""), Err(FatalError::Syntax { .. })));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let a = parse("void f(bool a, bool b) { if (a) if (b) discard; else return; }").unwrap();
        let outer = (0..a.ast.len())
            .filter(|&n| a.ast.kind(n) == NonTerminal::SelectionStatement)
            .max()
            .unwrap();
        // The outer `if` has no else branch.
        assert_eq!(a.ast.child_count(outer), 5);
    }
}
