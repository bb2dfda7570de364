// src/parser/mod.rs
pub mod driver;
pub mod grammar;
pub mod shader_grammar;
pub mod tables;

use std::sync::OnceLock;

pub use driver::ShaderParser;
pub use grammar::{Grammar, GrammarSymbol, NonTerminal, Production, ProductionId};
pub use shader_grammar::shader_grammar;
pub use tables::{Action, Conflict, ParseTables};

use crate::{diagnostics::FatalError, semantic::SemanticAnalyzer};

static SHADER_TABLES: OnceLock<ParseTables> = OnceLock::new();

/// LALR(1) tables of the shader grammar, built on first use and shared by every
/// compilation in the process.
pub fn shader_tables() -> &'static ParseTables {
    SHADER_TABLES.get_or_init(|| {
        let t0 = std::time::Instant::now();
        let tables = ParseTables::build(shader_grammar());
        log::info!(
            "[parser] built {} states in {:.3} ms",
            tables.n_states,
            t0.elapsed().as_secs_f64() * 1e3
        );
        tables
    })
}

/// Lexes, parses and analyzes `source` with the shared tables.
pub fn parse(source: &str) -> Result<SemanticAnalyzer, FatalError> {
    ShaderParser::new(shader_tables()).parse(source)
}
