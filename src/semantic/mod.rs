// src/semantic/mod.rs
// Semantic analyzer driven by parser reductions.

pub mod builtins;
pub mod macros;
mod rules;
pub mod scope;
pub mod shader_data;
pub mod types;

use macros::MacroTracker;
use scope::SymbolTable;
use shader_data::ShaderData;
use types::Type;

use crate::{
    ast::{Ast, Child, NodeId},
    diagnostics::{Diagnostic, SourceRange, has_errors},
    parser::grammar::{NonTerminal, ProductionId},
};

/// Function whose body is currently being reduced.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub name: String,
    pub return_type: Type,
}

/// Per-compilation analysis state. Owns the tree, the scope stack, the macro tracker
/// and the diagnostics; nothing in here is shared between compilations.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub macros: MacroTracker,
    pub shader_data: ShaderData,
    pub diagnostics: Vec<Diagnostic>,
    function: Option<FunctionContext>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_error(&mut self, range: SourceRange, message: impl Into<String>) {
        let d = Diagnostic::error(range, message);
        log::debug!("[semantic] {d}");
        self.diagnostics.push(d);
    }

    pub fn report_warning(&mut self, range: SourceRange, message: impl Into<String>) {
        let d = Diagnostic::warning(range, message);
        log::debug!("[semantic] {d}");
        self.diagnostics.push(d);
    }

    pub fn current_function(&self) -> Option<&FunctionContext> {
        self.function.as_ref()
    }

    /// Allocates the node for a reduction and runs its semantic hook. Every child has
    /// already been analyzed.
    pub fn reduce(
        &mut self,
        production: ProductionId,
        goal: NonTerminal,
        children: Vec<Child>,
    ) -> NodeId {
        let id = self.ast.push(goal, production, children);
        self.analyze(id);
        id
    }

    /// Seals shader-level bookkeeping once the root has been reduced.
    pub fn accept(&mut self, root: NodeId) {
        if let Some(frame) = self.macros.frames().last() {
            let line = frame.lines.first().cloned().unwrap_or_default();
            let end = self.ast.node(root).range.end;
            self.report_error(
                SourceRange::new(end, end),
                format!("unterminated conditional directive '{line}'"),
            );
        }
        self.symbols.pop_all();
        self.function = None;
        self.ast.set_root(root);
        self.ast.link_parents();
    }

    pub fn finish(self) -> ShaderAnalysis {
        ShaderAnalysis {
            ast: self.ast,
            symbols: self.symbols,
            shader_data: self.shader_data,
            diagnostics: self.diagnostics,
        }
    }
}

/// Result of lexing, parsing and analyzing one pass body. Structurally valid even
/// when `diagnostics` contains errors.
#[derive(Debug)]
pub struct ShaderAnalysis {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub shader_data: ShaderData,
    pub diagnostics: Vec<Diagnostic>,
}

impl ShaderAnalysis {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}
