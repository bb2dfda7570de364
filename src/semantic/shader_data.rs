// src/semantic/shader_data.rs
use super::scope::SymbolId;
use crate::ast::NodeId;

/// Shader-level bookkeeping accumulated while parsing one pass body.
#[derive(Debug, Clone, Default)]
pub struct ShaderData {
    /// `precision ...;` statements in source order.
    pub precisions: Vec<NodeId>,
    /// Directives at global scope (always re-emitted, in source order).
    pub global_macros: Vec<NodeId>,
    pub vertex_entry: Option<SymbolId>,
    pub fragment_entry: Option<SymbolId>,
}
