// src/lib.rs
//! ShaderLab-style kernel compiler: pass bodies in, GLSL ES vertex and fragment
//! source out.

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod dev;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod semantic;

pub use codegen::CompiledPass;
pub use compiler::{CompileReport, analyze, compile, compile_batch, compile_with_diagnostics};
pub use config::{Backend, CompileOptions};
pub use diagnostics::{CompileError, Diagnostic, FatalError, Severity, SourceRange};
pub use semantic::ShaderAnalysis;
