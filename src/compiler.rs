// src/compiler.rs
//! Public entry points: one pass body in, vertex and fragment source out.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    codegen::{self, CompiledPass},
    config::CompileOptions,
    diagnostics::{CompileError, Diagnostic, FatalError, has_errors},
    parser,
    semantic::ShaderAnalysis,
};

/// Output plus every diagnostic of one compilation. `output` must not be used
/// when `diagnostics` contains an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub output: Option<CompiledPass>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileReport {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    pub fn into_result(self) -> Result<CompiledPass, CompileError> {
        let failed = self.has_errors();
        match self.output {
            Some(pass) if !failed => Ok(pass),
            _ => Err(CompileError::Semantic(
                self.diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
            )),
        }
    }
}

/// Lexes, parses and analyzes `source` without generating code.
pub fn analyze(source: &str) -> Result<ShaderAnalysis, FatalError> {
    Ok(parser::parse(source)?.finish())
}

pub fn compile_with_diagnostics(source: &str, options: &CompileOptions) -> Result<CompileReport, FatalError> {
    let mut analysis = analyze(source)?;
    let (output, generated) = codegen::generate(&mut analysis, options);
    let mut diagnostics = std::mem::take(&mut analysis.diagnostics);
    diagnostics.extend(generated);
    log::debug!(
        "[compile] {}: {} diagnostics ({} errors)",
        options.backend,
        diagnostics.len(),
        diagnostics.iter().filter(|d| d.is_error()).count()
    );
    Ok(CompileReport { output, diagnostics })
}

/// Compiles one pass body; any error diagnostic fails the whole compilation.
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompiledPass, CompileError> {
    compile_with_diagnostics(source, options)?.into_result()
}

/// Compiles many pass bodies in parallel; results keep the input order.
pub fn compile_batch<S>(sources: &[S], options: &CompileOptions) -> Vec<Result<CompiledPass, CompileError>>
where
    S: AsRef<str> + Sync,
{
    // Build the shared tables once up front instead of racing on first use.
    parser::shader_tables();
    sources.par_iter().map(|s| compile(s.as_ref(), options)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;

    const PASS: &str = "
struct V { vec2 uv; };
uniform sampler2D tex;
V vert(vec4 position) {
    gl_Position = position;
    return V(position.xy);
}
void frag(V v) {
    gl_FragColor = texture2D(tex, v.uv);
}
";

    #[test]
    fn compile_produces_both_stages() {
        let pass = compile(PASS, &CompileOptions::default()).unwrap();
        assert_eq!(pass.backend, Backend::Glsl300);
        assert!(pass.vertex.starts_with("#version 300 es\n"));
        assert!(pass.vertex.contains("out vec2 uv;"));
        assert!(pass.fragment.contains("in vec2 uv;"));
        assert!(pass.fragment.contains("glFragColor = texture(tex, uv);"));
    }

    #[test]
    fn semantic_errors_fail_compile_but_keep_the_report() {
        let src = PASS.replace("position.xy", "missing.xy");
        let report = compile_with_diagnostics(&src, &CompileOptions::default()).unwrap();
        assert!(report.has_errors());
        assert!(report.output.is_some());
        match compile(&src, &CompileOptions::default()) {
            Err(CompileError::Semantic(errors)) => {
                assert!(errors.iter().any(|e| e.message.contains("missing")));
            }
            other => panic!("expected semantic error, got {other:?}"),
        }
    }

    #[test]
    fn fatal_errors_pass_through() {
        let err = compile("void vert() { @ }", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Fatal(FatalError::Lexical { .. })));
    }

    #[test]
    fn batch_keeps_input_order() {
        let sources = [PASS, "void vert() {", PASS];
        let results = compile_batch(&sources, &CompileOptions::default());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CompileError::Fatal(FatalError::Syntax { .. }))));
        assert_eq!(results[0].as_ref().unwrap(), results[2].as_ref().unwrap());
    }
}
