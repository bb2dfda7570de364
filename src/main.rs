// src/main.rs
// Compile one pass body and print both stages.
// Usage:
//   shaderlabc <file> [vertex-entry] [fragment-entry] [--json]
// Backend comes from SHADERLAB_BACKEND (glsl100 | glsl300, default glsl300).

use std::{env, fs};

use anyhow::{Context, Result, bail};
use shaderlabc::{CompileOptions, compile_with_diagnostics};

fn main() -> Result<()> {
    let mut json = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            _ => positional.push(arg),
        }
    }
    let Some(path) = positional.first() else {
        bail!("usage: shaderlabc <file> [vertex-entry] [fragment-entry] [--json]");
    };

    let mut options = CompileOptions::from_env();
    if let Some(v) = positional.get(1) {
        options.vertex_entry = v.clone();
    }
    if let Some(f) = positional.get(2) {
        options.fragment_entry = f.clone();
    }

    let source = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let report = match compile_with_diagnostics(&source, &options) {
        Ok(report) => report,
        Err(fatal) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&fatal)?);
            }
            bail!("{path}: {fatal}");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for d in &report.diagnostics {
            eprintln!("{path}: {d}");
        }
        if let (Some(pass), false) = (&report.output, report.has_errors()) {
            println!("// ---- vertex ({}) ----", pass.backend);
            println!("{}", pass.vertex);
            println!("// ---- fragment ({}) ----", pass.backend);
            println!("{}", pass.fragment);
        }
    }
    if report.has_errors() {
        bail!("{path}: compilation failed");
    }
    Ok(())
}
