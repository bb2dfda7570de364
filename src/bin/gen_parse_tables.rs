// src/bin/gen_parse_tables.rs
// Build the LALR(1) tables for the shader grammar and dump them.
// Usage:
//   cargo run --bin gen_parse_tables              # writes into tables/
//   cargo run --bin gen_parse_tables -- /out/dir
//
// Writes parse_tables.json, parse_tables.bin and grammar.bnf. The BNF export is
// re-read with the `bnf` crate as a sanity check.

use std::{env, fs, path::PathBuf, time::Instant};

use anyhow::{Context, Result, anyhow, bail};
use shaderlabc::parser::{
    ParseTables,
    shader_grammar,
    tables::io::{save_tables_bin, save_tables_json},
};

fn main() -> Result<()> {
    let out_dir = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "tables".to_string()));
    fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    println!("[gen_parse_tables] building shader grammar tables…");
    let t0 = Instant::now();
    let tables = ParseTables::build(shader_grammar());
    let n_prods = tables.grammar.productions().len();
    println!(
        "[gen_parse_tables] {} productions, {} states in {:.3} ms",
        n_prods,
        tables.n_states,
        t0.elapsed().as_secs_f64() * 1e3
    );

    for c in &tables.conflicts {
        eprintln!(
            "[gen_parse_tables] conflict in state {} on '{}': kept {:?}, dropped {:?}",
            c.state,
            c.terminal.text(),
            c.kept,
            c.dropped
        );
    }
    let dead: Vec<usize> = tables
        .reducible_productions()
        .iter()
        .enumerate()
        .filter(|(_, ok)| !**ok)
        .map(|(i, _)| i)
        .collect();
    if !dead.is_empty() {
        bail!("productions never reduced: {dead:?}");
    }

    let bnf_text = tables.grammar.to_bnf();
    let parsed: bnf::Grammar = bnf_text
        .parse()
        .map_err(|e| anyhow!("exported BNF does not parse: {e}"))?;
    println!(
        "[gen_parse_tables] BNF export: {} rules",
        parsed.productions_iter().count()
    );

    let bnf_path = out_dir.join("grammar.bnf");
    fs::write(&bnf_path, &bnf_text).with_context(|| format!("failed to write {}", bnf_path.display()))?;
    let json_path = out_dir.join("parse_tables.json");
    save_tables_json(&json_path, &tables).with_context(|| format!("failed to write {}", json_path.display()))?;
    let bin_path = out_dir.join("parse_tables.bin");
    save_tables_bin(&bin_path, &tables).with_context(|| format!("failed to write {}", bin_path.display()))?;

    for p in [&bnf_path, &json_path, &bin_path] {
        println!("[gen_parse_tables] wrote {}", p.display());
    }
    Ok(())
}
