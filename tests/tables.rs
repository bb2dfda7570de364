//! Properties of the compiled shader grammar tables.

use shaderlabc::parser::{
    Action,
    ParseTables,
    shader_grammar,
    shader_tables,
    tables::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json},
};

#[test]
fn shader_grammar_has_no_conflicts() {
    let t = shader_tables();
    assert!(t.conflicts.is_empty(), "conflicts: {:?}", t.conflicts);
    assert!(t.n_states > 100);
}

#[test]
fn every_production_is_reducible_somewhere() {
    let t = shader_tables();
    let dead: Vec<usize> = t
        .reducible_productions()
        .iter()
        .enumerate()
        .filter(|(_, ok)| !**ok)
        .map(|(i, _)| i)
        .collect();
    assert!(dead.is_empty(), "dead productions: {dead:?}");
}

#[test]
fn state_zero_accepts_nothing_but_starts() {
    let t = shader_tables();
    let expected = t.expected_terminals(0);
    assert!(!expected.is_empty());
    assert!(expected.iter().all(|&k| !matches!(t.action(0, k), Action::Accept)));
}

#[test]
fn construction_is_deterministic() {
    let a = ParseTables::build(shader_grammar());
    let b = shader_tables();
    assert_eq!(a.n_states, b.n_states);
    for s in 0..a.n_states {
        for k in a.expected_terminals(s) {
            assert_eq!(a.action(s, k), b.action(s, k));
        }
    }
}

#[test]
fn tables_survive_disk_round_trip() {
    let t = shader_tables();
    let dir = std::env::temp_dir().join(format!("shaderlabc-tables-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let json = dir.join("parse_tables.json");
    save_tables_json(&json, t).unwrap();
    let back = load_tables_json_bytes(&std::fs::read(&json).unwrap(), shader_grammar()).unwrap();
    assert_eq!(back.n_states, t.n_states);

    let bin = dir.join("parse_tables.bin");
    save_tables_bin(&bin, t).unwrap();
    let back = load_tables_bin_bytes(&std::fs::read(&bin).unwrap(), shader_grammar()).unwrap();
    assert_eq!(back.n_states, t.n_states);
    assert_eq!(back.expected_terminals(0), t.expected_terminals(0));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn exported_bnf_parses() {
    let text = shader_grammar().to_bnf();
    let parsed: bnf::Grammar = text.parse().expect("grammar export is valid BNF");
    assert!(parsed.productions_iter().count() > 50);
}
