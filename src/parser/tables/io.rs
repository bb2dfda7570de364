// src/parser/tables/io.rs
use std::{
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use serde::{Deserialize, Serialize};

use super::{Action, Conflict, NO_STATE, ParseTables};
use crate::{
    lexer::N_KINDS,
    parser::grammar::{Grammar, N_NONTERMINALS},
};

fn invalid(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

/// Header check shared by both formats: a table set only makes sense for the
/// exact terminal, nonterminal and production numbering it was built against.
fn check_shape(
    grammar: &Grammar,
    n_kinds: usize,
    n_nonterminals: usize,
    n_productions: usize,
) -> Result<(), String> {
    if n_kinds != N_KINDS {
        return Err(format!("tables built for {n_kinds} token kinds, compiler has {N_KINDS}"));
    }
    if n_nonterminals != N_NONTERMINALS {
        return Err(format!(
            "tables built for {n_nonterminals} nonterminals, compiler has {N_NONTERMINALS}"
        ));
    }
    let have = grammar.productions().len();
    if n_productions != have {
        return Err(format!("tables built for {n_productions} productions, grammar has {have}"));
    }
    Ok(())
}

// -------------------- JSON (de)serialization --------------------

#[derive(Serialize, Deserialize)]
struct ParseTablesDisk {
    n_states: usize,
    n_kinds: usize,
    n_nonterminals: usize,
    n_productions: usize,
    action: Vec<Action>,
    goto: Vec<u32>,
    conflicts: Vec<Conflict>,
}

impl From<&ParseTables> for ParseTablesDisk {
    fn from(t: &ParseTables) -> Self {
        Self {
            n_states: t.n_states,
            n_kinds: N_KINDS,
            n_nonterminals: N_NONTERMINALS,
            n_productions: t.grammar.productions().len(),
            action: t.action.clone(),
            goto: t.goto.clone(),
            conflicts: t.conflicts.clone(),
        }
    }
}

impl ParseTablesDisk {
    fn into_tables(self, grammar: Grammar) -> Result<ParseTables, String> {
        check_shape(&grammar, self.n_kinds, self.n_nonterminals, self.n_productions)?;
        if self.action.len() != self.n_states * N_KINDS {
            return Err("action table length does not match n_states".into());
        }
        if self.goto.len() != self.n_states * N_NONTERMINALS {
            return Err("goto table length does not match n_states".into());
        }
        Ok(ParseTables {
            grammar,
            n_states: self.n_states,
            action: self.action,
            goto: self.goto,
            conflicts: self.conflicts,
        })
    }
}

pub fn save_tables_json(path: &Path, t: &ParseTables) -> std::io::Result<()> {
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &ParseTablesDisk::from(t))?;
    w.flush()
}

pub fn load_tables_json_bytes(data: &[u8], grammar: Grammar) -> Result<ParseTables, String> {
    serde_json::from_slice::<ParseTablesDisk>(data)
        .map_err(|e| format!("Failed to parse tables JSON: {e}"))?
        .into_tables(grammar)
}

// -------------------- Compact binary --------------------
//
// header: magic, n_states, n_kinds, n_nonterminals, n_productions (u32 LE)
// action: n_states * n_kinds u32, low 2 bits tag (0 error, 1 shift, 2 reduce, 3 accept)
// goto:   n_states * n_nonterminals u32, NO_STATE for empty cells
//
// Conflicts are not persisted; a table set with conflicts is never written.

const BIN_MAGIC: &[u8; 8] = b"SLTBLE01";
const TAG_BITS: u32 = 2;

fn pack_action(a: Action) -> std::io::Result<u32> {
    let (tag, payload) = match a {
        Action::Error => (0, 0),
        Action::Shift(s) => (1, s),
        Action::Reduce(p) => (2, p),
        Action::Accept => (3, 0),
    };
    if payload >= 1 << (32 - TAG_BITS) {
        return Err(invalid(format!("action payload {payload} does not fit in 30 bits")));
    }
    Ok(payload << TAG_BITS | tag)
}

fn unpack_action(v: u32) -> Action {
    let payload = v >> TAG_BITS;
    match v & ((1 << TAG_BITS) - 1) {
        1 => Action::Shift(payload),
        2 => Action::Reduce(payload),
        3 => Action::Accept,
        _ => Action::Error,
    }
}

pub fn save_tables_bin(path: &Path, t: &ParseTables) -> std::io::Result<()> {
    let instant = Instant::now();
    if !t.conflicts.is_empty() {
        return Err(invalid(format!(
            "refusing to write tables with {} unresolved conflicts",
            t.conflicts.len()
        )));
    }

    let f = std::fs::File::create(path)?;
    let header = 8 + 4 * 4;
    let total_len = header + (t.action.len() + t.goto.len()) * 4;
    let _ = f.set_len(total_len as u64);
    let mut w = BufWriter::new(f);

    w.write_all(BIN_MAGIC)?;
    for v in [
        t.n_states,
        N_KINDS,
        N_NONTERMINALS,
        t.grammar.productions().len(),
    ] {
        let v = u32::try_from(v).map_err(|_| invalid("header field exceeds u32"))?;
        w.write_all(&v.to_le_bytes())?;
    }

    let mut bytes = Vec::with_capacity(t.action.len() * 4);
    for &a in &t.action {
        bytes.extend_from_slice(&pack_action(a)?.to_le_bytes());
    }
    w.write_all(&bytes)?;

    bytes.clear();
    for &g in &t.goto {
        bytes.extend_from_slice(&g.to_le_bytes());
    }
    w.write_all(&bytes)?;

    let flush = w.flush();
    log::info!(
        "[tables] saved {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

pub fn load_tables_bin_bytes(mut data: &[u8], grammar: Grammar) -> Result<ParseTables, String> {
    if data.len() < 8 + 4 * 4 {
        return Err("bin too short".into());
    }
    if &data[..8] != BIN_MAGIC {
        return Err("bad magic in tables .bin".into());
    }
    data = &data[8..];

    let read_u32 = |buf: &mut &[u8]| -> Result<u32, String> {
        if buf.len() < 4 {
            return Err("truncated u32".into());
        }
        let mut le = [0u8; 4];
        le.copy_from_slice(&buf[..4]);
        *buf = &buf[4..];
        Ok(u32::from_le_bytes(le))
    };

    let n_states = read_u32(&mut data)? as usize;
    let n_kinds = read_u32(&mut data)? as usize;
    let n_nonterminals = read_u32(&mut data)? as usize;
    let n_productions = read_u32(&mut data)? as usize;
    check_shape(&grammar, n_kinds, n_nonterminals, n_productions)?;

    let n_action = n_states.checked_mul(N_KINDS).ok_or("action size overflow")?;
    let mut action = Vec::with_capacity(n_action);
    for _ in 0..n_action {
        let a = unpack_action(read_u32(&mut data)?);
        match a {
            Action::Shift(s) if s as usize >= n_states => {
                return Err(format!("shift target {s} out of range"));
            }
            Action::Reduce(p) if p as usize >= n_productions => {
                return Err(format!("reduce production {p} out of range"));
            }
            _ => {}
        }
        action.push(a);
    }

    let n_goto = n_states.checked_mul(N_NONTERMINALS).ok_or("goto size overflow")?;
    let mut goto = Vec::with_capacity(n_goto);
    for _ in 0..n_goto {
        let g = read_u32(&mut data)?;
        if g != NO_STATE && g as usize >= n_states {
            return Err(format!("goto target {g} out of range"));
        }
        goto.push(g);
    }
    if !data.is_empty() {
        return Err(format!("{} trailing bytes after goto table", data.len()));
    }

    Ok(ParseTables {
        grammar,
        n_states,
        action,
        goto,
        conflicts: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::shader_grammar::shader_grammar;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("shaderlabc-{}-{name}", std::process::id()))
    }

    #[test]
    fn action_packing_keeps_tag_and_payload() {
        for a in [
            Action::Error,
            Action::Shift(0),
            Action::Shift(12345),
            Action::Reduce(7),
            Action::Accept,
        ] {
            assert_eq!(unpack_action(pack_action(a).unwrap()), a);
        }
        assert!(pack_action(Action::Shift(u32::MAX)).is_err());
    }

    #[test]
    fn binary_tables_reload_identically() {
        let tables = crate::parser::shader_tables();
        let path = temp_path("tables.bin");
        save_tables_bin(&path, tables).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let loaded = load_tables_bin_bytes(&bytes, shader_grammar()).unwrap();
        assert_eq!(loaded.n_states, tables.n_states);
        assert_eq!(loaded.action, tables.action);
        assert_eq!(loaded.goto, tables.goto);
    }

    #[test]
    fn json_tables_reload_identically() {
        let tables = crate::parser::shader_tables();
        let path = temp_path("tables.json");
        save_tables_json(&path, tables).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let loaded = load_tables_json_bytes(&bytes, shader_grammar()).unwrap();
        assert_eq!(loaded.action, tables.action);
        assert_eq!(loaded.goto, tables.goto);
    }

    #[test]
    fn mismatched_grammar_is_rejected() {
        let tables = crate::parser::shader_tables();
        let path = temp_path("mismatch.bin");
        save_tables_bin(&path, tables).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let tiny = Grammar::new(crate::parser::grammar::NonTerminal::Program, vec![]);
        let err = load_tables_bin_bytes(&bytes, tiny).unwrap_err();
        assert!(err.contains("productions"), "{err}");

        let mut corrupt = bytes.clone();
        corrupt[0] = b'X';
        assert!(load_tables_bin_bytes(&corrupt, shader_grammar()).is_err());
        assert!(load_tables_bin_bytes(&bytes[..bytes.len() - 1], shader_grammar()).is_err());
    }
}
