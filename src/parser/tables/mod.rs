// src/parser/tables/mod.rs
pub mod build;
pub mod first;
pub mod io;

pub use build::LalrBuilder;
pub use first::FirstSets;
pub use io::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json};

use serde::{Deserialize, Serialize};

use super::grammar::{Grammar, N_NONTERMINALS, NonTerminal, ProductionId};
use crate::lexer::{N_KINDS, TokenKind};

pub type StateId = usize;

// used for empty goto cells
pub const NO_STATE: u32 = u32::MAX;

const WORDS: usize = N_KINDS.div_ceil(64);

/// Fixed-size bitset over terminal kinds; iteration order is the `TokenKind` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TerminalSet {
    bits: [u64; WORDS],
}

impl TerminalSet {
    pub fn single(kind: TokenKind) -> Self {
        let mut s = Self::default();
        s.insert(kind);
        s
    }

    /// Returns true when `kind` was not present before.
    pub fn insert(&mut self, kind: TokenKind) -> bool {
        let (w, b) = (kind.idx() / 64, kind.idx() % 64);
        let before = self.bits[w];
        self.bits[w] |= 1 << b;
        before != self.bits[w]
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        let (w, b) = (kind.idx() / 64, kind.idx() % 64);
        self.bits[w] >> b & 1 == 1
    }

    /// In-place union; returns true when the set grew.
    pub fn union_with(&mut self, other: &TerminalSet) -> bool {
        let mut grew = false;
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            let merged = *a | *b;
            grew |= merged != *a;
            *a = merged;
        }
        grew
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenKind> + '_ {
        TokenKind::ALL.iter().copied().filter(|&k| self.contains(k))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Error,
    Shift(u32),
    Reduce(u32),
    Accept,
}

/// A second action proposed for an already filled (state, terminal) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub state: StateId,
    pub terminal: TokenKind,
    pub kept: Action,
    pub dropped: Action,
}

/// Dense action/goto tables plus the grammar they were generated from.
/// Built once and shared read-only between compilations.
#[derive(Debug, Clone)]
pub struct ParseTables {
    pub grammar: Grammar,
    pub n_states: usize,
    pub(crate) action: Vec<Action>, // n_states * N_KINDS row-major
    pub(crate) goto: Vec<u32>,      // n_states * N_NONTERMINALS row-major
    pub conflicts: Vec<Conflict>,
}

impl ParseTables {
    /// Runs the LALR(1) construction over `grammar`.
    pub fn build(grammar: Grammar) -> Self {
        let (n_states, action, goto, conflicts) = LalrBuilder::new(&grammar).build();
        Self {
            grammar,
            n_states,
            action,
            goto,
            conflicts,
        }
    }

    #[inline]
    pub fn action(&self, state: StateId, terminal: TokenKind) -> Action {
        self.action[state * N_KINDS + terminal.idx()]
    }

    #[inline]
    pub fn goto(&self, state: StateId, goal: NonTerminal) -> Option<StateId> {
        match self.goto[state * N_NONTERMINALS + goal.idx()] {
            NO_STATE => None,
            s => Some(s as StateId),
        }
    }

    /// Terminals with a non-error action in `state`; used for syntax error messages.
    pub fn expected_terminals(&self, state: StateId) -> Vec<TokenKind> {
        TokenKind::ALL
            .iter()
            .copied()
            .filter(|&k| self.action(state, k) != Action::Error)
            .collect()
    }

    /// Productions that are a legal reduction (or accept) in at least one state.
    pub fn reducible_productions(&self) -> Vec<bool> {
        let mut seen = vec![false; self.grammar.productions().len()];
        for a in &self.action {
            match *a {
                Action::Reduce(p) => seen[p as usize] = true,
                Action::Accept => seen[0] = true,
                _ => {}
            }
        }
        seen
    }

    pub fn production_len(&self, id: ProductionId) -> usize {
        self.grammar.production(id).derivation.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_union_reports_growth() {
        let mut a = TerminalSet::single(TokenKind::Ident);
        let b = TerminalSet::single(TokenKind::Question);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.len(), 2);
        assert_eq!(
            a.iter().collect::<Vec<_>>(),
            vec![TokenKind::Ident, TokenKind::Question]
        );
        assert!(a.contains(TokenKind::Question));
        assert!(!a.contains(TokenKind::Eof));
    }
}
