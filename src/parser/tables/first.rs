// src/parser/tables/first.rs
// FIRST sets and nullability per nonterminal.

use super::TerminalSet;
use crate::parser::grammar::{Grammar, GrammarSymbol, N_NONTERMINALS, NonTerminal};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug, Clone)]
pub struct FirstSets {
    first: Vec<TerminalSet>,
    nullable: Vec<bool>,
}

impl FirstSets {
    /// A nonterminal re-entered while it is still being computed contributes its
    /// partial set instead of recursing; passes repeat until no set changes, which
    /// completes whatever the partial sets missed.
    pub fn compute(grammar: &Grammar) -> Self {
        let mut sets = Self {
            first: vec![TerminalSet::default(); N_NONTERMINALS],
            nullable: vec![false; N_NONTERMINALS],
        };
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            let mut visit = vec![Visit::Unvisited; N_NONTERMINALS];
            for nt in grammar.nonterminals() {
                sets.visit(grammar, nt, &mut visit, &mut changed);
            }
            if !changed {
                break;
            }
        }
        log::debug!("[first] converged after {passes} passes");
        sets
    }

    fn visit(&mut self, grammar: &Grammar, nt: NonTerminal, visit: &mut [Visit], changed: &mut bool) {
        if visit[nt.idx()] != Visit::Unvisited {
            return;
        }
        visit[nt.idx()] = Visit::InProgress;

        for &pid in grammar.productions_of(nt) {
            let mut all_nullable = true;
            for sym in &grammar.production(pid).derivation {
                match *sym {
                    GrammarSymbol::Terminal(t) => {
                        *changed |= self.first[nt.idx()].insert(t);
                        all_nullable = false;
                        break;
                    }
                    GrammarSymbol::NonTerminal(m) => {
                        self.visit(grammar, m, visit, changed);
                        let fm = self.first[m.idx()];
                        *changed |= self.first[nt.idx()].union_with(&fm);
                        if !self.nullable[m.idx()] {
                            all_nullable = false;
                            break;
                        }
                    }
                }
            }
            if all_nullable && !self.nullable[nt.idx()] {
                self.nullable[nt.idx()] = true;
                *changed = true;
            }
        }

        visit[nt.idx()] = Visit::Done;
    }

    pub fn of_nonterminal(&self, nt: NonTerminal) -> &TerminalSet {
        &self.first[nt.idx()]
    }

    pub fn is_nullable(&self, nt: NonTerminal) -> bool {
        self.nullable[nt.idx()]
    }

    /// FIRST of a symbol sequence and whether the whole sequence can derive ε.
    pub fn of_sequence(&self, seq: &[GrammarSymbol]) -> (TerminalSet, bool) {
        let mut out = TerminalSet::default();
        for sym in seq {
            match *sym {
                GrammarSymbol::Terminal(t) => {
                    out.insert(t);
                    return (out, false);
                }
                GrammarSymbol::NonTerminal(n) => {
                    out.union_with(&self.first[n.idx()]);
                    if !self.nullable[n.idx()] {
                        return (out, false);
                    }
                }
            }
        }
        (out, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;
    use NonTerminal as N;
    use TokenKind as T;

    fn t(k: TokenKind) -> GrammarSymbol {
        GrammarSymbol::Terminal(k)
    }
    fn n(nt: NonTerminal) -> GrammarSymbol {
        GrammarSymbol::NonTerminal(nt)
    }

    #[test]
    fn nullable_prefix_propagates() {
        // expression -> statement IDENTIFIER ; statement -> ε | ';'
        let g = Grammar::new(
            N::Expression,
            vec![
                (N::Expression, vec![n(N::Statement), t(T::Ident)]),
                (N::Statement, vec![]),
                (N::Statement, vec![t(T::Semicolon)]),
            ],
        );
        let f = FirstSets::compute(&g);
        assert!(f.is_nullable(N::Statement));
        assert!(!f.is_nullable(N::Expression));
        let first: Vec<_> = f.of_nonterminal(N::Expression).iter().collect();
        assert_eq!(first, vec![T::Ident, T::Semicolon]);
    }

    #[test]
    fn mutual_recursion_reaches_fixpoint() {
        // expression -> statement | '?' ; statement -> expression
        let g = Grammar::new(
            N::Expression,
            vec![
                (N::Expression, vec![n(N::Statement)]),
                (N::Expression, vec![t(T::Question)]),
                (N::Statement, vec![n(N::Expression)]),
            ],
        );
        let f = FirstSets::compute(&g);
        assert!(f.of_nonterminal(N::Statement).contains(T::Question));
        assert!(f.of_nonterminal(N::Start).contains(T::Question));
    }
}
