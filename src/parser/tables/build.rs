// src/parser/tables/build.rs
// LALR(1) construction: LR(1) item closure with states merged by core items.

use std::{collections::VecDeque, time::Instant};

use hashbrown::HashMap;

use super::{Action, Conflict, FirstSets, NO_STATE, StateId, TerminalSet};
use crate::{
    lexer::{N_KINDS, TokenKind},
    parser::grammar::{Grammar, GrammarSymbol, N_NONTERMINALS, ProductionId},
};

type ItemId = usize;
type CoreKey = Vec<(ProductionId, usize)>;

#[derive(Debug, Clone)]
struct StateItem {
    production: ProductionId,
    position: usize,
    lookahead: TerminalSet,
    // lookahead grew since this item was last propagated
    needs_reinfer: bool,
}

#[derive(Debug)]
struct State {
    core: Vec<ItemId>,
    items: Vec<ItemId>,
    index: HashMap<(ProductionId, usize), ItemId>,
    closured: bool,
    transitions: Vec<(GrammarSymbol, StateId)>,
}

/// Construction context. Owns the item and state arenas; dropped once the
/// tables are extracted.
pub struct LalrBuilder<'g> {
    grammar: &'g Grammar,
    first: FirstSets,
    items: Vec<StateItem>,
    states: Vec<State>,
    cache: HashMap<CoreKey, StateId>,
    worklist: VecDeque<StateId>,
    queued: Vec<bool>,
}

impl<'g> LalrBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            first: FirstSets::compute(grammar),
            items: Vec::new(),
            states: Vec::new(),
            cache: HashMap::new(),
            worklist: VecDeque::new(),
            queued: Vec::new(),
        }
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first
    }

    fn enqueue(&mut self, state: StateId) {
        if !self.queued[state] {
            self.queued[state] = true;
            self.worklist.push_back(state);
        }
    }

    fn new_item(&mut self, production: ProductionId, position: usize, lookahead: TerminalSet) -> ItemId {
        let id = self.items.len();
        self.items.push(StateItem {
            production,
            position,
            lookahead,
            needs_reinfer: true,
        });
        id
    }

    fn new_state(&mut self, key: CoreKey, core: Vec<(ProductionId, usize, TerminalSet)>) -> StateId {
        let id = self.states.len();
        let mut state = State {
            core: Vec::with_capacity(core.len()),
            items: Vec::with_capacity(core.len() * 4),
            index: HashMap::new(),
            closured: false,
            transitions: Vec::new(),
        };
        for (prod, pos, la) in core {
            let item = self.new_item(prod, pos, la);
            state.core.push(item);
            state.items.push(item);
            state.index.insert((prod, pos), item);
        }
        self.states.push(state);
        self.queued.push(false);
        self.cache.insert(key, id);
        self.enqueue(id);
        id
    }

    /// Propagates lookaheads of every item flagged `needs_reinfer` into the
    /// closure items of the same state, creating closure items on first sight.
    fn close(&mut self, state: StateId) {
        let mut pending: Vec<ItemId> = self.states[state]
            .items
            .iter()
            .copied()
            .filter(|&it| self.items[it].needs_reinfer)
            .collect();

        while let Some(it) = pending.pop() {
            self.items[it].needs_reinfer = false;
            let StateItem {
                production,
                position,
                lookahead,
                ..
            } = self.items[it].clone();
            let derivation = &self.grammar.production(production).derivation;
            let Some(GrammarSymbol::NonTerminal(next)) = derivation.get(position).copied() else {
                continue;
            };

            let (mut propagated, nullable) = self.first.of_sequence(&derivation[position + 1..]);
            if nullable {
                propagated.union_with(&lookahead);
            }

            for &pid in self.grammar.productions_of(next) {
                match self.states[state].index.get(&(pid, 0)).copied() {
                    Some(existing) => {
                        let item = &mut self.items[existing];
                        if item.lookahead.union_with(&propagated) && !item.needs_reinfer {
                            item.needs_reinfer = true;
                            pending.push(existing);
                        }
                    }
                    None => {
                        let created = self.new_item(pid, 0, propagated);
                        let s = &mut self.states[state];
                        s.items.push(created);
                        s.index.insert((pid, 0), created);
                        pending.push(created);
                    }
                }
            }
        }
        self.states[state].closured = true;
    }

    /// Computes successor states by advancing the dot over each distinct next symbol.
    /// Existing states with the same core absorb the new lookaheads instead.
    fn advance(&mut self, state: StateId) {
        let mut groups: Vec<(GrammarSymbol, Vec<(ProductionId, usize, TerminalSet)>)> = Vec::new();
        for &it in &self.states[state].items {
            let item = &self.items[it];
            let derivation = &self.grammar.production(item.production).derivation;
            let Some(&sym) = derivation.get(item.position) else {
                continue;
            };
            let advanced = (item.production, item.position + 1, item.lookahead);
            match groups.iter_mut().find(|(s, _)| *s == sym) {
                Some((_, list)) => list.push(advanced),
                None => groups.push((sym, vec![advanced])),
            }
        }

        let mut transitions = Vec::with_capacity(groups.len());
        for (sym, core) in groups {
            let mut key: CoreKey = core.iter().map(|(p, pos, _)| (*p, *pos)).collect();
            key.sort_unstable();

            let target = match self.cache.get(&key).copied() {
                Some(target) => {
                    let mut grew = false;
                    for (prod, pos, la) in &core {
                        let it = self.states[target].index[&(*prod, *pos)];
                        let item = &mut self.items[it];
                        if item.lookahead.union_with(la) {
                            item.needs_reinfer = true;
                            grew = true;
                        }
                    }
                    if grew || !self.states[target].closured {
                        self.enqueue(target);
                    }
                    target
                }
                None => self.new_state(key, core),
            };
            transitions.push((sym, target));
        }
        self.states[state].transitions = transitions;
    }

    /// Explores the state space to a fixpoint and emits dense tables.
    pub fn build(mut self) -> (usize, Vec<Action>, Vec<u32>, Vec<Conflict>) {
        let t0 = Instant::now();
        let start_key = vec![(0, 0)];
        self.new_state(start_key, vec![(0, 0, TerminalSet::single(TokenKind::Eof))]);

        let mut rounds = 0usize;
        while let Some(state) = self.worklist.pop_front() {
            self.queued[state] = false;
            self.close(state);
            self.advance(state);
            rounds += 1;
        }

        let (action, goto, conflicts) = self.populate();
        log::info!(
            "[lalr] {} productions -> {} states, {} items ({} closure rounds) in {} ms",
            self.grammar.productions().len(),
            self.states.len(),
            self.items.len(),
            rounds,
            t0.elapsed().as_millis()
        );

        #[cfg(feature = "table-debug")]
        for (id, s) in self.states.iter().enumerate() {
            log::trace!("[lalr] state {id}");
            for &it in &s.items {
                let item = &self.items[it];
                let la: Vec<&str> = item.lookahead.iter().map(|k| k.text()).collect();
                log::trace!(
                    "    {} @{} {:?}",
                    self.grammar.production(item.production),
                    item.position,
                    la
                );
            }
        }

        (self.states.len(), action, goto, conflicts)
    }

    fn populate(&self) -> (Vec<Action>, Vec<u32>, Vec<Conflict>) {
        let n_states = self.states.len();
        let mut action = vec![Action::Error; n_states * N_KINDS];
        let mut goto = vec![NO_STATE; n_states * N_NONTERMINALS];
        let mut conflicts = Vec::new();

        for (sid, state) in self.states.iter().enumerate() {
            // Shifts are registered first so they are the "existing" action in
            // a dangling-else conflict.
            for &(sym, target) in &state.transitions {
                match sym {
                    GrammarSymbol::Terminal(k) => register(
                        &mut action,
                        &mut conflicts,
                        sid,
                        k,
                        Action::Shift(target as u32),
                    ),
                    GrammarSymbol::NonTerminal(n) => {
                        goto[sid * N_NONTERMINALS + n.idx()] = target as u32;
                    }
                }
            }
            for &it in &state.items {
                let item = &self.items[it];
                let len = self.grammar.production(item.production).derivation.len();
                if item.position < len {
                    continue;
                }
                if item.production == 0 {
                    register(&mut action, &mut conflicts, sid, TokenKind::Eof, Action::Accept);
                    continue;
                }
                for k in item.lookahead.iter() {
                    register(
                        &mut action,
                        &mut conflicts,
                        sid,
                        k,
                        Action::Reduce(item.production as u32),
                    );
                }
            }
        }

        for c in &conflicts {
            log::warn!(
                "[lalr] conflict in state {} on {:?}: kept {:?}, dropped {:?}",
                c.state,
                c.terminal.text(),
                c.kept,
                c.dropped
            );
        }
        (action, goto, conflicts)
    }
}

fn register(
    action: &mut [Action],
    conflicts: &mut Vec<Conflict>,
    state: StateId,
    terminal: TokenKind,
    proposed: Action,
) {
    let cell = &mut action[state * N_KINDS + terminal.idx()];
    let existing = *cell;
    if existing == Action::Error || existing == proposed {
        *cell = proposed;
        return;
    }

    // Dangling else: the shift registered first wins without a report.
    if terminal == TokenKind::Else
        && matches!(
            (existing, proposed),
            (Action::Shift(_), Action::Reduce(_)) | (Action::Reduce(_), Action::Shift(_))
        )
    {
        if let Action::Shift(_) = proposed {
            *cell = proposed;
        }
        return;
    }

    let kept = match (existing, proposed) {
        (Action::Shift(_), _) | (Action::Accept, _) => existing,
        (_, Action::Shift(_)) | (_, Action::Accept) => proposed,
        (Action::Reduce(a), Action::Reduce(b)) => Action::Reduce(a.min(b)),
        _ => existing,
    };
    let dropped = if kept == existing { proposed } else { existing };
    *cell = kept;
    conflicts.push(Conflict {
        state,
        terminal,
        kept,
        dropped,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{
        grammar::NonTerminal,
        tables::ParseTables,
    };
    use NonTerminal as N;
    use TokenKind as T;

    fn t(k: TokenKind) -> GrammarSymbol {
        GrammarSymbol::Terminal(k)
    }
    fn n(nt: NonTerminal) -> GrammarSymbol {
        GrammarSymbol::NonTerminal(nt)
    }

    /// Table-only recognizer: true when `input` (without EOF) is accepted.
    fn recognizes(tables: &ParseTables, input: &[TokenKind]) -> bool {
        let mut states = vec![0usize];
        let mut pos = 0;
        loop {
            let la = input.get(pos).copied().unwrap_or(T::Eof);
            let top = *states.last().unwrap();
            match tables.action(top, la) {
                Action::Shift(s) => {
                    states.push(s as usize);
                    pos += 1;
                }
                Action::Reduce(p) => {
                    let prod = tables.grammar.production(p as usize);
                    for _ in 0..prod.derivation.len() {
                        states.pop();
                    }
                    let top = *states.last().unwrap();
                    match tables.goto(top, prod.goal) {
                        Some(s) => states.push(s),
                        None => return false,
                    }
                }
                Action::Accept => return true,
                Action::Error => return false,
            }
        }
    }

    fn expression_grammar() -> Grammar {
        // E -> E + T | T ; T -> T * F | F ; F -> ( E ) | id
        Grammar::new(
            N::Expression,
            vec![
                (N::Expression, vec![n(N::Expression), t(T::Plus), n(N::AdditiveExpression)]),
                (N::Expression, vec![n(N::AdditiveExpression)]),
                (
                    N::AdditiveExpression,
                    vec![n(N::AdditiveExpression), t(T::Star), n(N::PrimaryExpression)],
                ),
                (N::AdditiveExpression, vec![n(N::PrimaryExpression)]),
                (
                    N::PrimaryExpression,
                    vec![t(T::LeftParen), n(N::Expression), t(T::RightParen)],
                ),
                (N::PrimaryExpression, vec![t(T::Ident)]),
            ],
        )
    }

    #[test]
    fn expression_grammar_is_conflict_free() {
        let tables = ParseTables::build(expression_grammar());
        assert!(tables.conflicts.is_empty(), "{:?}", tables.conflicts);
        assert!(recognizes(&tables, &[T::Ident, T::Plus, T::Ident, T::Star, T::Ident]));
        assert!(recognizes(
            &tables,
            &[T::LeftParen, T::Ident, T::Plus, T::Ident, T::RightParen, T::Star, T::Ident]
        ));
        assert!(!recognizes(&tables, &[T::Ident, T::Plus]));
        assert!(!recognizes(&tables, &[T::LeftParen, T::Ident]));
    }

    #[test]
    fn lalr_but_not_slr_grammar() {
        // S -> L = R | R ; L -> * R | id ; R -> L
        let g = Grammar::new(
            N::Statement,
            vec![
                (N::Statement, vec![n(N::UnaryExpression), t(T::Equal), n(N::Expression)]),
                (N::Statement, vec![n(N::Expression)]),
                (N::UnaryExpression, vec![t(T::Star), n(N::Expression)]),
                (N::UnaryExpression, vec![t(T::Ident)]),
                (N::Expression, vec![n(N::UnaryExpression)]),
            ],
        );
        let tables = ParseTables::build(g);
        assert!(tables.conflicts.is_empty(), "{:?}", tables.conflicts);
        assert!(recognizes(&tables, &[T::Star, T::Ident, T::Equal, T::Ident]));
        assert!(recognizes(&tables, &[T::Ident]));
        assert!(!recognizes(&tables, &[T::Ident, T::Equal]));
    }

    #[test]
    fn core_merging_exposes_reduce_reduce_conflict() {
        // LR(1) but not LALR(1):
        // S -> a A d | b B d | a B e | b A e ; A -> c ; B -> c
        let (a, b, c, d, e) = (T::Plus, T::Dash, T::Ident, T::Semicolon, T::Comma);
        let g = Grammar::new(
            N::Statement,
            vec![
                (N::Statement, vec![t(a), n(N::Expression), t(d)]),
                (N::Statement, vec![t(b), n(N::Initializer), t(d)]),
                (N::Statement, vec![t(a), n(N::Initializer), t(e)]),
                (N::Statement, vec![t(b), n(N::Expression), t(e)]),
                (N::Expression, vec![t(c)]),
                (N::Initializer, vec![t(c)]),
            ],
        );
        let tables = ParseTables::build(g);
        assert!(!tables.conflicts.is_empty());
        assert!(
            tables
                .conflicts
                .iter()
                .all(|c| matches!((c.kept, c.dropped), (Action::Reduce(5), Action::Reduce(6))))
        );
    }

    #[test]
    fn dangling_else_prefers_shift_silently() {
        // S -> if ( id ) S | if ( id ) S else S | ;
        let g = Grammar::new(
            N::Statement,
            vec![
                (
                    N::Statement,
                    vec![t(T::If), t(T::LeftParen), t(T::Ident), t(T::RightParen), n(N::Statement)],
                ),
                (
                    N::Statement,
                    vec![
                        t(T::If),
                        t(T::LeftParen),
                        t(T::Ident),
                        t(T::RightParen),
                        n(N::Statement),
                        t(T::Else),
                        n(N::Statement),
                    ],
                ),
                (N::Statement, vec![t(T::Semicolon)]),
            ],
        );
        let tables = ParseTables::build(g);
        assert!(tables.conflicts.is_empty());
        let shifted_else = (0..tables.n_states)
            .filter(|&s| matches!(tables.action(s, T::Else), Action::Shift(_)))
            .count();
        assert!(shifted_else > 0);
        assert!(recognizes(
            &tables,
            &[
                T::If, T::LeftParen, T::Ident, T::RightParen, T::If, T::LeftParen, T::Ident,
                T::RightParen, T::Semicolon, T::Else, T::Semicolon
            ]
        ));
    }

    #[test]
    fn nullable_tail_inherits_item_lookahead() {
        // S -> A id ; A -> ε | +
        let g = Grammar::new(
            N::Statement,
            vec![
                (N::Statement, vec![n(N::Expression), t(T::Ident)]),
                (N::Expression, vec![]),
                (N::Expression, vec![t(T::Plus)]),
            ],
        );
        let tables = ParseTables::build(g);
        assert!(tables.conflicts.is_empty());
        assert!(recognizes(&tables, &[T::Ident]));
        assert!(recognizes(&tables, &[T::Plus, T::Ident]));
        assert!(!recognizes(&tables, &[T::Plus]));
    }

    #[test]
    fn every_production_is_reducible() {
        let tables = ParseTables::build(expression_grammar());
        assert!(tables.reducible_productions().iter().all(|&r| r));
    }
}
