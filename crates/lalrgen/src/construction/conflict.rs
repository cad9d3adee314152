//! Conflict detection and resolution.
//!
//! A conflict on a terminal is settled by the first applicable rule:
//! resolution hints, then operator precedence, then the fallback policy
//! which prefers shifting and otherwise the first-declared production.

use super::{Builder, LRItemID};
use crate::{
    automaton::{ConflictResolver, ParserAction, StateID},
    diagnostics::GrammarErrorLevel,
    grammar::{SymbolID, TerminalID, TerminalSet},
    hint::GrammarHint,
    util::join,
};

impl Builder<'_> {
    pub(super) fn compute_and_resolve_conflicts(&mut self) {
        let mut conflicted_states = 0;
        for index in 0..self.states.len() {
            if !self.states[index].is_inadequate() {
                continue;
            }
            let state = StateID::from_index(index);
            self.detect_conflicts(state);
            if self.state(state).conflicts.is_empty() {
                continue;
            }
            conflicted_states += 1;

            let conflicts: Vec<TerminalID> = self.state(state).conflicts.iter().collect();
            for &conflict in &conflicts {
                self.resolve_conflict_by_hints(state, conflict);
            }
            self.settle_resolved_conflicts(state);

            for &conflict in &conflicts {
                if self.state(state).conflicts.contains(conflict) {
                    self.resolve_conflict_by_precedence(state, conflict);
                }
            }
            self.settle_resolved_conflicts(state);

            if !self.state(state).conflicts.is_empty() {
                self.report_and_create_default_actions(state);
            }
        }
        tracing::trace!(conflicted_states, "resolved conflicts");
    }

    /// Terminals that are the lookahead of more than one reduce item, or of a
    /// reduce item and a shift at once.
    fn detect_conflicts(&mut self, state: StateID) {
        let data = self.state(state);
        let mut seen = TerminalSet::default();
        let mut conflicts = TerminalSet::default();
        for &item in &data.reduce_items {
            for lookahead in self.item(item).lookaheads.iter() {
                if !seen.insert(lookahead) {
                    conflicts.insert(lookahead);
                }
            }
        }
        for terminal in data.shift_terminals.iter() {
            if seen.contains(terminal) {
                conflicts.insert(terminal);
            }
        }
        self.state_mut(state).conflicts = conflicts;
    }

    fn settle_resolved_conflicts(&mut self, state: StateID) {
        let data = self.state_mut(state);
        data.conflicts.difference_with(&data.resolved_conflicts);
    }

    fn reduce_items_by_lookahead(&self, state: StateID, lookahead: TerminalID) -> Vec<LRItemID> {
        self.state(state)
            .reduce_items
            .iter()
            .copied()
            .filter(|&item| self.item(item).lookaheads.contains(lookahead))
            .collect()
    }

    fn shift_items_by_current(&self, state: StateID, terminal: TerminalID) -> Vec<LRItemID> {
        let current = Some(SymbolID::T(terminal));
        self.state(state)
            .shift_items
            .iter()
            .copied()
            .filter(|&item| self.core(item).current == current)
            .collect()
    }

    fn any_has_hint(&self, items: &[LRItemID], pred: impl Fn(&GrammarHint) -> bool + Copy) -> bool {
        items.iter().any(|&item| self.core(item).has_hint(pred))
    }

    fn resolve_with(&mut self, state: StateID, conflict: TerminalID, action: Option<ParserAction>) {
        let data = self.state_mut(state);
        if let Some(action) = action {
            data.actions.insert(conflict, action);
        }
        data.resolved_conflicts.insert(conflict);
    }

    fn resolve_conflict_by_hints(&mut self, state: StateID, conflict: TerminalID) {
        let reduce_items = self.reduce_items_by_lookahead(state, conflict);
        for &item in &reduce_items {
            let core = self.core(item);
            if core.has_hint(|h| matches!(h, GrammarHint::ResolveToReduce)) {
                let action = ParserAction::Reduce(core.production);
                self.resolve_with(state, conflict, Some(action));
                return;
            }
        }

        let shift_items = self.shift_items_by_current(state, conflict);
        if self.any_has_hint(&shift_items, |h| matches!(h, GrammarHint::ResolveToShift)) {
            // The shift action is already in place.
            self.resolve_with(state, conflict, None);
            return;
        }

        let Some(&first_reduce) = reduce_items.first() else {
            return;
        };
        let reduce = self.core(first_reduce).production;
        let shift = self
            .state(state)
            .actions
            .get(&conflict)
            .and_then(ParserAction::shift_target);

        let candidates: Vec<LRItemID> = shift_items.into_iter().chain(reduce_items).collect();
        if self.any_has_hint(&candidates, |h| matches!(h, GrammarHint::ResolveInCode)) {
            let resolver = ConflictResolver::Grammar(self.grammar.on_conflict.clone());
            self.resolve_with(
                state,
                conflict,
                Some(ParserAction::Code {
                    shift,
                    reduce,
                    resolver,
                }),
            );
            return;
        }

        let mut hints = vec![];
        let mut default = None;
        for &item in &candidates {
            let core = self.core(item);
            let production = core.is_final().then_some(core.production);
            let before = hints.len();
            hints.extend(core.custom_hints().map(|hint| (hint.clone(), production)));
            if hints.len() == before && default.is_none() {
                default = Some(production);
            }
        }
        if hints.is_empty() {
            return;
        }

        let resolver = ConflictResolver::Hints {
            hints,
            default: default.flatten(),
        };
        self.resolve_with(
            state,
            conflict,
            Some(ParserAction::Code {
                shift,
                reduce,
                resolver,
            }),
        );
    }

    /// Defer a shift/reduce conflict on an operator to parse time.
    fn resolve_conflict_by_precedence(&mut self, state: StateID, conflict: TerminalID) {
        if !self.grammar.terminal(conflict).is_operator()
            || !self.state(state).shift_terminals.contains(conflict)
        {
            return;
        }
        let reduce_items = self.reduce_items_by_lookahead(state, conflict);
        let [item] = reduce_items.as_slice() else {
            return;
        };
        let Some(&ParserAction::Shift(target)) = self.state(state).actions.get(&conflict) else {
            return;
        };

        let reduce = self.core(*item).production;
        self.resolve_with(
            state,
            conflict,
            Some(ParserAction::OperatorShift { target, reduce }),
        );
    }

    fn report_and_create_default_actions(&mut self, state: StateID) {
        let data = self.state(state);
        let mut shift_reduce = data.conflicts.clone();
        shift_reduce.intersect_with(&data.shift_terminals);
        let mut reduce_reduce = data.conflicts.clone();
        reduce_reduce.difference_with(&data.shift_terminals);

        let names = |set: &TerminalSet| {
            join(set.iter().map(|t| self.grammar.terminal_name(t)), " ").to_string()
        };
        let mut messages = vec![];
        if !shift_reduce.is_empty() {
            messages.push(format!(
                "shift-reduce conflict on [{}]; selected shift as the preferred action",
                names(&shift_reduce)
            ));
        }
        if !reduce_reduce.is_empty() {
            messages.push(format!(
                "reduce-reduce conflict on [{}]; selected reduce on the first-declared production",
                names(&reduce_reduce)
            ));
        }
        for message in messages {
            self.diagnostics
                .add(GrammarErrorLevel::Conflict, Some(state), message);
        }

        for conflict in reduce_reduce.iter() {
            let production = self
                .reduce_items_by_lookahead(state, conflict)
                .into_iter()
                .map(|item| self.core(item).production)
                .min();
            if let Some(production) = production {
                self.state_mut(state)
                    .actions
                    .insert(conflict, ParserAction::Reduce(production));
            }
        }

        let data = self.state_mut(state);
        data.resolved_conflicts.union_with(&shift_reduce);
        data.resolved_conflicts.union_with(&reduce_reduce);
        data.reported_conflicts.union_with(&shift_reduce);
        data.reported_conflicts.union_with(&reduce_reduce);
        data.conflicts = TerminalSet::default();
    }
}
