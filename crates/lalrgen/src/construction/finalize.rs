//! Remaining reductions, expected terminals, and freezing of the states.

use super::Builder;
use crate::{
    automaton::{ParserAction, ParserState, StateID},
    grammar::{NonterminalID, TerminalID, TerminalSet},
    types::Map,
};

impl Builder<'_> {
    pub(super) fn create_remaining_reduce_actions(&mut self) {
        let mut default_reductions = 0;
        for data in &mut self.states {
            if data.shift_items.is_empty() && data.reduce_items.len() == 1 {
                let item = data.reduce_items[0];
                let production = self.grammar.item(self.items[item.index()].core).production;
                data.default_action = Some(ParserAction::Reduce(production));
                default_reductions += 1;
                continue;
            }

            for &item in &data.reduce_items {
                let item = &self.items[item.index()];
                let production = self.grammar.item(item.core).production;
                for lookahead in item.lookaheads.iter() {
                    data.actions
                        .entry(lookahead)
                        .or_insert(ParserAction::Reduce(production));
                }
            }
        }
        tracing::trace!(default_reductions, "created reduce actions");
    }

    pub(super) fn compute_expected_terminals(&mut self) {
        for data in &mut self.states {
            let mut expected = data.shift_terminals.clone();
            for &item in &data.reduce_items {
                expected.union_with(&self.items[item.index()].lookaheads);
            }
            expected.remove(TerminalID::SYNTAX_ERROR);
            expected.remove(TerminalID::EOF);
            data.expected_terminals = expected;
        }
    }

    pub(super) fn finish(
        self,
        keep_lookaheads: bool,
    ) -> (Vec<ParserState>, Map<NonterminalID, StateID>) {
        let items = self.items;
        let states = self
            .states
            .into_iter()
            .map(|data| {
                let is_inadequate = data.is_inadequate();
                let lookaheads: Map<_, TerminalSet> = if keep_lookaheads && is_inadequate {
                    data.reduce_items
                        .iter()
                        .map(|&item| {
                            let item = &items[item.index()];
                            (item.core, item.lookaheads.clone())
                        })
                        .collect()
                } else {
                    Map::default()
                };

                ParserState {
                    id: data.id,
                    name: data.id.to_string(),
                    kernel: data.kernel,
                    actions: data.actions,
                    gotos: data.gotos,
                    default_action: data.default_action,
                    expected_terminals: data.expected_terminals,
                    lookaheads,
                    is_inadequate,
                    resolved_conflicts: data.resolved_conflicts,
                    reported_conflicts: data.reported_conflicts,
                }
            })
            .collect();

        (states, self.initial_states)
    }
}
