//! Canonical LR(0) state set shared by every root.

use super::{Builder, LRItem, LRItemID, StateData};
use crate::{
    automaton::{ParserAction, StateID},
    diagnostics::GrammarErrorLevel,
    grammar::{SymbolID, TerminalID},
    grammar_data::{AugmentedRoot, LR0ItemID},
    types::Queue,
};

impl Builder<'_> {
    pub(super) fn create_parser_states(&mut self) {
        let grammar = self.grammar;
        for root in &grammar.augmented_roots {
            let initial = self.create_initial_state(root);
            self.expand_parser_state_list(initial.index());
            self.create_accept_action(initial, root);
        }
    }

    fn create_initial_state(&mut self, root: &AugmentedRoot) -> StateID {
        let first = self.grammar.production(root.production).first_item();
        let state = self.find_or_create_state(vec![first]);
        self.initial_states.insert(root.root, state);
        state
    }

    /// Compute the transitions of every state from `start` on, including
    /// the states created along the way.
    fn expand_parser_state_list(&mut self, start: usize) {
        let mut index = start;
        while index < self.states.len() {
            let state = StateID::from_index(index);
            let shift_terms: Vec<SymbolID> =
                self.states[index].shift_terms.iter().copied().collect();

            for term in shift_terms {
                let shift_items: Vec<LRItemID> = self.states[index]
                    .shift_items
                    .iter()
                    .copied()
                    .filter(|&item| self.core(item).current == Some(term))
                    .collect();
                let kernel: Vec<LR0ItemID> = shift_items
                    .iter()
                    .map(|&item| self.core(item).id.next())
                    .collect();
                let target = self.find_or_create_state(kernel);

                let data = self.state_mut(state);
                match term {
                    SymbolID::T(t) => {
                        data.actions.insert(t, ParserAction::Shift(target));
                    }
                    SymbolID::N(n) => {
                        data.gotos.insert(n, target);
                    }
                }

                for item in shift_items {
                    let shifted = self.core(item).id.next();
                    let shifted = self.state(target).cores.get(&shifted).copied();
                    self.item_mut(item).shifted_item = shifted;
                }
            }

            index += 1;
        }

        tracing::trace!(start, states = self.states.len(), "expanded state list");
    }

    fn create_accept_action(&mut self, initial: StateID, root: &AugmentedRoot) {
        let Some(&target) = self.state(initial).gotos.get(&root.root) else {
            self.diagnostics.add(
                GrammarErrorLevel::InternalError,
                Some(initial),
                format!(
                    "the initial state has no goto over `{}'",
                    self.grammar.nonterminal_name(root.root)
                ),
            );
            return;
        };
        self.state_mut(target)
            .actions
            .insert(TerminalID::EOF, ParserAction::Accept);
    }

    /// Look the kernel up by its signature, creating the state and its
    /// closure if it is new.
    fn find_or_create_state(&mut self, mut kernel: Vec<LR0ItemID>) -> StateID {
        kernel.sort_unstable();
        kernel.dedup();
        debug_assert!(kernel
            .iter()
            .all(|&core| self.grammar.item(core).is_kernel(self.grammar)));
        if let Some(&id) = self.state_hash.get(&kernel) {
            return id;
        }

        let id = StateID::from_index(self.states.len());
        self.states.push(StateData::new(id, kernel.clone()));
        self.state_hash.insert(kernel.clone(), id);
        for core in kernel {
            self.add_item(id, core);
        }

        tracing::trace!(state = %id, items = self.state(id).all_items.len(), "created state");
        id
    }

    /// Add the item with its closure.
    fn add_item(&mut self, state: StateID, core: LR0ItemID) {
        let grammar = self.grammar;
        let mut pending = Queue::default();
        pending.push(core);

        while let Some(core) = pending.pop() {
            if self.state(state).cores.contains_key(&core) {
                continue;
            }

            let id = LRItemID::from_index(self.items.len());
            self.items.push(LRItem::new(state, core));

            let item = grammar.item(core);
            let data = self.state_mut(state);
            data.cores.insert(core, id);
            data.all_items.push(id);
            if item.is_initial() {
                data.initial_items.push(id);
            }

            let Some(current) = item.current else {
                data.reduce_items.push(id);
                continue;
            };
            data.shift_items.push(id);
            data.shift_terms.insert(current);
            match current {
                SymbolID::T(t) => {
                    data.shift_terminals.insert(t);
                }
                SymbolID::N(n) => {
                    pending.extend(
                        grammar
                            .productions_of(n)
                            .iter()
                            .map(|p| grammar.production(*p).first_item()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{normalize::normalize, Config};
    use super::*;
    use crate::{
        diagnostics::Diagnostics,
        grammar::{Grammar, Operand::*},
    };

    #[test]
    fn kernels_identify_states() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            g.production(s, [T(a), N(s)])?;
            g.production(s, [T(b)])?;
            g.root(s)?;
            Ok(())
        })
        .unwrap();

        let mut diagnostics = Diagnostics::default();
        let g = normalize(&grammar, &Config::new(), &mut diagnostics).unwrap();
        let mut builder = Builder::new(&g, &mut diagnostics);
        builder.create_parser_states();

        // S' -> . S EOF, S' -> S . EOF, S -> a . S, S -> b ., S' -> S EOF ., S -> a S .
        assert_eq!(builder.states.len(), 6);
        for (kernel, id) in &builder.state_hash {
            assert_eq!(&builder.state(*id).kernel, kernel);
            assert!(kernel.iter().all(|&core| g.item(core).is_kernel(&g)));
        }

        // Closure items of the initial state are not part of its kernel.
        let initial = builder.state(StateID::from_index(0));
        let closure: Vec<_> = initial
            .all_items
            .iter()
            .map(|&item| builder.core(item))
            .filter(|core| !core.is_kernel(&g))
            .map(|core| core.display(&g).to_string())
            .collect();
        assert_eq!(closure, ["S -> . a S", "S -> . b"]);

        let initial = builder.state(StateID::from_index(0));
        let after_a = initial.actions.values().find_map(|action| match action {
            ParserAction::Shift(target) => Some(*target),
            _ => None,
        });
        let after_a = builder.state(after_a.unwrap());
        // Shifting `a` again stays in the same state.
        assert!(after_a
            .actions
            .values()
            .any(|action| matches!(action, ParserAction::Shift(t) if *t == after_a.id)));
    }
}
