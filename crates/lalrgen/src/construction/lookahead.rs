//! Lookahead propagation for the reduce items of inadequate states.
//!
//! The lookback and includes relations of DeRemer and Pennello are built
//! lazily: transitions are only created for the nonterminals whose
//! reductions need lookaheads, and every item newly placed on such a
//! transition may in turn require lookbacks of its own.

use super::{Builder, LRItemID, Transition, TransitionID};
use crate::{
    automaton::StateID,
    diagnostics::GrammarErrorLevel,
    grammar::{NonterminalID, SymbolID, TerminalID, TerminalSet},
    grammar_data::LR0ItemID,
    types::{Queue, Set},
};

impl Builder<'_> {
    pub(super) fn reduce_items_in_inadequate_states(&self) -> Set<LRItemID> {
        self.states
            .iter()
            .filter(|state| state.is_inadequate())
            .flat_map(|state| state.reduce_items.iter().copied())
            .collect()
    }

    pub(super) fn compute_transitions(&mut self, reduce_items: &Set<LRItemID>) {
        let mut pending = reduce_items.clone();
        let mut rounds = 0;
        while !pending.is_empty() {
            let created = self.create_lookback_transitions(&pending);
            pending = self.items_needing_lookbacks(&created);
            rounds += 1;
        }
        tracing::trace!(
            rounds,
            transitions = self.transitions.len(),
            "computed transitions"
        );
    }

    /// Items of the new transitions whose tail is nullable, i.e. the items
    /// whose transition is included by the transition of a reduction.
    fn items_needing_lookbacks(&self, transitions: &[TransitionID]) -> Set<LRItemID> {
        transitions
            .iter()
            .flat_map(|&t| self.transition(t).items.iter().copied())
            .filter(|&item| self.core(item).tail_is_nullable)
            .collect()
    }

    /// Walk every derivation path of the source items, starting from the
    /// initial items of their productions, and record the lookback or
    /// includes edge at the end of the path.
    fn create_lookback_transitions(&mut self, sources: &Set<LRItemID>) -> Vec<TransitionID> {
        let grammar = self.grammar;
        let initial_cores: Set<LR0ItemID> = sources
            .iter()
            .map(|&item| self.core(item).production)
            .map(|production| grammar.production(production).first_item())
            .collect();

        let mut created = vec![];
        for index in 0..self.states.len() {
            let state = StateID::from_index(index);
            for k in 0..self.states[index].initial_items.len() {
                let initial = self.states[index].initial_items[k];
                let core = self.core(initial);
                if !initial_cores.contains(&core.id) {
                    continue;
                }
                let over = grammar.production(core.production).left();

                let mut lookback = None;
                let mut current = Some(initial);
                while let Some(item) = current {
                    if sources.contains(&item) {
                        let transition = match lookback {
                            Some(transition) => transition,
                            None => {
                                let Some(transition) =
                                    self.find_or_create_transition(state, over, &mut created)
                                else {
                                    break;
                                };
                                lookback = Some(transition);
                                transition
                            }
                        };

                        if self.core(item).is_final() {
                            self.item_mut(item).lookbacks.insert(transition);
                        } else if let Some(own) = self.item(item).transition {
                            self.include(own, transition);
                        }
                    }
                    current = self.item(item).shifted_item;
                }
            }
        }
        created
    }

    fn find_or_create_transition(
        &mut self,
        from: StateID,
        over: NonterminalID,
        created: &mut Vec<TransitionID>,
    ) -> Option<TransitionID> {
        if let Some(&transition) = self.state(from).transitions.get(&over) {
            return Some(transition);
        }

        let Some(&to) = self.state(from).gotos.get(&over) else {
            self.diagnostics.add(
                GrammarErrorLevel::InternalError,
                Some(from),
                format!(
                    "no goto over `{}' for a lookback transition",
                    self.grammar.nonterminal_name(over)
                ),
            );
            return None;
        };

        let id = TransitionID::from_index(self.transitions.len());
        let items: Vec<LRItemID> = self
            .state(from)
            .shift_items
            .iter()
            .copied()
            .filter(|&item| self.core(item).current == Some(SymbolID::N(over)))
            .collect();
        for &item in &items {
            self.item_mut(item).transition = Some(id);
        }
        self.transitions.push(Transition {
            from,
            over,
            to,
            items,
            includes: Set::default(),
            included_by: Set::default(),
        });
        self.state_mut(from).transitions.insert(over, id);
        created.push(id);

        tracing::trace!(
            %from,
            over = self.grammar.nonterminal_name(over),
            %to,
            "created transition"
        );
        Some(id)
    }

    /// Record that `transition` includes `other`, together with everything
    /// `other` already includes.
    fn include(&mut self, transition: TransitionID, other: TransitionID) {
        if transition == other || !self.include_one(transition, other) {
            return;
        }
        let nested: Vec<TransitionID> = self.transition(other).includes.iter().copied().collect();
        for child in nested {
            self.include_one(transition, child);
        }
    }

    /// Add the edge and propagate it to every transition that includes
    /// `transition`. Returns `false` if the edge already existed.
    fn include_one(&mut self, transition: TransitionID, other: TransitionID) -> bool {
        let mut added = false;
        let mut pending = vec![(transition, other)];
        while let Some((t, o)) = pending.pop() {
            if t == o || !self.transition_mut(t).includes.insert(o) {
                continue;
            }
            if t == transition {
                added = true;
            }
            self.transition_mut(o).included_by.insert(t);
            pending.extend(self.transition(t).included_by.iter().map(|&by| (by, o)));
        }
        added
    }

    pub(super) fn compute_lookaheads(&mut self, reduce_items: &Set<LRItemID>) {
        for &item in reduce_items {
            let mut sources: Set<StateID> = Set::default();
            let lookbacks: Vec<TransitionID> = self.item(item).lookbacks.iter().copied().collect();
            for lookback in lookbacks {
                let transition = self.transition(lookback);
                let targets: Vec<StateID> = std::iter::once(transition.to)
                    .chain(transition.includes.iter().map(|&t| self.transition(t).to))
                    .collect();
                for target in targets {
                    self.add_source_state(&mut sources, target);
                }
            }

            tracing::trace!(
                item = %self.core(item).display(self.grammar),
                lookbacks = ?self
                    .item(item)
                    .lookbacks
                    .iter()
                    .map(|&t| {
                        let t = self.transition(t);
                        (t.from, self.grammar.nonterminal_name(t.over))
                    })
                    .collect::<Vec<_>>(),
                sources = sources.len(),
                "collected lookahead sources"
            );

            let mut lookaheads = TerminalSet::default();
            for source in &sources {
                lookaheads.union_with(&self.state(*source).shift_terminals);
            }
            lookaheads.remove(TerminalID::SYNTAX_ERROR);

            if lookaheads.is_empty() {
                let state = self.item(item).state;
                let message = format!(
                    "the reduce item `{}' has no lookaheads",
                    self.core(item).display(self.grammar)
                );
                self.diagnostics
                    .add(GrammarErrorLevel::InternalError, Some(state), message);
            }
            self.item_mut(item).lookaheads = lookaheads;
        }
    }

    fn add_source_state(&mut self, sources: &mut Set<StateID>, state: StateID) {
        if !sources.insert(state) {
            return;
        }
        self.compute_read_state_set(state);
        if let Some(read) = &self.state(state).read_state_set {
            sources.extend(read.iter().copied());
        }
    }

    /// The states reachable from `state` through gotos over nullable
    /// nonterminals, transitively.
    fn compute_read_state_set(&mut self, state: StateID) {
        if self.state(state).read_state_set.is_some() {
            return;
        }

        let grammar = self.grammar;
        let mut read: Set<StateID> = Set::default();
        let mut pending: Queue<StateID> = Queue::default();
        pending.push(state);
        while let Some(current) = pending.pop() {
            if let Some(cached) = &self.state(current).read_state_set {
                read.extend(cached.iter().copied());
                continue;
            }
            for (&symbol, &target) in &self.state(current).gotos {
                if grammar.nonterminal(symbol).is_nullable() && read.insert(target) {
                    pending.push(target);
                }
            }
        }

        self.state_mut(state).read_state_set = Some(read);
    }
}
