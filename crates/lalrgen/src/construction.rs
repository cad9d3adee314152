//! Construction of the LALR automaton from a grammar.
//!
//! The stages run in order over a single [`Builder`] context:
//!
//! 1. normalize the grammar (augmented roots, nullability, items),
//! 2. build the LR(0) state set shared by every root,
//! 3. propagate lookaheads to the reduce items of inadequate states,
//! 4. detect and resolve conflicts,
//! 5. fill in the remaining reductions and freeze the table.

mod conflict;
mod finalize;
mod lookahead;
mod lr0;
mod normalize;

use crate::{
    automaton::{ParserAction, ParserData, StateID},
    diagnostics::{BuildError, Diagnostics},
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    grammar_data::{GrammarData, LR0Item, LR0ItemID},
    types::{Map, Set},
};
use std::time::Instant;

/// Knobs of a build.
#[derive(Debug, Clone)]
pub struct Config {
    create_ast: bool,
    keep_lookaheads: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            create_ast: false,
            keep_lookaheads: true,
        }
    }

    /// Warn about reachable nonterminals that have no syntax tree node bound.
    pub fn create_ast(&mut self, enabled: bool) -> &mut Self {
        self.create_ast = enabled;
        self
    }

    /// Keep the lookahead sets of the reduce items in the frozen states.
    pub fn keep_lookaheads(&mut self, keep: bool) -> &mut Self {
        self.keep_lookaheads = keep;
        self
    }

    pub fn build(&self, grammar: &Grammar) -> Result<ParserData, BuildError> {
        let start = Instant::now();
        let mut diagnostics = Diagnostics::default();

        let grammar = match normalize::normalize(grammar, self, &mut diagnostics) {
            Some(grammar) if !diagnostics.has_errors() => grammar,
            _ => return Err(BuildError::Structural(diagnostics)),
        };
        tracing::debug!(elapsed = ?start.elapsed(), "normalized grammar");

        let mut builder = Builder::new(&grammar, &mut diagnostics);

        builder.create_parser_states();
        tracing::debug!(
            states = builder.states.len(),
            elapsed = ?start.elapsed(),
            "built LR(0) states"
        );

        let reduce_items = builder.reduce_items_in_inadequate_states();
        builder.compute_transitions(&reduce_items);
        builder.compute_lookaheads(&reduce_items);
        tracing::debug!(
            reduce_items = reduce_items.len(),
            transitions = builder.transitions.len(),
            elapsed = ?start.elapsed(),
            "computed lookaheads"
        );

        builder.compute_and_resolve_conflicts();
        builder.create_remaining_reduce_actions();
        builder.compute_expected_terminals();
        let (states, initial_states) = builder.finish(self.keep_lookaheads);
        tracing::debug!(elapsed = ?start.elapsed(), "finished parser table");

        Ok(ParserData {
            grammar,
            states,
            initial_states,
            diagnostics,
        })
    }
}

/// Build the automaton with the default configuration.
pub fn build(grammar: &Grammar) -> Result<ParserData, BuildError> {
    Config::new().build(grammar)
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
struct LRItemID(u32);

impl LRItemID {
    const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
struct TransitionID(u32);

impl TransitionID {
    const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An LR(0) item placed in a particular state.
#[derive(Debug)]
struct LRItem {
    state: StateID,
    core: LR0ItemID,
    /// The same production with the dot advanced, in the shift target state.
    shifted_item: Option<LRItemID>,
    /// The transition shifting over the current nonterminal.
    transition: Option<TransitionID>,
    lookbacks: Set<TransitionID>,
    lookaheads: TerminalSet,
}

impl LRItem {
    fn new(state: StateID, core: LR0ItemID) -> Self {
        Self {
            state,
            core,
            shifted_item: None,
            transition: None,
            lookbacks: Set::default(),
            lookaheads: TerminalSet::default(),
        }
    }
}

/// A goto edge `from --over--> to` of the DeRemer-Pennello relations.
#[derive(Debug)]
struct Transition {
    from: StateID,
    over: NonterminalID,
    to: StateID,
    /// Shift items of `from` whose current symbol is `over`.
    items: Vec<LRItemID>,
    includes: Set<TransitionID>,
    included_by: Set<TransitionID>,
}

#[derive(Debug)]
struct StateData {
    id: StateID,
    kernel: Vec<LR0ItemID>,
    all_items: Vec<LRItemID>,
    cores: Map<LR0ItemID, LRItemID>,
    shift_items: Vec<LRItemID>,
    reduce_items: Vec<LRItemID>,
    initial_items: Vec<LRItemID>,
    shift_terms: Set<SymbolID>,
    shift_terminals: TerminalSet,
    actions: Map<TerminalID, ParserAction>,
    gotos: Map<NonterminalID, StateID>,
    default_action: Option<ParserAction>,
    transitions: Map<NonterminalID, TransitionID>,
    read_state_set: Option<Set<StateID>>,
    conflicts: TerminalSet,
    resolved_conflicts: TerminalSet,
    reported_conflicts: TerminalSet,
    expected_terminals: TerminalSet,
}

impl StateData {
    fn new(id: StateID, kernel: Vec<LR0ItemID>) -> Self {
        Self {
            id,
            kernel,
            all_items: vec![],
            cores: Map::default(),
            shift_items: vec![],
            reduce_items: vec![],
            initial_items: vec![],
            shift_terms: Set::default(),
            shift_terminals: TerminalSet::default(),
            actions: Map::default(),
            gotos: Map::default(),
            default_action: None,
            transitions: Map::default(),
            read_state_set: None,
            conflicts: TerminalSet::default(),
            resolved_conflicts: TerminalSet::default(),
            reported_conflicts: TerminalSet::default(),
            expected_terminals: TerminalSet::default(),
        }
    }

    fn is_inadequate(&self) -> bool {
        let reduces = self.reduce_items.len();
        reduces > 1 || (reduces == 1 && !self.shift_items.is_empty())
    }
}

/// The scratch context threaded through the construction stages.
struct Builder<'g> {
    grammar: &'g GrammarData,
    diagnostics: &'g mut Diagnostics,
    states: Vec<StateData>,
    /// Kernel signature to state.
    state_hash: Map<Vec<LR0ItemID>, StateID>,
    items: Vec<LRItem>,
    transitions: Vec<Transition>,
    initial_states: Map<NonterminalID, StateID>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g GrammarData, diagnostics: &'g mut Diagnostics) -> Self {
        Self {
            grammar,
            diagnostics,
            states: vec![],
            state_hash: Map::default(),
            items: vec![],
            transitions: vec![],
            initial_states: Map::default(),
        }
    }

    fn state(&self, id: StateID) -> &StateData {
        &self.states[id.index()]
    }

    fn state_mut(&mut self, id: StateID) -> &mut StateData {
        &mut self.states[id.index()]
    }

    fn item(&self, id: LRItemID) -> &LRItem {
        &self.items[id.index()]
    }

    fn item_mut(&mut self, id: LRItemID) -> &mut LRItem {
        &mut self.items[id.index()]
    }

    fn core(&self, id: LRItemID) -> &'g LR0Item {
        self.grammar.item(self.items[id.index()].core)
    }

    fn transition(&self, id: TransitionID) -> &Transition {
        &self.transitions[id.index()]
    }

    fn transition_mut(&mut self, id: TransitionID) -> &mut Transition {
        &mut self.transitions[id.index()]
    }
}
