//! The frozen parser automaton.

use crate::{
    diagnostics::Diagnostics,
    grammar::{Assoc, NonterminalID, ProductionID, TerminalID, TerminalSet},
    grammar_data::{GrammarData, LR0ItemID},
    hint::{ConflictArgs, ConflictHandler, CustomHint, Preference},
    types::Map,
    util::{display_fn, join},
};
use std::{cmp::Ordering, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u32);

impl StateID {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// The action that the automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Clone)]
pub enum ParserAction {
    /// Read the lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce by the specified production.
    Reduce(ProductionID),

    Accept,

    /// Decide between shifting and reducing by operator precedence at parse
    /// time, see [`ParserData::resolve_operator`].
    OperatorShift {
        target: StateID,
        reduce: ProductionID,
    },

    /// Decide between shifting and reducing by running the resolver at parse
    /// time.
    Code {
        shift: Option<StateID>,
        reduce: ProductionID,
        resolver: ConflictResolver,
    },
}

impl ParserAction {
    /// The state entered when this action shifts.
    pub fn shift_target(&self) -> Option<StateID> {
        match self {
            Self::Shift(target) | Self::OperatorShift { target, .. } => Some(*target),
            Self::Code { shift, .. } => *shift,
            Self::Reduce(..) | Self::Accept => None,
        }
    }

    pub fn display<'g>(&'g self, g: &'g GrammarData) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::Shift(target) => write!(f, "shift({})", target),
            Self::Reduce(reduce) => write!(f, "reduce({})", g.production(*reduce).display(g)),
            Self::Accept => f.write_str("accept"),
            Self::OperatorShift { target, reduce } => write!(
                f,
                "operator(shift({}), reduce({}))",
                target,
                g.production(*reduce).display(g)
            ),
            Self::Code {
                shift,
                reduce,
                resolver,
            } => {
                f.write_str("code(")?;
                if let Some(target) = shift {
                    write!(f, "shift({}), ", target)?;
                }
                write!(f, "reduce({}), ", g.production(*reduce).display(g))?;
                match resolver {
                    ConflictResolver::Grammar(..) => f.write_str("resolver = grammar)"),
                    ConflictResolver::Hints { hints, .. } => write!(
                        f,
                        "resolver = [{}])",
                        join(hints.iter().map(|(hint, _)| hint.label()), ", ")
                    ),
                }
            }
        })
    }
}

/// The outcome of a parse-time conflict decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resolution {
    Shift(StateID),
    Reduce(ProductionID),
    /// Reject the lookahead, as for a non-associative operator.
    Fail,
}

/// The parse-time resolver carried by [`ParserAction::Code`].
#[derive(Debug, Clone)]
pub enum ConflictResolver {
    /// Ask the grammar-level callback.
    Grammar(Option<ConflictHandler>),

    /// Evaluate the custom hints in declaration order. Each hint is paired
    /// with the production of the reduce item it was attached to.
    Hints {
        hints: Vec<(CustomHint, Option<ProductionID>)>,
        /// The production of the first hint-free candidate, if that
        /// candidate is a reduce item.
        default: Option<ProductionID>,
    },
}

impl ConflictResolver {
    pub fn resolve(
        &self,
        shift: Option<StateID>,
        reduce: ProductionID,
        args: &ConflictArgs<'_>,
    ) -> Resolution {
        let preferred = |pref: Preference, production: Option<ProductionID>| match (pref, shift) {
            (Preference::Shift, Some(target)) => Resolution::Shift(target),
            _ => Resolution::Reduce(production.unwrap_or(reduce)),
        };

        match self {
            Self::Grammar(handler) => {
                let preference = handler
                    .as_ref()
                    .and_then(|handler| handler.call(args))
                    .unwrap_or(Preference::Shift);
                preferred(preference, None)
            }
            Self::Hints { hints, default } => {
                for (hint, production) in hints {
                    if let Some(preference) = hint.evaluate(args) {
                        tracing::trace!(hint = hint.label(), ?preference, "custom hint matched");
                        return preferred(preference, *production);
                    }
                }
                match default {
                    Some(production) if shift.is_none() => Resolution::Reduce(*production),
                    _ => preferred(Preference::Shift, None),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParserState {
    pub id: StateID,
    pub name: String,
    pub kernel: Vec<LR0ItemID>,
    pub actions: Map<TerminalID, ParserAction>,
    pub gotos: Map<NonterminalID, StateID>,
    /// Taken regardless of the lookahead when set.
    pub default_action: Option<ParserAction>,
    pub expected_terminals: TerminalSet,
    /// Lookaheads of the reduce items, recorded for inadequate states.
    pub lookaheads: Map<LR0ItemID, TerminalSet>,
    pub is_inadequate: bool,
    pub resolved_conflicts: TerminalSet,
    /// Conflicts settled by the fallback policy and reported as diagnostics.
    pub reported_conflicts: TerminalSet,
}

impl ParserState {
    /// The action taken on the lookahead, falling back to the default action.
    pub fn action(&self, lookahead: TerminalID) -> Option<&ParserAction> {
        self.actions
            .get(&lookahead)
            .or(self.default_action.as_ref())
    }

    pub fn goto(&self, symbol: NonterminalID) -> Option<StateID> {
        self.gotos.get(&symbol).copied()
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParserData {
    pub grammar: GrammarData,
    pub states: Vec<ParserState>,
    /// The initial state of each root, primary root first.
    pub initial_states: Map<NonterminalID, StateID>,
    pub diagnostics: Diagnostics,
}

impl ParserData {
    pub fn state(&self, id: StateID) -> &ParserState {
        &self.states[id.index()]
    }

    /// The initial state of the primary root.
    pub fn initial_state(&self) -> Option<StateID> {
        self.initial_states.values().next().copied()
    }

    pub fn initial_state_of(&self, root: NonterminalID) -> Option<StateID> {
        self.initial_states.get(&root).copied()
    }

    /// Decide an [`ParserAction::OperatorShift`] for the incoming operator.
    ///
    /// A production without precedence, or an incoming terminal without one,
    /// shifts. Otherwise the higher priority wins, and equal priorities are
    /// settled by the associativity of the incoming operator.
    pub fn resolve_operator(
        &self,
        incoming: TerminalID,
        target: StateID,
        reduce: ProductionID,
    ) -> Resolution {
        let pending = self
            .grammar
            .productions
            .get(&reduce)
            .and_then(|p| p.precedence);
        let incoming = self
            .grammar
            .terminals
            .get(&incoming)
            .and_then(|t| t.precedence());
        let (Some(pending), Some(incoming)) = (pending, incoming) else {
            return Resolution::Shift(target);
        };

        match incoming.priority.cmp(&pending.priority) {
            Ordering::Greater => Resolution::Shift(target),
            Ordering::Less => Resolution::Reduce(reduce),
            Ordering::Equal => match incoming.assoc {
                Assoc::Left => Resolution::Reduce(reduce),
                Assoc::Right => Resolution::Shift(target),
                Assoc::Nonassoc => Resolution::Fail,
            },
        }
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        let g = &self.grammar;
        display_fn(move |f| {
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {}", state.name)?;
                writeln!(f, "## kernel")?;
                for item in &state.kernel {
                    writeln!(f, "- {}", g.item(*item).display(g))?;
                }

                writeln!(f, "## actions")?;
                for (token, action) in &state.actions {
                    writeln!(f, "- {} => {}", g.terminal_name(*token), action.display(g))?;
                }
                if let Some(action) = &state.default_action {
                    writeln!(f, "- (default) => {}", action.display(g))?;
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &state.gotos {
                    writeln!(f, "- {} => goto({})", g.nonterminal_name(*symbol), goto)?;
                }

                if !state.lookaheads.is_empty() {
                    writeln!(f, "## lookaheads")?;
                    for (item, lookaheads) in &state.lookaheads {
                        writeln!(
                            f,
                            "- {} [{}]",
                            g.item(*item).display(g),
                            join(lookaheads.iter().map(|t| g.terminal_name(t)), ", ")
                        )?;
                    }
                }

                writeln!(
                    f,
                    "## expected: [{}]",
                    join(
                        state.expected_terminals.iter().map(|t| g.terminal_name(t)),
                        ", "
                    )
                )?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELSE: TerminalID = TerminalID::from_raw(4);
    const SEMI: TerminalID = TerminalID::from_raw(5);

    #[test]
    fn hint_resolver_falls_back_to_shift() {
        let reduce = ProductionID::from_raw(2);
        let resolver = ConflictResolver::Hints {
            hints: vec![(CustomHint::reduce_if(ELSE, [SEMI]), Some(reduce))],
            default: None,
        };
        let target = StateID::from_raw(7);

        let args = ConflictArgs {
            lookahead: SEMI,
            preview: &[ELSE],
            stack: &[],
        };
        assert_eq!(
            resolver.resolve(Some(target), ProductionID::from_raw(1), &args),
            Resolution::Shift(target)
        );

        let args = ConflictArgs {
            lookahead: ELSE,
            preview: &[],
            stack: &[],
        };
        assert_eq!(
            resolver.resolve(Some(target), ProductionID::from_raw(1), &args),
            Resolution::Reduce(reduce)
        );
    }

    #[test]
    fn grammar_resolver_without_callback_prefers_shift() {
        let resolver = ConflictResolver::Grammar(None);
        let args = ConflictArgs {
            lookahead: ELSE,
            preview: &[],
            stack: &[],
        };
        let reduce = ProductionID::from_raw(0);
        assert_eq!(
            resolver.resolve(Some(StateID::from_raw(1)), reduce, &args),
            Resolution::Shift(StateID::from_raw(1))
        );
        assert_eq!(
            resolver.resolve(None, reduce, &args),
            Resolution::Reduce(reduce)
        );
    }
}
