//! The normalized grammar the automaton is built from.

use crate::{
    grammar::{
        Nonterminal, NonterminalID, Precedence, Production, ProductionID, SymbolID, Terminal,
        TerminalID,
    },
    hint::{ConflictHandler, CustomHint, GrammarHint},
    types::{Map, Set},
    util::display_fn,
};
use bitflags::bitflags;
use std::{fmt, ops::Range};

bitflags! {
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ProductionFlags: u8 {
        const HAS_TERMINALS = 1 << 0;
        const IS_EMPTY = 1 << 1;
        /// The production contains `SYNTAX_ERROR`.
        const IS_ERROR = 1 << 2;
        /// A left-recursive production of a list nonterminal.
        const IS_LIST_BUILDER = 1 << 3;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LR0ItemID(u32);

impl LR0ItemID {
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

    /// The item with the dot moved one symbol to the right.
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for LR0ItemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I#{:04}", self.0)
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LR0Item {
    pub id: LR0ItemID,
    pub production: ProductionID,
    pub position: u16,
    /// The symbol right after the dot, `None` for a final item.
    pub current: Option<SymbolID>,
    /// Every operand after `current` derives the empty string.
    pub tail_is_nullable: bool,
    pub hints: Vec<GrammarHint>,
}

impl LR0Item {
    pub fn is_initial(&self) -> bool {
        self.position == 0
    }

    pub fn is_final(&self) -> bool {
        self.current.is_none()
    }

    /// Kernel items are the initial items of augmented productions and every
    /// item whose dot is not at the start.
    pub fn is_kernel(&self, g: &GrammarData) -> bool {
        self.position > 0 || g.is_augmented(g.production(self.production).left())
    }

    pub fn has_hint(&self, pred: impl Fn(&GrammarHint) -> bool) -> bool {
        self.hints.iter().any(pred)
    }

    pub fn custom_hints(&self) -> impl Iterator<Item = &CustomHint> + '_ {
        self.hints.iter().filter_map(|hint| match hint {
            GrammarHint::Custom(custom) => Some(custom),
            _ => None,
        })
    }

    // `"E -> E . + E"`
    pub fn display<'g>(&'g self, g: &'g GrammarData) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} ->", g.nonterminal_name(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == self.position as usize {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.is_final() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProductionData {
    pub production: Production,
    pub flags: ProductionFlags,
    /// Explicit implied precedence, or that of the last operator terminal.
    pub precedence: Option<Precedence>,
    pub items: Range<u32>,
}

impl ProductionData {
    pub fn id(&self) -> ProductionID {
        self.production.id()
    }

    pub fn left(&self) -> NonterminalID {
        self.production.left()
    }

    pub fn right(&self) -> &[SymbolID] {
        self.production.right()
    }

    pub fn first_item(&self) -> LR0ItemID {
        LR0ItemID(self.items.start)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = LR0ItemID> {
        self.items.clone().map(LR0ItemID)
    }

    pub fn display<'g>(&'g self, g: &'g GrammarData) -> impl fmt::Display + 'g {
        self.production.display_with(move |s| g.symbol_name(s))
    }
}

/// A synthetic `R' -> R EOF` wrapper around a root nonterminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AugmentedRoot {
    pub nonterminal: NonterminalID,
    pub root: NonterminalID,
    pub production: ProductionID,
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GrammarData {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    /// Productions of the reachable nonterminals, in declaration order.
    pub productions: Map<ProductionID, ProductionData>,
    pub items: Vec<LR0Item>,
    /// The primary root first, then the snippet roots.
    pub augmented_roots: Vec<AugmentedRoot>,
    pub reachable_terminals: Set<TerminalID>,
    pub reachable_nonterminals: Set<NonterminalID>,
    pub on_conflict: Option<ConflictHandler>,
}

impl GrammarData {
    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn production(&self, id: ProductionID) -> &ProductionData {
        &self.productions[&id]
    }

    pub fn item(&self, id: LR0ItemID) -> &LR0Item {
        &self.items[id.index()]
    }

    /// Productions of a nonterminal, empty if it has none.
    pub fn productions_of(&self, id: NonterminalID) -> &[ProductionID] {
        self.nonterminals
            .get(&id)
            .and_then(Nonterminal::productions)
            .unwrap_or(&[])
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(_) => false,
            SymbolID::N(n) => self.nonterminal(n).is_nullable(),
        }
    }

    pub fn is_augmented(&self, id: NonterminalID) -> bool {
        self.augmented_roots.iter().any(|root| root.nonterminal == id)
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals
            .get(&id)
            .and_then(Nonterminal::name)
            .unwrap_or("<anonymous>")
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals.get(&id).map_or("<unknown>", Terminal::name)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }
}
