//! LALR automaton construction for operator-precedence-aware grammars.
//!
//! ```
//! use lalrgen::{Grammar, Operand::*};
//!
//! let grammar = Grammar::define(|g| {
//!     let a = g.terminal("a")?;
//!     let s = g.nonterminal("S")?;
//!     g.production(s, [T(a), N(s)])?;
//!     g.production(s, [T(a)])?;
//!     g.root(s)?;
//!     Ok(())
//! })?;
//!
//! let data = lalrgen::build(&grammar)?;
//! assert!(data.diagnostics.max_level().is_none());
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

pub mod automaton;
pub mod construction;
pub mod diagnostics;
pub mod grammar;
pub mod grammar_data;
pub mod hint;
pub mod types;
pub mod util;

pub use crate::{
    automaton::{ConflictResolver, ParserAction, ParserData, ParserState, Resolution, StateID},
    construction::{build, Config},
    diagnostics::{BuildError, Diagnostic, Diagnostics, GrammarErrorLevel},
    grammar::{
        Assoc, Grammar, GrammarDef, GrammarDefError, NonterminalID, Operand, Precedence,
        ProductionID, SymbolID, TermFlags, TerminalID, TerminalSet, TokenCategory,
    },
    grammar_data::{GrammarData, LR0Item, LR0ItemID, ProductionFlags},
    hint::{ConflictArgs, CustomHint, GrammarHint, Preference},
};
