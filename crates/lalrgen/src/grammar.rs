//! Grammar types and the definition builder.

use crate::{
    hint::{ConflictArgs, ConflictHandler, GrammarHint, Preference},
    types::Map,
    util::display_fn,
};
use bitflags::bitflags;
use std::{borrow::Cow, fmt, sync::Arc};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID(u16);

impl TerminalID {
    /// Reserved terminal that marks the end of input.
    pub const EOF: Self = Self(0);

    /// Reserved pseudo terminal produced by the scanner on lexical errors.
    pub const SYNTAX_ERROR: Self = Self(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOF => write!(f, "T#EOF"),
            Self::SYNTAX_ERROR => write!(f, "T#Err"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn intersect_with(&mut self, other: &Self) {
        self.inner.intersect_with(&other.inner)
    }
    pub fn difference_with(&mut self, other: &Self) {
        self.inner.difference_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + Clone + '_ {
        // Every member was inserted from a `u16`.
        self.inner.iter().map(|raw| TerminalID(raw as u16))
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID(u16);

impl NonterminalID {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID(u16);

impl ProductionID {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.0)
    }
}

bitflags! {
    /// Flags attached to grammar terms.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct TermFlags: u16 {
        /// The nonterminal derives the empty string. Computed, never declared.
        const NULLABLE = 1 << 0;
        const KEYWORD = 1 << 1;
        const PUNCTUATION = 1 << 2;
        const OPERATOR = 1 << 3;
        /// The nonterminal is replaced by its only child in the syntax tree.
        const TRANSIENT = 1 << 4;
        const IS_LIST = 1 << 5;
        const NO_AST_NODE = 1 << 6;
        /// The terminal is recognized by the scanner but never appears in productions.
        const NON_GRAMMAR = 1 << 7;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TokenCategory {
    #[default]
    Content,
    /// Layout tokens such as the end of input.
    Outline,
    Comment,
    Directive,
    Error,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Nonassoc => write!(f, "nonassoc"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: Cow<'static, str>,
    category: TokenCategory,
    flags: TermFlags,
    precedence: Option<Precedence>,
}

impl Terminal {
    fn new(id: TerminalID, name: impl Into<Cow<'static, str>>, category: TokenCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            flags: TermFlags::empty(),
            precedence: None,
        }
    }

    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn category(&self) -> TokenCategory {
        self.category
    }
    pub fn flags(&self) -> TermFlags {
        self.flags
    }
    pub fn is_operator(&self) -> bool {
        self.flags.contains(TermFlags::OPERATOR)
    }

    /// The precedence of an operator terminal.
    pub fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Option<Cow<'static, str>>,
    flags: TermFlags,
    productions: Option<Vec<ProductionID>>,
    ast_node: Option<Cow<'static, str>>,
}

impl Nonterminal {
    fn new(id: NonterminalID, name: Option<Cow<'static, str>>) -> Self {
        Self {
            id,
            name,
            flags: TermFlags::empty(),
            productions: None,
            ast_node: None,
        }
    }

    pub(crate) fn augmented(id: NonterminalID, production: ProductionID) -> Self {
        Self {
            flags: TermFlags::NO_AST_NODE,
            productions: Some(vec![production]),
            ..Self::new(id, None)
        }
    }

    pub fn id(&self) -> NonterminalID {
        self.id
    }

    /// The declared name, or the one assigned while normalizing the grammar.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name.into());
    }

    pub fn flags(&self) -> TermFlags {
        self.flags
    }

    pub(crate) fn insert_flags(&mut self, flags: TermFlags) {
        self.flags.insert(flags);
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.contains(TermFlags::NULLABLE)
    }

    /// The production set, or `None` if no production has been attached.
    pub fn productions(&self) -> Option<&[ProductionID]> {
        self.productions.as_deref()
    }

    /// The name of the syntax tree node type bound to this nonterminal.
    pub fn ast_node(&self) -> Option<&str> {
        self.ast_node.as_deref()
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("<anonymous>"))
    }
}

/// An element of the right-hand side passed to [`GrammarDef::production`].
#[derive(Debug, Clone)]
pub enum Operand {
    T(TerminalID),
    N(NonterminalID),
    /// A hint bound to the dot position between the neighbouring symbols.
    Hint(GrammarHint),
}

impl From<SymbolID> for Operand {
    fn from(symbol: SymbolID) -> Self {
        match symbol {
            SymbolID::T(t) => Self::T(t),
            SymbolID::N(n) => Self::N(n),
        }
    }
}

impl From<GrammarHint> for Operand {
    fn from(hint: GrammarHint) -> Self {
        Self::Hint(hint)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
    hints: Vec<(u16, GrammarHint)>,
}

impl Production {
    pub(crate) fn new(id: ProductionID, left: NonterminalID, right: Vec<SymbolID>) -> Self {
        Self {
            id,
            left,
            right,
            hints: vec![],
        }
    }

    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// The hints together with the dot position they are bound to.
    pub fn hints(&self) -> &[(u16, GrammarHint)] {
        &self.hints[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        self.display_with(move |symbol| g.symbol_name(symbol))
    }

    /// Render the production, looking symbol names up through `name_of`.
    pub fn display_with<'a, F>(&'a self, name_of: F) -> impl fmt::Display + 'a
    where
        F: Fn(SymbolID) -> &'a str + 'a,
    {
        display_fn(move |f| {
            write!(f, "{} ->", name_of(SymbolID::N(self.left)))?;
            if self.right.is_empty() {
                return f.write_str(" ε");
            }
            for symbol in &self.right {
                write!(f, " {}", name_of(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub productions: Map<ProductionID, Production>,
    pub root: Option<NonterminalID>,
    pub snippet_roots: Vec<NonterminalID>,
    pub non_grammar_terminals: Vec<TerminalID>,
    pub on_conflict: Option<ConflictHandler>,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            grammar: Grammar {
                terminals: Map::default(),
                nonterminals: Map::default(),
                productions: Map::default(),
                root: None,
                snippet_roots: vec![],
                non_grammar_terminals: vec![],
                on_conflict: None,
            },
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: 0,
            next_production_id: 0,
        };

        def.grammar.terminals.insert(
            TerminalID::EOF,
            Terminal::new(TerminalID::EOF, "EOF", TokenCategory::Outline),
        );
        def.grammar.terminals.insert(
            TerminalID::SYNTAX_ERROR,
            Terminal::new(
                TerminalID::SYNTAX_ERROR,
                "SYNTAX_ERROR",
                TokenCategory::Error,
            ),
        );

        f(&mut def)?;

        Ok(def.grammar)
    }

    pub fn terminal(&self, id: TerminalID) -> Option<&Terminal> {
        self.terminals.get(&id)
    }

    pub fn nonterminal(&self, id: NonterminalID) -> Option<&Nonterminal> {
        self.nonterminals.get(&id)
    }

    pub fn production(&self, id: ProductionID) -> Option<&Production> {
        self.productions.get(&id)
    }

    pub(crate) fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals
            .get(&id)
            .and_then(Nonterminal::name)
            .unwrap_or("<anonymous>")
    }

    pub(crate) fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals.get(&t).map_or("<unknown>", Terminal::name),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            write!(f, "{}", terminal)?;
            if let Some(prec) = terminal.precedence() {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            if terminal.flags().contains(TermFlags::NON_GRAMMAR) {
                write!(f, " (non-grammar)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if Some(nonterminal.id()) == self.root {
                write!(f, " (root)")?;
            } else if self.snippet_roots.contains(&nonterminal.id()) {
                write!(f, " (snippet root)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(f, "{}", production.display(self))?;
        }

        Ok(())
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    grammar: Grammar,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<TerminalID, GrammarDefError> {
        self.declare_terminal(name.into(), TokenCategory::Content, TermFlags::empty())
    }

    /// Declare a reserved word.
    pub fn keyword(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<TerminalID, GrammarDefError> {
        self.declare_terminal(name.into(), TokenCategory::Content, TermFlags::KEYWORD)
    }

    /// Declare a punctuation symbol, which carries no information in the syntax tree.
    pub fn punctuation(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<TerminalID, GrammarDefError> {
        self.declare_terminal(name.into(), TokenCategory::Content, TermFlags::PUNCTUATION)
    }

    /// Declare a terminal that the scanner must recognize even though no
    /// production refers to it, such as comments.
    pub fn non_grammar_terminal(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        category: TokenCategory,
    ) -> Result<TerminalID, GrammarDefError> {
        let id = self.declare_terminal(name.into(), category, TermFlags::NON_GRAMMAR)?;
        self.grammar.non_grammar_terminals.push(id);
        Ok(id)
    }

    fn declare_terminal(
        &mut self,
        name: Cow<'static, str>,
        category: TokenCategory,
        flags: TermFlags,
    ) -> Result<TerminalID, GrammarDefError> {
        if name.is_empty() {
            return Err(GrammarDefError::EmptyName);
        }
        if self.grammar.terminals.values().any(|t| t.name() == name) {
            return Err(GrammarDefError::DuplicateTerminal(name.into_owned()));
        }

        let id = TerminalID(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or(GrammarDefError::TooManySymbols)?;

        let mut terminal = Terminal::new(id, name, category);
        terminal.flags = flags;
        self.grammar.terminals.insert(id, terminal);

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<NonterminalID, GrammarDefError> {
        let name = name.into();
        if name.is_empty() {
            return Err(GrammarDefError::EmptyName);
        }
        if self
            .grammar
            .nonterminals
            .values()
            .any(|n| n.name() == Some(&*name))
        {
            return Err(GrammarDefError::DuplicateNonterminal(name.into_owned()));
        }
        self.declare_nonterminal(Some(name))
    }

    /// Declare a nonterminal without a name, e.g. for an inline sub-expression.
    ///
    /// A name is generated for it while the grammar is normalized.
    pub fn anonymous(&mut self) -> Result<NonterminalID, GrammarDefError> {
        self.declare_nonterminal(None)
    }

    fn declare_nonterminal(
        &mut self,
        name: Option<Cow<'static, str>>,
    ) -> Result<NonterminalID, GrammarDefError> {
        let id = NonterminalID(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or(GrammarDefError::TooManySymbols)?;
        self.grammar
            .nonterminals
            .insert(id, Nonterminal::new(id, name));
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// Hints among the operands bind to the dot position in front of the
    /// next symbol, or to the end of the production if no symbol follows.
    pub fn production<I>(
        &mut self,
        left: NonterminalID,
        operands: I,
    ) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = Operand>,
    {
        let mut right = vec![];
        let mut hints = vec![];
        for operand in operands {
            match operand {
                Operand::T(t) => right.push(SymbolID::T(t)),
                Operand::N(n) => right.push(SymbolID::N(n)),
                Operand::Hint(hint) => {
                    let position =
                        u16::try_from(right.len()).map_err(|_| GrammarDefError::TooManySymbols)?;
                    hints.push((position, hint));
                }
            }
        }

        let g = &self.grammar;
        if !g.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UnknownSymbol(SymbolID::N(left)));
        }
        if let Some(p) = g
            .productions
            .values()
            .find(|p| p.left == left && p.right == right)
        {
            return Err(GrammarDefError::DuplicateProduction(
                p.display(g).to_string(),
            ));
        }

        let id = ProductionID(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or(GrammarDefError::TooManySymbols)?;

        let mut production = Production::new(id, left, right);
        production.hints = hints;
        self.grammar.productions.insert(id, production);
        if let Some(nonterminal) = self.grammar.nonterminals.get_mut(&left) {
            nonterminal
                .productions
                .get_or_insert_with(Vec::new)
                .push(id);
        }

        Ok(id)
    }

    /// Flag the terminals as operators of the given precedence.
    pub fn register_operators<I>(
        &mut self,
        priority: u16,
        assoc: Assoc,
        terminals: I,
    ) -> Result<(), GrammarDefError>
    where
        I: IntoIterator<Item = TerminalID>,
    {
        for id in terminals {
            let terminal = self
                .grammar
                .terminals
                .get_mut(&id)
                .ok_or(GrammarDefError::UnknownSymbol(SymbolID::T(id)))?;
            terminal.flags.insert(TermFlags::OPERATOR);
            terminal.precedence = Some(Precedence::new(priority, assoc));
        }
        Ok(())
    }

    pub fn mark_transient(&mut self, id: NonterminalID) -> Result<(), GrammarDefError> {
        self.nonterminal_mut(id)?.flags.insert(TermFlags::TRANSIENT);
        Ok(())
    }

    pub fn mark_list(&mut self, id: NonterminalID) -> Result<(), GrammarDefError> {
        self.nonterminal_mut(id)?.flags.insert(TermFlags::IS_LIST);
        Ok(())
    }

    /// Suppress the syntax tree node of the nonterminal.
    pub fn mark_no_ast_node(&mut self, id: NonterminalID) -> Result<(), GrammarDefError> {
        self.nonterminal_mut(id)?
            .flags
            .insert(TermFlags::NO_AST_NODE);
        Ok(())
    }

    /// Bind the nonterminal to a syntax tree node type.
    pub fn ast_node(
        &mut self,
        id: NonterminalID,
        node_type: impl Into<Cow<'static, str>>,
    ) -> Result<(), GrammarDefError> {
        self.nonterminal_mut(id)?.ast_node = Some(node_type.into());
        Ok(())
    }

    fn nonterminal_mut(&mut self, id: NonterminalID) -> Result<&mut Nonterminal, GrammarDefError> {
        self.grammar
            .nonterminals
            .get_mut(&id)
            .ok_or(GrammarDefError::UnknownSymbol(SymbolID::N(id)))
    }

    /// Specify the root symbol for this grammar.
    pub fn root(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        self.grammar.root.replace(symbol);
        Ok(())
    }

    /// Add an auxiliary entry point, e.g. for parsing standalone expressions.
    pub fn snippet_root(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if !self.grammar.snippet_roots.contains(&symbol) {
            self.grammar.snippet_roots.push(symbol);
        }
        Ok(())
    }

    /// Register the callback consulted at parse time by conflicts resolved
    /// with [`GrammarHint::ResolveInCode`].
    pub fn on_conflict<F>(&mut self, f: F)
    where
        F: Fn(&ConflictArgs<'_>) -> Option<Preference> + Send + Sync + 'static,
    {
        self.grammar.on_conflict = Some(ConflictHandler(Arc::new(f)));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("the symbol name must not be empty")]
    EmptyName,

    #[error("the terminal `{0}' has already been declared")]
    DuplicateTerminal(String),

    #[error("the nonterminal `{0}' has already been declared")]
    DuplicateNonterminal(String),

    #[error("duplicate production rule detected: {0}")]
    DuplicateProduction(String),

    #[error("unknown symbol: {0:?}")]
    UnknownSymbol(SymbolID),

    #[error("too many symbols in the grammar")]
    TooManySymbols,

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Operand::*;

    #[test]
    fn hints_bind_to_dot_positions() {
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let id = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            g.production(
                e,
                [
                    N(e),
                    Hint(GrammarHint::ResolveToShift),
                    T(plus),
                    N(e),
                    Hint(GrammarHint::ResolveToReduce),
                ],
            )?;
            g.production(e, [T(id)])?;
            g.root(e)?;
            Ok(())
        })
        .unwrap();

        let production = grammar.productions.first().unwrap().1;
        let positions: Vec<_> = production.hints().iter().map(|(at, _)| *at).collect();
        assert_eq!(positions, [1, 3]);
        assert_eq!(production.display(&grammar).to_string(), "E -> E + E");
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let err = Grammar::define(|g| {
            g.terminal("a")?;
            g.terminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateTerminal(name) if name == "a"));

        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.production(s, [T(a)])?;
            g.production(s, [T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateProduction(..)));
    }

    #[test]
    fn production_set_is_absent_until_attached() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let _ = g.nonterminal("Unused")?;
            g.production(s, [T(a)])?;
            Ok(())
        })
        .unwrap();

        let mut nonterminals = grammar.nonterminals.values();
        assert_eq!(
            nonterminals.next().unwrap().productions().map(<[_]>::len),
            Some(1)
        );
        assert!(nonterminals.next().unwrap().productions().is_none());
    }

    #[test]
    fn operators_carry_precedence() {
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let star = g.terminal("*")?;
            g.register_operators(1, Assoc::Left, [plus])?;
            g.register_operators(2, Assoc::Right, [star])?;
            Ok(())
        })
        .unwrap();

        let star = grammar
            .terminals
            .values()
            .find(|t| t.name() == "*")
            .unwrap();
        assert!(star.is_operator());
        assert_eq!(star.precedence(), Some(Precedence::new(2, Assoc::Right)));
    }
}
