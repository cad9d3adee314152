//! Hints attached to production positions that steer conflict resolution.

use crate::grammar::{Assoc, Precedence, SymbolID, TerminalID};
use std::{borrow::Cow, fmt, sync::Arc};

#[derive(Clone)]
pub enum GrammarHint {
    /// Keep the shift when a conflict arises at this position.
    ResolveToShift,
    /// Reduce the production at this position instead of shifting.
    ResolveToReduce,
    /// Defer the decision to the callback registered with `on_conflict`.
    ResolveInCode,
    /// Override the precedence derived from the operator terminals.
    Precedence(Precedence),
    Custom(CustomHint),
}

impl GrammarHint {
    pub fn imply_precedence(priority: u16, assoc: Assoc) -> Self {
        Self::Precedence(Precedence::new(priority, assoc))
    }

    /// See [`CustomHint::reduce_if`].
    pub fn reduce_if<I>(symbol: TerminalID, comes_before: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self::Custom(CustomHint::reduce_if(symbol, comes_before))
    }

    /// See [`CustomHint::shift_if`].
    pub fn shift_if<I>(symbol: TerminalID, comes_before: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self::Custom(CustomHint::shift_if(symbol, comes_before))
    }
}

impl fmt::Debug for GrammarHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveToShift => f.write_str("ResolveToShift"),
            Self::ResolveToReduce => f.write_str("ResolveToReduce"),
            Self::ResolveInCode => f.write_str("ResolveInCode"),
            Self::Precedence(prec) => f.debug_tuple("Precedence").field(prec).finish(),
            Self::Custom(hint) => f.debug_tuple("Custom").field(hint).finish(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Preference {
    Shift,
    Reduce,
}

/// The parse-time context handed to conflict resolvers.
#[derive(Debug, Copy, Clone)]
pub struct ConflictArgs<'a> {
    /// The lookahead terminal at which the conflict occurs.
    pub lookahead: TerminalID,
    /// Tokens following the lookahead, as far as the scanner has previewed.
    pub preview: &'a [TerminalID],
    /// Symbols on the parser stack, bottom first.
    pub stack: &'a [SymbolID],
}

type Matcher = dyn Fn(&ConflictArgs<'_>) -> Option<Preference> + Send + Sync;

/// A user-defined resolution rule evaluated when the parser hits the conflict.
#[derive(Clone)]
pub struct CustomHint {
    label: Cow<'static, str>,
    matcher: Arc<Matcher>,
}

impl CustomHint {
    pub fn new<F>(label: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&ConflictArgs<'_>) -> Option<Preference> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            matcher: Arc::new(f),
        }
    }

    /// Reduce if `symbol` shows up before any of `comes_before` or `EOF`.
    ///
    /// The scan starts at the conflicting lookahead itself and then walks
    /// [`ConflictArgs::preview`]. It is bounded only by how far the scanner
    /// has previewed.
    pub fn reduce_if<I>(symbol: TerminalID, comes_before: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self::token_preview("reduce_if", Preference::Reduce, symbol, comes_before)
    }

    /// Shift if `symbol` shows up before any of `comes_before` or `EOF`,
    /// scanning the same window as [`CustomHint::reduce_if`].
    pub fn shift_if<I>(symbol: TerminalID, comes_before: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self::token_preview("shift_if", Preference::Shift, symbol, comes_before)
    }

    fn token_preview<I>(
        label: &'static str,
        preference: Preference,
        symbol: TerminalID,
        comes_before: I,
    ) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        let stops: Vec<TerminalID> = comes_before.into_iter().collect();
        Self::new(label, move |args| {
            let tokens = std::iter::once(args.lookahead)
                .chain(args.preview.iter().copied());
            for token in tokens {
                if token == symbol {
                    return Some(preference);
                }
                if token == TerminalID::EOF || stops.contains(&token) {
                    return None;
                }
            }
            None
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn evaluate(&self, args: &ConflictArgs<'_>) -> Option<Preference> {
        (self.matcher)(args)
    }
}

impl fmt::Debug for CustomHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHint")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// The grammar-level callback consulted by [`GrammarHint::ResolveInCode`].
#[derive(Clone)]
pub struct ConflictHandler(pub Arc<Matcher>);

impl ConflictHandler {
    pub fn call(&self, args: &ConflictArgs<'_>) -> Option<Preference> {
        (self.0)(args)
    }
}

impl fmt::Debug for ConflictHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConflictHandler(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELSE: TerminalID = TerminalID::from_raw(5);
    const SEMI: TerminalID = TerminalID::from_raw(6);
    const ID: TerminalID = TerminalID::from_raw(7);

    fn args<'a>(lookahead: TerminalID, preview: &'a [TerminalID]) -> ConflictArgs<'a> {
        ConflictArgs {
            lookahead,
            preview,
            stack: &[],
        }
    }

    #[test]
    fn token_preview_finds_symbol_ahead() {
        let hint = CustomHint::reduce_if(ELSE, [SEMI]);
        assert_eq!(
            hint.evaluate(&args(ID, &[ID, ELSE])),
            Some(Preference::Reduce)
        );
    }

    #[test]
    fn token_preview_includes_the_lookahead() {
        let hint = CustomHint::reduce_if(ELSE, [SEMI]);
        assert_eq!(hint.evaluate(&args(ELSE, &[])), Some(Preference::Reduce));
        // A stop symbol as the lookahead ends the scan before the preview.
        assert_eq!(hint.evaluate(&args(SEMI, &[ELSE])), None);
    }

    #[test]
    fn token_preview_stops_at_boundaries() {
        let hint = CustomHint::shift_if(ELSE, [SEMI]);
        assert_eq!(hint.evaluate(&args(ID, &[SEMI, ELSE])), None);
        assert_eq!(hint.evaluate(&args(ID, &[TerminalID::EOF, ELSE])), None);
        assert_eq!(hint.evaluate(&args(ID, &[ID])), None);
    }
}
