//! A minimal table-driven parser used to exercise the generated automata.

use anyhow::{bail, Context as _};
use lalrgen::{
    ConflictArgs, ParserAction, ParserData, ProductionID, Resolution, StateID, SymbolID,
    TerminalID,
};

/// Run the token sequence from the given initial state and return the
/// productions in the order they were reduced.
pub fn parse(
    data: &ParserData,
    initial: StateID,
    input: &[TerminalID],
) -> anyhow::Result<Vec<ProductionID>> {
    let g = &data.grammar;
    let mut states = vec![initial];
    let mut symbols: Vec<SymbolID> = vec![];
    let mut reductions = vec![];
    let mut pos = 0;

    loop {
        let lookahead = input.get(pos).copied().unwrap_or(TerminalID::EOF);
        let current = *states.last().context("the state stack is empty")?;
        let state = data.state(current);
        let action = state.action(lookahead).with_context(|| {
            format!(
                "unexpected `{}' at {} in {}",
                g.terminal_name(lookahead),
                pos,
                state.name
            )
        })?;

        let decision = match action {
            ParserAction::Shift(target) => Resolution::Shift(*target),
            ParserAction::Reduce(production) => Resolution::Reduce(*production),
            ParserAction::Accept => return Ok(reductions),
            ParserAction::OperatorShift { target, reduce } => {
                data.resolve_operator(lookahead, *target, *reduce)
            }
            ParserAction::Code {
                shift,
                reduce,
                resolver,
            } => {
                let args = ConflictArgs {
                    lookahead,
                    preview: input.get(pos + 1..).unwrap_or(&[]),
                    stack: &symbols,
                };
                resolver.resolve(*shift, *reduce, &args)
            }
        };

        match decision {
            Resolution::Shift(target) => {
                states.push(target);
                symbols.push(SymbolID::T(lookahead));
                pos += 1;
            }
            Resolution::Reduce(id) => {
                let production = g.production(id);
                let depth = states
                    .len()
                    .checked_sub(production.right().len())
                    .filter(|&depth| depth > 0)
                    .with_context(|| format!("underflow on `{}'", production.display(g)))?;
                states.truncate(depth);
                symbols.truncate(depth - 1);

                let top = data.state(states[depth - 1]);
                let left = production.left();
                let goto = top.goto(left).with_context(|| {
                    format!("no goto on `{}' in {}", g.nonterminal_name(left), top.name)
                })?;
                states.push(goto);
                symbols.push(SymbolID::N(left));
                reductions.push(id);
            }
            Resolution::Fail => bail!("`{}' failed in {}", g.terminal_name(lookahead), state.name),
        }
    }
}

/// Look up terminals by name.
pub fn tokens(data: &ParserData, input: &str) -> anyhow::Result<Vec<TerminalID>> {
    input
        .split_whitespace()
        .map(|name| {
            data.grammar
                .terminals
                .values()
                .find(|t| t.name() == name)
                .map(|t| t.id())
                .with_context(|| format!("unknown terminal `{}'", name))
        })
        .collect()
}

/// Look up a production by its rendering, e.g. `"E -> E + E"`.
pub fn production(data: &ParserData, display: &str) -> anyhow::Result<ProductionID> {
    data.grammar
        .productions
        .values()
        .find(|p| p.display(&data.grammar).to_string() == display)
        .map(|p| p.id())
        .with_context(|| format!("no production `{}'", display))
}
