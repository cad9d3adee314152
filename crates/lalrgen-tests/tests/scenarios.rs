use anyhow::Context as _;
use lalrgen::{
    grammar::{Grammar, GrammarDef, GrammarDefError},
    BuildError, Config, GrammarErrorLevel, ParserAction, ParserData, ProductionID, Resolution,
    TerminalID,
};
use lalrgen_tests::{
    driver::{parse, production, tokens},
    grammars,
};
use std::collections::HashSet;

type GrammarFn = fn(&mut GrammarDef) -> Result<(), GrammarDefError>;

const ALL_GRAMMARS: &[GrammarFn] = &[
    grammars::nested_ab,
    grammars::a_star_b_star,
    grammars::dangling_else,
    grammars::dangling_else_in_code,
    grammars::dangling_else_shift_hint,
    grammars::arithmetic,
    grammars::arithmetic_reduce_hint,
    grammars::power_and_equality,
    grammars::reduce_reduce,
    grammars::generic_arguments,
    grammars::statements_with_snippet,
    grammars::expr_factor_term,
    grammars::json,
];

fn build(f: GrammarFn) -> anyhow::Result<ParserData> {
    let grammar = Grammar::define(f)?;
    let data = lalrgen::build(&grammar)?;
    Ok(data)
}

fn accepts(data: &ParserData, input: &str) -> anyhow::Result<Vec<ProductionID>> {
    let initial = data.initial_state().context("no initial state")?;
    parse(data, initial, &tokens(data, input)?)
}

fn conflicts(data: &ParserData) -> usize {
    data.diagnostics
        .with_level(GrammarErrorLevel::Conflict)
        .count()
}

#[test]
fn nested_ab_is_conflict_free() -> anyhow::Result<()> {
    let data = build(grammars::nested_ab)?;

    let s = data
        .grammar
        .nonterminals
        .values()
        .find(|n| n.name() == Some("S"))
        .context("missing S")?;
    assert!(s.is_nullable());
    assert_eq!(data.diagnostics.max_level(), None);

    for input in ["", "a b", "a a a b b b"] {
        accepts(&data, input).with_context(|| format!("rejected `{}'", input))?;
    }
    for input in ["a", "a a b", "b a"] {
        assert!(accepts(&data, input).is_err(), "accepted `{}'", input);
    }
    Ok(())
}

#[test]
fn nullable_lists_read_through_gotos() -> anyhow::Result<()> {
    let data = build(grammars::a_star_b_star)?;
    assert_eq!(data.diagnostics.max_level(), None);

    // `S -> . A B` reduces `A -> ε` on `b` and on `EOF`, the latter read through `B`.
    let initial = data.state(data.initial_state().context("no initial state")?);
    let b = tokens(&data, "b")?[0];
    let empty_a = production(&data, "A -> ε")?;
    for lookahead in [b, TerminalID::EOF] {
        assert!(
            matches!(initial.action(lookahead), Some(ParserAction::Reduce(p)) if *p == empty_a),
            "{:?}",
            initial.action(lookahead)
        );
    }

    for input in ["", "a a", "b", "a b b"] {
        accepts(&data, input).with_context(|| format!("rejected `{}'", input))?;
    }
    assert!(accepts(&data, "b a").is_err());
    Ok(())
}

#[test]
fn dangling_else_defaults_to_shift() -> anyhow::Result<()> {
    let data = build(grammars::dangling_else)?;

    let reported: Vec<_> = data
        .diagnostics
        .with_level(GrammarErrorLevel::Conflict)
        .collect();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("shift-reduce"));
    assert!(reported[0].message.contains("else"));

    let else_ = tokens(&data, "else")?[0];
    let state = data.state(reported[0].state.context("conflict without state")?);
    assert!(state.reported_conflicts.contains(else_));
    assert!(matches!(
        state.actions.get(&else_),
        Some(ParserAction::Shift(..))
    ));

    // The `else` binds to the innermost `if`.
    let reductions = accepts(&data, "if cond then if cond then other else other")?;
    assert_eq!(
        reductions.last(),
        Some(&production(&data, "Stmt -> if cond then Stmt")?)
    );
    Ok(())
}

#[test]
fn dangling_else_resolved_in_code() -> anyhow::Result<()> {
    let data = build(grammars::dangling_else_in_code)?;
    assert_eq!(conflicts(&data), 0);

    let else_ = tokens(&data, "else")?[0];
    assert!(data
        .states
        .iter()
        .any(|s| matches!(s.actions.get(&else_), Some(ParserAction::Code { .. }))));

    // The callback binds the `else` to the outer `if`.
    let reductions = accepts(&data, "if cond then if cond then other else other")?;
    let short_if = production(&data, "Stmt -> if cond then Stmt")?;
    let if_else = production(&data, "Stmt -> if cond then Stmt else Stmt")?;
    assert_eq!(reductions[1], short_if);
    assert_eq!(reductions.last(), Some(&if_else));
    Ok(())
}

#[test]
fn shift_hint_settles_dangling_else_silently() -> anyhow::Result<()> {
    let data = build(grammars::dangling_else_shift_hint)?;
    assert_eq!(conflicts(&data), 0);

    let else_ = tokens(&data, "else")?[0];
    let state = data
        .states
        .iter()
        .find(|s| s.resolved_conflicts.contains(else_))
        .context("the conflict on `else' was not resolved")?;
    assert!(!state.reported_conflicts.contains(else_));
    assert!(matches!(
        state.actions.get(&else_),
        Some(ParserAction::Shift(..))
    ));

    let reductions = accepts(&data, "if cond then if cond then other else other")?;
    assert_eq!(
        reductions.last(),
        Some(&production(&data, "Stmt -> if cond then Stmt")?)
    );
    Ok(())
}

#[test]
fn arithmetic_resolved_by_precedence() -> anyhow::Result<()> {
    let data = build(grammars::arithmetic)?;
    assert_eq!(conflicts(&data), 0);

    let sum = production(&data, "E -> E + E")?;
    let product = production(&data, "E -> E * E")?;
    let id = production(&data, "E -> id")?;

    let operator_shifts = data
        .states
        .iter()
        .flat_map(|s| s.actions.values())
        .filter(|a| matches!(a, ParserAction::OperatorShift { .. }))
        .count();
    assert_eq!(operator_shifts, 4);

    assert_eq!(accepts(&data, "id + id * id")?, [id, id, id, product, sum]);
    assert_eq!(accepts(&data, "id * id + id")?, [id, id, product, id, sum]);
    assert_eq!(accepts(&data, "id + id + id")?, [id, id, sum, id, sum]);
    assert_eq!(
        accepts(&data, "id * id * id")?,
        [id, id, product, id, product]
    );
    Ok(())
}

#[test]
fn operator_decision_prefers_reduce_on_tie() -> anyhow::Result<()> {
    let data = build(grammars::arithmetic)?;
    let plus = tokens(&data, "+")?[0];
    let star = tokens(&data, "*")?[0];
    let sum = production(&data, "E -> E + E")?;
    let product = production(&data, "E -> E * E")?;
    let target = data.initial_state().context("no initial state")?;

    assert_eq!(
        data.resolve_operator(plus, target, sum),
        Resolution::Reduce(sum)
    );
    assert_eq!(
        data.resolve_operator(star, target, sum),
        Resolution::Shift(target)
    );
    assert_eq!(
        data.resolve_operator(plus, target, product),
        Resolution::Reduce(product)
    );
    assert_eq!(
        data.resolve_operator(star, target, product),
        Resolution::Reduce(product)
    );
    Ok(())
}

#[test]
fn right_and_non_associative_operators() -> anyhow::Result<()> {
    let data = build(grammars::power_and_equality)?;
    assert_eq!(conflicts(&data), 0);

    let power = production(&data, "E -> E ^ E")?;
    let equal = production(&data, "E -> E == E")?;
    let id = production(&data, "E -> id")?;

    assert_eq!(accepts(&data, "id ^ id ^ id")?, [id, id, id, power, power]);
    assert_eq!(accepts(&data, "id == id ^ id")?, [id, id, id, power, equal]);
    assert!(accepts(&data, "id == id == id").is_err());

    let pow = tokens(&data, "^")?[0];
    let eq = tokens(&data, "==")?[0];
    let target = data.initial_state().context("no initial state")?;
    assert_eq!(
        data.resolve_operator(pow, target, power),
        Resolution::Shift(target)
    );
    assert_eq!(data.resolve_operator(eq, target, equal), Resolution::Fail);
    assert_eq!(
        data.resolve_operator(eq, target, power),
        Resolution::Reduce(power)
    );
    Ok(())
}

#[test]
fn reduce_hint_overrides_precedence() -> anyhow::Result<()> {
    let data = build(grammars::arithmetic_reduce_hint)?;
    assert_eq!(conflicts(&data), 0);

    let star = tokens(&data, "*")?[0];
    let sum = production(&data, "E -> E + E")?;
    let product = production(&data, "E -> E * E")?;
    let id = production(&data, "E -> id")?;

    let state = data
        .states
        .iter()
        .find(|s| {
            s.lookaheads
                .keys()
                .any(|item| data.grammar.item(*item).production == sum)
        })
        .context("no state reducing the sum")?;
    assert!(matches!(state.actions.get(&star), Some(ParserAction::Reduce(p)) if *p == sum));

    assert_eq!(accepts(&data, "id + id * id")?, [id, id, sum, id, product]);
    Ok(())
}

#[test]
fn null_production_set_is_fatal() -> anyhow::Result<()> {
    let grammar = Grammar::define(grammars::null_production_set)?;
    let err = match lalrgen::build(&grammar) {
        Ok(..) => anyhow::bail!("the build should fail"),
        Err(err) => err,
    };

    let BuildError::Structural(diagnostics) = &err;
    assert_eq!(diagnostics.max_level(), Some(GrammarErrorLevel::Error));
    assert!(diagnostics.iter().any(|d| d.message.contains("`Missing'")));
    assert!(err.to_string().contains("structural errors"));
    Ok(())
}

#[test]
fn reduce_item_without_lookaheads_is_reported() -> anyhow::Result<()> {
    let data = build(grammars::error_only_follow)?;

    let internal: Vec<_> = data
        .diagnostics
        .with_level(GrammarErrorLevel::InternalError)
        .collect();
    assert_eq!(internal.len(), 1);
    assert!(internal[0].message.contains("`A -> x .'"));

    let state = data.state(internal[0].state.context("diagnostic without state")?);
    assert!(state.default_action.is_none());
    assert!(!state
        .actions
        .values()
        .any(|action| matches!(action, ParserAction::Reduce(..))));
    Ok(())
}

#[test]
fn reduce_reduce_prefers_first_declared_production() -> anyhow::Result<()> {
    let data = build(grammars::reduce_reduce)?;

    let reported: Vec<_> = data
        .diagnostics
        .with_level(GrammarErrorLevel::Conflict)
        .collect();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("reduce-reduce"));

    let semi = tokens(&data, ";")?[0];
    let state = data.state(reported[0].state.context("conflict without state")?);
    let first = production(&data, "B -> x")?;
    assert!(matches!(state.actions.get(&semi), Some(ParserAction::Reduce(p)) if *p == first));
    Ok(())
}

#[test]
fn token_preview_decides_at_parse_time() -> anyhow::Result<()> {
    let data = build(grammars::generic_arguments)?;
    assert_eq!(conflicts(&data), 0);

    let comparison = production(&data, "Expr -> Expr < Primary")?;
    let type_args = production(&data, "TypeArgs -> < id >")?;

    let reductions = accepts(&data, "id < id ;")?;
    assert!(reductions.contains(&comparison));
    assert!(!reductions.contains(&type_args));

    let reductions = accepts(&data, "id < id > ;")?;
    assert!(reductions.contains(&type_args));
    assert!(!reductions.contains(&comparison));
    Ok(())
}

#[test]
fn snippet_roots_share_states() -> anyhow::Result<()> {
    let data = build(grammars::statements_with_snippet)?;
    assert_eq!(data.initial_states.len(), 2);

    let expr = data
        .grammar
        .nonterminals
        .values()
        .find(|n| n.name() == Some("Expr"))
        .context("missing Expr")?
        .id();
    let program = data.initial_state().context("no initial state")?;
    let snippet = data.initial_state_of(expr).context("no snippet state")?;
    assert_ne!(program, snippet);

    let num = tokens(&data, "num")?[0];
    let shift_num = |state| {
        data.state(state)
            .actions
            .get(&num)
            .and_then(ParserAction::shift_target)
    };
    assert_eq!(shift_num(program), shift_num(snippet));
    assert!(shift_num(program).is_some());

    parse(&data, program, &tokens(&data, "num ; ( num + num ) ;")?)?;
    parse(&data, snippet, &tokens(&data, "num + ( num )")?)?;
    assert!(parse(&data, snippet, &tokens(&data, "num ;")?).is_err());

    // Non-grammar terminals are kept although no production refers to them.
    let comment = tokens(&data, "comment")?[0];
    assert!(data.grammar.reachable_terminals.contains(&comment));
    Ok(())
}

#[test]
fn build_is_idempotent() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let grammar = Grammar::define(f)?;
        let first = lalrgen::build(&grammar)?;
        let second = lalrgen::build(&grammar)?;
        assert_eq!(first.display().to_string(), second.display().to_string());
        assert_eq!(first.diagnostics.len(), second.diagnostics.len());
    }
    Ok(())
}

#[test]
fn kernels_are_unique() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let data = build(*f)?;
        let kernels: HashSet<_> = data.states.iter().map(|s| s.kernel.clone()).collect();
        assert_eq!(kernels.len(), data.states.len());
    }
    Ok(())
}

#[test]
fn reduce_items_have_lookaheads() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let data = build(*f)?;
        assert!(!data.diagnostics.has_errors());
        for state in data.states.iter().filter(|s| s.is_inadequate) {
            assert!(!state.lookaheads.is_empty());
            for lookaheads in state.lookaheads.values() {
                assert!(!lookaheads.is_empty());
                assert!(!lookaheads.contains(TerminalID::SYNTAX_ERROR));
            }
        }
    }
    Ok(())
}

#[test]
fn conflicts_are_always_resolved() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let data = build(*f)?;
        for state in &data.states {
            for conflict in state.reported_conflicts.iter() {
                assert!(state.resolved_conflicts.contains(conflict));
                assert!(state.actions.contains_key(&conflict));
            }
        }
    }
    Ok(())
}

#[test]
fn every_root_reaches_accept() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let data = build(*f)?;
        for (root, initial) in &data.initial_states {
            let after_root = data
                .state(*initial)
                .goto(*root)
                .context("no goto over the root")?;
            assert!(matches!(
                data.state(after_root).actions.get(&TerminalID::EOF),
                Some(ParserAction::Accept)
            ));
        }
    }
    Ok(())
}

#[test]
fn expected_terminals_exclude_pseudo_terminals() -> anyhow::Result<()> {
    for f in ALL_GRAMMARS {
        let data = build(*f)?;
        for state in &data.states {
            assert!(!state.expected_terminals.contains(TerminalID::EOF));
            assert!(!state.expected_terminals.contains(TerminalID::SYNTAX_ERROR));
        }
    }

    let data = build(grammars::json)?;
    assert!(data.states.iter().any(|s| s
        .actions
        .contains_key(&TerminalID::SYNTAX_ERROR)));
    Ok(())
}

#[test]
fn lookaheads_can_be_dropped() -> anyhow::Result<()> {
    let grammar = Grammar::define(grammars::dangling_else)?;
    let data = Config::new().keep_lookaheads(false).build(&grammar)?;
    assert!(data.states.iter().all(|s| s.lookaheads.is_empty()));
    assert_eq!(conflicts(&data), 1);
    Ok(())
}
