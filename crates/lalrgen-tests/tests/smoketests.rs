use anyhow::Context as _;
use lalrgen::{
    grammar::{Grammar, GrammarDef, GrammarDefError},
    ParserData,
};
use lalrgen_tests::grammars;
use tracing_subscriber::EnvFilter;

fn smoketest_grammar(
    f: impl FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
) -> anyhow::Result<ParserData> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let grammar = Grammar::define(f).context("failed to define the grammar")?;
    eprintln!("grammar:\n{}", grammar);
    eprintln!();
    let data = lalrgen::build(&grammar).context("failed to build the automaton")?;
    eprintln!("states:\n---\n{}", data.display());
    eprintln!("diagnostics:\n---\n{}", data.diagnostics);

    assert!(!data.diagnostics.has_errors());
    Ok(data)
}

#[test]
fn smoketest_nested_ab() -> anyhow::Result<()> {
    smoketest_grammar(grammars::nested_ab)?;
    Ok(())
}

#[test]
fn smoketest_a_star_b_star() -> anyhow::Result<()> {
    smoketest_grammar(grammars::a_star_b_star)?;
    Ok(())
}

#[test]
fn smoketest_dangling_else() -> anyhow::Result<()> {
    smoketest_grammar(grammars::dangling_else)?;
    Ok(())
}

#[test]
fn smoketest_dangling_else_in_code() -> anyhow::Result<()> {
    smoketest_grammar(grammars::dangling_else_in_code)?;
    Ok(())
}

#[test]
fn smoketest_dangling_else_shift_hint() -> anyhow::Result<()> {
    smoketest_grammar(grammars::dangling_else_shift_hint)?;
    Ok(())
}

#[test]
fn smoketest_power_and_equality() -> anyhow::Result<()> {
    smoketest_grammar(grammars::power_and_equality)?;
    Ok(())
}

#[test]
fn smoketest_arithmetic() -> anyhow::Result<()> {
    smoketest_grammar(grammars::arithmetic)?;
    Ok(())
}

#[test]
fn smoketest_arithmetic_reduce_hint() -> anyhow::Result<()> {
    smoketest_grammar(grammars::arithmetic_reduce_hint)?;
    Ok(())
}

#[test]
fn smoketest_reduce_reduce() -> anyhow::Result<()> {
    smoketest_grammar(grammars::reduce_reduce)?;
    Ok(())
}

#[test]
fn smoketest_generic_arguments() -> anyhow::Result<()> {
    smoketest_grammar(grammars::generic_arguments)?;
    Ok(())
}

#[test]
fn smoketest_statements_with_snippet() -> anyhow::Result<()> {
    smoketest_grammar(grammars::statements_with_snippet)?;
    Ok(())
}

#[test]
fn smoketest_expr_factor_term() -> anyhow::Result<()> {
    smoketest_grammar(grammars::expr_factor_term)?;
    Ok(())
}

#[test]
fn smoketest_json() -> anyhow::Result<()> {
    smoketest_grammar(grammars::json)?;
    Ok(())
}
