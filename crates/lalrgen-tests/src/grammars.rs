//! Grammar definitions for integration tests.

use lalrgen::{
    grammar::{GrammarDef, GrammarDefError, Operand::*},
    hint::{GrammarHint, Preference},
    Assoc, SymbolID, TerminalID, TokenCategory,
};

type Result = std::result::Result<(), GrammarDefError>;

/// `S -> a S b | ε`
pub fn nested_ab(g: &mut GrammarDef) -> Result {
    let a = g.terminal("a")?;
    let b = g.terminal("b")?;
    let s = g.nonterminal("S")?;

    g.root(s)?;

    g.production(s, [T(a), N(s), T(b)])?;
    g.production(s, [])?;
    Ok(())
}

/// `S -> A B`, `A -> a A | ε`, `B -> b B | ε`
pub fn a_star_b_star(g: &mut GrammarDef) -> Result {
    let a = g.terminal("a")?;
    let b = g.terminal("b")?;
    let s = g.nonterminal("S")?;
    let a_list = g.nonterminal("A")?;
    let b_list = g.nonterminal("B")?;

    g.root(s)?;

    g.production(s, [N(a_list), N(b_list)])?;
    g.production(a_list, [T(a), N(a_list)])?;
    g.production(a_list, [])?;
    g.production(b_list, [T(b), N(b_list)])?;
    g.production(b_list, [])?;
    Ok(())
}

fn if_statement(
    g: &mut GrammarDef,
    short_if_hint: Option<GrammarHint>,
    else_hint: Option<GrammarHint>,
) -> std::result::Result<TerminalID, GrammarDefError> {
    let if_ = g.keyword("if")?;
    let then = g.keyword("then")?;
    let else_ = g.keyword("else")?;
    let other = g.terminal("other")?;
    let cond = g.terminal("cond")?;
    let stmt = g.nonterminal("Stmt")?;

    g.root(stmt)?;

    let mut short_if = vec![T(if_), T(cond), T(then), N(stmt)];
    short_if.extend(short_if_hint.map(Hint));
    g.production(stmt, short_if)?;
    let mut if_else = vec![T(if_), T(cond), T(then), N(stmt)];
    if_else.extend(else_hint.map(Hint));
    if_else.extend([T(else_), N(stmt)]);
    g.production(stmt, if_else)?;
    g.production(stmt, [T(other)])?;
    Ok(if_)
}

/// The classic dangling else.
pub fn dangling_else(g: &mut GrammarDef) -> Result {
    if_statement(g, None, None)?;
    Ok(())
}

/// The dangling else, settled in favor of the shift by a hint in front of `else`.
pub fn dangling_else_shift_hint(g: &mut GrammarDef) -> Result {
    if_statement(g, None, Some(GrammarHint::ResolveToShift))?;
    Ok(())
}

/// The dangling else with the decision deferred to the conflict callback,
/// which binds an `else` to the outermost `if`.
pub fn dangling_else_in_code(g: &mut GrammarDef) -> Result {
    let if_ = if_statement(g, Some(GrammarHint::ResolveInCode), None)?;
    g.on_conflict(move |args| {
        let open_ifs = args
            .stack
            .iter()
            .filter(|symbol| **symbol == SymbolID::T(if_))
            .count();
        Some(if open_ifs > 1 {
            Preference::Reduce
        } else {
            Preference::Shift
        })
    });
    Ok(())
}

fn arithmetic_with(g: &mut GrammarDef, sum_hint: Option<GrammarHint>) -> Result {
    let plus = g.terminal("+")?;
    let star = g.terminal("*")?;
    let id = g.terminal("id")?;
    let e = g.nonterminal("E")?;

    g.register_operators(1, Assoc::Left, [plus])?;
    g.register_operators(2, Assoc::Left, [star])?;
    g.root(e)?;

    let mut sum = vec![N(e), T(plus), N(e)];
    sum.extend(sum_hint.map(Hint));
    g.production(e, sum)?;
    g.production(e, [N(e), T(star), N(e)])?;
    g.production(e, [T(id)])?;
    Ok(())
}

/// `E -> E + E | E * E | id`, with `*` binding tighter than `+`.
pub fn arithmetic(g: &mut GrammarDef) -> Result {
    arithmetic_with(g, None)
}

/// Same as [`arithmetic`], but always reducing `E -> E + E`.
pub fn arithmetic_reduce_hint(g: &mut GrammarDef) -> Result {
    arithmetic_with(g, Some(GrammarHint::ResolveToReduce))
}

/// `E -> E ^ E | E == E | id`, with a right-associative `^` and a
/// non-associative `==`.
pub fn power_and_equality(g: &mut GrammarDef) -> Result {
    let pow = g.terminal("^")?;
    let eq = g.terminal("==")?;
    let id = g.terminal("id")?;
    let e = g.nonterminal("E")?;

    g.register_operators(1, Assoc::Nonassoc, [eq])?;
    g.register_operators(2, Assoc::Right, [pow])?;
    g.root(e)?;

    g.production(e, [N(e), T(pow), N(e)])?;
    g.production(e, [N(e), T(eq), N(e)])?;
    g.production(e, [T(id)])?;
    Ok(())
}

/// `A -> x .` is only ever followed by `SYNTAX_ERROR`, which leaves it
/// without lookaheads.
pub fn error_only_follow(g: &mut GrammarDef) -> Result {
    let x = g.terminal("x")?;
    let y = g.terminal("y")?;
    let s = g.nonterminal("S")?;
    let a = g.nonterminal("A")?;

    g.root(s)?;

    g.production(s, [N(a), T(TerminalID::SYNTAX_ERROR)])?;
    g.production(a, [T(x)])?;
    g.production(a, [T(x), T(y)])?;
    Ok(())
}

/// A nonterminal which never received a production.
pub fn null_production_set(g: &mut GrammarDef) -> Result {
    let x = g.terminal("x")?;
    let s = g.nonterminal("S")?;
    let missing = g.nonterminal("Missing")?;

    g.root(s)?;

    g.production(s, [T(x), N(missing)])?;
    Ok(())
}

/// Two reductions competing for the same lookahead.
pub fn reduce_reduce(g: &mut GrammarDef) -> Result {
    let x = g.terminal("x")?;
    let semi = g.punctuation(";")?;
    let s = g.nonterminal("S")?;
    let a = g.nonterminal("A")?;
    let b = g.nonterminal("B")?;

    g.root(s)?;

    g.production(s, [N(a), T(semi)])?;
    g.production(s, [N(b), T(semi)])?;
    g.production(b, [T(x)])?;
    g.production(a, [T(x)])?;
    Ok(())
}

/// Generic arguments against comparison, told apart by peeking at the input:
/// `id < id ;` is a comparison, `id < id > ;` is a generic name.
pub fn generic_arguments(g: &mut GrammarDef) -> Result {
    let id = g.terminal("id")?;
    let lt = g.terminal("<")?;
    let gt = g.terminal(">")?;
    let semi = g.punctuation(";")?;
    let stmt = g.nonterminal("Stmt")?;
    let expr = g.nonterminal("Expr")?;
    let primary = g.nonterminal("Primary")?;
    let type_args = g.nonterminal("TypeArgs")?;

    g.root(stmt)?;

    g.production(stmt, [N(expr), T(semi)])?;
    g.production(expr, [N(expr), T(lt), N(primary)])?;
    g.production(expr, [N(expr), T(gt), N(primary)])?;
    g.production(expr, [N(primary)])?;
    g.production(primary, [T(id), Hint(GrammarHint::reduce_if(semi, [gt]))])?;
    g.production(primary, [T(id), N(type_args)])?;
    g.production(type_args, [T(lt), T(id), T(gt)])?;
    Ok(())
}

/// Statements with a snippet root for standalone expressions.
pub fn statements_with_snippet(g: &mut GrammarDef) -> Result {
    let num = g.terminal("num")?;
    let plus = g.terminal("+")?;
    let lparen = g.punctuation("(")?;
    let rparen = g.punctuation(")")?;
    let semi = g.punctuation(";")?;
    g.non_grammar_terminal("comment", TokenCategory::Comment)?;

    let program = g.nonterminal("Program")?;
    let stmt = g.nonterminal("Stmt")?;
    let expr = g.nonterminal("Expr")?;
    let term = g.nonterminal("Term")?;

    g.mark_list(program)?;
    g.root(program)?;
    g.snippet_root(expr)?;

    g.production(program, [N(program), N(stmt)])?;
    g.production(program, [N(stmt)])?;
    g.production(stmt, [N(expr), T(semi)])?;
    g.production(expr, [N(expr), T(plus), N(term)])?;
    g.production(expr, [N(term)])?;
    g.production(term, [T(num)])?;
    g.production(term, [T(lparen), N(expr), T(rparen)])?;
    Ok(())
}

pub fn expr_factor_term(g: &mut GrammarDef) -> Result {
    // declare terminal symbols.
    let lparen = g.punctuation("LPAREN")?;
    let rparen = g.punctuation("RPAREN")?;
    let plus = g.terminal("PLUS")?;
    let minus = g.terminal("MINUS")?;
    let star = g.terminal("STAR")?;
    let slash = g.terminal("SLASH")?;
    let num = g.terminal("NUM")?;

    // declare nonterminal symbols.
    let expr = g.nonterminal("EXPR")?;
    let factor = g.nonterminal("FACTOR")?;
    let term = g.nonterminal("TERM")?;

    g.root(expr)?;

    g.production(expr, [N(expr), T(plus), N(factor)])?;
    g.production(expr, [N(expr), T(minus), N(factor)])?;
    g.production(expr, [N(factor)])?;
    g.production(factor, [N(factor), T(star), N(term)])?;
    g.production(factor, [N(factor), T(slash), N(term)])?;
    g.production(factor, [N(term)])?;
    g.production(term, [T(num)])?;
    g.production(term, [T(lparen), N(expr), T(rparen)])?;
    Ok(())
}

/// A JSON-like value grammar with optional and repeated parts.
pub fn json(g: &mut GrammarDef) -> Result {
    let lbrace = g.punctuation("{")?;
    let rbrace = g.punctuation("}")?;
    let lbracket = g.punctuation("[")?;
    let rbracket = g.punctuation("]")?;
    let comma = g.punctuation(",")?;
    let colon = g.punctuation(":")?;
    let string = g.terminal("STRING")?;
    let number = g.terminal("NUMBER")?;
    let true_ = g.keyword("true")?;
    let false_ = g.keyword("false")?;
    let null = g.keyword("null")?;

    let value = g.nonterminal("Value")?;
    let object = g.nonterminal("Object")?;
    let array = g.nonterminal("Array")?;
    let members = g.anonymous()?;
    let member = g.nonterminal("Member")?;
    let elements = g.anonymous()?;

    g.root(value)?;
    g.mark_list(members)?;
    g.mark_list(elements)?;

    for literal in [string, number, true_, false_, null] {
        g.production(value, [T(literal)])?;
    }
    g.production(value, [N(object)])?;
    g.production(value, [N(array)])?;

    g.production(object, [T(lbrace), T(rbrace)])?;
    g.production(object, [T(lbrace), N(members), T(rbrace)])?;
    g.production(members, [N(members), T(comma), N(member)])?;
    g.production(members, [N(member)])?;
    g.production(member, [T(string), T(colon), N(value)])?;

    g.production(array, [T(lbracket), T(rbracket)])?;
    g.production(array, [T(lbracket), N(elements), T(rbracket)])?;
    g.production(elements, [N(elements), T(comma), N(value)])?;
    g.production(elements, [N(value)])?;

    // error recovery inside arrays
    g.production(
        elements,
        [N(elements), T(TerminalID::SYNTAX_ERROR), T(comma)],
    )?;
    Ok(())
}
