//! Grammar normalization: augmented roots, reachability, nullability and items.

use super::Config;
use crate::{
    diagnostics::{Diagnostics, GrammarErrorLevel},
    grammar::{
        Grammar, Nonterminal, NonterminalID, Production, ProductionID, SymbolID, TermFlags,
        TerminalID,
    },
    grammar_data::{AugmentedRoot, GrammarData, LR0Item, ProductionData, ProductionFlags},
    hint::GrammarHint,
    types::{Map, Set},
};

/// Derive the normalized grammar.
///
/// Structural errors are recorded in `diagnostics`. `None` is returned when
/// they prevent the items from being built.
pub(super) fn normalize(
    grammar: &Grammar,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Option<GrammarData> {
    let Some(root) = grammar.root else {
        diagnostics.add(
            GrammarErrorLevel::Error,
            None,
            "the grammar has no root nonterminal",
        );
        return None;
    };

    let mut nonterminals = grammar.nonterminals.clone();
    let mut productions = grammar.productions.clone();
    let augmented_roots = augment_roots(
        grammar,
        root,
        &mut nonterminals,
        &mut productions,
        diagnostics,
    )?;

    let (reachable_terminals, reachable_nonterminals) = collect_reachable_symbols(
        grammar,
        &augmented_roots,
        &nonterminals,
        &productions,
        diagnostics,
    );
    if diagnostics.has_errors() {
        return None;
    }

    assign_names(&augmented_roots, &reachable_nonterminals, &mut nonterminals);

    let nullables = nullable_nonterminals(&reachable_nonterminals, &nonterminals, &productions);
    for n in &nullables {
        if let Some(nonterminal) = nonterminals.get_mut(n) {
            nonterminal.insert_flags(TermFlags::NULLABLE);
        }
    }

    let mut g = GrammarData {
        terminals: grammar.terminals.clone(),
        nonterminals,
        productions: Map::default(),
        items: vec![],
        augmented_roots,
        reachable_terminals,
        reachable_nonterminals,
        on_conflict: grammar.on_conflict.clone(),
    };

    for production in productions.into_values() {
        if !g.reachable_nonterminals.contains(&production.left()) {
            continue;
        }
        let data = production_data(&g, production, g.items.len());
        let items = lr0_items(&g, &data);
        g.items.extend(items);
        g.productions.insert(data.id(), data);
    }

    validate(&g, config, diagnostics);

    tracing::debug!(
        terminals = g.reachable_terminals.len(),
        nonterminals = g.reachable_nonterminals.len(),
        nullables = nullables.len(),
        productions = g.productions.len(),
        items = g.items.len(),
        "normalized grammar"
    );

    Some(g)
}

/// Add `R' -> R EOF` for the primary root and each snippet root.
fn augment_roots(
    grammar: &Grammar,
    root: NonterminalID,
    nonterminals: &mut Map<NonterminalID, Nonterminal>,
    productions: &mut Map<ProductionID, Production>,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<AugmentedRoot>> {
    let mut next_nonterminal = next_raw(nonterminals.keys().map(|id| id.into_raw()));
    let mut next_production = next_raw(productions.keys().map(|id| id.into_raw()));

    let mut roots: Set<NonterminalID> = Set::default();
    roots.insert(root);
    roots.extend(grammar.snippet_roots.iter().copied());

    let mut augmented_roots = vec![];
    for root in roots {
        if !nonterminals.contains_key(&root) {
            diagnostics.add(
                GrammarErrorLevel::Error,
                None,
                format!("the root {:?} is not a declared nonterminal", root),
            );
            continue;
        }

        let (Some(nonterminal), Some(production)) = (next_nonterminal, next_production) else {
            diagnostics.add(
                GrammarErrorLevel::Error,
                None,
                "too many symbols to augment the grammar",
            );
            return None;
        };
        next_nonterminal = nonterminal.checked_add(1);
        next_production = production.checked_add(1);

        let nonterminal = NonterminalID::from_raw(nonterminal);
        let production = ProductionID::from_raw(production);
        productions.insert(
            production,
            Production::new(
                production,
                nonterminal,
                vec![SymbolID::N(root), SymbolID::T(TerminalID::EOF)],
            ),
        );
        nonterminals.insert(nonterminal, Nonterminal::augmented(nonterminal, production));
        augmented_roots.push(AugmentedRoot {
            nonterminal,
            root,
            production,
        });
    }

    if augmented_roots.is_empty() {
        return None;
    }
    Some(augmented_roots)
}

fn next_raw(ids: impl Iterator<Item = u16>) -> Option<u16> {
    match ids.max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}

/// Depth-first walk from the augmented roots.
fn collect_reachable_symbols(
    grammar: &Grammar,
    augmented_roots: &[AugmentedRoot],
    nonterminals: &Map<NonterminalID, Nonterminal>,
    productions: &Map<ProductionID, Production>,
    diagnostics: &mut Diagnostics,
) -> (Set<TerminalID>, Set<NonterminalID>) {
    let mut terminals = Set::default();
    let mut visited: Set<NonterminalID> = Set::default();

    let mut stack: Vec<NonterminalID> = augmented_roots
        .iter()
        .rev()
        .map(|root| root.nonterminal)
        .collect();
    while let Some(n) = stack.pop() {
        if !visited.insert(n) {
            continue;
        }
        let Some(nonterminal) = nonterminals.get(&n) else {
            continue;
        };
        let Some(production_ids) = nonterminal.productions() else {
            diagnostics.add(
                GrammarErrorLevel::Error,
                None,
                format!("the nonterminal `{}' has no production set", nonterminal),
            );
            continue;
        };

        let mut children = vec![];
        for production in production_ids.iter().filter_map(|id| productions.get(id)) {
            for symbol in production.right() {
                match *symbol {
                    SymbolID::T(t) if grammar.terminals.contains_key(&t) => {
                        terminals.insert(t);
                    }
                    SymbolID::N(child) if nonterminals.contains_key(&child) => {
                        children.push(child);
                    }
                    symbol => diagnostics.add(
                        GrammarErrorLevel::Error,
                        None,
                        format!(
                            "the production of `{}' refers to the undeclared symbol {:?}",
                            nonterminal, symbol
                        ),
                    ),
                }
            }
        }
        stack.extend(children.into_iter().rev().filter(|n| !visited.contains(n)));
    }

    terminals.extend(grammar.non_grammar_terminals.iter().copied());

    (terminals, visited)
}

fn assign_names(
    augmented_roots: &[AugmentedRoot],
    reachable: &Set<NonterminalID>,
    nonterminals: &mut Map<NonterminalID, Nonterminal>,
) {
    let mut counter = 0;
    for id in reachable {
        let Some(nonterminal) = nonterminals.get_mut(id) else {
            continue;
        };
        if nonterminal.name().is_some() || augmented_roots.iter().any(|r| r.nonterminal == *id) {
            continue;
        }
        nonterminal.set_name(format!("Unnamed{}", counter));
        counter += 1;
    }

    for root in augmented_roots {
        let name = format!(
            "{}'",
            nonterminals
                .get(&root.root)
                .and_then(Nonterminal::name)
                .unwrap_or("<anonymous>")
        );
        if let Some(nonterminal) = nonterminals.get_mut(&root.nonterminal) {
            nonterminal.set_name(name);
        }
    }
}

/// Fixed point of the nullable nonterminals.
fn nullable_nonterminals(
    reachable: &Set<NonterminalID>,
    nonterminals: &Map<NonterminalID, Nonterminal>,
    productions: &Map<ProductionID, Production>,
) -> Set<NonterminalID> {
    let mut nullables: Set<NonterminalID> = Set::default();
    loop {
        let mut changed = false;
        for id in reachable {
            if nullables.contains(id) {
                continue;
            }
            let production_ids = nonterminals
                .get(id)
                .and_then(Nonterminal::productions)
                .unwrap_or(&[]);
            let nullable = production_ids
                .iter()
                .filter_map(|p| productions.get(p))
                .any(|p| {
                    p.right().iter().all(|symbol| match symbol {
                        SymbolID::T(..) => false,
                        SymbolID::N(n) => nullables.contains(n),
                    })
                });
            if nullable {
                nullables.insert(*id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    nullables
}

fn production_data(g: &GrammarData, production: Production, first_item: usize) -> ProductionData {
    let right = production.right();

    let mut flags = ProductionFlags::empty();
    if right.is_empty() {
        flags |= ProductionFlags::IS_EMPTY;
    }
    if right.iter().any(|s| matches!(s, SymbolID::T(..))) {
        flags |= ProductionFlags::HAS_TERMINALS;
    }
    if right.contains(&SymbolID::T(TerminalID::SYNTAX_ERROR)) {
        flags |= ProductionFlags::IS_ERROR;
    }
    let left = g.nonterminal(production.left());
    if left.flags().contains(TermFlags::IS_LIST) && right.first() == Some(&SymbolID::N(left.id())) {
        flags |= ProductionFlags::IS_LIST_BUILDER;
    }

    let implied = production
        .hints()
        .iter()
        .rev()
        .find_map(|(_, hint)| match hint {
            GrammarHint::Precedence(prec) => Some(*prec),
            _ => None,
        });
    let precedence = implied.or_else(|| {
        right.iter().rev().find_map(|symbol| match symbol {
            SymbolID::T(t) => g.terminals.get(t).filter(|t| t.is_operator())?.precedence(),
            SymbolID::N(..) => None,
        })
    });

    let start = first_item as u32;
    let end = (first_item + right.len() + 1) as u32;

    ProductionData {
        production,
        flags,
        precedence,
        items: start..end,
    }
}

/// One item per dot position.
fn lr0_items(g: &GrammarData, data: &ProductionData) -> Vec<LR0Item> {
    let right = data.right();
    let len = right.len();

    // The tail of the item at `pos` is `right[pos + 1..]`.
    let mut tail_is_nullable = vec![true; len + 1];
    for pos in (0..len.saturating_sub(1)).rev() {
        tail_is_nullable[pos] = tail_is_nullable[pos + 1] && g.is_nullable(right[pos + 1]);
    }

    data.item_ids()
        .enumerate()
        .map(|(pos, id)| LR0Item {
            id,
            production: data.id(),
            position: pos as u16,
            current: right.get(pos).copied(),
            tail_is_nullable: tail_is_nullable[pos],
            hints: data
                .production
                .hints()
                .iter()
                .filter(|(at, _)| usize::from(*at) == pos)
                .map(|(_, hint)| hint.clone())
                .collect(),
        })
        .collect()
}

fn validate(g: &GrammarData, config: &Config, diagnostics: &mut Diagnostics) {
    for production in g.productions.values() {
        if production.flags.contains(ProductionFlags::IS_ERROR)
            && !matches!(production.right().last(), Some(SymbolID::T(..)))
        {
            diagnostics.add(
                GrammarErrorLevel::Warning,
                None,
                format!(
                    "the error production `{}' should end with a terminal",
                    production.display(g)
                ),
            );
        }
    }

    if config.create_ast {
        for id in &g.reachable_nonterminals {
            let nonterminal = g.nonterminal(*id);
            if nonterminal
                .flags()
                .intersects(TermFlags::TRANSIENT | TermFlags::NO_AST_NODE)
                || nonterminal.ast_node().is_some()
            {
                continue;
            }
            diagnostics.add(
                GrammarErrorLevel::Warning,
                None,
                format!("the nonterminal `{}' has no AST node bound", nonterminal),
            );
        }
    }
}
