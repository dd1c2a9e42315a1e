//! Reduce transitions and conflict resolution.
//!
//! Shift transitions already sit in each state from the LR(0) construction.
//! Every reducible item contributes one reduce transition per lookahead
//! symbol; a collision with an existing transition on the same symbol is
//! resolved through precedence and associativity or is fatal.

use crate::{
    error::Error,
    grammar::{Action, Assoc, Grammar, ProductionID, SymbolID, Transition},
};

pub(crate) fn generate_reduce_transitions(g: &mut Grammar) -> Result<(), Error> {
    for state_index in 0..g.states.len() {
        let items = g.states[state_index].items.clone();
        for &iid in &items {
            let item = g.items[iid.index()];
            if item.position < g.productions[item.production.index()].rhs.len() {
                continue;
            }
            for symbol_index in 0..g.symbols.len() {
                let symbol = SymbolID::new(symbol_index);
                if !g.lookaheads[iid.index()].symbols.contains(symbol) {
                    continue;
                }
                insert_reduce(g, state_index, symbol, item.production)?;
            }
        }
    }
    Ok(())
}

fn insert_reduce(
    g: &mut Grammar,
    state: usize,
    symbol: SymbolID,
    production: ProductionID,
) -> Result<(), Error> {
    let existing = g.transitions[state]
        .iter()
        .position(|t| t.symbol == symbol);
    let Some(index) = existing else {
        g.transitions[state].push(Transition {
            symbol,
            action: Action::Reduce(production),
        });
        return Ok(());
    };

    match g.transitions[state][index].action {
        Action::Shift(_) => {
            let production_precedence = g.productions[production.index()].precedence(g);
            let symbol_precedence = g.symbol(symbol).precedence;
            let assoc = g.symbol(symbol).assoc;
            if production_precedence == 0
                || symbol_precedence == 0
                || (symbol_precedence == production_precedence && assoc == Assoc::None)
            {
                return Err(Error::ShiftReduceConflict {
                    lhs: g.symbol(g.productions[production.index()].lhs).name.clone(),
                    symbol: g.symbol(symbol).name.clone(),
                    production_precedence,
                    symbol_precedence,
                });
            }
            if production_precedence > symbol_precedence
                || (symbol_precedence == production_precedence && assoc == Assoc::Right)
            {
                tracing::trace!(
                    state,
                    symbol = %g.symbol(symbol).name,
                    "conflict resolved for the reduction"
                );
                g.transitions[state][index].action = Action::Reduce(production);
            }
        }
        Action::Reduce(existing_production) => {
            let production_precedence = g.productions[production.index()].precedence(g);
            let existing_precedence = g.productions[existing_production.index()].precedence(g);
            if production_precedence == 0
                || existing_precedence == 0
                || production_precedence == existing_precedence
            {
                return Err(Error::ReduceReduceConflict {
                    lhs: g.symbol(g.productions[production.index()].lhs).name.clone(),
                    symbol: g.symbol(symbol).name.clone(),
                });
            }
            if production_precedence > existing_precedence {
                g.transitions[state][index].action = Action::Reduce(production);
            }
        }
    }
    Ok(())
}
