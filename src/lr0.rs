//! LR(0) item and state construction.
//!
//! States are discovered breadth-first from the start item. The goto of a
//! state adds the dot-advanced items plus, through each symbol right of a
//! dot, the precomputed first-symbol-reachable productions whose rhs starts
//! with the goto symbol; that second clause stands in for closing the source
//! state first. Once the state set is stable, every state is closed.

use crate::{
    grammar::{Action, Grammar, Item, ItemID, State, StateID, SymbolID, Transition},
    types::{maybe_add_unique, Map},
};

pub(crate) fn generate_states(g: &mut Grammar) {
    let start_production = g.symbols[SymbolID::START.index()].productions[0];
    g.items.push(Item {
        production: start_production,
        position: 0,
    });
    g.states.push(State {
        items: vec![ItemID::new(0)],
    });
    g.transitions.push(vec![]);
    add_closure(g, StateID::new(0));

    let mut isocores: Map<Vec<ItemID>, StateID> = Map::default();
    isocores.insert(g.states[0].items.clone(), StateID::new(0));

    let mut round = vec![StateID::new(0)];
    while !round.is_empty() {
        let mut next_round = vec![];
        for &state in &round {
            for index in 0..g.symbols.len() {
                let symbol = SymbolID::new(index);
                if symbol == SymbolID::END {
                    continue;
                }
                let goto_items = create_goto_items(g, state, symbol);
                if goto_items.is_empty() {
                    continue;
                }
                let target = match isocores.get(&goto_items) {
                    Some(&found) => found,
                    None => {
                        let target = StateID::new(g.states.len());
                        isocores.insert(goto_items.clone(), target);
                        g.states.push(State { items: goto_items });
                        g.transitions.push(vec![]);
                        next_round.push(target);
                        target
                    }
                };
                g.transitions[state.index()].push(Transition {
                    symbol,
                    action: Action::Shift(target),
                });
            }
        }
        round = next_round;
    }

    for index in 0..g.states.len() {
        add_closure(g, StateID::new(index));
    }
    tracing::debug!(
        states = g.states.len(),
        items = g.items.len(),
        "generated LR(0) states"
    );
}

/// The (pre-closure) successor item set of `state` under `symbol`.
fn create_goto_items(g: &mut Grammar, state: StateID, symbol: SymbolID) -> Vec<ItemID> {
    let mut goto_items = vec![];
    let state_items = g.states[state.index()].items.clone();
    for iid in state_items {
        let item = g.items[iid.index()];
        let production = &g.productions[item.production.index()];
        if item.position >= production.rhs.len() {
            continue;
        }
        let next_symbol = production.rhs[item.position];

        if next_symbol == symbol {
            let advanced = Item {
                production: item.production,
                position: item.position + 1,
            };
            let (_, index) = maybe_add_unique(&mut g.items, advanced);
            maybe_add_unique(&mut goto_items, ItemID::new(index));
        }

        let reachable = g.symbols[next_symbol.index()]
            .productions_by_first_symbol
            .clone();
        for pid in reachable {
            if g.productions[pid.index()].rhs[0] == symbol {
                let (_, index) = maybe_add_unique(
                    &mut g.items,
                    Item {
                        production: pid,
                        position: 1,
                    },
                );
                maybe_add_unique(&mut goto_items, ItemID::new(index));
            }
        }
    }
    goto_items
}

/// Closes `state` under LR(0): any item with its dot before a non-terminal
/// pulls in that non-terminal's productions at position 0.
fn add_closure(g: &mut Grammar, state: StateID) {
    let mut index = 0;
    while index < g.states[state.index()].items.len() {
        let iid = g.states[state.index()].items[index];
        let item = g.items[iid.index()];
        let production = &g.productions[item.production.index()];
        if let Some(&at_dot) = production.rhs.get(item.position) {
            let productions = g.symbols[at_dot.index()].productions.clone();
            for pid in productions {
                let (_, item_index) = maybe_add_unique(
                    &mut g.items,
                    Item {
                        production: pid,
                        position: 0,
                    },
                );
                maybe_add_unique(
                    &mut g.states[state.index()].items,
                    ItemID::new(item_index),
                );
            }
        }
        index += 1;
    }
}
