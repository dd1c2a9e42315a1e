//! LALR(1) lookahead computation.
//!
//! Lookaheads are attached to items, which are global: two states sharing
//! an item share its lookahead bitset, which is exactly the LALR(1)
//! collapse of the LR(1) partition. Spontaneous lookaheads come from the
//! first-sets of the tail behind each dot; everything else flows along
//! propagation edges until a fixpoint.

use crate::{
    grammar::{Action, Grammar, Item, ItemID, Lookahead, SymbolID},
    types::maybe_add_unique,
};

/// Seeds the start item with `.end` and every `(p′, 0)` item with the
/// firsts of the tail following the dot that produced it.
pub(crate) fn generate_spontaneous_lookaheads(g: &mut Grammar) {
    g.lookaheads = vec![Lookahead::new(); g.items.len()];
    g.lookaheads[0].symbols.insert(SymbolID::END);

    for state_index in 0..g.states.len() {
        let items = g.states[state_index].items.clone();
        for &iid in &items {
            let item = g.items[iid.index()];
            let production = &g.productions[item.production.index()];
            let Some(&at_dot) = production.rhs.get(item.position) else {
                continue;
            };

            // first(rhs[position+1 ..]), stopping at the first non-nullable.
            let mut spontaneous = vec![];
            for &tail in &production.rhs[item.position + 1..] {
                spontaneous.extend(g.symbols[tail.index()].firsts.iter().copied());
                if !g.symbols[tail.index()].nullable {
                    break;
                }
            }

            let targets = g.symbols[at_dot.index()].productions.clone();
            for pid in targets {
                let target = g.states[state_index].find_item(
                    g,
                    Item {
                        production: pid,
                        position: 0,
                    },
                );
                if let Some(target) = target {
                    for &s in &spontaneous {
                        g.lookaheads[target.index()].symbols.insert(s);
                    }
                }
            }
        }
    }
}

/// Records the propagation edges: one for every dot advance across a shift
/// transition, and one into each `(p′, 0)` of the same state when the tail
/// behind the dot derives ε.
pub(crate) fn generate_propagation_edges(g: &mut Grammar) {
    for state_index in 0..g.states.len() {
        let transitions = g.transitions[state_index].clone();
        let items = g.states[state_index].items.clone();

        for transition in &transitions {
            let Action::Shift(target_state) = transition.action else {
                continue;
            };
            for &iid in &items {
                let item = g.items[iid.index()];
                let production = &g.productions[item.production.index()];
                if production.rhs.get(item.position) != Some(&transition.symbol) {
                    continue;
                }
                let advanced = Item {
                    production: item.production,
                    position: item.position + 1,
                };
                let target = g.states[target_state.index()]
                    .find_item(g, advanced)
                    .expect("the goto construction materialized the advanced item");
                maybe_add_unique(&mut g.lookaheads[iid.index()].propagate_to, target);
            }
        }

        for &iid in &items {
            let item = g.items[iid.index()];
            let production = &g.productions[item.production.index()];
            let Some(&at_dot) = production.rhs.get(item.position) else {
                continue;
            };
            if !production.nullable_after(g, item.position + 1) {
                continue;
            }
            let targets = g.symbols[at_dot.index()].productions.clone();
            for pid in targets {
                let target = g.states[state_index].find_item(
                    g,
                    Item {
                        production: pid,
                        position: 0,
                    },
                );
                if let Some(target) = target {
                    maybe_add_unique(&mut g.lookaheads[iid.index()].propagate_to, target);
                }
            }
        }
    }
}

/// Runs the propagation to fixpoint. Bitsets only ever grow, so the rounds
/// terminate after at most |items| × |symbols| single-bit additions.
pub(crate) fn propagate_lookaheads(g: &mut Grammar) {
    let mut frontier: Vec<ItemID> = (0..g.items.len()).map(ItemID::new).collect();
    let mut rounds = 0usize;
    while !frontier.is_empty() {
        let mut next = vec![];
        for &iid in &frontier {
            let targets = g.lookaheads[iid.index()].propagate_to.clone();
            let source = g.lookaheads[iid.index()].symbols.clone();
            for target in targets {
                if g.lookaheads[target.index()].symbols.union_count(&source) > 0 {
                    next.push(target);
                }
            }
        }
        frontier = next;
        rounds += 1;
    }
    tracing::debug!(rounds, "lookahead propagation reached fixpoint");
}
