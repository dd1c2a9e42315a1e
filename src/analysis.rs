//! First/follow/precedence analysis.
//!
//! All three set computations are plain fixpoint iterations over the
//! production list; the sets live inside [`Symbol`](crate::grammar::Symbol)
//! as insertion-ordered vectors so later stages see a stable order.

use crate::{
    grammar::{Grammar, ProductionID, SymbolID, SymbolKind},
    types::maybe_add_unique,
};

/// Computes `firsts` and `nullable` for every symbol.
///
/// A terminal (or null/end) symbol has `firsts = {self}`. For a
/// non-terminal, every production contributes the firsts of its rhs symbols
/// up to and including the first non-nullable one; a production whose rhs is
/// entirely nullable marks the lhs nullable.
pub(crate) fn calculate_firsts(g: &mut Grammar) {
    loop {
        let mut added = 0usize;
        for index in 0..g.symbols.len() {
            if g.symbols[index].kind != SymbolKind::NonTerminal {
                let id = SymbolID::new(index);
                added += maybe_add_unique(&mut g.symbols[index].firsts, id).0 as usize;
                continue;
            }
            let productions = g.symbols[index].productions.clone();
            for pid in productions {
                let rhs = g.productions[pid.index()].rhs.clone();
                let mut all_nullable = true;
                for &r in &rhs {
                    let firsts = g.symbols[r.index()].firsts.clone();
                    for f in firsts {
                        added += maybe_add_unique(&mut g.symbols[index].firsts, f).0 as usize;
                    }
                    if !g.symbols[r.index()].nullable {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !g.symbols[index].nullable {
                    g.symbols[index].nullable = true;
                    added += 1;
                }
            }
        }
        if added == 0 {
            break;
        }
    }
    tracing::trace!("firsts fixpoint reached");
}

/// Computes `follows` for every symbol.
///
/// `follow(.start)` is seeded with `.end`. For each production
/// `A → … Xᵢ …`, `follow(Xᵢ)` gains `first(Xᵢ₊₁ …)` up to the first
/// non-nullable tail symbol, and `follow(A)` when the whole tail is
/// nullable.
pub(crate) fn calculate_follows(g: &mut Grammar) {
    g.symbols[SymbolID::START.index()]
        .follows
        .push(SymbolID::END);
    loop {
        let mut added = 0usize;
        for pindex in 0..g.productions.len() {
            let lhs = g.productions[pindex].lhs;
            let rhs = g.productions[pindex].rhs.clone();
            for (i, &x) in rhs.iter().enumerate() {
                let mut tail_nullable = true;
                for &t in &rhs[i + 1..] {
                    let firsts = g.symbols[t.index()].firsts.clone();
                    for f in firsts {
                        added += maybe_add_unique(&mut g.symbols[x.index()].follows, f).0 as usize;
                    }
                    if !g.symbols[t.index()].nullable {
                        tail_nullable = false;
                        break;
                    }
                }
                if tail_nullable {
                    let lhs_follows = g.symbols[lhs.index()].follows.clone();
                    for f in lhs_follows {
                        added += maybe_add_unique(&mut g.symbols[x.index()].follows, f).0 as usize;
                    }
                }
            }
        }
        if added == 0 {
            break;
        }
    }
    tracing::trace!("follows fixpoint reached");
}

/// Gives every production without an explicit `%precedence` the rightmost
/// terminal of its rhs as precedence bearer.
pub(crate) fn assign_precedence_symbols(g: &mut Grammar) {
    for production in &mut g.productions {
        if production.precedence_symbol.is_some() {
            continue;
        }
        production.precedence_symbol = production
            .rhs
            .iter()
            .rev()
            .copied()
            .find(|&r| g.symbols[r.index()].kind == SymbolKind::Terminal);
    }
}

/// Precomputes, per symbol, the productions reachable depth-first through
/// the first rhs symbol of each production. The LR(0) goto uses this as an
/// inline closure.
pub(crate) fn compute_first_symbol_reachability(g: &mut Grammar) {
    for index in 0..g.symbols.len() {
        let mut reachable = vec![];
        visit(g, SymbolID::new(index), &mut reachable);
        g.symbols[index].productions_by_first_symbol = reachable;
    }
}

fn visit(g: &Grammar, symbol: SymbolID, reachable: &mut Vec<ProductionID>) {
    for &pid in &g.symbols[symbol.index()].productions {
        let production = &g.productions[pid.index()];
        if production.rhs.is_empty() {
            continue;
        }
        if maybe_add_unique(reachable, pid).0 {
            visit(g, production.rhs[0], reachable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, optimize, syntax};

    fn analyzed(source: &str) -> Result<Grammar, Error> {
        let mut g = Grammar::new();
        syntax::parse_into(&mut g, source)?;
        syntax::check(&g)?;
        optimize::optimize(&mut g)?;
        calculate_firsts(&mut g);
        calculate_follows(&mut g);
        assign_precedence_symbols(&mut g);
        compute_first_symbol_reachability(&mut g);
        Ok(g)
    }

    fn names(g: &Grammar, ids: &[SymbolID]) -> Vec<String> {
        ids.iter().map(|&s| g.symbol(s).name.clone()).collect()
    }

    #[test]
    fn firsts_follow_derivations() {
        let g = analyzed(
            r#"
            g {
                s: a 'x' | 'y';
                a: 'p' s | ;
            }
            "#,
        )
        .unwrap();
        let s = g.symbol_id("s").unwrap();
        let a = g.symbol_id("a").unwrap();
        // a is nullable, so first(s) reaches through it to 'x'.
        assert!(g.symbol(a).nullable);
        assert!(!g.symbol(s).nullable);
        assert_eq!(names(&g, &g.symbol(s).firsts), ["x", "y", "p"]);
        assert_eq!(names(&g, &g.symbol(a).firsts), ["p"]);
    }

    #[test]
    fn follows_include_the_tail_and_the_lhs_follows() {
        let g = analyzed(
            r#"
            g {
                s: a 'x' a;
                a: 'p' | ;
            }
            "#,
        )
        .unwrap();
        let a = g.symbol_id("a").unwrap();
        // First occurrence of `a` is followed by 'x'; the second, with a
        // nullable (empty) tail, inherits follow(s) = {.end}.
        let follows = names(&g, &g.symbol(a).follows);
        assert!(follows.contains(&"x".to_owned()));
        assert!(follows.contains(&".end".to_owned()));
    }

    #[test]
    fn nullable_tail_lets_lhs_follows_through() {
        let g = analyzed(
            r#"
            g {
                s: 'x' b a;
                a: 'q' | ;
                b: 'r';
            }
            "#,
        )
        .unwrap();
        let b = g.symbol_id("b").unwrap();
        let follows = names(&g, &g.symbol(b).follows);
        // b is followed by first(a) = {q} and, because a is nullable, by
        // follow(s) as well.
        assert!(follows.contains(&"q".to_owned()));
        assert!(follows.contains(&".end".to_owned()));
    }

    #[test]
    fn rightmost_terminal_bears_the_precedence() {
        let g = analyzed(
            r#"
            g {
                %left '+';
                e: e '+' e 'z' | 'y';
            }
            "#,
        )
        .unwrap();
        let z = g.symbol_id("z").unwrap();
        let (_, p) = g.productions().find(|(_, p)| p.rhs.len() == 4).unwrap();
        assert_eq!(p.precedence_symbol, Some(z));

        // The synthetic start production has no terminal and no bearer.
        let (_, start) = g.productions().next().unwrap();
        assert_eq!(start.precedence_symbol, None);
    }

    #[test]
    fn reachability_walks_first_symbols_depth_first() {
        let g = analyzed(
            r#"
            g {
                e: t '+' e | t;
                t: f '*' t | f;
                f: '(' e ')' | 'x';
            }
            "#,
        )
        .unwrap();
        let e = g.symbol_id("e").unwrap();
        let reach: Vec<_> = g.symbols[e.index()]
            .productions_by_first_symbol
            .iter()
            .map(|&p| g.production(p).display(&g).to_string())
            .collect();
        // e's own productions come first, then t's through the first rhs
        // symbol, then f's.
        assert_eq!(
            reach,
            [
                "e : t + e",
                "t : f * t",
                "f : ( e )",
                "f : x",
                "t : f",
                "e : t",
            ]
        );
    }
}
