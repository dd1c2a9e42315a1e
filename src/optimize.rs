//! Removal of redundant non-terminal aliases.
//!
//! A non-terminal with exactly one production whose rhs is a single
//! terminal and which carries no action is only a name for that terminal.
//! The pass substitutes the terminal everywhere, transfers a declared
//! precedence or associativity to it, and compacts the symbol and
//! production id spaces. Repeats until no alias is left.

use crate::{
    error::Error,
    grammar::{Assoc, Grammar, ProductionID, SymbolID, SymbolKind},
};

pub(crate) fn optimize(g: &mut Grammar) -> Result<(), Error> {
    while remove_one_redundant_alias(g)? {}
    Ok(())
}

fn remove_one_redundant_alias(g: &mut Grammar) -> Result<bool, Error> {
    for index in 0..g.symbols.len() {
        let id = SymbolID::new(index);
        if id == SymbolID::ERROR {
            continue;
        }
        let symbol = &g.symbols[index];
        if symbol.productions.len() != 1 {
            continue;
        }
        let production_id = symbol.productions[0];
        let production = &g.productions[production_id.index()];
        if production.rhs.len() != 1 || production.action.is_some() {
            continue;
        }
        let replacement = production.rhs[0];
        if g.symbols[replacement.index()].kind != SymbolKind::Terminal {
            continue;
        }

        tracing::debug!(
            alias = %g.symbols[index].name,
            terminal = %g.symbols[replacement.index()].name,
            "collapsing redundant alias"
        );
        remove_production(g, production_id);
        replace_and_remove_symbol(g, id, replacement)?;
        return Ok(true);
    }
    Ok(false)
}

fn remove_production(g: &mut Grammar, removed: ProductionID) {
    g.productions.remove(removed.index());
    for symbol in &mut g.symbols {
        for p in &mut symbol.productions {
            if p.index() > removed.index() {
                *p = ProductionID::new(p.index() - 1);
            }
        }
    }
}

/// Rewrites every reference to `replaced` into `replacement` and removes
/// `replaced` from the symbol table, shifting higher ids down by one.
fn replace_and_remove_symbol(
    g: &mut Grammar,
    replaced: SymbolID,
    replacement: SymbolID,
) -> Result<(), Error> {
    let conflict = |what: &'static str| Error::AliasConflict {
        replaced: g.symbols[replaced.index()].name.clone(),
        replacement: g.symbols[replacement.index()].name.clone(),
        what,
    };
    let alias_precedence = g.symbols[replaced.index()].precedence;
    if alias_precedence != 0 && g.symbols[replacement.index()].precedence != 0 {
        return Err(conflict("precedence"));
    }
    let alias_assoc = g.symbols[replaced.index()].assoc;
    if alias_assoc != Assoc::None && g.symbols[replacement.index()].assoc != Assoc::None {
        return Err(conflict("associativity"));
    }

    if alias_precedence != 0 {
        g.symbols[replacement.index()].precedence = alias_precedence;
    }
    if alias_assoc != Assoc::None {
        g.symbols[replacement.index()].assoc = alias_assoc;
    }
    if g.symbols[replaced.index()].referred_as_precedence {
        g.symbols[replacement.index()].referred_as_precedence = true;
    }

    let remap = |id: &mut SymbolID| {
        if *id == replaced {
            *id = replacement;
        }
        if id.index() > replaced.index() {
            *id = SymbolID::new(id.index() - 1);
        }
    };
    for production in &mut g.productions {
        remap(&mut production.lhs);
        for r in &mut production.rhs {
            remap(r);
        }
        if let Some(p) = &mut production.precedence_symbol {
            remap(p);
        }
    }
    g.symbols.remove(replaced.index());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax;

    fn optimized(source: &str) -> Result<Grammar, Error> {
        let mut g = Grammar::new();
        syntax::parse_into(&mut g, source)?;
        syntax::check(&g)?;
        optimize(&mut g)?;
        Ok(g)
    }

    #[test]
    fn collapses_a_terminal_alias() {
        let g = optimized(
            r#"
            frag {
                expr: number | expr '+' number [add];
                number: "[0-9]+";
            }
            "#,
        )
        .unwrap();

        // `number` is gone; the regex terminal stands in its place.
        assert!(g
            .symbols()
            .all(|(_, s)| !(s.name == "number" && s.kind == SymbolKind::NonTerminal)));
        let digits = g.symbol_id("[0-9]+").unwrap();
        assert!(g.symbol(digits).is_terminal());

        let (_, add) = g
            .productions()
            .find(|(_, p)| p.action.as_deref() == Some("add"))
            .unwrap();
        assert_eq!(add.rhs[2], digits);
        let (_, unit) = g
            .productions()
            .find(|(_, p)| p.action.is_none() && p.rhs.len() == 1 && p.rhs[0] == digits)
            .unwrap();
        assert_eq!(g.symbol(unit.lhs).name, "expr");
    }

    #[test]
    fn transfers_precedence_to_the_surviving_terminal() {
        let g = optimized(
            r#"
            g {
                %none integer;
                s: s integer | integer 'x';
                integer: "[0-9]+";
            }
            "#,
        )
        .unwrap();
        let digits = g.symbol_id("[0-9]+").unwrap();
        assert_eq!(g.symbol(digits).precedence, 1);
        assert_eq!(g.symbol(digits).assoc, Assoc::None);
    }

    #[test]
    fn keeps_aliases_with_actions() {
        let g = optimized(
            r#"
            g {
                s: number 'x';
                number: "[0-9]+" [as_number];
            }
            "#,
        )
        .unwrap();
        assert!(g
            .symbols()
            .any(|(_, s)| s.name == "number" && s.kind == SymbolKind::NonTerminal));
    }

    #[test]
    fn rejects_an_alias_when_both_sides_declare_precedence() {
        let err = optimized(
            r#"
            g {
                %left "[0-9]+";
                %none integer;
                s: s integer | integer 'x';
                integer: "[0-9]+";
            }
            "#,
        );
        assert!(matches!(err, Err(Error::AliasConflict { .. })));
    }

    #[test]
    fn production_ids_are_compacted() {
        let g = optimized(
            r#"
            g {
                s: t 'x' | number;
                number: "[0-9]+";
                t: t 'y' | 'z';
            }
            "#,
        )
        .unwrap();
        // Every symbol's production list must still point at productions
        // with the recorded lhs.
        for (id, symbol) in g.symbols() {
            for &p in &symbol.productions {
                assert_eq!(g.production(p).lhs, id);
            }
        }
        assert_eq!(g.productions().count(), 5);
    }
}
