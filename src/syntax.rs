//! Parser for the grammar meta-language.
//!
//! ```text
//! <name> '{'
//!   ( associativity-stmt | whitespace-stmt | production-stmt )*
//! '}'
//! ```
//!
//! Statements are recognized by recursive descent over the [`Matcher`];
//! every probe that can fail midway is wrapped in `attempt` so the cursor
//! only advances on a committed match.

use crate::{
    error::Error,
    grammar::{Assoc, Grammar, Production, ProductionID, SymbolID, SymbolKind},
    matcher::Matcher,
};

pub(crate) fn parse_into(g: &mut Grammar, source: &str) -> Result<(), Error> {
    let mut m = Matcher::new(source);
    m.match_whitespace_or_comments();
    let name = m.match_id().ok_or(Error::UnmatchedGrammarName)?;
    g.name = name.to_owned();
    tracing::debug!(name = %g.name, "parsing grammar");

    m.match_whitespace_or_comments();
    if !m.match_char(b'{') {
        return Err(Error::EmptyGrammar { offset: m.offset() });
    }
    loop {
        if parse_associativity_statement(g, &mut m)? {
            continue;
        }
        if parse_whitespace_statement(g, &mut m)? {
            continue;
        }
        if parse_production_statement(g, &mut m)? {
            continue;
        }
        break;
    }
    m.match_whitespace_or_comments();
    if !m.match_char(b'}') {
        return Err(Error::UnfinishedGrammar { offset: m.offset() });
    }
    m.match_whitespace_or_comments();
    if !m.is_empty() {
        return Err(Error::TrailingGarbage { offset: m.offset() });
    }
    Ok(())
}

/// Matches one symbol occurrence: the `error` literal, a `'…'` literal
/// terminal, a `"…"` regex terminal, or a non-terminal identifier.
fn match_symbol(g: &mut Grammar, m: &mut Matcher<'_>) -> Result<Option<SymbolID>, Error> {
    m.match_whitespace_or_comments();
    if m.match_str("error") {
        return Ok(Some(SymbolID::ERROR));
    }
    if let Some(text) = m.match_literal()? {
        return Ok(Some(g.intern_symbol(text, SymbolKind::Terminal, true)));
    }
    if let Some(text) = m.match_regex()? {
        return Ok(Some(g.intern_symbol(text, SymbolKind::Terminal, false)));
    }
    if let Some(id) = m.match_id() {
        return Ok(Some(g.intern_symbol(id, SymbolKind::NonTerminal, false)));
    }
    Ok(None)
}

/// `%none | %left | %right  symbol…  ';'` — one statement per precedence
/// level; every listed symbol is stamped with the statement's associativity
/// and the freshly incremented precedence.
fn parse_associativity_statement(g: &mut Grammar, m: &mut Matcher<'_>) -> Result<bool, Error> {
    m.match_whitespace_or_comments();
    let assoc = if m.match_str("%none") {
        Assoc::None
    } else if m.match_str("%left") {
        Assoc::Left
    } else if m.match_str("%right") {
        Assoc::Right
    } else {
        return Ok(false);
    };

    g.current_precedence += 1;
    let precedence = g.current_precedence;
    while let Some(id) = match_symbol(g, m)? {
        let symbol = &mut g.symbols[id.index()];
        tracing::trace!(name = %symbol.name, precedence, ?assoc, "stamped symbol");
        symbol.assoc = assoc;
        symbol.precedence = precedence;
    }
    m.match_whitespace_or_comments();
    if !m.match_char(b';') {
        return Err(Error::UnterminatedStatement {
            statement: "associativity",
            offset: m.offset(),
        });
    }
    Ok(true)
}

/// `%whitespace  "regex"…  ';'` — each regex joins the whitespace token
/// list under the `.whitespace` symbol.
fn parse_whitespace_statement(g: &mut Grammar, m: &mut Matcher<'_>) -> Result<bool, Error> {
    m.match_whitespace_or_comments();
    if !m.match_str("%whitespace") {
        return Ok(false);
    }
    loop {
        m.match_whitespace_or_comments();
        match m.match_regex()? {
            Some(pattern) => g.whitespace.push(pattern.to_owned()),
            None => break,
        }
    }
    if !m.match_char(b';') {
        return Err(Error::UnterminatedStatement {
            statement: "whitespace",
            offset: m.offset(),
        });
    }
    Ok(true)
}

/// `id ':' alt ( '|' alt )* ';'` where an alt is a possibly empty symbol
/// sequence, an optional `%precedence <symbol>`, and an optional
/// `'[' action ']'`.
fn parse_production_statement(g: &mut Grammar, m: &mut Matcher<'_>) -> Result<bool, Error> {
    m.match_whitespace_or_comments();
    let Some(lhs_name) = m.attempt(|m| {
        let id = m.match_id()?;
        m.match_whitespace_or_comments();
        m.match_char(b':').then_some(id)
    }) else {
        return Ok(false);
    };
    let lhs = g.intern_symbol(lhs_name, SymbolKind::NonTerminal, false);

    // The first lhs ever seen becomes the start symbol, via the synthetic
    // production `.start : <lhs>` at index 0.
    if g.productions.is_empty() {
        g.productions.push(Production {
            lhs: SymbolID::START,
            rhs: vec![lhs],
            precedence_symbol: None,
            action: None,
        });
        g.symbols[SymbolID::START.index()]
            .productions
            .push(ProductionID::new(0));
    }

    loop {
        let mut rhs = vec![];
        while let Some(symbol) = match_symbol(g, m)? {
            rhs.push(symbol);
        }
        m.match_whitespace_or_comments();

        let mut precedence_symbol = None;
        if m.match_str("%precedence") {
            match match_symbol(g, m)? {
                Some(symbol) => {
                    g.symbols[symbol.index()].referred_as_precedence = true;
                    precedence_symbol = Some(symbol);
                }
                None => {
                    return Err(Error::ExpectedPrecedenceSymbol { offset: m.offset() });
                }
            }
            m.match_whitespace_or_comments();
        }

        let mut action = None;
        if m.match_char(b'[') {
            m.match_whitespace_or_comments();
            match m.match_id() {
                Some(name) => action = Some(name.to_owned()),
                None => return Err(Error::ExpectedActionName { offset: m.offset() }),
            }
            m.match_whitespace_or_comments();
            if !m.match_char(b']') {
                return Err(Error::UnclosedAction { offset: m.offset() });
            }
            m.match_whitespace_or_comments();
        }

        let id = ProductionID::new(g.productions.len());
        g.symbols[lhs.index()].productions.push(id);
        let production = Production {
            lhs,
            rhs,
            precedence_symbol,
            action,
        };
        tracing::trace!("added production {}", production.display(g));
        g.productions.push(production);

        if !m.match_char(b'|') {
            break;
        }
    }
    if !m.match_char(b';') {
        return Err(Error::UnterminatedStatement {
            statement: "production",
            offset: m.offset(),
        });
    }
    Ok(true)
}

/// Rejects non-terminals that never got a production (unless they only name
/// a precedence) and symbols that nothing refers to.
pub(crate) fn check(g: &Grammar) -> Result<(), Error> {
    for (_, symbol) in g.symbols() {
        if symbol.kind == SymbolKind::NonTerminal
            && symbol.productions.is_empty()
            && !symbol.referred_as_precedence
        {
            return Err(Error::UndefinedSymbol {
                name: symbol.name.clone(),
            });
        }
    }

    let mut referenced = vec![0usize; g.symbols.len()];
    for (_, production) in g.productions() {
        for &r in &production.rhs {
            referenced[r.index()] += 1;
        }
        if let Some(p) = production.precedence_symbol {
            referenced[p.index()] += 1;
        }
    }
    for (id, symbol) in g.symbols() {
        if !g.is_reserved(id) && referenced[id.index()] == 0 {
            return Err(Error::UnreferencedSymbol {
                name: symbol.name.clone(),
            });
        }
    }
    Ok(())
}
