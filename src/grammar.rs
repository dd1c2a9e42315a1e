//! Grammar types.
//!
//! A [`Grammar`] is built once by [`Grammar::compile`] and immutable
//! afterwards. Symbols, productions, items and states reference each other
//! by index only; the id newtypes below exist to keep those indices from
//! getting mixed up.

use crate::{
    analysis,
    error::Error,
    lalr, lr0, optimize,
    scanner::{self, Dfa, Scanned},
    syntax, table,
};
use std::fmt;

/// Wraps a formatting closure into a `Display` value, so the grammar types
/// below can lend out dumps without allocating strings.
fn fmt_with<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct FmtWith<F>(F);
    impl<F> fmt::Display for FmtWith<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(formatter)
        }
    }
    FmtWith(f)
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolID(u32);

impl SymbolID {
    /// `.start`: lhs of the synthetic production 0.
    pub const START: Self = Self(0);
    /// `.end`: the end-of-input terminal.
    pub const END: Self = Self(1);
    /// `.error`: the error-recovery placeholder.
    pub const ERROR: Self = Self(2);
    /// `.whitespace`: carrier of the `%whitespace` scanner tokens.
    pub const WHITESPACE: Self = Self(3);

    pub(crate) const RESERVED: usize = 4;

    pub(crate) fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u32);

impl ProductionID {
    pub(crate) fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemID(u32);

impl ItemID {
    pub(crate) fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ItemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    pub(crate) fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q#{:03}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Null,
    Terminal,
    NonTerminal,
    End,
}

impl SymbolKind {
    pub fn type_tag(self) -> &'static str {
        match self {
            SymbolKind::Null => "NULL",
            SymbolKind::Terminal => "TERMINAL",
            SymbolKind::NonTerminal => "NON_TERMINAL",
            SymbolKind::End => "END",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
    None,
    Left,
    Right,
}

/// A grammar entity: terminal, non-terminal, or one of the reserved
/// placeholders.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub assoc: Assoc,
    /// Declared precedence; 0 means unset.
    pub precedence: u32,
    pub referred_as_precedence: bool,
    /// True for terminals introduced by a `'…'` literal, whose text the
    /// scanner matches verbatim instead of compiling as a regex.
    pub verbatim: bool,
    /// Productions whose lhs is this symbol, in declaration order.
    pub productions: Vec<ProductionID>,
    /// Productions reachable from this symbol through the first rhs symbol
    /// of each production, depth-first.
    pub productions_by_first_symbol: Vec<ProductionID>,
    pub nullable: bool,
    pub firsts: Vec<SymbolID>,
    pub follows: Vec<SymbolID>,
}

impl Symbol {
    pub(crate) fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            assoc: Assoc::None,
            precedence: 0,
            referred_as_precedence: false,
            verbatim: false,
            productions: vec![],
            productions_by_first_symbol: vec![],
            nullable: false,
            firsts: vec![],
            follows: vec![],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal)
    }
}

/// A rewrite rule `lhs : rhs…`.
#[derive(Debug)]
pub struct Production {
    pub lhs: SymbolID,
    pub rhs: Vec<SymbolID>,
    /// The symbol this production borrows its precedence from; defaults to
    /// the rightmost terminal of `rhs` when not declared via `%precedence`.
    pub precedence_symbol: Option<SymbolID>,
    pub action: Option<String>,
}

impl Production {
    pub fn precedence(&self, g: &Grammar) -> u32 {
        self.precedence_symbol
            .map_or(0, |s| g.symbol(s).precedence)
    }

    pub(crate) fn nullable_after(&self, g: &Grammar, position: usize) -> bool {
        self.rhs[position.min(self.rhs.len())..]
            .iter()
            .all(|&s| g.symbol(s).nullable)
    }

    /// `"LHS : R1 R2 …"`.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        fmt_with(move |f| {
            write!(f, "{} :", g.symbol(self.lhs).name)?;
            for &r in &self.rhs {
                write!(f, " {}", g.symbol(r).name)?;
            }
            Ok(())
        })
    }
}

/// An LR(0) item: a production with a dot position in `[0, |rhs|]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    pub production: ProductionID,
    pub position: usize,
}

impl Item {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        fmt_with(move |f| {
            let production = g.production(self.production);
            write!(f, "{} :", g.symbol(production.lhs).name)?;
            for (i, &r) in production.rhs.iter().enumerate() {
                if i == self.position {
                    write!(f, " .")?;
                }
                write!(f, " {}", g.symbol(r).name)?;
            }
            if self.position == production.rhs.len() {
                write!(f, " .")?;
            }
            Ok(())
        })
    }
}

/// An ordered, duplicate-free list of item ids, closed under the LR(0)
/// closure once state construction finishes.
#[derive(Debug, PartialEq, Eq)]
pub struct State {
    pub items: Vec<ItemID>,
}

impl State {
    pub(crate) fn find_item(&self, g: &Grammar, item: Item) -> Option<ItemID> {
        self.items
            .iter()
            .copied()
            .find(|&iid| g.items[iid.index()] == item)
    }
}

/// What a state does when the parse driver hands it a symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    Reduce(ProductionID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transition {
    pub symbol: SymbolID,
    pub action: Action,
}

/// Lookahead bitset of one item plus the items its lookaheads propagate to.
#[derive(Debug, Clone)]
pub struct Lookahead {
    pub symbols: SymbolSet,
    pub propagate_to: Vec<ItemID>,
}

impl Lookahead {
    pub(crate) fn new() -> Self {
        Self {
            symbols: SymbolSet::default(),
            propagate_to: vec![],
        }
    }
}

/// A set of symbol ids, stored as a bitset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet {
    inner: bit_set::BitSet,
}

impl SymbolSet {
    pub fn contains(&self, id: SymbolID) -> bool {
        self.inner.contains(id.index())
    }

    pub fn insert(&mut self, id: SymbolID) -> bool {
        self.inner.insert(id.index())
    }

    /// Unions `other` into `self`, returning the number of new bits.
    pub fn union_count(&mut self, other: &Self) -> usize {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() - before
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.inner.iter().map(SymbolID::new)
    }
}

/// A compiled grammar: symbol table, productions, LALR(1) automaton, and
/// the composite scanner DFA.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) name: String,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) productions: Vec<Production>,
    /// `%whitespace` regex texts, all bound to [`SymbolID::WHITESPACE`].
    pub(crate) whitespace: Vec<String>,
    pub(crate) items: Vec<Item>,
    pub(crate) states: Vec<State>,
    /// Per-state transitions, index-aligned with `states`.
    pub(crate) transitions: Vec<Vec<Transition>>,
    /// Per-item lookaheads, index-aligned with `items`.
    pub(crate) lookaheads: Vec<Lookahead>,
    pub(crate) scanner: Dfa,
    pub(crate) current_precedence: u32,
}

impl Grammar {
    pub(crate) fn new() -> Self {
        let mut symbols = Vec::with_capacity(SymbolID::RESERVED);
        symbols.push(Symbol::new(".start", SymbolKind::NonTerminal));
        symbols.push(Symbol::new(".end", SymbolKind::End));
        symbols.push(Symbol::new(".error", SymbolKind::Null));
        symbols.push(Symbol::new(".whitespace", SymbolKind::Null));
        Self {
            name: String::new(),
            symbols,
            productions: vec![],
            whitespace: vec![],
            items: vec![],
            states: vec![],
            transitions: vec![],
            lookaheads: vec![],
            scanner: Dfa::default(),
            current_precedence: 0,
        }
    }

    /// Compiles a grammar source into its scanner and LALR(1) tables.
    ///
    /// Either the complete grammar is returned or the first fatal error; no
    /// partially built grammar is ever exposed.
    pub fn compile(source: &str) -> Result<Self, Error> {
        let mut g = Grammar::new();
        syntax::parse_into(&mut g, source)?;
        syntax::check(&g)?;
        optimize::optimize(&mut g)?;
        analysis::calculate_firsts(&mut g);
        analysis::calculate_follows(&mut g);
        analysis::assign_precedence_symbols(&mut g);
        analysis::compute_first_symbol_reachability(&mut g);
        lr0::generate_states(&mut g);
        lalr::generate_spontaneous_lookaheads(&mut g);
        lalr::generate_propagation_edges(&mut g);
        lalr::propagate_lookaheads(&mut g);
        table::generate_reduce_transitions(&mut g)?;
        g.scanner = scanner::build_composite_scanner(&g)?;
        Ok(g)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolID, &Symbol)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolID::new(i), s))
    }

    pub fn symbol(&self, id: SymbolID) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Looks a symbol up by name, preferring the earliest-declared one.
    pub fn symbol_id(&self, name: &str) -> Option<SymbolID> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .map(SymbolID::new)
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductionID::new(i), p))
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[id.index()]
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemID, &Item)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemID::new(i), item))
    }

    pub fn item(&self, id: ItemID) -> &Item {
        &self.items[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateID::new(i), s))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn transitions(&self, id: StateID) -> &[Transition] {
        &self.transitions[id.index()]
    }

    pub fn lookahead(&self, id: ItemID) -> &Lookahead {
        &self.lookaheads[id.index()]
    }

    pub fn whitespace_patterns(&self) -> &[String] {
        &self.whitespace
    }

    pub fn scanner(&self) -> &Dfa {
        &self.scanner
    }

    /// Matches the next token at `offset`. The returned token id is the id
    /// of the matched terminal symbol (or [`SymbolID::WHITESPACE`]).
    pub fn scan<'i>(&self, input: &'i str, offset: usize) -> Option<Scanned<'i>> {
        self.scanner.scan(input, offset)
    }

    /// The symbol a scanner token id denotes.
    pub fn token_symbol(&self, token: usize) -> SymbolID {
        debug_assert!(token < self.symbols.len());
        SymbolID::new(token)
    }

    pub(crate) fn is_reserved(&self, id: SymbolID) -> bool {
        id.index() < SymbolID::RESERVED
    }

    /// Finds a symbol by identity or appends a fresh one.
    pub(crate) fn intern_symbol(&mut self, name: &str, kind: SymbolKind, verbatim: bool) -> SymbolID {
        let found = self
            .symbols
            .iter()
            .position(|s| s.name == name && s.kind == kind && s.verbatim == verbatim);
        match found {
            Some(i) => SymbolID::new(i),
            None => {
                let mut symbol = Symbol::new(name, kind);
                symbol.verbatim = verbatim;
                self.symbols.push(symbol);
                SymbolID::new(self.symbols.len() - 1)
            }
        }
    }

    /// A dump of every state with its items and transitions.
    pub fn automaton(&self) -> impl fmt::Display + '_ {
        fmt_with(move |f| {
            for (id, state) in self.states() {
                writeln!(f, "#### {:?}", id)?;
                for &iid in &state.items {
                    writeln!(f, "| {}", self.item(iid).display(self))?;
                }
                for t in self.transitions(id) {
                    match t.action {
                        Action::Shift(next) => {
                            writeln!(f, "- {} => shift({:?})", self.symbol(t.symbol).name, next)?
                        }
                        Action::Reduce(p) => writeln!(
                            f,
                            "- {} => reduce({})",
                            self.symbol(t.symbol).name,
                            self.production(p).display(self)
                        )?,
                    }
                }
            }
            Ok(())
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grammar: {}", self.name)?;
        writeln!(f, "symbols:")?;
        for (id, s) in self.symbols() {
            writeln!(f, "  [{:02}] {} ({})", id.index(), s.name, s.kind.type_tag())?;
        }
        writeln!(f, "productions:")?;
        for (id, p) in self.productions() {
            write!(f, "  [{:02}] {}", id.index(), p.display(self))?;
            match &p.action {
                Some(action) => writeln!(f, " [{}]", action)?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_cover_every_kind() {
        assert_eq!(SymbolKind::Null.type_tag(), "NULL");
        assert_eq!(SymbolKind::Terminal.type_tag(), "TERMINAL");
        assert_eq!(SymbolKind::NonTerminal.type_tag(), "NON_TERMINAL");
        assert_eq!(SymbolKind::End.type_tag(), "END");
    }

    #[test]
    fn grammar_dump_tags_every_symbol() {
        let g = Grammar::compile("g { s: 'x' s | 'x'; }").unwrap();
        let dump = g.to_string();
        assert!(dump.contains(".start (NON_TERMINAL)"));
        assert!(dump.contains(".end (END)"));
        assert!(dump.contains(".error (NULL)"));
        assert!(dump.contains(".whitespace (NULL)"));
        assert!(dump.contains("s (NON_TERMINAL)"));
        assert!(dump.contains("x (TERMINAL)"));
    }
}
