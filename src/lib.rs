//! An LALR(1) parser generator with a regex-driven scanner.
//!
//! The input is a grammar written in a BNF-like dialect: terminals are
//! `'…'` literals or `"…"` regexes, `%left`/`%right`/`%none` declare
//! operator precedence levels, `%whitespace` lists the token patterns the
//! scanner may skip, and productions can carry `%precedence` overrides and
//! `[action]` tags. [`Grammar::compile`] turns such a source into
//!
//! - a character-level DFA scanner built with the direct (followpos)
//!   construction, recognizing every terminal and whitespace pattern, and
//! - the LALR(1) tables: symbols, productions, items, states and their
//!   shift/reduce transitions, with conflicts resolved through declared
//!   precedences.
//!
//! ```
//! let grammar = parsegen::Grammar::compile(
//!     r#"
//!     calc {
//!         %whitespace "[ \t]*";
//!         %left '+';
//!         expr: expr '+' expr | "[0-9]+";
//!     }
//!     "#,
//! )
//! .unwrap();
//! let scanned = grammar.scan("12 + 34", 0).unwrap();
//! assert_eq!(scanned.text, "12");
//! ```

mod analysis;
mod lalr;
mod lr0;
mod optimize;
mod syntax;
mod table;
mod types;

pub mod error;
pub mod grammar;
pub mod matcher;
pub mod ranges;
pub mod regex;
pub mod scanner;

pub use crate::{
    error::Error,
    grammar::{
        Action, Assoc, Grammar, Item, ItemID, Lookahead, Production, ProductionID, State, StateID,
        Symbol, SymbolID, SymbolKind, SymbolSet, Transition,
    },
    scanner::{Dfa, Scanned},
};
