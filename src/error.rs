//! Errors surfaced during grammar compilation.
//!
//! Every variant aborts the whole compilation; a failed sub-match inside the
//! matcher is ordinary control flow and never reaches this enumeration.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unterminated literal or regex (offset {offset})")]
    UnterminatedQuote { offset: usize },

    #[error("empty literal or regex (offset {offset})")]
    EmptyQuote { offset: usize },

    #[error("unmatched identifier to name the grammar")]
    UnmatchedGrammarName,

    #[error("empty grammar: expected `{{` after the grammar name (offset {offset})")]
    EmptyGrammar { offset: usize },

    #[error("unfinished grammar body: expected `}}` (offset {offset})")]
    UnfinishedGrammar { offset: usize },

    #[error("trailing garbage after the grammar body (offset {offset})")]
    TrailingGarbage { offset: usize },

    #[error("unterminated {statement} statement: expected `;` (offset {offset})")]
    UnterminatedStatement {
        statement: &'static str,
        offset: usize,
    },

    #[error("expected a symbol to infer the precedence from (offset {offset})")]
    ExpectedPrecedenceSymbol { offset: usize },

    #[error("expected identifier to be used as action (offset {offset})")]
    ExpectedActionName { offset: usize },

    #[error("expected `]` after the action name (offset {offset})")]
    UnclosedAction { offset: usize },

    #[error("undefined symbol `{name}`")]
    UndefinedSymbol { name: String },

    #[error("unreferenced symbol `{name}`")]
    UnreferencedSymbol { name: String },

    #[error("symbol `{replaced}` is an alias for `{replacement}` but both declare a {what}")]
    AliasConflict {
        replaced: String,
        replacement: String,
        what: &'static str,
    },

    #[error("unable to parse the regex `{pattern}`")]
    UnparsableRegex { pattern: String },

    #[error("token not recognized when chars not accepted")]
    TokenNotRecognized,

    #[error(
        "shift/reduce conflict for `{lhs}` on `{symbol}` \
         (production precedence {production_precedence}, symbol precedence {symbol_precedence})"
    )]
    ShiftReduceConflict {
        lhs: String,
        symbol: String,
        production_precedence: u32,
        symbol_precedence: u32,
    },

    #[error("reduce/reduce conflict for `{lhs}` on `{symbol}`")]
    ReduceReduceConflict { lhs: String, symbol: String },
}
