//! Cursor over a source text with tentative-match semantics.
//!
//! All matching operates on bytes; only 7-bit ASCII has defined meaning in
//! the grammar dialect. A byte value of `0` stands for end-of-input.

use crate::{
    error::Error,
    ranges::{ALPHA, WORD},
};

/// Translates the common escape letters to their control characters.
///
/// Any other character is returned verbatim, so `\\`, `\'` and friends fall
/// out of the general case.
pub fn unescape(c: u8) -> u8 {
    match c {
        b'b' => 0x08,
        b'n' => b'\n',
        b'f' => 0x0c,
        b'r' => b'\r',
        b't' => b'\t',
        _ => c,
    }
}

/// A read position over an input string.
///
/// Compound operations either consume all of their sub-matches or leave the
/// cursor untouched; [`Matcher::attempt`] is the scoped helper enforcing
/// this for multi-step matches.
#[derive(Debug, Clone)]
pub struct Matcher<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> Matcher<'s> {
    pub fn new(input: &'s str) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset from the start of the input.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The unconsumed remainder of the input.
    pub fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Runs `f` tentatively: the cursor is restored on every exit path that
    /// does not produce a value.
    pub fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.pos;
        let res = f(self);
        if res.is_none() {
            self.pos = checkpoint;
        }
        res
    }

    /// Consumes and returns the next byte, or `0` at end-of-input.
    pub fn match_any_char(&mut self) -> u8 {
        match self.peek() {
            Some(c) => {
                self.advance(1);
                c
            }
            None => 0,
        }
    }

    /// Consumes the next byte if it equals `c`.
    pub fn match_char(&mut self, c: u8) -> bool {
        let accepting = self.peek() == Some(c);
        if accepting {
            self.advance(1);
        }
        accepting
    }

    /// Consumes the next byte if it occurs in `set`, returning it, or `0`.
    pub fn match_any_char_in(&mut self, set: &[u8]) -> u8 {
        match self.peek() {
            Some(c) if set.contains(&c) => {
                self.advance(1);
                c
            }
            _ => 0,
        }
    }

    /// Consumes the next byte unless it occurs in `set`, returning it, or `0`.
    pub fn match_any_char_not_in(&mut self, set: &[u8]) -> u8 {
        match self.peek() {
            Some(c) if !set.contains(&c) => {
                self.advance(1);
                c
            }
            _ => 0,
        }
    }

    /// Like [`match_any_char_not_in`](Self::match_any_char_not_in), but a
    /// leading backslash consumes the following byte and decodes the common
    /// escapes.
    pub fn match_possibly_escaped_char_not_in(&mut self, set: &[u8]) -> u8 {
        match self.match_any_char_not_in(set) {
            b'\\' => unescape(self.match_any_char()),
            c => c,
        }
    }

    /// Attempts to consume `s` verbatim, restoring the cursor on a partial
    /// match.
    pub fn match_str(&mut self, s: &str) -> bool {
        self.attempt(|m| {
            for &c in s.as_bytes() {
                if !m.match_char(c) {
                    return None;
                }
            }
            Some(())
        })
        .is_some()
    }

    /// Consumes an identifier `[A-Za-z_][A-Za-z0-9_]*`; the cursor does not
    /// move when the first byte does not qualify.
    pub fn match_id(&mut self) -> Option<&'s str> {
        let begin = self.pos;
        match self.peek() {
            Some(c) if ALPHA.matches(c) || c == b'_' => self.advance(1),
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if !WORD.matches(c) {
                break;
            }
            self.advance(1);
        }
        Some(&self.input[begin..self.pos])
    }

    /// Consumes a span delimited by `delim`, honoring `\` as an escape
    /// introducer. An embedded line break or end-of-input is fatal, as is an
    /// empty body. Returns `None` (without consuming) when the next byte is
    /// not the delimiter.
    fn match_quoted(&mut self, delim: u8) -> Result<Option<&'s str>, Error> {
        let start = self.pos;
        if !self.match_char(delim) {
            return Ok(None);
        }
        let body = self.pos;
        let mut escaped = false;
        loop {
            match self.peek() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(Error::UnterminatedQuote { offset: start })
                }
                Some(c) => {
                    self.advance(1);
                    if c == delim && !escaped {
                        break;
                    }
                    escaped = c == b'\\' && !escaped;
                }
            }
        }
        if self.pos - body == 1 {
            return Err(Error::EmptyQuote { offset: start });
        }
        Ok(Some(&self.input[body..self.pos - 1]))
    }

    /// Consumes a `'…'`-quoted literal.
    pub fn match_literal(&mut self) -> Result<Option<&'s str>, Error> {
        self.match_quoted(b'\'')
    }

    /// Consumes a `"…"`-quoted regex.
    pub fn match_regex(&mut self) -> Result<Option<&'s str>, Error> {
        self.match_quoted(b'"')
    }

    fn match_line_comment(&mut self) -> bool {
        if !self.match_str("//") {
            return false;
        }
        while let Some(c) = self.peek() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            self.advance(1);
        }
        true
    }

    fn match_block_comment(&mut self) -> bool {
        if !self.match_str("/*") {
            return false;
        }
        while !self.is_empty() {
            if self.match_str("*/") {
                return true;
            }
            self.advance(1);
        }
        true
    }

    /// Consumes any mixture of whitespace and `//`/`/* */` comments,
    /// reporting whether anything was consumed.
    pub fn match_whitespace_or_comments(&mut self) -> bool {
        let mut consumed = false;
        loop {
            if self.match_any_char_in(b" \x0c\n\r\t\x0b") != 0
                || self.match_line_comment()
                || self.match_block_comment()
            {
                consumed = true;
            } else {
                break;
            }
        }
        consumed
    }
}
