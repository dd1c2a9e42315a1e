//! Regex parsing and followpos attributes.
//!
//! Patterns are parsed into a single arena-allocated tree. Every pattern is
//! augmented as `AND(expr, TOKEN(id))` and the augmented patterns are joined
//! with `OR` nodes, so one tree (and later one DFA) recognizes the whole
//! token set. Nodes cross-reference each other by [`NodeID`] only; the
//! `firsts`/`lasts`/`follows` attributes are the combinators of the direct
//! regex-to-DFA construction.

use crate::{
    error::Error,
    matcher::{unescape, Matcher},
    ranges::{MergedRanges, CHAR_MAX, POSIX_CLASSES},
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeID(u32);

impl NodeID {
    fn new(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R#{:03}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeKind {
    Or,
    And,
    Opt,
    Many,
    NonZero,
    CharRange,
    Token,
}

/// One node of the regex parse tree.
///
/// `CharRange` leaves match a byte in `[begin, end)` and have no children;
/// `Token` leaves match no input and force the containing alternative to
/// accept with `token`.
#[derive(Debug)]
pub struct RegexNode {
    pub kind: NodeKind,
    pub children: Vec<NodeID>,
    pub begin: u8,
    pub end: u8,
    pub token: usize,
    pub nullable: bool,
    pub firsts: Vec<NodeID>,
    pub lasts: Vec<NodeID>,
    pub follows: Vec<NodeID>,
}

/// A fully attributed regex tree, ready for DFA construction.
#[derive(Debug)]
pub struct RegexTree {
    nodes: Vec<RegexNode>,
    root: NodeID,
}

impl RegexTree {
    pub fn node(&self, id: NodeID) -> &RegexNode {
        &self.nodes[id.index()]
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A labeled pattern fed into [`parse_tokens`].
///
/// A `verbatim` pattern is matched character for character (escapes
/// decoded); otherwise the pattern text is compiled as a regex.
#[derive(Debug, Copy, Clone)]
pub struct ScanToken<'s> {
    pub pattern: &'s str,
    pub verbatim: bool,
    pub token: usize,
}

/// Parses the labeled patterns into one augmented tree and computes its
/// followpos attributes. Earlier patterns end up to the left of the `OR`
/// spine, which is what makes them win ties later.
pub fn parse_tokens(tokens: &[ScanToken<'_>]) -> Result<RegexTree, Error> {
    let mut builder = TreeBuilder::default();
    let mut root: Option<NodeID> = None;
    for tok in tokens.iter().rev() {
        let expr = if tok.verbatim {
            builder.verbatim_chain(tok.pattern)
        } else {
            let mut m = Matcher::new(tok.pattern);
            builder.parse_alternation(&mut m).filter(|_| m.is_empty())
        };
        let expr = expr.ok_or_else(|| Error::UnparsableRegex {
            pattern: tok.pattern.to_owned(),
        })?;
        let token_leaf = builder.token(tok.token);
        let augmented = builder.and(expr, token_leaf);
        root = Some(match root {
            Some(rest) => builder.or(augmented, rest),
            None => augmented,
        });
    }
    let root = root.ok_or_else(|| Error::UnparsableRegex {
        pattern: String::new(),
    })?;

    let mut tree = RegexTree {
        nodes: builder.nodes,
        root,
    };
    tree.set_nullable(root);
    tree.set_firsts_lasts(root);
    tree.set_follows(root);
    tracing::trace!(nodes = tree.len(), "parsed regex token tree");
    Ok(tree)
}

#[derive(Debug, Default)]
struct TreeBuilder {
    nodes: Vec<RegexNode>,
}

impl TreeBuilder {
    fn push(&mut self, kind: NodeKind, children: Vec<NodeID>, begin: u8, end: u8, token: usize) -> NodeID {
        self.nodes.push(RegexNode {
            kind,
            children,
            begin,
            end,
            token,
            nullable: false,
            firsts: vec![],
            lasts: vec![],
            follows: vec![],
        });
        NodeID::new(self.nodes.len() - 1)
    }

    fn char_range(&mut self, begin: u8, end: u8) -> NodeID {
        self.push(NodeKind::CharRange, vec![], begin, end, 0)
    }

    fn token(&mut self, token: usize) -> NodeID {
        self.push(NodeKind::Token, vec![], 0, 0, token)
    }

    fn and(&mut self, left: NodeID, right: NodeID) -> NodeID {
        self.push(NodeKind::And, vec![left, right], 0, 0, 0)
    }

    fn or(&mut self, left: NodeID, right: NodeID) -> NodeID {
        self.push(NodeKind::Or, vec![left, right], 0, 0, 0)
    }

    fn wrap(&mut self, kind: NodeKind, child: NodeID) -> NodeID {
        self.push(kind, vec![child], 0, 0, 0)
    }

    /// A literal's text as a right-leaning concatenation of its characters.
    fn verbatim_chain(&mut self, text: &str) -> Option<NodeID> {
        let mut chars = vec![];
        let mut bytes = text.bytes();
        while let Some(c) = bytes.next() {
            let c = if c == b'\\' {
                unescape(bytes.next()?)
            } else {
                c
            };
            chars.push(c);
        }
        let mut chain: Option<NodeID> = None;
        for &c in chars.iter().rev() {
            let leaf = self.char_range(c, c + 1);
            chain = Some(match chain {
                Some(rest) => self.and(leaf, rest),
                None => leaf,
            });
        }
        chain
    }

    /// `alt ('|' alt)*`; alternation binds weaker than concatenation.
    fn parse_alternation(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        let mut lhs = self.parse_concatenation(m)?;
        loop {
            let rhs = m.attempt(|m| {
                if !m.match_char(b'|') {
                    return None;
                }
                self.parse_concatenation(m)
            });
            match rhs {
                Some(rhs) => lhs = self.or(lhs, rhs),
                None => return Some(lhs),
            }
        }
    }

    /// Concatenation by juxtaposition, built right-leaning.
    fn parse_concatenation(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        let lhs = self.parse_postfixed(m)?;
        match self.parse_concatenation(m) {
            Some(rhs) => Some(self.and(lhs, rhs)),
            None => Some(lhs),
        }
    }

    fn parse_postfixed(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        let node = self
            .parse_bracket(m)
            .or_else(|| self.parse_group(m))
            .or_else(|| self.parse_dot(m))
            .or_else(|| self.parse_escaped_char(m))?;
        match m.match_any_char_in(b"+?*") {
            b'+' => Some(self.wrap(NodeKind::NonZero, node)),
            b'?' => Some(self.wrap(NodeKind::Opt, node)),
            b'*' => Some(self.wrap(NodeKind::Many, node)),
            _ => Some(node),
        }
    }

    /// `[…]` with optional leading `^`, literal `-` first or last, inclusive
    /// `a-z` ranges and the POSIX class names.
    fn parse_bracket(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        let mut set = MergedRanges::default();
        let negated = m.attempt(|m| {
            if !m.match_char(b'[') {
                return None;
            }
            let negated = m.match_char(b'^');
            if m.match_char(b'-') {
                set.insert_char(b'-');
            }
            loop {
                if let Some((_, class)) = POSIX_CLASSES
                    .iter()
                    .find(|(name, _)| m.match_str(name))
                {
                    class.add_to(&mut set);
                    continue;
                }
                let begin = m.match_possibly_escaped_char_not_in(b"^]-");
                if begin == 0 {
                    break;
                }
                let range_end = m.attempt(|m| {
                    if !m.match_char(b'-') {
                        return None;
                    }
                    match m.match_possibly_escaped_char_not_in(b"^]-") {
                        0 => None,
                        end => Some(end),
                    }
                });
                match range_end {
                    Some(end) => set.insert(begin, end + 1),
                    None => set.insert_char(begin),
                }
            }
            if m.match_char(b'-') {
                set.insert_char(b'-');
            }
            if !m.match_char(b']') {
                return None;
            }
            Some(negated)
        })?;
        if negated {
            set.negate();
        }
        // A right-leaning OR over the set's intervals.
        let mut node: Option<NodeID> = None;
        for (begin, end) in set.iter().rev() {
            let leaf = self.char_range(begin, end);
            node = Some(match node {
                Some(rest) => self.or(leaf, rest),
                None => leaf,
            });
        }
        node
    }

    fn parse_group(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        let mut inner = None;
        m.attempt(|m| {
            if !m.match_char(b'(') {
                return None;
            }
            inner = self.parse_alternation(m);
            (inner.is_some() && m.match_char(b')')).then_some(())
        })?;
        inner
    }

    fn parse_dot(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        m.match_char(b'.').then(|| self.char_range(1, CHAR_MAX))
    }

    fn parse_escaped_char(&mut self, m: &mut Matcher<'_>) -> Option<NodeID> {
        match m.match_possibly_escaped_char_not_in(b"|*+?()") {
            0 => None,
            c => Some(self.char_range(c, c + 1)),
        }
    }
}

impl RegexTree {
    fn set_nullable(&mut self, id: NodeID) {
        let children = self.nodes[id.index()].children.clone();
        for &c in &children {
            self.set_nullable(c);
        }
        let node = &self.nodes[id.index()];
        let nullable = match node.kind {
            NodeKind::Or => children.iter().any(|c| self.nodes[c.index()].nullable),
            NodeKind::And => children.iter().all(|c| self.nodes[c.index()].nullable),
            NodeKind::Opt | NodeKind::Many | NodeKind::Token => true,
            NodeKind::NonZero => self.nodes[children[0].index()].nullable,
            NodeKind::CharRange => node.begin == node.end,
        };
        self.nodes[id.index()].nullable = nullable;
    }

    fn set_firsts_lasts(&mut self, id: NodeID) {
        let children = self.nodes[id.index()].children.clone();
        for &c in &children {
            self.set_firsts_lasts(c);
        }
        let (firsts, lasts) = match self.nodes[id.index()].kind {
            NodeKind::Or => {
                let mut firsts = vec![];
                let mut lasts = vec![];
                for &c in &children {
                    firsts.extend_from_slice(&self.nodes[c.index()].firsts);
                    lasts.extend_from_slice(&self.nodes[c.index()].lasts);
                }
                (firsts, lasts)
            }
            NodeKind::And => {
                let mut firsts = self.nodes[children[0].index()].firsts.clone();
                if self.nodes[children[0].index()].nullable {
                    firsts.extend_from_slice(&self.nodes[children[1].index()].firsts);
                }
                let mut lasts = self.nodes[children[1].index()].lasts.clone();
                if self.nodes[children[1].index()].nullable {
                    lasts.extend_from_slice(&self.nodes[children[0].index()].lasts);
                }
                (firsts, lasts)
            }
            NodeKind::Opt | NodeKind::Many | NodeKind::NonZero => (
                self.nodes[children[0].index()].firsts.clone(),
                self.nodes[children[0].index()].lasts.clone(),
            ),
            NodeKind::CharRange | NodeKind::Token => (vec![id], vec![id]),
        };
        self.nodes[id.index()].firsts = firsts;
        self.nodes[id.index()].lasts = lasts;
    }

    fn set_follows(&mut self, id: NodeID) {
        let children = self.nodes[id.index()].children.clone();
        for &c in &children {
            self.set_follows(c);
        }
        match self.nodes[id.index()].kind {
            NodeKind::And => {
                let lasts = self.nodes[children[0].index()].lasts.clone();
                let firsts = self.nodes[children[1].index()].firsts.clone();
                for l in lasts {
                    self.nodes[l.index()].follows.extend_from_slice(&firsts);
                }
            }
            NodeKind::Many | NodeKind::NonZero => {
                let lasts = self.nodes[children[0].index()].lasts.clone();
                let firsts = self.nodes[id.index()].firsts.clone();
                for l in lasts {
                    let leaf = &self.nodes[l.index()];
                    if matches!(leaf.kind, NodeKind::CharRange | NodeKind::Token) {
                        self.nodes[l.index()].follows.extend_from_slice(&firsts);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pattern: &str) -> RegexTree {
        parse_tokens(&[ScanToken {
            pattern,
            verbatim: false,
            token: 0,
        }])
        .unwrap()
    }

    fn leaf_ranges(tree: &RegexTree) -> Vec<(u8, u8)> {
        (0..tree.len())
            .map(|i| NodeID::new(i))
            .filter(|&id| tree.node(id).kind == NodeKind::CharRange)
            .map(|id| (tree.node(id).begin, tree.node(id).end))
            .collect()
    }

    #[test]
    fn bracket_with_posix_class() {
        let tree = single("[[:digit:]x]");
        assert_eq!(leaf_ranges(&tree), [(b'0', b'9' + 1), (b'x', b'x' + 1)]);
    }

    #[test]
    fn negated_bracket_excludes_nul() {
        let tree = single("[^a]");
        assert_eq!(leaf_ranges(&tree), [(1, b'a'), (b'a' + 1, CHAR_MAX)]);
    }

    #[test]
    fn bracket_merges_overlapping_ranges() {
        let tree = single("[a-fc-j]");
        assert_eq!(leaf_ranges(&tree), [(b'a', b'j' + 1)]);
    }

    #[test]
    fn literal_dash_first_or_last() {
        let tree = single("[-az-]");
        assert_eq!(
            leaf_ranges(&tree),
            [(b'-', b'-' + 1), (b'a', b'a' + 1), (b'z', b'z' + 1)]
        );
    }

    #[test]
    fn dot_matches_everything_but_nul() {
        let tree = single(".");
        assert_eq!(leaf_ranges(&tree), [(1, CHAR_MAX)]);
    }

    #[test]
    fn quantifier_nullability() {
        let tree = single("a*");
        let root = tree.node(tree.root());
        assert_eq!(root.kind, NodeKind::And);
        let star = tree.node(root.children[0]);
        assert_eq!(star.kind, NodeKind::Many);
        assert!(star.nullable);
        // The augmented root stays nullable: TOKEN leaves are nullable and
        // so is the starred expression.
        assert!(root.nullable);

        let tree = single("a+");
        let root = tree.node(tree.root());
        assert!(!tree.node(root.children[0]).nullable);
    }

    #[test]
    fn followpos_of_a_starred_leaf_loops_back() {
        let tree = single("a*");
        let leaf = (0..tree.len())
            .map(NodeID::new)
            .find(|&id| tree.node(id).kind == NodeKind::CharRange)
            .unwrap();
        // `a` is followed by itself (the loop) and by the token leaf.
        let follows = &tree.node(leaf).follows;
        assert!(follows.contains(&leaf));
        assert!(follows
            .iter()
            .any(|f| tree.node(*f).kind == NodeKind::Token));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse_tokens(&[ScanToken {
            pattern: "a)b",
            verbatim: false,
            token: 0,
        }]);
        assert!(matches!(err, Err(Error::UnparsableRegex { .. })));

        let err = parse_tokens(&[ScanToken {
            pattern: "(",
            verbatim: false,
            token: 0,
        }]);
        assert!(matches!(err, Err(Error::UnparsableRegex { .. })));
    }

    #[test]
    fn verbatim_pattern_decodes_escapes() {
        let tree = parse_tokens(&[ScanToken {
            pattern: r"a\tb",
            verbatim: true,
            token: 3,
        }])
        .unwrap();
        assert_eq!(
            leaf_ranges(&tree),
            [(b'a', b'a' + 1), (b'\t', b'\t' + 1), (b'b', b'b' + 1)]
        );
    }
}
