//! DFA construction by the direct (followpos) method, and the scan runtime.
//!
//! A D-state is identified by its label, the ordered list of regex-tree
//! leaves it stands for. Each state's outgoing alphabet is partitioned with
//! an [`UnmergedRanges`] refinement so that every emitted interval selects
//! an unambiguous set of successor leaves. Transitions land in one flat
//! vector, contiguous per state, with `transitions_begin` prefix sums.

use crate::{
    error::Error,
    grammar::{Grammar, SymbolID},
    ranges::UnmergedRanges,
    regex::{self, NodeID, NodeKind, RegexTree, ScanToken},
    types::Map,
};

/// One DFA state. `token` is only meaningful when `accepting` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DState {
    pub transitions_begin: usize,
    pub accepting: bool,
    pub token: usize,
}

/// One DFA transition over the byte interval `[begin, end)`.
///
/// A zero-width transition (`begin == end`) is terminal: `next` holds the
/// recognized token id instead of a state index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaTransition {
    pub from: usize,
    pub begin: u8,
    pub end: u8,
    pub next: usize,
}

/// A successful scan: the consumed slice and the recognized token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned<'i> {
    pub text: &'i str,
    pub token: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Dfa {
    pub states: Vec<DState>,
    pub transitions: Vec<DfaTransition>,
}

impl Dfa {
    /// Compiles one or more regex patterns; pattern `i` accepts with token
    /// id `i`, earlier patterns winning ties.
    pub fn from_patterns(patterns: &[&str]) -> Result<Self, Error> {
        let tokens: Vec<ScanToken<'_>> = patterns
            .iter()
            .enumerate()
            .map(|(i, pattern)| ScanToken {
                pattern,
                verbatim: false,
                token: i,
            })
            .collect();
        let tree = regex::parse_tokens(&tokens)?;
        Self::build(&tree)
    }

    /// Builds the DFA for an attributed regex tree.
    pub fn build(tree: &RegexTree) -> Result<Self, Error> {
        let mut labels: Vec<Vec<NodeID>> = vec![tree.node(tree.root()).firsts.clone()];
        let mut label_index: Map<Vec<NodeID>, usize> = Map::default();
        label_index.insert(labels[0].clone(), 0);
        let mut accepting: Vec<(usize, usize)> = vec![];
        let mut transitions: Vec<DfaTransition> = vec![];

        let mut current = 0;
        while current < labels.len() {
            let mut ranges = UnmergedRanges::default();
            for &leaf in &labels[current] {
                let node = tree.node(leaf);
                ranges.insert(node.begin, node.end);
            }

            let recognized: Vec<usize> = labels[current]
                .iter()
                .filter(|&&leaf| tree.node(leaf).kind == NodeKind::Token)
                .map(|&leaf| tree.node(leaf).token)
                .collect();

            for (begin, end) in ranges.partition() {
                let mut next_label: Vec<NodeID> = vec![];
                for &leaf in &labels[current] {
                    let node = tree.node(leaf);
                    if begin >= node.begin && end <= node.end {
                        next_label.extend_from_slice(&node.follows);
                    }
                }

                if !recognized.is_empty() {
                    accepting.push((current, recognized[0]));
                }

                let next = if begin == end {
                    // Only token leaves produce a zero-width interval; the
                    // transition is terminal and carries the token id.
                    *recognized.first().ok_or(Error::TokenNotRecognized)?
                } else {
                    match label_index.get(&next_label) {
                        Some(&found) => found,
                        None => {
                            label_index.insert(next_label.clone(), labels.len());
                            labels.push(next_label);
                            labels.len() - 1
                        }
                    }
                };
                transitions.push(DfaTransition {
                    from: current,
                    begin,
                    end,
                    next,
                });
            }
            current += 1;
        }

        let mut counts = vec![0usize; labels.len()];
        for t in &transitions {
            counts[t.from] += 1;
        }
        let mut states = Vec::with_capacity(labels.len());
        let mut sum = 0;
        for &count in &counts {
            states.push(DState {
                transitions_begin: sum,
                accepting: false,
                token: 0,
            });
            sum += count;
        }
        // First added wins: an earlier pattern shadows a later one that
        // accepts in the same state.
        for (state, token) in accepting {
            if !states[state].accepting {
                states[state].accepting = true;
                states[state].token = token;
            }
        }

        tracing::trace!(
            states = states.len(),
            transitions = transitions.len(),
            "built scanner DFA"
        );
        Ok(Self {
            states,
            transitions,
        })
    }

    /// Steps the DFA greedily from `offset`, reporting a match iff the
    /// state reached when no transition applies is accepting. Consumed
    /// characters are never given back.
    pub fn scan<'i>(&self, input: &'i str, offset: usize) -> Option<Scanned<'i>> {
        let bytes = input.as_bytes();
        let mut pos = offset;
        let mut state = 0;
        while state < self.states.len() {
            let c = bytes.get(pos).copied().unwrap_or(0);
            let mut t = self.states[state].transitions_begin;
            while t < self.transitions.len()
                && self.transitions[t].from == state
                && !(self.transitions[t].begin <= c && c < self.transitions[t].end)
            {
                t += 1;
            }
            if t < self.transitions.len() && self.transitions[t].from == state {
                state = self.transitions[t].next;
                pos += 1;
            } else if self.states[state].accepting {
                return Some(Scanned {
                    text: &input[offset..pos],
                    token: self.states[state].token,
                });
            } else {
                break;
            }
        }
        None
    }
}

/// Assembles the grammar's composite scanner: every `%whitespace` regex
/// (bound to the `.whitespace` symbol) followed by every terminal (bound to
/// its own symbol id), compiled into a single DFA.
pub(crate) fn build_composite_scanner(g: &Grammar) -> Result<Dfa, Error> {
    let mut tokens: Vec<ScanToken<'_>> = vec![];
    for pattern in g.whitespace_patterns() {
        tokens.push(ScanToken {
            pattern,
            verbatim: false,
            token: SymbolID::WHITESPACE.index(),
        });
    }
    for (id, symbol) in g.symbols() {
        if symbol.is_terminal() {
            tokens.push(ScanToken {
                pattern: &symbol.name,
                verbatim: symbol.verbatim,
                token: id.index(),
            });
        }
    }
    tracing::debug!(tokens = tokens.len(), "assembling composite scanner");
    let tree = regex::parse_tokens(&tokens)?;
    Dfa::build(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all<'i>(dfa: &Dfa, input: &'i str) -> Option<(&'i str, usize)> {
        dfa.scan(input, 0).map(|s| (s.text, s.token))
    }

    #[test]
    fn longest_match_with_earlier_pattern_winning_ties() {
        let dfa = Dfa::from_patterns(&[
            r"(\+|\-)?[0-9]+",
            r"(\+|\-)?[0-9]+(\.[0-9]+)?((e|E)(\+|\-)?[0-9]+)?",
            r"[^h]+",
        ])
        .unwrap();
        assert_eq!(scan_all(&dfa, "-332.235e-34"), Some(("-332.235e-34", 1)));
        assert_eq!(scan_all(&dfa, "33"), Some(("33", 0)));
        assert_eq!(scan_all(&dfa, "ello world!"), Some(("ello world!", 2)));
    }

    #[test]
    fn bracket_expression_with_overlapping_ranges() {
        let dfa = Dfa::from_patterns(&["[a-gi-me-j]"]).unwrap();
        for c in ["a", "f", "h", "j", "k"] {
            assert_eq!(scan_all(&dfa, c), Some((c, 0)), "{c} should match");
        }
        assert_eq!(dfa.scan("n", 0), None);
        assert_eq!(dfa.scan("z", 0), None);
    }

    #[test]
    fn scan_from_offset() {
        let dfa = Dfa::from_patterns(&["[0-9]+"]).unwrap();
        let scanned = dfa.scan("ab123cd", 2).unwrap();
        assert_eq!(scanned.text, "123");
        assert_eq!(scanned.token, 0);
    }

    #[test]
    fn no_match_reports_nothing() {
        let dfa = Dfa::from_patterns(&["[0-9]+"]).unwrap();
        assert_eq!(dfa.scan("x", 0), None);
        assert_eq!(dfa.scan("", 0), None);
    }

    #[test]
    fn scanner_does_not_backtrack() {
        // "ab" matches, "ab!" is a longer candidate that dead-ends after
        // consuming the bang; the scanner must not return to "ab".
        let dfa = Dfa::from_patterns(&["ab", "ab!x"]).unwrap();
        assert_eq!(scan_all(&dfa, "ab"), Some(("ab", 0)));
        assert_eq!(scan_all(&dfa, "ab!x"), Some(("ab!x", 1)));
        assert_eq!(dfa.scan("ab!y", 0), None);
    }

    #[test]
    fn nullable_pattern_accepts_in_the_start_state() {
        let dfa = Dfa::from_patterns(&["[ \t]*", "[0-9]+"]).unwrap();
        assert_eq!(scan_all(&dfa, "  9"), Some(("  ", 0)));
        // At a position where no whitespace follows, the zero-width match
        // of the starred pattern still wins over no match at all.
        assert_eq!(scan_all(&dfa, "x"), Some(("", 0)));
        assert_eq!(scan_all(&dfa, "42"), Some(("42", 1)));
    }

    #[test]
    fn transition_intervals_are_disjoint_per_state() {
        let dfa = Dfa::from_patterns(&[
            r"(\+|\-)?[0-9]+",
            r"[A-Za-z_][A-Za-z0-9_]*",
            r"[ \t\r\n]*",
            "<=|>=|<|>",
        ])
        .unwrap();
        for (i, state) in dfa.states.iter().enumerate() {
            let mut intervals: Vec<(u8, u8)> = dfa
                .transitions
                .iter()
                .skip(state.transitions_begin)
                .take_while(|t| t.from == i)
                .filter(|t| t.begin < t.end)
                .map(|t| (t.begin, t.end))
                .collect();
            intervals.sort();
            for pair in intervals.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlap in state {i}");
            }
        }
    }

    #[test]
    fn zero_width_transitions_carry_the_token_id() {
        let dfa = Dfa::from_patterns(&["[0-9]+"]).unwrap();
        let zero_width: Vec<_> = dfa
            .transitions
            .iter()
            .filter(|t| t.begin == t.end)
            .collect();
        assert!(!zero_width.is_empty());
        for t in zero_width {
            assert_eq!(t.next, 0, "terminal transition holds the token id");
            assert!(dfa.states[t.from].accepting);
        }
    }
}
