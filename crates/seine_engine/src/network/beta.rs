//! Beta nodes: the per-clause chain of joins, negations and filters.
//!
//! Each clause compiles to a chain. Node `i` handles clause element `i`;
//! its left input is the output of node `i - 1` and node 0 starts from the
//! root token. Every node keeps its own right memory so a fact matching two
//! positions of the same clause joins with itself exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use seine_foundation::FactId;

use crate::bindings::Token;
use crate::condition::Test;

use super::alpha::AlphaMatch;

/// A token entering or leaving a node; `true` marks an addition.
pub(crate) type Signal = (Token, bool);

pub(crate) enum BetaNode {
    /// Positive pattern: extends left tokens with matching facts.
    Join {
        binding: Option<Arc<str>>,
        left: BTreeSet<Token>,
        right: BTreeMap<FactId, AlphaMatch>,
    },
    /// Negated pattern: passes left tokens no right fact matches.
    Negation {
        left: BTreeMap<Token, usize>,
        right: BTreeMap<FactId, AlphaMatch>,
    },
    /// Boolean test over the bindings so far.
    Filter { test: Test, passed: BTreeSet<Token> },
}

impl BetaNode {
    pub fn join(binding: Option<Arc<str>>) -> Self {
        Self::Join {
            binding,
            left: BTreeSet::new(),
            right: BTreeMap::new(),
        }
    }

    pub fn negation() -> Self {
        Self::Negation {
            left: BTreeMap::new(),
            right: BTreeMap::new(),
        }
    }

    pub fn filter(test: Test) -> Self {
        Self::Filter {
            test,
            passed: BTreeSet::new(),
        }
    }

    /// A token arrives from upstream.
    pub fn left_activate(&mut self, token: Token, add: bool, out: &mut Vec<Signal>) {
        match self {
            Self::Join { left, right, .. } => {
                let changed = if add {
                    left.insert(token.clone())
                } else {
                    left.remove(&token)
                };
                if changed {
                    for (id, m) in right.iter() {
                        if m.joins(&token) {
                            out.push((token.extend(*id, &m.bindings), add));
                        }
                    }
                }
            }
            Self::Negation { left, right, .. } => {
                if add {
                    let count = right.values().filter(|m| m.joins(&token)).count();
                    if left.insert(token.clone(), count).is_none() && count == 0 {
                        out.push((token, true));
                    }
                } else if left.remove(&token) == Some(0) {
                    out.push((token, false));
                }
            }
            Self::Filter { test, passed } => {
                if add {
                    if test.eval(&token.bindings) && passed.insert(token.clone()) {
                        out.push((token, true));
                    }
                } else if passed.remove(&token) {
                    out.push((token, false));
                }
            }
        }
    }

    /// A fact enters (`Some`) or leaves (`None`) this node's right memory.
    pub fn right_activate(&mut self, id: FactId, entry: Option<AlphaMatch>, out: &mut Vec<Signal>) {
        match self {
            Self::Join {
                binding,
                left,
                right,
                ..
            } => {
                let (m, add) = match entry {
                    Some(m) => {
                        let m = m.named(binding.as_ref(), id);
                        right.insert(id, m.clone());
                        (m, true)
                    }
                    None => match right.remove(&id) {
                        Some(m) => (m, false),
                        None => return,
                    },
                };
                for token in left.iter().filter(|t| m.joins(t)) {
                    out.push((token.extend(id, &m.bindings), add));
                }
            }
            Self::Negation { left, right, .. } => match entry {
                Some(m) => {
                    for (token, count) in left.iter_mut() {
                        if m.joins(token) {
                            *count += 1;
                            if *count == 1 {
                                out.push((token.clone(), false));
                            }
                        }
                    }
                    right.insert(id, m);
                }
                None => {
                    let Some(m) = right.remove(&id) else { return };
                    for (token, count) in left.iter_mut() {
                        if m.joins(token) {
                            *count -= 1;
                            if *count == 0 {
                                out.push((token.clone(), true));
                            }
                        }
                    }
                }
            },
            Self::Filter { .. } => {}
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Join { left, right, .. } => {
                left.clear();
                right.clear();
            }
            Self::Negation { left, right, .. } => {
                left.clear();
                right.clear();
            }
            Self::Filter { passed, .. } => passed.clear(),
        }
    }
}

/// The beta chain of one clause.
pub(crate) struct ClauseChain {
    nodes: Vec<BetaNode>,
}

impl ClauseChain {
    pub fn new(nodes: Vec<BetaNode>) -> Self {
        let mut chain = Self { nodes };
        chain.seed();
        chain
    }

    /// Feeds a fact into position `pos` and returns the complete matches
    /// that appeared or disappeared as a result.
    pub fn right_activate(&mut self, pos: usize, id: FactId, entry: Option<AlphaMatch>) -> Vec<Signal> {
        let mut signals = Vec::new();
        self.nodes[pos].right_activate(id, entry, &mut signals);
        for node in &mut self.nodes[pos + 1..] {
            if signals.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for (token, add) in signals {
                node.left_activate(token, add, &mut next);
            }
            signals = next;
        }
        signals
    }

    /// Drops every partial match and re-seeds the root token.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.clear();
        }
        self.seed();
    }

    fn seed(&mut self) {
        if let Some(first) = self.nodes.first_mut() {
            let mut ignored = Vec::new();
            first.left_activate(Token::root(), true, &mut ignored);
        }
    }
}
