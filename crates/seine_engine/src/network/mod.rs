//! Incremental matching network.
//!
//! Rules compile into shared alpha nodes (single-fact tests) feeding one
//! beta chain per normalized clause, ending in a terminal node per
//! (rule, clause) pair. The network consumes working-memory deltas and
//! accumulates the resulting activation delta until it is taken.
//!
//! Ordering invariants for one fact:
//! - additions feed each clause's positions in ascending order, each right
//!   memory updated just before its own activation;
//! - removals feed positions in descending order.
//!
//! Together with set-valued memories this makes every combination appear
//! and disappear exactly once, including self-joins.

mod alpha;
mod beta;
mod terminal;

use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::{Fact, FactId, Result};

use crate::activation::Activation;
use crate::condition::{ClauseElement, Pattern};
use crate::rule::{Rule, RuleId};

use alpha::AlphaNode;
use beta::{BetaNode, ClauseChain, Signal};
use terminal::{MatchKey, TerminalNode};

/// Activations that appeared or disappeared since the last take.
#[derive(Clone, Debug, Default)]
pub struct NetworkDelta {
    /// Newly valid activations.
    pub added: Vec<Activation>,
    /// Activations no longer valid.
    pub removed: Vec<Activation>,
}

impl NetworkDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Size counters, for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Distinct alpha nodes.
    pub alpha_nodes: usize,
    /// Beta chains, one per normalized clause.
    pub clauses: usize,
    /// Facts currently known to the network.
    pub facts: usize,
    /// Currently valid activations.
    pub matches: usize,
}

/// Engine-owned RETE network.
#[derive(Default)]
pub struct ReteNetwork {
    alphas: Vec<AlphaNode>,
    /// Per alpha node: the (chain, position) pairs it feeds.
    subscribers: Vec<Vec<(usize, usize)>>,
    chains: Vec<ClauseChain>,
    terminals: Vec<TerminalNode>,
    rules: Vec<Rc<Rule>>,
    facts: BTreeMap<FactId, Arc<Fact>>,
    /// Number of clause-level matches backing each rule-level match.
    support: BTreeMap<MatchKey, usize>,
    added: BTreeMap<MatchKey, Activation>,
    removed: BTreeMap<MatchKey, Activation>,
}

impl ReteNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a rule into the network and matches it against the facts
    /// already present.
    ///
    /// # Errors
    /// Configuration errors from clause validation; the network is left
    /// unchanged.
    pub fn add_rule(&mut self, rule: Rc<Rule>) -> Result<RuleId> {
        let clauses = rule.clauses();
        for clause in &clauses {
            clause.validate(&rule.name)?;
        }

        let id = RuleId(self.rules.len());
        self.rules.push(rule);

        let first_alpha = self.alphas.len();
        let first_chain = self.chains.len();
        for clause in clauses {
            let chain = self.chains.len();
            let mut nodes = Vec::with_capacity(clause.elements().len());
            for (pos, element) in clause.elements().iter().enumerate() {
                let node = match element {
                    ClauseElement::Match(p) => {
                        self.subscribe(p, chain, pos);
                        BetaNode::join(p.binding().cloned())
                    }
                    ClauseElement::NotMatch(p) => {
                        self.subscribe(p, chain, pos);
                        BetaNode::negation()
                    }
                    ClauseElement::Test(t) => BetaNode::filter(t.clone()),
                };
                nodes.push(node);
            }
            self.chains.push(ClauseChain::new(nodes));
            self.terminals.push(TerminalNode::new(id));
        }

        for alpha in &mut self.alphas[first_alpha..] {
            for (fid, fact) in &self.facts {
                alpha.activate(fact, *fid);
            }
        }
        let existing: Vec<FactId> = self.facts.keys().copied().collect();
        for fid in existing {
            self.insert(fid, first_chain);
        }

        Ok(id)
    }

    /// Applies a working-memory delta.
    pub fn apply(&mut self, added: &[Arc<Fact>], removed: &[FactId]) {
        for &fid in removed {
            self.retract(fid);
        }
        for fact in added {
            let Some(fid) = fact.id() else { continue };
            self.facts.insert(fid, Arc::clone(fact));
            for alpha in &mut self.alphas {
                alpha.activate(fact, fid);
            }
            self.insert(fid, 0);
        }
    }

    /// Takes the accumulated activation delta.
    pub fn take_delta(&mut self) -> NetworkDelta {
        NetworkDelta {
            added: mem::take(&mut self.added).into_values().collect(),
            removed: mem::take(&mut self.removed).into_values().collect(),
        }
    }

    /// Clears every node memory, the fact table and the pending delta.
    /// Compiled structure is kept.
    pub fn reset(&mut self) {
        for alpha in &mut self.alphas {
            alpha.clear();
        }
        for chain in &mut self.chains {
            chain.reset();
        }
        for terminal in &mut self.terminals {
            terminal.clear();
        }
        self.facts.clear();
        self.support.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Registered rules, indexed by [`RuleId`].
    #[must_use]
    pub fn rules(&self) -> &[Rc<Rule>] {
        &self.rules
    }

    /// Currently valid activations of one rule, including those already
    /// fired or not yet taken.
    #[must_use]
    pub fn conflict_set(&self, rule: RuleId) -> Vec<Activation> {
        self.support
            .keys()
            .filter(|(r, _, _)| *r == rule)
            .map(|key| self.activation(key))
            .collect()
    }

    /// Returns size counters.
    #[must_use]
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            alpha_nodes: self.alphas.len(),
            clauses: self.chains.len(),
            facts: self.facts.len(),
            matches: self.support.len(),
        }
    }

    /// Connects a clause position to the alpha node testing `pattern`,
    /// creating the node if no equivalent one exists.
    fn subscribe(&mut self, pattern: &Pattern, chain: usize, pos: usize) {
        let idx = match self.alphas.iter().position(|a| a.pattern().same_tests(pattern)) {
            Some(idx) => idx,
            None => {
                self.alphas.push(AlphaNode::new(pattern.clone()));
                self.subscribers.push(Vec::new());
                self.alphas.len() - 1
            }
        };
        self.subscribers[idx].push((chain, pos));
    }

    /// (chain, position, alpha) triples a remembered fact feeds.
    fn targets(&self, fid: FactId, first_chain: usize) -> Vec<(usize, usize, usize)> {
        let mut targets = Vec::new();
        for (a, alpha) in self.alphas.iter().enumerate() {
            if alpha.get(fid).is_some() {
                targets.extend(
                    self.subscribers[a]
                        .iter()
                        .filter(|(chain, _)| *chain >= first_chain)
                        .map(|&(chain, pos)| (chain, pos, a)),
                );
            }
        }
        targets
    }

    fn insert(&mut self, fid: FactId, first_chain: usize) {
        let mut targets = self.targets(fid, first_chain);
        targets.sort_unstable();
        for (chain, pos, a) in targets {
            let entry = self.alphas[a].get(fid).cloned();
            let signals = self.chains[chain].right_activate(pos, fid, entry);
            self.terminate(chain, signals);
        }
    }

    fn retract(&mut self, fid: FactId) {
        if !self.facts.contains_key(&fid) {
            return;
        }
        let mut targets = self.targets(fid, 0);
        targets.sort_unstable_by(|a, b| b.cmp(a));
        for (chain, pos, _) in targets {
            let signals = self.chains[chain].right_activate(pos, fid, None);
            self.terminate(chain, signals);
        }
        for alpha in &mut self.alphas {
            alpha.deactivate(fid);
        }
        self.facts.remove(&fid);
    }

    fn terminate(&mut self, chain: usize, signals: Vec<Signal>) {
        for (token, add) in signals {
            let Some(key) = self.terminals[chain].activate(token, add) else {
                continue;
            };
            if add {
                let count = self.support.entry(key.clone()).or_insert(0);
                *count += 1;
                if *count == 1 && self.removed.remove(&key).is_none() {
                    let activation = self.activation(&key);
                    self.added.insert(key, activation);
                }
            } else if let Some(count) = self.support.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.support.remove(&key);
                    if self.added.remove(&key).is_none() {
                        let activation = self.activation(&key);
                        self.removed.insert(key, activation);
                    }
                }
            }
        }
    }

    fn activation(&self, key: &MatchKey) -> Activation {
        let (rule, facts, bindings) = key;
        let facts = facts
            .iter()
            .filter_map(|fid| self.facts.get(fid).cloned())
            .collect();
        Activation::new(
            *rule,
            Rc::clone(&self.rules[rule.index()]),
            facts,
            bindings.clone(),
        )
    }
}
