//! Terminal nodes: the conflict set of one (rule, clause) pair.

use std::collections::BTreeSet;

use seine_foundation::FactId;

use crate::bindings::{Bindings, Token};
use crate::rule::RuleId;

/// Identity of a complete match at the rule level.
///
/// Fact ids are sorted and deduplicated so two clauses matching the same
/// facts with the same bindings produce the same key.
pub(crate) type MatchKey = (RuleId, Vec<FactId>, Bindings);

pub(crate) struct TerminalNode {
    rule: RuleId,
    memory: BTreeSet<Token>,
}

impl TerminalNode {
    pub fn new(rule: RuleId) -> Self {
        Self {
            rule,
            memory: BTreeSet::new(),
        }
    }

    /// Records a complete match; returns its key if the conflict set changed.
    pub fn activate(&mut self, token: Token, add: bool) -> Option<MatchKey> {
        let changed = if add {
            self.memory.insert(token.clone())
        } else {
            self.memory.remove(&token)
        };
        changed.then(|| {
            let mut facts = token.facts;
            facts.sort();
            facts.dedup();
            (self.rule, facts, token.bindings)
        })
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }
}
