//! Alpha nodes: single-fact tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use seine_foundation::{Fact, FactId, Value};

use crate::bindings::{Bindings, Token};
use crate::condition::{FieldConstraint, Pattern};

/// What a fact establishes when it passes an alpha node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AlphaMatch {
    /// Variables bound by the pattern.
    pub bindings: Bindings,
    /// Values that earlier bindings of the named variables must differ from.
    pub excludes: Vec<(Arc<str>, Value)>,
}

impl AlphaMatch {
    /// Returns true if this match can extend `token`.
    pub fn joins(&self, token: &Token) -> bool {
        token.bindings.compatible(&self.bindings)
            && self
                .excludes
                .iter()
                .all(|(name, value)| token.bindings.get(name).is_some_and(|bound| bound != value))
    }

    /// Adds the fact binding name, if the pattern position has one.
    pub fn named(&self, binding: Option<&Arc<str>>, id: FactId) -> Self {
        let mut named = self.clone();
        if let Some(name) = binding {
            named.bindings.set_fact(name.clone(), id);
        }
        named
    }
}

/// Tests facts against one pattern and remembers those that passed.
///
/// Shared by every clause position whose pattern tests the same way.
pub(crate) struct AlphaNode {
    pattern: Pattern,
    memory: BTreeMap<FactId, AlphaMatch>,
}

impl AlphaNode {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            memory: BTreeMap::new(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Evaluates the pattern against a fact without touching memory.
    pub fn test(&self, fact: &Fact) -> Option<AlphaMatch> {
        if !fact.fact_type().is_a(self.pattern.fact_type()) {
            return None;
        }

        let mut bindings = Bindings::new();
        let mut excludes = Vec::new();
        for (key, constraint) in self.pattern.fields() {
            let value = fact.get(key)?;
            let ok = match constraint {
                FieldConstraint::Literal(expected) => value == expected,
                FieldConstraint::NotLiteral(unwanted) => value != unwanted,
                FieldConstraint::Wildcard => true,
                FieldConstraint::Predicate(p) => p.eval(value),
                FieldConstraint::Variable(name) => match bindings.get(name) {
                    Some(bound) => bound == value,
                    None => {
                        bindings.set(name.clone(), value.clone());
                        true
                    }
                },
                FieldConstraint::NegatedVariable(name) => {
                    excludes.push((name.clone(), value.clone()));
                    true
                }
            };
            if !ok {
                return None;
            }
        }

        // Negated variables bound by this same pattern are settled here.
        let mut foreign = Vec::with_capacity(excludes.len());
        for (name, value) in excludes {
            match bindings.get(&name) {
                Some(bound) if *bound == value => return None,
                Some(_) => {}
                None => foreign.push((name, value)),
            }
        }

        Some(AlphaMatch {
            bindings,
            excludes: foreign,
        })
    }

    /// Tests and remembers a fact. Returns true if it passed.
    pub fn activate(&mut self, fact: &Fact, id: FactId) -> bool {
        match self.test(fact) {
            Some(m) => {
                self.memory.insert(id, m);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: FactId) -> Option<&AlphaMatch> {
        self.memory.get(&id)
    }

    pub fn deactivate(&mut self, id: FactId) -> Option<AlphaMatch> {
        self.memory.remove(&id)
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }
}
