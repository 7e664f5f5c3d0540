//! Variable bindings and the tokens that carry them through the network.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use seine_foundation::{FactId, Value};

/// Variables bound by a (partial) match.
///
/// Holds variable values and, separately, the facts bound by name with
/// [`Pattern::bind`](crate::Pattern::bind). Ordered maps keep equality,
/// hashing and iteration deterministic.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bindings {
    values: BTreeMap<Arc<str>, Value>,
    facts: BTreeMap<Arc<str>, FactId>,
}

impl Bindings {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable value.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&Value> {
        self.values.get(var)
    }

    /// Get the fact bound to a name.
    #[must_use]
    pub fn get_fact(&self, name: &str) -> Option<FactId> {
        self.facts.get(name).copied()
    }

    /// Set a variable value.
    pub fn set(&mut self, var: Arc<str>, value: Value) {
        self.values.insert(var, value);
    }

    /// Bind a fact to a name.
    pub fn set_fact(&mut self, name: Arc<str>, id: FactId) {
        self.facts.insert(name, id);
    }

    /// Iterate variable values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.values.iter()
    }

    /// Iterate named facts in name order.
    pub fn facts(&self) -> impl Iterator<Item = (&Arc<str>, FactId)> {
        self.facts.iter().map(|(k, v)| (k, *v))
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if every shared variable and fact name agrees.
    #[must_use]
    pub fn compatible(&self, other: &Self) -> bool {
        other
            .values
            .iter()
            .all(|(k, v)| self.values.get(k).is_none_or(|mine| mine == v))
            && other
                .facts
                .iter()
                .all(|(k, v)| self.facts.get(k).is_none_or(|mine| mine == v))
    }

    /// Adds every binding of `other`, keeping existing values.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.values {
            self.values.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.facts {
            self.facts.entry(k.clone()).or_insert(*v);
        }
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in &self.values {
            map.entry(k, v);
        }
        for (k, v) in &self.facts {
            map.entry(k, v);
        }
        map.finish()
    }
}

/// A partial or complete match propagating through one clause's chain.
///
/// `facts` lists the matched facts in clause order, one per positive
/// pattern passed so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    /// Matched facts in clause order.
    pub facts: Vec<FactId>,
    /// Bindings established so far.
    pub bindings: Bindings,
}

impl Token {
    /// The empty token every chain starts from.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Extends the token with one more fact and its bindings.
    #[must_use]
    pub fn extend(&self, fact: FactId, bindings: &Bindings) -> Self {
        let mut facts = self.facts.clone();
        facts.push(fact);
        let mut merged = self.bindings.clone();
        merged.merge(bindings);
        Self {
            facts,
            bindings: merged,
        }
    }
}
