//! Activations: rules matched against a specific set of facts.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::{Fact, FactId, Value};

use crate::bindings::Bindings;
use crate::rule::{Rule, RuleId};

/// A fully matched (rule, facts, bindings) triple eligible to fire.
///
/// Identity is the rule, the set of contributing fact ids and the bindings.
/// Re-deriving an equal activation is a no-op wherever activations are
/// collected.
#[derive(Clone)]
pub struct Activation {
    rule_id: RuleId,
    rule: Rc<Rule>,
    facts: Vec<Arc<Fact>>,
    bindings: Bindings,
}

impl Activation {
    /// Creates an activation. Facts are deduplicated and sorted by id.
    #[must_use]
    pub fn new(rule_id: RuleId, rule: Rc<Rule>, mut facts: Vec<Arc<Fact>>, bindings: Bindings) -> Self {
        facts.sort_by_key(|f| f.id());
        facts.dedup_by_key(|f| f.id());
        Self {
            rule_id,
            rule,
            facts,
            bindings,
        }
    }

    /// Returns the rule id.
    #[must_use]
    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    /// Returns the matched rule.
    #[must_use]
    pub fn rule(&self) -> &Rc<Rule> {
        &self.rule
    }

    /// Returns the contributing facts in ascending id order.
    #[must_use]
    pub fn facts(&self) -> &[Arc<Fact>] {
        &self.facts
    }

    /// Iterates over the contributing fact ids in ascending order.
    pub fn fact_ids(&self) -> impl DoubleEndedIterator<Item = FactId> + '_ {
        self.facts.iter().filter_map(|f| f.id())
    }

    /// Returns the full bindings.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Returns a bound variable.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&Value> {
        self.bindings.get(var)
    }

    /// Returns the fact bound to a name by the rule's patterns.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Arc<Fact>> {
        let id = self.bindings.get_fact(name)?;
        self.facts.iter().find(|f| f.id() == Some(id))
    }

    fn identity(&self) -> (RuleId, impl Iterator<Item = FactId> + '_, &Bindings) {
        (self.rule_id, self.fact_ids(), &self.bindings)
    }
}

impl PartialEq for Activation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Activation {}

impl PartialOrd for Activation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Activation {
    fn cmp(&self, other: &Self) -> Ordering {
        let (rule, facts, bindings) = self.identity();
        let (other_rule, other_facts, other_bindings) = other.identity();
        rule.cmp(&other_rule)
            .then_with(|| facts.cmp(other_facts))
            .then_with(|| bindings.cmp(other_bindings))
    }
}

impl Hash for Activation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule_id.hash(state);
        for id in self.fact_ids() {
            id.hash(state);
        }
        self.bindings.hash(state);
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("rule", &self.rule.name)
            .field("facts", &self.fact_ids().collect::<Vec<_>>())
            .field("context", &self.bindings)
            .finish()
    }
}

impl fmt::Display for Activation {
    /// `RULE: <f-1>, <f-3>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.rule.name)?;
        for (i, fact) in self.facts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{fact}")?;
        }
        Ok(())
    }
}
