//! Rules: conditions, salience and an action.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::Result;

use crate::activation::Activation;
use crate::condition::{Clause, Condition};
use crate::engine::KnowledgeEngine;

/// Index of a rule registered on an engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    /// Returns the registration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Callable fired with the engine and the activation that matched.
pub type Action = Rc<dyn Fn(&mut KnowledgeEngine, &Activation) -> Result<()>>;

/// A named condition/action pair with a priority.
#[derive(Clone)]
pub struct Rule {
    /// Rule name, unique within an engine.
    pub name: Arc<str>,
    /// Priority (higher fires first).
    pub salience: i32,
    /// Conditions, implicitly conjoined.
    pub conditions: Vec<Condition>,
    action: Action,
}

impl Rule {
    /// Starts building a rule.
    #[must_use]
    pub fn builder(name: impl Into<Arc<str>>) -> RuleBuilder {
        RuleBuilder {
            name: name.into(),
            salience: 0,
            conditions: Vec::new(),
        }
    }

    /// Normalizes the conditions into anchored clauses.
    #[must_use]
    pub fn clauses(&self) -> Vec<Clause> {
        Condition::And(self.conditions.clone())
            .to_dnf()
            .into_iter()
            .map(Clause::anchored)
            .collect()
    }

    /// Invokes the action.
    ///
    /// # Errors
    /// Whatever the action returns.
    pub fn fire(&self, engine: &mut KnowledgeEngine, activation: &Activation) -> Result<()> {
        (self.action)(engine, activation)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("salience", &self.salience)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Rule`].
pub struct RuleBuilder {
    name: Arc<str>,
    salience: i32,
    conditions: Vec<Condition>,
}

impl RuleBuilder {
    /// Sets the salience (priority).
    #[must_use]
    pub fn salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    /// Appends a condition.
    #[must_use]
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Finishes the rule with its action.
    #[must_use]
    pub fn then(
        self,
        action: impl Fn(&mut KnowledgeEngine, &Activation) -> Result<()> + 'static,
    ) -> Rule {
        Rule {
            name: self.name,
            salience: self.salience,
            conditions: self.conditions,
            action: Rc::new(action),
        }
    }
}
