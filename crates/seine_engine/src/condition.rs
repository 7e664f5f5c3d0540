//! Rule conditions and their normalization into clauses.
//!
//! Conditions are authored as a tree of patterns combined with AND, OR and
//! NOT plus boolean tests. Before a rule reaches the matching network the
//! tree is rewritten into disjunctive normal form: a list of [`Clause`]s,
//! each a flat ordered conjunction where NOT only ever wraps one pattern.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::{Error, Fact, FactType, FieldKey, Result, Value};

use crate::bindings::Bindings;

// =============================================================================
// Field Constraints
// =============================================================================

/// Named predicate over a single field value.
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    func: Rc<dyn Fn(&Value) -> bool>,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(name: impl Into<Arc<str>>, func: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Returns the predicate name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn eval(&self, value: &Value) -> bool {
        (self.func)(value)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P({})", self.name)
    }
}

/// Constraint on one field of a pattern.
///
/// Every constraint requires the field to be present (directly or through a
/// schema default). A field may carry several constraints; all must hold.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldConstraint {
    /// Field equals the value.
    Literal(Value),
    /// Field differs from the value.
    NotLiteral(Value),
    /// Field is present, any value.
    Wildcard,
    /// Binds the variable on first occurrence, must equal it afterwards.
    Variable(Arc<str>),
    /// Field must differ from an already bound variable.
    NegatedVariable(Arc<str>),
    /// Field satisfies the predicate.
    Predicate(Predicate),
}

impl FieldConstraint {
    /// Variable constraint.
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Self::Variable(name.into())
    }

    /// Negated variable constraint.
    pub fn not_var(name: impl Into<Arc<str>>) -> Self {
        Self::NegatedVariable(name.into())
    }

    /// Predicate constraint.
    pub fn test(name: impl Into<Arc<str>>, func: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Predicate(Predicate::new(name, func))
    }
}

impl From<Value> for FieldConstraint {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// Constraints on a single fact.
///
/// A pattern matches facts whose type is the pattern type or one of its
/// subtypes and whose fields satisfy every field constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    fact_type: FactType,
    fields: Vec<(FieldKey, FieldConstraint)>,
    binding: Option<Arc<str>>,
}

impl Pattern {
    /// Creates a pattern with no field constraints.
    #[must_use]
    pub fn new(fact_type: &FactType) -> Self {
        Self {
            fact_type: fact_type.clone(),
            fields: Vec::new(),
            binding: None,
        }
    }

    /// Pattern over the root fact type.
    #[must_use]
    pub fn any() -> Self {
        Self::new(&FactType::fact())
    }

    /// Adds a field constraint.
    #[must_use]
    pub fn field(mut self, key: impl Into<FieldKey>, constraint: FieldConstraint) -> Self {
        self.fields.push((key.into(), constraint));
        self
    }

    /// Adds a literal equality constraint.
    #[must_use]
    pub fn literal(self, key: impl Into<FieldKey>, value: impl Into<Value>) -> Self {
        self.field(key, FieldConstraint::Literal(value.into()))
    }

    /// Adds a variable constraint.
    #[must_use]
    pub fn var(self, key: impl Into<FieldKey>, name: impl Into<Arc<str>>) -> Self {
        self.field(key, FieldConstraint::var(name))
    }

    /// Adds a negated variable constraint.
    #[must_use]
    pub fn not_var(self, key: impl Into<FieldKey>, name: impl Into<Arc<str>>) -> Self {
        self.field(key, FieldConstraint::not_var(name))
    }

    /// Adds a literal inequality constraint.
    #[must_use]
    pub fn not_literal(self, key: impl Into<FieldKey>, value: impl Into<Value>) -> Self {
        self.field(key, FieldConstraint::NotLiteral(value.into()))
    }

    /// Adds a presence constraint.
    #[must_use]
    pub fn wildcard(self, key: impl Into<FieldKey>) -> Self {
        self.field(key, FieldConstraint::Wildcard)
    }

    /// Adds a predicate constraint.
    #[must_use]
    pub fn test(
        self,
        key: impl Into<FieldKey>,
        name: impl Into<Arc<str>>,
        func: impl Fn(&Value) -> bool + 'static,
    ) -> Self {
        self.field(key, FieldConstraint::test(name, func))
    }

    /// Binds the matched fact to a name visible to the rule action.
    #[must_use]
    pub fn bind(mut self, name: impl Into<Arc<str>>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Returns the matched fact type.
    #[must_use]
    pub fn fact_type(&self) -> &FactType {
        &self.fact_type
    }

    /// Returns the field constraints in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(FieldKey, FieldConstraint)] {
        &self.fields
    }

    /// Returns true if both patterns test facts identically, ignoring the
    /// fact binding name.
    #[must_use]
    pub fn same_tests(&self, other: &Pattern) -> bool {
        self.fact_type == other.fact_type && self.fields == other.fields
    }

    /// Returns the fact binding name.
    #[must_use]
    pub fn binding(&self) -> Option<&Arc<str>> {
        self.binding.as_ref()
    }

    /// Variables this pattern binds.
    pub fn variables(&self) -> impl Iterator<Item = &Arc<str>> {
        self.fields.iter().filter_map(|(_, c)| match c {
            FieldConstraint::Variable(name) => Some(name),
            _ => None,
        })
    }

    /// Variables this pattern requires to differ.
    pub fn negated_variables(&self) -> impl Iterator<Item = &Arc<str>> {
        self.fields.iter().filter_map(|(_, c)| match c {
            FieldConstraint::NegatedVariable(name) => Some(name),
            _ => None,
        })
    }
}

impl TryFrom<&Pattern> for Fact {
    type Error = Error;

    /// Builds a fact from a pattern whose constraints are all literals.
    fn try_from(pattern: &Pattern) -> Result<Self> {
        let mut fact = Fact::new(&pattern.fact_type);
        for (key, constraint) in &pattern.fields {
            match constraint {
                FieldConstraint::Literal(value) => fact.set(key.clone(), value.clone())?,
                _ => return Err(Error::unresolved_constraint(key.to_string())),
            }
        }
        Ok(fact)
    }
}

// =============================================================================
// Boolean Tests
// =============================================================================

/// Boolean test over the variables bound so far.
#[derive(Clone)]
pub struct Test {
    name: Arc<str>,
    func: Rc<dyn Fn(&Bindings) -> bool>,
}

impl Test {
    /// Creates a test.
    pub fn new(name: impl Into<Arc<str>>, func: impl Fn(&Bindings) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Returns the test name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the test.
    #[must_use]
    pub fn eval(&self, bindings: &Bindings) -> bool {
        (self.func)(bindings)
    }

    /// Returns the complementary test.
    #[must_use]
    pub fn negate(&self) -> Self {
        let inner = Rc::clone(&self.func);
        Self {
            name: format!("not {}", self.name).into(),
            func: Rc::new(move |b: &Bindings| !inner(b)),
        }
    }
}

impl PartialEq for Test {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TEST({})", self.name)
    }
}

// =============================================================================
// Condition Tree
// =============================================================================

/// Authored condition element.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// A fact must match.
    Pattern(Pattern),
    /// All sub-conditions must hold.
    And(Vec<Condition>),
    /// At least one sub-condition must hold.
    Or(Vec<Condition>),
    /// The sub-condition must not hold.
    Not(Box<Condition>),
    /// A test over bound variables must pass.
    Test(Test),
}

impl Condition {
    /// Conjunction.
    pub fn and(conditions: impl IntoIterator<Item = impl Into<Condition>>) -> Self {
        Self::And(conditions.into_iter().map(Into::into).collect())
    }

    /// Disjunction.
    pub fn or(conditions: impl IntoIterator<Item = impl Into<Condition>>) -> Self {
        Self::Or(conditions.into_iter().map(Into::into).collect())
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: impl Into<Condition>) -> Self {
        Self::Not(Box::new(condition.into()))
    }

    /// Test over bound variables.
    pub fn test(name: impl Into<Arc<str>>, func: impl Fn(&Bindings) -> bool + 'static) -> Self {
        Self::Test(Test::new(name, func))
    }

    /// Rewrites the condition into disjunctive normal form.
    ///
    /// An empty AND yields one empty clause; an empty OR yields none.
    #[must_use]
    pub fn to_dnf(&self) -> Vec<Vec<ClauseElement>> {
        match self {
            Self::Pattern(p) => vec![vec![ClauseElement::Match(p.clone())]],
            Self::Test(t) => vec![vec![ClauseElement::Test(t.clone())]],
            Self::And(items) => items.iter().fold(vec![Vec::new()], |acc, item| {
                let right = item.to_dnf();
                let mut product = Vec::with_capacity(acc.len() * right.len());
                for left in &acc {
                    for r in &right {
                        let mut clause = left.clone();
                        clause.extend(r.iter().cloned());
                        product.push(clause);
                    }
                }
                product
            }),
            Self::Or(items) => items.iter().flat_map(Condition::to_dnf).collect(),
            Self::Not(inner) => match inner.as_ref() {
                Self::Pattern(p) => vec![vec![ClauseElement::NotMatch(p.clone())]],
                Self::Test(t) => vec![vec![ClauseElement::Test(t.negate())]],
                Self::Not(x) => x.to_dnf(),
                Self::And(items) => {
                    Self::Or(items.iter().cloned().map(Self::not).collect()).to_dnf()
                }
                Self::Or(items) => {
                    Self::And(items.iter().cloned().map(Self::not).collect()).to_dnf()
                }
            },
        }
    }
}

impl From<Pattern> for Condition {
    fn from(pattern: Pattern) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Test> for Condition {
    fn from(test: Test) -> Self {
        Self::Test(test)
    }
}

// =============================================================================
// Clauses
// =============================================================================

/// One element of a normalized clause.
#[derive(Clone, Debug, PartialEq)]
pub enum ClauseElement {
    /// A fact must match.
    Match(Pattern),
    /// No fact may match, given the bindings so far.
    NotMatch(Pattern),
    /// Test over the bindings so far.
    Test(Test),
}

/// A conjunctive alternative of a rule's conditions.
///
/// Always starts with a positive pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    elements: Vec<ClauseElement>,
}

impl Clause {
    /// Anchors a raw DNF conjunction.
    ///
    /// A conjunction that is empty or does not start with a positive pattern
    /// gets an [`FactType::initial_fact`] pattern prepended.
    #[must_use]
    pub fn anchored(mut elements: Vec<ClauseElement>) -> Self {
        if !matches!(elements.first(), Some(ClauseElement::Match(_))) {
            elements.insert(
                0,
                ClauseElement::Match(Pattern::new(&FactType::initial_fact())),
            );
        }
        Self { elements }
    }

    /// Returns the elements in order.
    #[must_use]
    pub fn elements(&self) -> &[ClauseElement] {
        &self.elements
    }

    /// Checks that every negated variable has a binding to compare against
    /// and that fact bindings are only used on positive patterns.
    ///
    /// # Errors
    /// `UnboundNegatedVariable` or `IllegalCondition`.
    pub fn validate(&self, rule: &str) -> Result<()> {
        let mut bound: Vec<&Arc<str>> = Vec::new();
        for element in &self.elements {
            let pattern = match element {
                ClauseElement::Match(p) | ClauseElement::NotMatch(p) => p,
                ClauseElement::Test(_) => continue,
            };
            let local: Vec<&Arc<str>> = pattern.variables().collect();
            for name in pattern.negated_variables() {
                if !bound.contains(&name) && !local.contains(&name) {
                    return Err(Error::unbound_negated_variable(rule, &**name));
                }
            }
            match element {
                ClauseElement::Match(_) => bound.extend(local),
                ClauseElement::NotMatch(p) if p.binding.is_some() => {
                    return Err(Error::illegal_condition(format!(
                        "negated pattern of rule {rule} cannot bind a fact"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
