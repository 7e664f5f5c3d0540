//! Initial-fact generators run on every reset.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::{Fact, Value};

/// Keyword arguments passed to [`KnowledgeEngine::reset`](crate::KnowledgeEngine::reset).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResetArgs {
    values: BTreeMap<Arc<str>, Value>,
}

impl ResetArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add an argument.
    #[must_use]
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterates over arguments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.values.iter()
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no argument was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn only(&self, names: &[Arc<str>]) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(k, _)| names.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

type Generator = Rc<dyn Fn(&ResetArgs) -> Box<dyn Iterator<Item = Fact>>>;

/// A named producer of initial facts.
///
/// Generators run in ascending `order` on every reset. A generator sees only
/// the reset arguments it declared, or all of them if it accepts any.
#[derive(Clone)]
pub struct DefFacts {
    name: Arc<str>,
    order: i32,
    params: Vec<Arc<str>>,
    accepts_any: bool,
    generator: Generator,
}

impl DefFacts {
    /// Creates a generator with order 0 and no declared parameters.
    pub fn new<F, I>(name: impl Into<Arc<str>>, generator: F) -> Self
    where
        F: Fn(&ResetArgs) -> I + 'static,
        I: IntoIterator<Item = Fact>,
        I::IntoIter: 'static,
    {
        Self {
            name: name.into(),
            order: 0,
            params: Vec::new(),
            accepts_any: false,
            generator: Rc::new(move |args: &ResetArgs| -> Box<dyn Iterator<Item = Fact>> {
                Box::new(generator(args).into_iter())
            }),
        }
    }

    /// Sets the run order (lower runs first).
    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Declares the reset arguments this generator receives.
    #[must_use]
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.params = names.into_iter().map(Into::into).collect();
        self
    }

    /// Makes the generator receive every reset argument.
    #[must_use]
    pub fn accept_any(mut self) -> Self {
        self.accepts_any = true;
        self
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the run order.
    #[must_use]
    pub fn run_order(&self) -> i32 {
        self.order
    }

    /// Runs the generator with the arguments it accepts.
    #[must_use]
    pub fn generate(&self, args: &ResetArgs) -> Box<dyn Iterator<Item = Fact>> {
        if self.accepts_any {
            (self.generator)(args)
        } else {
            (self.generator)(&args.only(&self.params))
        }
    }

    /// The built-in generator of the sentinel fact.
    #[must_use]
    pub fn initial_fact() -> Self {
        Self::new("initial-fact", |_| [Fact::initial()]).order(-1)
    }
}

impl fmt::Debug for DefFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefFacts")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("params", &self.params)
            .field("accepts_any", &self.accepts_any)
            .finish_non_exhaustive()
    }
}
