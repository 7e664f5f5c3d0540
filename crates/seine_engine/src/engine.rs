//! The knowledge engine: working memory, network, agenda and the run loop.
//!
//! Every mutation happens synchronously on the caller's thread. While
//! `run()` is firing, declarations and retractions only touch working
//! memory; the network catches up on the next step, before the next pop.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::{Error, ErrorKind, Fact, FactId, FieldKey, Result, Value};

use crate::activation::Activation;
use crate::agenda::Agenda;
use crate::config::EngineConfig;
use crate::deffacts::{DefFacts, ResetArgs};
use crate::network::{NetworkDelta, NetworkStats, ReteNetwork};
use crate::rule::{Rule, RuleId};
use crate::strategy::{DepthStrategy, Strategy};
use crate::watch::{WatchEvent, Watcher};
use crate::working_memory::{Commit, FactList};

// =============================================================================
// Engine State
// =============================================================================

/// Lifecycle state of an engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    /// Not running; declarations update the agenda immediately.
    #[default]
    Idle,
    /// Inside `reset()`.
    Resetting,
    /// Inside `run()`.
    Running,
    /// `halt()` was requested; the current run stops before its next firing.
    Halted,
}

// =============================================================================
// Knowledge Engine
// =============================================================================

/// A forward-chaining production rule engine.
///
/// An engine and its rules belong to one thread. Independent rule bases run
/// concurrently as independent engines, each built on its own thread.
///
/// # Example
///
/// ```
/// use seine_engine::{KnowledgeEngine, Pattern, ResetArgs, Rule};
/// use seine_foundation::{Fact, FactType};
///
/// let light = FactType::builder("Light").build();
/// let mut engine = KnowledgeEngine::new();
/// engine
///     .add_rule(
///         Rule::builder("green")
///             .when(Pattern::new(&light).literal("color", "green"))
///             .then(|_, _| Ok(())),
///     )
///     .unwrap();
///
/// engine.reset(&ResetArgs::new()).unwrap();
/// engine.declare(Fact::new(&light).with("color", "green")).unwrap();
/// assert_eq!(engine.run(None).unwrap(), 1);
/// ```
pub struct KnowledgeEngine {
    config: EngineConfig,
    state: EngineState,
    facts: FactList,
    network: ReteNetwork,
    agenda: Agenda,
    strategy: Box<dyn Strategy>,
    deffacts: Vec<DefFacts>,
    watchers: Vec<Box<dyn Watcher>>,
    /// The activation whose action is executing, if any.
    firing: Option<Activation>,
    /// Firings in the current run.
    fired: usize,
}

impl KnowledgeEngine {
    /// Creates an engine with the default configuration and depth strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            facts: FactList::new(config.allow_duplicate_facts),
            config,
            state: EngineState::Idle,
            network: ReteNetwork::new(),
            agenda: Agenda::new(),
            strategy: Box::new(DepthStrategy),
            deffacts: vec![DefFacts::initial_fact()],
            watchers: Vec::new(),
            firing: None,
            fired: 0,
        }
    }

    /// Builder method to replace the conflict resolution strategy.
    ///
    /// Pending activations are re-keyed under the new strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        let pending: Vec<Activation> = self.agenda.iter().cloned().collect();
        self.agenda.clear();
        self.strategy.update_agenda(&mut self.agenda, pending, Vec::new());
        self
    }

    /// Registers a watcher notified of every engine event.
    pub fn add_watcher(&mut self, watcher: impl Watcher + 'static) {
        self.watchers.push(Box::new(watcher));
    }

    // -------------------------------------------------------------------------
    // Rules and initial facts
    // -------------------------------------------------------------------------

    /// Registers a rule and matches it against the current working memory.
    ///
    /// # Errors
    /// `DuplicateRule` if a rule with the same name exists, or a
    /// configuration error from compiling its conditions.
    pub fn add_rule(&mut self, rule: Rule) -> Result<RuleId> {
        if self.network.rules().iter().any(|r| r.name == rule.name) {
            return Err(Error::new(ErrorKind::DuplicateRule(rule.name.to_string())));
        }
        let id = self.network.add_rule(Rc::new(rule))?;
        if self.state != EngineState::Running {
            self.update_agenda();
        }
        Ok(id)
    }

    /// Registers an initial-fact generator run on every reset.
    pub fn add_deffacts(&mut self, deffacts: DefFacts) {
        self.deffacts.push(deffacts);
    }

    /// Registered rules, indexed by [`RuleId`].
    #[must_use]
    pub fn get_rules(&self) -> &[Rc<Rule>] {
        self.network.rules()
    }

    /// Registered initial-fact generators, the sentinel generator first.
    #[must_use]
    pub fn deffacts(&self) -> &[DefFacts] {
        &self.deffacts
    }

    // -------------------------------------------------------------------------
    // Working memory
    // -------------------------------------------------------------------------

    /// Declares one fact and returns its id.
    ///
    /// # Errors
    /// A declaration error if the fact is invalid; nothing is committed.
    pub fn declare(&mut self, fact: Fact) -> Result<FactId> {
        let ids = self.declare_all([fact])?;
        ids.last()
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::Internal("empty declaration".into())))
    }

    /// Declares a batch of facts and returns their ids in order.
    ///
    /// The whole batch is validated before anything is committed. A fact
    /// equal to one already present yields the existing id unless duplicates
    /// are allowed.
    ///
    /// # Errors
    /// The first declaration error found; working memory is unchanged.
    pub fn declare_all(&mut self, facts: impl IntoIterator<Item = Fact>) -> Result<Vec<FactId>> {
        let facts: Vec<Fact> = facts.into_iter().collect();
        for fact in &facts {
            fact.validate()?;
        }

        let mut ids = Vec::with_capacity(facts.len());
        for fact in facts {
            let commit = self.facts.declare(fact);
            if let Commit::New(id) = commit {
                self.record_provenance(id);
                if !self.watchers.is_empty() {
                    if let Some(fact) = self.facts.get(id) {
                        notify(
                            &mut self.watchers,
                            &WatchEvent::FactDeclared {
                                fact,
                                source: self.firing.as_ref(),
                            },
                        );
                    }
                }
            }
            ids.push(commit.id());
        }

        if self.state != EngineState::Running {
            self.update_agenda();
        }
        Ok(ids)
    }

    /// Retracts a fact and, transitively, every fact declared by an
    /// activation it took part in.
    ///
    /// # Errors
    /// `FactNotFound` if the fact is not in working memory. Children that
    /// are already gone are skipped.
    pub fn retract(&mut self, id: FactId) -> Result<Arc<Fact>> {
        let (fact, children) = self.facts.retract(id)?;
        if !self.watchers.is_empty() {
            notify(&mut self.watchers, &WatchEvent::FactRetracted { fact: &fact });
        }

        // Derivation chains may be arbitrarily deep.
        let mut pending = children;
        while let Some(child) = pending.pop() {
            let Ok((gone, grandchildren)) = self.facts.retract(child) else {
                continue;
            };
            if !self.watchers.is_empty() {
                notify(&mut self.watchers, &WatchEvent::FactRetracted { fact: &gone });
            }
            pending.extend(grandchildren);
        }

        if self.state != EngineState::Running {
            self.update_agenda();
        }
        Ok(fact)
    }

    /// Retracts a fact and declares a copy with the given overrides.
    ///
    /// The copy normally gets a fresh id. If it equals another fact already
    /// in working memory and duplicates are not allowed, the original is
    /// still retracted and the id of that other fact is returned.
    ///
    /// # Errors
    /// `FactNotFound` if the fact is absent, or a declaration error for the
    /// copy; in both cases working memory is unchanged.
    pub fn modify<I, K, V>(&mut self, id: FactId, changes: I) -> Result<FactId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldKey>,
        V: Into<Value>,
    {
        let copy = self.copy_of(id, changes)?;
        self.retract(id)?;
        self.declare(copy)
    }

    /// Declares a copy of a fact with the given overrides, keeping the
    /// original.
    ///
    /// As with [`declare`](Self::declare), a copy equal to a fact already
    /// present returns that fact's id unless duplicates are allowed.
    ///
    /// # Errors
    /// `FactNotFound` if the fact is absent, or a declaration error for the
    /// copy.
    pub fn duplicate<I, K, V>(&mut self, id: FactId, changes: I) -> Result<FactId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldKey>,
        V: Into<Value>,
    {
        let copy = self.copy_of(id, changes)?;
        self.declare(copy)
    }

    /// Looks up a fact.
    #[must_use]
    pub fn fact(&self, id: FactId) -> Option<&Arc<Fact>> {
        self.facts.get(id)
    }

    /// Iterates over working memory in id order.
    pub fn facts(&self) -> impl Iterator<Item = &Arc<Fact>> {
        self.facts.iter()
    }

    /// Number of facts in working memory.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// The activation whose firing declared a fact, if any.
    #[must_use]
    pub fn source(&self, id: FactId) -> Option<&Activation> {
        self.facts.source(id)
    }

    /// Facts whose declaration this fact took part in.
    pub fn children(&self, id: FactId) -> impl Iterator<Item = FactId> + '_ {
        self.facts.children(id)
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Clears working memory and the agenda, then declares the output of
    /// every initial-fact generator, lowest order first, as one batch.
    ///
    /// # Errors
    /// A declaration error from a generated fact.
    pub fn reset(&mut self, args: &ResetArgs) -> Result<()> {
        self.state = EngineState::Resetting;
        self.agenda.clear();
        self.facts.clear();
        self.network.reset();
        if !self.watchers.is_empty() {
            notify(&mut self.watchers, &WatchEvent::Reset);
        }

        let mut generators: Vec<&DefFacts> = self.deffacts.iter().collect();
        generators.sort_by_key(|d| d.run_order());
        let facts: Vec<Fact> = generators.into_iter().flat_map(|d| d.generate(args)).collect();

        let result = self.declare_all(facts);
        self.state = EngineState::Idle;
        result.map(|_| ())
    }

    /// Feeds pending working-memory changes through the network and returns
    /// the resulting activation delta without touching the agenda.
    pub fn get_activations(&mut self) -> NetworkDelta {
        let delta = self.facts.take_delta();
        if !delta.is_empty() {
            self.network.apply(&delta.added, &delta.removed);
        }
        self.network.take_delta()
    }

    /// Folds pending changes into the agenda. Fires nothing.
    pub fn step(&mut self) {
        self.update_agenda();
        if !self.watchers.is_empty() {
            notify(
                &mut self.watchers,
                &WatchEvent::Agenda {
                    step: self.fired,
                    agenda: &self.agenda,
                },
            );
        }
    }

    /// Fires activations in agenda order until the agenda is empty, the
    /// budget is spent, or `halt()` is called. Returns the number fired.
    ///
    /// `None` uses the configured default budget.
    ///
    /// # Errors
    /// The first error returned by a rule action, unchanged. Whatever the
    /// action did before failing stays in effect.
    pub fn run(&mut self, max_steps: Option<usize>) -> Result<usize> {
        let budget = max_steps.or(self.config.max_steps);
        self.state = EngineState::Running;
        self.fired = 0;
        let result = self.fire_until(budget);
        self.state = EngineState::Idle;
        result.map(|()| self.fired)
    }

    /// Stops the current run before its next firing.
    pub fn halt(&mut self) {
        self.state = EngineState::Halted;
        if !self.watchers.is_empty() {
            notify(&mut self.watchers, &WatchEvent::Halted);
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Pending activations.
    #[must_use]
    pub fn agenda(&self) -> &Agenda {
        &self.agenda
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The active conflict resolution strategy.
    #[must_use]
    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Network size counters.
    #[must_use]
    pub fn stats(&self) -> NetworkStats {
        self.network.stats()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn fire_until(&mut self, budget: Option<usize>) -> Result<()> {
        while self.state == EngineState::Running && budget.is_none_or(|b| self.fired < b) {
            self.step();
            let Some(activation) = self.agenda.pop() else {
                break;
            };
            self.fired += 1;
            if !self.watchers.is_empty() {
                notify(
                    &mut self.watchers,
                    &WatchEvent::Fired {
                        count: self.fired,
                        activation: &activation,
                    },
                );
            }

            let rule = Rc::clone(activation.rule());
            let previous = self.firing.replace(activation.clone());
            let result = rule.fire(self, &activation);
            self.firing = previous;
            result?;
        }
        Ok(())
    }

    fn update_agenda(&mut self) {
        let NetworkDelta { added, removed } = self.get_activations();
        if added.is_empty() && removed.is_empty() {
            return;
        }
        if !self.watchers.is_empty() {
            for act in removed.iter().filter(|a| self.agenda.contains(a)) {
                notify(&mut self.watchers, &WatchEvent::ActivationRemoved(act));
            }
            for act in added.iter().filter(|a| !self.agenda.contains(a)) {
                notify(&mut self.watchers, &WatchEvent::ActivationAdded(act));
            }
        }
        self.strategy.update_agenda(&mut self.agenda, added, removed);
    }

    /// Stamps a freshly committed fact with the firing activation and
    /// registers it as a child of every fact that activation matched.
    fn record_provenance(&mut self, id: FactId) {
        let Some(activation) = &self.firing else {
            return;
        };
        for parent in activation.fact_ids() {
            self.facts.add_child(parent, id);
        }
        self.facts.set_source(id, activation.clone());
    }

    fn copy_of<I, K, V>(&self, id: FactId, changes: I) -> Result<Fact>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldKey>,
        V: Into<Value>,
    {
        let fact = self.facts.get(id).ok_or_else(|| Error::fact_not_found(id))?;
        let copy = fact.copy_with(changes);
        copy.validate()?;
        Ok(copy)
    }
}

impl Default for KnowledgeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KnowledgeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeEngine")
            .field("state", &self.state)
            .field("strategy", &self.strategy.name())
            .field("facts", &self.facts.len())
            .field("agenda", &self.agenda.len())
            .field("rules", &self.network.rules().len())
            .finish_non_exhaustive()
    }
}

fn notify(watchers: &mut [Box<dyn Watcher>], event: &WatchEvent<'_>) {
    for watcher in watchers {
        watcher.on_event(event);
    }
}
