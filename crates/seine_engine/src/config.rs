//! Engine configuration.

// =============================================================================
// Engine Configuration
// =============================================================================

/// Configuration for a [`KnowledgeEngine`](crate::KnowledgeEngine).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether a fact equal to one already in working memory is stored again.
    ///
    /// When false, declaring such a fact returns the existing id.
    pub allow_duplicate_facts: bool,
    /// Default firing budget for `run(None)`; `None` runs until the agenda
    /// is empty.
    pub max_steps: Option<usize>,
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to store duplicate facts.
    #[must_use]
    pub fn allow_duplicate_facts(mut self) -> Self {
        self.allow_duplicate_facts = true;
        self
    }

    /// Builder method to set the default firing budget.
    #[must_use]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
}
