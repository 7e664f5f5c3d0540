//! Working memory: committed facts, their provenance and the pending delta.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::mem;
use std::sync::Arc;

use seine_foundation::{Error, Fact, FactId, Result};

use crate::activation::Activation;

/// Facts committed and removed since the last drain.
#[derive(Clone, Debug, Default)]
pub struct FactDelta {
    /// Newly committed facts, in id order.
    pub added: Vec<Arc<Fact>>,
    /// Ids of removed facts, in id order.
    pub removed: Vec<FactId>,
}

impl FactDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Where a fact came from and what it enabled.
#[derive(Clone, Debug, Default)]
struct Provenance {
    source: Option<Activation>,
    children: BTreeSet<FactId>,
}

/// Result of a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commit {
    /// The fact was stored under a fresh id.
    New(FactId),
    /// An equal fact was already present; nothing was stored.
    Existing(FactId),
}

impl Commit {
    /// The id of the stored fact.
    #[must_use]
    pub fn id(self) -> FactId {
        match self {
            Self::New(id) | Self::Existing(id) => id,
        }
    }
}

/// Ordered store of committed facts.
///
/// Ids come from a counter that only moves forward until [`FactList::clear`].
#[derive(Clone, Debug, Default)]
pub struct FactList {
    facts: BTreeMap<FactId, Arc<Fact>>,
    provenance: HashMap<FactId, Provenance>,
    /// Content index used for duplicate suppression.
    index: HashMap<Fact, FactId>,
    next_id: u64,
    allow_duplicates: bool,
    added: BTreeSet<FactId>,
    removed: BTreeSet<FactId>,
}

impl FactList {
    /// Creates an empty list.
    #[must_use]
    pub fn new(allow_duplicates: bool) -> Self {
        Self {
            allow_duplicates,
            ..Self::default()
        }
    }

    /// Commits a fact, freezing it under the next id.
    ///
    /// Unless duplicates are allowed, committing a fact equal to one already
    /// present returns the existing id.
    pub fn declare(&mut self, fact: Fact) -> Commit {
        if !self.allow_duplicates {
            if let Some(&existing) = self.index.get(&fact) {
                return Commit::Existing(existing);
            }
        }

        let id = FactId::new(self.next_id);
        self.next_id += 1;
        let fact = fact.committed(id);
        if !self.allow_duplicates {
            self.index.insert(fact.clone(), id);
        }
        self.facts.insert(id, Arc::new(fact));
        self.provenance.insert(id, Provenance::default());
        self.added.insert(id);
        Commit::New(id)
    }

    /// Removes a fact and returns it with the children it enabled.
    ///
    /// # Errors
    /// `FactNotFound` if the id is not present.
    pub fn retract(&mut self, id: FactId) -> Result<(Arc<Fact>, Vec<FactId>)> {
        let fact = self.facts.remove(&id).ok_or_else(|| Error::fact_not_found(id))?;
        if !self.allow_duplicates {
            self.index.remove(fact.as_ref());
        }
        let children = self
            .provenance
            .remove(&id)
            .map(|p| p.children.into_iter().collect())
            .unwrap_or_default();
        if !self.added.remove(&id) {
            self.removed.insert(id);
        }
        Ok((fact, children))
    }

    /// Records that `child` was declared by an activation over `parent`.
    pub fn add_child(&mut self, parent: FactId, child: FactId) {
        if let Some(p) = self.provenance.get_mut(&parent) {
            p.children.insert(child);
        }
    }

    /// Records the activation that declared a fact.
    pub fn set_source(&mut self, id: FactId, source: Activation) {
        if let Some(p) = self.provenance.get_mut(&id) {
            p.source = Some(source);
        }
    }

    /// Returns the activation that declared a fact, if any.
    #[must_use]
    pub fn source(&self, id: FactId) -> Option<&Activation> {
        self.provenance.get(&id).and_then(|p| p.source.as_ref())
    }

    /// Returns the facts whose declaration this fact enabled.
    pub fn children(&self, id: FactId) -> impl Iterator<Item = FactId> + '_ {
        self.provenance
            .get(&id)
            .into_iter()
            .flat_map(|p| p.children.iter().copied())
    }

    /// Takes the delta accumulated since the previous drain.
    pub fn take_delta(&mut self) -> FactDelta {
        let added = mem::take(&mut self.added)
            .into_iter()
            .filter_map(|id| self.facts.get(&id).cloned())
            .collect();
        let removed = mem::take(&mut self.removed).into_iter().collect();
        FactDelta { added, removed }
    }

    /// Returns true if a drain would be non-empty.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Looks up a fact.
    #[must_use]
    pub fn get(&self, id: FactId) -> Option<&Arc<Fact>> {
        self.facts.get(&id)
    }

    /// Returns true if the id is present.
    #[must_use]
    pub fn contains(&self, id: FactId) -> bool {
        self.facts.contains_key(&id)
    }

    /// Iterates over facts in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Fact>> {
        self.facts.values()
    }

    /// Number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Id the next committed fact will receive.
    #[must_use]
    pub fn next_id(&self) -> FactId {
        FactId::new(self.next_id)
    }

    /// Drops everything and restarts the id counter.
    pub fn clear(&mut self) {
        *self = Self::new(self.allow_duplicates);
    }
}
