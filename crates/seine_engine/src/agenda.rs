//! The agenda: pending activations ordered by strategy key.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::activation::Activation;

/// Priority key assigned to an activation by a [`Strategy`](crate::Strategy).
///
/// Larger keys fire first: salience, then `order` compared lexicographically.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActivationKey {
    /// Rule salience.
    pub salience: i32,
    /// Strategy-specific tie-break sequence.
    pub order: Vec<i64>,
}

/// Totally ordered collection of pending activations.
///
/// Entries are kept sorted ascending so the highest-priority activation is
/// the last one. Among equal keys the earlier-registered rule wins. Each
/// activation is pending at most once, under the key it was inserted with.
#[derive(Clone, Debug, Default)]
pub struct Agenda {
    entries: BTreeSet<(ActivationKey, Reverse<Activation>)>,
    /// Membership index: pending activation to its key.
    index: BTreeMap<Activation, ActivationKey>,
}

impl Agenda {
    /// Creates an empty agenda.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending activations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts keeping order. Returns false if the activation was already
    /// present.
    pub fn insert(&mut self, key: ActivationKey, activation: Activation) -> bool {
        if self.index.contains_key(&activation) {
            return false;
        }
        self.index.insert(activation.clone(), key.clone());
        self.entries.insert((key, Reverse(activation)))
    }

    /// Removes an activation. Returns false if it was not present.
    pub fn remove(&mut self, activation: &Activation) -> bool {
        let Some((activation, key)) = self.index.remove_entry(activation) else {
            return false;
        };
        self.entries.remove(&(key, Reverse(activation)))
    }

    /// Removes and returns the highest-priority activation.
    pub fn pop(&mut self) -> Option<Activation> {
        let (_, Reverse(act)) = self.entries.pop_last()?;
        self.index.remove(&act);
        Some(act)
    }

    /// Returns the highest-priority activation.
    #[must_use]
    pub fn peek(&self) -> Option<&Activation> {
        self.entries.last().map(|(_, Reverse(act))| act)
    }

    /// Returns true if an equal activation is pending.
    #[must_use]
    pub fn contains(&self, activation: &Activation) -> bool {
        self.index.contains_key(activation)
    }

    /// Iterates from highest to lowest priority.
    pub fn iter(&self) -> impl Iterator<Item = &Activation> {
        self.entries.iter().rev().map(|(_, Reverse(act))| act)
    }

    /// Iterates over keys and activations from highest to lowest priority.
    pub fn entries(&self) -> impl Iterator<Item = (&ActivationKey, &Activation)> {
        self.entries.iter().rev().map(|(key, Reverse(act))| (key, act))
    }

    /// Drops every pending activation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
