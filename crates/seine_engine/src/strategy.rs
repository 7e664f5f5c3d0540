//! Conflict resolution strategies.
//!
//! A strategy assigns every activation an [`ActivationKey`] and folds the
//! network's added/removed activations into the [`Agenda`]. Whatever the
//! ordering, the agenda compared as a set must always equal the currently
//! valid activations, so `update_agenda` applies every delta incrementally.

use std::fmt;

use crate::activation::Activation;
use crate::agenda::{ActivationKey, Agenda};

/// Pluggable conflict resolution policy.
pub trait Strategy: fmt::Debug {
    /// Strategy name, for traces.
    fn name(&self) -> &'static str;

    /// Computes the priority key of an activation.
    fn key(&self, activation: &Activation) -> ActivationKey;

    /// Applies an activation delta to the agenda.
    ///
    /// Removing an activation that is not pending (it already fired) is a
    /// no-op, as is adding one that is already pending. Removals find the
    /// key the activation was inserted with, so they need no new key.
    fn update_agenda(&self, agenda: &mut Agenda, added: Vec<Activation>, removed: Vec<Activation>) {
        for act in &removed {
            agenda.remove(act);
        }
        for act in added {
            let key = self.key(&act);
            agenda.insert(key, act);
        }
    }
}

/// CLIPS depth strategy, the default.
///
/// Among equal salience the activation over the most recently committed
/// fact fires first; ties fall to the next most recent fact, and so on.
#[derive(Clone, Copy, Debug, Default)]
pub struct DepthStrategy;

impl Strategy for DepthStrategy {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn key(&self, activation: &Activation) -> ActivationKey {
        ActivationKey {
            salience: activation.rule().salience,
            order: activation.fact_ids().rev().map(fact_rank).collect(),
        }
    }
}

/// CLIPS breadth strategy.
///
/// Among equal salience the activation over the oldest facts fires first.
#[derive(Clone, Copy, Debug, Default)]
pub struct BreadthStrategy;

impl Strategy for BreadthStrategy {
    fn name(&self) -> &'static str {
        "breadth"
    }

    fn key(&self, activation: &Activation) -> ActivationKey {
        ActivationKey {
            salience: activation.rule().salience,
            order: activation.fact_ids().map(|id| -fact_rank(id)).collect(),
        }
    }
}

fn fact_rank(id: seine_foundation::FactId) -> i64 {
    i64::try_from(id.index()).unwrap_or(i64::MAX)
}
