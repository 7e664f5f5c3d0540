//! Trace event and record types.
//!
//! Engine events borrow engine state; trace events own a snapshot of what
//! they describe so they can outlive the step that produced them.

use seine_engine::{Activation, WatchCategory, WatchEvent};
use seine_foundation::{FactId, Value};

// =============================================================================
// Trace Event
// =============================================================================

/// Snapshot of an activation.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivationSummary {
    /// Rule name.
    pub rule: String,
    /// Contributing facts in ascending id order.
    pub facts: Vec<FactId>,
    /// Bound variables in name order.
    pub bindings: Vec<(String, Value)>,
}

impl From<&Activation> for ActivationSummary {
    fn from(activation: &Activation) -> Self {
        Self {
            rule: activation.rule().name.to_string(),
            facts: activation.fact_ids().collect(),
            bindings: activation
                .bindings()
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl std::fmt::Display for ActivationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.rule)?;
        for (i, id) in self.facts.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}<{id}>")?;
        }
        Ok(())
    }
}

/// Events recorded by the tracer.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A fact was committed.
    FactDeclared {
        /// The fact id.
        fact: Option<FactId>,
        /// Debug rendering of the fact.
        repr: String,
        /// Rule whose action declared it, if any.
        source: Option<String>,
    },

    /// A fact was removed.
    FactRetracted {
        /// The fact id.
        fact: Option<FactId>,
        /// Debug rendering of the fact.
        repr: String,
    },

    /// An activation entered the agenda.
    ActivationAdded(ActivationSummary),

    /// An activation left the agenda without firing.
    ActivationRemoved(ActivationSummary),

    /// Agenda contents, highest priority first.
    Agenda {
        /// Pending activations.
        entries: Vec<ActivationSummary>,
    },

    /// A rule is about to fire.
    RuleFiring {
        /// One-based firing count within the run.
        count: usize,
        /// The activation.
        activation: ActivationSummary,
    },

    /// The engine was reset.
    Reset,

    /// `halt` was requested.
    Halted,
}

impl TraceEvent {
    /// Returns a short name for the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FactDeclared { .. } => "fact-declared",
            Self::FactRetracted { .. } => "fact-retracted",
            Self::ActivationAdded(_) => "activation-added",
            Self::ActivationRemoved(_) => "activation-removed",
            Self::Agenda { .. } => "agenda",
            Self::RuleFiring { .. } => "rule-firing",
            Self::Reset => "reset",
            Self::Halted => "halted",
        }
    }

    /// Returns the watch category of the event.
    #[must_use]
    pub fn category(&self) -> WatchCategory {
        match self {
            Self::FactDeclared { .. } | Self::FactRetracted { .. } => WatchCategory::Facts,
            Self::ActivationAdded(_) | Self::ActivationRemoved(_) => WatchCategory::Activations,
            Self::Agenda { .. } => WatchCategory::Agenda,
            Self::RuleFiring { .. } => WatchCategory::Rules,
            Self::Reset | Self::Halted => WatchCategory::Engine,
        }
    }

    /// Returns true if this is a fact event.
    #[must_use]
    pub fn is_fact_event(&self) -> bool {
        self.category() == WatchCategory::Facts
    }

    /// Returns true if this is a rule firing.
    #[must_use]
    pub fn is_rule_event(&self) -> bool {
        matches!(self, Self::RuleFiring { .. })
    }
}

impl From<&WatchEvent<'_>> for TraceEvent {
    fn from(event: &WatchEvent<'_>) -> Self {
        match *event {
            WatchEvent::FactDeclared { fact, source } => Self::FactDeclared {
                fact: fact.id(),
                repr: format!("{fact:?}"),
                source: source.map(|a| a.rule().name.to_string()),
            },
            WatchEvent::FactRetracted { fact } => Self::FactRetracted {
                fact: fact.id(),
                repr: format!("{fact:?}"),
            },
            WatchEvent::ActivationAdded(act) => Self::ActivationAdded(act.into()),
            WatchEvent::ActivationRemoved(act) => Self::ActivationRemoved(act.into()),
            WatchEvent::Agenda { agenda, .. } => Self::Agenda {
                entries: agenda.iter().map(ActivationSummary::from).collect(),
            },
            WatchEvent::Fired { count, activation } => Self::RuleFiring {
                count,
                activation: activation.into(),
            },
            WatchEvent::Reset => Self::Reset,
            WatchEvent::Halted => Self::Halted,
        }
    }
}

// =============================================================================
// Trace Record
// =============================================================================

/// A timestamped trace record.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Unique record ID within the session.
    pub id: u64,
    /// Firing count within the current run when the event occurred.
    pub step: u64,
    /// Timestamp in nanoseconds since the tracer was created.
    pub timestamp_ns: u64,
    /// The trace event.
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Creates a new trace record.
    #[must_use]
    pub fn new(id: u64, step: u64, timestamp_ns: u64, event: TraceEvent) -> Self {
        Self {
            id,
            step,
            timestamp_ns,
            event,
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

// =============================================================================
// Tests
// =============================================================================
