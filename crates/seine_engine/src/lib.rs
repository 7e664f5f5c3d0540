//! Matching network, agenda, and the knowledge engine for Seine.
//!
//! This crate provides:
//! - [`Condition`] and [`Pattern`] - Rule conditions and their normalization
//! - [`Rule`] - Condition/action pairs with salience
//! - [`ReteNetwork`] - Incremental matching of facts against rules
//! - [`Agenda`] and [`Strategy`] - Conflict resolution
//! - [`KnowledgeEngine`] - Declare, retract, modify, and the run loop
//! - [`Watcher`] - Observer hooks for engine events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod activation;
pub mod agenda;
pub mod bindings;
pub mod condition;
pub mod config;
pub mod deffacts;
pub mod engine;
pub mod network;
pub mod rule;
pub mod strategy;
pub mod watch;
pub mod working_memory;

pub use activation::Activation;
pub use agenda::{ActivationKey, Agenda};
pub use bindings::{Bindings, Token};
pub use condition::{
    Clause, ClauseElement, Condition, FieldConstraint, Pattern, Predicate, Test,
};
pub use config::EngineConfig;
pub use deffacts::{DefFacts, ResetArgs};
pub use engine::{EngineState, KnowledgeEngine};
pub use network::{NetworkDelta, NetworkStats, ReteNetwork};
pub use rule::{Action, Rule, RuleBuilder, RuleId};
pub use strategy::{BreadthStrategy, DepthStrategy, Strategy};
pub use watch::{WatchCategory, WatchEvent, WatchLog, Watcher};
pub use working_memory::{Commit, FactDelta, FactList};
