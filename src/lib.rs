//! Seine - Forward-chaining production rule engine
//!
//! This crate re-exports all layers of the Seine system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: seine_debug       - Tracing and watch output
//! Layer 1: seine_engine      - Conditions, Rete network, agenda, knowledge engine
//! Layer 0: seine_foundation  - Core types (Value, Fact, FactType, Error)
//! ```

pub use seine_debug as debug;
pub use seine_engine as engine;
pub use seine_foundation as foundation;
