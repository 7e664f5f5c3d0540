//! Integration tests across all layers
//!
//! Small knowledge bases run end to end, observed through watchers and the
//! tracer.

mod scenarios;
