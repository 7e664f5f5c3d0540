//! Tracing and watch output for Seine.
//!
//! This crate provides:
//! - [`Tracer`] - A [`Watcher`](seine_engine::Watcher) that records engine events
//! - [`TraceBuffer`] - Ring buffer of trace records with step queries
//! - [`HumanFormatter`] and [`JsonFormatter`] - Trace output formats
//! - [`ObservabilityConfig`] - Presets for what to trace and where

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod trace;

pub use config::ObservabilityConfig;
pub use trace::{
    ActivationSummary, HumanFormatter, JsonFormatter, TraceBuffer, TraceBufferStats, TraceEvent,
    TraceFormatter, TraceOutput, TraceRecord, Tracer, TracerConfig,
};
