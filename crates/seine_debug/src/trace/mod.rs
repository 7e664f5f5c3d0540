//! Tracing of engine execution.
//!
//! A [`Tracer`] is a [`Watcher`]: register it on an engine and it records
//! every event it is configured for, with no work done while disabled.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use seine_debug::{Tracer, TracerConfig};
//! use seine_engine::{KnowledgeEngine, ResetArgs, Rule};
//!
//! let tracer = Rc::new(RefCell::new(Tracer::new(TracerConfig::new().enabled())));
//! let mut engine = KnowledgeEngine::new();
//! engine.add_watcher(Rc::clone(&tracer));
//! engine.add_rule(Rule::builder("start").then(|_, _| Ok(()))).unwrap();
//! engine.reset(&ResetArgs::new()).unwrap();
//! engine.run(None).unwrap();
//!
//! assert_eq!(tracer.borrow().stats().firings, 1);
//! ```

pub mod buffer;
pub mod format;
pub mod record;

pub use buffer::{TraceBuffer, TraceBufferStats};
pub use format::{HumanFormatter, JsonFormatter, TraceFormatter};
pub use record::{ActivationSummary, TraceEvent, TraceRecord};

use std::io::{self, Write};
use std::time::Instant;

use seine_engine::{WatchCategory, WatchEvent, Watcher};

// =============================================================================
// Trace Output
// =============================================================================

/// Where trace output should be sent.
#[derive(Clone, Debug, Default)]
pub enum TraceOutput {
    /// No output (traces still recorded in buffer).
    #[default]
    None,
    /// Write each record to stderr as it is recorded.
    Stderr,
}

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Configuration for the tracer.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// Whether tracing is enabled.
    pub enabled: bool,
    /// Maximum records to keep in buffer.
    pub buffer_size: usize,
    /// Where to output traces.
    pub output: TraceOutput,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Event type names to keep (empty = all).
    pub event_filter: Vec<String>,
    /// Watch categories to keep (empty = all).
    pub categories: Vec<WatchCategory>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer_size: 10000,
            output: TraceOutput::None,
            json_format: false,
            event_filter: Vec::new(),
            categories: Vec::new(),
        }
    }
}

impl TracerConfig {
    /// Creates a new tracer configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable tracing.
    #[must_use]
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Builder method to set buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder method to output to stderr.
    #[must_use]
    pub fn to_stderr(mut self) -> Self {
        self.output = TraceOutput::Stderr;
        self
    }

    /// Builder method to use JSON format.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Builder method to filter event types.
    #[must_use]
    pub fn filter_events(mut self, types: Vec<String>) -> Self {
        self.event_filter = types;
        self
    }

    /// Builder method to keep only the given watch categories.
    #[must_use]
    pub fn watch(mut self, categories: impl IntoIterator<Item = WatchCategory>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    fn accepts(&self, event: &TraceEvent) -> bool {
        (self.categories.is_empty() || self.categories.contains(&event.category()))
            && (self.event_filter.is_empty()
                || self.event_filter.iter().any(|t| t == event.event_type()))
    }
}

// =============================================================================
// Tracer
// =============================================================================

/// Records engine events into a ring buffer.
///
/// Steps follow the engine's firing count: records made while rule `n` of
/// a run fires, and before rule `n + 1` does, carry step `n`.
pub struct Tracer {
    config: TracerConfig,
    buffer: TraceBuffer,
    current_step: u64,
    start_time: Instant,
    human_formatter: HumanFormatter,
    json_formatter: JsonFormatter,
}

impl Tracer {
    /// Creates a new tracer with the given configuration.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        let buffer_size = config.buffer_size;
        Self {
            config,
            buffer: TraceBuffer::new(buffer_size),
            current_step: 0,
            start_time: Instant::now(),
            human_formatter: HumanFormatter::new(),
            json_formatter: JsonFormatter::new(),
        }
    }

    /// Creates a tracer with default configuration (disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(TracerConfig::default())
    }

    /// Creates an enabled tracer that outputs to stderr.
    #[must_use]
    pub fn to_stderr() -> Self {
        Self::new(TracerConfig::new().enabled().to_stderr())
    }

    /// Returns whether tracing is enabled.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Enables tracing.
    pub fn enable(&mut self) {
        self.config.enabled = true;
    }

    /// Disables tracing.
    pub fn disable(&mut self) {
        self.config.enabled = false;
    }

    /// Returns the current step number.
    #[must_use]
    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Sets whether to use JSON output format.
    pub fn set_json_format(&mut self, json: bool) {
        self.config.json_format = json;
    }

    /// Sets the trace output destination.
    pub fn set_output(&mut self, output: TraceOutput) {
        self.config.output = output;
    }

    /// Records a trace event.
    #[inline]
    pub fn record(&mut self, event: TraceEvent) {
        if !self.config.enabled {
            return;
        }
        self.record_internal(event);
    }

    fn record_internal(&mut self, event: TraceEvent) {
        match &event {
            TraceEvent::RuleFiring { count, .. } => {
                self.current_step = u64::try_from(*count).unwrap_or(u64::MAX);
            }
            TraceEvent::Reset => self.current_step = 0,
            _ => {}
        }

        if !self.config.accepts(&event) {
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let timestamp_ns = self.start_time.elapsed().as_nanos() as u64;
        self.buffer.push(self.current_step, timestamp_ns, event);

        if let TraceOutput::Stderr = self.config.output {
            if let Some(record) = self.buffer.last() {
                let line = self.format_record(record);
                let _ = writeln!(io::stderr(), "{line}");
            }
        }
    }

    /// Formats a record using the current format settings.
    #[must_use]
    pub fn format_record(&self, record: &TraceRecord) -> String {
        if self.config.json_format {
            self.json_formatter.format(record)
        } else {
            self.human_formatter.format(record)
        }
    }

    /// Formats multiple records.
    #[must_use]
    pub fn format_records(&self, records: &[&TraceRecord]) -> String {
        if self.config.json_format {
            self.json_formatter.format_many(records)
        } else {
            self.human_formatter.format_many(records)
        }
    }

    /// Returns the trace buffer.
    #[must_use]
    pub fn buffer(&self) -> &TraceBuffer {
        &self.buffer
    }

    /// Clears the trace buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Returns buffer statistics.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        self.buffer.stats()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Watcher for Tracer {
    fn on_event(&mut self, event: &WatchEvent<'_>) {
        if !self.config.enabled {
            return;
        }
        self.record_internal(TraceEvent::from(event));
    }
}

// =============================================================================
// Tests
// =============================================================================
