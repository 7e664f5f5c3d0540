//! Configuration for the observability system.

use seine_engine::WatchCategory;

use crate::trace::{TraceOutput, TracerConfig};

/// Configuration for the observability system.
///
/// Controls which engine events are traced and where they go.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Whether observability is enabled (false = zero overhead).
    pub enabled: bool,

    /// Watch categories to trace (empty = all).
    pub watch: Vec<WatchCategory>,

    /// Trace ring buffer size (number of records to retain).
    pub history_size: usize,

    /// Output trace to stderr.
    pub trace_to_stderr: bool,

    /// Output format: true for JSON, false for human-readable.
    pub json_output: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            watch: vec![WatchCategory::Rules],
            history_size: 1000,
            trace_to_stderr: true,
            json_output: false,
        }
    }
}

impl ObservabilityConfig {
    /// Creates a new configuration with observability enabled.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Creates a configuration for development: facts and firings.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            watch: vec![WatchCategory::Facts, WatchCategory::Rules],
            history_size: 1000,
            trace_to_stderr: true,
            json_output: false,
        }
    }

    /// Creates a configuration for debugging: every category.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            enabled: true,
            watch: Vec::new(),
            history_size: 10000,
            trace_to_stderr: true,
            json_output: false,
        }
    }

    /// Builder method to set enabled state.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the watched categories.
    #[must_use]
    pub fn with_watch(mut self, categories: impl IntoIterator<Item = WatchCategory>) -> Self {
        self.watch = categories.into_iter().collect();
        self
    }

    /// Builder method to set history size.
    #[must_use]
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Builder method to enable/disable stderr tracing.
    #[must_use]
    pub fn with_trace_to_stderr(mut self, trace: bool) -> Self {
        self.trace_to_stderr = trace;
        self
    }

    /// Builder method to enable/disable JSON output.
    #[must_use]
    pub fn with_json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Builds the matching tracer configuration.
    #[must_use]
    pub fn tracer_config(&self) -> TracerConfig {
        TracerConfig {
            enabled: self.enabled,
            buffer_size: self.history_size,
            output: if self.trace_to_stderr {
                TraceOutput::Stderr
            } else {
                TraceOutput::None
            },
            json_format: self.json_output,
            event_filter: Vec::new(),
            categories: self.watch.clone(),
        }
    }
}
