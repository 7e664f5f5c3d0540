//! Trace output formatters.
//!
//! Provides human-readable (CLIPS watch style) and JSON formatters for
//! trace records.

use std::fmt::Write;

use seine_foundation::{FactId, Value};

use super::record::{ActivationSummary, TraceEvent, TraceRecord};

// =============================================================================
// Trace Formatter Trait
// =============================================================================

/// Trait for formatting trace records.
pub trait TraceFormatter {
    /// Formats a single trace record to a string.
    fn format(&self, record: &TraceRecord) -> String;

    /// Formats multiple records.
    fn format_many(&self, records: &[&TraceRecord]) -> String {
        records
            .iter()
            .map(|r| self.format(r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fact_label(fact: Option<FactId>) -> String {
    fact.map_or_else(|| "<Undeclared Fact>".to_string(), |id| format!("<{id}>"))
}

// =============================================================================
// Human-Readable Formatter
// =============================================================================

/// Formats trace records the way CLIPS prints watched items.
#[derive(Clone, Debug, Default)]
pub struct HumanFormatter {
    /// Whether to include timestamps.
    pub show_timestamps: bool,
    /// Whether to include record IDs.
    pub show_ids: bool,
}

impl HumanFormatter {
    /// Creates a new human formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to show timestamps.
    #[must_use]
    pub fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }

    /// Builder method to show record IDs.
    #[must_use]
    pub fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    /// Formats timestamp in microseconds.
    #[allow(clippy::cast_precision_loss)]
    fn format_timestamp(ns: u64) -> String {
        let us = ns / 1000;
        if us >= 1_000_000 {
            format!("{:.3}s", us as f64 / 1_000_000.0)
        } else if us >= 1000 {
            format!("{:.3}ms", us as f64 / 1000.0)
        } else {
            format!("{us}us")
        }
    }

    /// Formats the event alone, without record metadata.
    #[must_use]
    pub fn event_line(event: &TraceEvent) -> String {
        match event {
            TraceEvent::FactDeclared { fact, repr, source } => {
                let from = source
                    .as_ref()
                    .map(|rule| format!(" (from {rule})"))
                    .unwrap_or_default();
                format!("==> {} {repr}{from}", fact_label(*fact))
            }
            TraceEvent::FactRetracted { fact, repr } => {
                format!("<== {} {repr}", fact_label(*fact))
            }
            TraceEvent::ActivationAdded(act) => format!("==> Activation {act}"),
            TraceEvent::ActivationRemoved(act) => format!("<== Activation {act}"),
            TraceEvent::Agenda { entries } => {
                let mut out = format!("AGENDA ({})", entries.len());
                for (i, act) in entries.iter().enumerate() {
                    let _ = write!(out, "\n    {i}: {act}");
                }
                out
            }
            TraceEvent::RuleFiring { count, activation } => {
                format!("FIRE {count} {activation}")
            }
            TraceEvent::Reset => "RESET".to_string(),
            TraceEvent::Halted => "HALT".to_string(),
        }
    }
}

impl TraceFormatter for HumanFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let mut prefix = String::new();

        if self.show_ids {
            let _ = write!(prefix, "[{:06}] ", record.id);
        }

        let _ = write!(prefix, "S{:04} ", record.step);

        if self.show_timestamps {
            let _ = write!(
                prefix,
                "{:>10} ",
                Self::format_timestamp(record.timestamp_ns)
            );
        }

        format!("{prefix}{}", Self::event_line(&record.event))
    }
}

// =============================================================================
// JSON Formatter
// =============================================================================

/// Formats trace records as JSON.
#[derive(Clone, Debug, Default)]
pub struct JsonFormatter {
    /// Whether to pretty-print arrays of records.
    pub pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method for pretty printing.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Escapes a string for JSON.
    fn escape_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    /// Formats a value as JSON.
    fn format_value(value: &Value) -> String {
        match value {
            Value::Nil => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            _ => format!("\"{}\"", Self::escape_string(&value.to_string())),
        }
    }

    fn format_fact(fact: Option<FactId>) -> String {
        fact.map_or_else(|| "null".to_string(), |id| id.index().to_string())
    }

    fn format_activation(act: &ActivationSummary) -> String {
        let facts: Vec<_> = act.facts.iter().map(|id| id.index().to_string()).collect();
        let bindings: Vec<_> = act
            .bindings
            .iter()
            .map(|(k, v)| format!("\"{}\":{}", Self::escape_string(k), Self::format_value(v)))
            .collect();
        format!(
            "{{\"rule\":\"{}\",\"facts\":[{}],\"bindings\":{{{}}}}}",
            Self::escape_string(&act.rule),
            facts.join(","),
            bindings.join(",")
        )
    }
}

impl TraceFormatter for JsonFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let event_data = match &record.event {
            TraceEvent::FactDeclared { fact, repr, source } => {
                let source_json = source
                    .as_ref()
                    .map(|rule| format!(",\"source\":\"{}\"", Self::escape_string(rule)))
                    .unwrap_or_default();
                format!(
                    ",\"fact\":{},\"repr\":\"{}\"{source_json}",
                    Self::format_fact(*fact),
                    Self::escape_string(repr)
                )
            }
            TraceEvent::FactRetracted { fact, repr } => format!(
                ",\"fact\":{},\"repr\":\"{}\"",
                Self::format_fact(*fact),
                Self::escape_string(repr)
            ),
            TraceEvent::ActivationAdded(act) | TraceEvent::ActivationRemoved(act) => {
                format!(",\"activation\":{}", Self::format_activation(act))
            }
            TraceEvent::Agenda { entries } => {
                let items: Vec<_> = entries.iter().map(Self::format_activation).collect();
                format!(",\"agenda\":[{}]", items.join(","))
            }
            TraceEvent::RuleFiring { count, activation } => format!(
                ",\"count\":{count},\"activation\":{}",
                Self::format_activation(activation)
            ),
            TraceEvent::Reset | TraceEvent::Halted => String::new(),
        };

        format!(
            "{{\"id\":{},\"step\":{},\"timestamp_ns\":{},\"type\":\"{}\"{}}}",
            record.id,
            record.step,
            record.timestamp_ns,
            record.event_type(),
            event_data
        )
    }

    fn format_many(&self, records: &[&TraceRecord]) -> String {
        let items: Vec<_> = records.iter().map(|r| self.format(r)).collect();
        if self.pretty {
            format!("[\n  {}\n]", items.join(",\n  "))
        } else {
            format!("[{}]", items.join(","))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
