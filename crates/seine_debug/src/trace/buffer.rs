//! Ring buffer for trace records.
//!
//! Keeps the most recent records and answers step-based queries over them.

use std::collections::{BTreeSet, HashMap, VecDeque};

use seine_engine::WatchCategory;

use super::record::{TraceEvent, TraceRecord};

// =============================================================================
// Trace Buffer
// =============================================================================

/// A ring buffer for storing trace records.
///
/// Holds at most `max_size` records, discarding the oldest when full.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    /// The records, oldest first.
    records: VecDeque<TraceRecord>,
    /// Maximum number of records to store.
    max_size: usize,
    /// Next record ID to assign.
    next_id: u64,
}

impl TraceBuffer {
    /// Creates a new trace buffer with the given maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
            next_id: 0,
        }
    }

    /// Creates a buffer with default size (10000 records).
    #[must_use]
    pub fn default_size() -> Self {
        Self::new(10000)
    }

    /// Pushes a new event and returns the assigned record ID.
    pub fn push(&mut self, step: u64, timestamp_ns: u64, event: TraceEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.records
            .push_back(TraceRecord::new(id, step, timestamp_ns, event));
        while self.records.len() > self.max_size {
            self.records.pop_front();
        }
        id
    }

    /// Returns the number of records in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clears all records. IDs keep increasing.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Returns an iterator over all records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// Returns the most recently pushed record.
    #[must_use]
    pub fn last(&self) -> Option<&TraceRecord> {
        self.records.back()
    }

    /// Returns records for a specific step.
    #[must_use]
    pub fn records_for_step(&self, step: u64) -> Vec<&TraceRecord> {
        self.filter(|r| r.step == step)
    }

    /// Returns records in a step range (inclusive).
    #[must_use]
    pub fn records_in_range(&self, first: u64, last: u64) -> Vec<&TraceRecord> {
        self.filter(|r| (first..=last).contains(&r.step))
    }

    /// Returns the most recent N records.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<&TraceRecord> {
        let start = self.records.len().saturating_sub(count);
        self.records.iter().skip(start).collect()
    }

    /// Returns records matching a predicate.
    pub fn filter<F>(&self, predicate: F) -> Vec<&TraceRecord>
    where
        F: Fn(&TraceRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Returns records of a specific event type.
    #[must_use]
    pub fn by_event_type(&self, event_type: &str) -> Vec<&TraceRecord> {
        self.filter(|r| r.event_type() == event_type)
    }

    /// Returns records in a watch category.
    #[must_use]
    pub fn by_category(&self, category: WatchCategory) -> Vec<&TraceRecord> {
        self.filter(|r| r.event.category() == category)
    }

    /// Returns the distinct steps present, ascending.
    #[must_use]
    pub fn steps(&self) -> Vec<u64> {
        self.records
            .iter()
            .map(|r| r.step)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns statistics about the buffer.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        let mut event_counts = HashMap::new();
        for record in &self.records {
            *event_counts.entry(record.event_type()).or_insert(0) += 1;
        }
        let firings = self
            .records
            .iter()
            .filter(|r| r.event.is_rule_event())
            .count();

        TraceBufferStats {
            record_count: self.records.len(),
            max_size: self.max_size,
            step_count: self.steps().len(),
            firings,
            event_counts,
        }
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::default_size()
    }
}

// =============================================================================
// Buffer Statistics
// =============================================================================

/// Statistics about a trace buffer.
#[derive(Clone, Debug)]
pub struct TraceBufferStats {
    /// Number of records currently in buffer.
    pub record_count: usize,
    /// Maximum buffer size.
    pub max_size: usize,
    /// Number of distinct steps.
    pub step_count: usize,
    /// Number of rule firings recorded.
    pub firings: usize,
    /// Count of each event type.
    pub event_counts: HashMap<&'static str, usize>,
}

// =============================================================================
// Tests
// =============================================================================
