//! Sealed record batches.
//!
//! A `Batch` is a snapshot of the records one lane accumulated between two
//! flushes. It is handed to exactly one commit sequence and not mutated after
//! creation.

use std::fmt;

use crate::record::Record;

/// Which trigger sealed a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The lane buffer reached its capacity.
    Full,
    /// No record arrived on the lane within the idle window.
    Idle,
    /// The lane input closed with records still pending.
    Closed,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Full => "full",
            FlushReason::Idle => "idle",
            FlushReason::Closed => "closed",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-empty group of records from a single lane.
#[derive(Debug, Clone)]
pub struct Batch {
    lane: usize,
    seq: u64,
    reason: FlushReason,
    records: Vec<Record>,
}

impl Batch {
    /// Seal `records` into a batch. Returns `None` for an empty vector, so a
    /// `Batch` always holds at least one record.
    pub fn new(lane: usize, seq: u64, reason: FlushReason, records: Vec<Record>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            lane,
            seq,
            reason,
            records,
        })
    }

    /// Index of the lane that formed this batch.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Per-lane flush sequence number, in formation order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn reason(&self) -> FlushReason {
        self.reason
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total key and value bytes in the batch.
    pub fn size_bytes(&self) -> usize {
        self.records.iter().map(Record::size_bytes).sum()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
