//! Lane buffers: per-lane batch formation.
//!
//! Each lane owns one `LaneBuffer` task. Records arrive over a bounded
//! channel and accumulate until one of two triggers seals a batch:
//!
//! - **Size**: the buffer reached `capacity` records
//! - **Idle**: no record arrived for `idle_timeout` while records were pending
//!
//! The idle deadline is re-armed on every arrival, so a steady trickle below
//! capacity is only flushed once it pauses. Sealed batches go to a
//! `BatchSink` without waiting for the commit; the lane is ready for the next
//! record immediately.

use std::sync::Arc;
use std::time::Duration;

use rowpipe_core::{Batch, FlushReason, Record};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::stats::IngestStats;

/// Destination for sealed batches.
///
/// `dispatch` must not block the lane: implementations hand the batch off
/// (spawn, channel send) and return.
pub trait BatchSink: Send + Sync + 'static {
    fn dispatch(&self, batch: Batch);
}

pub struct LaneBuffer<S> {
    lane: usize,
    capacity: usize,
    idle_timeout: Duration,
    rx: mpsc::Receiver<Record>,
    sink: S,
    pending: Vec<Record>,
    seq: u64,
    stats: Arc<IngestStats>,
}

impl<S: BatchSink> LaneBuffer<S> {
    pub fn new(
        lane: usize,
        capacity: usize,
        idle_timeout: Duration,
        rx: mpsc::Receiver<Record>,
        sink: S,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            lane,
            capacity,
            idle_timeout,
            rx,
            sink,
            pending: Vec::with_capacity(capacity),
            seq: 0,
            stats,
        }
    }

    /// Run until the input channel closes, then flush what is pending.
    pub async fn run(mut self) {
        debug!(lane = self.lane, capacity = self.capacity, "Lane started");
        let mut deadline = Instant::now() + self.idle_timeout;

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(record) => {
                        self.pending.push(record);
                        deadline = Instant::now() + self.idle_timeout;

                        if self.pending.len() >= self.capacity {
                            self.flush(FlushReason::Full);
                        }
                    }
                    None => {
                        self.flush(FlushReason::Closed);
                        info!(lane = self.lane, batches = self.seq, "Lane input closed, lane stopped");
                        return;
                    }
                },
                _ = sleep_until(deadline) => {
                    self.flush(FlushReason::Idle);
                    deadline = Instant::now() + self.idle_timeout;
                }
            }
        }
    }

    fn flush(&mut self, reason: FlushReason) {
        // Drain keeps the buffer's allocation for the next batch.
        let records: Vec<Record> = self.pending.drain(..).collect();
        let Some(batch) = Batch::new(self.lane, self.seq, reason, records) else {
            return;
        };

        self.seq += 1;
        self.stats.record_flush(reason, batch.len());
        debug!(
            lane = self.lane,
            seq = batch.seq(),
            records = batch.len(),
            bytes = batch.size_bytes(),
            reason = %reason,
            "Batch sealed"
        );
        self.sink.dispatch(batch);
    }
}
