//! Datagram routing onto lanes.
//!
//! The router is the only place where the ingest path can block: `route`
//! awaits `send` on the chosen lane's bounded channel, so a lane that cannot
//! keep up pushes back on the tasks feeding it.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use rowpipe_core::Record;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{IngestError, Result};
use crate::stats::IngestStats;

/// How a record picks its lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaneSelector {
    /// Shared counter modulo lane count. Spreads load evenly.
    #[default]
    RoundRobin,

    /// Hash of the record key. Records with one key stay on one lane, in order.
    KeyHash,
}

impl FromStr for LaneSelector {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "round_robin" => Ok(LaneSelector::RoundRobin),
            "key_hash" => Ok(LaneSelector::KeyHash),
            other => Err(IngestError::Config(format!(
                "unknown lane routing '{}', expected 'round_robin' or 'key_hash'",
                other
            ))),
        }
    }
}

impl fmt::Display for LaneSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneSelector::RoundRobin => write!(f, "round_robin"),
            LaneSelector::KeyHash => write!(f, "key_hash"),
        }
    }
}

/// Decodes datagrams and hands the records to lanes.
///
/// Cheap to clone; every clone shares the lane senders and the counter.
#[derive(Debug, Clone)]
pub struct Router {
    lanes: Arc<[mpsc::Sender<Record>]>,
    selector: LaneSelector,
    next: Arc<AtomicU64>,
    stats: Arc<IngestStats>,
}

impl Router {
    pub fn new(
        lanes: Vec<mpsc::Sender<Record>>,
        selector: LaneSelector,
        stats: Arc<IngestStats>,
    ) -> Result<Self> {
        if lanes.is_empty() {
            return Err(IngestError::Config(
                "router needs at least one lane".to_string(),
            ));
        }

        Ok(Self {
            lanes: lanes.into(),
            selector,
            next: Arc::new(AtomicU64::new(0)),
            stats,
        })
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    fn select(&self, record: &Record) -> usize {
        let lanes = self.lanes.len() as u64;
        let n = match self.selector {
            LaneSelector::RoundRobin => self.next.fetch_add(1, Ordering::Relaxed),
            LaneSelector::KeyHash => {
                let mut hasher = DefaultHasher::new();
                record.key.hash(&mut hasher);
                hasher.finish()
            }
        };
        (n % lanes) as usize
    }

    /// Decode `data` and enqueue it on a lane, waiting while the lane is full.
    ///
    /// Returns the lane index the record went to.
    ///
    /// # Errors
    ///
    /// - `MalformedRecord`: counted, logged and dropped
    /// - `LaneClosed`: the lane task has exited
    pub async fn route(&self, data: Bytes) -> Result<usize> {
        let record = match Record::decode(data) {
            Ok(record) => record,
            Err(e) => {
                self.stats.record_malformed();
                warn!(error = %e, "Dropping malformed record");
                return Err(e.into());
            }
        };

        let lane = self.select(&record);
        trace!(lane = lane, key = %record.key_lossy(), "Routing record");
        self.lanes[lane]
            .send(record)
            .await
            .map_err(|_| IngestError::LaneClosed(lane))?;

        self.stats.record_routed();
        Ok(lane)
    }
}
