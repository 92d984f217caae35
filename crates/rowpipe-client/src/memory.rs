//! In-process table storage.
//!
//! `MemoryStore` keeps rows in memory and records every `put_multiple` call.
//! Any number of `MemoryTableClient`s can share one store, which lets a whole
//! connection pool write into the same table. The store can be told to fail
//! writes and to add latency, and it tracks how many writes are in flight at
//! once.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ClientError, Result};
use crate::table::{ConnectionFactory, Put, TableClient};

/// Cells of one row keyed by `(family, qualifier)`.
pub type RowCells = BTreeMap<(Bytes, Bytes), Bytes>;

type Tables = HashMap<String, BTreeMap<Bytes, RowCells>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared in-memory tables plus call bookkeeping.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Row count of every accepted or rejected call, in call order
    calls: Mutex<Vec<usize>>,
    failures_remaining: AtomicUsize,
    fail_always: AtomicBool,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject the next `n` writes.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Reject every write while `enabled` is set.
    pub fn fail_always(&self, enabled: bool) {
        self.fail_always.store(enabled, Ordering::SeqCst);
    }

    /// Delay each write by `latency` before applying it.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Number of `put_multiple` calls received, failed ones included.
    pub fn put_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Row count of each `put_multiple` call, in call order.
    pub fn call_sizes(&self) -> Vec<usize> {
        lock(&self.calls).clone()
    }

    /// Highest number of writes observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn row_count(&self, table: &str) -> usize {
        lock(&self.tables).get(table).map_or(0, |rows| rows.len())
    }

    pub fn get(&self, table: &str, row: &[u8], family: &[u8], qualifier: &[u8]) -> Option<Bytes> {
        let tables = lock(&self.tables);
        let cells = tables.get(table)?.get(row)?;
        cells
            .get(&(Bytes::copy_from_slice(family), Bytes::copy_from_slice(qualifier)))
            .cloned()
    }

    fn should_fail(&self) -> bool {
        if self.fail_always.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn write(&self, table: &str, puts: &[Put]) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        lock(&self.calls).push(puts.len());
        let result = if self.should_fail() {
            Err(ClientError::Storage("injected write failure".to_string()))
        } else {
            let mut tables = lock(&self.tables);
            let rows = tables.entry(table.to_string()).or_default();
            for put in puts {
                let cells = rows.entry(put.row.clone()).or_default();
                for col in &put.columns {
                    cells.insert((col.family.clone(), col.qualifier.clone()), col.value.clone());
                }
            }
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A storage handle writing into a shared `MemoryStore`.
#[derive(Debug, Clone)]
pub struct MemoryTableClient {
    id: usize,
    store: Arc<MemoryStore>,
}

impl MemoryTableClient {
    pub fn new(id: usize, store: Arc<MemoryStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

#[async_trait]
impl TableClient for MemoryTableClient {
    async fn put_multiple(&self, table: &str, puts: &[Put]) -> Result<()> {
        self.store.write(table, puts).await
    }
}

/// Hands out `MemoryTableClient`s over one store, optionally refusing to
/// create more than `fail_after` connections.
#[derive(Debug)]
pub struct MemoryConnectionFactory {
    store: Arc<MemoryStore>,
    created: AtomicUsize,
    fail_after: Option<usize>,
}

impl MemoryConnectionFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            created: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Refuse every connection after the first `n`.
    pub fn failing_after(store: Arc<MemoryStore>, n: usize) -> Self {
        Self {
            store,
            created: AtomicUsize::new(0),
            fail_after: Some(n),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    type Client = MemoryTableClient;

    async fn connect(&self) -> Result<MemoryTableClient> {
        let id = self.created.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| id >= limit) {
            return Err(ClientError::Connection(format!(
                "memory store refused connection #{}",
                id
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTableClient::new(id, Arc::clone(&self.store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        let client = MemoryTableClient::new(0, store.clone());

        client
            .put_multiple(
                "t",
                &[
                    Put::single("alice", "name", "info", "hello"),
                    Put::single("bob", "name", "info", "world"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.row_count("t"), 2);
        assert_eq!(
            store.get("t", b"alice", b"name", b"info"),
            Some(Bytes::from("hello"))
        );
        assert_eq!(store.call_sizes(), vec![2]);
    }

    #[tokio::test]
    async fn test_put_overwrites_row() {
        let store = MemoryStore::new();
        let client = MemoryTableClient::new(0, store.clone());

        client
            .put_multiple("t", &[Put::single("k", "f", "q", "v1")])
            .await
            .unwrap();
        client
            .put_multiple("t", &[Put::single("k", "f", "q", "v2")])
            .await
            .unwrap();

        assert_eq!(store.row_count("t"), 1);
        assert_eq!(store.get("t", b"k", b"f", b"q"), Some(Bytes::from("v2")));
    }

    #[tokio::test]
    async fn test_fail_next() {
        let store = MemoryStore::new();
        let client = MemoryTableClient::new(0, store.clone());
        store.fail_next(2);

        let put = [Put::single("k", "f", "q", "v")];
        assert!(client.put_multiple("t", &put).await.is_err());
        assert!(client.put_multiple("t", &put).await.is_err());
        assert!(client.put_multiple("t", &put).await.is_ok());
        assert_eq!(store.put_calls(), 3);
        assert_eq!(store.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_fail_always() {
        let store = MemoryStore::new();
        let client = MemoryTableClient::new(0, store.clone());
        store.fail_always(true);

        let put = [Put::single("k", "f", "q", "v")];
        for _ in 0..5 {
            assert!(client.put_multiple("t", &put).await.is_err());
        }
        store.fail_always(false);
        assert!(client.put_multiple("t", &put).await.is_ok());
    }

    #[tokio::test]
    async fn test_factory_fail_after() {
        let factory = MemoryConnectionFactory::failing_after(MemoryStore::new(), 2);
        assert_eq!(factory.connect().await.unwrap().id(), 0);
        assert_eq!(factory.connect().await.unwrap().id(), 1);
        assert!(factory.connect().await.is_err());
        assert_eq!(factory.created(), 2);
    }
}
