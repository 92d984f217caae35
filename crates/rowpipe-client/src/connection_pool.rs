//! Fixed-Size Storage Connection Pool
//!
//! Holds a fixed set of storage connections created once at startup. A
//! commit checks one out, uses it exclusively, and gives it back.
//!
//! ## Design
//!
//! - **Fixed size**: all connections are created by `connect`; the first
//!   creation failure aborts startup with `ClientError::PoolInit`
//! - **Fair waiting**: a tokio `Semaphore` with one permit per idle connection,
//!   so `acquire` suspends until a connection is free
//! - **Guaranteed release**: `PooledConnection` returns its connection when
//!   dropped, on success, error and panic unwinding alike
//! - **No health checks**: a connection that failed a write goes back into
//!   the pool unchanged and is reused as-is
//!
//! ## Invariant
//!
//! `checked_out + available == size` whenever the pool state is observed.
//! Both counters live under the same lock, and a released connection is
//! pushed back before its permit is returned.
//!
//! ## Examples
//!
//! ```ignore
//! let pool = ConnectionPool::connect(1000, &factory).await?;
//!
//! let conn = pool.acquire().await?;
//! conn.put_multiple("hbase_test", &puts).await?;
//! // `conn` dropped here, connection back in the pool
//! ```

use std::ops::Deref;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::table::ConnectionFactory;

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub available: usize,
    pub checked_out: usize,
}

#[derive(Debug)]
struct PoolState<C> {
    idle: Vec<C>,
    checked_out: usize,
}

/// Pool of reusable storage connections.
///
/// `ConnectionPool` is Send + Sync and is shared via `Arc<ConnectionPool<C>>`.
#[derive(Debug)]
pub struct ConnectionPool<C> {
    state: Mutex<PoolState<C>>,
    permits: Semaphore,
    size: usize,
}

impl<C: Send> ConnectionPool<C> {
    /// Build a pool from already-established connections.
    pub fn from_connections(connections: Vec<C>) -> Self {
        let size = connections.len();
        Self {
            state: Mutex::new(PoolState {
                idle: connections,
                checked_out: 0,
            }),
            permits: Semaphore::new(size),
            size,
        }
    }

    /// Establish `size` connections through `factory`.
    ///
    /// # Errors
    ///
    /// `PoolInit` if any connection fails; connections created so far are
    /// dropped. A zero `size` is a `Config` error.
    pub async fn connect<F>(size: usize, factory: &F) -> Result<Self>
    where
        F: ConnectionFactory<Client = C>,
    {
        if size == 0 {
            return Err(ClientError::Config(
                "connection pool size must be at least 1".to_string(),
            ));
        }

        let mut connections = Vec::with_capacity(size);
        for created in 0..size {
            match factory.connect().await {
                Ok(conn) => connections.push(conn),
                Err(e) => {
                    return Err(ClientError::PoolInit {
                        created,
                        size,
                        source: Box::new(e),
                    })
                }
            }
        }

        info!(size = size, "Connection pool ready");
        Ok(Self::from_connections(connections))
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check out a connection, waiting until one is free.
    pub async fn acquire(&self) -> Result<PooledConnection<'_, C>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClientError::PoolUnavailable)?;

        let conn = {
            let mut state = self.lock_state();
            let conn = state.idle.pop().ok_or(ClientError::PoolUnavailable)?;
            state.checked_out += 1;
            conn
        };

        debug!(available = self.permits.available_permits(), "Connection checked out");
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    fn release(&self, conn: C) {
        let mut state = self.lock_state();
        state.idle.push(conn);
        state.checked_out -= 1;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock_state();
        PoolStats {
            size: self.size,
            available: state.idle.len(),
            checked_out: state.checked_out,
        }
    }
}

/// A connection checked out of a `ConnectionPool`.
///
/// Dereferences to the underlying client and returns it to the pool on drop.
pub struct PooledConnection<'a, C: Send> {
    conn: Option<C>,
    pool: &'a ConnectionPool<C>,
    _permit: SemaphorePermit<'a>,
}

impl<C: Send> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // Only `drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<C: Send> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
        // `_permit` is dropped after this body, once the connection is idle again.
    }
}
