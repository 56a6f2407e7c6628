//! Units of work bound to the connection engine.
//!
//! A [`Session`] owns at most one open transaction (and therefore at most one
//! pooled connection) at a time. The transaction starts lazily on the first
//! call to [`Session::conn`]. Once closed, a session refuses all further use.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::debug;

use crate::db::engine::{ConnectionEngine, SqlitePool};
use crate::error::StorefrontError;

pub type SessionId = u64;

#[derive(Debug, Default)]
struct SessionCounters {
    opened: AtomicU64,
    closed: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time view of the factory's lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub opened: u64,
    pub closed: u64,
    pub committed: u64,
    pub rolled_back: u64,
    /// Uncommitted transactions dropped when their session closed.
    pub discarded: u64,
}

/// Builds sessions bound to one engine.
#[derive(Clone)]
pub struct SessionFactory {
    pool: SqlitePool,
    next_id: Arc<AtomicU64>,
    counters: Arc<SessionCounters>,
}

impl SessionFactory {
    pub fn new(engine: &ConnectionEngine) -> Self {
        Self {
            pool: engine.pool().clone(),
            next_id: Arc::new(AtomicU64::new(1)),
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Open a session. No connection is taken from the pool until first use.
    pub fn open(&self) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.counters.opened.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, "session opened");
        Session {
            id,
            pool: self.pool.clone(),
            tx: None,
            closed: false,
            counters: self.counters.clone(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        let c = &self.counters;
        SessionStats {
            opened: c.opened.load(Ordering::Relaxed),
            closed: c.closed.load(Ordering::Relaxed),
            committed: c.committed.load(Ordering::Relaxed),
            rolled_back: c.rolled_back.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
        }
    }
}

pub struct Session {
    id: SessionId,
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    closed: bool,
    counters: Arc<SessionCounters>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Whether a transaction is pending (begun and not yet committed or rolled back).
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    fn ensure_open(&self) -> Result<(), StorefrontError> {
        if self.closed {
            return Err(StorefrontError::SessionClosed);
        }
        Ok(())
    }

    /// Connection of the pending transaction, beginning one if needed.
    ///
    /// Beginning a transaction borrows a connection from the pool and is the
    /// only point where a session may wait; it fails with `PoolExhausted`
    /// once the engine's acquire timeout elapses.
    pub async fn conn(&mut self) -> Result<&mut SqliteConnection, StorefrontError> {
        self.ensure_open()?;
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let tx = self.pool.begin().await?;
                debug!(session = self.id, "transaction started");
                tx
            }
        };
        Ok(&mut **self.tx.insert(tx))
    }

    /// Commit the pending transaction. A no-op when nothing is pending.
    pub async fn commit(&mut self) -> Result<(), StorefrontError> {
        self.ensure_open()?;
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(StorefrontError::Transaction)?;
            self.counters.committed.fetch_add(1, Ordering::Relaxed);
            debug!(session = self.id, "transaction committed");
        }
        Ok(())
    }

    /// Roll back the pending transaction. A no-op when nothing is pending.
    pub async fn rollback(&mut self) -> Result<(), StorefrontError> {
        self.ensure_open()?;
        if let Some(tx) = self.tx.take() {
            self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
            tx.rollback().await.map_err(StorefrontError::Transaction)?;
            debug!(session = self.id, "transaction rolled back");
        }
        Ok(())
    }

    /// Close the session and return its connection to the pool. Uncommitted
    /// work is discarded. Closing twice is an error.
    pub async fn close(&mut self) -> Result<(), StorefrontError> {
        self.ensure_open()?;
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        if let Some(tx) = self.tx.take() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(session = self.id, "discarding uncommitted transaction on close");
            tx.rollback().await.map_err(StorefrontError::Transaction)?;
        }
        debug!(session = self.id, "session closed");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Dropped mid-scope (cancelled caller). The transaction is rolled back
        // by sqlx when its connection goes back to the pool.
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        if self.tx.is_some() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        }
        debug!(session = self.id, "session closed on drop");
    }
}
