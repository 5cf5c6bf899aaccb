//! Snapshot-based unit of work.
//!
//! `begin` takes the store-wide transaction lock and snapshots the state.
//! Commit releases the lock and keeps the changes; rollback, a cancelled
//! commit, or dropping the transaction restores the snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use custos_core::error::CustosResult;
use custos_core::repository::{Transaction, UnitOfWork};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DbError;
use crate::store::State;

/// Point-in-time copy of the transaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

#[derive(Clone)]
pub struct MemUnitOfWork {
    state: Arc<RwLock<State>>,
    lock: Arc<Mutex<()>>,
    counters: Arc<Counters>,
}

impl MemUnitOfWork {
    pub(crate) fn new(state: Arc<RwLock<State>>) -> Self {
        Self {
            state,
            lock: Arc::new(Mutex::new(())),
            counters: Arc::default(),
        }
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            begun: self.counters.begun.load(Ordering::SeqCst),
            committed: self.counters.committed.load(Ordering::SeqCst),
            rolled_back: self.counters.rolled_back.load(Ordering::SeqCst),
        }
    }
}

impl UnitOfWork for MemUnitOfWork {
    type Transaction = MemTransaction;

    async fn begin(&self, cancellation: &CancellationToken) -> CustosResult<MemTransaction> {
        let guard = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(DbError::Cancelled.into()),
            guard = self.lock.clone().lock_owned() => guard,
        };

        let snapshot = self.state.read().clone();
        self.counters.begun.fetch_add(1, Ordering::SeqCst);
        debug!("transaction begun");

        Ok(MemTransaction {
            state: self.state.clone(),
            snapshot: Some(snapshot),
            cancellation: cancellation.clone(),
            counters: self.counters.clone(),
            _guard: guard,
        })
    }
}

/// An open transaction. Holds the store-wide lock until it ends.
pub struct MemTransaction {
    state: Arc<RwLock<State>>,
    /// `None` once the transaction has ended.
    snapshot: Option<State>,
    cancellation: CancellationToken,
    counters: Arc<Counters>,
    _guard: OwnedMutexGuard<()>,
}

impl MemTransaction {
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state.write() = snapshot;
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
            debug!("transaction rolled back");
        }
    }
}

impl Transaction for MemTransaction {
    async fn commit(mut self) -> CustosResult<()> {
        if self.cancellation.is_cancelled() {
            warn!("commit of a cancelled transaction, rolling back");
            self.restore();
            return Err(DbError::Cancelled.into());
        }
        self.snapshot = None;
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        debug!("transaction committed");
        Ok(())
    }

    async fn rollback(mut self) -> CustosResult<()> {
        self.restore();
        Ok(())
    }
}

impl Drop for MemTransaction {
    fn drop(&mut self) {
        self.restore();
    }
}
