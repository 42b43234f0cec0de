use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use heapdb_error::Error;
use tracing::{trace, warn};

use crate::transaction::{Permission, TransactionId};
use crate::Result;

/// Who holds the lock on one key. Either any number of readers or a single writer.
#[derive(Debug, Default)]
struct LockState {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl LockState {
    fn can_grant(&self, tid: TransactionId, perm: Permission) -> bool {
        if let Some(holder) = self.exclusive {
            return holder == tid;
        }
        match perm {
            Permission::ReadOnly => true,
            // An upgrade is only possible for the sole reader.
            Permission::ReadWrite => self.shared.iter().all(|&holder| holder == tid),
        }
    }

    fn grant(&mut self, tid: TransactionId, perm: Permission) {
        match perm {
            Permission::ReadOnly if self.exclusive != Some(tid) => {
                self.shared.insert(tid);
            }
            Permission::ReadOnly => {}
            Permission::ReadWrite => {
                self.shared.remove(&tid);
                self.exclusive = Some(tid);
            }
        }
    }

    fn holds(&self, tid: TransactionId) -> bool {
        self.exclusive == Some(tid) || self.shared.contains(&tid)
    }

    fn release(&mut self, tid: TransactionId) -> bool {
        let was_exclusive = self.exclusive == Some(tid);
        if was_exclusive {
            self.exclusive = None;
        }
        self.shared.remove(&tid) || was_exclusive
    }

    fn is_free(&self) -> bool {
        self.exclusive.is_none() && self.shared.is_empty()
    }
}

/// Grants shared and exclusive locks on keys (in practice, pages) to transactions.
///
/// Locks are re-entrant, and a transaction that is the only reader of a key can upgrade to
/// exclusive in place. A request that conflicts with another transaction's lock waits until the
/// lock is released or the timeout passes, in which case the requesting transaction is aborted.
/// There is no deadlock detection: a deadlock always ends in one of the waiters timing out.
#[derive(Debug)]
pub struct LockManager<K> {
    locks: Mutex<HashMap<K, LockState>>,
    released: Condvar,
}

impl<K: Eq + Hash + Copy + Display> LockManager<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            released: Condvar::new(),
        }
    }

    /// Blocks until `tid` holds a lock on `key` that is at least as strong as `perm` asks for.
    /// Fails with `Error::TransactionAborted` if that takes longer than `timeout`.
    pub fn acquire(
        &self,
        tid: TransactionId,
        key: K,
        perm: Permission,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut locks = self.locks.lock()?;
        loop {
            let state = locks.entry(key).or_default();
            if state.can_grant(tid, perm) {
                state.grant(tid, perm);
                trace!(%tid, %key, ?perm, "granted lock");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(%tid, %key, ?perm, "timed out waiting for lock, aborting transaction");
                return Err(Error::TransactionAborted(tid.id()));
            }
            locks = self.released.wait_timeout(locks, deadline - now)?.0;
        }
    }

    /// Releases whatever lock `tid` holds on `key`.
    pub fn release(&self, tid: TransactionId, key: K) -> Result<()> {
        let mut locks = self.locks.lock()?;
        if let Some(state) = locks.get_mut(&key) {
            if state.release(tid) && state.is_free() {
                locks.remove(&key);
            }
        }
        self.released.notify_all();
        Ok(())
    }

    /// Releases every lock `tid` holds.
    pub fn release_all(&self, tid: TransactionId) -> Result<()> {
        let mut locks = self.locks.lock()?;
        locks.retain(|_, state| {
            state.release(tid);
            !state.is_free()
        });
        self.released.notify_all();
        Ok(())
    }

    pub fn holds_lock(&self, tid: TransactionId, key: K) -> Result<bool> {
        let locks = self.locks.lock()?;
        Ok(locks.get(&key).is_some_and(|state| state.holds(tid)))
    }

    /// Returns every key `tid` holds a lock on.
    pub fn keys_locked_by(&self, tid: TransactionId) -> Result<Vec<K>> {
        let locks = self.locks.lock()?;
        Ok(locks
            .iter()
            .filter(|(_, state)| state.holds(tid))
            .map(|(&key, _)| key)
            .collect())
    }
}

impl<K: Eq + Hash + Copy + Display> Default for LockManager<K> {
    fn default() -> Self {
        Self::new()
    }
}
