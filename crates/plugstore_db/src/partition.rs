//! Partitions: named tables guarded by a reader/writer lock.

use crate::database::{DatabaseInner, PartitionLock};
use crate::error::{DbError, DbResult};
use crate::fanout::fanout;
use crate::pk::Pk;
use crate::transaction::{ReadTransaction, Tx, WriteTransaction};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// A named logical table mapped to one directory.
///
/// Handles are cheap to create and clone. Every handle obtained from the
/// same [`crate::Database`] for a name shares one lock:
/// - any number of read transactions may be active together,
/// - a write transaction excludes all other transactions.
///
/// Acquiring the lock blocks the calling thread. The lock is held until the
/// transaction is committed, rolled back or dropped.
#[derive(Clone)]
pub struct Partition {
    db: Arc<DatabaseInner>,
    name: String,
    lock: PartitionLock,
}

impl Partition {
    pub(crate) fn new(db: Arc<DatabaseInner>, name: String, lock: PartitionLock) -> Self {
        Self { db, name, lock }
    }

    /// Returns the partition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition directory.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.db.root.join(&self.name)
    }

    /// Returns the file path of an entry.
    #[must_use]
    pub fn path_of(&self, key: &Pk) -> PathBuf {
        fanout(&self.db.root, &self.name, key)
    }

    pub(crate) fn config(&self) -> &crate::config::Config {
        &self.db.config
    }

    /// Begins a transaction, blocking until the lock is available.
    pub fn begin(&self, writable: bool) -> Tx {
        if writable {
            Tx::Write(self.begin_write())
        } else {
            Tx::Read(self.begin_read())
        }
    }

    /// Begins a read transaction holding the shared lock.
    pub fn begin_read(&self) -> ReadTransaction {
        let guard = self.lock.read_arc();
        debug!(partition = %self.name, "read transaction started");
        ReadTransaction::new(self.clone(), guard)
    }

    /// Begins a write transaction holding the exclusive lock.
    pub fn begin_write(&self) -> WriteTransaction {
        let guard = self.lock.write_arc();
        debug!(partition = %self.name, "write transaction started");
        WriteTransaction::new(self.clone(), guard)
    }

    /// Like [`Partition::begin`], but gives up after the configured
    /// `lock_timeout`. Without a timeout this blocks like `begin`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::LockTimeout`] if the lock was not acquired in time.
    pub fn try_begin(&self, writable: bool) -> DbResult<Tx> {
        let Some(timeout) = self.db.config.lock_timeout else {
            return Ok(self.begin(writable));
        };
        let timed_out = || DbError::LockTimeout {
            partition: self.name.clone(),
        };
        if writable {
            let guard = self.lock.try_write_arc_for(timeout).ok_or_else(timed_out)?;
            Ok(Tx::Write(WriteTransaction::new(self.clone(), guard)))
        } else {
            let guard = self.lock.try_read_arc_for(timeout).ok_or_else(timed_out)?;
            Ok(Tx::Read(ReadTransaction::new(self.clone(), guard)))
        }
    }

    #[cfg(test)]
    pub(crate) fn shares_lock_with(&self, other: &Partition) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
