//! Read and write transactions over a single partition.
//!
//! A transaction holds its partition's lock from `begin` until it is
//! committed, rolled back or dropped. These are not ACID transactions:
//! - every `put` and `delete` hits the filesystem immediately,
//! - a failed write leaves earlier writes of the same transaction applied,
//! - write transactions cannot be rolled back.
//!
//! What they do provide is single-writer/multi-reader exclusion per
//! partition and crash-safe single-entry writes (see [`WriteTransaction::put`]).

mod read;
mod write;

pub use read::ReadTransaction;
pub(crate) use read::Reader;
pub use write::WriteTransaction;

use crate::cursor::Cursor;
use crate::error::{DbError, DbResult};
use crate::pk::Pk;
use std::io::{Read, Write};

/// Operations shared by read and write transactions.
pub trait Transaction {
    /// Returns the name of the partition this transaction is bound to.
    fn partition_name(&self) -> &str;

    /// Returns true if this transaction holds the exclusive lock.
    fn is_writable(&self) -> bool;

    /// Copies the entry stored under `key` into `dst`.
    ///
    /// Returns the number of bytes copied, or [`DbError::EntityNotFound`] if
    /// there is no such entry.
    fn get(&self, key: Pk, dst: &mut dyn Write) -> DbResult<u64>;

    /// Reads the entry stored under `key` into memory.
    fn get_bytes(&self, key: Pk) -> DbResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.get(key, &mut buf)?;
        Ok(buf)
    }

    /// Stores everything read from `src` under `key`.
    ///
    /// Fails with [`DbError::ReadOnly`] on a read transaction.
    ///
    /// # Panics
    ///
    /// Panics if `key` is [`Pk::NIL`].
    fn put(&self, key: Pk, src: &mut dyn Read) -> DbResult<u64>;

    /// Stores `bytes` under `key`.
    fn put_bytes(&self, key: Pk, mut bytes: &[u8]) -> DbResult<u64> {
        self.put(key, &mut bytes)
    }

    /// Checks if an entry exists. Any failure is reported as `false`.
    fn has(&self, key: Pk) -> bool;

    /// Deletes an entry. Deleting a missing entry is not an error.
    ///
    /// Fails with [`DbError::ReadOnly`] on a read transaction.
    fn delete(&self, key: Pk) -> DbResult<()>;

    /// Returns a cursor over the entries present right now.
    fn get_all(&self) -> Cursor<'_>;

    /// Generates a random key that does not collide with an existing entry.
    fn next_key(&self) -> Pk;

    /// Returns the first error recorded by this transaction, if any.
    ///
    /// A missing entry on `get` is not recorded.
    fn err(&self) -> Option<DbError>;

    /// Records `err` unless an earlier error was already recorded.
    fn note_err(&self, err: &DbError);
}

/// A transaction returned by [`crate::Partition::begin`].
#[derive(Debug)]
pub enum Tx {
    /// Shared, read-only access.
    Read(ReadTransaction),
    /// Exclusive access.
    Write(WriteTransaction),
}

impl Tx {
    /// Releases the lock.
    pub fn commit(self) -> DbResult<()> {
        match self {
            Tx::Read(tx) => tx.commit(),
            Tx::Write(tx) => tx.commit(),
        }
    }

    /// Releases the lock of a read transaction; always fails for a write
    /// transaction, see [`WriteTransaction::rollback`].
    pub fn rollback(self) -> DbResult<()> {
        match self {
            Tx::Read(tx) => tx.rollback(),
            Tx::Write(tx) => tx.rollback(),
        }
    }

    fn inner(&self) -> &dyn Transaction {
        match self {
            Tx::Read(tx) => tx,
            Tx::Write(tx) => tx,
        }
    }
}

impl Transaction for Tx {
    fn partition_name(&self) -> &str {
        self.inner().partition_name()
    }

    fn is_writable(&self) -> bool {
        matches!(self, Tx::Write(_))
    }

    fn get(&self, key: Pk, dst: &mut dyn Write) -> DbResult<u64> {
        self.inner().get(key, dst)
    }

    fn put(&self, key: Pk, src: &mut dyn Read) -> DbResult<u64> {
        self.inner().put(key, src)
    }

    fn has(&self, key: Pk) -> bool {
        self.inner().has(key)
    }

    fn delete(&self, key: Pk) -> DbResult<()> {
        self.inner().delete(key)
    }

    fn get_all(&self) -> Cursor<'_> {
        self.inner().get_all()
    }

    fn next_key(&self) -> Pk {
        self.inner().next_key()
    }

    fn err(&self) -> Option<DbError> {
        self.inner().err()
    }

    fn note_err(&self, err: &DbError) {
        self.inner().note_err(err);
    }
}
