//! Create/read/update/delete helpers.

use crate::codec::{Entity, JsonCodec, Skipped};
use crate::database::Database;
use crate::error::DbResult;
use crate::pk::Pk;
use crate::transaction::{Transaction, Tx};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// The result of listing a partition.
///
/// Listing keeps going past entries that cannot be read or decoded; those
/// end up in `failures` instead of aborting the whole list.
#[derive(Debug)]
pub struct Listing<T> {
    /// Successfully decoded entities, in query order.
    pub items: Vec<T>,
    /// Entries that were skipped.
    pub failures: Vec<Skipped>,
}

impl<T> Listing<T> {
    /// True if no entry was skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Drops the failure report and returns the items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Convenience operations composed from partitions, transactions and the
/// JSON codec.
///
/// Each plain method runs in a transaction of its own. The `*_tx` variants
/// take a caller's transaction so that several operations can run under one
/// lock acquisition.
#[derive(Debug, Clone)]
pub struct Crud {
    db: Database,
}

impl Crud {
    /// Creates the helper.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `f` in a transaction on `partition` and commits it.
    pub fn with_tx<R>(
        &self,
        partition: &str,
        writable: bool,
        f: impl FnOnce(&Tx) -> DbResult<R>,
    ) -> DbResult<R> {
        let tx = self.db.partition(partition).begin(writable);
        let result = f(&tx);
        tx.commit()?;
        result
    }

    /// Assigns a fresh key to `obj` and stores it.
    pub fn create<T: Entity + Serialize>(&self, partition: &str, obj: &mut T) -> DbResult<()> {
        self.with_tx(partition, true, |tx| self.create_tx(tx, obj))
    }

    /// [`Crud::create`] within a transaction.
    pub fn create_tx<T, X>(&self, tx: &X, obj: &mut T) -> DbResult<()>
    where
        T: Entity + Serialize,
        X: Transaction + ?Sized,
    {
        obj.set_id(tx.next_key());
        JsonCodec::new(tx).put(obj)?;
        Ok(())
    }

    /// Loads the entity stored under `obj.id()` into `obj`.
    pub fn read<T: Entity + DeserializeOwned>(&self, partition: &str, obj: &mut T) -> DbResult<()> {
        self.with_tx(partition, false, |tx| self.read_tx(tx, obj))
    }

    /// [`Crud::read`] within a transaction.
    pub fn read_tx<T, X>(&self, tx: &X, obj: &mut T) -> DbResult<()>
    where
        T: Entity + DeserializeOwned,
        X: Transaction + ?Sized,
    {
        JsonCodec::new(tx).get(obj)
    }

    /// Stores `obj` under its existing key.
    pub fn update<T: Entity + Serialize>(&self, partition: &str, obj: &T) -> DbResult<()> {
        self.with_tx(partition, true, |tx| self.update_tx(tx, obj))
    }

    /// [`Crud::update`] within a transaction.
    pub fn update_tx<T, X>(&self, tx: &X, obj: &T) -> DbResult<()>
    where
        T: Entity + Serialize,
        X: Transaction + ?Sized,
    {
        JsonCodec::new(tx).put(obj)?;
        Ok(())
    }

    /// Deletes `key`. Missing entries are ignored.
    pub fn delete(&self, partition: &str, key: Pk) -> DbResult<()> {
        self.with_tx(partition, true, |tx| self.delete_tx(tx, key))
    }

    /// [`Crud::delete`] within a transaction.
    pub fn delete_tx<X: Transaction + ?Sized>(&self, tx: &X, key: Pk) -> DbResult<()> {
        tx.delete(key)
    }

    /// Checks if `key` exists.
    pub fn has(&self, partition: &str, key: Pk) -> bool {
        let tx = self.db.partition(partition).begin_read();
        let found = tx.has(key);
        // commit of a read transaction cannot fail
        let _ = tx.commit();
        found
    }

    /// [`Crud::has`] within a transaction.
    pub fn has_tx<X: Transaction + ?Sized>(&self, tx: &X, key: Pk) -> bool {
        tx.has(key)
    }

    /// Loads every entity of `partition` in the order requested by `query`.
    ///
    /// # Errors
    ///
    /// Fails only if the query itself is invalid or cannot be ordered;
    /// individual bad entries are reported in [`Listing::failures`].
    pub fn list<T: Entity + DeserializeOwned>(
        &self,
        partition: &str,
        query: &str,
    ) -> DbResult<Listing<T>> {
        self.with_tx(partition, false, |tx| self.list_tx(tx, query))
    }

    /// [`Crud::list`] within a transaction.
    pub fn list_tx<T, X>(&self, tx: &X, query: &str) -> DbResult<Listing<T>>
    where
        T: Entity + DeserializeOwned,
        X: Transaction + ?Sized,
    {
        let mut cursor = JsonCodec::new(tx).query(query)?;
        let mut items = Vec::with_capacity(cursor.size());
        let mut failures = Vec::new();
        while cursor.next() {
            match cursor.read_entity::<T>() {
                Ok(item) => items.push(item),
                Err(error) => {
                    let key = cursor.key().ok();
                    warn!(partition = %tx.partition_name(), key = ?key, error = %error, "skipping undecodable entry");
                    failures.push(Skipped { key, error });
                }
            }
        }
        let mut skipped = cursor.into_skipped();
        skipped.append(&mut failures);
        if let Some(first) = skipped.first() {
            tx.note_err(&first.error);
        }
        Ok(Listing {
            items,
            failures: skipped,
        })
    }
}
