//! Typed repositories bound to one partition.

use crate::codec::Entity;
use crate::crud::{Crud, Listing};
use crate::database::Database;
use crate::error::DbResult;
use crate::partition::Partition;
use crate::pk::Pk;
use crate::transaction::{Transaction, Tx};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// CRUD over one partition holding entities of type `T`.
///
/// A repository fixes both the partition name and the entity type, so it is
/// not possible to store a `Group` into the `user` partition by accident.
///
/// ```rust,ignore
/// let groups: Repository<Group> = Repository::new(db.clone(), "group");
/// let mut admins = Group { id: Pk::NIL, name: "admins".into() };
/// groups.create(&mut admins)?;
/// let all = groups.list("ORDER BY name")?.into_items();
/// ```
pub struct Repository<T> {
    crud: Crud,
    partition: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Repository<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Creates a repository for `partition`.
    pub fn new(db: Database, partition: impl Into<String>) -> Self {
        Self {
            crud: Crud::new(db),
            partition: partition.into(),
            _marker: PhantomData,
        }
    }

    /// Returns the partition name.
    #[must_use]
    pub fn partition_name(&self) -> &str {
        &self.partition
    }

    /// Returns a handle to the partition.
    #[must_use]
    pub fn partition(&self) -> Partition {
        self.crud.database().partition(&self.partition)
    }

    /// Runs `f` in a transaction on this repository's partition.
    pub fn with_tx<R>(&self, writable: bool, f: impl FnOnce(&Tx) -> DbResult<R>) -> DbResult<R> {
        self.crud.with_tx(&self.partition, writable, f)
    }

    /// Assigns a fresh key to `obj` and stores it.
    pub fn create(&self, obj: &mut T) -> DbResult<()> {
        self.crud.create(&self.partition, obj)
    }

    /// [`Repository::create`] within a transaction.
    pub fn create_tx<X: Transaction + ?Sized>(&self, tx: &X, obj: &mut T) -> DbResult<()> {
        self.crud.create_tx(tx, obj)
    }

    /// Loads the entity stored under `key`.
    pub fn get(&self, key: Pk) -> DbResult<T> {
        self.with_tx(false, |tx| self.get_tx(tx, key))
    }

    /// [`Repository::get`] within a transaction.
    pub fn get_tx<X: Transaction + ?Sized>(&self, tx: &X, key: Pk) -> DbResult<T> {
        crate::codec::JsonCodec::new(tx).load(key)
    }

    /// Reloads `obj` from the entry under `obj.id()`.
    pub fn read(&self, obj: &mut T) -> DbResult<()> {
        self.crud.read(&self.partition, obj)
    }

    /// Stores `obj` under its existing key.
    pub fn update(&self, obj: &T) -> DbResult<()> {
        self.crud.update(&self.partition, obj)
    }

    /// [`Repository::update`] within a transaction.
    pub fn update_tx<X: Transaction + ?Sized>(&self, tx: &X, obj: &T) -> DbResult<()> {
        self.crud.update_tx(tx, obj)
    }

    /// Deletes `key`.
    pub fn delete(&self, key: Pk) -> DbResult<()> {
        self.crud.delete(&self.partition, key)
    }

    /// [`Repository::delete`] within a transaction.
    pub fn delete_tx<X: Transaction + ?Sized>(&self, tx: &X, key: Pk) -> DbResult<()> {
        self.crud.delete_tx(tx, key)
    }

    /// Checks if `key` exists.
    pub fn has(&self, key: Pk) -> bool {
        self.crud.has(&self.partition, key)
    }

    /// Lists the partition in the order requested by `query`.
    pub fn list(&self, query: &str) -> DbResult<Listing<T>> {
        self.crud.list(&self.partition, query)
    }

    /// [`Repository::list`] within a transaction.
    pub fn list_tx<X: Transaction + ?Sized>(&self, tx: &X, query: &str) -> DbResult<Listing<T>> {
        self.crud.list_tx(tx, query)
    }
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            crud: self.crud.clone(),
            partition: self.partition.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("partition", &self.partition)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
