//! Repositories of entities with a case-insensitive unique name.

use crate::error::RepoResult;
use crate::unique::ensure_unique;
use plugstore_db::{Database, Entity, Listing, Pk, Repository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

/// An entity identified to humans by its name.
pub trait Named: Entity + Serialize + DeserializeOwned {
    /// The display name.
    fn name(&self) -> &str;
}

/// CRUD with a case-insensitive unique name, shared by groups and companies.
#[derive(Debug, Clone)]
pub(crate) struct NamedRepository<T> {
    repo: Repository<T>,
}

impl<T: Named> NamedRepository<T> {
    pub(crate) fn new(db: Database, partition: &str) -> Self {
        Self {
            repo: Repository::new(db, partition),
        }
    }

    pub(crate) fn list(&self) -> RepoResult<Listing<T>> {
        Ok(self.repo.list("")?)
    }

    pub(crate) fn get(&self, id: Pk) -> RepoResult<T> {
        Ok(self.repo.get(id)?)
    }

    pub(crate) fn delete(&self, id: Pk) -> RepoResult<()> {
        Ok(self.repo.delete(id)?)
    }

    pub(crate) fn add(&self, item: &mut T) -> RepoResult<()> {
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            let name = item.name().to_lowercase();
            ensure_unique(&existing.items, Pk::NIL, item.name(), |other| {
                other.name().to_lowercase() == name
            })?;
            self.repo.create_tx(tx, item)
        })?;
        info!(partition = %self.repo.partition_name(), name = %item.name(), "added");
        Ok(())
    }

    pub(crate) fn update(&self, item: &T) -> RepoResult<()> {
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            let name = item.name().to_lowercase();
            ensure_unique(&existing.items, item.id(), item.name(), |other| {
                other.name().to_lowercase() == name
            })?;
            self.repo.update_tx(tx, item)
        })?;
        Ok(())
    }
}
