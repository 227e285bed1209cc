//! User groups.

use crate::error::RepoResult;
use crate::named::{Named, NamedRepository};
use plugstore_db::{impl_entity, Database, Listing, Pk};
use serde::{Deserialize, Serialize};

/// Partition holding [`Group`] records.
pub const GROUP_PARTITION: &str = "group";

/// A group of users. Permissions are usually granted to groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Group {
    /// Entity key.
    pub id: Pk,
    /// Name, unique ignoring case.
    pub name: String,
}

impl_entity!(Group);

impl Named for Group {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Group {
    /// Creates an unsaved group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Pk::NIL,
            name: name.into(),
        }
    }
}

/// Repository of [`Group`] records.
#[derive(Debug, Clone)]
pub struct Groups {
    inner: NamedRepository<Group>,
}

impl Groups {
    /// Opens the repository.
    pub fn new(db: Database) -> Self {
        Self {
            inner: NamedRepository::new(db, GROUP_PARTITION),
        }
    }

    /// Lists all groups.
    pub fn list(&self) -> RepoResult<Listing<Group>> {
        self.inner.list()
    }

    /// Loads a group.
    pub fn get(&self, id: Pk) -> RepoResult<Group> {
        self.inner.get(id)
    }

    /// Deletes a group. Memberships pointing at it are left alone.
    pub fn delete(&self, id: Pk) -> RepoResult<()> {
        self.inner.delete(id)
    }

    /// Stores a new group under a fresh key.
    pub fn add(&self, group: &mut Group) -> RepoResult<()> {
        self.inner.add(group)
    }

    /// Stores changes to an existing group.
    pub fn update(&self, group: &Group) -> RepoResult<()> {
        self.inner.update(group)
    }
}
