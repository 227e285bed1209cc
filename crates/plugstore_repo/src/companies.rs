//! Companies users can be attached to.

use crate::error::RepoResult;
use crate::named::{Named, NamedRepository};
use plugstore_db::{impl_entity, Database, Listing, Pk};
use serde::{Deserialize, Serialize};

/// Partition holding [`Company`] records.
pub const COMPANY_PARTITION: &str = "company";

/// A company.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Company {
    /// Entity key.
    pub id: Pk,
    /// Name, unique ignoring case.
    pub name: String,
    /// Primary theme color, e.g. `#1565c0`.
    pub theme_primary_color: String,
}

impl_entity!(Company);

impl Named for Company {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Repository of [`Company`] records.
#[derive(Debug, Clone)]
pub struct Companies {
    inner: NamedRepository<Company>,
}

impl Companies {
    /// Opens the repository.
    pub fn new(db: Database) -> Self {
        Self {
            inner: NamedRepository::new(db, COMPANY_PARTITION),
        }
    }

    /// Lists all companies.
    pub fn list(&self) -> RepoResult<Listing<Company>> {
        self.inner.list()
    }

    /// Loads a company.
    pub fn get(&self, id: Pk) -> RepoResult<Company> {
        self.inner.get(id)
    }

    /// Deletes a company.
    pub fn delete(&self, id: Pk) -> RepoResult<()> {
        self.inner.delete(id)
    }

    /// Stores a new company under a fresh key.
    pub fn add(&self, company: &mut Company) -> RepoResult<()> {
        self.inner.add(company)
    }

    /// Stores changes to an existing company.
    pub fn update(&self, company: &Company) -> RepoResult<()> {
        self.inner.update(company)
    }
}
