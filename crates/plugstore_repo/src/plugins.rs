//! Registered plugins and their running instances.

use crate::error::RepoResult;
use crate::unique::ensure_unique;
use plugstore_db::{impl_entity, Database, DbError, Listing, Pk, Repository};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Partition holding [`Plugin`] records.
pub const PLUGIN_PARTITION: &str = "plugin";

/// A running instance of a plugin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Instance {
    /// Instance key.
    pub id: Pk,
    /// Host the instance listens on, e.g. `127.0.0.1`.
    pub host: String,
    /// Port the instance listens on.
    pub port: u16,
}

/// A plugin known to the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Plugin {
    /// Entity key.
    pub id: Pk,
    /// Developer id, e.g. `com.example.buildserver`. Unique.
    pub dev_id: String,
    /// Human readable name.
    pub name: String,
    /// Running instances.
    pub instances: Vec<Instance>,
}

impl_entity!(Plugin);

impl Plugin {
    /// Creates an unsaved plugin without instances.
    pub fn new(dev_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dev_id: dev_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an instance with a fresh key and returns that key.
    pub fn add_instance(&mut self, host: impl Into<String>, port: u16) -> Pk {
        let id = Pk::random();
        self.instances.push(Instance {
            id,
            host: host.into(),
            port,
        });
        id
    }

    fn assign_instance_keys(&mut self) {
        for instance in &mut self.instances {
            if instance.id.is_nil() {
                instance.id = Pk::random();
            }
        }
    }
}

/// Repository of [`Plugin`] records.
#[derive(Debug, Clone)]
pub struct Plugins {
    repo: Repository<Plugin>,
}

impl Plugins {
    /// Opens the repository.
    pub fn new(db: Database) -> Self {
        Self {
            repo: Repository::new(db, PLUGIN_PARTITION),
        }
    }

    /// Lists all plugins.
    pub fn list(&self) -> RepoResult<Listing<Plugin>> {
        Ok(self.repo.list("")?)
    }

    /// Loads a plugin.
    pub fn get(&self, id: Pk) -> RepoResult<Plugin> {
        Ok(self.repo.get(id)?)
    }

    /// Finds a plugin by developer id.
    pub fn find_by_dev_id(&self, dev_id: &str) -> RepoResult<Plugin> {
        self.repo
            .list("")?
            .into_items()
            .into_iter()
            .find(|p| p.dev_id == dev_id)
            .ok_or_else(|| {
                DbError::EntityNotFound {
                    key: dev_id.to_string(),
                }
                .into()
            })
    }

    /// Stores a new plugin under a fresh key. The developer id must be unused.
    pub fn create(&self, plugin: &mut Plugin) -> RepoResult<()> {
        plugin.assign_instance_keys();
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            ensure_unique(&existing.items, Pk::NIL, &plugin.dev_id, |p| {
                p.dev_id == plugin.dev_id
            })?;
            self.repo.create_tx(tx, plugin)
        })?;
        info!(dev_id = %plugin.dev_id, id = %plugin.id, "plugin registered");
        Ok(())
    }

    /// Stores changes to a plugin, keeping the developer id unique.
    pub fn update(&self, plugin: &mut Plugin) -> RepoResult<()> {
        plugin.assign_instance_keys();
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            ensure_unique(&existing.items, plugin.id, &plugin.dev_id, |p| {
                p.dev_id == plugin.dev_id
            })?;
            self.repo.update_tx(tx, plugin)
        })?;
        Ok(())
    }

    /// Deletes a plugin.
    pub fn delete(&self, id: Pk) -> RepoResult<()> {
        Ok(self.repo.delete(id)?)
    }
}
