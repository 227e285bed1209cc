//! Test fixtures and database helpers.

use plugstore_db::{Config, Database, Pk, Transaction};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

/// A database in a temporary directory that is removed on drop.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestDatabase {
    /// Creates an empty database with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty database with `config`.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(temp_dir.path(), config)
            .expect("Failed to open database");
        Self { db, temp_dir }
    }

    /// Returns the database root directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens a second handle on the same directory, as a restarted
    /// process would. The handle has its own lock registry.
    pub fn reopen(&self) -> Database {
        Database::open_with_config(self.path(), self.db.config().clone())
            .expect("Failed to reopen database")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary database.
///
/// # Example
///
/// ```rust,ignore
/// use plugstore_testkit::with_temp_db;
///
/// #[test]
/// fn my_test() {
///     with_temp_db(|db| {
///         let tx = db.partition("test").begin_read();
///         tx.commit().unwrap();
///     });
/// }
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::new();
    f(&test_db.db)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a database with `count` JSON entries in `partition`.
    ///
    /// Entry `i` is `{"Index": "<i>", "Name": "name-<i>"}`; the keys are
    /// returned in insertion order.
    pub fn populated_database(partition: &str, count: usize) -> (TestDatabase, Vec<Pk>) {
        let test_db = TestDatabase::new();
        let tx = test_db.partition(partition).begin_write();
        let mut keys = Vec::with_capacity(count);
        for i in 0..count {
            let key = tx.next_key();
            let body = json!({ "Index": i.to_string(), "Name": format!("name-{i}") });
            tx.put_bytes(key, body.to_string().as_bytes())
                .expect("Failed to put entry");
            keys.push(key);
        }
        tx.commit().expect("Failed to commit");
        (test_db, keys)
    }

    /// Creates a database with one entry in each of `count` partitions
    /// named `partition_<i>`.
    pub fn multi_partition_database(count: usize) -> (TestDatabase, Vec<String>) {
        let test_db = TestDatabase::new();
        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            let name = format!("partition_{i}");
            let tx = test_db.partition(&name).begin_write();
            let key = tx.next_key();
            tx.put_bytes(key, json!({ "Partition": i.to_string() }).to_string().as_bytes())
                .expect("Failed to put entry");
            tx.commit().expect("Failed to commit");
            names.push(name);
        }
        (test_db, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_is_usable() {
        let test_db = TestDatabase::new();
        assert!(test_db.path().is_dir());
        let tx = test_db.partition("test").begin_read();
        assert_eq!(tx.get_all().size(), 0);
        tx.commit().unwrap();
    }

    #[test]
    fn test_with_temp_db() {
        let partitions = with_temp_db(|db| db.partitions().unwrap());
        assert!(partitions.is_empty());
    }

    #[test]
    fn test_populated_scenario() {
        let (test_db, keys) = scenarios::populated_database("test", 10);
        let reopened = test_db.reopen();
        let tx = reopened.partition("test").begin_read();
        assert_eq!(tx.get_all().size(), 10);
        for key in keys {
            assert!(tx.has(key));
        }
        tx.commit().unwrap();
    }

    #[test]
    fn test_multi_partition_scenario() {
        let (test_db, names) = scenarios::multi_partition_database(3);
        assert_eq!(test_db.partitions().unwrap(), names);
    }
}
