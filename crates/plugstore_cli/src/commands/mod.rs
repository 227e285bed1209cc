//! CLI command implementations.

pub mod entry;
pub mod list;
pub mod partitions;
pub mod pk;
pub mod verify;

use plugstore_db::{Config, Database, DbResult, Pk};
use std::path::Path;

/// Opens an existing database; a missing directory is an error.
pub fn open_existing(path: &Path) -> DbResult<Database> {
    Database::open_with_config(path, Config::new().create_if_missing(false))
}

/// Parses a key given as base64 or as 32 hex digits.
pub fn parse_key(text: &str) -> DbResult<Pk> {
    Pk::parse(text).or_else(|err| Pk::from_hex(text).map_err(|_| err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_from_either_form() {
        let admin = Pk::from_tag("admin");
        assert_eq!(parse_key(&admin.to_string()).unwrap(), admin);
        assert_eq!(parse_key(&admin.to_hex()).unwrap(), admin);
        assert!(parse_key("nonsense").is_err());
    }

    #[test]
    fn missing_database_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(open_existing(&temp.path().join("missing")).is_err());
        assert!(open_existing(temp.path()).is_ok());
    }
}
