//! # Plugstore DB
//!
//! Filesystem-backed, partitioned key-value store.
//!
//! Every entry is a single file. Keys are 16-byte [`Pk`] values that are
//! hex-encoded and fanned out into 256 shard directories per partition:
//!
//! ```text
//! <root>/<partition>/<hex[0..2]>/<hex[2..32]>
//! ```
//!
//! This crate provides:
//! - [`Database`] and [`Partition`] handles with one reader/writer lock per
//!   partition
//! - [`ReadTransaction`] and [`WriteTransaction`] with crash-safe
//!   write-to-temp-then-rename single-entry writes
//! - snapshot [`Cursor`]s
//! - a JSON layer ([`Entity`], [`JsonCodec`]) with a minimal `ORDER BY`
//!   [`Query`] grammar
//! - [`Crud`] helpers and typed [`Repository`] handles
//!
//! Transactions serialize access, but they are not atomic: there is no
//! rollback and each write lands on disk immediately.
//!
//! ## Example
//!
//! ```rust,no_run
//! use plugstore_db::{Database, Pk, Transaction};
//!
//! let db = Database::open("data").unwrap();
//! let tx = db.partition("user").begin_write();
//! let key = tx.next_key();
//! tx.put_bytes(key, br#"{"login":"admin"}"#).unwrap();
//! assert!(tx.has(key));
//! tx.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod crud;
mod cursor;
mod database;
mod error;
pub mod fanout;
mod partition;
mod pk;
pub mod query;
mod repository;
mod transaction;

pub use codec::{Entity, JsonCodec, JsonCursor, Skipped};
pub use config::Config;
pub use crud::{Crud, Listing};
pub use cursor::Cursor;
pub use database::Database;
pub use error::{DbError, DbResult};
pub use partition::Partition;
pub use pk::{Pk, PK_LEN};
pub use query::{Collation, Direction, OrderBy, Query};
pub use repository::Repository;
pub use transaction::{ReadTransaction, Transaction, Tx, WriteTransaction};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
