//! List command implementation.

use super::open_existing;
use crate::Format;
use plugstore_db::{Database, DbResult, JsonCodec, Pk, Transaction};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// One listed entry.
#[derive(Debug, Serialize)]
pub struct ListedEntry {
    /// Key in base64.
    pub key: String,
    /// Decoded body; `None` if the entry is not valid JSON.
    pub value: Option<Value>,
}

/// Reads the entries of `partition` in the order requested by `query`.
///
/// Entries that cannot be decoded are reported with an empty value when
/// unordered; an ordered query leaves them out and logs a warning.
pub fn collect(db: &Database, partition: &str, query: &str) -> DbResult<Vec<ListedEntry>> {
    let tx = db.partition(partition).begin_read();
    let entries = read_entries(&tx, query);
    tx.commit()?;
    entries
}

fn read_entries<X: Transaction>(tx: &X, query: &str) -> DbResult<Vec<ListedEntry>> {
    let mut cursor = JsonCodec::new(tx).query(query)?;
    for skipped in cursor.skipped() {
        let key = skipped.key.map(|k| k.to_string()).unwrap_or_default();
        warn!(key = %key, error = %skipped.error, "entry left out of ordered listing");
    }
    let mut entries = Vec::with_capacity(cursor.size());
    while cursor.next() {
        let key = cursor.key().map_or_else(|_| Pk::NIL.to_string(), |k| k.to_string());
        entries.push(ListedEntry {
            key,
            value: cursor.read::<Value>().ok(),
        });
    }
    Ok(entries)
}

/// Runs the list command.
pub fn run(
    path: &Path,
    partition: &str,
    query: &str,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Listing partition {} of {:?}", partition, path);
    let db = open_existing(path)?;
    let entries = collect(&db, partition, query)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        Format::Text => {
            for entry in &entries {
                match &entry.value {
                    Some(value) => println!("{}  {}", entry.key, value),
                    None => println!("{}  <invalid json>", entry.key),
                }
            }
            println!("{} entries", entries.len());
        }
    }
    Ok(())
}
