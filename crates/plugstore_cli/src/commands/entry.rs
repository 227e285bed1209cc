//! Get and delete commands.

use super::{open_existing, parse_key};
use plugstore_db::Transaction;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Prints the raw body of one entry to stdout.
pub fn get(path: &Path, partition: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let key = parse_key(key)?;
    let db = open_existing(path)?;
    let tx = db.partition(partition).begin_read();
    let bytes = tx.get_bytes(key);
    tx.commit()?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes?)?;
    writeln!(stdout)?;
    Ok(())
}

/// Deletes one entry. Deleting a missing entry succeeds.
pub fn delete(path: &Path, partition: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let key = parse_key(key)?;
    let db = open_existing(path)?;
    let tx = db.partition(partition).begin_write();
    let existed = tx.has(key);
    let result = tx.delete(key);
    tx.commit()?;
    result?;

    if existed {
        info!(partition, key = %key, "entry deleted");
        println!("✓ Deleted {key}");
    } else {
        println!("No entry {key} in {partition}");
    }
    Ok(())
}
