//! Partitions command implementation.

use super::open_existing;
use crate::Format;
use plugstore_db::{Database, DbResult, Transaction};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Statistics for a single partition.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PartitionStats {
    /// Partition name.
    pub name: String,
    /// Number of entries.
    pub entries: usize,
}

/// Collects entry counts for every partition.
pub fn collect(db: &Database) -> DbResult<Vec<PartitionStats>> {
    let mut stats = Vec::new();
    for name in db.partitions()? {
        let tx = db.partition(&name).begin_read();
        let entries = tx.get_all().size();
        tx.commit()?;
        stats.push(PartitionStats { name, entries });
    }
    Ok(stats)
}

/// Runs the partitions command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    info!("Listing partitions of {:?}", path);
    let db = open_existing(path)?;
    let stats = collect(&db)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        Format::Text => {
            if stats.is_empty() {
                println!("No partitions");
            }
            for partition in &stats {
                println!("{:<24} {:>8} entries", partition.name, partition.entries);
            }
        }
    }
    Ok(())
}
