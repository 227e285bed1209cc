//! Verify command implementation.

use super::open_existing;
use plugstore_db::fanout::{is_entry_name, is_shard_name, STAGING_SUFFIX};
use plugstore_db::Database;
use serde::de::IgnoredAny;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of partitions walked.
    pub partitions_checked: usize,
    /// Number of entries checked.
    pub entries_checked: usize,
    /// Entries holding valid JSON.
    pub valid_entries: usize,
    /// Entries that are not valid JSON.
    pub corrupt_entries: Vec<PathBuf>,
    /// Files and directories that do not follow the fanout layout.
    pub foreign_paths: Vec<PathBuf>,
    /// Staged writes left behind by interrupted puts.
    pub stale_staging: Vec<PathBuf>,
    /// Staged writes that were removed.
    pub removed_staging: usize,
    /// I/O errors hit while walking.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// True if nothing needs attention.
    pub fn is_ok(&self) -> bool {
        self.corrupt_entries.is_empty()
            && self.foreign_paths.is_empty()
            && self.errors.is_empty()
            && self.stale_staging.len() == self.removed_staging
    }
}

/// Walks every partition of `db`.
///
/// Each partition is checked under its lock: shared normally, exclusive
/// when `clean_tmp` removes stale staging files.
pub fn check(db: &Database, clean_tmp: bool) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();
    for name in db.partitions()? {
        let partition = db.partition(&name);
        let tx = partition.begin(clean_tmp);
        debug!(partition = %name, "verifying");
        check_partition(&partition.dir(), clean_tmp, &mut result);
        tx.commit()?;
        result.partitions_checked += 1;
    }
    Ok(result)
}

fn check_partition(dir: &Path, clean_tmp: bool, result: &mut VerifyResult) {
    let shards = match fs::read_dir(dir) {
        Ok(shards) => shards,
        Err(e) => {
            result.errors.push(format!("{}: {e}", dir.display()));
            return;
        }
    };
    for shard in shards.flatten() {
        let path = shard.path();
        let is_dir = shard.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || !name_of(&path).is_some_and(is_shard_name) {
            result.foreign_paths.push(path);
            continue;
        }
        check_shard(&path, clean_tmp, result);
    }
}

fn check_shard(dir: &Path, clean_tmp: bool, result: &mut VerifyResult) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            result.errors.push(format!("{}: {e}", dir.display()));
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = name_of(&path) else {
            result.foreign_paths.push(path);
            continue;
        };

        if let Some(target) = name.strip_suffix(STAGING_SUFFIX) {
            if is_entry_name(target) {
                if clean_tmp {
                    match fs::remove_file(&path) {
                        Ok(()) => result.removed_staging += 1,
                        Err(e) => result.errors.push(format!("{}: {e}", path.display())),
                    }
                }
                result.stale_staging.push(path);
                continue;
            }
        }

        if !is_entry_name(name) {
            result.foreign_paths.push(path);
            continue;
        }

        result.entries_checked += 1;
        match fs::read(&path) {
            Ok(bytes) if serde_json::from_slice::<IgnoredAny>(&bytes).is_ok() => {
                result.valid_entries += 1;
            }
            Ok(_) => result.corrupt_entries.push(path),
            Err(e) => result.errors.push(format!("{}: {e}", path.display())),
        }
    }
}

fn name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Runs the verify command.
pub fn run(path: &Path, clean_tmp: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying database at {:?}", path);
    println!();

    let db = open_existing(path)?;
    let result = check(&db, clean_tmp)?;
    info!(
        partitions = result.partitions_checked,
        entries = result.entries_checked,
        "verification finished"
    );

    println!("Partitions: {}", result.partitions_checked);
    println!("Entries: {}", result.entries_checked);
    println!("Valid: {}", result.valid_entries);
    for path in &result.corrupt_entries {
        println!("  ✗ not valid JSON: {}", path.display());
    }
    for path in &result.foreign_paths {
        println!("  ✗ unexpected path: {}", path.display());
    }
    for path in &result.stale_staging {
        if clean_tmp {
            println!("  removed staged write: {}", path.display());
        } else {
            println!("  ✗ stale staged write: {} (use --clean-tmp)", path.display());
        }
    }
    for error in &result.errors {
        println!("  ✗ {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Database verification passed");
        Ok(())
    } else {
        println!("✗ Database verification failed");
        Err("Verification failed".into())
    }
}
