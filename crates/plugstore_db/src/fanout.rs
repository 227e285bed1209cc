//! Fanout addressing.
//!
//! Entries are spread over 256 shard directories per partition:
//!
//! ```text
//! <root>/<partition>/<hex(pk)[0:2]>/<hex(pk)[2:]>      # entry
//! <root>/<partition>/<hex(pk)[0:2]>/<hex(pk)[2:]>.tmp  # staged write
//! ```
//!
//! Hex is used instead of base64 so case-insensitive filesystems never see
//! two keys that differ only in letter case.

use crate::error::{DbError, DbResult};
use crate::pk::{Pk, PK_LEN};
use std::path::{Path, PathBuf};

/// Suffix of a staged write.
pub const STAGING_SUFFIX: &str = ".tmp";

const SHARD_LEN: usize = 2;
const NAME_LEN: usize = PK_LEN * 2 - SHARD_LEN;

/// Returns the file path of `pk` within `partition`.
#[must_use]
pub fn fanout(root: &Path, partition: &str, pk: &Pk) -> PathBuf {
    let hex = pk.to_hex();
    let (shard, name) = hex.split_at(SHARD_LEN);
    root.join(partition).join(shard).join(name)
}

/// Returns the staging path used while `path` is being written.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(STAGING_SUFFIX);
    PathBuf::from(staged)
}

/// Recovers the key from an entry path produced by [`fanout`].
pub fn key_from_path(path: &Path) -> DbResult<Pk> {
    let name = file_name(path);
    let shard = path.parent().map(file_name).unwrap_or_default();
    Pk::from_hex(&format!("{shard}{name}"))
        .map_err(|e| DbError::malformed_key(format!("{}: {e}", path.display())))
}

/// True if `name` looks like a shard directory.
#[must_use]
pub fn is_shard_name(name: &str) -> bool {
    name.len() == SHARD_LEN && is_lower_hex(name)
}

/// True if `name` looks like an entry file (excludes staged writes).
#[must_use]
pub fn is_entry_name(name: &str) -> bool {
    name.len() == NAME_LEN && is_lower_hex(name)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}
