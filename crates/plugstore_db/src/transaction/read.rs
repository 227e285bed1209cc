//! Read transactions.

use crate::cursor::Cursor;
use crate::error::{DbError, DbResult};
use crate::fanout::{is_entry_name, is_shard_name};
use crate::partition::Partition;
use crate::pk::Pk;
use crate::transaction::Transaction;
use parking_lot::{ArcRwLockReadGuard, RawRwLock};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Read access to a partition, shared by both transaction kinds.
pub(crate) struct Reader {
    partition: Partition,
    first_err: RefCell<Option<DbError>>,
}

impl Reader {
    pub(crate) fn new(partition: Partition) -> Self {
        Self {
            partition,
            first_err: RefCell::new(None),
        }
    }

    pub(crate) fn partition(&self) -> &Partition {
        &self.partition
    }

    pub(crate) fn note_err(&self, err: &DbError) {
        let mut slot = self.first_err.borrow_mut();
        if slot.is_none() {
            *slot = Some(err.clone());
        }
    }

    pub(crate) fn err(&self) -> Option<DbError> {
        self.first_err.borrow().clone()
    }

    pub(crate) fn get(&self, key: Pk, dst: &mut dyn Write) -> DbResult<u64> {
        let path = self.partition.path_of(&key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DbError::entity_not_found(key))
            }
            Err(e) => return Err(self.noted(e.into())),
        };
        io::copy(&mut file, dst).map_err(|e| self.noted(e.into()))
    }

    pub(crate) fn has(&self, key: Pk) -> bool {
        fs::metadata(self.partition.path_of(&key))
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    pub(crate) fn get_all(&self) -> Cursor<'_> {
        let files = match self.enumerate() {
            Ok(files) => files,
            Err(e) => {
                let err = self.noted(e.into());
                warn!(partition = %self.partition.name(), error = %err, "listing partition failed");
                Vec::new()
            }
        };
        trace!(partition = %self.partition.name(), entries = files.len(), "cursor created");
        Cursor::new(self, files)
    }

    pub(crate) fn next_key(&self) -> Pk {
        loop {
            let key = Pk::random();
            // 128 random bits; a retry is practically never taken
            if !key.is_nil() && !self.has(key) {
                return key;
            }
        }
    }

    /// Lists `<partition>/<shard>/<entry>` files, sorted by path.
    ///
    /// Only a failure to read the partition directory itself is returned.
    /// Shards and entries that cannot be inspected are noted and skipped.
    fn enumerate(&self) -> io::Result<Vec<PathBuf>> {
        let dir = self.partition.dir();
        let shards = match fs::read_dir(&dir) {
            Ok(shards) => shards,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for shard in shards {
            let shard = match shard.and_then(|s| Ok((s.file_type()?, s.path()))) {
                Ok((kind, path)) if kind.is_dir() && matches_name(&path, is_shard_name) => path,
                Ok(_) => continue,
                Err(e) => {
                    self.skip(&dir, e);
                    continue;
                }
            };
            let entries = match fs::read_dir(&shard) {
                Ok(entries) => entries,
                Err(e) => {
                    self.skip(&shard, e);
                    continue;
                }
            };
            for entry in entries {
                match entry.and_then(|e| Ok((e.file_type()?, e.path()))) {
                    Ok((kind, path)) if kind.is_file() && matches_name(&path, is_entry_name) => {
                        files.push(path);
                    }
                    Ok(_) => {}
                    Err(e) => self.skip(&shard, e),
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn skip(&self, dir: &Path, err: io::Error) {
        let err = self.noted(err.into());
        warn!(partition = %self.partition.name(), dir = %dir.display(), error = %err, "skipping unreadable directory entry");
    }

    fn noted(&self, err: DbError) -> DbError {
        self.note_err(&err);
        err
    }
}

fn matches_name(path: &Path, pred: fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(pred)
}

/// Shared access to a partition.
///
/// Mutations fail with [`DbError::ReadOnly`]. The shared lock is released
/// by [`ReadTransaction::commit`] (or `rollback`, which does the same).
pub struct ReadTransaction {
    reader: Reader,
    guard: Option<ArcRwLockReadGuard<RawRwLock, ()>>,
}

impl ReadTransaction {
    pub(crate) fn new(partition: Partition, guard: ArcRwLockReadGuard<RawRwLock, ()>) -> Self {
        Self {
            reader: Reader::new(partition),
            guard: Some(guard),
        }
    }

    /// Releases the shared lock.
    pub fn commit(mut self) -> DbResult<()> {
        self.guard.take();
        debug!(partition = %self.reader.partition().name(), "read transaction committed");
        Ok(())
    }

    /// Read transactions have nothing to roll back; same as commit.
    pub fn rollback(self) -> DbResult<()> {
        self.commit()
    }
}

impl Transaction for ReadTransaction {
    fn partition_name(&self) -> &str {
        self.reader.partition().name()
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn get(&self, key: Pk, dst: &mut dyn Write) -> DbResult<u64> {
        self.reader.get(key, dst)
    }

    fn put(&self, key: Pk, _src: &mut dyn Read) -> DbResult<u64> {
        key.assert_not_nil();
        Err(DbError::ReadOnly)
    }

    fn has(&self, key: Pk) -> bool {
        self.reader.has(key)
    }

    fn delete(&self, _key: Pk) -> DbResult<()> {
        Err(DbError::ReadOnly)
    }

    fn get_all(&self) -> Cursor<'_> {
        self.reader.get_all()
    }

    fn next_key(&self) -> Pk {
        self.reader.next_key()
    }

    fn err(&self) -> Option<DbError> {
        self.reader.err()
    }

    fn note_err(&self, err: &DbError) {
        self.reader.note_err(err);
    }
}

impl Drop for ReadTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            warn!(partition = %self.reader.partition().name(), "read transaction dropped without commit");
        }
    }
}

impl std::fmt::Debug for ReadTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTransaction")
            .field("partition", &self.reader.partition().name())
            .field("active", &self.guard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbError, Pk, Transaction};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn get_missing_is_not_found_and_not_noted() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("user").begin(false);

        let err = tx.get_bytes(Pk::from_tag("ghost")).unwrap_err();
        assert!(err.is_entity_not_found());
        assert!(tx.err().is_none());
        tx.commit().unwrap();
    }

    #[test]
    fn mutations_are_rejected() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("user").begin(false);

        let key = Pk::from_tag("k");
        assert!(matches!(tx.put_bytes(key, b"{}"), Err(DbError::ReadOnly)));
        assert!(matches!(tx.delete(key), Err(DbError::ReadOnly)));
        assert!(!tx.is_writable());
        tx.rollback().unwrap();
    }

    #[test]
    fn get_all_on_missing_partition_is_empty() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("nothing_here").begin(false);
        assert_eq!(tx.get_all().size(), 0);
        assert!(tx.err().is_none());
        tx.commit().unwrap();
    }

    #[test]
    fn get_all_skips_foreign_files() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let partition = db.partition("user");

        let key = Pk::from_tag("admin");
        let path = partition.path_of(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{}").unwrap();
        fs::write(format!("{}.tmp", path.display()), b"{").unwrap();
        fs::write(path.parent().unwrap().join(".DS_Store"), b"").unwrap();
        fs::create_dir_all(partition.dir().join(".git")).unwrap();
        fs::write(partition.dir().join("README"), b"").unwrap();

        let tx = partition.begin(false);
        let mut cursor = tx.get_all();
        assert_eq!(cursor.size(), 1);
        assert!(cursor.next());
        assert_eq!(cursor.key().unwrap(), key);
        drop(cursor);
        tx.commit().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_shard_is_noted_and_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let partition = db.partition("user");
        let readable = Pk::from_bytes([0x10; 16]);
        let locked = Pk::from_bytes([0x20; 16]);

        let tx = partition.begin_write();
        tx.put_bytes(readable, b"{}").unwrap();
        tx.put_bytes(locked, b"{}").unwrap();
        tx.commit().unwrap();

        let shard = partition.path_of(&locked).parent().unwrap().to_path_buf();
        fs::set_permissions(&shard, fs::Permissions::from_mode(0o000)).unwrap();
        // privileged users read through the permission bits
        let enforced = fs::read_dir(&shard).is_err();

        let tx = partition.begin(false);
        let mut cursor = tx.get_all();
        if enforced {
            assert_eq!(cursor.size(), 1);
            assert!(cursor.next());
            assert_eq!(cursor.key().unwrap(), readable);
            assert!(matches!(tx.err(), Some(DbError::Io(_))));
        } else {
            assert_eq!(cursor.size(), 2);
        }
        cursor.close();
        tx.commit().unwrap();

        fs::set_permissions(&shard, fs::Permissions::from_mode(0o700)).unwrap();
    }

    #[test]
    fn next_key_is_fresh() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("user").begin(false);
        let key = tx.next_key();
        assert!(!key.is_nil());
        assert!(!tx.has(key));
        tx.commit().unwrap();
    }
}
