//! Write transactions.

use crate::cursor::Cursor;
use crate::database::create_dirs;
use crate::error::{DbError, DbResult};
use crate::fanout::staging_path;
use crate::partition::Partition;
use crate::pk::Pk;
use crate::transaction::{Reader, Transaction};
use parking_lot::{ArcRwLockWriteGuard, RawRwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Exclusive access to a partition.
///
/// Reads go through the same code as [`crate::ReadTransaction`]. Writes are
/// applied to the filesystem immediately and stay applied: there is no
/// rollback.
pub struct WriteTransaction {
    reader: Reader,
    guard: Option<ArcRwLockWriteGuard<RawRwLock, ()>>,
}

impl WriteTransaction {
    pub(crate) fn new(partition: Partition, guard: ArcRwLockWriteGuard<RawRwLock, ()>) -> Self {
        Self {
            reader: Reader::new(partition),
            guard: Some(guard),
        }
    }

    /// Releases the exclusive lock.
    pub fn commit(mut self) -> DbResult<()> {
        self.guard.take();
        debug!(partition = %self.reader.partition().name(), "write transaction committed");
        Ok(())
    }

    /// Always fails with [`DbError::RollbackUnsupported`].
    ///
    /// The lock is released, but every write made so far remains applied.
    pub fn rollback(mut self) -> DbResult<()> {
        self.guard.take();
        warn!(partition = %self.reader.partition().name(), "rollback requested, writes remain applied");
        Err(DbError::RollbackUnsupported)
    }

    /// Stages `src` next to the target and moves it into place.
    ///
    /// The content is written completely to `<path>.tmp` first; only then is
    /// the staged file renamed over the target. If any step fails the
    /// previous entry is left untouched and the staged file may remain as a
    /// leftover, which cursors ignore.
    fn write_staged(&self, path: &Path, src: &mut dyn Read) -> io::Result<u64> {
        let config = self.reader.partition().config();
        let staged = staging_path(path);

        let mut file = match open_staging(&staged, config.file_mode) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // first write into this shard
                if let Some(parent) = staged.parent() {
                    create_dirs(parent, config.dir_mode)?;
                }
                open_staging(&staged, config.file_mode)?
            }
            Err(e) => return Err(e),
        };

        let written = io::copy(src, &mut file)?;
        file.flush()?;
        if config.sync_on_write {
            file.sync_all()?;
        }
        drop(file);

        replace(&staged, path)?;
        if config.sync_on_write {
            if let Some(shard) = path.parent() {
                sync_dir(shard)?;
            }
        }
        Ok(written)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)?;
        if self.reader.partition().config().sync_on_write {
            if let Some(shard) = path.parent() {
                sync_dir(shard)?;
            }
        }
        Ok(())
    }
}

fn open_staging(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

/// Makes renames and removals inside `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// NTFS journals directory metadata; there is no directory fsync.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Moves `staged` over `target`.
#[cfg(unix)]
fn replace(staged: &Path, target: &Path) -> io::Result<()> {
    // rename(2) replaces the target atomically
    fs::rename(staged, target)
}

/// Moves `staged` over `target`.
#[cfg(not(unix))]
fn replace(staged: &Path, target: &Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(staged, target)
}

impl Transaction for WriteTransaction {
    fn partition_name(&self) -> &str {
        self.reader.partition().name()
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn get(&self, key: Pk, dst: &mut dyn Write) -> DbResult<u64> {
        self.reader.get(key, dst)
    }

    fn put(&self, key: Pk, src: &mut dyn Read) -> DbResult<u64> {
        key.assert_not_nil();
        let path = self.reader.partition().path_of(&key);
        match self.write_staged(&path, src) {
            Ok(written) => {
                debug!(partition = %self.partition_name(), key = %key, bytes = written, "entry written");
                Ok(written)
            }
            Err(e) => {
                let err = DbError::from(e);
                self.reader.note_err(&err);
                Err(err)
            }
        }
    }

    fn has(&self, key: Pk) -> bool {
        self.reader.has(key)
    }

    fn delete(&self, key: Pk) -> DbResult<()> {
        let path = self.reader.partition().path_of(&key);
        match self.remove(&path) {
            Ok(()) => {
                debug!(partition = %self.partition_name(), key = %key, "entry deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                let err = DbError::from(e);
                self.reader.note_err(&err);
                Err(err)
            }
        }
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

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            warn!(partition = %self.reader.partition().name(), "write transaction dropped without commit");
        }
    }
}

impl std::fmt::Debug for WriteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("partition", &self.reader.partition().name())
            .field("active", &self.guard.is_some())
            .finish()
    }
}
