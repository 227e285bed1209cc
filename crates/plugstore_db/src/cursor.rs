//! Snapshot cursors over a partition.

use crate::error::{DbError, DbResult};
use crate::fanout::key_from_path;
use crate::pk::Pk;
use crate::transaction::Reader;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A single-pass, forward-only cursor.
///
/// The list of entry files is captured when the cursor is created; entries
/// added afterwards are not seen, and entries removed afterwards are still
/// visited but read as [`DbError::EntityNotFound`].
///
/// The position starts before the first entry; call [`Cursor::next`] before
/// reading.
///
/// ```rust,ignore
/// let mut cursor = tx.get_all();
/// while cursor.next() {
///     let key = cursor.key()?;
///     let bytes = cursor.get_bytes()?;
/// }
/// cursor.close();
/// ```
pub struct Cursor<'tx> {
    reader: &'tx Reader,
    files: Vec<PathBuf>,
    position: Option<usize>,
}

impl<'tx> Cursor<'tx> {
    pub(crate) fn new(reader: &'tx Reader, files: Vec<PathBuf>) -> Self {
        Self {
            reader,
            files,
            position: None,
        }
    }

    /// Returns a fresh cursor over `files` within the same transaction.
    pub(crate) fn reordered(&self, files: Vec<PathBuf>) -> Cursor<'tx> {
        Cursor::new(self.reader, files)
    }

    /// Advances to the next entry; false once the entries are exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| (p + 1).min(self.files.len()));
        self.position = Some(next);
        next < self.files.len()
    }

    /// Number of entries captured at creation.
    #[must_use]
    pub fn size(&self) -> usize {
        self.files.len()
    }

    /// Returns the key of the current entry.
    pub fn key(&self) -> DbResult<Pk> {
        key_from_path(self.current()?)
    }

    /// Copies the current entry into `dst`, returning the number of bytes.
    pub fn get(&self, dst: &mut dyn Write) -> DbResult<u64> {
        let path = self.current()?;
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // removed after the listing was taken
                return Err(self.noted(DbError::entity_not_found(self.key()?)));
            }
            Err(e) => return Err(self.noted(e.into())),
        };
        io::copy(&mut file, dst).map_err(|e| self.noted(e.into()))
    }

    /// Reads the current entry into memory.
    pub fn get_bytes(&self) -> DbResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.get(&mut buf)?;
        Ok(buf)
    }

    /// Decodes the current entry as JSON.
    pub fn scan<T: DeserializeOwned>(&self) -> DbResult<T> {
        let bytes = self.get_bytes()?;
        serde_json::from_slice(&bytes).map_err(|e| self.noted(e.into()))
    }

    /// Returns the stored size of the current entry in bytes.
    pub fn length(&self) -> DbResult<u64> {
        let path = self.current()?;
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(self.noted(DbError::entity_not_found(self.key()?)))
            }
            Err(e) => Err(self.noted(e.into())),
        }
    }

    /// Returns the first error recorded by the owning transaction.
    pub fn err(&self) -> Option<DbError> {
        self.reader.err()
    }

    /// Releases the cursor. Nothing is held open today, but callers should
    /// still close cursors they are done with.
    pub fn close(self) {}

    pub(crate) fn current(&self) -> DbResult<&Path> {
        self.position
            .and_then(|p| self.files.get(p))
            .map(PathBuf::as_path)
            .ok_or(DbError::OutOfBounds {
                position: self.position,
                size: self.files.len(),
            })
    }

    fn noted(&self, err: DbError) -> DbError {
        self.reader.note_err(&err);
        err
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("size", &self.files.len())
            .field("position", &self.position)
            .finish()
    }
}
