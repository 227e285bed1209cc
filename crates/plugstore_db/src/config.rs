//! Database configuration.

use std::time::Duration;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether [`crate::Database::open`] creates the root directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Permission bits for partition and shard directories (unix only).
    pub dir_mode: u32,

    /// Permission bits for entry files (unix only).
    pub file_mode: u32,

    /// Whether to fsync the staged file before it is renamed into place,
    /// and the shard directory after each rename or delete.
    pub sync_on_write: bool,

    /// How long [`crate::Partition::try_begin`] waits for a lock (`None` = forever).
    pub lock_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            dir_mode: 0o700,
            file_mode: 0o600,
            sync_on_write: false,
            lock_timeout: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the root directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the permission bits for created directories.
    #[must_use]
    pub const fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets the permission bits for written entries.
    #[must_use]
    pub const fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets whether writes and deletes are fsynced.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the lock acquisition timeout used by `try_begin`.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
