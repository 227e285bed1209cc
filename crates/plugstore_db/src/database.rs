//! Database root handle and partition lock registry.

use crate::config::Config;
use crate::error::{DbError, DbResult};
use crate::partition::Partition;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Lock shared by every handle of one partition name.
pub(crate) type PartitionLock = Arc<RwLock<()>>;

pub(crate) struct DatabaseInner {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    locks: Mutex<HashMap<String, PartitionLock>>,
}

/// The root handle of a store, bound to one directory.
///
/// A `Database` holds no open files. It owns the registry that maps each
/// partition name to its reader/writer lock, so every [`Partition`] handle
/// for the same name serializes against the others. Cloning is cheap and
/// clones share the registry.
///
/// Only one process may use a directory at a time; nothing coordinates
/// access across processes.
///
/// # Example
///
/// ```rust,ignore
/// use plugstore_db::{Database, Pk, Transaction};
///
/// let db = Database::open("data")?;
/// let tx = db.partition("user").begin(true);
/// tx.put_bytes(Pk::from_tag("admin"), br#"{"login":"admin"}"#)?;
/// tx.commit()?;
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a handle without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, Config::default())
    }

    /// Creates a handle with a configuration, without touching the filesystem.
    pub fn with_config(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                root: root.into(),
                config,
                locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Opens a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the path exists but is not a directory, or cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> DbResult<Self> {
        Self::open_with_config(root, Config::default())
    }

    /// Opens a database directory.
    ///
    /// The directory is created if it is missing and `create_if_missing` is
    /// set; otherwise a missing directory is an error.
    pub fn open_with_config(root: impl Into<PathBuf>, config: Config) -> DbResult<Self> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", root.display()),
                )
                .into())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && config.create_if_missing => {
                create_dirs(&root, config.dir_mode)?;
            }
            Err(e) => return Err(e.into()),
        }
        debug!(root = %root.display(), "database opened");
        Ok(Self::with_config(root, config))
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns a handle to the named partition.
    ///
    /// The name is used verbatim as a directory. All handles for one name
    /// share a single lock, which is created on first use.
    #[must_use]
    pub fn partition(&self, name: &str) -> Partition {
        let lock = {
            let mut locks = self.inner.locks.lock();
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        Partition::new(Arc::clone(&self.inner), name.to_string(), lock)
    }

    /// Lists the partitions that exist on disk, sorted by name.
    pub fn partitions(&self) -> DbResult<Vec<String>> {
        let entries = match fs::read_dir(&self.inner.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::from(e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("root", &self.inner.root)
            .finish_non_exhaustive()
    }
}

/// Creates `path` and its parents with the given permission bits.
pub(crate) fn create_dirs(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}
