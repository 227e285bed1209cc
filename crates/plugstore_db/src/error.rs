//! Error types for the storage engine.

use crate::pk::Pk;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in storage operations.
///
/// Errors are cheap to clone so that a transaction can remember the first
/// failure it saw while still handing the original back to the caller.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// The requested key is absent.
    #[error("entity not found: {key}")]
    EntityNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A uniqueness rule enforced by a repository was violated.
    #[error("not unique: {value}")]
    NotUnique {
        /// The conflicting value.
        value: String,
    },

    /// A mutation was attempted through a read transaction.
    #[error("unsupported operation: readonly")]
    ReadOnly,

    /// Write transactions cannot be rolled back.
    #[error("implementation does not support rollback")]
    RollbackUnsupported,

    /// A key could not be parsed or reconstructed.
    #[error("malformed key: {message}")]
    MalformedKey {
        /// Description of the problem.
        message: String,
    },

    /// A cursor was read before the first `next` or after exhaustion.
    #[error("cursor is out of bound: position {position:?}, size {size}")]
    OutOfBounds {
        /// Current cursor position, `None` before the first `next`.
        position: Option<usize>,
        /// Number of entries captured by the cursor.
        size: usize,
    },

    /// A query string could not be parsed.
    #[error("invalid query: {message}")]
    Query {
        /// Description of the problem.
        message: String,
    },

    /// A sort field holds a value kind the comparator does not support.
    #[error("cannot order by field '{field}': unsupported value type {kind}")]
    UnsupportedSortValue {
        /// The ordering field.
        field: String,
        /// JSON kind of the offending value.
        kind: &'static str,
    },

    /// A partition lock could not be acquired within the configured timeout.
    #[error("timed out waiting for partition lock: {partition}")]
    LockTimeout {
        /// The partition name.
        partition: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(Arc<serde_json::Error>),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl DbError {
    /// Creates an entity not found error for a key.
    pub fn entity_not_found(key: Pk) -> Self {
        Self::EntityNotFound {
            key: key.to_string(),
        }
    }

    /// Creates a not unique error.
    pub fn not_unique(value: impl Into<String>) -> Self {
        Self::NotUnique {
            value: value.into(),
        }
    }

    /// Creates a malformed key error.
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }

    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Returns true if this is an [`DbError::EntityNotFound`].
    #[must_use]
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }

    /// Returns true if this is a [`DbError::NotUnique`].
    #[must_use]
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::NotUnique { .. })
    }
}

impl From<io::Error> for DbError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}
