//! Error types for the repositories.

use plugstore_db::DbError;
use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors returned by the repositories.
#[derive(Debug, Clone, Error)]
pub enum RepoError {
    /// Storage error, including `NotUnique` and `EntityNotFound`.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Hashing a password failed.
    #[error("password hashing failed: {0}")]
    Password(String),
}

impl RepoError {
    /// Returns true if the requested entity does not exist.
    #[must_use]
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_entity_not_found())
    }

    /// Returns true if a uniqueness rule was violated.
    #[must_use]
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_not_unique())
    }
}

impl From<argon2::password_hash::Error> for RepoError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Password(err.to_string())
    }
}
