//! Login sessions.

use crate::error::RepoResult;
use plugstore_db::{impl_entity, Database, Listing, Pk, Repository};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Partition holding [`Session`] records.
pub const SESSION_PARTITION: &str = "session";

/// A logged-in session. Its key doubles as the session token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Session {
    /// Entity key and session token.
    pub id: Pk,
    /// The user the session belongs to.
    pub user: Pk,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: i64,
    /// Last use, seconds since the Unix epoch.
    pub last_used_at: i64,
    /// Remote address of the last request.
    pub last_remote_addr: String,
    /// User agent of the last request.
    pub last_user_agent: String,
}

impl_entity!(Session);

impl Session {
    /// Creates an unsaved session for `user`, started at `now`.
    pub fn new(user: Pk, now: i64) -> Self {
        Self {
            user,
            created_at: now,
            last_used_at: now,
            ..Self::default()
        }
    }

    /// Records a request made with this session.
    pub fn touch(&mut self, now: i64, remote_addr: &str, user_agent: &str) {
        self.last_used_at = now;
        self.last_remote_addr = remote_addr.to_string();
        self.last_user_agent = user_agent.to_string();
    }

    /// Returns true if the session was idle for more than `max_idle_secs`.
    #[must_use]
    pub fn is_expired(&self, max_idle_secs: i64, now: i64) -> bool {
        now.saturating_sub(self.last_used_at) > max_idle_secs
    }
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Repository of [`Session`] records.
#[derive(Debug, Clone)]
pub struct Sessions {
    repo: Repository<Session>,
}

impl Sessions {
    /// Opens the repository.
    pub fn new(db: Database) -> Self {
        Self {
            repo: Repository::new(db, SESSION_PARTITION),
        }
    }

    /// Stores a new session under a fresh random key.
    pub fn create(&self, session: &mut Session) -> RepoResult<()> {
        Ok(self.repo.create(session)?)
    }

    /// Loads a session.
    pub fn get(&self, id: Pk) -> RepoResult<Session> {
        Ok(self.repo.get(id)?)
    }

    /// Stores changes to a session.
    pub fn update(&self, session: &Session) -> RepoResult<()> {
        Ok(self.repo.update(session)?)
    }

    /// Deletes a session.
    pub fn delete(&self, id: Pk) -> RepoResult<()> {
        Ok(self.repo.delete(id)?)
    }

    /// Lists all sessions.
    pub fn list(&self) -> RepoResult<Listing<Session>> {
        Ok(self.repo.list("")?)
    }

    /// Deletes every session idle for more than `max_idle_secs` at `now`.
    ///
    /// Returns the number of deleted sessions.
    pub fn purge_older_than(&self, max_idle_secs: i64, now: i64) -> RepoResult<usize> {
        let purged = self.repo.with_tx(true, |tx| {
            let sessions = self.repo.list_tx(tx, "")?;
            let mut purged = 0;
            for session in sessions.items {
                if session.is_expired(max_idle_secs, now) {
                    self.repo.delete_tx(tx, session.id)?;
                    purged += 1;
                }
            }
            Ok(purged)
        })?;
        if purged > 0 {
            info!(purged, "expired sessions removed");
        }
        Ok(purged)
    }
}
