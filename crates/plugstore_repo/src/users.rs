//! User accounts.

use crate::error::RepoResult;
use crate::password::{hash_password, verify_password};
use crate::unique::ensure_unique;
use plugstore_db::{impl_entity, Database, DbError, Listing, Pk, Repository, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Partition holding [`User`] records.
pub const USER_PARTITION: &str = "user";

/// Key of the built-in administrator account.
pub const ADMIN: Pk = Pk::from_tag("admin");

/// Login of the built-in administrator account.
pub const ADMIN_LOGIN: &str = "admin";

const ADMIN_PASSWORD: &str = "admin";

/// A user account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    /// Entity key.
    pub id: Pk,
    /// Login name, stored lower-case and unique.
    pub login: String,
    /// Given name.
    pub firstname: String,
    /// Family name.
    pub lastname: String,
    /// Argon2 PHC string, see [`User::set_password`].
    pub password_hash: String,
    /// Inactive users keep their record but cannot log in.
    pub active: bool,
    /// Key of an avatar image, if any.
    pub avatar_image: Option<Pk>,
    /// Email addresses.
    #[serde(rename = "EMailAddresses")]
    pub email_addresses: Vec<String>,
    /// Key of the user's company, if any.
    pub company: Option<Pk>,
    /// Keys of the groups the user belongs to.
    pub groups: Vec<Pk>,
}

impl_entity!(User);

impl User {
    /// Creates an active user with the given login.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            active: true,
            ..Self::default()
        }
    }

    /// Replaces the password hash.
    pub fn set_password(&mut self, password: &str) -> RepoResult<()> {
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    /// Checks `password` against the stored hash.
    #[must_use]
    pub fn password_equals(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// Returns true if the user is a member of `group`.
    #[must_use]
    pub fn is_member_of(&self, group: Pk) -> bool {
        self.groups.contains(&group)
    }
}

/// Repository of [`User`] records.
#[derive(Debug, Clone)]
pub struct Users {
    repo: Repository<User>,
}

impl Users {
    /// Opens the repository and creates the administrator account
    /// (`admin`/`admin`) if it is missing.
    pub fn open(db: Database) -> RepoResult<Self> {
        let users = Self {
            repo: Repository::new(db, USER_PARTITION),
        };
        let tx = users.repo.partition().begin_write();
        let result = users.bootstrap_admin(&tx);
        tx.commit()?;
        result?;
        Ok(users)
    }

    fn bootstrap_admin<X: Transaction + ?Sized>(&self, tx: &X) -> RepoResult<()> {
        if tx.has(ADMIN) {
            return Ok(());
        }
        let existing = self.repo.list_tx(tx, "")?;
        if existing.items.iter().any(|u| u.login == ADMIN_LOGIN) {
            warn!(login = ADMIN_LOGIN, "login is taken by another account, not creating the administrator");
            return Ok(());
        }
        let mut admin = User::new(ADMIN_LOGIN);
        admin.id = ADMIN;
        admin.set_password(ADMIN_PASSWORD)?;
        self.repo.update_tx(tx, &admin)?;
        info!("created administrator account");
        Ok(())
    }

    /// Lists all users.
    pub fn list(&self) -> RepoResult<Listing<User>> {
        Ok(self.repo.list("")?)
    }

    /// Loads a user.
    pub fn get(&self, id: Pk) -> RepoResult<User> {
        Ok(self.repo.get(id)?)
    }

    /// Deletes a user.
    pub fn delete(&self, id: Pk) -> RepoResult<()> {
        Ok(self.repo.delete(id)?)
    }

    /// Stores a new user under a fresh key.
    ///
    /// The login is lower-cased first and must not be used by any other
    /// account.
    pub fn add(&self, user: &mut User) -> RepoResult<()> {
        user.login = user.login.to_lowercase();
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            ensure_unique(&existing.items, Pk::NIL, &user.login, |u| u.login == user.login)?;
            self.repo.create_tx(tx, user)
        })?;
        info!(login = %user.login, id = %user.id, "user added");
        Ok(())
    }

    /// Stores changes to an existing user, keeping the login unique.
    pub fn update(&self, user: &mut User) -> RepoResult<()> {
        user.login = user.login.to_lowercase();
        self.repo.with_tx(true, |tx| {
            let existing = self.repo.list_tx(tx, "")?;
            ensure_unique(&existing.items, user.id, &user.login, |u| u.login == user.login)?;
            self.repo.update_tx(tx, user)
        })?;
        Ok(())
    }

    /// Finds a user by login, ignoring case.
    pub fn find_by_login(&self, login: &str) -> RepoResult<User> {
        let login = login.to_lowercase();
        self.repo
            .list("")?
            .into_items()
            .into_iter()
            .find(|u| u.login == login)
            .ok_or_else(|| DbError::EntityNotFound { key: login }.into())
    }

    /// Looks up `login` and checks `password`, returning the user on success.
    ///
    /// Inactive users never authenticate.
    pub fn authenticate(&self, login: &str, password: &str) -> RepoResult<Option<User>> {
        match self.find_by_login(login) {
            Ok(user) if user.active && user.password_equals(password) => Ok(Some(user)),
            Ok(_) => Ok(None),
            Err(err) if err.is_entity_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
